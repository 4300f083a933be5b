use std::fmt;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const DATE_INPUT_FORMAT: &str = "%Y-%m-%d";
pub const DATE_DISPLAY_FORMAT: &str = "%a, %-d %b %Y";

// chrono alone accepts unpadded fields and a leading sign.
static DATE_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").expect("date regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    description: String,
    #[serde(default)]
    done: bool,
    #[serde(flatten)]
    kind: TaskKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskKind {
    Plain,
    Deadline { due: NaiveDate },
    Ranged { start: NaiveDate, end: NaiveDate },
}

impl TaskKind {
    pub fn tag(&self) -> char {
        match self {
            TaskKind::Plain => 'T',
            TaskKind::Deadline { .. } => 'D',
            TaskKind::Ranged { .. } => 'E',
        }
    }
}

impl Task {
    pub fn new(description: impl Into<String>, kind: TaskKind) -> Self {
        Self {
            description: description.into(),
            done: false,
            kind,
        }
    }

    pub fn plain(description: impl Into<String>) -> Self {
        Self::new(description, TaskKind::Plain)
    }

    pub fn deadline(description: impl Into<String>, due: NaiveDate) -> Self {
        Self::new(description, TaskKind::Deadline { due })
    }

    pub fn ranged(description: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self::new(description, TaskKind::Ranged { start, end })
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn kind(&self) -> &TaskKind {
        &self.kind
    }

    /// Flips the completion flag and returns the new state.
    pub fn toggle(&mut self) -> bool {
        self.done = !self.done;
        self.done
    }
}

pub fn format_date(date: &NaiveDate) -> String {
    date.format(DATE_DISPLAY_FORMAT).to_string()
}

/// Parses a strict `YYYY-MM-DD` calendar date.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    if !DATE_SHAPE.is_match(text) {
        return None;
    }
    NaiveDate::parse_from_str(text, DATE_INPUT_FORMAT).ok()
}

/// Renders a task with its 1-based position, e.g. `2. [D][X] file taxes (by: Wed, 1 Jan 2020)`.
pub fn render_task_line(index: usize, task: &Task) -> String {
    format!("{}. {}", index + 1, task)
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.done { 'X' } else { ' ' };
        write!(f, "[{}][{}] {}", self.kind.tag(), status, self.description)?;
        match &self.kind {
            TaskKind::Plain => Ok(()),
            TaskKind::Deadline { due } => write!(f, " (by: {})", format_date(due)),
            TaskKind::Ranged { start, end } => write!(
                f,
                " (from: {}) (to: {})",
                format_date(start),
                format_date(end)
            ),
        }
    }
}
