use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::error::CommandError;
use crate::storage::{Storage, StorageError};
use crate::task::{parse_date, render_task_line, Task};
use crate::tokenize::tokenize;

pub const NO_TASKS_FOUND: &str = "No tasks found.";

static DEADLINE_DELIMITERS: LazyLock<Vec<Regex>> =
    LazyLock::new(|| vec![Regex::new(r" /by ").expect("deadline delimiter")]);
static RANGED_DELIMITERS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r" /from ").expect("ranged delimiter"),
        Regex::new(r" /to ").expect("ranged delimiter"),
    ]
});

/// The ordered task list of one session.
///
/// Every mutation writes the whole list through to storage before
/// returning. A failed write does not undo the mutation; the error is
/// parked until the caller collects it with [`TaskStore::take_save_error`].
pub struct TaskStore {
    tasks: Vec<Task>,
    storage: Box<dyn Storage>,
    save_error: Option<StorageError>,
}

impl TaskStore {
    pub fn new(tasks: Vec<Task>, storage: Box<dyn Storage>) -> Self {
        Self {
            tasks,
            storage,
            save_error: None,
        }
    }

    /// Loads the saved list. A store with no saved state starts empty and
    /// is saved right away; an unreadable one starts empty and the load
    /// error is handed back for reporting.
    pub fn open(storage: Box<dyn Storage>) -> (Self, Option<StorageError>) {
        match storage.load() {
            Ok(tasks) => (Self::new(tasks, storage), None),
            Err(err) if err.is_not_found() => {
                debug!("no saved tasks, starting empty");
                let mut store = Self::new(Vec::new(), storage);
                store.persist();
                (store, None)
            }
            Err(err) => {
                warn!(error = %err, "failed to load tasks, starting empty");
                (Self::new(Vec::new(), storage), Some(err))
            }
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, index: usize) -> Option<&Task> {
        self.tasks.get(index)
    }

    pub fn take_save_error(&mut self) -> Option<StorageError> {
        self.save_error.take()
    }

    fn persist(&mut self) {
        if let Err(err) = self.storage.save(&self.tasks) {
            warn!(error = %err, "failed to save tasks");
            self.save_error = Some(err);
        }
    }

    pub fn push(&mut self, task: Task) -> usize {
        self.tasks.push(task);
        self.persist();
        self.tasks.len() - 1
    }

    /// Parses a whitespace-separated list of 1-based positions into
    /// 0-based indices, in input order. Fails on the first token that is
    /// not a number or is out of range.
    pub fn resolve_indices(&self, text: &str) -> Result<Vec<usize>, CommandError> {
        text.split_whitespace()
            .map(|token| {
                let position: usize = token.parse().map_err(|_| CommandError::InvalidIndex)?;
                match position.checked_sub(1) {
                    Some(index) if index < self.tasks.len() => Ok(index),
                    _ => Err(CommandError::InvalidIndex),
                }
            })
            .collect()
    }

    /// Flips every index once per occurrence and returns the distinct
    /// indices touched, ascending. Indices come from `resolve_indices`.
    fn toggle(&mut self, indices: &[usize]) -> Vec<usize> {
        for &index in indices {
            debug_assert!(index < self.tasks.len(), "unresolved index {index}");
            self.tasks[index].toggle();
        }
        let mut affected = indices.to_vec();
        affected.sort_unstable();
        affected.dedup();
        if !affected.is_empty() {
            self.persist();
        }
        affected
    }

    /// Removes the given indices and returns the removed tasks with their
    /// former index, ascending. Indices come from `resolve_indices`.
    fn remove(&mut self, indices: &[usize]) -> Vec<(usize, Task)> {
        let mut pending = indices.to_vec();
        pending.sort_unstable_by(|a, b| b.cmp(a));
        pending.dedup();

        // Highest first, so the lower pending indices stay valid.
        let mut removed = Vec::with_capacity(pending.len());
        for index in pending {
            debug_assert!(index < self.tasks.len(), "unresolved index {index}");
            removed.push((index, self.tasks.remove(index)));
        }
        removed.reverse();
        if !removed.is_empty() {
            self.persist();
        }
        removed
    }

    pub fn search(&self, needle: &str) -> Vec<(usize, &Task)> {
        self.tasks
            .iter()
            .enumerate()
            .filter(|(_, task)| task.description().contains(needle))
            .collect()
    }

    pub fn list(&self) -> Vec<String> {
        if self.tasks.is_empty() {
            return vec![NO_TASKS_FOUND.to_string()];
        }
        self.tasks
            .iter()
            .enumerate()
            .map(|(index, task)| render_task_line(index, task))
            .collect()
    }

    /// `add` with fields `[tag, rest]`.
    pub fn add(&mut self, fields: &[String]) -> Result<Vec<String>, CommandError> {
        let [tag, rest] = fields else {
            return Err(CommandError::MissingArgument);
        };
        let task = build_task(tag, rest)?;
        let index = self.push(task);
        debug!(index, "task added");
        Ok(vec![format!(
            "added: {}",
            render_task_line(index, &self.tasks[index])
        )])
    }

    /// `find` with a single free-text field.
    pub fn find(&self, fields: &[String]) -> Result<Vec<String>, CommandError> {
        let needle = fields.first().ok_or(CommandError::MissingArgument)?;
        let matches: Vec<String> = self
            .search(needle)
            .into_iter()
            .map(|(index, task)| render_task_line(index, task))
            .collect();
        if matches.is_empty() {
            return Ok(vec![NO_TASKS_FOUND.to_string()]);
        }
        Ok(matches)
    }

    /// `mark` with a single field of positions.
    pub fn mark(&mut self, fields: &[String]) -> Result<Vec<String>, CommandError> {
        let text = fields.first().ok_or(CommandError::MissingArgument)?;
        let indices = self.resolve_indices(text)?;
        if indices.is_empty() {
            return Err(CommandError::NoTasksFound);
        }
        let affected = self.toggle(&indices);
        debug!(?affected, "tasks toggled");

        if let [index] = affected[..] {
            let task = &self.tasks[index];
            let verb = if task.is_done() { "marked" } else { "unmarked" };
            return Ok(vec![format!("{verb}: {}", render_task_line(index, task))]);
        }
        let mut lines = vec!["marked:".to_string()];
        lines.extend(
            affected
                .iter()
                .map(|&index| format!("  {}", render_task_line(index, &self.tasks[index]))),
        );
        Ok(lines)
    }

    /// `delete` with a single field of positions.
    pub fn delete(&mut self, fields: &[String]) -> Result<Vec<String>, CommandError> {
        let text = fields.first().ok_or(CommandError::MissingArgument)?;
        let indices = self.resolve_indices(text)?;
        if indices.is_empty() {
            return Err(CommandError::NoTasksFound);
        }
        let removed = self.remove(&indices);
        debug!(count = removed.len(), "tasks deleted");

        if let [(index, task)] = &removed[..] {
            return Ok(vec![format!("deleted: {}", render_task_line(*index, task))]);
        }
        let mut lines = vec!["deleted:".to_string()];
        lines.extend(
            removed
                .iter()
                .map(|(index, task)| format!("  {}", render_task_line(*index, task))),
        );
        Ok(lines)
    }
}

fn build_task(tag: &str, rest: &str) -> Result<Task, CommandError> {
    let task = match tag {
        "/todo" => Task::plain(rest),
        "/deadline" => {
            let fields = tokenize(rest, &DEADLINE_DELIMITERS)?;
            Task::deadline(&fields[0], parse_date_field(&fields[1])?)
        }
        "/event" => {
            let fields = tokenize(rest, &RANGED_DELIMITERS)?;
            Task::ranged(
                &fields[0],
                parse_date_field(&fields[1])?,
                parse_date_field(&fields[2])?,
            )
        }
        other => return Err(CommandError::InvalidTaskType(other.to_string())),
    };
    if task.description().is_empty() {
        return Err(CommandError::MissingArgument);
    }
    Ok(task)
}

fn parse_date_field(text: &str) -> Result<chrono::NaiveDate, CommandError> {
    parse_date(text).ok_or_else(|| CommandError::InvalidDate(text.to_string()))
}
