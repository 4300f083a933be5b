use std::io::{self, BufRead, Write};

use tracing::{debug, info};

use crate::command::{Command, CommandRegistry};
use crate::error::RegistryError;
use crate::storage::StorageError;
use crate::store::TaskStore;

pub const RULE: &str = "____________________________________________________________";
pub const GREETING: [&str; 2] = ["Hello, I'm taskline.", "How may I help?"];
pub const FAREWELL: &str = "Goodbye.";

/// State the built-in commands act on.
pub struct Session {
    store: TaskStore,
    help: Vec<String>,
    finished: bool,
}

impl Session {
    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

pub fn builtin_commands() -> Result<CommandRegistry<Session>, RegistryError> {
    let mut registry = CommandRegistry::new();
    registry.register(Command::basic("exit", "exit the app", |s: &mut Session| {
        s.finished = true;
        Ok(vec![FAREWELL.to_string()])
    }))?;
    registry.register(Command::basic(
        "help",
        "show this help message",
        |s: &mut Session| Ok(s.help.clone()),
    ))?;
    registry.register(Command::basic("list", "list tasks", |s: &mut Session| {
        Ok(s.store.list())
    }))?;
    registry.register(Command::with_input(
        "add",
        "add task: /todo <desc> | /deadline <desc> /by <date> | /event <desc> /from <date> /to <date>",
        &[r"\s"],
        |s: &mut Session, fields: &[String]| s.store.add(fields),
    )?)?;
    registry.register(Command::with_input(
        "find",
        "find tasks containing text fragment",
        &[],
        |s: &mut Session, fields: &[String]| s.store.find(fields),
    )?)?;
    // mark and delete take any number of space-separated positions.
    registry.register(Command::with_input(
        "mark",
        "mark/unmark task(s) as done",
        &[],
        |s: &mut Session, fields: &[String]| s.store.mark(fields),
    )?)?;
    registry.register(Command::with_input(
        "delete",
        "delete task(s)",
        &[],
        |s: &mut Session, fields: &[String]| s.store.delete(fields),
    )?)?;
    Ok(registry)
}

/// Read-eval-print loop over the built-in commands.
pub struct Repl {
    registry: CommandRegistry<Session>,
    session: Session,
}

impl Repl {
    pub fn new(store: TaskStore) -> Result<Self, RegistryError> {
        let registry = builtin_commands()?;
        let help = registry.help_lines();
        Ok(Self {
            registry,
            session: Session {
                store,
                help,
                finished: false,
            },
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Runs one input line. Blank lines produce no reply; command errors
    /// come back as a single `[ERROR]` line.
    pub fn respond(&mut self, line: &str) -> Option<Vec<String>> {
        if line.trim().is_empty() {
            return None;
        }
        match self.registry.dispatch_line(&mut self.session, line) {
            Ok(lines) => Some(lines),
            Err(err) => {
                debug!(error = %err, "command failed");
                Some(vec![format!("[ERROR] {err}")])
            }
        }
    }

    /// Drives the session until `exit` or end of input. Bytes that are not
    /// valid UTF-8 are replaced rather than ending the session.
    pub fn run<R: BufRead, W: Write>(
        &mut self,
        mut input: R,
        mut output: W,
        load_error: Option<&StorageError>,
    ) -> io::Result<()> {
        write_block(&mut output, &GREETING)?;
        if let Some(err) = load_error {
            write_block(
                &mut output,
                &[
                    "[ERROR] While loading, the following error occurred:".to_string(),
                    err.to_string(),
                ],
            )?;
        }
        // Opening the store may already have failed its first save.
        self.report_save_error(&mut output)?;
        output.flush()?;

        let mut buf = Vec::new();
        loop {
            buf.clear();
            if input.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            let line = String::from_utf8_lossy(&buf);
            let line = line.trim_end_matches(['\n', '\r']);
            if let Some(reply) = self.respond(line) {
                write_block(&mut output, &reply)?;
            }
            self.report_save_error(&mut output)?;
            output.flush()?;
            if self.session.finished {
                info!("session ended by exit");
                break;
            }
        }
        Ok(())
    }

    fn report_save_error<W: Write>(&mut self, output: &mut W) -> io::Result<()> {
        match self.session.store.take_save_error() {
            Some(err) => write_block(
                output,
                &[
                    "[ERROR] While saving, the following error occurred:".to_string(),
                    err.to_string(),
                ],
            ),
            None => Ok(()),
        }
    }
}

pub fn write_block<W: Write, S: AsRef<str>>(output: &mut W, lines: &[S]) -> io::Result<()> {
    for line in lines {
        writeln!(output, "    {}", line.as_ref())?;
    }
    writeln!(output, "{RULE}")
}
