use thiserror::Error;

/// Failures a user can trigger with a single command. All of them are
/// recoverable: the REPL reports the message and reads the next line.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Command not found: {0}")]
    CommandNotFound(String),
    #[error("Missing argument.")]
    MissingArgument,
    #[error("Invalid index.")]
    InvalidIndex,
    #[error("No tasks found.")]
    NoTasksFound,
    #[error("Invalid task type: {0}")]
    InvalidTaskType(String),
    #[error("Invalid date: {0} (expected YYYY-MM-DD)")]
    InvalidDate(String),
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Command already registered: {0}")]
    Duplicate(String),
    #[error("Invalid delimiter pattern: {0}")]
    Pattern(#[from] regex::Error),
}
