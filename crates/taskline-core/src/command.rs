use std::fmt;

use regex::Regex;
use tracing::debug;

use crate::error::{CommandError, RegistryError};
use crate::tokenize::{compile_delimiters, tokenize};

pub const USAGE: &str = "Usage: <command> [<args>]";

type Action<C> = Box<dyn Fn(&mut C, &[String]) -> Result<Vec<String>, CommandError>>;

/// A named operation over some context `C`.
pub struct Command<C> {
    name: String,
    help: String,
    takes_input: bool,
    delimiters: Vec<Regex>,
    action: Action<C>,
}

impl<C> Command<C> {
    /// A command that ignores any text after its name.
    pub fn basic<F>(name: &str, help: &str, action: F) -> Self
    where
        F: Fn(&mut C) -> Result<Vec<String>, CommandError> + 'static,
    {
        Self {
            name: name.to_string(),
            help: help.to_string(),
            takes_input: false,
            delimiters: Vec::new(),
            action: Box::new(move |ctx: &mut C, _: &[String]| action(ctx)),
        }
    }

    /// A command whose input is split into `delimiters.len() + 1` fields.
    pub fn with_input<F>(
        name: &str,
        help: &str,
        delimiters: &[&str],
        action: F,
    ) -> Result<Self, RegistryError>
    where
        F: Fn(&mut C, &[String]) -> Result<Vec<String>, CommandError> + 'static,
    {
        Ok(Self {
            name: name.to_string(),
            help: help.to_string(),
            takes_input: true,
            delimiters: compile_delimiters(delimiters)?,
            action: Box::new(action),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn takes_input(&self) -> bool {
        self.takes_input
    }

    pub fn delimiters(&self) -> &[Regex] {
        &self.delimiters
    }

    pub fn execute(&self, ctx: &mut C, fields: &[String]) -> Result<Vec<String>, CommandError> {
        (self.action)(ctx, fields)
    }
}

impl<C> fmt::Debug for Command<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("takes_input", &self.takes_input)
            .field("delimiters", &self.delimiters)
            .finish_non_exhaustive()
    }
}

/// Commands in registration order, looked up by exact name.
pub struct CommandRegistry<C> {
    commands: Vec<Command<C>>,
}

impl<C> Default for CommandRegistry<C> {
    fn default() -> Self {
        Self {
            commands: Vec::new(),
        }
    }
}

impl<C> CommandRegistry<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, command: Command<C>) -> Result<(), RegistryError> {
        if self.commands.iter().any(|c| c.name == command.name) {
            return Err(RegistryError::Duplicate(command.name));
        }
        debug!(command = command.name.as_str(), "command registered");
        self.commands.push(command);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<&Command<C>, CommandError> {
        self.commands
            .iter()
            .find(|command| command.name == name)
            .ok_or_else(|| CommandError::CommandNotFound(name.to_string()))
    }

    pub fn commands(&self) -> &[Command<C>] {
        &self.commands
    }

    pub fn help_lines(&self) -> Vec<String> {
        let width = self
            .commands
            .iter()
            .map(|command| command.name.len())
            .max()
            .unwrap_or(0);
        let mut lines = vec![USAGE.to_string()];
        lines.extend(
            self.commands
                .iter()
                .map(|command| format!("  {:>width$} : {}", command.name, command.help)),
        );
        lines
    }

    pub fn dispatch(
        &self,
        ctx: &mut C,
        name: &str,
        remainder: Option<&str>,
    ) -> Result<Vec<String>, CommandError> {
        let command = self.lookup(name)?;
        if !command.takes_input {
            debug!(command = name, "dispatch");
            return command.execute(ctx, &[]);
        }
        let input = match remainder {
            Some(text) if !text.is_empty() => text,
            _ => return Err(CommandError::MissingArgument),
        };
        let fields = tokenize(input, &command.delimiters)?;
        debug!(command = name, fields = fields.len(), "dispatch");
        command.execute(ctx, &fields)
    }

    /// Splits `line` at its first whitespace character into a command name
    /// and the raw remainder, then dispatches.
    pub fn dispatch_line(&self, ctx: &mut C, line: &str) -> Result<Vec<String>, CommandError> {
        let (name, remainder) = split_command_line(line);
        self.dispatch(ctx, name, remainder)
    }
}

pub fn split_command_line(line: &str) -> (&str, Option<&str>) {
    match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, Some(rest)),
        None => (line, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<Vec<String>>,
    }

    fn registry() -> CommandRegistry<Recorder> {
        let mut registry = CommandRegistry::new();
        registry
            .register(Command::basic("ping", "reply pong", |ctx: &mut Recorder| {
                ctx.calls.push(Vec::new());
                Ok(vec!["pong".to_string()])
            }))
            .expect("ping");
        registry
            .register(
                Command::with_input(
                    "pair",
                    "record two fields",
                    &[" = "],
                    |ctx: &mut Recorder, fields: &[String]| {
                        ctx.calls.push(fields.to_vec());
                        Ok(fields.to_vec())
                    },
                )
                .expect("pattern"),
            )
            .expect("pair");
        registry
    }

    #[test]
    fn lookup_is_exact_and_case_sensitive() {
        let registry = registry();
        assert_eq!(registry.lookup("ping").expect("ping").name(), "ping");
        assert_eq!(
            registry.lookup("PING").map(|c| c.name().to_string()),
            Err(CommandError::CommandNotFound("PING".to_string()))
        );
        assert!(registry.lookup("pin").is_err());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut registry = registry();
        let err = registry
            .register(Command::basic("ping", "again", |_: &mut Recorder| Ok(vec![])))
            .expect_err("duplicate");
        assert!(matches!(err, RegistryError::Duplicate(name) if name == "ping"));
        assert_eq!(registry.commands().len(), 2);
    }

    #[test]
    fn basic_command_ignores_trailing_text() {
        let registry = registry();
        let mut ctx = Recorder::default();
        let lines = registry
            .dispatch_line(&mut ctx, "ping and more")
            .expect("ping");
        assert_eq!(lines, vec!["pong"]);
        assert_eq!(ctx.calls, vec![Vec::<String>::new()]);
    }

    #[test]
    fn input_command_needs_remainder() {
        let registry = registry();
        let mut ctx = Recorder::default();
        assert_eq!(
            registry.dispatch_line(&mut ctx, "pair"),
            Err(CommandError::MissingArgument)
        );
        assert_eq!(
            registry.dispatch_line(&mut ctx, "pair "),
            Err(CommandError::MissingArgument)
        );
        assert!(ctx.calls.is_empty());
    }

    #[test]
    fn input_command_receives_tokenized_fields() {
        let registry = registry();
        let mut ctx = Recorder::default();
        let lines = registry
            .dispatch_line(&mut ctx, "pair key = value = more")
            .expect("pair");
        assert_eq!(lines, vec!["key", "value = more"]);
    }

    #[test]
    fn missing_delimiter_never_reaches_action() {
        let registry = registry();
        let mut ctx = Recorder::default();
        assert_eq!(
            registry.dispatch_line(&mut ctx, "pair novalue"),
            Err(CommandError::MissingArgument)
        );
        assert!(ctx.calls.is_empty());
    }

    #[test]
    fn unknown_command_is_reported() {
        let registry = registry();
        let mut ctx = Recorder::default();
        assert_eq!(
            registry.dispatch_line(&mut ctx, "launch rockets"),
            Err(CommandError::CommandNotFound("launch".to_string()))
        );
    }

    #[test]
    fn help_lines_follow_registration_order() {
        let registry = registry();
        assert_eq!(
            registry.help_lines(),
            vec![
                USAGE.to_string(),
                "  ping : reply pong".to_string(),
                "  pair : record two fields".to_string(),
            ]
        );
    }

    #[test]
    fn split_command_line_keeps_remainder_verbatim() {
        assert_eq!(split_command_line("find  two spaces"), ("find", Some(" two spaces")));
        assert_eq!(split_command_line("list"), ("list", None));
    }
}
