use regex::Regex;

use crate::error::CommandError;

/// Splits `input` into exactly `delimiters.len() + 1` fields.
///
/// Delimiters are consumed left to right, each at its first match in the
/// text that remains after the previous one. A delimiter that does not
/// match fails the whole call.
pub fn tokenize(input: &str, delimiters: &[Regex]) -> Result<Vec<String>, CommandError> {
    let mut fields = Vec::with_capacity(delimiters.len() + 1);
    let mut rest = input;
    for delimiter in delimiters {
        let found = delimiter.find(rest).ok_or(CommandError::MissingArgument)?;
        fields.push(rest[..found.start()].to_string());
        rest = &rest[found.end()..];
    }
    fields.push(rest.to_string());
    Ok(fields)
}

pub fn compile_delimiters(patterns: &[&str]) -> Result<Vec<Regex>, regex::Error> {
    patterns.iter().map(|pattern| Regex::new(pattern)).collect()
}
