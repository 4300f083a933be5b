//! Core of taskline: task model, task store, argument tokenizer and the
//! command registry that drives the interactive session.

pub mod command;
pub mod config;
pub mod error;
pub mod session;
pub mod storage;
pub mod store;
pub mod task;
pub mod tokenize;

#[cfg(test)]
pub(crate) mod test_env;

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
