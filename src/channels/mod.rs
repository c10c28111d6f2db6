//! User-facing front ends over the conversation controller.

pub mod cli;

pub use cli::{CliCommand, CliFrontend};
