//! Programmatic command surface shared by the `solarcms` binary and tests.

mod command;
mod runner;
mod util;

pub use command::Command;
pub use runner::{CommandOutput, OutputMode, run, run_with_format};
