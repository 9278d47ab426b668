//! Subcommand implementations.

mod audit;
mod process;
mod run;

pub use audit::cmd_audit;
pub use process::{cmd_process, ProcessArgs};
pub use run::{cmd_run, RunOverrides};
