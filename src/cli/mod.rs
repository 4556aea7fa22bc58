//! CLI command implementations

pub mod error;
pub mod fetch;
pub mod reports;

pub use error::CliError;
pub use fetch::{Cli, Commands, DateArgs, DayAheadArgs};
pub use reports::ReportsCommand;
