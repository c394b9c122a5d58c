// reframe-cli/src/lib.rs
//
// Library portion of the Reframe CLI application.
// Contains argument definitions and command logic.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod progress;

// Re-export items needed by the binary or integration tests
pub use cli::{Cli, Commands, EditArgs, RemuxArgs};
pub use commands::edit::run_edit;
pub use commands::remux::run_remux;
