//! Command implementations for the CLI.
//!
//! Each submodule contains the implementation of a specific command.

/// The `remux` command: interleave inputs into one output.
pub mod remux;

/// The `edit` command: re-time one track.
pub mod edit;

use console::style;

/// Prints one aligned "label: value" summary line.
pub(crate) fn print_info(label: &str, value: impl std::fmt::Display) {
    println!("  {} {}", style(format!("{:<16}", format!("{}:", label))).bold(), value);
}
