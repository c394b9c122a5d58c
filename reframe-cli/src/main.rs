// reframe-cli/src/main.rs
//
// Entry point of the `reframe` binary: parses arguments, sets up logging,
// dispatches to the command and turns errors into a red stderr line and a
// non-zero exit code.

use clap::Parser;
use console::style;
use reframe_cli::{Cli, Commands, logging, run_edit, run_remux};
use std::process;

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result = match cli.command {
        Commands::Remux(args) => run_remux(args),
        Commands::Edit(args) => run_edit(args),
    };

    if let Err(e) = result {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        process::exit(1);
    }
}
