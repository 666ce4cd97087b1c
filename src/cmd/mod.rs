//! Subcommand dispatch and execution.
//!
//! The [`dispatch`] function routes the parsed CLI to the appropriate
//! subcommand handler. Each handler lives in its own submodule.

pub mod run;

use crate::cli::{Cli, Commands};
use crate::error::CorrelogError;

pub async fn dispatch(cli: Cli) -> Result<(), CorrelogError> {
    match cli.command {
        Some(Commands::Run(args)) => run::execute(*args).await,
        None => {
            print_welcome();
            Ok(())
        }
    }
}

fn print_welcome() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        "\n  correlog v{version} \u{2014} correlation-aware JSON logging\n\n  \
         No command provided. To get started:\n\n    \
         correlog run --service orders                 Start the demo service\n    \
         correlog run -s gateway -u http://orders:3000 Relay to a downstream service\n    \
         correlog --help                               See all commands and options\n"
    );
}
