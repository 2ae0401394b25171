//! Command implementations and dispatch.

pub mod config;
pub mod index;
pub mod init;
pub mod search;
pub mod serve;
pub mod title;

use std::process::ExitCode;

use super::{args::Commands, context::CommandContext};

/// Dispatches to the selected subcommand.
pub fn run(command: Commands, ctx: &CommandContext) -> ExitCode {
    match command {
        Commands::Search(cmd) => search::run(ctx, &cmd),
        Commands::Index => index::run(ctx, index::Mode::Update),
        Commands::Rebuild => index::run(ctx, index::Mode::Rebuild),
        Commands::Serve(cmd) => serve::run(ctx, &cmd),
        Commands::Init(cmd) => init::run(ctx, &cmd),
        Commands::Title(cmd) => title::run(ctx, &cmd),
        Commands::Config => config::run(ctx),
    }
}
