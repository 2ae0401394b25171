//! Implementation of `folio config`.

use std::process::ExitCode;

use crate::cli::context::CommandContext;

/// Shows effective configuration settings.
pub fn run(ctx: &CommandContext) -> ExitCode {
    let config = &ctx.config;
    match &config.config_root {
        Some(root) => println!("# loaded from {}", root.display()),
        None => println!("# no configuration file found, using defaults"),
    }
    print!("{}", config.settings_to_toml());
    ExitCode::SUCCESS
}
