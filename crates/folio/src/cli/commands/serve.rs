//! Implementation of `folio serve`.

use std::process::ExitCode;

use tokio::runtime::Runtime;

use crate::{
    cli::{args::ServeCommand, context::CommandContext},
    server,
};

/// Runs the HTTP API until interrupted.
pub fn run(ctx: &CommandContext, cmd: &ServeCommand) -> ExitCode {
    let service = match ctx.service() {
        Ok(service) => service,
        Err(code) => return code,
    };
    let bind = cmd
        .bind
        .clone()
        .unwrap_or_else(|| ctx.config.server.bind.clone());

    let runtime = match Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("error: failed to start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(server::serve(service, &bind)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: server on {bind} failed: {e}");
            ExitCode::FAILURE
        }
    }
}
