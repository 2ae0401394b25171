//! Implementation of `folio search`.

use std::{io, process::ExitCode};

use folio_index::{JsonLines, SearchService};

use crate::cli::{args::SearchCommand, context::CommandContext};

/// Runs a search and prints its events as JSON lines on stdout.
///
/// Exits with failure when the query was rejected, after the error event has
/// been printed.
pub fn run(ctx: &CommandContext, cmd: &SearchCommand) -> ExitCode {
    let service = match ctx.service() {
        Ok(service) => service,
        Err(code) => return code,
    };
    let query = cmd.raw_query();

    if cmd.explain {
        return explain(&service, &query);
    }

    let mut sink = JsonLines::new(io::stdout().lock());
    if service.search(&query, &mut sink).is_err() {
        eprintln!("error: output closed");
        return ExitCode::FAILURE;
    }

    if sink.errors() > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Prints the query interpretation as pretty JSON.
fn explain(service: &SearchService, query: &str) -> ExitCode {
    let explanation = match service.explain(query) {
        Ok(explanation) => explanation,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    match serde_json::to_string_pretty(&explanation) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: failed to serialize explanation: {e}");
            ExitCode::FAILURE
        }
    }
}
