//! Implementation of `folio index` and `folio rebuild`.

use std::{io, process::ExitCode};

use folio_index::JsonLines;
use tracing::info;

use crate::cli::context::CommandContext;

/// How much of the index to redo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Drop deleted books and add new ones.
    Update,
    /// Clear the index and index every book.
    Rebuild,
}

/// Indexes the library, printing progress events as JSON lines on stdout.
///
/// A book that fails to index does not stop the run but makes the command
/// exit with failure.
pub fn run(ctx: &CommandContext, mode: Mode) -> ExitCode {
    let service = match ctx.service() {
        Ok(service) => service,
        Err(code) => return code,
    };

    let mut sink = JsonLines::new(io::stdout().lock());
    let stats = match mode {
        Mode::Update => service.update_index(&mut sink),
        Mode::Rebuild => service.rebuild_index(&mut sink),
    };
    let Ok(stats) = stats else {
        eprintln!("error: output closed");
        return ExitCode::FAILURE;
    };

    info!(
        removed = stats.removed,
        attempted = stats.attempted,
        pages = stats.pages,
        failed = stats.failed.len(),
        "indexing finished"
    );

    if sink.errors() > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
