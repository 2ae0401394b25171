//! Implementation of `folio title`.

use std::process::ExitCode;

use folio_index::with_pdf_extension;

use crate::cli::{args::TitleCommand, context::CommandContext};

/// Prints the display title of one PDF.
///
/// With `--search` the volume prefix is stripped and a missing file is an
/// error; otherwise a missing file prints its name, as the title routes do.
pub fn run(ctx: &CommandContext, cmd: &TitleCommand) -> ExitCode {
    let service = match ctx.service() {
        Ok(service) => service,
        Err(code) => return code,
    };
    let filename = with_pdf_extension(&cmd.filename);

    if !cmd.search {
        println!("{}", service.title(&filename));
        return ExitCode::SUCCESS;
    }

    match service.search_title(&filename) {
        Some(found) => {
            println!("{}", found.title);
            ExitCode::SUCCESS
        }
        None => {
            eprintln!("error: PDF file '{filename}' not found");
            ExitCode::FAILURE
        }
    }
}
