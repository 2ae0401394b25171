//! Clap argument definitions for the `folio` CLI.

use clap::{ArgAction, Args, Parser, Subcommand};

/// Top-level CLI options.
#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Full-text search over a library of PDF books")]
pub struct Cli {
    /// Log verbosity (-v for debug, -vv for trace); RUST_LOG takes precedence
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Arguments for `folio search`.
#[derive(Args, Debug, Clone)]
pub struct SearchCommand {
    /// Query words, joined with spaces
    #[arg(required = true)]
    pub query: Vec<String>,

    /// Show how the query is interpreted and how many pages match, without
    /// aggregating results
    #[arg(long)]
    pub explain: bool,
}

impl SearchCommand {
    /// The raw query string.
    pub fn raw_query(&self) -> String {
        self.query.join(" ")
    }
}

/// Arguments for `folio serve`.
#[derive(Args, Debug, Clone)]
pub struct ServeCommand {
    /// Address to listen on [default: from config, 127.0.0.1:8087]
    #[arg(long)]
    pub bind: Option<String>,
}

/// Arguments for `folio init`.
#[derive(Args, Debug, Clone)]
pub struct InitCommand {
    /// Overwrite existing configuration file
    #[arg(long)]
    pub force: bool,
}

/// Arguments for `folio title`.
#[derive(Args, Debug, Clone)]
pub struct TitleCommand {
    /// PDF file name in the data directory (".pdf" may be omitted)
    pub filename: String,

    /// Strip volume prefixes like "GA 261 - " from the title
    #[arg(long)]
    pub search: bool,
}

/// Supported `folio` subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Search the library and print results as JSON lines
    #[command(after_help = "\
QUERY SYNTAX:
  term              Case-insensitive term
  term1 term2       Either term
  \"phrase\"          Exact phrase match
  term1 AND term2   Both terms
  NOT term          Term must not appear
  (expr)            Grouping
  fest*  f?st       Wildcards (fest* also matches fest itself)
  +Fest             Case-sensitive term
  +Fest*  +F?st     Case-sensitive wildcards

EXAMPLES:
  folio search Fest
  folio search '+Fest*'
  folio search '\"the eternal now\" OR Fest'
  folio search --explain 'fest* NOT feast'")]
    Search(SearchCommand),

    /// Index new PDFs and remove deleted ones from the index
    Index,

    /// Clear the index and index every PDF again
    Rebuild,

    /// Serve the HTTP search API
    Serve(ServeCommand),

    /// Initialize folio configuration in current directory
    Init(InitCommand),

    /// Print the title of a PDF in the library
    Title(TitleCommand),

    /// Show effective configuration settings
    Config,
}
