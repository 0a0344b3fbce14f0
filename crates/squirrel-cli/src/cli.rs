//! CLI argument definitions for the squirrel pipeline tool.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "squirrel",
    version,
    about = "Squirrel - record and replay tabular data transformations",
    long_about = "Record tabular data transformations as an editable pipeline log.\n\n\
                  Entries are generated from an action catalog, stored between\n\
                  marker comments in the project's pipeline file, and replayed\n\
                  against CSV/JSON data sources to materialize tables."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a project with an empty pipeline log.
    Init(InitArgs),

    /// Replay the pipeline log and print the resulting tables.
    Run(RunArgs),

    /// Inspect or edit the recorded pipeline entries.
    Log(LogArgs),

    /// List all action kinds and their parameters.
    Kinds,
}

#[derive(Args)]
pub struct InitArgs {
    /// Project directory to create the pipeline log in.
    #[arg(value_name = "PROJECT")]
    pub project: PathBuf,
}

#[derive(Args)]
pub struct RunArgs {
    /// Project directory holding the pipeline log and data sources.
    #[arg(value_name = "PROJECT")]
    pub project: PathBuf,

    /// Stop at the first failing entry instead of skipping it.
    #[arg(long = "strict")]
    pub strict: bool,

    /// Abort the replay after this many seconds.
    #[arg(long = "timeout-secs", value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    /// Print per-column statistics under each table.
    #[arg(long = "stats")]
    pub stats: bool,

    /// Print the replay report as JSON instead of rendered tables.
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Args)]
pub struct LogArgs {
    /// Project directory holding the pipeline log.
    #[arg(value_name = "PROJECT")]
    pub project: PathBuf,

    #[command(subcommand)]
    pub action: LogAction,
}

#[derive(Subcommand)]
pub enum LogAction {
    /// List the entries in pipeline order.
    List,

    /// Append an entry generated from the action catalog.
    Add(AddArgs),

    /// Delete the entry with the given id.
    Rm {
        #[arg(value_name = "ID")]
        id: usize,
    },

    /// Reorder entries: comma-separated old ids, e.g. "2-label,0-label,1-label" or "2,0,1".
    Mv {
        #[arg(value_name = "ORDER")]
        order: String,
    },

    /// Replace the statement text of the entry with the given id.
    Edit {
        #[arg(value_name = "ID")]
        id: usize,
        #[arg(value_name = "TEXT")]
        text: String,
    },
}

#[derive(Args)]
pub struct AddArgs {
    /// Action kind, e.g. CreateTable or AddColumn (see `squirrel kinds`).
    #[arg(long = "kind", value_name = "KIND")]
    pub kind: String,

    /// Parameter as name=value; repeat the flag for each parameter.
    #[arg(long = "param", value_name = "NAME=VALUE")]
    pub params: Vec<String>,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
