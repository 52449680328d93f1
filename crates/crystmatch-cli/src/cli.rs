use clap::{Args, Parser, Subcommand, ValueEnum};
use crystmatch::engine::config::MatchMode;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Tony Kan, Ted Yu, William A. Goddard III, Victor Wai Tak Kam",
    version,
    about = "CrystMatch CLI - Assemble molecules from crystal structures and search them for \
             geometric substructures.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads used to search structures in parallel.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Assemble the molecules of a crystal structure and write their graphs.
    Build(BuildArgs),
    /// Search crystal structures for the templates and conditions of a query.
    Search(SearchArgs),
    /// Print the Niggli-reduced cell of a crystal structure.
    Reduce(ReduceArgs),
}

/// Bond perception and assembly overrides shared by `build` and `search`.
#[derive(Args, Debug, Clone, Default)]
pub struct AssemblyArgs {
    /// Multiplier applied to summed covalent radii when perceiving bonds.
    #[arg(long, value_name = "FLOAT")]
    pub bond_tolerance: Option<f64>,

    /// Complete molecules that cross cell boundaries.
    #[arg(long)]
    pub pack_complete: bool,
}

/// Arguments for the `build` subcommand.
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Path to the structure file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Write one serialized molecule graph per line to this file.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub assembly: AssemblyArgs,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    /// Matches must cover a whole molecule with exactly the template bonds.
    Exact,
    /// Matches may be embedded anywhere in a molecule.
    Substructure,
}

impl From<ModeArg> for MatchMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Exact => MatchMode::Exact,
            ModeArg::Substructure => MatchMode::Substructure,
        }
    }
}

/// Arguments for the `search` subcommand.
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Structure files in TOML format to search.
    #[arg(required = true, value_name = "STRUCTURE")]
    pub inputs: Vec<PathBuf>,

    /// Path to the query file in TOML format.
    #[arg(short = 'c', long = "query", required = true, value_name = "PATH")]
    pub query: PathBuf,

    /// Directory receiving one CSV file per non-empty solution table.
    #[arg(short, long, required = true, value_name = "DIR")]
    pub output: PathBuf,

    /// Override the match mode from the query file.
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Override the per-template match limit (0 = unlimited).
    #[arg(long, value_name = "INT")]
    pub max_matches: Option<usize>,

    /// Override the per-template time budget in milliseconds (0 = unlimited).
    #[arg(long, value_name = "MS")]
    pub time_budget_ms: Option<u64>,

    /// Keep only one match per set of target atoms.
    #[arg(long)]
    pub unique: bool,

    /// Search every structure even when the pre-filter rules it out.
    #[arg(long)]
    pub no_prefilter: bool,

    #[command(flatten)]
    pub assembly: AssemblyArgs,
}

/// Arguments for the `reduce` subcommand.
#[derive(Args, Debug)]
pub struct ReduceArgs {
    /// Path to the structure file in TOML format; only its cell is used.
    #[arg(required = true, value_name = "STRUCTURE")]
    pub input: PathBuf,
}
