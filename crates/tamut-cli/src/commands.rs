//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// tamut: mutation testing for timed-automaton components
#[derive(Parser, Debug)]
#[command(name = "tamut")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// YAML configuration file
    #[arg(short, long, global = true, env = "TAMUT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate mutants of a component
    Mutate(MutateArgs),

    /// Run mutation tests against pre-computed strategies
    Run(RunArgs),

    /// Parse a strategy file and summarize it
    CheckStrategy(CheckStrategyArgs),

    /// List the mutation operators
    Operators,
}

/// Operator selection shared by `mutate` and `run`
#[derive(Parser, Debug, Clone, Default)]
pub struct OperatorArgs {
    /// Comma-separated operator codes (default: configuration, else all)
    #[arg(short, long, value_delimiter = ',')]
    pub operators: Vec<String>,
}

/// Arguments for the mutate command
#[derive(Parser, Debug)]
pub struct MutateArgs {
    /// Component model (YAML or JSON)
    pub model: PathBuf,

    #[command(flatten)]
    pub selection: OperatorArgs,

    /// Write each mutant to `<dir>/<test-case-id>.yaml`
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: FormatArg,
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Component model (YAML or JSON)
    pub model: PathBuf,

    /// Directory holding `<test-case-id>.strategy` files
    #[arg(short, long)]
    pub strategies: PathBuf,

    #[command(flatten)]
    pub selection: OperatorArgs,

    /// Parallel engine connections
    #[arg(short = 'j', long)]
    pub jobs: Option<usize>,

    /// Strategy step budget per test case
    #[arg(long)]
    pub max_steps: Option<usize>,

    /// Engine call retries
    #[arg(long)]
    pub retries: Option<usize>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: FormatArg,
}

/// Arguments for the check-strategy command
#[derive(Parser, Debug)]
pub struct CheckStrategyArgs {
    /// Strategy file
    pub path: PathBuf,
}

/// Output format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FormatArg {
    #[default]
    Text,
    Json,
}

impl From<FormatArg> for crate::output::OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => Self::Text,
            FormatArg::Json => Self::Json,
        }
    }
}

/// Color argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
