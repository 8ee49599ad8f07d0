use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::model::StrategyKind;

#[derive(Parser, Debug)]
#[command(
    name = "wsx",
    version,
    about = "Exercise extraction from OCR'd worksheet text"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Extract(ExtractArgs),
    Normalize(NormalizeArgs),
    Batch(BatchArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct PolicyArgs {
    #[arg(long, value_enum)]
    pub policy: Option<PolicyPreset>,

    /// Explicit strategy order; overrides --policy when given.
    #[arg(long = "strategy", value_enum)]
    pub strategies: Vec<StrategyKind>,

    #[arg(long, default_value_t = false)]
    pub dedupe_fractions: bool,

    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    /// Page text to read, `-` for stdin.
    #[arg(long, default_value = "-")]
    pub input: PathBuf,

    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Print the full report instead of the exercise list.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    #[command(flatten)]
    pub extraction: PolicyArgs,
}

#[derive(Args, Debug, Clone)]
pub struct NormalizeArgs {
    #[arg(long, default_value = "-")]
    pub input: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct BatchArgs {
    #[arg(long)]
    pub input_dir: PathBuf,

    #[arg(long, default_value = "txt")]
    pub extension: String,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    #[command(flatten)]
    pub extraction: PolicyArgs,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum PolicyPreset {
    TwoPhase,
    Full,
}

impl PolicyPreset {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TwoPhase => "two-phase",
            Self::Full => "full",
        }
    }
}
