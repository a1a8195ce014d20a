use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::lexical::LexicalFit;
use crate::metrics::{DEFAULT_BOOTSTRAP_ITERATIONS, DEFAULT_FOLD_SEED, DEFAULT_FOLDS};
use crate::optimizer::DEFAULT_GRID_STEP;

pub const DEFAULT_WORK_DIR: &str = ".cache/match-eval";

#[derive(Parser, Debug)]
#[command(
    name = "match-eval",
    version,
    about = "Synthetic benchmark and weight calibration for document match scoring"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Generate(GenerateArgs),
    Benchmark(BenchmarkArgs),
    Optimize(OptimizeArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    #[arg(long, default_value = DEFAULT_WORK_DIR)]
    pub work_dir: PathBuf,

    #[arg(long)]
    pub output: Option<PathBuf>,

    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long, default_value_t = crate::generator::DEFAULT_VARIANTS_PER_TIER)]
    pub variants_per_tier: usize,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum LexicalFitMode {
    PerPair,
    Corpus,
}

impl LexicalFitMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PerPair => "per-pair",
            Self::Corpus => "corpus",
        }
    }
}

impl From<LexicalFitMode> for LexicalFit {
    fn from(mode: LexicalFitMode) -> Self {
        match mode {
            LexicalFitMode::PerPair => LexicalFit::PerPair,
            LexicalFitMode::Corpus => LexicalFit::Corpus,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum IntervalMode {
    Cv,
    Bootstrap,
    None,
}

impl IntervalMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cv => "cv",
            Self::Bootstrap => "bootstrap",
            Self::None => "none",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct BenchmarkArgs {
    #[arg(long, default_value = DEFAULT_WORK_DIR)]
    pub work_dir: PathBuf,

    #[arg(long)]
    pub dataset: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = LexicalFitMode::Corpus)]
    pub lexical_fit: LexicalFitMode,

    #[arg(long)]
    pub model_id: Option<String>,

    /// Directory holding a sentence-transformers export (`bert` feature).
    #[arg(long)]
    pub model_dir: Option<PathBuf>,

    #[arg(long, default_value_t = 0.3)]
    pub alpha: f64,

    #[arg(long, default_value_t = false)]
    pub with_jaccard: bool,

    #[arg(long, default_value_t = false)]
    pub use_calibration: bool,

    #[arg(long, value_enum, default_value_t = IntervalMode::Cv)]
    pub interval: IntervalMode,

    #[arg(long, default_value_t = DEFAULT_FOLDS)]
    pub folds: usize,

    #[arg(long, default_value_t = DEFAULT_BOOTSTRAP_ITERATIONS)]
    pub bootstrap_iterations: usize,

    #[arg(long, default_value_t = DEFAULT_FOLD_SEED)]
    pub seed: u64,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct OptimizeArgs {
    #[arg(long, default_value = DEFAULT_WORK_DIR)]
    pub work_dir: PathBuf,

    #[arg(long)]
    pub dataset: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = LexicalFitMode::Corpus)]
    pub lexical_fit: LexicalFitMode,

    #[arg(long)]
    pub model_id: Option<String>,

    /// Directory holding a sentence-transformers export (`bert` feature).
    #[arg(long)]
    pub model_dir: Option<PathBuf>,

    #[arg(long, default_value_t = DEFAULT_GRID_STEP)]
    pub step: f64,

    #[arg(long, default_value_t = DEFAULT_FOLDS)]
    pub folds: usize,

    #[arg(long, default_value_t = DEFAULT_FOLD_SEED)]
    pub seed: u64,

    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = DEFAULT_WORK_DIR)]
    pub work_dir: PathBuf,
}
