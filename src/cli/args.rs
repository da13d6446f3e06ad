//! Command line argument parsing for the taxis CLI using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

/// Taxis - hierarchical text classification over per-language indexes
#[derive(Parser, Debug, Clone)]
#[command(name = "taxis")]
#[command(about = "Hierarchical text classification over per-language document indexes")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct TaxisArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human", global = true)]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Engine configuration file (JSON)
    #[arg(long, value_name = "CONFIG_FILE", global = true, env = "TAXIS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl TaxisArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1,
                n => n,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Build or extend a language index from a delimited training table
    Build(BuildArgs),

    /// Add one training example
    Add(AddArgs),

    /// Remove examples by id or by category
    Remove(RemoveArgs),

    /// Classify text
    Classify(ClassifyArgs),

    /// Export the category tree
    #[command(name = "export-tree")]
    ExportTree(ExportTreeArgs),

    /// Replace the category tree with one read from a tab-separated file
    #[command(name = "import-tree")]
    ImportTree(ImportTreeArgs),

    /// Show or replace the stop words of a language
    Stopwords(StopwordsArgs),

    /// Remove the write lock left by a writer that did not shut down
    Unlock(UnlockArgs),
}

/// Structure root and language shared by most commands
#[derive(Args, Debug, Clone)]
pub struct Target {
    /// Structure root directory
    #[arg(value_name = "ROOT")]
    pub root: PathBuf,

    /// Index language
    #[arg(short, long, default_value = "en")]
    pub language: String,
}

#[derive(Parser, Debug, Clone)]
pub struct BuildArgs {
    #[command(flatten)]
    pub target: Target,

    /// Training table: category columns followed by the text column
    #[arg(value_name = "TABLE")]
    pub table: PathBuf,

    /// Extra stop words merged into the stored list
    #[arg(long, value_name = "FILE")]
    pub stop_words: Option<PathBuf>,

    /// Also index every category name as an example of itself
    #[arg(long)]
    pub index_category_names: bool,

    /// Column delimiter (defaults to the configured one)
    #[arg(short, long)]
    pub delimiter: Option<char>,

    /// Train the tree once the index is built
    #[arg(long)]
    pub train: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct AddArgs {
    #[command(flatten)]
    pub target: Target,

    /// Example text
    #[arg(value_name = "TEXT")]
    pub text: String,

    /// Category names from the first level down
    #[arg(short = 'c', long = "category", required = true, num_args = 1..=4)]
    pub categories: Vec<String>,

    /// Number of copies to store
    #[arg(short, long, default_value = "1")]
    pub replication: i32,

    /// Store the text as given instead of its analyzed form
    #[arg(long)]
    pub no_tokenize: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct RemoveArgs {
    #[command(flatten)]
    pub target: Target,

    /// Document ids to remove from the language index
    #[arg(long = "id", conflicts_with = "categories")]
    pub ids: Vec<String>,

    /// Remove every example below this category path, in every language
    #[arg(short = 'c', long = "category", num_args = 1..=4)]
    pub categories: Vec<String>,

    /// With --category, also remove the node from the tree
    #[arg(long, requires = "categories")]
    pub prune: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct ClassifyArgs {
    #[command(flatten)]
    pub target: Target,

    /// Texts to classify
    #[arg(value_name = "TEXT")]
    pub texts: Vec<String>,

    /// Read texts from a file, one per line
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Confidence needed to descend a level (defaults to the configured one)
    #[arg(short, long)]
    pub threshold: Option<f64>,

    /// Use the nearest-neighbour classifiers
    #[arg(long)]
    pub knn: bool,

    /// Neighbour count for new nodes (defaults to the configured one)
    #[arg(short)]
    pub k: Option<usize>,

    /// Rewrite every index with fresh ids before classifying
    #[arg(long)]
    pub reindex: bool,

    /// Worker threads for batch input
    #[arg(short, long)]
    pub workers: Option<usize>,
}

#[derive(Parser, Debug, Clone)]
pub struct ExportTreeArgs {
    /// Structure root directory
    #[arg(value_name = "ROOT")]
    pub root: PathBuf,

    /// Output file (stdout if omitted)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Tree format
    #[arg(long, default_value = "xml")]
    pub tree_format: TreeFormat,
}

#[derive(Parser, Debug, Clone)]
pub struct ImportTreeArgs {
    /// Structure root directory
    #[arg(value_name = "ROOT")]
    pub root: PathBuf,

    /// Tab-separated file, one leaf path per row
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

#[derive(Parser, Debug, Clone)]
pub struct UnlockArgs {
    #[command(flatten)]
    pub target: Target,
}

#[derive(Parser, Debug, Clone)]
pub struct StopwordsArgs {
    #[command(flatten)]
    pub target: Target,

    /// Replace the custom stop words with the words of this file
    #[arg(long, value_name = "FILE")]
    pub set: Option<PathBuf>,

    /// List the built-in stop words instead of the effective ones
    #[arg(long, conflicts_with = "set")]
    pub defaults: bool,
}

/// Output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

/// Category tree file formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeFormat {
    Xml,
    Csv,
}
