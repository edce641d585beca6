//! Command-line argument parsing.

use clap::Parser;
use std::path::PathBuf;

/// Compile Vue single-file components and Sass stylesheets through an
/// embedded compiler
#[derive(Parser, Debug, Clone)]
#[command(name = "sfc-build")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Components, stylesheets or directories to build
    #[arg(required = true)]
    pub entries: Vec<PathBuf>,

    /// Path to the bundled compiler script
    #[arg(short, long, env = "SFC_COMPILER_JS")]
    pub compiler: PathBuf,

    /// Generate server-side render code
    #[arg(long)]
    pub ssr: bool,

    /// Development build (`import.meta.env.PROD` is false)
    #[arg(long)]
    pub dev: bool,

    /// Inline source maps into component scripts
    #[arg(long)]
    pub sourcemap: bool,

    /// Path to tsconfig.json, for path aliases
    #[arg(short = 'p', long)]
    pub tsconfig: Option<PathBuf>,

    /// Number of compiler instances
    #[arg(long)]
    pub workers: Option<usize>,

    /// Output format
    #[arg(long, default_value = "human")]
    pub output: OutputFormat,

    /// Print every generated module
    #[arg(long)]
    pub print_modules: bool,

    /// Ignore patterns (glob)
    #[arg(long)]
    pub ignore: Vec<String>,

    /// Rebuild when files change
    #[arg(short, long)]
    pub watch: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Output format for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    #[default]
    Human,
    /// One JSON object per line
    Json,
}

impl Args {
    /// The default log filter.
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "warn"
        }
    }
}
