use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "class-loader")]
#[command(about = "Resolve PHP class names against source roots and load their declarations")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Search root; repeat to add more, earlier roots win.
    #[arg(long = "dir", value_name = "PATH")]
    pub dirs: Vec<PathBuf>,

    /// Source file extension (default: php).
    #[arg(long, value_name = "EXT")]
    pub ext: Option<String>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Show which file a class name resolves to, without loading it.
    Find {
        class_name: String,

        #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        #[arg(short = 'o', long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Autoload classes into a fresh runtime and report what got defined.
    Load {
        #[arg(required = true)]
        class_names: Vec<String>,

        #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
    /// Print the canonical search roots.
    Paths,
    /// Build a class map manifest over the search roots.
    Catalog {
        #[arg(short = 'o', long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}
