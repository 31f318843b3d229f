pub mod ask;
pub mod config;
pub mod run;
pub mod triples;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "quarry",
    about = "Turn documents into chunks, entities and knowledge triples",
    version
)]
pub struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(long, global = true, env = "QUARRY_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run every stage over a document set and print the export record
    Run(RunArgs),
    /// Validate a `subject|predicate|object` file and print accepted triples
    Triples {
        /// Delimited triple file, one record per line
        file: PathBuf,
    },
    /// Ask the insight service a question
    Ask {
        /// Question text
        question: String,
        /// Override the configured endpoint
        #[arg(long)]
        endpoint: Option<String>,
    },
    /// Print the effective configuration
    Config,
}

#[derive(Args)]
pub struct RunArgs {
    /// Files or directories to ingest
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Institution tag
    #[arg(long)]
    pub institution: Option<String>,
    /// Document type tag
    #[arg(long = "doc-type")]
    pub doc_type: Option<String>,
    /// Year tag
    #[arg(long)]
    pub year: Option<String>,

    /// Use these chunks (blank-line separated) instead of automatic chunking
    #[arg(long)]
    pub chunks: Option<PathBuf>,
    /// Use these entities (comma separated) instead of extraction
    #[arg(long)]
    pub entities: Option<PathBuf>,
    /// Use these delimited triples instead of extraction
    #[arg(long)]
    pub triples: Option<PathBuf>,

    /// Write the export here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Single-line JSON
    #[arg(long)]
    pub compact: bool,
}
