use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about = "GxP requirement-to-test traceability toolkit")]
pub struct Cli {
    /// Path to a gxptrace.yaml configuration file
    #[clap(long, short = 'c')]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check requirement coverage and test identifier uniqueness
    Coverage {
        /// Directory containing specification files
        #[clap(long, short = 's')]
        spec_dir: Option<PathBuf>,

        /// Directory containing test source files
        #[clap(long, short = 't')]
        test_dir: Option<PathBuf>,

        /// Write a markdown report to this path
        #[clap(long, short = 'o')]
        output: Option<PathBuf>,

        /// Exit with an error code if any issues are found
        #[clap(long, short = 'S')]
        strict: bool,

        /// Enable verbose output
        #[clap(long, short = 'v')]
        verbose: bool,

        /// Output results as JSON
        #[clap(long)]
        json: bool,
    },

    /// Generate test cases from specifications
    Generate {
        /// Directory containing specification files
        #[clap(long, short = 's')]
        spec_dir: Option<PathBuf>,

        /// Output format (json, md)
        #[clap(long, short = 'f', default_value = "json")]
        format: String,

        /// Output file path
        #[clap(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Build the traceability matrix and write reports
    Matrix {
        /// Directory containing specification files
        #[clap(long, short = 's')]
        spec_dir: Option<PathBuf>,

        /// JSON file of test results to fold into the matrix
        #[clap(long, short = 'r')]
        results: Option<PathBuf>,

        /// Comma-separated output formats (csv, json, md)
        #[clap(long, short = 'f')]
        formats: Option<String>,

        /// Directory reports are written into
        #[clap(long, short = 'o')]
        output_dir: Option<PathBuf>,

        /// Exit with an error code if any requirement lacks coverage
        #[clap(long, short = 'S')]
        strict: bool,
    },
}
