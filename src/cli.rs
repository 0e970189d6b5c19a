//! Command-line interface definitions and argument parsing

use clap::Parser;

/// Directory the four input CSV files are read from
pub const DATA_DIR: &str = ".";

/// Directory the PNG charts are written to (created if missing)
pub const OUTPUT_DIR: &str = "visuals";

/// Answer client, renewal, inflation and payment questions from four CSV files
///
/// Inputs are read from the working directory and charts written to `visuals/`.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}
