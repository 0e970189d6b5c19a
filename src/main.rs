//! Renewal Insights: runs the four questions against the CSV files in the
//! working directory and writes the charts to `visuals/`.

use anyhow::{Context, Result};
use clap::Parser;
use renewal_insights::cli::{DATA_DIR, OUTPUT_DIR};
use renewal_insights::{generate_question_report, load_datasets, Args, DataPaths};
use std::fs;
use std::path::Path;
use std::time::Instant;

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    run_pipeline(&args)
}

fn run_pipeline(args: &Args) -> Result<()> {
    if args.verbose {
        println!("Renewal Insights - client, renewal, inflation and payment questions");
        println!("===================================================================\n");
    }

    let start_time = Instant::now();
    let output_dir = Path::new(OUTPUT_DIR);

    fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output directory {}", output_dir.display()))?;

    let paths = DataPaths::in_dir(DATA_DIR);
    if args.verbose {
        println!("Loading data from: {}", Path::new(DATA_DIR).display());
    }

    let load_start = Instant::now();
    let datasets = load_datasets(&paths)?;
    if args.verbose {
        println!(
            "✓ Data loaded: {} financial periods, {} industry clients, {} payments, {} subscriptions",
            datasets.financial.height(),
            datasets.industries.height(),
            datasets.payments.height(),
            datasets.subscriptions.height()
        );
        println!("  Loading time: {:.2}s\n", load_start.elapsed().as_secs_f64());
    }

    let charts = generate_question_report(&datasets, output_dir, args.verbose)?;

    if args.verbose {
        println!("\n=== Pipeline Complete ===");
        println!("Total processing time: {:.2}s", start_time.elapsed().as_secs_f64());
        for chart in &charts {
            println!("Chart saved to: {}", chart.display());
        }
    }

    Ok(())
}
