//! Renewal Insights: answers four fixed business questions over client,
//! subscription, payment and financial-period CSV files
//!
//! The pipeline loads the four tables once with Polars, answers each question
//! as an independent read-only pass, prints a summary per question and draws
//! bar charts with Plotters.

pub mod analysis;
pub mod cli;
pub mod data;
pub mod viz;

// Re-export public items for easier access
pub use analysis::{
    average_inflation_at_renewal, count_industry_clients, median_paid_by_year, renewal_rates,
    InflationOutcome, RenewalOutcome, INDUSTRIES_OF_INTEREST,
};
pub use cli::Args;
pub use data::{load_datasets, DataPaths, Datasets};
pub use viz::generate_question_report;

/// Common result type used throughout the application
pub type Result<T> = anyhow::Result<T>;
