//! Data loading for the four input tables using Polars
//!
//! Each loader scans one CSV file, applies the date parsing and boolean
//! coercion its table needs, and collects it into a `DataFrame`. The frames
//! are read-only after loading; per-question derived values are built by the
//! analysis functions as new owned results.

use anyhow::Context;
use chrono::NaiveDate;
use polars::prelude::*;
use std::path::{Path, PathBuf};

/// Financial periods with their inflation rate (file name kept as shipped)
pub const FINANCIAL_FILE: &str = "finanical_information.csv";
/// Client to industry mapping
pub const INDUSTRY_FILE: &str = "industry_client_details.csv";
/// Individual payments
pub const PAYMENT_FILE: &str = "payment_information.csv";
/// Subscriptions and their renewal flag
pub const SUBSCRIPTION_FILE: &str = "subscription_information.csv";

/// Payment dates are always month/day/4-digit-year
const PAYMENT_DATE_FORMAT: &str = "%m/%d/%Y";

/// Locations of the four input files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub financial: PathBuf,
    pub industries: PathBuf,
    pub payments: PathBuf,
    pub subscriptions: PathBuf,
}

impl DataPaths {
    /// Resolve the fixed file names inside `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            financial: dir.join(FINANCIAL_FILE),
            industries: dir.join(INDUSTRY_FILE),
            payments: dir.join(PAYMENT_FILE),
            subscriptions: dir.join(SUBSCRIPTION_FILE),
        }
    }
}

/// The four loaded tables
#[derive(Debug, Clone)]
pub struct Datasets {
    /// start_date, end_date (Date), inflation_rate (f64)
    pub financial: DataFrame,
    /// client_id (str), industry (str)
    pub industries: DataFrame,
    /// client_id, payment_date (Date), amount_paid (f64), payment_method
    pub payments: DataFrame,
    /// client_id (str), start_date, end_date (Date), renewed (bool)
    pub subscriptions: DataFrame,
}

/// An inflation rate valid over the closed interval [start_date, end_date]
#[derive(Debug, Clone, PartialEq)]
pub struct FinancialPeriod {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub inflation_rate: Option<f64>,
}

impl FinancialPeriod {
    /// Inclusive on both ends. A period with a missing bound contains nothing.
    pub fn contains(&self, date: NaiveDate) -> bool {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => start <= date && date <= end,
            _ => false,
        }
    }
}

/// One subscription row
#[derive(Debug, Clone, PartialEq)]
pub struct Subscription {
    pub client_id: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub renewed: bool,
}

impl Datasets {
    /// Financial periods in table order
    pub fn financial_periods(&self) -> crate::Result<Vec<FinancialPeriod>> {
        let df = &self.financial;
        let start_dates = date_values(df, "start_date")?;
        let end_dates = date_values(df, "end_date")?;
        let rates: Vec<Option<f64>> = df.column("inflation_rate")?.f64()?.into_iter().collect();

        let periods = start_dates
            .into_iter()
            .zip(end_dates)
            .zip(rates)
            .map(|((start_date, end_date), inflation_rate)| FinancialPeriod {
                start_date,
                end_date,
                inflation_rate,
            })
            .collect();
        Ok(periods)
    }

    /// Subscriptions in table order
    pub fn subscription_records(&self) -> crate::Result<Vec<Subscription>> {
        let df = &self.subscriptions;
        let client_ids: Vec<Option<String>> = df
            .column("client_id")?
            .str()?
            .into_iter()
            .map(|id| id.map(str::to_owned))
            .collect();
        let start_dates = date_values(df, "start_date")?;
        let end_dates = date_values(df, "end_date")?;
        let renewed: Vec<bool> = df
            .column("renewed")?
            .bool()?
            .into_iter()
            .map(|flag| flag.unwrap_or(false))
            .collect();

        let records = client_ids
            .into_iter()
            .zip(start_dates)
            .zip(end_dates)
            .zip(renewed)
            .map(|(((client_id, start_date), end_date), renewed)| Subscription {
                client_id,
                start_date,
                end_date,
                renewed,
            })
            .collect();
        Ok(records)
    }
}

/// Load all four tables, failing on the first missing file or bad date
pub fn load_datasets(paths: &DataPaths) -> crate::Result<Datasets> {
    let datasets = Datasets {
        financial: load_financial(&paths.financial)?,
        industries: load_industries(&paths.industries)?,
        payments: load_payments(&paths.payments)?,
        subscriptions: load_subscriptions(&paths.subscriptions)?,
    };

    log::info!(
        "Loaded {} financial periods, {} industry clients, {} payments, {} subscriptions",
        datasets.financial.height(),
        datasets.industries.height(),
        datasets.payments.height(),
        datasets.subscriptions.height()
    );

    Ok(datasets)
}

/// Load financial periods, parsing both interval bounds as dates
pub fn load_financial(path: &Path) -> crate::Result<DataFrame> {
    let lf = scan_csv(path)?.with_columns([col("inflation_rate").cast(DataType::Float64)]);
    with_calendar_dates(lf, &["start_date", "end_date"], path)
}

/// Load the client to industry mapping
pub fn load_industries(path: &Path) -> crate::Result<DataFrame> {
    scan_csv(path)?
        .with_columns([col("client_id").cast(DataType::String)])
        .collect()
        .with_context(|| format!("failed to parse {}", path.display()))
}

/// Load payments; any payment date not in month/day/year form is fatal
pub fn load_payments(path: &Path) -> crate::Result<DataFrame> {
    scan_csv(path)?
        .with_columns([
            col("payment_date").str().to_date(StrptimeOptions {
                format: Some(PlSmallStr::from(PAYMENT_DATE_FORMAT)),
                strict: true,
                exact: true,
                cache: true,
            }),
            col("amount_paid").cast(DataType::Float64),
        ])
        .collect()
        .with_context(|| format!("failed to parse {}", path.display()))
}

/// Load subscriptions and reduce `renewed` to a strict boolean
pub fn load_subscriptions(path: &Path) -> crate::Result<DataFrame> {
    let lf = scan_csv(path)?.with_columns([
        col("client_id").cast(DataType::String),
        renewed_flag(),
    ]);
    with_calendar_dates(lf, &["start_date", "end_date"], path)
}

/// Schema inference reads the whole file, so a late `12.5` or text id
/// widens the column instead of failing the load.
fn scan_csv(path: &Path) -> crate::Result<LazyFrame> {
    if !path.exists() {
        anyhow::bail!("input file not found: {}", path.display());
    }

    LazyCsvReader::new(path)
        .with_has_header(true)
        .with_infer_schema_length(None)
        .finish()
        .with_context(|| format!("failed to read {}", path.display()))
}

/// Parse `columns` as calendar dates and collect the frame
///
/// # Arguments
/// * `lf` - Scanned table with the date columns still as text
/// * `columns` - Names of the date columns
/// * `path` - Source file, for error messages
///
/// # Returns
/// * The collected frame, or an error if any non-blank cell is not a date
fn with_calendar_dates(lf: LazyFrame, columns: &[&str], path: &Path) -> crate::Result<DataFrame> {
    let mut exprs = Vec::with_capacity(columns.len() * 2);
    for name in columns {
        exprs.push(calendar_date(name).alias(*name));
        exprs.push(
            col(*name)
                .is_not_null()
                .and(calendar_date(name).is_null())
                .alias(unparsed_flag(name)),
        );
    }

    let mut df = lf
        .with_columns(exprs)
        .collect()
        .with_context(|| format!("failed to parse {}", path.display()))?;

    for name in columns {
        let flag = unparsed_flag(name);
        let unparsed = df.column(&flag)?.bool()?.num_trues();
        if unparsed > 0 {
            anyhow::bail!(
                "failed to parse {}: {} value(s) in column '{}' are not dates",
                path.display(),
                unparsed,
                name
            );
        }
        df = df.drop(&flag)?;
    }

    Ok(df)
}

/// ISO `YYYY-MM-DD` (a time suffix is ignored), else month-first `MM/DD/YYYY`
fn calendar_date(name: &str) -> Expr {
    let iso = lenient_date(name, "%Y-%m-%d", false);
    let month_first = lenient_date(name, "%m/%d/%Y", true);
    when(iso.clone().is_not_null())
        .then(iso)
        .otherwise(month_first)
}

fn lenient_date(name: &str, format: &str, exact: bool) -> Expr {
    col(name).cast(DataType::String).str().to_date(StrptimeOptions {
        format: Some(PlSmallStr::from(format)),
        strict: false,
        exact,
        cache: true,
    })
}

fn unparsed_flag(name: &str) -> String {
    format!("{}_unparsed", name)
}

/// TRUE in any casing is true; everything else, blanks included, is false
fn renewed_flag() -> Expr {
    col("renewed")
        .cast(DataType::String)
        .str()
        .to_uppercase()
        .eq(lit("TRUE"))
        .fill_null(lit(false))
        .alias("renewed")
}

fn date_values(df: &DataFrame, name: &str) -> crate::Result<Vec<Option<NaiveDate>>> {
    let dates = df
        .column(name)?
        .as_materialized_series()
        .date()?
        .as_date_iter()
        .collect();
    Ok(dates)
}

pub(crate) fn string_values(df: &DataFrame, name: &str) -> crate::Result<Vec<String>> {
    let values = df
        .column(name)?
        .str()?
        .into_no_null_iter()
        .map(str::to_owned)
        .collect();
    Ok(values)
}

pub(crate) fn count_values(df: &DataFrame, name: &str) -> crate::Result<Vec<u64>> {
    let values = df
        .column(name)?
        .cast(&DataType::UInt64)?
        .u64()?
        .into_no_null_iter()
        .collect();
    Ok(values)
}
