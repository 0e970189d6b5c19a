//! The four business questions, each a read-only pass over the loaded tables
//!
//! Every function here takes `&Datasets` and returns a freshly owned result.
//! Derived columns (joined rows, payment years, matched inflation rates) only
//! live inside the function that builds them.

use crate::data::{count_values, string_values, Datasets, FinancialPeriod};
use chrono::NaiveDate;
use polars::prelude::*;

/// Industries counted by question 1
pub const INDUSTRIES_OF_INTEREST: [&str; 2] = ["Finance Lending", "Block Chain"];

/// Number of clients in one industry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndustryCount {
    pub industry: String,
    pub count: u64,
}

/// Renewal statistics for one industry
#[derive(Debug, Clone, PartialEq)]
pub struct RenewalStats {
    pub industry: String,
    /// Joined subscription rows in this industry
    pub total: u64,
    /// How many of them were renewed
    pub renewed_sum: u64,
    /// `renewed_sum / total`, always within [0, 1]
    pub renewal_rate: f64,
}

/// Result of question 2
#[derive(Debug, Clone, PartialEq)]
pub enum RenewalOutcome {
    /// No subscription shares a client_id with the industry table
    NoOverlap,
    /// Per-industry statistics ordered by industry, and the index of the highest rate
    Rates {
        stats: Vec<RenewalStats>,
        highest: usize,
    },
}

impl RenewalOutcome {
    /// Industry with the highest renewal rate, if any rates were computed
    pub fn highest(&self) -> Option<&RenewalStats> {
        match self {
            Self::NoOverlap => None,
            Self::Rates { stats, highest } => stats.get(*highest),
        }
    }
}

/// Result of question 3
#[derive(Debug, Clone, PartialEq)]
pub enum InflationOutcome {
    /// No renewed subscription ended inside any financial period
    NoMatch { renewed: usize },
    /// Mean inflation rate over the renewed subscriptions that matched a period
    Average {
        mean: f64,
        matched: usize,
        renewed: usize,
    },
}

/// Median payment for one calendar year
#[derive(Debug, Clone, PartialEq)]
pub struct YearlyMedian {
    pub year: i32,
    /// NaN when every amount in the year is missing
    pub median: f64,
}

/// Question 1: clients per industry, restricted to `interest`
///
/// Ordered by count descending; equal counts keep the order in which the
/// industries first appear in the table.
///
/// # Arguments
/// * `datasets` - The loaded tables
/// * `interest` - Industry labels to count; all others are dropped
///
/// # Returns
/// * One `IndustryCount` per industry present, empty if none match
pub fn count_industry_clients(
    datasets: &Datasets,
    interest: &[&str],
) -> crate::Result<Vec<IndustryCount>> {
    let in_interest = interest
        .iter()
        .map(|label| col("industry").eq(lit(*label)))
        .reduce(|acc, expr| acc.or(expr))
        .unwrap_or_else(|| lit(false));

    let counted = datasets
        .industries
        .clone()
        .lazy()
        .filter(in_interest)
        .group_by_stable([col("industry")])
        .agg([len().alias("count")])
        .collect()?;

    let industries = string_values(&counted, "industry")?;
    let counts = count_values(&counted, "count")?;

    let mut result: Vec<IndustryCount> = industries
        .into_iter()
        .zip(counts)
        .map(|(industry, count)| IndustryCount { industry, count })
        .collect();
    // Stable: ties stay in first-encountered order
    result.sort_by(|a, b| b.count.cmp(&a.count));

    log::debug!(
        "Industry filter kept {} clients in {} industries",
        result.iter().map(|c| c.count).sum::<u64>(),
        result.len()
    );

    Ok(result)
}

/// Question 2: renewal rate per industry and the industry with the highest rate
pub fn renewal_rates(datasets: &Datasets) -> crate::Result<RenewalOutcome> {
    let joined = datasets
        .subscriptions
        .clone()
        .lazy()
        .join(
            datasets.industries.clone().lazy(),
            [col("client_id")],
            [col("client_id")],
            JoinArgs::new(JoinType::Inner),
        )
        .collect()?;

    log::debug!("Subscription/industry join produced {} rows", joined.height());
    if joined.height() == 0 {
        return Ok(RenewalOutcome::NoOverlap);
    }

    let grouped = joined
        .lazy()
        .filter(col("industry").is_not_null())
        .group_by([col("industry")])
        .agg([
            len().alias("total"),
            col("renewed").cast(DataType::UInt32).sum().alias("renewed_sum"),
        ])
        .sort(["industry"], Default::default())
        .collect()?;

    let industries = string_values(&grouped, "industry")?;
    let totals = count_values(&grouped, "total")?;
    let renewed_sums = count_values(&grouped, "renewed_sum")?;

    let stats: Vec<RenewalStats> = industries
        .into_iter()
        .zip(totals)
        .zip(renewed_sums)
        .map(|((industry, total), renewed_sum)| RenewalStats {
            industry,
            total,
            renewed_sum,
            renewal_rate: renewed_sum as f64 / total as f64,
        })
        .collect();

    match index_of_highest_rate(&stats) {
        Some(highest) => Ok(RenewalOutcome::Rates { stats, highest }),
        None => Ok(RenewalOutcome::NoOverlap),
    }
}

/// First index holding the maximum renewal rate
fn index_of_highest_rate(stats: &[RenewalStats]) -> Option<usize> {
    let mut highest: Option<usize> = None;
    for (idx, entry) in stats.iter().enumerate() {
        match highest {
            Some(best) if entry.renewal_rate <= stats[best].renewal_rate => {}
            _ => highest = Some(idx),
        }
    }
    highest
}

/// Question 3: mean inflation rate at the end date of renewed subscriptions
///
/// # Arguments
/// * `datasets` - The loaded tables
///
/// # Returns
/// * `InflationOutcome::Average` over the matched subscriptions, or
///   `InflationOutcome::NoMatch` when no end date falls inside a period
pub fn average_inflation_at_renewal(datasets: &Datasets) -> crate::Result<InflationOutcome> {
    let periods = datasets.financial_periods()?;
    let renewed_end_dates: Vec<Option<NaiveDate>> = datasets
        .subscription_records()?
        .into_iter()
        .filter(|subscription| subscription.renewed)
        .map(|subscription| subscription.end_date)
        .collect();

    let rates: Vec<Option<f64>> = renewed_end_dates
        .iter()
        .map(|end_date| end_date.and_then(|date| inflation_for_date(date, &periods)))
        .collect();

    let renewed = rates.len();
    let matched = rates.iter().filter(|rate| is_present(**rate)).count();
    log::debug!(
        "{} of {} renewed subscriptions fall inside a financial period",
        matched,
        renewed
    );

    Ok(match mean_ignoring_missing(&rates) {
        Some(mean) => InflationOutcome::Average {
            mean,
            matched,
            renewed,
        },
        None => InflationOutcome::NoMatch { renewed },
    })
}

/// Inflation rate of the first period, in table order, containing `date`
///
/// Periods may overlap; only the first containing one counts, even when its
/// rate is missing.
pub fn inflation_for_date(date: NaiveDate, periods: &[FinancialPeriod]) -> Option<f64> {
    periods
        .iter()
        .find(|period| period.contains(date))
        .and_then(|period| period.inflation_rate)
}

/// Arithmetic mean over the present, non-NaN values; `None` when there are none
pub fn mean_ignoring_missing(values: &[Option<f64>]) -> Option<f64> {
    let (sum, count) = values
        .iter()
        .filter(|value| is_present(**value))
        .flatten()
        .fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));

    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

fn is_present(value: Option<f64>) -> bool {
    matches!(value, Some(v) if !v.is_nan())
}

/// Question 4: median amount paid per calendar year, ascending by year
pub fn median_paid_by_year(datasets: &Datasets) -> crate::Result<Vec<YearlyMedian>> {
    let grouped = datasets
        .payments
        .clone()
        .lazy()
        .with_columns([col("payment_date").dt().year().alias("year")])
        .filter(col("year").is_not_null())
        .group_by([col("year")])
        .agg([col("amount_paid").median().alias("median_paid")])
        .sort(["year"], Default::default())
        .collect()?;

    let years: Vec<i32> = grouped
        .column("year")?
        .cast(&DataType::Int32)?
        .i32()?
        .into_no_null_iter()
        .collect();
    let medians: Vec<f64> = grouped
        .column("median_paid")?
        .cast(&DataType::Float64)?
        .f64()?
        .into_iter()
        .map(|median| median.unwrap_or(f64::NAN))
        .collect();

    let result = years
        .into_iter()
        .zip(medians)
        .map(|(year, median)| YearlyMedian { year, median })
        .collect();
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn period(start: NaiveDate, end: NaiveDate, rate: f64) -> FinancialPeriod {
        FinancialPeriod {
            start_date: Some(start),
            end_date: Some(end),
            inflation_rate: Some(rate),
        }
    }

    fn industries(rows: &[(&str, &str)]) -> DataFrame {
        let ids: Vec<&str> = rows.iter().map(|(id, _)| *id).collect();
        let labels: Vec<&str> = rows.iter().map(|(_, industry)| *industry).collect();
        df!("client_id" => ids, "industry" => labels).unwrap()
    }

    fn subscriptions(rows: &[(&str, bool)]) -> DataFrame {
        let ids: Vec<&str> = rows.iter().map(|(id, _)| *id).collect();
        let renewed: Vec<bool> = rows.iter().map(|(_, renewed)| *renewed).collect();
        df!("client_id" => ids, "renewed" => renewed).unwrap()
    }

    fn datasets(industries: DataFrame, subscriptions: DataFrame) -> Datasets {
        Datasets {
            financial: DataFrame::empty(),
            industries,
            payments: DataFrame::empty(),
            subscriptions,
        }
    }

    #[test]
    fn test_count_industry_clients() {
        let data = datasets(
            industries(&[
                ("1", "Block Chain"),
                ("2", "Finance Lending"),
                ("3", "Finance Lending"),
                ("4", "Retail"),
            ]),
            DataFrame::empty(),
        );

        let counts = count_industry_clients(&data, &INDUSTRIES_OF_INTEREST).unwrap();
        assert_eq!(
            counts,
            vec![
                IndustryCount { industry: "Finance Lending".to_string(), count: 2 },
                IndustryCount { industry: "Block Chain".to_string(), count: 1 },
            ]
        );
    }

    #[test]
    fn test_count_ties_keep_first_seen_order() {
        let data = datasets(
            industries(&[("1", "Block Chain"), ("2", "Finance Lending")]),
            DataFrame::empty(),
        );

        let counts = count_industry_clients(&data, &INDUSTRIES_OF_INTEREST).unwrap();
        let labels: Vec<&str> = counts.iter().map(|c| c.industry.as_str()).collect();
        assert_eq!(labels, vec!["Block Chain", "Finance Lending"]);
    }

    #[test]
    fn test_count_with_no_interesting_rows_is_empty() {
        let data = datasets(industries(&[("1", "Retail")]), DataFrame::empty());
        let counts = count_industry_clients(&data, &INDUSTRIES_OF_INTEREST).unwrap();
        assert!(counts.is_empty());
    }

    #[test]
    fn test_renewal_rate_counts_every_subscription() {
        let data = datasets(
            industries(&[("c1", "Tech")]),
            subscriptions(&[("c1", true), ("c1", false)]),
        );

        let outcome = renewal_rates(&data).unwrap();
        let highest = outcome.highest().unwrap();
        assert_eq!(highest.industry, "Tech");
        assert_eq!(highest.total, 2);
        assert_eq!(highest.renewed_sum, 1);
        assert_relative_eq!(highest.renewal_rate, 0.5);
    }

    #[test]
    fn test_highest_renewal_rate() {
        let data = datasets(
            industries(&[("1", "Retail"), ("2", "Gaming"), ("3", "AI")]),
            subscriptions(&[
                ("1", true),
                ("1", false),
                ("2", true),
                ("2", true),
                ("3", false),
                ("9", true),
            ]),
        );

        let outcome = renewal_rates(&data).unwrap();
        let RenewalOutcome::Rates { stats, .. } = &outcome else {
            panic!("expected rates, got {:?}", outcome);
        };
        let labels: Vec<&str> = stats.iter().map(|s| s.industry.as_str()).collect();
        assert_eq!(labels, vec!["AI", "Gaming", "Retail"]);
        assert!(stats.iter().all(|s| (0.0..=1.0).contains(&s.renewal_rate)));

        let highest = outcome.highest().unwrap();
        assert_eq!(highest.industry, "Gaming");
        assert!(stats.iter().all(|s| highest.renewal_rate >= s.renewal_rate));
    }

    #[test]
    fn test_renewal_rate_without_overlap() {
        let data = datasets(
            industries(&[("1", "Retail")]),
            subscriptions(&[("2", true)]),
        );

        assert_eq!(renewal_rates(&data).unwrap(), RenewalOutcome::NoOverlap);
    }

    #[test]
    fn test_highest_rate_tie_keeps_first() {
        let stats = vec![
            RenewalStats { industry: "A".into(), total: 2, renewed_sum: 1, renewal_rate: 0.5 },
            RenewalStats { industry: "B".into(), total: 4, renewed_sum: 2, renewal_rate: 0.5 },
        ];
        assert_eq!(index_of_highest_rate(&stats), Some(0));
        assert_eq!(index_of_highest_rate(&[]), None);
    }

    #[test]
    fn test_inflation_lookup_boundaries() {
        let periods = vec![
            period(date(2020, 1, 1), date(2020, 6, 30), 1.5),
            period(date(2020, 7, 1), date(2020, 12, 31), 2.5),
        ];

        assert_eq!(inflation_for_date(date(2020, 1, 1), &periods), Some(1.5));
        assert_eq!(inflation_for_date(date(2020, 6, 30), &periods), Some(1.5));
        assert_eq!(inflation_for_date(date(2020, 7, 1), &periods), Some(2.5));
        assert_eq!(inflation_for_date(date(2021, 1, 1), &periods), None);
    }

    #[test]
    fn test_inflation_lookup_prefers_first_overlapping_period() {
        let periods = vec![
            period(date(2020, 3, 1), date(2020, 9, 30), 4.0),
            period(date(2020, 1, 1), date(2020, 12, 31), 1.0),
        ];

        assert_eq!(inflation_for_date(date(2020, 5, 5), &periods), Some(4.0));
        assert_eq!(inflation_for_date(date(2020, 2, 1), &periods), Some(1.0));
    }

    #[test]
    fn test_mean_ignores_missing_values() {
        assert_eq!(mean_ignoring_missing(&[Some(1.0), None, Some(3.0)]), Some(2.0));
        assert_eq!(mean_ignoring_missing(&[Some(f64::NAN), Some(4.0)]), Some(4.0));
        assert_eq!(mean_ignoring_missing(&[None, None]), None);
        assert_eq!(mean_ignoring_missing(&[]), None);
    }
}
