//! Console summaries and bar charts for the four questions, drawn with Plotters

use crate::analysis::{
    self, IndustryCount, InflationOutcome, RenewalOutcome, RenewalStats, YearlyMedian,
    INDUSTRIES_OF_INTEREST,
};
use crate::data::Datasets;
use plotters::prelude::*;
use std::ops::Range;
use std::path::{Path, PathBuf};

/// Chart file names inside the output directory. Question 3 has no chart.
pub const QUESTION1_CHART: &str = "question1.png";
pub const QUESTION2_CHART: &str = "question2.png";
pub const QUESTION4_CHART: &str = "question4.png";

const CHART_SIZE: (u32, u32) = (800, 600);

const INDUSTRY_COLORS: [RGBColor; 2] = [RGBColor(0x69, 0xb3, 0xa2), RGBColor(0xe7, 0x6f, 0x51)];

/// Viridis, sampled
const RENEWAL_COLORS: [RGBColor; 6] = [
    RGBColor(0x44, 0x01, 0x54),
    RGBColor(0x41, 0x44, 0x87),
    RGBColor(0x2a, 0x78, 0x8e),
    RGBColor(0x22, 0xa8, 0x84),
    RGBColor(0x7a, 0xd1, 0x51),
    RGBColor(0xfd, 0xe7, 0x25),
];

/// Mako, sampled
const PAYMENT_COLORS: [RGBColor; 6] = [
    RGBColor(0x2e, 0x1e, 0x3c),
    RGBColor(0x41, 0x3d, 0x7b),
    RGBColor(0x37, 0x65, 0x9e),
    RGBColor(0x34, 0x92, 0xa8),
    RGBColor(0x49, 0xc1, 0xad),
    RGBColor(0xa4, 0xe0, 0xbb),
];

const NO_OVERLAP_MESSAGE: &str = "No overlapping client IDs found between subscription and industry details. \
     Cannot compute renewal rates by industry from the provided data.";

const NO_MATCH_MESSAGE: &str = "No matching financial information periods found for the renewed subscription dates. \
     Cannot compute average inflation rate from the provided data.";

/// A categorical bar chart: one bar per label
struct BarChart<'a> {
    title: &'a str,
    x_desc: &'a str,
    y_desc: &'a str,
    labels: Vec<String>,
    values: Vec<f64>,
    palette: &'a [RGBColor],
    /// Fixed y range; derived from the values when absent
    y_range: Option<Range<f64>>,
    /// Horizontal gap on each side of a bar, in pixels
    bar_margin: u32,
}

fn draw_bar_chart(spec: &BarChart<'_>, output_path: &Path) -> crate::Result<()> {
    let y_range = spec.y_range.clone().unwrap_or_else(|| {
        let max_value = spec
            .values
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(0.0_f64, f64::max);
        if max_value > 0.0 {
            0.0..max_value * 1.1
        } else {
            0.0..1.0
        }
    });
    let n_bars = spec.labels.len().max(1);
    let labels = &spec.labels;

    let root = BitMapBackend::new(output_path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(spec.title, ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d((0..n_bars).into_segmented(), y_range)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc(spec.x_desc)
        .y_desc(spec.y_desc)
        .axis_desc_style(("sans-serif", 15))
        .x_label_formatter(&|value: &SegmentValue<usize>| match value {
            SegmentValue::CenterOf(idx) => labels.get(*idx).cloned().unwrap_or_default(),
            _ => String::new(),
        })
        .draw()?;

    chart.draw_series(spec.values.iter().enumerate().map(|(idx, &value)| {
        let color = spec.palette[idx % spec.palette.len()];
        let height = if value.is_finite() { value } else { 0.0 };
        let mut bar = Rectangle::new(
            [(SegmentValue::Exact(idx), 0.0), (SegmentValue::Exact(idx + 1), height)],
            color.filled(),
        );
        bar.set_margin(0, 0, spec.bar_margin, spec.bar_margin);
        bar
    }))?;

    root.present()?;
    log::info!("Chart saved to: {}", output_path.display());

    Ok(())
}

/// Create a bar chart of client counts per industry
///
/// # Arguments
/// * `counts` - Question 1 counts, in display order
/// * `output_path` - Path to save the PNG chart
///
/// # Returns
/// * Result indicating success or failure
pub fn create_industry_count_chart(counts: &[IndustryCount], output_path: &Path) -> crate::Result<()> {
    let bar_width_share = 0.5;
    let slot_width = (CHART_SIZE.0 - 80) / counts.len().max(1) as u32;
    draw_bar_chart(
        &BarChart {
            title: "Count of Finance Lending and Block Chain Clients",
            x_desc: "Industry",
            y_desc: "Number of Clients",
            labels: counts.iter().map(|c| c.industry.clone()).collect(),
            values: counts.iter().map(|c| c.count as f64).collect(),
            palette: &INDUSTRY_COLORS,
            y_range: None,
            bar_margin: (slot_width as f64 * (1.0 - bar_width_share) / 2.0) as u32,
        },
        output_path,
    )
}

/// Create a bar chart of renewal rate per industry, y fixed to [0, 1]
///
/// # Arguments
/// * `stats` - Question 2 statistics, one bar per industry
/// * `output_path` - Path to save the PNG chart
pub fn create_renewal_rate_chart(stats: &[RenewalStats], output_path: &Path) -> crate::Result<()> {
    draw_bar_chart(
        &BarChart {
            title: "Renewal Rate by Industry",
            x_desc: "Industry",
            y_desc: "Renewal Rate",
            labels: stats.iter().map(|s| s.industry.clone()).collect(),
            values: stats.iter().map(|s| s.renewal_rate).collect(),
            palette: &RENEWAL_COLORS,
            y_range: Some(0.0..1.0),
            bar_margin: 10,
        },
        output_path,
    )
}

/// Bar chart of the median payment per year
pub fn create_median_payment_chart(medians: &[YearlyMedian], output_path: &Path) -> crate::Result<()> {
    draw_bar_chart(
        &BarChart {
            title: "Median Amount Paid per Year",
            x_desc: "Year",
            y_desc: "Median Amount Paid",
            labels: medians.iter().map(|m| m.year.to_string()).collect(),
            values: medians.iter().map(|m| m.median).collect(),
            palette: &PAYMENT_COLORS,
            y_range: None,
            bar_margin: 10,
        },
        output_path,
    )
}

/// Question 1 console block: heading, then one `industry  count` line each
pub fn format_industry_counts(counts: &[IndustryCount]) -> String {
    let mut out =
        String::from("Question 1: Number of clients by industry (Finance Lending and Block Chain):\n");
    let width = counts.iter().map(|c| c.industry.len()).max().unwrap_or(0);
    for entry in counts {
        out.push_str(&format!("{:<width$}  {}\n", entry.industry, entry.count, width = width));
    }
    out
}

/// Question 2 console block
///
/// # Arguments
/// * `outcome` - Renewal rates, or the no-overlap fallback
/// * `verbose` - Also list total, renewed and rate for every industry
///
/// # Returns
/// * The text to print, ending in a newline
pub fn format_renewal_outcome(outcome: &RenewalOutcome, verbose: bool) -> String {
    let (stats, highest) = match outcome {
        RenewalOutcome::NoOverlap => return format!("Question 2: {}\n", NO_OVERLAP_MESSAGE),
        RenewalOutcome::Rates { stats, highest } => (stats, &stats[*highest]),
    };

    let mut out = String::from("Question 2: Industry with the highest renewal rate:\n");
    out.push_str(&format!(
        "{} with a renewal rate of {:.2}\n",
        highest.industry, highest.renewal_rate
    ));

    if verbose {
        out.push_str("  Industry | Total | Renewed | Rate\n");
        for entry in stats {
            out.push_str(&format!(
                "  {} | {} | {} | {:.2}\n",
                entry.industry, entry.total, entry.renewed_sum, entry.renewal_rate
            ));
        }
    }
    out
}

/// Question 3 console block, or the no-match fallback message
pub fn format_inflation_outcome(outcome: &InflationOutcome, verbose: bool) -> String {
    match outcome {
        InflationOutcome::NoMatch { .. } => format!("Question 3: {}\n", NO_MATCH_MESSAGE),
        InflationOutcome::Average {
            mean,
            matched,
            renewed,
        } => {
            let mut out = format!(
                "Question 3: Average inflation rate for renewed subscriptions:\n{}\n",
                mean
            );
            if verbose {
                out.push_str(&format!(
                    "  {} of {} renewed subscriptions matched a financial period\n",
                    matched, renewed
                ));
            }
            out
        }
    }
}

/// Question 4 console block, one `year  median` line per year
pub fn format_yearly_medians(medians: &[YearlyMedian]) -> String {
    let mut out = String::from("Question 4: Median amount paid each year:\n");
    for entry in medians {
        out.push_str(&format!("{}  {}\n", entry.year, entry.median));
    }
    out
}

/// Answer all four questions in order, printing each summary and writing the charts
///
/// # Arguments
/// * `datasets` - The loaded tables
/// * `output_dir` - Existing directory the charts are written to
/// * `verbose` - Print per-industry and match statistics as well
///
/// # Returns
/// * The chart files written. The renewal chart is skipped when the
///   subscription/industry join is empty.
pub fn generate_question_report(
    datasets: &Datasets,
    output_dir: &Path,
    verbose: bool,
) -> crate::Result<Vec<PathBuf>> {
    let mut charts = Vec::new();

    let counts = analysis::count_industry_clients(datasets, &INDUSTRIES_OF_INTEREST)?;
    print!("{}", format_industry_counts(&counts));
    let path = output_dir.join(QUESTION1_CHART);
    create_industry_count_chart(&counts, &path)?;
    charts.push(path);

    let renewal = analysis::renewal_rates(datasets)?;
    print!("\n{}", format_renewal_outcome(&renewal, verbose));
    if let RenewalOutcome::Rates { stats, .. } = &renewal {
        let path = output_dir.join(QUESTION2_CHART);
        create_renewal_rate_chart(stats, &path)?;
        charts.push(path);
    }

    let inflation = analysis::average_inflation_at_renewal(datasets)?;
    print!("\n{}", format_inflation_outcome(&inflation, verbose));

    let medians = analysis::median_paid_by_year(datasets)?;
    print!("\n{}", format_yearly_medians(&medians));
    let path = output_dir.join(QUESTION4_CHART);
    create_median_payment_chart(&medians, &path)?;
    charts.push(path);

    Ok(charts)
}
