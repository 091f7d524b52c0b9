use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Result;

use crate::config::OutputConfig;
use crate::errors::MiramarkError;
use crate::types::{RunOutcome, SuiteResults};

const TITLE: &str = "# MiraMark Results";
const ALL_FAILED: &str = "No results. All runs failed.";
const DNF: &str = "*DNF*";
const MISSING: &str = "-";

const SUBSCRIPT_DIGITS: [char; 10] = ['₀', '₁', '₂', '₃', '₄', '₅', '₆', '₇', '₈', '₉'];

/// Round to 3 decimals and print in shortest form (`1`, `1.5`, `0.123`).
pub fn format_value(value: f64) -> String {
    // Scaling values near f64::MAX overflows; at that magnitude there are no decimals to round.
    let rounded = if (value.abs() * 1000.0).is_finite() {
        (value * 1000.0).round() / 1000.0
    } else {
        value
    };
    // Avoid printing "-0".
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{}", rounded)
}

/// Replace ASCII digits with their Unicode subscript forms. Other characters pass through.
pub fn to_subscript(text: &str) -> String {
    text.chars()
        .map(|c| match c.to_digit(10) {
            Some(d) => SUBSCRIPT_DIGITS[d as usize],
            None => c,
        })
        .collect()
}

/// Spread of one metric across the runs that reported it.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub min: f64,
    pub max: f64,
    pub median: f64,
}

impl Summary {
    /// `None` for an empty slice. The median of an even count is the lower middle value.
    pub fn from_values(values: &[f64]) -> Option<Summary> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        Some(Summary {
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            median: sorted[(sorted.len() - 1) / 2],
        })
    }

    pub fn half_range(&self) -> f64 {
        // Halve before subtracting so extreme ranges stay finite.
        (self.max / 2.0 - self.min / 2.0).abs()
    }

    /// `median±half_range`, the half range in subscript digits.
    pub fn render(&self) -> String {
        format!(
            "{}±{}",
            format_value(self.median),
            to_subscript(&format_value(self.half_range()))
        )
    }
}

fn table_row<I, S>(cells: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut row = String::from("|");
    for cell in cells {
        row.push(' ');
        row.push_str(cell.as_ref());
        row.push_str(" |");
    }
    row.push('\n');
    row
}

/// Render one benchmark's section: a heading, then either the table or the failure notice.
///
/// Columns follow the key order of the first completed run. Later runs with a different key
/// set are not realigned: extra keys are dropped and missing ones show as `-`.
pub fn render_benchmark_section(name: &str, outcomes: &[RunOutcome]) -> String {
    let mut md = String::from("\n");
    md.push_str(&format!("## {}\n", name));

    let mut observed: HashMap<&str, Vec<f64>> = HashMap::new();
    for metrics in outcomes.iter().filter_map(RunOutcome::metrics) {
        for (key, value) in metrics.iter() {
            observed.entry(key).or_default().push(value);
        }
    }

    let keys: Vec<&str> = match outcomes.iter().find_map(RunOutcome::metrics) {
        Some(first) => first.keys().collect(),
        None => Vec::new(),
    };

    if keys.is_empty() || observed.is_empty() {
        md.push_str(ALL_FAILED);
        md.push('\n');
        return md;
    }

    md.push_str(&table_row(&keys));
    md.push_str(&table_row(keys.iter().map(|_| "---")));

    let summary_cells = keys.iter().map(|key| {
        match observed.get(key).and_then(|v| Summary::from_values(v)) {
            Some(summary) => format!("**{}**", summary.render()),
            None => MISSING.to_string(),
        }
    });
    md.push_str(&table_row(summary_cells));

    for outcome in outcomes {
        let cells = keys.iter().map(|key| match outcome {
            RunOutcome::Completed(metrics) => metrics
                .get(key)
                .map(format_value)
                .unwrap_or_else(|| MISSING.to_string()),
            RunOutcome::Failed(_) => DNF.to_string(),
        });
        md.push_str(&table_row(cells));
    }

    md
}

/// Render the whole report document.
pub fn render_report(results: &SuiteResults, runs: usize, ran_at: &str, host: &str) -> String {
    let mut md = format!("{}\n", TITLE);
    md.push_str(&format!("Ran `{}` times at `{}` on `{}`\n", runs, ran_at, host));
    for (name, outcomes) in results.iter() {
        md.push_str(&render_benchmark_section(name, outcomes));
    }
    md
}

/// Write `report` to the latest-results file and to `<historic_dir>/<ran_at>.md`.
///
/// Returns the archival path.
pub fn write_report(report: &str, output: &OutputConfig, ran_at: &str) -> Result<PathBuf> {
    write_file(&output.results_file, report)?;

    std::fs::create_dir_all(&output.historic_dir).map_err(|source| {
        MiramarkError::ReportWriteError {
            path: output.historic_dir.clone(),
            source,
        }
    })?;

    let archive = output.historic_dir.join(format!("{}.md", ran_at));
    write_file(&archive, report)?;

    tracing::info!(
        latest = %output.results_file.display(),
        archive = %archive.display(),
        "report written"
    );
    Ok(archive)
}

fn write_file(path: &std::path::Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).map_err(|source| MiramarkError::ReportWriteError {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}
