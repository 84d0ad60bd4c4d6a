//! Plain-text report rendering and persistence.

use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;
use thiserror::Error;

use crate::dataset::JoinedRow;

const RULE: &str = "───────────────────────────────────────────────────────────────";
const DISPLAY_ROW_LIMIT: usize = 20;

#[derive(Debug, Error)]
#[error("could not write report `{path}`: {source}")]
pub struct ReportWriteError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

pub struct ReportBuilder {
    output_dir: PathBuf,
    reports_written: usize,
}

impl ReportBuilder {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self { output_dir: output_dir.into(), reports_written: 0 }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn reports_written(&self) -> usize {
        self.reports_written
    }

    /// Daily summary over the joined view: overview counts, alert-type and
    /// delivery-status breakdowns, top customers and facilities. Returns an
    /// explanatory message instead of dividing by zero when the view is
    /// empty.
    pub fn daily_summary(&self, rows: &[JoinedRow]) -> String {
        if rows.is_empty() {
            return "No alert records are loaded; there is nothing to summarize. \
                    Check the data sources and refresh."
                .to_string();
        }

        let total = rows.len();
        let high_risk = rows.iter().filter(|row| row.alert.otif_risk_score > 0.7).count();
        let delayed = rows.iter().filter(|row| row.bol.no_of_hours_delayed > 0).count();

        let mut report = format!(
            "OTIF ALERT MANAGEMENT - DAILY SUMMARY REPORT\n\
             {stamp}\n\n\
             OVERVIEW\n{RULE}\n\
             Total Active Alerts:       {total}\n\
             High Risk (>70%):          {high_risk} ({high_pct:.1}%)\n\
             Delayed Shipments:         {delayed} ({delay_pct:.1}%)\n",
            stamp = Local::now().format("%B %d, %Y %H:%M"),
            high_pct = percentage(high_risk, total),
            delay_pct = percentage(delayed, total),
        );

        report.push_str(&format!("\nALERT TYPE DISTRIBUTION\n{RULE}\n"));
        for (name, count) in
            ranked_counts(rows.iter().map(|row| row.alert.alert_type.as_deref()), None)
        {
            report.push_str(&format!(
                "{name:<40} {count:>5} ({pct:>5.1}%)\n",
                pct = percentage(count, total)
            ));
        }

        report.push_str(&format!("\nDELIVERY STATUS\n{RULE}\n"));
        for (name, count) in
            ranked_counts(rows.iter().map(|row| row.bol.delivery_status.as_deref()), None)
        {
            report.push_str(&format!(
                "{name:<20} {count:>5} ({pct:>5.1}%)\n",
                pct = percentage(count, total)
            ));
        }

        report.push_str(&format!("\nTOP 5 CUSTOMERS BY ALERT COUNT\n{RULE}\n"));
        for (name, count) in
            ranked_counts(rows.iter().map(|row| row.alert.customer.as_deref()), Some(5))
        {
            report.push_str(&format!("{name:<30} {count:>5}\n"));
        }

        report.push_str(&format!("\nTOP 5 FACILITIES BY ALERT COUNT\n{RULE}\n"));
        for (name, count) in
            ranked_counts(rows.iter().map(|row| row.alert.facility.as_deref()), Some(5))
        {
            report.push_str(&format!("{name:<30} {count:>5}\n"));
        }

        report.push_str(&format!("\n{}\n", "=".repeat(60)));
        report
    }

    /// Detailed tabular report of a filtered result set. Shows at most the
    /// first 20 rows; the summary statistics cover the full set.
    pub fn detailed_report(&self, rows: &[JoinedRow], title: &str) -> String {
        if rows.is_empty() {
            return format!("\n{title}\n{}\nNo alerts found matching criteria.\n", "=".repeat(60));
        }

        let shown = rows.len().min(DISPLAY_ROW_LIMIT);
        let headers = [
            "BOL",
            "Customer",
            "Facility",
            "Alert_Type",
            "Risk",
            "Days_Left",
            "Status",
            "Hours_Delayed",
        ];
        let cells = rows[..shown]
            .iter()
            .map(|row| {
                vec![
                    row.alert.bol.clone(),
                    cell(row.alert.customer.as_deref()),
                    cell(row.alert.facility.as_deref()),
                    cell(row.alert.alert_type.as_deref()),
                    format!("{:.2}", row.alert.otif_risk_score),
                    row.alert.days_left_for_delivery.to_string(),
                    cell(row.bol.delivery_status.as_deref()),
                    row.bol.no_of_hours_delayed.to_string(),
                ]
            })
            .collect::<Vec<_>>();

        let total = rows.len() as f64;
        let mean_risk = rows.iter().map(|row| row.alert.otif_risk_score).sum::<f64>() / total;
        let mean_days =
            rows.iter().map(|row| row.alert.days_left_for_delivery as f64).sum::<f64>() / total;
        let mean_delay =
            rows.iter().map(|row| row.bol.no_of_hours_delayed as f64).sum::<f64>() / total;

        format!(
            "\n{title}\n{rule}\nTotal Records: {count}\nShowing: {shown} records\n\n{table}\n\
             Summary Statistics:\n\
             - Average OTIF Risk Score: {mean_risk:.3}\n\
             - Average Days Left: {mean_days:.1} days\n\
             - Average Delay: {mean_delay:.1} hours\n",
            rule = "=".repeat(80),
            count = rows.len(),
            table = render_table(&headers, &cells),
        )
    }

    /// Writes a report under the output directory (created on demand) and
    /// returns the resolved path. Without a filename, one is generated from
    /// the current timestamp.
    pub fn save_to_file(
        &mut self,
        content: &str,
        filename: Option<&str>,
    ) -> Result<PathBuf, ReportWriteError> {
        let filename = match filename {
            Some(name) => name.to_string(),
            None => format!("OTIF_Report_{}.txt", Local::now().format("%Y%m%d_%H%M%S")),
        };
        let path = self.output_dir.join(filename);

        std::fs::create_dir_all(&self.output_dir)
            .map_err(|source| ReportWriteError { path: path.clone(), source })?;
        std::fs::write(&path, content)
            .map_err(|source| ReportWriteError { path: path.clone(), source })?;

        self.reports_written += 1;
        Ok(path)
    }
}

/// Renders an aligned text table with a header separator. Column widths fit
/// the widest cell.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths = headers.iter().map(|header| header.len()).collect::<Vec<_>>();
    for row in rows {
        for (index, value) in row.iter().enumerate() {
            if index < widths.len() {
                widths[index] = widths[index].max(value.len());
            }
        }
    }

    let mut output = String::new();
    for (index, header) in headers.iter().enumerate() {
        output.push_str(&format!("{header:<width$}  ", width = widths[index]));
    }
    output.push('\n');
    for (index, _) in headers.iter().enumerate() {
        output.push_str(&"-".repeat(widths[index]));
        output.push_str("  ");
    }
    output.push('\n');
    for row in rows {
        for (index, value) in row.iter().enumerate() {
            if index < widths.len() {
                output.push_str(&format!("{value:<width$}  ", width = widths[index]));
            }
        }
        output.push('\n');
    }
    output
}

fn cell(value: Option<&str>) -> String {
    value.filter(|text| !text.trim().is_empty()).unwrap_or("-").to_string()
}

fn percentage(count: usize, total: usize) -> f64 {
    count as f64 / total as f64 * 100.0
}

/// Counts non-null values and ranks them by count descending, then name,
/// optionally truncated.
fn ranked_counts<'a>(
    values: impl Iterator<Item = Option<&'a str>>,
    limit: Option<usize>,
) -> Vec<(String, usize)> {
    let mut counts = std::collections::BTreeMap::new();
    for value in values.flatten() {
        *counts.entry(value.to_string()).or_insert(0usize) += 1;
    }
    let mut ranked = counts.into_iter().collect::<Vec<_>>();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    if let Some(limit) = limit {
        ranked.truncate(limit);
    }
    ranked
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::{render_table, ReportBuilder};
    use crate::dataset::fixtures::seeded_store;
    use crate::dataset::JoinedRow;

    fn joined_rows() -> Vec<JoinedRow> {
        let dir = TempDir::new().expect("tempdir");
        let mut store = seeded_store(&dir);
        store.joined().expect("joined view").to_vec()
    }

    #[test]
    fn daily_summary_counts_and_breakdowns() {
        let builder = ReportBuilder::new("unused");
        let report = builder.daily_summary(&joined_rows());

        assert!(report.contains("Total Active Alerts:       3"));
        assert!(report.contains("High Risk (>70%):          2 (66.7%)"));
        assert!(report.contains("Delayed Shipments:         2 (66.7%)"));
        assert!(report.contains("ALERT TYPE DISTRIBUTION"));
        assert!(report.contains("Acme Foods"));
        assert!(report.contains("Palatka"));
    }

    #[test]
    fn daily_summary_on_empty_view_is_a_graceful_message() {
        let builder = ReportBuilder::new("unused");
        let report = builder.daily_summary(&[]);
        assert!(report.contains("nothing to summarize"));
    }

    #[test]
    fn detailed_report_shows_truncated_rows_with_full_set_statistics() {
        let rows = joined_rows();
        let builder = ReportBuilder::new("unused");
        let report = builder.detailed_report(&rows, "High Risk Alerts");

        assert!(report.contains("High Risk Alerts"));
        assert!(report.contains("Total Records: 3"));
        assert!(report.contains("Showing: 3 records"));
        assert!(report.contains("BOL10001"));
        // Mean over the full set: (0.92 + 0.55 + 0.75) / 3.
        assert!(report.contains("Average OTIF Risk Score: 0.740"));
    }

    #[test]
    fn detailed_report_caps_displayed_rows_at_twenty() {
        let mut rows = Vec::new();
        for index in 0..25 {
            let mut row = joined_rows()[0].clone();
            row.alert.bol = format!("BOL2{index:04}");
            rows.push(row);
        }
        let builder = ReportBuilder::new("unused");
        let report = builder.detailed_report(&rows, "Everything");
        assert!(report.contains("Total Records: 25"));
        assert!(report.contains("Showing: 20 records"));
        assert!(!report.contains("BOL20024"));
    }

    #[test]
    fn empty_result_set_reports_no_matches_under_the_title() {
        let builder = ReportBuilder::new("unused");
        let report = builder.detailed_report(&[], "Delayed BOLs");
        assert!(report.contains("Delayed BOLs"));
        assert!(report.contains("No alerts found matching criteria"));
    }

    #[test]
    fn save_creates_the_output_directory_and_generates_a_name() {
        let dir = TempDir::new().expect("tempdir");
        let mut builder = ReportBuilder::new(dir.path().join("reports"));

        let path = builder.save_to_file("report body", None).expect("saved");
        assert!(path.exists());
        let name = path.file_name().and_then(|name| name.to_str()).expect("file name");
        assert!(name.starts_with("OTIF_Report_"));
        assert!(name.ends_with(".txt"));
        assert_eq!(std::fs::read_to_string(&path).expect("read back"), "report body");
        assert_eq!(builder.reports_written(), 1);
    }

    #[test]
    fn save_honors_an_explicit_filename() {
        let dir = TempDir::new().expect("tempdir");
        let mut builder = ReportBuilder::new(dir.path());
        let path = builder.save_to_file("body", Some("custom.txt")).expect("saved");
        assert!(path.ends_with("custom.txt"));
    }

    #[test]
    fn table_columns_align_to_the_widest_cell() {
        let table = render_table(
            &["BOL", "Customer"],
            &[
                vec!["BOL10001".to_string(), "Acme".to_string()],
                vec!["B2".to_string(), "Northwind Traders".to_string()],
            ],
        );
        let lines = table.lines().collect::<Vec<_>>();
        assert!(lines[0].starts_with("BOL       Customer"));
        assert!(lines[1].starts_with("--------  -----------------"));
    }
}
