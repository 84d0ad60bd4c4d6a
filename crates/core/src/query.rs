//! Side-effect-free filters and aggregations over the joined view.
//!
//! Every function takes a borrowed table and returns owned results; nothing
//! here touches the dataset store. Missing/null cells never match a filter
//! and never panic.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{Local, NaiveDate};
use serde::Serialize;

use crate::dataset::{BolRecord, JoinedRow};

/// Date argument for [`alerts_by_customer_facility`].
///
/// Strings other than `today`, `yesterday`, or a parseable ISO date are a
/// pass-through: no date filtering is applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DateFilter {
    Today,
    Yesterday,
    On(NaiveDate),
    Any,
}

impl DateFilter {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "today" => Self::Today,
            "yesterday" => Self::Yesterday,
            other => other.parse::<NaiveDate>().map(Self::On).unwrap_or(Self::Any),
        }
    }

    fn resolve(self, today: NaiveDate) -> Option<NaiveDate> {
        match self {
            Self::Today => Some(today),
            Self::Yesterday => today.pred_opt(),
            Self::On(date) => Some(date),
            Self::Any => None,
        }
    }
}

/// Per-carrier aggregate over the joined view.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CarrierStats {
    pub carrier: String,
    pub total_shipments: usize,
    pub avg_delay_hours: f64,
    pub on_time_count: usize,
    pub on_time_rate_pct: f64,
}

/// Alerts matching a customer and facility by case-insensitive substring,
/// optionally narrowed to one calendar day of `Alert_Start_Date`.
pub fn alerts_by_customer_facility(
    rows: &[JoinedRow],
    customer: &str,
    facility: &str,
    date: DateFilter,
) -> Vec<JoinedRow> {
    alerts_by_customer_facility_at(rows, customer, facility, date, Local::now().date_naive())
}

/// Same as [`alerts_by_customer_facility`] with an explicit "today" so the
/// today/yesterday literals are testable.
pub fn alerts_by_customer_facility_at(
    rows: &[JoinedRow],
    customer: &str,
    facility: &str,
    date: DateFilter,
    today: NaiveDate,
) -> Vec<JoinedRow> {
    let wanted_date = date.resolve(today);
    rows.iter()
        .filter(|row| {
            contains_ci(row.alert.customer.as_deref(), customer)
                && contains_ci(row.alert.facility.as_deref(), facility)
                && wanted_date.map_or(true, |day| row.alert.alert_start_date == Some(day))
        })
        .cloned()
        .collect()
}

/// Rows delayed strictly more than `min_hours`, worst first.
pub fn delayed_bols(rows: &[JoinedRow], min_hours: i64) -> Vec<JoinedRow> {
    let mut result = rows
        .iter()
        .filter(|row| row.bol.no_of_hours_delayed > min_hours)
        .cloned()
        .collect::<Vec<_>>();
    result.sort_by(|a, b| b.bol.no_of_hours_delayed.cmp(&a.bol.no_of_hours_delayed));
    result
}

/// Rows with risk score at or above `threshold`, riskiest first.
pub fn high_risk_alerts(rows: &[JoinedRow], threshold: f64) -> Vec<JoinedRow> {
    let mut result = rows
        .iter()
        .filter(|row| row.alert.otif_risk_score >= threshold)
        .cloned()
        .collect::<Vec<_>>();
    result.sort_by(|a, b| {
        b.alert
            .otif_risk_score
            .partial_cmp(&a.alert.otif_risk_score)
            .unwrap_or(Ordering::Equal)
    });
    result
}

/// Case-insensitive substring match on `Alert_Type`.
pub fn alerts_by_type(rows: &[JoinedRow], alert_type: &str) -> Vec<JoinedRow> {
    rows.iter()
        .filter(|row| contains_ci(row.alert.alert_type.as_deref(), alert_type))
        .cloned()
        .collect()
}

/// Rows with at most `max_days` left for delivery, most urgent first.
pub fn alerts_by_days_left(rows: &[JoinedRow], max_days: i64) -> Vec<JoinedRow> {
    let mut result = rows
        .iter()
        .filter(|row| row.alert.days_left_for_delivery <= max_days)
        .cloned()
        .collect::<Vec<_>>();
    result.sort_by_key(|row| row.alert.days_left_for_delivery);
    result
}

/// Count of BOL records grouped by delivery status. Rows without a status
/// are not counted.
pub fn delivery_status_summary(bols: &[BolRecord]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for record in bols {
        if let Some(status) = record.delivery_status.as_deref() {
            *counts.entry(status.to_string()).or_insert(0) += 1;
        }
    }
    counts
}

/// Shipment count, mean delay, and on-time rate per carrier, worst mean
/// delay first. Rows without a carrier are not counted.
pub fn carrier_performance(rows: &[JoinedRow]) -> Vec<CarrierStats> {
    let mut grouped: BTreeMap<&str, (usize, i64, usize)> = BTreeMap::new();
    for row in rows {
        let Some(carrier) = row.bol.carrier_name.as_deref() else {
            continue;
        };
        let entry = grouped.entry(carrier).or_insert((0, 0, 0));
        entry.0 += 1;
        entry.1 += row.bol.no_of_hours_delayed;
        if row.bol.delivery_status.as_deref() == Some("On Time") {
            entry.2 += 1;
        }
    }

    let mut stats = grouped
        .into_iter()
        .map(|(carrier, (total, delay_sum, on_time))| CarrierStats {
            carrier: carrier.to_string(),
            total_shipments: total,
            avg_delay_hours: delay_sum as f64 / total as f64,
            on_time_count: on_time,
            on_time_rate_pct: round1(on_time as f64 / total as f64 * 100.0),
        })
        .collect::<Vec<_>>();
    stats.sort_by(|a, b| {
        b.avg_delay_hours.partial_cmp(&a.avg_delay_hours).unwrap_or(Ordering::Equal)
    });
    stats
}

/// Free-text search across customer, facility, alert type, and material
/// name (logical OR).
pub fn search_alerts(rows: &[JoinedRow], text: &str) -> Vec<JoinedRow> {
    rows.iter()
        .filter(|row| {
            contains_ci(row.alert.customer.as_deref(), text)
                || contains_ci(row.alert.facility.as_deref(), text)
                || contains_ci(row.alert.alert_type.as_deref(), text)
                || contains_ci(row.alert.material_name.as_deref(), text)
        })
        .cloned()
        .collect()
}

fn contains_ci(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|value| value.to_lowercase().contains(&needle.to_lowercase()))
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
