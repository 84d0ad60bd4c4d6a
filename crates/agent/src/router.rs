//! Rule-based intent extraction.
//!
//! Free text goes in, a typed [`Intent`] comes out. The rules favor
//! precision over recall: when nothing matches confidently the extractor
//! returns [`Intent::Unknown`] with a clarification prompt instead of
//! guessing.

use chrono::NaiveDate;
use otifly_core::query::DateFilter;

#[derive(Clone, Debug, PartialEq)]
pub enum Intent {
    CustomerFacilityAlerts { customer: String, facility: String, date: DateFilter },
    DelayedBols { min_hours: i64 },
    HighRiskAlerts { threshold: f64 },
    AlertsByType { alert_type: String },
    AlertsByDaysLeft { max_days: i64 },
    DeliveryStatusSummary,
    CarrierPerformance,
    SearchAlerts { text: String },
    SuggestActions,
    StopAlert { bol: String, reason: String },
    AddNote { bol: String, note: String },
    SendEmail { bol: String, escalate: bool },
    ShowActionLog,
    DailySummary { save: bool },
    Unknown { clarification: String },
}

impl Intent {
    /// Stable label used for conversation metadata and log fields.
    pub fn label(&self) -> &'static str {
        match self {
            Self::CustomerFacilityAlerts { .. } => "query.customer_facility",
            Self::DelayedBols { .. } => "query.delayed_bols",
            Self::HighRiskAlerts { .. } => "query.high_risk",
            Self::AlertsByType { .. } => "query.by_type",
            Self::AlertsByDaysLeft { .. } => "query.by_days_left",
            Self::DeliveryStatusSummary => "query.delivery_status",
            Self::CarrierPerformance => "query.carrier_performance",
            Self::SearchAlerts { .. } => "query.search",
            Self::SuggestActions => "suggest.actions",
            Self::StopAlert { .. } => "action.stop_alert",
            Self::AddNote { .. } => "action.add_note",
            Self::SendEmail { .. } => "action.send_email",
            Self::ShowActionLog => "action.show_log",
            Self::DailySummary { .. } => "report.daily_summary",
            Self::Unknown { .. } => "unknown",
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct IntentExtractor;

impl IntentExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, text: &str) -> Intent {
        // ASCII-only lowercasing: byte offsets found in `normalized` must
        // stay valid slice positions in `text`, which full Unicode
        // lowercasing does not guarantee. Every keyword below is ASCII.
        let normalized = text.to_ascii_lowercase();
        let tokens = tokenize(&normalized);
        let bol = extract_bol(text);

        // Actions need a target BOL; without one they fall through to the
        // query rules, and unmatched action verbs end in a clarification.
        if let Some(bol) = bol.clone() {
            if normalized.contains("stop") {
                return Intent::StopAlert { bol, reason: extract_reason(text, &normalized) };
            }
            if normalized.contains("note") {
                return Intent::AddNote { bol: bol.clone(), note: extract_note(text, &bol) };
            }
            if normalized.contains("escalate") {
                return Intent::SendEmail { bol, escalate: true };
            }
            if normalized.contains("email") || normalized.contains("notify") {
                return Intent::SendEmail { bol, escalate: normalized.contains("escalat") };
            }
        }

        if normalized.contains("action log")
            || normalized.contains("action history")
            || normalized.contains("show actions")
        {
            return Intent::ShowActionLog;
        }
        if normalized.contains("suggest") {
            return Intent::SuggestActions;
        }
        if normalized.contains("summary report")
            || normalized.contains("daily summary")
            || (normalized.contains("report") && normalized.contains("daily"))
            || (normalized.contains("report") && normalized.contains("save"))
        {
            return Intent::DailySummary { save: normalized.contains("save") };
        }
        if normalized.contains("carrier") {
            return Intent::CarrierPerformance;
        }
        if normalized.contains("delivery status") || normalized.contains("status summary") {
            return Intent::DeliveryStatusSummary;
        }
        if normalized.contains("delay") {
            return Intent::DelayedBols {
                min_hours: threshold_with_unit(&tokens, &["hour", "hours", "hrs", "hr"])
                    .unwrap_or(12),
            };
        }
        if normalized.contains("risk") {
            return Intent::HighRiskAlerts {
                threshold: extract_risk_threshold(&tokens).unwrap_or(0.7),
            };
        }
        if normalized.contains("days left")
            || normalized.contains("due in")
            || (normalized.contains("left") && normalized.contains("day"))
        {
            return Intent::AlertsByDaysLeft {
                max_days: threshold_with_unit(&tokens, &["day", "days"]).unwrap_or(5),
            };
        }
        if let Some(alert_type) = after_keyword(text, &normalized, "type") {
            return Intent::AlertsByType { alert_type };
        }
        if normalized.contains("alert") && normalized.contains(" for ") {
            if let Some(intent) = extract_customer_facility(text, &normalized) {
                return intent;
            }
        }
        if let Some(needle) = after_keyword(text, &normalized, "search for")
            .or_else(|| after_keyword(text, &normalized, "search"))
            .or_else(|| after_keyword(text, &normalized, "find"))
        {
            return Intent::SearchAlerts { text: needle };
        }

        Intent::Unknown {
            clarification: "I can filter alerts (by customer/facility, delay hours, risk, type, \
                            days left), summarize delivery status or carrier performance, search, \
                            suggest actions, stop alerts, add notes, send emails, and build the \
                            daily report. What would you like?"
                .to_string(),
        }
    }
}

fn tokenize(normalized: &str) -> Vec<String> {
    let mut sanitized = String::with_capacity(normalized.len());
    for character in normalized.chars() {
        if character.is_ascii_alphanumeric() || matches!(character, '%' | '.' | '-') {
            sanitized.push(character);
        } else {
            sanitized.push(' ');
        }
    }
    sanitized.split_whitespace().map(|token| token.trim_matches('.').to_string()).collect()
}

/// Finds a BOL mention: either a single `BOL…` token ("BOL10005") or the
/// word "bol" followed by an identifier ("bol 10005"). Returned uppercased.
fn extract_bol(text: &str) -> Option<String> {
    let tokens = text
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|token| !token.is_empty())
        .collect::<Vec<_>>();

    for (index, token) in tokens.iter().enumerate() {
        let lower = token.to_ascii_lowercase();
        if lower == "bol" {
            if let Some(next) = tokens.get(index + 1) {
                if next.chars().all(|c| c.is_ascii_digit()) {
                    return Some(format!("BOL{next}"));
                }
                if next.chars().any(|c| c.is_ascii_digit()) {
                    return Some(next.to_uppercase());
                }
            }
        } else if lower.len() > 3
            && lower.starts_with("bol")
            && lower[3..].chars().all(|c| c.is_ascii_digit())
        {
            return Some(token.to_uppercase());
        }
    }
    None
}

/// Number directly followed by one of the unit words ("12 hours", "3 days").
fn threshold_with_unit(tokens: &[String], units: &[&str]) -> Option<i64> {
    for window in tokens.windows(2) {
        if let [value, unit] = window {
            if units.contains(&unit.as_str()) {
                if let Ok(number) = value.parse::<i64>() {
                    return Some(number);
                }
            }
        }
    }
    None
}

/// Risk threshold as "70%", "0.7", or a bare integer percent next to
/// "above"/"over".
fn extract_risk_threshold(tokens: &[String]) -> Option<f64> {
    for (index, token) in tokens.iter().enumerate() {
        if let Some(raw) = token.strip_suffix('%') {
            if let Ok(percent) = raw.parse::<f64>() {
                return Some(percent / 100.0);
            }
        }
        if let Ok(fraction) = token.parse::<f64>() {
            if token.contains('.') && (0.0..=1.0).contains(&fraction) {
                return Some(fraction);
            }
            let in_context = index > 0
                && matches!(tokens[index - 1].as_str(), "above" | "over" | "than" | "least");
            if in_context && (1.0..=100.0).contains(&fraction) {
                return Some(fraction / 100.0);
            }
        }
    }
    None
}

/// Free text after "because"/"reason", from the original casing.
fn extract_reason(text: &str, normalized: &str) -> String {
    for marker in ["because", "reason:", "reason"] {
        if let Some(position) = normalized.find(marker) {
            return text[position + marker.len()..].trim_start_matches([':', ' ']).trim().to_string();
        }
    }
    String::new()
}

/// Note body: text after the first colon, else everything after the BOL
/// mention.
fn extract_note(text: &str, bol: &str) -> String {
    if let Some(position) = text.find(':') {
        return text[position + 1..].trim().to_string();
    }
    let lower = text.to_ascii_lowercase();
    if let Some(position) = lower.find(&bol.to_ascii_lowercase()) {
        return text[position + bol.len()..].trim().to_string();
    }
    text.trim().to_string()
}

/// Remainder of the sentence after a keyword, trimmed of filler, from the
/// original casing. Returns `None` when nothing follows.
fn after_keyword(text: &str, normalized: &str, keyword: &str) -> Option<String> {
    let padded = format!("{keyword} ");
    let position = normalized.find(&padded)?;
    let remainder = text[position + padded.len()..]
        .trim()
        .trim_end_matches(['?', '.', '!'])
        .trim();
    if remainder.is_empty() {
        None
    } else {
        Some(remainder.to_string())
    }
}

/// "alerts for <customer> at <facility> [today|yesterday|YYYY-MM-DD]".
fn extract_customer_facility(text: &str, normalized: &str) -> Option<Intent> {
    let for_position = normalized.find(" for ")?;
    let after_for = &text[for_position + 5..];
    let after_for_lower = &normalized[for_position + 5..];

    let (customer_raw, facility_raw) = match after_for_lower.find(" at ") {
        Some(at_position) => (&after_for[..at_position], &after_for[at_position + 4..]),
        None => (after_for, ""),
    };

    let date = extract_date(normalized);
    let customer = strip_date_words(customer_raw);
    let facility = strip_date_words(facility_raw);
    if customer.is_empty() {
        return None;
    }
    Some(Intent::CustomerFacilityAlerts { customer, facility, date })
}

/// First token that [`DateFilter::parse`] recognizes (a literal or an ISO
/// date), else `Any`.
fn extract_date(normalized: &str) -> DateFilter {
    for token in normalized.split_whitespace() {
        let trimmed = token.trim_matches(|c: char| !c.is_ascii_alphanumeric() && c != '-');
        match DateFilter::parse(trimmed) {
            DateFilter::Any => continue,
            filter => return filter,
        }
    }
    DateFilter::Any
}

fn strip_date_words(raw: &str) -> String {
    raw.split_whitespace()
        .filter(|word| {
            let lower = word.to_ascii_lowercase();
            lower != "today"
                && lower != "yesterday"
                && lower.parse::<NaiveDate>().is_err()
        })
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(['?', '.', '!'])
        .trim()
        .to_string()
}
