//! Deterministic remediation suggestions.
//!
//! The thresholds mirror the operating rules the alert desk works to:
//! escalate critical shipments, email high-risk ones, stop alerts that are
//! clearly stale, otherwise track with a note.

use std::fmt;

use otifly_core::dataset::JoinedRow;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecommendedAction {
    StopAlert,
    AddNote,
    SendEmail,
    Escalate,
}

impl fmt::Display for RecommendedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::StopAlert => "Stop Alert",
            Self::AddNote => "Add Note",
            Self::SendEmail => "Send Email",
            Self::Escalate => "Escalate",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ActionSuggestion {
    pub bol: String,
    pub summary: String,
    pub recommended: RecommendedAction,
    pub reason: String,
    pub priority: Priority,
}

/// One suggestion per row, in the order given.
pub fn suggest_actions(rows: &[JoinedRow]) -> Vec<ActionSuggestion> {
    rows.iter().map(suggest_for_row).collect()
}

fn suggest_for_row(row: &JoinedRow) -> ActionSuggestion {
    let risk = row.alert.otif_risk_score;
    let days_left = row.alert.days_left_for_delivery;
    let delay = row.bol.no_of_hours_delayed;
    let on_time = row.bol.delivery_status.as_deref() == Some("On Time");

    let summary = format!(
        "risk {risk:.0}%, {days_left} days left, {delay}h delayed, {status}",
        risk = risk * 100.0,
        status = row.bol.delivery_status.as_deref().unwrap_or("status unknown"),
    );

    let (recommended, reason, priority) = if risk > 0.85 || days_left < 2 || delay > 24 {
        (
            RecommendedAction::Escalate,
            "critical risk or imminent deadline; needs supervisor attention".to_string(),
            Priority::High,
        )
    } else if risk > 0.7 || days_left < 3 || delay > 12 {
        (
            RecommendedAction::SendEmail,
            "high risk or significant delay; notify the owner".to_string(),
            Priority::High,
        )
    } else if on_time && delay == 0 {
        (
            RecommendedAction::StopAlert,
            "shipment is on time; the alert looks stale".to_string(),
            Priority::Low,
        )
    } else {
        (
            RecommendedAction::AddNote,
            "worth tracking; document the investigation".to_string(),
            Priority::Medium,
        )
    };

    ActionSuggestion { bol: row.alert.bol.clone(), summary, recommended, reason, priority }
}

/// Renders suggestions as the assistant's reply text.
pub fn render_suggestions(suggestions: &[ActionSuggestion]) -> String {
    if suggestions.is_empty() {
        return "No alerts to suggest actions for. Run a query first.".to_string();
    }
    let mut output = String::from("Suggested actions:\n");
    for suggestion in suggestions {
        output.push_str(&format!(
            "- {bol} ({summary}): {action} [{priority}] - {reason}\n",
            bol = suggestion.bol,
            summary = suggestion.summary,
            action = suggestion.recommended,
            priority = suggestion.priority,
            reason = suggestion.reason,
        ));
    }
    output
}
