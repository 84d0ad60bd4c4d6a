//! Seam for the external text-generation collaborator.
//!
//! The collaborator rewrites free-text notes and drafts email bodies. It is
//! allowed to fail; callers must degrade to the deterministic templates in
//! this module and log a warning, never surface a hard error.

use crate::dataset::JoinedRow;
use crate::errors::CollabError;

/// Alert fields the email body is drafted from. Null cells are rendered as
/// "Unknown" so the payload is always complete.
#[derive(Clone, Debug, PartialEq)]
pub struct EmailContext {
    pub bol: String,
    pub customer: String,
    pub facility: String,
    pub alert_type: String,
    pub otif_risk_score: f64,
    pub days_left: i64,
    pub delivery_status: String,
    pub hours_delayed: i64,
}

impl EmailContext {
    pub fn from_row(row: &JoinedRow) -> Self {
        Self {
            bol: row.alert.bol.clone(),
            customer: text_or_unknown(row.alert.customer.as_deref()),
            facility: text_or_unknown(row.alert.facility.as_deref()),
            alert_type: text_or_unknown(row.alert.alert_type.as_deref()),
            otif_risk_score: row.alert.otif_risk_score,
            days_left: row.alert.days_left_for_delivery,
            delivery_status: text_or_unknown(row.bol.delivery_status.as_deref()),
            hours_delayed: row.bol.no_of_hours_delayed,
        }
    }
}

pub trait TextCollaborator {
    /// Rewrites a user note into a concise, professional form.
    fn rewrite_note(&self, note: &str) -> Result<String, CollabError>;

    /// Drafts an email body from the alert's fields.
    fn email_body(&self, context: &EmailContext, escalate: bool) -> Result<String, CollabError>;
}

/// Deterministic collaborator used when no LLM is configured. Notes pass
/// through trimmed; email bodies come from the fixed template.
#[derive(Clone, Copy, Debug, Default)]
pub struct TemplateCollaborator;

impl TextCollaborator for TemplateCollaborator {
    fn rewrite_note(&self, note: &str) -> Result<String, CollabError> {
        Ok(note.trim().to_string())
    }

    fn email_body(&self, context: &EmailContext, escalate: bool) -> Result<String, CollabError> {
        Ok(fallback_email_body(context, escalate))
    }
}

/// Fixed-format email body carrying the same fields a generated body would.
pub fn fallback_email_body(context: &EmailContext, escalate: bool) -> String {
    let escalation_line = if escalate {
        "This is an ESCALATED alert requiring immediate attention.\n\n"
    } else {
        ""
    };
    format!(
        "{escalation_line}Alert Details:\n\
         - Customer: {customer}\n\
         - Facility: {facility}\n\
         - Alert Type: {alert_type}\n\
         - OTIF Risk Score: {risk:.1}%\n\
         - Days Left: {days_left} days\n\
         - Delivery Status: {status}\n\
         - Hours Delayed: {delayed} hours\n\
         - BOL Number: {bol}\n\n\
         Action Required: Please review and take necessary action.\n",
        customer = context.customer,
        facility = context.facility,
        alert_type = context.alert_type,
        risk = context.otif_risk_score * 100.0,
        days_left = context.days_left,
        status = context.delivery_status,
        delayed = context.hours_delayed,
        bol = context.bol,
    )
}

fn text_or_unknown(value: Option<&str>) -> String {
    match value {
        Some(text) if !text.trim().is_empty() => text.to_string(),
        _ => "Unknown".to_string(),
    }
}
