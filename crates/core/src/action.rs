//! Alert actions: suppress, annotate, and (simulated) email notification.
//!
//! Actions never raise. Every call returns a tagged [`ActionOutcome`]; the
//! only failure modes a caller sees are `success == false` results. Each
//! executed action appends one entry to the process-lifetime action log.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::collab::{fallback_email_body, EmailContext, TemplateCollaborator, TextCollaborator};
use crate::dataset::DatasetStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    StopAlert,
    AddNote,
    SendEmail,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::StopAlert => "stop_alert",
            Self::AddNote => "add_note",
            Self::SendEmail => "send_email",
        };
        f.write_str(name)
    }
}

/// Simulated outbound notification. No real transport exists by design;
/// the sink decides what "sending" means.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EmailPayload {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub escalated: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionPayload {
    StopAlert { reason: String },
    AddNote { original_note: String, rewritten_note: String },
    SendEmail { email: EmailPayload },
}

impl ActionPayload {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::StopAlert { .. } => ActionKind::StopAlert,
            Self::AddNote { .. } => ActionKind::AddNote,
            Self::SendEmail { .. } => ActionKind::SendEmail,
        }
    }
}

/// Append-only record of one executed action. Never mutated after creation
/// and never persisted; the log lives for the process only.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ActionLogEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub kind: ActionKind,
    pub bol: String,
    pub payload: ActionPayload,
    pub success: bool,
}

/// Tagged result of an action call. Callers check `success`, they do not
/// catch errors.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ActionOutcome {
    pub success: bool,
    pub message: String,
    pub bol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ActionOutcome {
    fn ok(bol: &str, message: impl Into<String>) -> Self {
        Self { success: true, message: message.into(), bol: bol.to_string(), detail: None }
    }

    fn failed(bol: &str, message: impl Into<String>) -> Self {
        Self { success: false, message: message.into(), bol: bol.to_string(), detail: None }
    }

    fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Destination for simulated email sends.
pub trait NotificationSink {
    fn deliver(&mut self, email: &EmailPayload);
}

/// Production sink: prints the payload to the terminal, the way the real
/// system would hand it to a mail relay.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleSink;

impl NotificationSink for ConsoleSink {
    fn deliver(&mut self, email: &EmailPayload) {
        println!("\nEMAIL SENT:");
        println!("To: {}", email.to);
        println!("Subject: {}", email.subject);
        println!("\nBody:\n{}", email.body);
        if email.escalated {
            println!("\nESCALATED TO SUPERVISOR");
        }
    }
}

/// Test sink that records every payload it is handed.
#[derive(Clone, Debug, Default)]
pub struct CollectingSink {
    pub sent: Vec<EmailPayload>,
}

impl NotificationSink for CollectingSink {
    fn deliver(&mut self, email: &EmailPayload) {
        self.sent.push(email.clone());
    }
}

pub struct ActionExecutor {
    collaborator: Box<dyn TextCollaborator>,
    sink: Box<dyn NotificationSink>,
    log: Vec<ActionLogEntry>,
}

impl ActionExecutor {
    pub fn new(collaborator: Box<dyn TextCollaborator>, sink: Box<dyn NotificationSink>) -> Self {
        Self { collaborator, sink, log: Vec::new() }
    }

    /// Template collaborator plus console sink; the configuration used when
    /// no LLM is available.
    pub fn with_defaults() -> Self {
        Self::new(Box::new(TemplateCollaborator), Box::new(ConsoleSink))
    }

    /// Sets the alert's stop flag. Idempotent on state; every call logs.
    pub fn stop_alert(
        &mut self,
        store: &mut DatasetStore,
        bol: &str,
        reason: &str,
    ) -> ActionOutcome {
        let alert = match store.alert_mut(bol) {
            Ok(Some(alert)) => alert,
            Ok(None) => return ActionOutcome::failed(bol, format!("BOL {bol} not found")),
            Err(error) => {
                return ActionOutcome::failed(bol, format!("Error stopping alert: {error}"))
            }
        };
        alert.stop_alert = true;

        self.append(bol, ActionPayload::StopAlert { reason: reason.to_string() }, true);
        ActionOutcome::ok(bol, format!("Alert for BOL {bol} has been stopped"))
            .with_detail(reason)
    }

    /// Appends a note to the alert, rewritten by the collaborator when one
    /// is available. A rewrite failure falls back to the original text.
    pub fn add_note(&mut self, store: &mut DatasetStore, bol: &str, note: &str) -> ActionOutcome {
        let alert = match store.alert_mut(bol) {
            Ok(Some(alert)) => alert,
            Ok(None) => return ActionOutcome::failed(bol, format!("BOL {bol} not found")),
            Err(error) => {
                return ActionOutcome::failed(bol, format!("Error adding note: {error}"))
            }
        };

        let rewritten = match self.collaborator.rewrite_note(note) {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => note.to_string(),
            Err(error) => {
                tracing::warn!(%error, bol, "note rewrite failed; keeping original text");
                note.to_string()
            }
        };

        alert.user_notes = Some(match alert.user_notes.as_deref() {
            Some(existing) if !existing.trim().is_empty() => {
                format!("{existing}; {rewritten}")
            }
            _ => rewritten.clone(),
        });

        self.append(
            bol,
            ActionPayload::AddNote {
                original_note: note.to_string(),
                rewritten_note: rewritten.clone(),
            },
            true,
        );
        ActionOutcome::ok(bol, format!("Note added to BOL {bol}")).with_detail(rewritten)
    }

    /// Builds and "sends" a notification for the BOL's joined row. The body
    /// comes from the collaborator, falling back to the fixed template.
    pub fn send_email_alert(
        &mut self,
        store: &mut DatasetStore,
        bol: &str,
        escalate: bool,
    ) -> ActionOutcome {
        let (context, recipient) = match store.joined() {
            Ok(rows) => match rows.iter().find(|row| row.bol_id() == bol) {
                Some(row) => (
                    EmailContext::from_row(row),
                    row.bol
                        .user_email_id
                        .clone()
                        .unwrap_or_else(|| "unassigned".to_string()),
                ),
                None => return ActionOutcome::failed(bol, format!("BOL {bol} not found")),
            },
            Err(error) => {
                return ActionOutcome::failed(bol, format!("Error sending email: {error}"))
            }
        };

        let body = match self.collaborator.email_body(&context, escalate) {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => fallback_email_body(&context, escalate),
            Err(error) => {
                tracing::warn!(%error, bol, "email generation failed; using fixed template");
                fallback_email_body(&context, escalate)
            }
        };

        let prefix = if escalate { "[ESCALATED] " } else { "" };
        let email = EmailPayload {
            to: recipient.clone(),
            subject: format!("{prefix}OTIF Alert: {} - BOL {bol}", context.alert_type),
            body,
            escalated: escalate,
        };
        self.sink.deliver(&email);

        self.append(bol, ActionPayload::SendEmail { email }, true);
        let suffix = if escalate { " (ESCALATED)" } else { "" };
        ActionOutcome::ok(bol, format!("Email sent for BOL {bol}{suffix}")).with_detail(recipient)
    }

    /// Full ordered action log, oldest first.
    pub fn action_log(&self) -> &[ActionLogEntry] {
        &self.log
    }

    fn append(&mut self, bol: &str, payload: ActionPayload, success: bool) {
        self.log.push(ActionLogEntry {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            kind: payload.kind(),
            bol: bol.to_string(),
            payload,
            success,
        });
    }
}
