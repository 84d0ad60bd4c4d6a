//! OpenAI-compatible chat-completions collaborator.
//!
//! Used for two things only: tightening user notes and drafting email
//! bodies. Calls are blocking with the configured timeout; any failure is
//! degraded by the caller to the deterministic templates in
//! `otifly_core::collab`.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use otifly_core::collab::{EmailContext, TemplateCollaborator, TextCollaborator};
use otifly_core::config::{LlmConfig, LlmProvider};
use otifly_core::errors::CollabError;

const REWRITE_SYSTEM_PROMPT: &str =
    "You are a professional business communication assistant. Reply with the rewritten text only.";

const EMAIL_SYSTEM_PROMPT: &str =
    "You are a professional supply chain communication specialist. Reply with the email body only.";

pub struct HttpCollaborator {
    client: reqwest::blocking::Client,
    base_url: String,
    model: String,
    api_key: Option<SecretString>,
}

impl HttpCollaborator {
    pub fn from_config(config: &LlmConfig) -> Result<Self, CollabError> {
        if config.provider == LlmProvider::Disabled {
            return Err(CollabError::NotConfigured);
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| CollabError::Transport(error.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn complete(&self, system: &str, user: &str, temperature: f64) -> Result<String, CollabError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: system.to_string() },
                ChatMessage { role: "user", content: user.to_string() },
            ],
            temperature,
        };

        let mut builder =
            self.client.post(format!("{}/chat/completions", self.base_url)).json(&request);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key.expose_secret());
        }

        let response =
            builder.send().map_err(|error| CollabError::Transport(error.to_string()))?;
        if !response.status().is_success() {
            return Err(CollabError::BadResponse(format!("HTTP {}", response.status())));
        }

        let parsed: ChatResponse =
            response.json().map_err(|error| CollabError::BadResponse(error.to_string()))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .unwrap_or_default();
        let content = content.trim().to_string();
        if content.is_empty() {
            return Err(CollabError::BadResponse("empty completion".to_string()));
        }
        Ok(content)
    }
}

impl TextCollaborator for HttpCollaborator {
    fn rewrite_note(&self, note: &str) -> Result<String, CollabError> {
        let prompt = format!(
            "Rephrase the following user note to be concise, professional, and clear. \
             Keep it under 100 characters if possible. Maintain the key information.\n\n\
             Original note: {note}\n\nRephrased note:"
        );
        self.complete(REWRITE_SYSTEM_PROMPT, &prompt, 0.3)
    }

    fn email_body(&self, context: &EmailContext, escalate: bool) -> Result<String, CollabError> {
        let escalation_text = if escalate {
            "This is an ESCALATED alert requiring immediate attention."
        } else {
            ""
        };
        let prompt = format!(
            "Generate a professional and concise email body for an OTIF (On-Time In-Full) \
             delivery alert.\n\n\
             Alert Information:\n\
             - Customer: {customer}\n\
             - Facility: {facility}\n\
             - Alert Type: {alert_type}\n\
             - OTIF Risk Score: {risk:.1}%\n\
             - Days Left for Delivery: {days_left} days\n\
             - Delivery Status: {status}\n\
             - Hours Delayed: {delayed} hours\n\
             - BOL Number: {bol}\n\n\
             {escalation_text}\n\n\
             Write a professional email body that states the issue, provides the key metrics, \
             indicates the urgency level, and requests appropriate action.",
            customer = context.customer,
            facility = context.facility,
            alert_type = context.alert_type,
            risk = context.otif_risk_score * 100.0,
            days_left = context.days_left,
            status = context.delivery_status,
            delayed = context.hours_delayed,
            bol = context.bol,
        );
        self.complete(EMAIL_SYSTEM_PROMPT, &prompt, 0.5)
    }
}

/// Builds the collaborator the runtime should use: the HTTP client when one
/// is configured, otherwise the deterministic templates.
pub fn collaborator_from_config(config: &LlmConfig) -> Box<dyn TextCollaborator> {
    match HttpCollaborator::from_config(config) {
        Ok(collaborator) => Box::new(collaborator),
        Err(CollabError::NotConfigured) => Box::new(TemplateCollaborator),
        Err(error) => {
            tracing::warn!(%error, "LLM collaborator unavailable; using template fallback");
            Box::new(TemplateCollaborator)
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f64,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use otifly_core::config::{AppConfig, LlmProvider};
    use otifly_core::errors::CollabError;

    use super::{collaborator_from_config, HttpCollaborator};

    #[test]
    fn disabled_provider_is_not_configured() {
        let config = AppConfig::default().llm;
        assert!(matches!(
            HttpCollaborator::from_config(&config),
            Err(CollabError::NotConfigured)
        ));
    }

    #[test]
    fn disabled_provider_falls_back_to_templates() {
        let config = AppConfig::default().llm;
        let collaborator = collaborator_from_config(&config);
        let rewritten = collaborator.rewrite_note("  keep me  ").expect("template rewrite");
        assert_eq!(rewritten, "keep me");
    }

    #[test]
    fn configured_provider_builds_a_client() {
        let mut config = AppConfig::default().llm;
        config.provider = LlmProvider::Ollama;
        assert!(HttpCollaborator::from_config(&config).is_ok());
    }
}
