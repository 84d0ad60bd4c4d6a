//! Routing layer of the OTIF alert assistant.
//!
//! This crate turns free-text user input into typed operations on the
//! deterministic core:
//!
//! 1. **Intent extraction** (`router`) - rule-based parse of NL into an
//!    `Intent` (no LLM in the loop)
//! 2. **Dispatch** (`runtime`) - `AgentRuntime` owns the dataset store,
//!    action executor, report builder, and conversation memory, and maps
//!    each intent onto exactly one core operation
//! 3. **Suggestions** (`suggest`) - deterministic remediation
//!    recommendations from risk/urgency thresholds
//! 4. **Collaborator** (`llm`) - optional OpenAI-compatible client for note
//!    rewriting and email drafting, always falling back to the core's
//!    templates on failure
//!
//! The LLM is strictly a text polisher. It never routes requests, never
//! filters data, and never decides which action runs.

pub mod llm;
pub mod router;
pub mod runtime;
pub mod suggest;

pub use llm::{collaborator_from_config, HttpCollaborator};
pub use router::{Intent, IntentExtractor};
pub use runtime::AgentRuntime;
pub use suggest::{render_suggestions, suggest_actions, ActionSuggestion, Priority, RecommendedAction};
