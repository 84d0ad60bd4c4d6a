//! Deterministic core of the OTIF alert assistant.
//!
//! Everything in this crate is synchronous, side-effect-explicit, and
//! testable through direct function calls:
//!
//! - `dataset` - loads the Alert and BOL tables and owns the joined view
//! - `query` - side-effect-free filters and aggregations over the join
//! - `action` - alert mutations (stop, note, email) with an append-only log
//! - `report` - daily summary and detailed text reports
//! - `memory` - bounded conversation history
//! - `collab` - the external text-rewriting collaborator seam, with a
//!   deterministic template fallback
//!
//! The natural-language routing layer lives in `otifly-agent`; nothing here
//! depends on it. The core never decides intent - it only executes typed
//! operations.

pub mod action;
pub mod collab;
pub mod config;
pub mod dataset;
pub mod errors;
pub mod memory;
pub mod query;
pub mod report;

pub use action::{
    ActionExecutor, ActionKind, ActionLogEntry, ActionOutcome, ActionPayload, CollectingSink,
    ConsoleSink, EmailPayload, NotificationSink,
};
pub use collab::{EmailContext, TemplateCollaborator, TextCollaborator};
pub use config::{AppConfig, ConfigError, LlmProvider, LoadOptions, LogFormat};
pub use dataset::{AlertRecord, BolRecord, DatasetStore, JoinedRow};
pub use errors::{CollabError, DataError};
pub use memory::{ConversationMemory, ConversationMessage, MemorySummary, Role};
pub use query::{CarrierStats, DateFilter};
pub use report::{render_table, ReportBuilder, ReportWriteError};
