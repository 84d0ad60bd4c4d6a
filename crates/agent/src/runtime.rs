//! Turn handling: one user utterance in, one rendered reply out.
//!
//! The runtime owns every stateful collaborator (dataset store, action
//! executor, report builder, conversation memory) by value - there are no
//! globals. Each turn is recorded in memory on both sides, routed through
//! the [`IntentExtractor`], and dispatched to exactly one core operation.

use std::collections::BTreeMap;

use otifly_core::action::{ActionExecutor, ActionLogEntry, ConsoleSink};
use otifly_core::config::AppConfig;
use otifly_core::dataset::{DatasetStore, JoinedRow};
use otifly_core::errors::DataError;
use otifly_core::memory::{ConversationMemory, Role};
use otifly_core::query;
use otifly_core::report::{render_table, ReportBuilder};

use crate::llm::collaborator_from_config;
use crate::router::{Intent, IntentExtractor};
use crate::suggest::{render_suggestions, suggest_actions};

pub struct AgentRuntime {
    store: DatasetStore,
    executor: ActionExecutor,
    reporter: ReportBuilder,
    memory: ConversationMemory,
    extractor: IntentExtractor,
    /// Most recent query result, so "suggest actions for these alerts"
    /// has something to refer to.
    last_result: Vec<JoinedRow>,
}

impl AgentRuntime {
    pub fn new(
        store: DatasetStore,
        executor: ActionExecutor,
        reporter: ReportBuilder,
        memory: ConversationMemory,
    ) -> Self {
        Self {
            store,
            executor,
            reporter,
            memory,
            extractor: IntentExtractor::new(),
            last_result: Vec::new(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let store =
            DatasetStore::new(config.data.alert_file.clone(), config.data.bol_file.clone());
        let executor =
            ActionExecutor::new(collaborator_from_config(&config.llm), Box::new(ConsoleSink));
        let reporter = ReportBuilder::new(config.reports.output_dir.clone());
        let memory = ConversationMemory::new(config.memory.max_messages);
        Self::new(store, executor, reporter, memory)
    }

    /// Processes one user turn: record, route, dispatch, record, reply.
    pub fn handle_message(&mut self, text: &str) -> String {
        self.memory.add_message(Role::User, text, BTreeMap::new());

        let intent = self.extractor.extract(text);
        tracing::info!(intent = intent.label(), "routing user request");
        let reply = self.dispatch(&intent);

        let mut metadata = BTreeMap::new();
        metadata.insert("intent".to_string(), intent.label().to_string());
        self.memory.add_message(Role::Assistant, reply.clone(), metadata);
        reply
    }

    fn dispatch(&mut self, intent: &Intent) -> String {
        match intent {
            Intent::CustomerFacilityAlerts { customer, facility, date } => {
                let title = format!("Alerts for {customer} at {facility}");
                self.run_query(&title, |rows| {
                    query::alerts_by_customer_facility(rows, customer, facility, *date)
                })
            }
            Intent::DelayedBols { min_hours } => {
                let title = format!("BOLs Delayed More Than {min_hours} Hours");
                self.run_query(&title, |rows| query::delayed_bols(rows, *min_hours))
            }
            Intent::HighRiskAlerts { threshold } => {
                let title = format!("High Risk Alerts (>= {:.0}%)", threshold * 100.0);
                self.run_query(&title, |rows| query::high_risk_alerts(rows, *threshold))
            }
            Intent::AlertsByType { alert_type } => {
                let title = format!("Alerts of Type '{alert_type}'");
                self.run_query(&title, |rows| query::alerts_by_type(rows, alert_type))
            }
            Intent::AlertsByDaysLeft { max_days } => {
                let title = format!("Alerts With {max_days} Days or Less Remaining");
                self.run_query(&title, |rows| query::alerts_by_days_left(rows, *max_days))
            }
            Intent::SearchAlerts { text } => {
                let title = format!("Search Results for '{text}'");
                self.run_query(&title, |rows| query::search_alerts(rows, text))
            }
            Intent::DeliveryStatusSummary => match self.store.bols() {
                Ok(bols) => {
                    let summary = query::delivery_status_summary(bols);
                    if summary.is_empty() {
                        "No delivery statuses recorded.".to_string()
                    } else {
                        let mut reply = String::from("Delivery status summary:\n");
                        for (status, count) in &summary {
                            reply.push_str(&format!("- {status}: {count}\n"));
                        }
                        reply
                    }
                }
                Err(error) => data_failure(&error),
            },
            Intent::CarrierPerformance => match self.store.joined() {
                Ok(rows) => {
                    let stats = query::carrier_performance(rows);
                    if stats.is_empty() {
                        "No carrier data available.".to_string()
                    } else {
                        let cells = stats
                            .iter()
                            .map(|stat| {
                                vec![
                                    stat.carrier.clone(),
                                    stat.total_shipments.to_string(),
                                    format!("{:.1}", stat.avg_delay_hours),
                                    stat.on_time_count.to_string(),
                                    format!("{:.1}", stat.on_time_rate_pct),
                                ]
                            })
                            .collect::<Vec<_>>();
                        format!(
                            "Carrier performance (worst average delay first):\n{}",
                            render_table(
                                &[
                                    "Carrier",
                                    "Total_Shipments",
                                    "Avg_Delay_Hours",
                                    "On_Time_Count",
                                    "On_Time_Rate_%",
                                ],
                                &cells,
                            )
                        )
                    }
                }
                Err(error) => data_failure(&error),
            },
            Intent::SuggestActions => render_suggestions(&suggest_actions(&self.last_result)),
            Intent::StopAlert { bol, reason } => {
                self.executor.stop_alert(&mut self.store, bol, reason).message
            }
            Intent::AddNote { bol, note } => {
                let outcome = self.executor.add_note(&mut self.store, bol, note);
                match outcome.detail {
                    Some(detail) if outcome.success => {
                        format!("{} (note recorded as: {detail})", outcome.message)
                    }
                    _ => outcome.message,
                }
            }
            Intent::SendEmail { bol, escalate } => {
                self.executor.send_email_alert(&mut self.store, bol, *escalate).message
            }
            Intent::ShowActionLog => render_action_log(self.executor.action_log()),
            Intent::DailySummary { save } => match self.store.joined() {
                Ok(rows) => {
                    let rows = rows.to_vec();
                    let summary = self.reporter.daily_summary(&rows);
                    if *save {
                        match self.reporter.save_to_file(&summary, None) {
                            Ok(path) => {
                                format!("{summary}\nSaved to {}", path.display())
                            }
                            Err(error) => {
                                tracing::warn!(%error, "report save failed");
                                format!("{summary}\nCould not save the report: {error}")
                            }
                        }
                    } else {
                        summary
                    }
                }
                Err(error) => data_failure(&error),
            },
            Intent::Unknown { clarification } => clarification.clone(),
        }
    }

    fn run_query(
        &mut self,
        title: &str,
        operation: impl FnOnce(&[JoinedRow]) -> Vec<JoinedRow>,
    ) -> String {
        match self.store.joined() {
            Ok(rows) => {
                let result = operation(rows);
                let reply = self.reporter.detailed_report(&result, title);
                self.last_result = result;
                reply
            }
            Err(error) => data_failure(&error),
        }
    }

    pub fn refresh(&mut self) -> Result<(), DataError> {
        self.last_result.clear();
        self.store.refresh()
    }

    pub fn store_mut(&mut self) -> &mut DatasetStore {
        &mut self.store
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut ConversationMemory {
        &mut self.memory
    }

    pub fn action_log(&self) -> &[ActionLogEntry] {
        self.executor.action_log()
    }
}

fn data_failure(error: &DataError) -> String {
    format!("Could not access the alert data: {error}")
}

fn render_action_log(entries: &[ActionLogEntry]) -> String {
    if entries.is_empty() {
        return "No actions have been taken this session.".to_string();
    }
    let mut output = String::from("Action log (oldest first):\n");
    for entry in entries {
        output.push_str(&format!(
            "- [{timestamp}] {kind} on {bol} ({status})\n",
            timestamp = entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            kind = entry.kind,
            bol = entry.bol,
            status = if entry.success { "ok" } else { "failed" },
        ));
    }
    output
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::Path;

    use otifly_core::action::{ActionExecutor, ActionKind, CollectingSink};
    use otifly_core::collab::TemplateCollaborator;
    use otifly_core::dataset::DatasetStore;
    use otifly_core::memory::{ConversationMemory, Role};
    use otifly_core::query;
    use otifly_core::report::ReportBuilder;
    use tempfile::TempDir;

    use super::AgentRuntime;

    fn write_file(path: &Path, content: &str) {
        let mut file = std::fs::File::create(path).expect("create fixture");
        write!(file, "{content}").expect("write fixture");
    }

    fn seeded_store(dir: &TempDir) -> DatasetStore {
        let alert_path = dir.path().join("Alert.csv");
        let bol_path = dir.path().join("BOL.csv");
        write_file(
            &alert_path,
            "BOL,Customer,Facility,Alert_Type,Material_Name,OTIF_Risk_Score,Days_Left_for_Delivery,Stop_Alert,User_Notes,Alert_Start_Date\n\
             BOL10001,Acme Foods,Palatka,Late Departure,Cardboard,0.92,1,No,,2026-08-24\n\
             BOL10002,Northwind,Savannah,Carrier Delay,Pulp,0.55,4,No,,2026-08-23\n",
        );
        write_file(
            &bol_path,
            "BOL,Carrier_Name,Delivery_Status,No_of_Hours_Delayed,User_Email_ID\n\
             BOL10001,Roadrunner,Delayed,20,ops@acme.example\n\
             BOL10002,Coyote Lines,On Time,0,desk@northwind.example\n",
        );
        DatasetStore::new(alert_path, bol_path)
    }

    fn runtime(dir: &TempDir) -> AgentRuntime {
        let store = seeded_store(dir);
        let executor = ActionExecutor::new(
            Box::new(TemplateCollaborator),
            Box::new(CollectingSink::default()),
        );
        let reporter = ReportBuilder::new(dir.path().join("reports"));
        let memory = ConversationMemory::new(50);
        AgentRuntime::new(store, executor, reporter, memory)
    }

    #[test]
    fn query_turn_renders_a_report_and_records_both_sides() {
        let dir = TempDir::new().expect("tempdir");
        let mut runtime = runtime(&dir);

        let reply = runtime.handle_message("show me high risk alerts above 70%");
        assert!(reply.contains("High Risk Alerts"));
        assert!(reply.contains("BOL10001"));
        assert!(!reply.contains("BOL10002"));

        let recent = runtime.memory().recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].role, Role::User);
        assert_eq!(recent[1].role, Role::Assistant);
        assert_eq!(recent[1].metadata.get("intent").map(String::as_str), Some("query.high_risk"));
    }

    #[test]
    fn action_turn_mutates_state_and_logs() {
        let dir = TempDir::new().expect("tempdir");
        let mut runtime = runtime(&dir);

        let reply = runtime.handle_message("stop alert for BOL10001 because issue resolved");
        assert!(reply.contains("has been stopped"));

        let log = runtime.action_log();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].kind, ActionKind::StopAlert);
        assert_eq!(log[0].bol, "BOL10001");
    }

    #[test]
    fn suggestions_refer_to_the_previous_query_result() {
        let dir = TempDir::new().expect("tempdir");
        let mut runtime = runtime(&dir);

        let cold = runtime.handle_message("suggest actions");
        assert!(cold.contains("Run a query first"));

        runtime.handle_message("show me high risk alerts above 70%");
        let reply = runtime.handle_message("suggest actions for these alerts");
        assert!(reply.contains("BOL10001"));
        assert!(reply.contains("Escalate"));
    }

    #[test]
    fn unknown_bol_in_an_action_is_a_polite_failure() {
        let dir = TempDir::new().expect("tempdir");
        let mut runtime = runtime(&dir);

        let reply = runtime.handle_message("stop alert for BOL99999");
        assert!(reply.contains("not found"));
        assert!(runtime.action_log().is_empty());
    }

    #[test]
    fn daily_summary_turn_can_save_to_file() {
        let dir = TempDir::new().expect("tempdir");
        let mut runtime = runtime(&dir);

        let reply = runtime.handle_message("save the daily report");
        assert!(reply.contains("DAILY SUMMARY REPORT"));
        assert!(reply.contains("Saved to "));
    }

    #[test]
    fn refresh_discards_unsaved_edits_and_context() {
        let dir = TempDir::new().expect("tempdir");
        let mut runtime = runtime(&dir);

        runtime.handle_message("show me high risk alerts");
        runtime.handle_message("stop alert for BOL10001");
        runtime.refresh().expect("refresh");

        let alerts = runtime.store_mut().alerts().expect("alerts");
        assert!(alerts.iter().all(|alert| !alert.stop_alert));
        assert!(runtime.handle_message("suggest actions").contains("Run a query first"));
    }

    // The load-query-act loop from top to bottom through direct calls.
    #[test]
    fn end_to_end_single_row_scenario() {
        let dir = TempDir::new().expect("tempdir");
        let alert_path = dir.path().join("Alert.csv");
        let bol_path = dir.path().join("BOL.csv");
        write_file(
            &alert_path,
            "BOL,Customer,Facility,Alert_Type,Material_Name,OTIF_Risk_Score,Days_Left_for_Delivery,Stop_Alert,User_Notes,Alert_Start_Date\n\
             B1,Acme,Plant 1,Late Departure,Paper,0.9,1,No,,2026-08-24\n",
        );
        write_file(
            &bol_path,
            "BOL,Carrier_Name,Delivery_Status,No_of_Hours_Delayed,User_Email_ID\n\
             B1,X,Delayed,20,owner@acme.example\n",
        );

        let mut store = DatasetStore::new(alert_path, bol_path);
        let joined = store.joined().expect("joined view").to_vec();
        let high_risk = query::high_risk_alerts(&joined, 0.7);
        assert_eq!(high_risk.len(), 1);
        assert_eq!(high_risk[0].bol_id(), "B1");

        let mut executor = ActionExecutor::new(
            Box::new(TemplateCollaborator),
            Box::new(CollectingSink::default()),
        );
        let outcome = executor.stop_alert(&mut store, "B1", "fixed");
        assert!(outcome.success);

        let log = executor.action_log();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].bol, "B1");
    }
}
