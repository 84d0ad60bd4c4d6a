//! Interactive assistant loop.
//!
//! Local commands (`help`, `status`, `refresh`, `memory`, `clear`, and the
//! exit words) are handled here without touching the intent router; every
//! other line goes to the agent runtime as a conversational turn.

use std::io::{self, BufRead, Write};

use otifly_agent::AgentRuntime;
use otifly_core::config::AppConfig;

use super::CommandResult;

const BANNER: &str = "Otifly - OTIF alert assistant\n\
                      Ask about alerts, delays, carriers, or reports.\n\
                      Type 'help' for commands, 'exit' to leave.";

const HELP_TEXT: &str = "Things you can ask:\n\
    - show alerts for <customer> at <facility>\n\
    - which BOLs are delayed more than 10 hours\n\
    - show high risk alerts above 80%\n\
    - alerts with 3 days or less remaining\n\
    - delivery status summary / carrier performance\n\
    - search for <text>\n\
    - suggest actions (after a query)\n\
    - stop alert for BOL10001 because <reason>\n\
    - add note to BOL10001: <note>\n\
    - send email alert for BOL10001 / escalate BOL10001\n\
    - show the action log / daily summary / save the daily report\n\
Local commands: help, status, refresh, memory, clear, exit";

/// One reply from the session, plus whether the loop should end.
pub struct Turn {
    pub reply: String,
    pub quit: bool,
}

pub struct ChatSession {
    runtime: AgentRuntime,
}

impl ChatSession {
    pub fn new(runtime: AgentRuntime) -> Self {
        Self { runtime }
    }

    pub fn respond(&mut self, line: &str) -> Turn {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Turn { reply: String::new(), quit: false };
        }

        match trimmed.to_lowercase().as_str() {
            "exit" | "quit" | "bye" => {
                Turn { reply: "Goodbye. Unsaved edits are discarded.".to_string(), quit: true }
            }
            "help" => Turn { reply: HELP_TEXT.to_string(), quit: false },
            "status" => Turn { reply: self.status(), quit: false },
            "refresh" => {
                let reply = match self.runtime.refresh() {
                    Ok(()) => "Data reloaded from disk. Unsaved edits were discarded.".to_string(),
                    Err(error) => format!("Refresh failed: {error}"),
                };
                Turn { reply, quit: false }
            }
            "memory" => {
                Turn { reply: self.runtime.memory().summary().to_string(), quit: false }
            }
            "clear" => {
                self.runtime.memory_mut().clear();
                Turn { reply: "Conversation memory cleared.".to_string(), quit: false }
            }
            _ => Turn { reply: self.runtime.handle_message(trimmed), quit: false },
        }
    }

    fn status(&mut self) -> String {
        let alert_count = match self.runtime.store_mut().alerts() {
            Ok(alerts) => alerts.len().to_string(),
            Err(error) => format!("unavailable ({error})"),
        };
        let bol_count = match self.runtime.store_mut().bols() {
            Ok(bols) => bols.len().to_string(),
            Err(error) => format!("unavailable ({error})"),
        };
        format!(
            "Alerts loaded: {alert_count}\nBOL records loaded: {bol_count}\n\
             Actions this session: {actions}\nMessages in memory: {messages}",
            actions = self.runtime.action_log().len(),
            messages = self.runtime.memory().len(),
        )
    }
}

pub fn run(config: &AppConfig) -> CommandResult {
    let runtime = AgentRuntime::from_config(config);
    let mut session = ChatSession::new(runtime);

    println!("{BANNER}");

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        print!("> ");
        if stdout.flush().is_err() {
            break;
        }

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(error) => {
                return CommandResult::failure(format!("could not read input: {error}"), 1);
            }
        }

        let turn = session.respond(&line);
        if !turn.reply.is_empty() {
            println!("{}", turn.reply);
        }
        if turn.quit {
            break;
        }
    }

    CommandResult::success("")
}
