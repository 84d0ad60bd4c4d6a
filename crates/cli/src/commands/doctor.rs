use std::fs;

use otifly_core::config::{AppConfig, LlmProvider, LoadOptions};
use otifly_core::dataset::DatasetStore;
use serde::Serialize;

use super::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(options: &LoadOptions, json_output: bool) -> CommandResult {
    let report = build_report(options);
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report(options: &LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options.clone()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_data_sources(&config));
            checks.push(check_report_directory(&config));
            checks.push(check_llm_collaborator(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["data_sources", "report_directory", "llm_collaborator"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_data_sources(config: &AppConfig) -> DoctorCheck {
    let mut store =
        DatasetStore::new(config.data.alert_file.clone(), config.data.bol_file.clone());
    match store.joined() {
        Ok(rows) => DoctorCheck {
            name: "data_sources",
            status: CheckStatus::Pass,
            details: format!(
                "loaded `{}` and `{}` ({} joined rows)",
                config.data.alert_file.display(),
                config.data.bol_file.display(),
                rows.len(),
            ),
        },
        Err(error) => DoctorCheck {
            name: "data_sources",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn check_report_directory(config: &AppConfig) -> DoctorCheck {
    match fs::create_dir_all(&config.reports.output_dir) {
        Ok(()) => DoctorCheck {
            name: "report_directory",
            status: CheckStatus::Pass,
            details: format!("`{}` is writable", config.reports.output_dir.display()),
        },
        Err(error) => DoctorCheck {
            name: "report_directory",
            status: CheckStatus::Fail,
            details: format!(
                "could not prepare `{}`: {error}",
                config.reports.output_dir.display()
            ),
        },
    }
}

fn check_llm_collaborator(config: &AppConfig) -> DoctorCheck {
    let details = match config.llm.provider {
        LlmProvider::Disabled => {
            "provider disabled; deterministic templates will be used".to_string()
        }
        LlmProvider::OpenAi => {
            format!("openai provider configured with model `{}`", config.llm.model)
        }
        LlmProvider::Ollama => format!(
            "ollama provider configured at `{}` with model `{}`",
            config.llm.base_url, config.llm.model
        ),
    };
    DoctorCheck { name: "llm_collaborator", status: CheckStatus::Pass, details }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use otifly_core::config::LoadOptions;
    use tempfile::TempDir;

    use super::run;

    fn write_config(dir: &TempDir) -> LoadOptions {
        let alert_path = dir.path().join("Alert.csv");
        let bol_path = dir.path().join("BOL.csv");
        let mut alerts = std::fs::File::create(&alert_path).expect("create alerts");
        write!(
            alerts,
            "BOL,Customer,Facility,Alert_Type,Material_Name,OTIF_Risk_Score,Days_Left_for_Delivery,Stop_Alert,User_Notes,Alert_Start_Date\n\
             BOL10001,Acme Foods,Palatka,Late Departure,Cardboard,0.92,1,No,,2026-08-24\n"
        )
        .expect("write alerts");
        let mut bols = std::fs::File::create(&bol_path).expect("create bols");
        write!(
            bols,
            "BOL,Carrier_Name,Delivery_Status,No_of_Hours_Delayed,User_Email_ID\n\
             BOL10001,Roadrunner,Delayed,20,ops@acme.example\n"
        )
        .expect("write bols");

        let config_path = dir.path().join("otifly.toml");
        let mut config = std::fs::File::create(&config_path).expect("create config");
        writeln!(
            config,
            "[data]\nalert_file = {alert:?}\nbol_file = {bol:?}\n\n[reports]\noutput_dir = {reports:?}",
            alert = alert_path,
            bol = bol_path,
            reports = dir.path().join("reports"),
        )
        .expect("write config");

        LoadOptions { config_path: Some(config_path), require_file: true }
    }

    #[test]
    fn healthy_setup_passes_all_checks() {
        let dir = TempDir::new().expect("tempdir");
        let result = run(&write_config(&dir), false);
        assert_eq!(result.exit_code, 0);
        assert!(result.output.contains("all readiness checks passed"));
        assert!(result.output.contains("[ok] data_sources"));
    }

    #[test]
    fn missing_data_fails_the_data_check() {
        let dir = TempDir::new().expect("tempdir");
        let options = write_config(&dir);
        std::fs::remove_file(dir.path().join("Alert.csv")).expect("remove alerts");

        let result = run(&options, false);
        assert_eq!(result.exit_code, 1);
        assert!(result.output.contains("[fail] data_sources"));
    }

    #[test]
    fn json_output_is_machine_readable() {
        let dir = TempDir::new().expect("tempdir");
        let result = run(&write_config(&dir), true);
        let parsed: serde_json::Value =
            serde_json::from_str(&result.output).expect("valid json");
        assert_eq!(parsed["overall_status"], "pass");
        assert_eq!(parsed["checks"].as_array().map(Vec::len), Some(4));
    }

    #[test]
    fn broken_config_is_reported_not_fatal() {
        let dir = TempDir::new().expect("tempdir");
        let config_path = dir.path().join("otifly.toml");
        std::fs::write(&config_path, "[memory]\nmax_messages = 0\n").expect("write config");

        let result = run(
            &LoadOptions { config_path: Some(config_path), require_file: true },
            false,
        );
        assert_eq!(result.exit_code, 1);
        assert!(result.output.contains("[fail] config_validation"));
        assert!(result.output.contains("[skip] data_sources"));
    }
}
