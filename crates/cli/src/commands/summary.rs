use otifly_core::config::AppConfig;
use otifly_core::dataset::DatasetStore;
use otifly_core::report::ReportBuilder;

use super::CommandResult;

pub fn run(config: &AppConfig, save: bool) -> CommandResult {
    let mut store =
        DatasetStore::new(config.data.alert_file.clone(), config.data.bol_file.clone());
    let rows = match store.joined() {
        Ok(rows) => rows.to_vec(),
        Err(error) => {
            return CommandResult::failure(format!("could not load alert data: {error}"), 1);
        }
    };

    let mut reporter = ReportBuilder::new(config.reports.output_dir.clone());
    let summary = reporter.daily_summary(&rows);

    if save {
        match reporter.save_to_file(&summary, None) {
            Ok(path) => CommandResult::success(format!("{summary}\nSaved to {}", path.display())),
            Err(error) => {
                CommandResult::failure(format!("{summary}\ncould not save report: {error}"), 1)
            }
        }
    } else {
        CommandResult::success(summary)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use otifly_core::config::AppConfig;
    use tempfile::TempDir;

    use super::run;

    fn config_with_data(dir: &TempDir) -> AppConfig {
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

        let mut config = AppConfig::default();
        config.data.alert_file = alert_path;
        config.data.bol_file = bol_path;
        config.reports.output_dir = dir.path().join("reports");
        config
    }

    #[test]
    fn prints_the_daily_summary() {
        let dir = TempDir::new().expect("tempdir");
        let result = run(&config_with_data(&dir), false);
        assert_eq!(result.exit_code, 0);
        assert!(result.output.contains("DAILY SUMMARY REPORT"));
        assert!(!result.output.contains("Saved to"));
    }

    #[test]
    fn save_writes_a_report_file() {
        let dir = TempDir::new().expect("tempdir");
        let config = config_with_data(&dir);
        let result = run(&config, true);
        assert_eq!(result.exit_code, 0);
        assert!(result.output.contains("Saved to"));
        let reports: Vec<_> = std::fs::read_dir(config.reports.output_dir)
            .expect("report dir")
            .collect();
        assert_eq!(reports.len(), 1);
    }

    #[test]
    fn missing_data_is_a_failure_exit() {
        let dir = TempDir::new().expect("tempdir");
        let mut config = AppConfig::default();
        config.data.alert_file = dir.path().join("nope.csv");
        config.data.bol_file = dir.path().join("also-nope.csv");
        let result = run(&config, false);
        assert_eq!(result.exit_code, 1);
        assert!(result.output.contains("could not load alert data"));
    }
}
