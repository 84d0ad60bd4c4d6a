use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::errors::DataError;

/// Columns that must be present in the Alert source header row.
const ALERT_COLUMNS: &[&str] =
    &["BOL", "Customer", "Facility", "Alert_Type", "OTIF_Risk_Score", "Days_Left_for_Delivery"];

/// Columns that must be present in the BOL source header row.
const BOL_COLUMNS: &[&str] = &["BOL", "Carrier_Name", "Delivery_Status", "No_of_Hours_Delayed"];

/// One row of the Alert table, keyed by BOL.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    #[serde(rename = "BOL")]
    pub bol: String,
    #[serde(rename = "Customer")]
    pub customer: Option<String>,
    #[serde(rename = "Facility")]
    pub facility: Option<String>,
    #[serde(rename = "Alert_Type")]
    pub alert_type: Option<String>,
    #[serde(rename = "Material_Name", default)]
    pub material_name: Option<String>,
    #[serde(rename = "OTIF_Risk_Score")]
    pub otif_risk_score: f64,
    #[serde(rename = "Days_Left_for_Delivery")]
    pub days_left_for_delivery: i64,
    #[serde(rename = "Stop_Alert", with = "yes_no", default)]
    pub stop_alert: bool,
    #[serde(rename = "User_Notes", default)]
    pub user_notes: Option<String>,
    #[serde(rename = "Alert_Start_Date", default)]
    pub alert_start_date: Option<NaiveDate>,
}

/// One row of the BOL table, keyed by BOL.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BolRecord {
    #[serde(rename = "BOL")]
    pub bol: String,
    #[serde(rename = "Carrier_Name")]
    pub carrier_name: Option<String>,
    #[serde(rename = "Delivery_Status")]
    pub delivery_status: Option<String>,
    #[serde(rename = "No_of_Hours_Delayed")]
    pub no_of_hours_delayed: i64,
    #[serde(rename = "User_Email_ID", default)]
    pub user_email_id: Option<String>,
}

/// One row of the inner join Alert x BOL. The alert side is a snapshot of
/// the canonical alert table at recompute time; the join is invalidated and
/// rebuilt after every alert mutation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct JoinedRow {
    pub alert: AlertRecord,
    pub bol: BolRecord,
}

impl JoinedRow {
    pub fn bol_id(&self) -> &str {
        &self.alert.bol
    }
}

/// Loads and caches the Alert and BOL tables plus their inner join.
///
/// Ownership model: the alert table is the single mutable source of truth.
/// `alert_mut` invalidates the cached join, which is recomputed lazily on the
/// next `joined` call. `refresh` re-reads both files and therefore discards
/// any in-memory edits (stop flags, notes) that were never written back to
/// the source files.
pub struct DatasetStore {
    alert_path: PathBuf,
    bol_path: PathBuf,
    alerts: Option<Vec<AlertRecord>>,
    bols: Option<Vec<BolRecord>>,
    joined: Option<Vec<JoinedRow>>,
}

impl DatasetStore {
    pub fn new(alert_path: impl Into<PathBuf>, bol_path: impl Into<PathBuf>) -> Self {
        Self {
            alert_path: alert_path.into(),
            bol_path: bol_path.into(),
            alerts: None,
            bols: None,
            joined: None,
        }
    }

    pub fn alert_path(&self) -> &Path {
        &self.alert_path
    }

    pub fn bol_path(&self) -> &Path {
        &self.bol_path
    }

    pub fn is_loaded(&self) -> bool {
        self.alerts.is_some() && self.bols.is_some()
    }

    /// Reads both sources and rebuilds the joined view.
    pub fn load(&mut self) -> Result<(), DataError> {
        let alerts: Vec<AlertRecord> = read_table(&self.alert_path, ALERT_COLUMNS)?;
        let bols: Vec<BolRecord> = read_table(&self.bol_path, BOL_COLUMNS)?;
        tracing::info!(
            alert_records = alerts.len(),
            bol_records = bols.len(),
            "loaded alert and BOL sources"
        );

        let joined = inner_join(&alerts, &bols);
        tracing::info!(joined_records = joined.len(), "built combined view");

        self.alerts = Some(alerts);
        self.bols = Some(bols);
        self.joined = Some(joined);
        Ok(())
    }

    /// Re-reads both files from disk, discarding cached tables and any
    /// unsaved in-memory mutations.
    pub fn refresh(&mut self) -> Result<(), DataError> {
        self.load()
    }

    pub fn alerts(&mut self) -> Result<&[AlertRecord], DataError> {
        self.ensure_loaded()?;
        Ok(self.alerts.as_deref().unwrap_or_default())
    }

    pub fn bols(&mut self) -> Result<&[BolRecord], DataError> {
        self.ensure_loaded()?;
        Ok(self.bols.as_deref().unwrap_or_default())
    }

    pub fn joined(&mut self) -> Result<&[JoinedRow], DataError> {
        self.ensure_loaded()?;
        if self.joined.is_none() {
            let alerts = self.alerts.as_deref().unwrap_or_default();
            let bols = self.bols.as_deref().unwrap_or_default();
            self.joined = Some(inner_join(alerts, bols));
        }
        Ok(self.joined.as_deref().unwrap_or_default())
    }

    /// Mutable access to one alert row. Returns `Ok(None)` when the BOL is
    /// unknown. A hit invalidates the cached join.
    pub fn alert_mut(&mut self, bol: &str) -> Result<Option<&mut AlertRecord>, DataError> {
        self.ensure_loaded()?;
        let exists =
            self.alerts.as_ref().is_some_and(|rows| rows.iter().any(|row| row.bol == bol));
        if !exists {
            return Ok(None);
        }
        self.joined = None;
        Ok(self.alerts.as_mut().and_then(|rows| rows.iter_mut().find(|row| row.bol == bol)))
    }

    fn ensure_loaded(&mut self) -> Result<(), DataError> {
        if self.is_loaded() {
            return Ok(());
        }
        self.load()
    }
}

fn read_table<T: DeserializeOwned>(path: &Path, required: &[&str]) -> Result<Vec<T>, DataError> {
    if !path.exists() {
        return Err(DataError::SourceNotFound { path: path.to_path_buf() });
    }

    let mut reader = csv::Reader::from_path(path)
        .map_err(|source| DataError::Load { path: path.to_path_buf(), source })?;

    let headers = reader
        .headers()
        .map_err(|source| DataError::Load { path: path.to_path_buf(), source })?
        .clone();
    let missing = required
        .iter()
        .filter(|column| !headers.iter().any(|header| header == **column))
        .map(|column| (*column).to_string())
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        return Err(DataError::Schema { path: path.to_path_buf(), details: missing.join(", ") });
    }

    let mut rows = Vec::new();
    for record in reader.deserialize() {
        let row: T =
            record.map_err(|source| DataError::Load { path: path.to_path_buf(), source })?;
        rows.push(row);
    }
    Ok(rows)
}

fn inner_join(alerts: &[AlertRecord], bols: &[BolRecord]) -> Vec<JoinedRow> {
    let by_bol =
        bols.iter().map(|record| (record.bol.as_str(), record)).collect::<HashMap<_, _>>();

    alerts
        .iter()
        .filter_map(|alert| {
            by_bol
                .get(alert.bol.as_str())
                .map(|bol| JoinedRow { alert: alert.clone(), bol: (*bol).clone() })
        })
        .collect()
}

/// Serde codec for the `Stop_Alert` yes/no flag.
pub(crate) mod yes_no {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(if *value { "Yes" } else { "No" })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        Ok(matches!(raw.trim().to_ascii_lowercase().as_str(), "yes" | "y" | "true" | "1"))
    }
}
