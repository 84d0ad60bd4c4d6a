use std::env;
use std::fs;
use std::path::PathBuf;

use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub data: DataConfig,
    pub llm: LlmConfig,
    pub reports: ReportConfig,
    pub memory: MemoryConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DataConfig {
    pub alert_file: PathBuf,
    pub bol_file: PathBuf,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ReportConfig {
    pub output_dir: PathBuf,
}

#[derive(Clone, Debug)]
pub struct MemoryConfig {
    pub max_messages: usize,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    /// No collaborator; the deterministic templates are used directly.
    Disabled,
    OpenAi,
    Ollama,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data: DataConfig {
                alert_file: PathBuf::from("./data/Alert.csv"),
                bol_file: PathBuf::from("./data/BOL.csv"),
            },
            llm: LlmConfig {
                provider: LlmProvider::Disabled,
                api_key: None,
                base_url: "http://localhost:11434/v1".to_string(),
                model: "llama3.1".to_string(),
                timeout_secs: 30,
            },
            reports: ReportConfig { output_dir: PathBuf::from("./reports") },
            memory: MemoryConfig { max_messages: 100 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

/// Partial on-disk shape; anything absent falls back to the defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    #[serde(default)]
    data: FileDataConfig,
    #[serde(default)]
    llm: FileLlmConfig,
    #[serde(default)]
    reports: FileReportConfig,
    #[serde(default)]
    memory: FileMemoryConfig,
    #[serde(default)]
    logging: FileLoggingConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileDataConfig {
    alert_file: Option<PathBuf>,
    bol_file: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileLlmConfig {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileReportConfig {
    output_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileMemoryConfig {
    max_messages: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileLoggingConfig {
    level: Option<String>,
    format: Option<LogFormat>,
}

const DEFAULT_CONFIG_FILE: &str = "otifly.toml";

impl AppConfig {
    /// Defaults, overlaid by the TOML file (when present), overlaid by
    /// `OTIFLY_*` environment variables, then validated.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let path =
            options.config_path.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        if path.exists() {
            let raw = fs::read_to_string(&path)
                .map_err(|source| ConfigError::ReadFile { path: path.clone(), source })?;
            let file: FileConfig = toml::from_str(&raw)
                .map_err(|source| ConfigError::ParseFile { path: path.clone(), source })?;
            config.apply_file(file);
        } else if options.require_file {
            return Err(ConfigError::MissingConfigFile(path));
        }

        config.apply_env_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn apply_file(&mut self, file: FileConfig) {
        if let Some(path) = file.data.alert_file {
            self.data.alert_file = path;
        }
        if let Some(path) = file.data.bol_file {
            self.data.bol_file = path;
        }
        if let Some(provider) = file.llm.provider {
            self.llm.provider = provider;
        }
        if let Some(api_key) = file.llm.api_key {
            self.llm.api_key = Some(api_key.into());
        }
        if let Some(base_url) = file.llm.base_url {
            self.llm.base_url = base_url;
        }
        if let Some(model) = file.llm.model {
            self.llm.model = model;
        }
        if let Some(timeout) = file.llm.timeout_secs {
            self.llm.timeout_secs = timeout;
        }
        if let Some(dir) = file.reports.output_dir {
            self.reports.output_dir = dir;
        }
        if let Some(max) = file.memory.max_messages {
            self.memory.max_messages = max;
        }
        if let Some(level) = file.logging.level {
            self.logging.level = level;
        }
        if let Some(format) = file.logging.format {
            self.logging.format = format;
        }
    }

    /// Environment overrides are read through a lookup so tests can pass a
    /// map instead of mutating the process environment.
    pub fn apply_env_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(value) = lookup("OTIFLY_ALERT_FILE") {
            self.data.alert_file = PathBuf::from(value);
        }
        if let Some(value) = lookup("OTIFLY_BOL_FILE") {
            self.data.bol_file = PathBuf::from(value);
        }
        if let Some(value) = lookup("OTIFLY_REPORT_DIR") {
            self.reports.output_dir = PathBuf::from(value);
        }
        if let Some(value) = lookup("OTIFLY_MEMORY_MAX") {
            self.memory.max_messages = value.parse().map_err(|_| {
                ConfigError::InvalidEnvOverride { key: "OTIFLY_MEMORY_MAX".to_string(), value }
            })?;
        }
        if let Some(value) = lookup("OTIFLY_LLM_PROVIDER") {
            self.llm.provider = match value.to_ascii_lowercase().as_str() {
                "disabled" => LlmProvider::Disabled,
                "openai" | "open_ai" => LlmProvider::OpenAi,
                "ollama" => LlmProvider::Ollama,
                _ => {
                    return Err(ConfigError::InvalidEnvOverride {
                        key: "OTIFLY_LLM_PROVIDER".to_string(),
                        value,
                    })
                }
            };
        }
        if let Some(value) = lookup("OTIFLY_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = lookup("OTIFLY_LLM_BASE_URL") {
            self.llm.base_url = value;
        }
        if let Some(value) = lookup("OTIFLY_LLM_API_KEY") {
            self.llm.api_key = Some(value.into());
        }
        if let Some(value) = lookup("OTIFLY_LOG_LEVEL") {
            self.logging.level = value;
        }
        if let Some(value) = lookup("OTIFLY_LOG_FORMAT") {
            self.logging.format = match value.to_ascii_lowercase().as_str() {
                "compact" => LogFormat::Compact,
                "pretty" => LogFormat::Pretty,
                "json" => LogFormat::Json,
                _ => {
                    return Err(ConfigError::InvalidEnvOverride {
                        key: "OTIFLY_LOG_FORMAT".to_string(),
                        value,
                    })
                }
            };
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.memory.max_messages == 0 {
            return Err(ConfigError::Validation(
                "memory.max_messages must be at least 1".to_string(),
            ));
        }
        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
        }
        if self.llm.provider == LlmProvider::OpenAi && self.llm.api_key.is_none() {
            return Err(ConfigError::Validation(
                "llm.provider = openai requires an API key (llm.api_key or OTIFLY_LLM_API_KEY)"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::{AppConfig, ConfigError, LlmProvider, LoadOptions, LogFormat};

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_validate() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.llm.provider, LlmProvider::Disabled);
        assert_eq!(config.memory.max_messages, 100);
    }

    #[test]
    fn file_values_overlay_defaults() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let path = dir.path().join("otifly.toml");
        let mut file = std::fs::File::create(&path).expect("create config");
        writeln!(
            file,
            "[data]\nalert_file = \"/srv/otif/Alert.csv\"\n\n\
             [memory]\nmax_messages = 25\n\n\
             [logging]\nlevel = \"debug\"\nformat = \"json\""
        )
        .expect("write config");

        let config = AppConfig::load(LoadOptions {
            config_path: Some(path),
            require_file: true,
        })
        .expect("load");
        assert_eq!(config.data.alert_file.to_str(), Some("/srv/otif/Alert.csv"));
        assert_eq!(config.data.bol_file.to_str(), Some("./data/BOL.csv"));
        assert_eq!(config.memory.max_messages, 25);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn missing_required_file_is_an_error() {
        let result = AppConfig::load(LoadOptions {
            config_path: Some("/definitely/not/here.toml".into()),
            require_file: true,
        });
        assert!(matches!(result, Err(ConfigError::MissingConfigFile(_))));
    }

    #[test]
    fn env_overrides_win_over_defaults() {
        let mut config = AppConfig::default();
        config
            .apply_env_overrides(lookup_from(&[
                ("OTIFLY_MEMORY_MAX", "7"),
                ("OTIFLY_LLM_PROVIDER", "ollama"),
                ("OTIFLY_LOG_FORMAT", "pretty"),
            ]))
            .expect("overrides apply");
        assert_eq!(config.memory.max_messages, 7);
        assert_eq!(config.llm.provider, LlmProvider::Ollama);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn malformed_env_override_is_rejected() {
        let mut config = AppConfig::default();
        let result =
            config.apply_env_overrides(lookup_from(&[("OTIFLY_MEMORY_MAX", "a lot")]));
        assert!(matches!(result, Err(ConfigError::InvalidEnvOverride { .. })));
    }

    #[test]
    fn openai_without_api_key_fails_validation() {
        let mut config = AppConfig::default();
        config.llm.provider = LlmProvider::OpenAi;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }
}
