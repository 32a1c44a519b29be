use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON5 parse error: {0}")]
    Json5(#[from] json5::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error("Config directory not found")]
    NoDirFound,
}

/// Where event rows come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Google Sheets values API.
    Sheets,
    /// Local JSON file, an array of header → cell objects.
    File,
}

/// Event table source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_source_kind")]
    pub kind: SourceKind,
    /// Spreadsheet ID (sheets source).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spreadsheet_id: Option<String>,
    /// API key (sheets source).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Sheet/table holding the events.
    #[serde(default = "default_table")]
    pub table: String,
    /// Path to the rows file (file source).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

fn default_source_kind() -> SourceKind {
    SourceKind::Sheets
}

fn default_table() -> String {
    "Hoja3".to_string()
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: default_source_kind(),
            spreadsheet_id: None,
            api_key: None,
            table: default_table(),
            path: None,
        }
    }
}

/// SMS gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_sid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    /// Sender number registered with the gateway.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_number: Option<String>,
    /// Country calling code prepended to local numbers, digits only.
    #[serde(default = "default_country_code")]
    pub country_code: String,
}

fn default_country_code() -> String {
    "57".to_string()
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            account_sid: None,
            auth_token: None,
            from_number: None,
            country_code: default_country_code(),
        }
    }
}

impl SmsConfig {
    /// Whether all gateway credentials are present.
    pub fn is_configured(&self) -> bool {
        self.account_sid.is_some() && self.auth_token.is_some() && self.from_number.is_some()
    }
}

/// How out-of-range calendar fields in start times are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarPolicy {
    /// Roll overflowing fields into the next unit (month 13 → January next year).
    #[default]
    Lenient,
    /// Reject any out-of-range field.
    Strict,
}

/// Poll loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between cycles.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Lead times in whole hours.
    #[serde(default = "default_thresholds")]
    pub thresholds: Vec<u32>,
    /// IANA zone the sheet's wall-clock times are written in.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub calendar: CalendarPolicy,
}

fn default_interval_secs() -> u64 {
    300
}

fn default_thresholds() -> Vec<u32> {
    vec![48, 24, 1]
}

fn default_timezone() -> String {
    "America/Bogota".to_string()
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            thresholds: default_thresholds(),
            timezone: default_timezone(),
            calendar: CalendarPolicy::default(),
        }
    }
}

/// Sent-notification deduplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_retention_hours")]
    pub retention_hours: u32,
}

fn default_true() -> bool {
    true
}

fn default_retention_hours() -> u32 {
    24
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            retention_hours: default_retention_hours(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Upper bound for a single delivery call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    20
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
    /// Reported by `/health`.
    #[serde(default = "default_environment")]
    pub environment: String,
}

fn default_port() -> u16 {
    3001
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            environment: default_environment(),
        }
    }
}

/// Top-level herald configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeraldConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub sms: SmsConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub dedup: DedupConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl HeraldConfig {
    /// Overlay values found through `lookup` (normally the process environment).
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("GOOGLE_SHEETS_ID") {
            self.source.spreadsheet_id = Some(v);
        }
        if let Some(v) = get("GOOGLE_API_KEY") {
            self.source.api_key = Some(v);
        }
        if let Some(v) = get("TWILIO_ACCOUNT_SID") {
            self.sms.account_sid = Some(v);
        }
        if let Some(v) = get("TWILIO_AUTH_TOKEN") {
            self.sms.auth_token = Some(v);
        }
        if let Some(v) = get("TWILIO_PHONE_NUMBER") {
            self.sms.from_number = Some(v);
        }
        if let Some(v) = get("HERALD_ENV") {
            self.server.environment = v;
        }
        if let Some(v) = get("PORT") {
            match v.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!(
                    "The given PORT: {v} is not valid, keeping {}",
                    self.server.port
                ),
            }
        }
    }

    /// Check the values the scheduler cannot run without.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scheduler.thresholds.is_empty() {
            return Err(ConfigError::Invalid(
                "scheduler.thresholds must not be empty".into(),
            ));
        }
        if self.scheduler.interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "scheduler.interval_secs must be positive".into(),
            ));
        }
        if self.delivery.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "delivery.timeout_secs must be positive".into(),
            ));
        }
        self.timezone()?;
        if self.sms.country_code.is_empty()
            || !self.sms.country_code.chars().all(|c| c.is_ascii_digit())
        {
            return Err(ConfigError::Invalid(format!(
                "sms.country_code must be digits, got {:?}",
                self.sms.country_code
            )));
        }
        Ok(())
    }

    /// Parsed scheduler time zone.
    pub fn timezone(&self) -> Result<chrono_tz::Tz, ConfigError> {
        self.scheduler.timezone.parse().map_err(|_| {
            ConfigError::Invalid(format!(
                "unknown time zone {:?}",
                self.scheduler.timezone
            ))
        })
    }
}

/// Resolve the herald config directory (~/.herald/).
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|h| h.join(".herald"))
        .ok_or(ConfigError::NoDirFound)
}

/// Resolve the config file path (~/.herald/config.json5).
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.json5"))
}

/// Load configuration from `path` (or the default path), then `.env` and
/// environment overrides, then validate.
pub fn load_config(path: Option<&Path>) -> Result<HeraldConfig, ConfigError> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let path = match path {
        Some(p) => p.to_path_buf(),
        None => config_file_path()?,
    };
    let mut config = load_config_from(&path)?;
    config.apply_env(|key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}

/// Load configuration from a specific path, falling back to defaults if not found.
pub fn load_config_from(path: &Path) -> Result<HeraldConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!("Config file not found at {}, using defaults", path.display());
        return Ok(HeraldConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: HeraldConfig = json5::from_str(&content)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = HeraldConfig::default();
        assert_eq!(config.scheduler.thresholds, vec![48, 24, 1]);
        assert_eq!(config.scheduler.interval_secs, 300);
        assert_eq!(config.dedup.retention_hours, 24);
        assert!(config.dedup.enabled);
        assert_eq!(config.sms.country_code, "57");
        assert_eq!(config.source.table, "Hoja3");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_json5_parse() {
        let json5_str = r#"{
            source: { kind: "file", path: "events.json", table: "Eventos" },
            scheduler: { thresholds: [24, 12, 1], calendar: "strict" },
            dedup: { enabled: false },
            server: { port: 8080 },
        }"#;
        let config: HeraldConfig = json5::from_str(json5_str).unwrap();
        assert_eq!(config.source.kind, SourceKind::File);
        assert_eq!(config.source.table, "Eventos");
        assert_eq!(config.scheduler.thresholds, vec![24, 12, 1]);
        assert_eq!(config.scheduler.calendar, CalendarPolicy::Strict);
        assert_eq!(config.scheduler.timezone, "America/Bogota");
        assert!(!config.dedup.enabled);
        assert_eq!(config.dedup.retention_hours, 24);
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("TWILIO_ACCOUNT_SID", "AC123"),
            ("TWILIO_AUTH_TOKEN", "secret"),
            ("TWILIO_PHONE_NUMBER", "+15550001111"),
            ("GOOGLE_SHEETS_ID", "sheet-1"),
            ("PORT", "not-a-port"),
            ("GOOGLE_API_KEY", "  "),
        ]
        .into_iter()
        .collect();

        let mut config = HeraldConfig::default();
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert!(config.sms.is_configured());
        assert_eq!(config.source.spreadsheet_id.as_deref(), Some("sheet-1"));
        assert_eq!(config.source.api_key, None);
        assert_eq!(config.server.port, 3001);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = HeraldConfig::default();
        config.scheduler.thresholds.clear();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = HeraldConfig::default();
        config.scheduler.timezone = "Mars/Olympus".into();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = HeraldConfig::default();
        config.sms.country_code = "+57".into();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join("herald-config-does-not-exist.json5");
        let config = load_config_from(&path).unwrap();
        assert_eq!(config.server.port, 3001);
    }
}
