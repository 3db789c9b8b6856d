//! Configuration loading for the integration sync tool.
//!
//! Loads layered `.env` files and the process environment, producing a typed
//! [`AppConfig`]. Values needed only by some operations are checked when the
//! operation asks for them (see [`AppConfig::session_identity`] and friends).

use std::{collections::BTreeMap, env, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::SessionIdentity;
use crate::http::realm_api_base;
use crate::models::{IntegrationShape, RoleTarget};

pub const KEY_EMAIL: &str = "O11Y_EMAIL";
pub const KEY_PASSWORD: &str = "O11Y_PASSWORD";
pub const KEY_ORG_ID: &str = "O11Y_ORGID";
pub const KEY_REALM: &str = "O11Y_REALM";
pub const KEY_INTEGRATION_NAME: &str = "INTEGRATION_NAME";
pub const KEY_TOKEN_NAME: &str = "TOKEN_NAME";
pub const KEY_REGIONS: &str = "REGIONS";
pub const KEY_SFX_AWS_ACCOUNT_ARN: &str = "SFX_AWS_ACCNT_ARN";
pub const KEY_ROLE_ARN: &str = "ROLE_ARN";
pub const KEY_DEFAULT_EXTERNAL_ID: &str = "DEFAULT_EXTERNAL_ID";
pub const KEY_INTEGRATION_ID: &str = "INTEGRATION_ID";
pub const KEY_EXTERNAL_ID: &str = "EXTERNAL_ID";

const KEY_PROFILE: &str = "SYNC_PROFILE";
const KEY_LOG_LEVEL: &str = "SYNC_LOG_LEVEL";
const KEY_LOG_FORMAT: &str = "SYNC_LOG_FORMAT";
const KEY_API_BASE: &str = "SYNC_API_BASE";
const KEY_BINDING_FILE: &str = "SYNC_BINDING_FILE";
const KEY_HTTP_TIMEOUT_SECS: &str = "SYNC_HTTP_TIMEOUT_SECS";
const KEY_POLL_RATE_MS: &str = "SYNC_POLL_RATE_MS";
const KEY_METADATA_POLL_RATE_MS: &str = "SYNC_METADATA_POLL_RATE_MS";
const KEY_ENABLED: &str = "SYNC_ENABLED";
const KEY_ENABLE_AWS_USAGE: &str = "SYNC_ENABLE_AWS_USAGE";
const KEY_IMPORT_CLOUDWATCH: &str = "SYNC_IMPORT_CLOUDWATCH";

/// Every variable the loader picks up from env files and the environment.
const KNOWN_KEYS: &[&str] = &[
    KEY_EMAIL,
    KEY_PASSWORD,
    KEY_ORG_ID,
    KEY_REALM,
    KEY_INTEGRATION_NAME,
    KEY_TOKEN_NAME,
    KEY_REGIONS,
    KEY_SFX_AWS_ACCOUNT_ARN,
    KEY_ROLE_ARN,
    KEY_DEFAULT_EXTERNAL_ID,
    KEY_INTEGRATION_ID,
    KEY_EXTERNAL_ID,
    KEY_PROFILE,
    KEY_LOG_LEVEL,
    KEY_LOG_FORMAT,
    KEY_API_BASE,
    KEY_BINDING_FILE,
    KEY_HTTP_TIMEOUT_SECS,
    KEY_POLL_RATE_MS,
    KEY_METADATA_POLL_RATE_MS,
    KEY_ENABLED,
    KEY_ENABLE_AWS_USAGE,
    KEY_IMPORT_CLOUDWATCH,
];

const MIN_POLL_RATE_MS: u64 = 1_000;
const MAX_HTTP_TIMEOUT_SECS: u64 = 300;

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AppConfig {
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    #[serde(default = "default_binding_file")]
    pub binding_file: PathBuf,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub regions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sfx_aws_account_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_external_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default)]
    pub polling: PollingConfig,
}

/// Polling behaviour submitted with every integration payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct PollingConfig {
    #[serde(default = "default_poll_rate_ms")]
    pub poll_rate_ms: u64,
    #[serde(default = "default_poll_rate_ms")]
    pub metadata_poll_rate_ms: u64,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub enable_aws_usage: bool,
    #[serde(default = "default_true")]
    pub import_cloud_watch: bool,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            poll_rate_ms: default_poll_rate_ms(),
            metadata_poll_rate_ms: default_poll_rate_ms(),
            enabled: true,
            enable_aws_usage: true,
            import_cloud_watch: true,
        }
    }
}

impl PollingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_rate_ms < MIN_POLL_RATE_MS {
            return Err(ConfigError::InvalidPollRate {
                key: KEY_POLL_RATE_MS,
                value: self.poll_rate_ms,
            });
        }
        if self.metadata_poll_rate_ms < MIN_POLL_RATE_MS {
            return Err(ConfigError::InvalidPollRate {
                key: KEY_METADATA_POLL_RATE_MS,
                value: self.metadata_poll_rate_ms,
            });
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            api_base: None,
            binding_file: default_binding_file(),
            http_timeout_secs: default_http_timeout_secs(),
            email: None,
            password: None,
            org_id: None,
            realm: None,
            integration_name: None,
            token_name: None,
            regions: Vec::new(),
            sfx_aws_account_arn: None,
            role_arn: None,
            default_external_id: None,
            integration_id: None,
            external_id: None,
            polling: PollingConfig::default(),
        }
    }
}

/// Values supplied on the command line; each one wins over the loaded value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub log_format: Option<String>,
    pub api_base: Option<String>,
    pub binding_file: Option<PathBuf>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub org_id: Option<String>,
    pub realm: Option<String>,
    pub integration_name: Option<String>,
    pub token_name: Option<String>,
    /// Replaces the configured list when non-empty.
    pub regions: Vec<String>,
    pub sfx_aws_account_arn: Option<String>,
    pub role_arn: Option<String>,
    pub default_external_id: Option<String>,
    pub integration_id: Option<String>,
    pub external_id: Option<String>,
}

impl AppConfig {
    /// Apply command-line overrides and re-validate.
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) -> Result<(), ConfigError> {
        let ConfigOverrides {
            log_level,
            log_format,
            api_base,
            binding_file,
            email,
            password,
            org_id,
            realm,
            integration_name,
            token_name,
            regions,
            sfx_aws_account_arn,
            role_arn,
            default_external_id,
            integration_id,
            external_id,
        } = overrides;

        if let Some(v) = non_empty(log_level) {
            self.log_level = v;
        }
        if let Some(v) = non_empty(log_format) {
            self.log_format = v;
        }
        if let Some(v) = non_empty(api_base) {
            self.api_base = Some(v);
        }
        if let Some(v) = binding_file.filter(|p| !p.as_os_str().is_empty()) {
            self.binding_file = v;
        }
        for (slot, value) in [
            (&mut self.email, email),
            (&mut self.password, password),
            (&mut self.org_id, org_id),
            (&mut self.realm, realm),
            (&mut self.integration_name, integration_name),
            (&mut self.token_name, token_name),
            (&mut self.sfx_aws_account_arn, sfx_aws_account_arn),
        ] {
            if let Some(v) = non_empty(value) {
                *slot = Some(v);
            }
        }
        let regions: Vec<String> = regions
            .iter()
            .flat_map(|r| r.split(','))
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .collect();
        if !regions.is_empty() {
            self.regions = regions;
        }
        if let Some(v) = non_empty(role_arn) {
            self.role_arn = Some(v);
        }
        if let Some(v) = non_empty(default_external_id) {
            self.default_external_id = Some(v);
        }
        if let Some(v) = non_empty(integration_id) {
            self.integration_id = Some(v);
        }
        if let Some(v) = non_empty(external_id) {
            self.external_id = Some(v);
        }

        self.validate()
    }

    /// Returns a redacted JSON representation (secrets are redacted).
    pub fn redacted_json(&self) -> serde_json::Result<String> {
        let mut config = self.clone();
        if config.password.is_some() {
            config.password = Some("[REDACTED]".to_string());
        }
        serde_json::to_string_pretty(&config)
    }

    /// Validates the settings every operation depends on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.log_format.as_str(), "pretty" | "json") {
            return Err(ConfigError::InvalidLogFormat {
                value: self.log_format.clone(),
            });
        }

        if self.http_timeout_secs == 0 || self.http_timeout_secs > MAX_HTTP_TIMEOUT_SECS {
            return Err(ConfigError::InvalidHttpTimeout {
                value: self.http_timeout_secs,
            });
        }

        if let Some(base) = self.api_base.as_deref() {
            url::Url::parse(base).map_err(|e| ConfigError::InvalidValue {
                key: KEY_API_BASE,
                value: base.to_string(),
                reason: e.to_string(),
            })?;
        }

        self.polling.validate()
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Explicit API base, or the one derived from the realm.
    pub fn api_base_url(&self) -> Result<String, ConfigError> {
        if let Some(base) = self.api_base.as_deref().filter(|b| !b.is_empty()) {
            return Ok(base.to_string());
        }
        let realm = required(&self.realm, KEY_REALM)?;
        Ok(realm_api_base(realm))
    }

    /// Credentials for opening a session.
    pub fn session_identity(&self) -> Result<SessionIdentity, ConfigError> {
        Ok(SessionIdentity {
            email: required(&self.email, KEY_EMAIL)?.to_string(),
            password: required(&self.password, KEY_PASSWORD)?.to_string(),
            org_id: required(&self.org_id, KEY_ORG_ID)?.to_string(),
            realm: required(&self.realm, KEY_REALM)?.to_string(),
        })
    }

    /// Integration fields submitted on create and update.
    ///
    /// Also requires `ROLE_ARN`, which every update carries.
    pub fn integration_shape(&self) -> Result<IntegrationShape, ConfigError> {
        let name = required(&self.integration_name, KEY_INTEGRATION_NAME)?;
        let named_token = required(&self.token_name, KEY_TOKEN_NAME)?;
        if self.regions.is_empty() {
            return Err(ConfigError::MissingValue { key: KEY_REGIONS });
        }
        let sfx_aws_account_arn = required(&self.sfx_aws_account_arn, KEY_SFX_AWS_ACCOUNT_ARN)?;
        required(&self.role_arn, KEY_ROLE_ARN)?;

        let mut shape =
            IntegrationShape::new(name, named_token, self.regions.clone(), sfx_aws_account_arn);
        shape.poll_rate_ms = self.polling.poll_rate_ms;
        shape.metadata_poll_rate_ms = self.polling.metadata_poll_rate_ms;
        shape.enabled = self.polling.enabled;
        shape.enable_aws_usage = self.polling.enable_aws_usage;
        shape.import_cloud_watch = self.polling.import_cloud_watch;
        Ok(shape)
    }

    /// The IAM role whose trust policy follows the integration.
    pub fn role_target(&self) -> Result<RoleTarget, ConfigError> {
        Ok(RoleTarget {
            role_arn: required(&self.role_arn, KEY_ROLE_ARN)?.to_string(),
            default_external_id: required(&self.default_external_id, KEY_DEFAULT_EXTERNAL_ID)?
                .to_string(),
        })
    }
}

fn required<'a>(value: &'a Option<String>, key: &'static str) -> Result<&'a str, ConfigError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::MissingValue { key })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn default_profile() -> String {
    "local".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_binding_file() -> PathBuf {
    PathBuf::from("env_vars.sh")
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_poll_rate_ms() -> u64 {
    crate::models::integration::DEFAULT_POLL_RATE_MS
}

fn default_true() -> bool {
    true
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load environment file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
    #[error("{key} is not set")]
    MissingValue { key: &'static str },
    #[error("{key} has invalid value '{value}': {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("log format must be 'pretty' or 'json', got '{value}'")]
    InvalidLogFormat { value: String },
    #[error("HTTP timeout must be between 1 and 300 seconds, got {value}")]
    InvalidHttpTimeout { value: u64 },
    #[error("{key} must be at least 1000 ms, got {value}")]
    InvalidPollRate { key: &'static str, value: u64 },
}

/// Loads configuration using layered `.env` files and the process environment.
pub struct ConfigLoader {
    base_dir: PathBuf,
    profile: Option<String>,
}

impl ConfigLoader {
    /// Creates a new loader rooted at the current working directory.
    pub fn new() -> Self {
        Self {
            base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            profile: None,
        }
    }

    /// Creates a loader rooted at the provided directory (useful for tests).
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self {
            base_dir,
            profile: None,
        }
    }

    /// Pin the profile instead of reading `SYNC_PROFILE`.
    pub fn with_profile(mut self, profile: Option<String>) -> Self {
        self.profile = non_empty(profile);
        self
    }

    /// Loads configuration: env files first, then the process environment.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let (mut layered, profile_hint) = self.collect_layered_env()?;

        // Overlay process environment last so it wins.
        for key in KNOWN_KEYS {
            if let Ok(value) = env::var(key) {
                layered.insert((*key).to_string(), value);
            }
        }

        // The profile already chose which env files were read.
        layered.remove(KEY_PROFILE);
        let profile = profile_hint;

        let mut take = |key: &str| layered.remove(key).filter(|v| !v.trim().is_empty());

        let log_level = take(KEY_LOG_LEVEL).unwrap_or_else(default_log_level);
        let log_format = take(KEY_LOG_FORMAT).unwrap_or_else(default_log_format);
        let api_base = take(KEY_API_BASE);
        let binding_file = take(KEY_BINDING_FILE)
            .map(PathBuf::from)
            .unwrap_or_else(default_binding_file);
        let http_timeout_secs = parse_or(
            KEY_HTTP_TIMEOUT_SECS,
            take(KEY_HTTP_TIMEOUT_SECS),
            default_http_timeout_secs,
        )?;

        let regions = take(KEY_REGIONS)
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let polling = PollingConfig {
            poll_rate_ms: parse_or(KEY_POLL_RATE_MS, take(KEY_POLL_RATE_MS), default_poll_rate_ms)?,
            metadata_poll_rate_ms: parse_or(
                KEY_METADATA_POLL_RATE_MS,
                take(KEY_METADATA_POLL_RATE_MS),
                default_poll_rate_ms,
            )?,
            enabled: parse_flag(KEY_ENABLED, take(KEY_ENABLED))?,
            enable_aws_usage: parse_flag(KEY_ENABLE_AWS_USAGE, take(KEY_ENABLE_AWS_USAGE))?,
            import_cloud_watch: parse_flag(KEY_IMPORT_CLOUDWATCH, take(KEY_IMPORT_CLOUDWATCH))?,
        };

        let config = AppConfig {
            profile,
            log_level,
            log_format,
            api_base,
            binding_file,
            http_timeout_secs,
            email: take(KEY_EMAIL),
            password: take(KEY_PASSWORD),
            org_id: take(KEY_ORG_ID),
            realm: take(KEY_REALM),
            integration_name: take(KEY_INTEGRATION_NAME),
            token_name: take(KEY_TOKEN_NAME),
            regions,
            sfx_aws_account_arn: take(KEY_SFX_AWS_ACCOUNT_ARN),
            role_arn: take(KEY_ROLE_ARN),
            default_external_id: take(KEY_DEFAULT_EXTERNAL_ID),
            integration_id: take(KEY_INTEGRATION_ID),
            external_id: take(KEY_EXTERNAL_ID),
            polling,
        };

        config.validate()?;
        Ok(config)
    }

    fn collect_layered_env(&self) -> Result<(BTreeMap<String, String>, String), ConfigError> {
        let mut values = BTreeMap::new();

        self.merge_dotenv(self.base_dir.join(".env"), &mut values)?;
        self.merge_dotenv(self.base_dir.join(".env.local"), &mut values)?;

        let profile = self
            .profile
            .clone()
            .or_else(|| env::var(KEY_PROFILE).ok().filter(|v| !v.is_empty()))
            .or_else(|| values.get(KEY_PROFILE).cloned())
            .unwrap_or_else(default_profile);

        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}", &profile)),
            &mut values,
        )?;
        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}.local", &profile)),
            &mut values,
        )?;

        Ok((values, profile))
    }

    fn merge_dotenv(
        &self,
        path: PathBuf,
        values: &mut BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        match dotenvy::from_path_iter(&path) {
            Ok(iter) => {
                for item in iter {
                    let (key, value) = item.map_err(|source| ConfigError::EnvFile {
                        path: path.clone(),
                        source,
                    })?;
                    if KNOWN_KEYS.contains(&key.as_str()) {
                        values.insert(key, value);
                    }
                }
                Ok(())
            }
            Err(dotenvy::Error::Io(ref io_err))
                if io_err.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(())
            }
            Err(err) => Err(ConfigError::EnvFile { path, source: err }),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_or(
    key: &'static str,
    raw: Option<String>,
    default: fn() -> u64,
) -> Result<u64, ConfigError> {
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e: std::num::ParseIntError| ConfigError::InvalidValue {
                key,
                value,
                reason: e.to_string(),
            }),
        None => Ok(default()),
    }
}

/// Boolean switches default to on.
fn parse_flag(key: &'static str, raw: Option<String>) -> Result<bool, ConfigError> {
    let Some(value) = raw else {
        return Ok(true);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value,
            reason: "expected true or false".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> AppConfig {
        AppConfig {
            email: Some("ops@example.com".to_string()),
            password: Some("hunter2".to_string()),
            org_id: Some("ORG1".to_string()),
            realm: Some("us1".to_string()),
            integration_name: Some("prod-cloudwatch".to_string()),
            token_name: Some("ingest".to_string()),
            regions: vec!["us-east-1".to_string()],
            sfx_aws_account_arn: Some("arn:aws:iam::134183635603:root".to_string()),
            role_arn: Some("arn:aws:iam::999:role/MonitorRole".to_string()),
            default_external_id: Some("placeholder".to_string()),
            ..AppConfig::default()
        }
    }

    #[test]
    fn flags_accept_common_spellings() {
        assert!(parse_flag(KEY_ENABLED, None).unwrap());
        assert!(!parse_flag(KEY_ENABLED, Some("False".to_string())).unwrap());
        assert!(parse_flag(KEY_ENABLED, Some("1".to_string())).unwrap());
        assert!(matches!(
            parse_flag(KEY_ENABLED, Some("maybe".to_string())),
            Err(ConfigError::InvalidValue { key: KEY_ENABLED, .. })
        ));
    }

    #[test]
    fn numbers_must_parse() {
        assert_eq!(parse_or(KEY_POLL_RATE_MS, None, default_poll_rate_ms).unwrap(), 60_000);
        assert!(matches!(
            parse_or(KEY_POLL_RATE_MS, Some("fast".to_string()), default_poll_rate_ms),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn validation_bounds() {
        let mut cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());

        cfg.log_format = "xml".to_string();
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidLogFormat { .. })));

        cfg.log_format = "json".to_string();
        cfg.http_timeout_secs = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidHttpTimeout { value: 0 })));

        cfg.http_timeout_secs = 30;
        cfg.polling.metadata_poll_rate_ms = 10;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidPollRate { key: KEY_METADATA_POLL_RATE_MS, .. })
        ));

        cfg.polling.metadata_poll_rate_ms = 60_000;
        cfg.api_base = Some("not a url".to_string());
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidValue { key: KEY_API_BASE, .. })
        ));
    }

    #[test]
    fn operation_views_name_the_missing_variable() {
        let mut cfg = complete();
        cfg.password = None;
        assert!(matches!(
            cfg.session_identity(),
            Err(ConfigError::MissingValue { key: KEY_PASSWORD })
        ));

        let mut cfg = complete();
        cfg.regions.clear();
        assert!(matches!(
            cfg.integration_shape(),
            Err(ConfigError::MissingValue { key: KEY_REGIONS })
        ));

        let mut cfg = complete();
        cfg.default_external_id = Some("   ".to_string());
        assert!(matches!(
            cfg.role_target(),
            Err(ConfigError::MissingValue { key: KEY_DEFAULT_EXTERNAL_ID })
        ));
    }

    #[test]
    fn shape_carries_polling_settings() {
        let mut cfg = complete();
        cfg.polling.enable_aws_usage = false;
        cfg.polling.poll_rate_ms = 300_000;
        let shape = cfg.integration_shape().unwrap();
        assert_eq!(shape.name, "prod-cloudwatch");
        assert_eq!(shape.poll_rate_ms, 300_000);
        assert!(!shape.enable_aws_usage);
        assert!(shape.import_cloud_watch);
    }

    #[test]
    fn api_base_prefers_explicit_value() {
        let mut cfg = complete();
        assert_eq!(cfg.api_base_url().unwrap(), "https://api.us1.signalfx.com");
        cfg.api_base = Some("http://127.0.0.1:9000".to_string());
        assert_eq!(cfg.api_base_url().unwrap(), "http://127.0.0.1:9000");
    }

    #[test]
    fn overrides_win_and_blank_overrides_are_ignored() {
        let mut cfg = complete();
        cfg.apply_overrides(ConfigOverrides {
            integration_id: Some("int-9".to_string()),
            external_id: Some("  ".to_string()),
            log_format: Some("json".to_string()),
            ..ConfigOverrides::default()
        })
        .unwrap();
        assert_eq!(cfg.integration_id.as_deref(), Some("int-9"));
        assert_eq!(cfg.external_id, None);
        assert_eq!(cfg.log_format, "json");
    }

    #[test]
    fn redacted_json_hides_password() {
        let json = complete().redacted_json().unwrap();
        assert!(json.contains("[REDACTED]"));
        assert!(!json.contains("hunter2"));
    }
}
