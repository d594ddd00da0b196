//! Process configuration (spec §6 "Environment/config knobs").
//!
//! Loaded from a TOML file with environment-variable overrides by
//! `ac-gateway::cli::load_config`: one struct per concern, `#[serde
//! (default)]` fields, and `d_*` default-value functions so partial config
//! files are valid.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub sweeper: SweeperConfig,
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub admin: AdminConfig,
}

/// Run-mode flag controlling log verbosity, the `NODE_ENV`-like knob named
/// in spec §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Test,
    #[default]
    Production,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding `acts.json` / `act_metadata.json` /
    /// `update_errors.json` (spec §6 "Persisted state layout").
    #[serde(default = "d_store_dir")]
    pub dir: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { dir: d_store_dir() }
    }
}

fn d_store_dir() -> String {
    "./data/act-cache".to_owned()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "d_mb_url")]
    pub musicbrainz_base_url: String,
    #[serde(default = "d_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "d_user_agent")]
    pub user_agent: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            musicbrainz_base_url: d_mb_url(),
            timeout_ms: d_timeout_ms(),
            user_agent: d_user_agent(),
        }
    }
}

fn d_mb_url() -> String {
    "https://musicbrainz.org/ws/2".to_owned()
}
fn d_timeout_ms() -> u64 {
    5_000
}
fn d_user_agent() -> String {
    "act-cache/0.1 ( https://example.invalid/act-cache )".to_owned()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Fixed inter-fetch delay `D` (spec §4.6), in milliseconds.
    #[serde(default = "d_queue_delay_ms")]
    pub inter_fetch_delay_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { inter_fetch_delay_ms: d_queue_delay_ms() }
    }
}

fn d_queue_delay_ms() -> u64 {
    30_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweeperConfig {
    /// `T` — full-cycle time budget, milliseconds (spec §4.7 default 12h).
    #[serde(default = "d_cycle_ms")]
    pub cycle_interval_ms: u64,
    /// `R` — retry delay after a raised error, milliseconds.
    #[serde(default = "d_retry_ms")]
    pub retry_delay_ms: u64,
    /// `updatesSinceLastRequest` threshold for eviction (spec §3).
    #[serde(default = "d_eviction_threshold")]
    pub eviction_threshold: u32,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            cycle_interval_ms: d_cycle_ms(),
            retry_delay_ms: d_retry_ms(),
            eviction_threshold: d_eviction_threshold(),
        }
    }
}

fn d_cycle_ms() -> u64 {
    12 * 60 * 60 * 1000
}
fn d_retry_ms() -> u64 {
    5_000
}
fn d_eviction_threshold() -> u32 {
    crate::model::EVICTION_THRESHOLD
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Per-call Store deadline, milliseconds (spec §4.5, §5).
    #[serde(default = "d_store_deadline_ms")]
    pub store_deadline_ms: u64,
    /// Staleness threshold, milliseconds (spec §4.5 step 3, default 24h).
    #[serde(default = "d_staleness_ms")]
    pub staleness_ms: i64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            store_deadline_ms: d_store_deadline_ms(),
            staleness_ms: d_staleness_ms(),
        }
    }
}

fn d_store_deadline_ms() -> u64 {
    500
}
fn d_staleness_ms() -> i64 {
    24 * 60 * 60 * 1000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "d_bind")]
    pub bind: String,
    #[serde(default)]
    pub mode: RunMode,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: d_bind(), mode: RunMode::default() }
    }
}

fn d_bind() -> String {
    "0.0.0.0:8080".to_owned()
}

/// Admin surface config. The TOTP secret is opaque to the core — validated
/// only by the external auth collaborator (spec §1, §6).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AdminConfig {
    #[serde(default)]
    pub totp_secret: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues. Empty means
    /// the config is usable as-is.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.store.dir.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "store.dir".into(),
                message: "dir must not be empty".into(),
            });
        }

        if self.upstream.musicbrainz_base_url.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "upstream.musicbrainz_base_url".into(),
                message: "must not be empty".into(),
            });
        } else if !self.upstream.musicbrainz_base_url.starts_with("http://")
            && !self.upstream.musicbrainz_base_url.starts_with("https://")
        {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "upstream.musicbrainz_base_url".into(),
                message: format!(
                    "must start with http:// or https:// (got \"{}\")",
                    self.upstream.musicbrainz_base_url
                ),
            });
        }

        if self.upstream.timeout_ms == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "upstream.timeout_ms".into(),
                message: "must be greater than 0".into(),
            });
        }

        if self.queue.inter_fetch_delay_ms == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "queue.inter_fetch_delay_ms".into(),
                message: "a zero delay removes drainer pacing entirely".into(),
            });
        }

        if self.sweeper.cycle_interval_ms == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "sweeper.cycle_interval_ms".into(),
                message: "must be greater than 0".into(),
            });
        }

        if self.service.store_deadline_ms == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "service.store_deadline_ms".into(),
                message: "must be greater than 0".into(),
            });
        }

        if self.server.bind.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.bind".into(),
                message: "must not be empty".into(),
            });
        }

        if self.admin.totp_secret.as_deref().unwrap_or("").is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "admin.totp_secret".into(),
                message: "no TOTP secret configured — admin endpoints are unprotected".into(),
            });
        }

        errors
    }
}
