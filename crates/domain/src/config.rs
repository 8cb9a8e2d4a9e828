use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub naming: NamingConfig,
    #[serde(default)]
    pub mirror: MirrorConfig,
    #[serde(default)]
    pub external: ExternalConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Server
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "d_8080")]
    pub port: u16,
    #[serde(default = "d_host")]
    pub host: String,
    #[serde(default)]
    pub cors: CorsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "0.0.0.0".into(),
            cors: CorsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    #[serde(default = "d_cors_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: d_cors_origins(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Database
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "d_database_url")]
    pub url: String,
    #[serde(default = "d_10")]
    pub max_connections: u32,
    #[serde(default = "d_5000")]
    pub acquire_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: d_database_url(),
            max_connections: 10,
            acquire_timeout_ms: 5_000,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Job scheduler
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    /// `MAX_CONCURRENT_JOBS` — scheduler capacity.
    #[serde(default = "d_3u")]
    pub max_concurrent_jobs: usize,
    /// `CONVERSION_TIMEOUT_SECONDS` — per-conversion budget.
    #[serde(default = "d_300")]
    pub conversion_timeout_seconds: u64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 3,
            conversion_timeout_seconds: 300,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Notifications
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// `NOTIFICATION_EXPIRY` — default time-to-live for pending notifications, in seconds.
    #[serde(default = "d_expiry")]
    pub expiry_seconds: i64,
    /// Cadence of the expiry sweeper, in seconds. Chosen compatible with
    /// `naming.min_interval_seconds`: both
    /// background sweeps run on the same tick so one `tokio::time::interval`
    /// period serves both without the sweeper ever observing a notification
    /// more than one tick past its `expires_at`.
    #[serde(default = "d_60")]
    pub sweep_interval_seconds: u64,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            expiry_seconds: d_expiry(),
            sweep_interval_seconds: 60,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Thread summarizer
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamingConfig {
    #[serde(default = "d_true")]
    pub enabled: bool,
    #[serde(default = "d_naming_model")]
    pub model: String,
    #[serde(default = "d_20000u")]
    pub token_budget: usize,
    #[serde(default = "d_60")]
    pub min_interval_seconds: i64,
    #[serde(default = "d_5u")]
    pub batch_limit: usize,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model: d_naming_model(),
            token_budget: 20_000,
            min_interval_seconds: 60,
            batch_limit: 5,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Engine mirror
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// `MIRROR_GRACE_DAYS` — cleanup horizon.
    #[serde(default = "d_7")]
    pub grace_days: i64,
    #[serde(default = "d_100u")]
    pub page_size: usize,
    #[serde(default = "d_engine_url")]
    pub upstream_base_url: String,
    #[serde(default = "d_30000")]
    pub upstream_timeout_ms: u64,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            grace_days: 7,
            page_size: 100,
            upstream_base_url: d_engine_url(),
            upstream_timeout_ms: 30_000,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// External collaborators (embedding model, converter, transcript
// provider, naming model) -- only their HTTP base urls are configured
// here; the call contracts themselves live in the owning crates.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalConfig {
    #[serde(default = "d_embedding_url")]
    pub embedding_url: String,
    #[serde(default = "d_15000")]
    pub embedding_timeout_ms: u64,
    #[serde(default = "d_conversion_url")]
    pub conversion_url: String,
    #[serde(default)]
    pub conversion_fallback_url: Option<String>,
    #[serde(default = "d_transcript_url")]
    pub transcript_url: String,
    #[serde(default)]
    pub transcript_fallback_url: Option<String>,
    #[serde(default = "d_naming_url")]
    pub naming_url: String,
}

impl Default for ExternalConfig {
    fn default() -> Self {
        Self {
            embedding_url: d_embedding_url(),
            embedding_timeout_ms: d_15000(),
            conversion_url: d_conversion_url(),
            conversion_fallback_url: None,
            transcript_url: d_transcript_url(),
            transcript_fallback_url: None,
            naming_url: d_naming_url(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Default value helpers (serde)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn d_8080() -> u16 {
    8080
}
fn d_host() -> String {
    "0.0.0.0".into()
}
fn d_cors_origins() -> Vec<String> {
    vec!["http://localhost:*".into()]
}
fn d_database_url() -> String {
    "postgres://localhost/collab_platform".into()
}
fn d_10() -> u32 {
    10
}
fn d_5000() -> u64 {
    5_000
}
fn d_3u() -> usize {
    3
}
fn d_300() -> u64 {
    300
}
fn d_expiry() -> i64 {
    7 * 24 * 3600
}
fn d_60() -> u64 {
    60
}
fn d_true() -> bool {
    true
}
fn d_naming_model() -> String {
    "gpt-4o-mini".into()
}
fn d_20000u() -> usize {
    20_000
}
fn d_5u() -> usize {
    5
}
fn d_7() -> i64 {
    7
}
fn d_100u() -> usize {
    100
}
fn d_engine_url() -> String {
    "http://localhost:2024".into()
}
fn d_30000() -> u64 {
    30_000
}
fn d_15000() -> u64 {
    15_000
}
fn d_embedding_url() -> String {
    "http://localhost:9100".into()
}
fn d_conversion_url() -> String {
    "http://localhost:9101".into()
}
fn d_transcript_url() -> String {
    "http://localhost:9102".into()
}
fn d_naming_url() -> String {
    "http://localhost:9103".into()
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        toml::from_str(&content).map_err(ConfigError::Toml)
    }

    /// Load from file if it exists, otherwise fall back to defaults --
    /// missing config is not a startup error.
    pub fn load_or_default(path: &str) -> Self {
        Self::load(path).unwrap_or_default()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading config: {0}")]
    Io(std::io::Error),
    #[error("parsing config: {0}")]
    Toml(toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = Config::default();
        assert_eq!(cfg.jobs.max_concurrent_jobs, 3);
        assert_eq!(cfg.jobs.conversion_timeout_seconds, 300);
        assert_eq!(cfg.naming.token_budget, 20_000);
        assert_eq!(cfg.naming.batch_limit, 5);
        assert_eq!(cfg.naming.min_interval_seconds, 60);
        assert_eq!(cfg.mirror.grace_days, 7);
    }

    #[test]
    fn toml_round_trip_with_overrides() {
        let raw = r#"
            [jobs]
            max_concurrent_jobs = 8

            [naming]
            enabled = false
        "#;
        let cfg: Config = toml::from_str(raw).unwrap();
        assert_eq!(cfg.jobs.max_concurrent_jobs, 8);
        assert!(!cfg.naming.enabled);
        // Untouched sections still fall back to defaults.
        assert_eq!(cfg.mirror.grace_days, 7);
    }
}
