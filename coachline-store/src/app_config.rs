use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    pub database: Option<DatabaseConfig>,
    /// Absent means job locks stay in-process
    pub redis: Option<RedisConfig>,
    pub kafka: Option<KafkaConfig>,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// JSON network loaded into the memory backend at startup
    pub seed_file: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SchedulerConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_price_interval")]
    pub price_adjustment_interval_secs: u64,
    #[serde(default = "default_rebalance_interval")]
    pub rebalance_interval_secs: u64,
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,
    #[serde(default = "default_lock_ttl")]
    pub lock_ttl_secs: u64,
    #[serde(default = "default_window_days")]
    pub window_days: i64,
    #[serde(default = "default_demand_upper")]
    pub demand_upper: u32,
    #[serde(default = "default_demand_lower")]
    pub demand_lower: u32,
    #[serde(default = "default_lead_minutes")]
    pub search_lead_minutes: i64,
}

fn default_enabled() -> bool { true }
fn default_price_interval() -> u64 { 30 * 24 * 3600 }
fn default_rebalance_interval() -> u64 { 30 * 24 * 3600 }
fn default_cleanup_interval() -> u64 { 24 * 3600 }
fn default_lock_ttl() -> u64 { 600 }
fn default_window_days() -> i64 { 30 }
fn default_demand_upper() -> u32 { 100 }
fn default_demand_lower() -> u32 { 20 }
fn default_lead_minutes() -> i64 { 15 }

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            price_adjustment_interval_secs: default_price_interval(),
            rebalance_interval_secs: default_rebalance_interval(),
            cleanup_interval_secs: default_cleanup_interval(),
            lock_ttl_secs: default_lock_ttl(),
            window_days: default_window_days(),
            demand_upper: default_demand_upper(),
            demand_lower: default_demand_lower(),
            search_lead_minutes: default_lead_minutes(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Developer overrides, never checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `COACHLINE__SERVER__PORT=8080`
            .add_source(config::Environment::with_prefix("COACHLINE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
