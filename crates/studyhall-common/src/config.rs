//! Application configuration loaded from environment variables and config files.
//!
//! Supports `.env` files for development and environment variables for production.
//! Config precedence: env vars > .env file > config.toml > defaults

use serde::Deserialize;
use std::sync::OnceLock;

static CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Get the global application configuration.
///
/// # Panics
/// Panics if config has not been initialized via [`init`].
pub fn get() -> &'static AppConfig {
    CONFIG
        .get()
        .expect("Config not initialized. Call studyhall_common::config::init() first.")
}

/// Initialize the global configuration from environment.
///
/// Should be called once at application startup, before any other code accesses config.
pub fn init() -> Result<&'static AppConfig, config::ConfigError> {
    // Load .env file if present (development)
    let _ = dotenvy::dotenv();

    let cfg = config::Config::builder()
        // Defaults
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 3001)?
        .set_default("server.signaling_port", 3002)?
        .set_default("database.max_connections", 20)?
        .set_default("database.min_connections", 5)?
        .set_default("auth.access_token_ttl_secs", 900)? // 15 min
        .set_default("auth.refresh_token_ttl_secs", 2_592_000)? // 30 days
        .set_default("ai.model", "gemini-1.5-flash")?
        .set_default("limits.max_message_length", 2000)?
        .set_default("limits.chat_buffer_size", 50)?
        .set_default("limits.room_lookup_timeout_ms", 3000)?
        .set_default("limits.default_room_capacity", 10)?
        .set_default("cache.room_list_ttl_secs", 60)?
        .set_default("cache.group_list_ttl_secs", 120)?
        // Optional config file
        .add_source(config::File::with_name("config").required(false))
        // Environment variables (STUDYHALL_SERVER__HOST, STUDYHALL_DATABASE__URL, etc.)
        .add_source(
            config::Environment::with_prefix("STUDYHALL")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let app_config: AppConfig = cfg.try_deserialize()?;
    Ok(CONFIG.get_or_init(|| app_config))
}

/// Initialize config directly from a value — used by tests that need a
/// config without an environment.
pub fn init_from(config: AppConfig) -> &'static AppConfig {
    CONFIG.get_or_init(|| config)
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub auth: AuthConfig,
    pub ai: AiConfig,
    pub limits: LimitsConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    /// REST API port.
    pub port: u16,
    /// WebSocket signaling port.
    pub signaling_port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    /// Redis connection URL — optional; omit to use the in-process cache only.
    pub url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// JWT signing secret (HS256) — should be 256+ bits of entropy
    pub jwt_secret: String,
    /// Access token TTL in seconds
    pub access_token_ttl_secs: u64,
    /// Refresh token TTL in seconds
    pub refresh_token_ttl_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AiConfig {
    /// API key for the generative-text backend — optional; without it the
    /// AI routes serve deterministic fallback content.
    pub api_key: Option<String>,
    /// Model identifier passed to the backend.
    pub model: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LimitsConfig {
    pub max_message_length: u32,
    /// Bounded recent-message buffer per live room; oldest entries evicted.
    pub chat_buffer_size: usize,
    /// Bound on the room-record lookup performed at join time.
    pub room_lookup_timeout_ms: u64,
    pub default_room_capacity: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    pub room_list_ttl_secs: u64,
    pub group_list_ttl_secs: u64,
}
