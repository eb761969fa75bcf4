use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub remote: RemoteConfig,
    pub sync: SyncConfig,
    pub connectivity: ConnectivityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the PostgREST endpoint, e.g. `https://xyz.supabase.co`.
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Start a background drain when a write joins an existing backlog.
    /// Reconnect drains always run.
    pub auto_sync: bool,
    pub remote_call_timeout_ms: u64,
    pub drain_budget_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectivityConfig {
    /// Assume online at startup when no signal has been observed yet.
    pub assume_online: bool,
    /// Poll the remote for reachability; 0 disables polling.
    pub poll_interval_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: default_database_url(),
                max_connections: 5,
                connection_timeout: 30,
            },
            remote: RemoteConfig {
                base_url: None,
                api_key: None,
            },
            sync: SyncConfig {
                auto_sync: true,
                remote_call_timeout_ms: 10_000,
                drain_budget_ms: 60_000,
            },
            connectivity: ConnectivityConfig {
                assume_online: false,
                poll_interval_ms: 0,
            },
        }
    }
}

impl SyncConfig {
    pub fn remote_call_timeout(&self) -> Duration {
        Duration::from_millis(self.remote_call_timeout_ms)
    }

    pub fn drain_budget(&self) -> Duration {
        Duration::from_millis(self.drain_budget_ms)
    }
}

impl ConnectivityConfig {
    pub fn poll_interval(&self) -> Option<Duration> {
        if self.poll_interval_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.poll_interval_ms))
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("FIELDSYNC_DATABASE_URL") {
            if !v.trim().is_empty() {
                cfg.database.url = v.trim().to_string();
            }
        }
        if let Some(value) = env_u64("FIELDSYNC_DATABASE_MAX_CONNECTIONS") {
            cfg.database.max_connections = value as u32;
        }

        cfg.remote.base_url = env_non_empty("FIELDSYNC_REMOTE_URL");
        cfg.remote.api_key = env_non_empty("FIELDSYNC_REMOTE_API_KEY");

        if let Ok(v) = std::env::var("FIELDSYNC_AUTO_SYNC") {
            cfg.sync.auto_sync = parse_bool(&v, cfg.sync.auto_sync);
        }
        if let Some(value) = env_u64("FIELDSYNC_REMOTE_TIMEOUT_MS") {
            cfg.sync.remote_call_timeout_ms = value;
        }
        if let Some(value) = env_u64("FIELDSYNC_DRAIN_BUDGET_MS") {
            cfg.sync.drain_budget_ms = value;
        }

        if let Ok(v) = std::env::var("FIELDSYNC_ASSUME_ONLINE") {
            cfg.connectivity.assume_online = parse_bool(&v, cfg.connectivity.assume_online);
        }
        if let Some(value) = env_u64("FIELDSYNC_POLL_INTERVAL_MS") {
            cfg.connectivity.poll_interval_ms = value;
        }

        cfg
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.database.max_connections == 0 {
            return Err("Database max_connections must be greater than 0".to_string());
        }
        if self.sync.remote_call_timeout_ms == 0 {
            return Err("Sync remote_call_timeout_ms must be greater than 0".to_string());
        }
        if self.sync.drain_budget_ms < self.sync.remote_call_timeout_ms {
            return Err(
                "Sync drain_budget_ms must be at least remote_call_timeout_ms".to_string(),
            );
        }
        if self.remote.base_url.is_some() != self.remote.api_key.is_some() {
            return Err("Remote base_url and api_key must be configured together".to_string());
        }
        if self.connectivity.poll_interval_ms > 0 && self.remote.base_url.is_none() {
            return Err("Connectivity polling requires a remote base_url".to_string());
        }
        Ok(())
    }
}

fn default_database_url() -> String {
    let dir = dirs::data_local_dir()
        .map(|dir| dir.join("fieldsync"))
        .unwrap_or_else(|| std::path::PathBuf::from("./data"));
    format!("sqlite://{}?mode=rwc", dir.join("fieldsync.db").display())
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| parse_u64(&v))
}

fn parse_bool(s: &str, default: bool) -> bool {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

fn parse_u64(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}
