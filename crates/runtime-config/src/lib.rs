//! famledger configuration types.
//!
//! The server reads `famledger.toml` (every section optional), then applies
//! environment overrides on top. CLI flags, handled by the server binary,
//! win over both.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Canonical config file name.
pub const CONFIG_FILE_NAME: &str = "famledger.toml";

/// Top-level configuration (persisted as `famledger.toml`).
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FamledgerConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub auth: AuthSettings,
    #[serde(default)]
    pub invites: InviteSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Refuse to register more than one family.
    #[serde(default = "default_false")]
    pub single_family: bool,
    /// Allowed CORS origins. Empty allows any origin.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            single_family: false,
            cors_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    #[serde(alias = "postgresql", alias = "pg")]
    Postgres,
    #[serde(alias = "mongodb")]
    Mongo,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Postgres => "postgres",
            Self::Mongo => "mongo",
        }
    }
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "mongo" | "mongodb" => Ok(Self::Mongo),
            other => Err(ConfigError::Invalid {
                key: "storage.backend",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageSettings {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: PathBuf,
    #[serde(default)]
    pub postgres_url: String,
    #[serde(default = "default_max_connections")]
    pub postgres_max_connections: u32,
    #[serde(default = "default_mongo_uri")]
    pub mongo_uri: String,
    #[serde(default = "default_mongo_database")]
    pub mongo_database: String,
    /// Apply migrations / create indexes on connect.
    #[serde(default = "default_true")]
    pub auto_migrate: bool,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            sqlite_path: default_sqlite_path(),
            postgres_url: String::new(),
            postgres_max_connections: default_max_connections(),
            mongo_uri: default_mongo_uri(),
            mongo_database: default_mongo_database(),
            auto_migrate: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthSettings {
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "default_jwt_ttl")]
    pub jwt_ttl_secs: u64,
    #[serde(default = "default_password_iterations")]
    pub password_iterations: u32,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            jwt_ttl_secs: default_jwt_ttl(),
            password_iterations: default_password_iterations(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InviteSettings {
    #[serde(default = "default_invite_ttl_hours")]
    pub ttl_hours: u32,
    /// Background expiry sweep interval. 0 disables the sweep.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    /// Terminal invites older than this are deleted by the sweep. 0 keeps them.
    #[serde(default = "default_purge_after_days")]
    pub purge_after_days: u32,
}

impl Default for InviteSettings {
    fn default() -> Self {
        Self {
            ttl_hours: default_invite_ttl_hours(),
            sweep_interval_secs: default_sweep_interval(),
            purge_after_days: default_purge_after_days(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingSettings {
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` wins when set.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

// ── Serde default functions ─────────────────────────────────────────────

fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3000
}
fn default_sqlite_path() -> PathBuf {
    PathBuf::from("data/famledger.db")
}
fn default_max_connections() -> u32 {
    10
}
fn default_mongo_uri() -> String {
    "mongodb://localhost:27017".to_string()
}
fn default_mongo_database() -> String {
    "famledger".to_string()
}
fn default_jwt_ttl() -> u64 {
    3600
}
fn default_password_iterations() -> u32 {
    600_000
}
fn default_invite_ttl_hours() -> u32 {
    72
}
fn default_sweep_interval() -> u64 {
    300
}
fn default_purge_after_days() -> u32 {
    30
}
fn default_log_filter() -> String {
    "famledger_server=info,famledger_store=info,tower_http=info".to_string()
}

// ── Loading ─────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parsing {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

impl FamledgerConfig {
    /// Read a config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply environment overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`. Empty values are ignored.
    ///
    /// | variable | field |
    /// |---|---|
    /// | `FAMLEDGER_HOST` | `server.host` |
    /// | `PORT`, `FAMLEDGER_PORT` | `server.port` |
    /// | `FAMLEDGER_SINGLE_FAMILY` | `server.single_family` |
    /// | `FAMLEDGER_STORAGE` | `storage.backend` |
    /// | `FAMLEDGER_SQLITE_PATH` | `storage.sqlite_path` |
    /// | `DATABASE_URL` | `storage.postgres_url` |
    /// | `FAMLEDGER_MONGO_URI` | `storage.mongo_uri` |
    /// | `FAMLEDGER_MONGO_DATABASE` | `storage.mongo_database` |
    /// | `JWT_SECRET` | `auth.jwt_secret` |
    /// | `FAMLEDGER_INVITE_TTL_HOURS` | `invites.ttl_hours` |
    /// | `FAMLEDGER_SWEEP_INTERVAL_SECS` | `invites.sweep_interval_secs` |
    /// | `FAMLEDGER_LOG` | `logging.filter` |
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("FAMLEDGER_HOST") {
            self.server.host = v;
        }
        if let Some(v) = get("FAMLEDGER_PORT").or_else(|| get("PORT")) {
            self.server.port = parse_num("server.port", &v)?;
        }
        if let Some(v) = get("FAMLEDGER_SINGLE_FAMILY") {
            self.server.single_family = parse_bool("server.single_family", &v)?;
        }
        if let Some(v) = get("FAMLEDGER_STORAGE") {
            self.storage.backend = v.parse()?;
        }
        if let Some(v) = get("FAMLEDGER_SQLITE_PATH") {
            self.storage.sqlite_path = PathBuf::from(v);
        }
        if let Some(v) = get("DATABASE_URL") {
            self.storage.postgres_url = v;
        }
        if let Some(v) = get("FAMLEDGER_MONGO_URI") {
            self.storage.mongo_uri = v;
        }
        if let Some(v) = get("FAMLEDGER_MONGO_DATABASE") {
            self.storage.mongo_database = v;
        }
        if let Some(v) = get("JWT_SECRET") {
            self.auth.jwt_secret = v;
        }
        if let Some(v) = get("FAMLEDGER_INVITE_TTL_HOURS") {
            self.invites.ttl_hours = parse_num("invites.ttl_hours", &v)?;
        }
        if let Some(v) = get("FAMLEDGER_SWEEP_INTERVAL_SECS") {
            self.invites.sweep_interval_secs = parse_num("invites.sweep_interval_secs", &v)?;
        }
        if let Some(v) = get("FAMLEDGER_LOG") {
            self.logging.filter = v;
        }
        Ok(())
    }
}

fn parse_num<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: raw.to_string(),
    })
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: raw.to_string(),
        }),
    }
}
