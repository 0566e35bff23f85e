use std::fmt;
use std::str::FromStr;

use sqlx::postgres::PgConnectOptions;

use crate::error::StartupError;

/// Database connection settings loaded from environment variables.
///
/// | Env Var                   | Default     |
/// |---------------------------|-------------|
/// | `DATABASE_URL`            | *(unset)*   |
/// | `DB_HOST`                 | `localhost` |
/// | `DB_PORT`                 | `5432`      |
/// | `DB_NAME`                 | `dockyard`  |
/// | `DB_USER`                 | `postgres`  |
/// | `DB_PASSWORD`             | *(unset)*   |
/// | `DB_MAX_CONNECTIONS`      | `20`        |
/// | `DB_ACQUIRE_TIMEOUT_SECS` | `5`         |
///
/// When `DATABASE_URL` is set it takes precedence over the individual
/// host/port/name/user/password fields.
#[derive(Clone)]
pub struct DbConfig {
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: Option<String>,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".into(),
            port: 5432,
            database: "dockyard".into(),
            username: "postgres".into(),
            password: None,
            max_connections: 20,
            acquire_timeout_secs: 5,
        }
    }
}

impl DbConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, StartupError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, StartupError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            url: lookup("DATABASE_URL").filter(|s| !s.is_empty()),
            host: lookup("DB_HOST").unwrap_or(defaults.host),
            port: parse_or(&lookup, "DB_PORT", defaults.port)?,
            database: lookup("DB_NAME").unwrap_or(defaults.database),
            username: lookup("DB_USER").unwrap_or(defaults.username),
            password: lookup("DB_PASSWORD"),
            max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", defaults.max_connections)?,
            acquire_timeout_secs: parse_or(
                &lookup,
                "DB_ACQUIRE_TIMEOUT_SECS",
                defaults.acquire_timeout_secs,
            )?,
        })
    }

    /// Build sqlx connect options from either the URL or the discrete fields.
    pub fn connect_options(&self) -> Result<PgConnectOptions, sqlx::Error> {
        if let Some(url) = &self.url {
            return PgConnectOptions::from_str(url);
        }
        let mut opts = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(&self.username);
        if let Some(password) = &self.password {
            opts = opts.password(password);
        }
        Ok(opts)
    }
}

// Keep credentials out of logs.
impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("url", &self.url.as_ref().map(|_| "<redacted>"))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("max_connections", &self.max_connections)
            .field("acquire_timeout_secs", &self.acquire_timeout_secs)
            .finish()
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, StartupError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| StartupError::Config(format!("{key} must be a valid number: {e}"))),
    }
}
