//! Connection configuration

use crate::error::{ModelError, ModelResult};

/// Environment variable holding the connection URL.
pub const ENV_URL: &str = "DATABASE_URL";
/// Environment variable overriding the user in the URL.
pub const ENV_USER: &str = "DATABASE_USER";
/// Environment variable overriding the password in the URL.
pub const ENV_PASSWORD: &str = "DATABASE_PASSWORD";
/// Environment variable setting the pool size.
pub const ENV_POOL_SIZE: &str = "DATABASE_POOL_SIZE";

/// Configuration for [`Database`](crate::Database).
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL or key/value string.
    pub url: String,
    /// User, overriding the one in `url`.
    pub user: Option<String>,
    /// Password, overriding the one in `url`.
    pub password: Option<String>,
    /// Maximum number of pooled connections.
    pub max_size: usize,
    /// Truncate logged SQL (in bytes). `None` means no truncation.
    pub log_sql_max_len: Option<usize>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            user: None,
            password: None,
            max_size: 16,
            log_sql_max_len: Some(200),
        }
    }
}

impl DatabaseConfig {
    /// Create a new configuration with defaults.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Build a configuration from `DATABASE_URL` and friends.
    ///
    /// Loading a `.env` file is left to the caller.
    pub fn from_env() -> ModelResult<Self> {
        let url = std::env::var(ENV_URL)
            .map_err(|_| ModelError::Config(format!("{ENV_URL} is not set")))?;
        let mut config = Self::new(url);
        config.user = std::env::var(ENV_USER).ok();
        config.password = std::env::var(ENV_PASSWORD).ok();
        if let Ok(size) = std::env::var(ENV_POOL_SIZE) {
            config.max_size = parse_pool_size(&size)?;
        }
        Ok(config)
    }

    /// Set the user.
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Set the password.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the maximum pool size.
    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Set maximum SQL length to log.
    pub fn log_sql_max_len(mut self, len: usize) -> Self {
        self.log_sql_max_len = Some(len);
        self
    }

    /// Disable SQL truncation in logs.
    pub fn no_truncate(mut self) -> Self {
        self.log_sql_max_len = None;
        self
    }

    /// Parse `url` and apply the overrides.
    pub fn pg_config(&self) -> ModelResult<tokio_postgres::Config> {
        if self.max_size == 0 {
            return Err(ModelError::Config("max_size must be at least 1".into()));
        }
        let mut pg_config: tokio_postgres::Config = self
            .url
            .parse()
            .map_err(|e: tokio_postgres::Error| ModelError::Config(e.to_string()))?;
        if let Some(user) = &self.user {
            pg_config.user(user);
        }
        if let Some(password) = &self.password {
            pg_config.password(password);
        }
        Ok(pg_config)
    }
}

fn parse_pool_size(raw: &str) -> ModelResult<usize> {
    match raw.trim().parse::<usize>() {
        Ok(size) if size > 0 => Ok(size),
        _ => Err(ModelError::Config(format!(
            "{ENV_POOL_SIZE} must be a positive integer, got '{raw}'"
        ))),
    }
}
