use std::{env, fmt::Display, fs::read_to_string, path::PathBuf, str::FromStr, time::Duration};

use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
#[error("Invalid {key} value: {message}")]
pub struct ConfigError {
    pub key: &'static str,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub static_dir: PathBuf,
    pub templates_dir: PathBuf,
    pub connect_timeout: Duration,

    pub smtp_server: String,
    pub smtp_port: u16,
    pub sender_email: String,
    pub sender_password: String,
    pub operator_email: String,

    pub mongo_uri: String,
    pub mongo_db: String,

    pub mysql_host: String,
    pub mysql_user: String,
    pub mysql_password: String,
    pub mysql_db: String,
    pub mysql_port: u16,

    pub redis_host: String,
    pub redis_port: u16,
    pub redis_db: u32,

    pub admin_username: String,
    pub admin_password: String,
}

impl Config {
    /// Reads `.env` (if present) and then the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            info!("Loaded environment from {}", path.display());
        }

        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let loader = Loader { lookup };

        Ok(Self {
            port: loader.try_load("PORT", "8000")?,
            static_dir: loader.try_load("STATIC_DIR", "static")?,
            templates_dir: loader.try_load("TEMPLATES_DIR", "templates")?,
            connect_timeout: Duration::from_millis(loader.try_load("CONNECT_TIMEOUT_MS", "5000")?),

            smtp_server: loader.try_load("SMTP_SERVER", "smtp.gmail.com")?,
            smtp_port: loader.try_load("SMTP_PORT", "587")?,
            sender_email: loader.try_load("SENDER_EMAIL", "")?,
            sender_password: loader.secret("SENDER_PASSWORD"),
            operator_email: loader.try_load("YOUR_EMAIL", "")?,

            mongo_uri: loader.try_load("MONGO_URI", "mongodb://localhost:27017")?,
            mongo_db: loader.try_load("MONGO_DB", "automate_ai")?,

            mysql_host: loader.try_load("MYSQL_HOST", "localhost")?,
            mysql_user: loader.try_load("MYSQL_USER", "root")?,
            mysql_password: loader.secret("MYSQL_PASSWORD"),
            mysql_db: loader.try_load("MYSQL_DB", "automate_ai")?,
            mysql_port: loader.try_load("MYSQL_PORT", "3306")?,

            redis_host: loader.try_load("REDIS_HOST", "localhost")?,
            redis_port: loader.try_load("REDIS_PORT", "6379")?,
            redis_db: loader.try_load("REDIS_DB", "0")?,

            admin_username: loader.try_load("ADMIN_USERNAME", "admin")?,
            admin_password: loader.secret_or("ADMIN_PASSWORD", "admin123"),
        })
    }

    pub fn redis_url(&self) -> Option<String> {
        if self.redis_host.is_empty() {
            return None;
        }

        Some(format!(
            "redis://{}:{}/{}",
            self.redis_host, self.redis_port, self.redis_db
        ))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8000,
            static_dir: PathBuf::from("static"),
            templates_dir: PathBuf::from("templates"),
            connect_timeout: Duration::from_millis(5000),
            smtp_server: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            sender_email: String::new(),
            sender_password: String::new(),
            operator_email: String::new(),
            mongo_uri: "mongodb://localhost:27017".to_string(),
            mongo_db: "automate_ai".to_string(),
            mysql_host: "localhost".to_string(),
            mysql_user: "root".to_string(),
            mysql_password: String::new(),
            mysql_db: "automate_ai".to_string(),
            mysql_port: 3306,
            redis_host: "localhost".to_string(),
            redis_port: 6379,
            redis_db: 0,
            admin_username: "admin".to_string(),
            admin_password: "admin123".to_string(),
        }
    }
}

struct Loader<F> {
    lookup: F,
}

impl<F> Loader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn var(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
    }

    fn try_load<T: FromStr>(&self, key: &'static str, default: &str) -> Result<T, ConfigError>
    where
        T::Err: Display,
    {
        self.var(key)
            .unwrap_or_else(|| {
                info!("{key} not set, using default: {default}");
                default.to_string()
            })
            .parse()
            .map_err(|e: T::Err| {
                warn!("Invalid {key} value: {e}");

                ConfigError {
                    key,
                    message: e.to_string(),
                }
            })
    }

    fn secret(&self, key: &str) -> String {
        self.secret_or(key, "")
    }

    /// Environment first, then a docker secret mounted at `/run/secrets/{key}`.
    fn secret_or(&self, key: &str, default: &str) -> String {
        if let Some(value) = self.var(key) {
            return value;
        }

        let path = format!("/run/secrets/{key}");

        read_to_string(&path)
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|_| {
                if default.is_empty() {
                    warn!("{key} not set");
                }
                default.to_string()
            })
    }
}
