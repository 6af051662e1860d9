//! # MySQL
//!
//! Backup copy of leads and analytics for reporting.
//!
//! Nothing reads from here on the request path. Writes are best-effort: the
//! handler logs whatever comes back and moves on, so this table is allowed to
//! drift from MongoDB.
//!
//! ## Schema
//! - `leads`: unique on email, a second insert for the same email is reported
//!   as "already exists" rather than an error
//! - `analytics`: event name, JSON payload, url
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{
    FromRow, MySqlPool,
    mysql::{MySqlConnectOptions, MySqlPoolOptions},
};
use tracing::{info, warn};

use crate::{
    config::Config,
    error::StoreError,
    models::{NewAnalyticsEvent, NewLead},
};

const MYSQL: &str = "MySQL";

pub const DEFAULT_MIRROR_LIMIT: i64 = 100;

const CREATE_LEADS: &str = r#"
    CREATE TABLE IF NOT EXISTS leads (
        id INT AUTO_INCREMENT PRIMARY KEY,
        name VARCHAR(255) NOT NULL,
        email VARCHAR(255) NOT NULL UNIQUE,
        niche VARCHAR(100),
        problem TEXT,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP
    )
"#;

const CREATE_ANALYTICS: &str = r#"
    CREATE TABLE IF NOT EXISTS analytics (
        id INT AUTO_INCREMENT PRIMARY KEY,
        event_name VARCHAR(100),
        event_data JSON,
        url VARCHAR(500),
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    )
"#;

#[async_trait]
pub trait SecondaryStore: Send + Sync {
    /// `Ok(None)` when a lead with this email is already mirrored.
    async fn insert_lead(&self, lead: &NewLead) -> Result<Option<u64>, StoreError>;

    async fn insert_analytics(&self, event: &NewAnalyticsEvent) -> Result<(), StoreError>;

    async fn list_leads(&self, limit: i64) -> Result<Vec<MirroredLead>, StoreError>;
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MirroredLead {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub niche: Option<String>,
    pub problem: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

pub struct MySqlStore {
    pool: Option<MySqlPool>,
}

impl MySqlStore {
    pub fn disconnected() -> Self {
        Self { pool: None }
    }

    pub async fn connect(config: &Config) -> Self {
        if config.mysql_host.is_empty() {
            warn!("MySQL not configured, running without MySQL");
            return Self::disconnected();
        }

        match init_mysql(config).await {
            Ok(pool) => {
                info!("Connected to MySQL: {}", config.mysql_db);
                Self { pool: Some(pool) }
            }
            Err(e) => {
                warn!("MySQL connection failed: {e}");
                warn!("Running without MySQL");
                Self::disconnected()
            }
        }
    }

    pub async fn close(&self) {
        if let Some(pool) = &self.pool {
            pool.close().await;
            info!("MySQL connection closed");
        }
    }

    fn pool(&self) -> Result<&MySqlPool, StoreError> {
        self.pool.as_ref().ok_or(StoreError::Unavailable(MYSQL))
    }
}

async fn init_mysql(config: &Config) -> Result<MySqlPool, StoreError> {
    let options = MySqlConnectOptions::new()
        .host(&config.mysql_host)
        .port(config.mysql_port)
        .username(&config.mysql_user)
        .password(&config.mysql_password)
        .database(&config.mysql_db)
        .charset("utf8mb4");

    let pool = MySqlPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(config.connect_timeout)
        .connect_with(options)
        .await?;

    create_tables(&pool).await?;

    Ok(pool)
}

async fn create_tables(pool: &MySqlPool) -> Result<(), StoreError> {
    sqlx::query(CREATE_LEADS).execute(pool).await?;
    sqlx::query(CREATE_ANALYTICS).execute(pool).await?;

    info!("Tables created/verified");

    Ok(())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn event_data(event: &NewAnalyticsEvent) -> String {
    serde_json::json!({
        "button": event.button_text,
        "url": event.url,
    })
    .to_string()
}

#[async_trait]
impl SecondaryStore for MySqlStore {
    async fn insert_lead(&self, lead: &NewLead) -> Result<Option<u64>, StoreError> {
        let result =
            sqlx::query("INSERT INTO leads (name, email, niche, problem) VALUES (?, ?, ?, ?)")
                .bind(&lead.name)
                .bind(&lead.email)
                .bind(&lead.niche)
                .bind(&lead.problem)
                .execute(self.pool()?)
                .await;

        match result {
            Ok(done) => Ok(Some(done.last_insert_id())),
            Err(err) if is_unique_violation(&err) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn insert_analytics(&self, event: &NewAnalyticsEvent) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO analytics (event_name, event_data, url) VALUES (?, ?, ?)")
            .bind(&event.name)
            .bind(event_data(event))
            .bind(&event.url)
            .execute(self.pool()?)
            .await?;

        Ok(())
    }

    async fn list_leads(&self, limit: i64) -> Result<Vec<MirroredLead>, StoreError> {
        let rows = sqlx::query_as::<_, MirroredLead>(
            "SELECT id, name, email, niche, problem, created_at FROM leads ORDER BY created_at DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(self.pool()?)
        .await?;

        Ok(rows)
    }
}
