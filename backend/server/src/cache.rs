//! # Redis
//!
//! RAM database.
//!
//! Only purpose is to short-circuit duplicate lead submissions. A key
//! `lead:{email}` holding `"submitted"` is written after a lead is stored and
//! expires after 24 hours.
//!
//! ## Requirements
//!
//! - Fast lookups, one key per email
//! - Nothing depends on it being up: every failure is reported to the caller,
//!   which logs it and carries on as if the key did not exist
//! - No consistency with MongoDB or MySQL
//!
//! ## Implementation
//!
//! - Plain string keys with `SETEX`
//! - Connection manager reconnects on its own, one retry per command
//! - If the first `PING` fails at startup we run disconnected for the lifetime
//!   of the process
use std::time::Duration;

use async_trait::async_trait;
use redis::{
    AsyncCommands, Client,
    aio::{ConnectionManager, ConnectionManagerConfig},
};
use tracing::{info, warn};

use crate::error::CacheError;

pub const LEAD_DEDUP_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

pub struct RedisCache {
    connection: Option<ConnectionManager>,
}

impl RedisCache {
    pub fn disconnected() -> Self {
        Self { connection: None }
    }

    pub async fn connect(redis_url: Option<&str>, timeout: Duration) -> Self {
        let Some(redis_url) = redis_url else {
            warn!("Redis not configured, running without caching");
            return Self::disconnected();
        };

        match init_redis(redis_url, timeout).await {
            Ok(connection) => {
                info!("Connected to Redis: {redis_url}");
                Self {
                    connection: Some(connection),
                }
            }
            Err(e) => {
                warn!("Redis connection failed: {e}");
                warn!("Running without Redis caching");
                Self::disconnected()
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    fn connection(&self) -> Result<ConnectionManager, CacheError> {
        self.connection.clone().ok_or(CacheError::Unavailable)
    }
}

async fn init_redis(redis_url: &str, timeout: Duration) -> Result<ConnectionManager, CacheError> {
    let config = ConnectionManagerConfig::new()
        .set_number_of_retries(1)
        .set_connection_timeout(timeout);

    let client = Client::open(redis_url)?;
    let mut connection_manager = client.get_connection_manager_with_config(config).await?;

    let _: String = redis::cmd("PING")
        .query_async(&mut connection_manager)
        .await?;

    Ok(connection_manager)
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut connection = self.connection()?;

        Ok(connection.get(key).await?)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut connection = self.connection()?;

        let _: () = connection.set_ex(key, value, ttl.as_secs()).await?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut connection = self.connection()?;

        let _: () = connection.del(key).await?;

        Ok(())
    }
}
