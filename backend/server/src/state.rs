use std::sync::Arc;

use tracing::info;

use super::{
    cache::{Cache, RedisCache},
    config::Config,
    mongo::{MongoStore, PrimaryStore},
    mysql::{MySqlStore, SecondaryStore},
    notifier::{Notifier, SmtpNotifier},
};

pub struct State {
    pub config: Config,
    pub cache: Arc<dyn Cache>,
    pub primary: Arc<dyn PrimaryStore>,
    pub secondary: Arc<dyn SecondaryStore>,
    pub notifier: Arc<dyn Notifier>,
    connections: Option<Connections>,
}

/// Concrete handles kept around so they can be closed on shutdown.
struct Connections {
    mongo: Arc<MongoStore>,
    mysql: Arc<MySqlStore>,
}

impl State {
    pub async fn new(config: Config) -> Arc<Self> {
        let timeout = config.connect_timeout;

        let mongo = Arc::new(MongoStore::connect(&config.mongo_uri, &config.mongo_db, timeout).await);
        let redis = RedisCache::connect(config.redis_url().as_deref(), timeout).await;
        let mysql = Arc::new(MySqlStore::connect(&config).await);
        let notifier = SmtpNotifier::from_config(&config);

        info!("All connections initialized");

        Arc::new(Self {
            cache: Arc::new(redis),
            primary: mongo.clone(),
            secondary: mysql.clone(),
            notifier: Arc::new(notifier),
            connections: Some(Connections { mongo, mysql }),
            config,
        })
    }

    pub fn from_parts(
        config: Config,
        cache: Arc<dyn Cache>,
        primary: Arc<dyn PrimaryStore>,
        secondary: Arc<dyn SecondaryStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            cache,
            primary,
            secondary,
            notifier,
            connections: None,
        })
    }

    pub async fn shutdown(&self) {
        if let Some(connections) = &self.connections {
            connections.mongo.close().await;
            connections.mysql.close().await;
        }

        info!("All connections closed");
    }
}
