//! # MongoDB
//!
//! System of record for leads, analytics events and chat messages.
//!
//! ## Collections
//! - `leads`: name, email, niche, problem, created_at, source
//! - `analytics`: name, timestamp (client string), url, buttonText, created_at, optional data
//! - `chats`: message, user_email, created_at
//!
//! ## Notes
//! - No unique index on email. Duplicate submissions are only filtered by the
//!   Redis dedup key, so two racing requests can both land here.
//! - A failed write is fatal to the request that issued it.
//! - Listings skip documents that no longer decode instead of failing the
//!   whole admin view.
use std::time::Duration;

use async_trait::async_trait;
use bson::{Bson, DateTime as BsonDateTime, Document, doc, oid::ObjectId};
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::{Client, Collection, Database, options::ClientOptions};
use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    error::StoreError,
    models::{
        AnalyticsRecord, LEAD_SOURCE, LeadRecord, NewAnalyticsEvent, NewChatMessage, NewLead,
    },
};

pub const LEADS: &str = "leads";
pub const ANALYTICS: &str = "analytics";
pub const CHATS: &str = "chats";

const MONGO: &str = "MongoDB";

#[async_trait]
pub trait PrimaryStore: Send + Sync {
    fn is_available(&self) -> bool;

    async fn insert_lead(&self, lead: &NewLead) -> Result<String, StoreError>;

    async fn insert_analytics(&self, event: &NewAnalyticsEvent) -> Result<(), StoreError>;

    async fn insert_chat(&self, chat: &NewChatMessage) -> Result<String, StoreError>;

    /// Newest first. `None` returns every lead.
    async fn list_leads(&self, limit: Option<i64>) -> Result<Vec<LeadRecord>, StoreError>;

    async fn list_analytics(&self) -> Result<Vec<AnalyticsRecord>, StoreError>;

    /// Appends a server-side event to the analytics collection.
    async fn record_event(&self, name: &str, data: serde_json::Value) -> Result<(), StoreError>;
}

pub struct MongoStore {
    client: Option<Client>,
    database: Option<Database>,
}

#[derive(Deserialize)]
struct LeadDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    name: String,
    email: String,
    niche: String,
    problem: String,
    created_at: BsonDateTime,
    #[serde(default)]
    source: Option<String>,
}

#[derive(Deserialize)]
struct AnalyticsDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    name: String,
    timestamp: String,
    url: String,
    #[serde(rename = "buttonText", default)]
    button_text: Option<String>,
    #[serde(default)]
    data: Option<Document>,
    created_at: BsonDateTime,
}

impl MongoStore {
    pub fn disconnected() -> Self {
        Self {
            client: None,
            database: None,
        }
    }

    pub async fn connect(uri: &str, database_name: &str, timeout: Duration) -> Self {
        if uri.is_empty() {
            warn!("MongoDB not configured, running without MongoDB");
            return Self::disconnected();
        }

        match init_mongo(uri, database_name, timeout).await {
            Ok((client, database)) => {
                info!("Connected to MongoDB: {database_name}");
                Self {
                    client: Some(client),
                    database: Some(database),
                }
            }
            Err(e) => {
                warn!("MongoDB connection failed: {e}");
                warn!("Running without MongoDB");
                Self::disconnected()
            }
        }
    }

    pub async fn close(&self) {
        if let Some(client) = &self.client {
            client.clone().shutdown().await;
            info!("MongoDB connection closed");
        }
    }

    fn collection(&self, name: &str) -> Result<Collection<Document>, StoreError> {
        self.database
            .as_ref()
            .map(|database| database.collection(name))
            .ok_or(StoreError::Unavailable(MONGO))
    }
}

async fn init_mongo(
    uri: &str,
    database_name: &str,
    timeout: Duration,
) -> Result<(Client, Database), StoreError> {
    let mut options = ClientOptions::parse(uri).await?;
    options.server_selection_timeout = Some(timeout);
    options.connect_timeout = Some(timeout);

    let client = Client::with_options(options)?;
    let database = client.database(database_name);

    database.run_command(doc! { "ping": 1 }).await?;

    Ok((client, database))
}

fn inserted_id(id: Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        other => other.to_string(),
    }
}

fn decode<T>(collection: &str, documents: Vec<Document>) -> Vec<T>
where
    T: for<'de> Deserialize<'de>,
{
    documents
        .into_iter()
        .filter_map(|document| match bson::from_document(document) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!("Skipping malformed {collection} document: {e}");
                None
            }
        })
        .collect()
}

impl From<LeadDocument> for LeadRecord {
    fn from(document: LeadDocument) -> Self {
        Self {
            id: document.id.to_hex(),
            name: document.name,
            email: document.email,
            niche: document.niche,
            problem: document.problem,
            created_at: document.created_at.to_chrono(),
            source: document.source.unwrap_or_else(|| LEAD_SOURCE.to_string()),
        }
    }
}

impl From<AnalyticsDocument> for AnalyticsRecord {
    fn from(document: AnalyticsDocument) -> Self {
        Self {
            id: document.id.to_hex(),
            name: document.name,
            timestamp: document.timestamp,
            url: document.url,
            button_text: document.button_text,
            data: document
                .data
                .map(|data| Bson::Document(data).into_relaxed_extjson()),
            created_at: document.created_at.to_chrono(),
        }
    }
}

#[async_trait]
impl PrimaryStore for MongoStore {
    fn is_available(&self) -> bool {
        self.database.is_some()
    }

    async fn insert_lead(&self, lead: &NewLead) -> Result<String, StoreError> {
        let result = self
            .collection(LEADS)?
            .insert_one(doc! {
                "name": lead.name.as_str(),
                "email": lead.email.as_str(),
                "niche": lead.niche.as_str(),
                "problem": lead.problem.as_str(),
                "created_at": BsonDateTime::now(),
                "source": LEAD_SOURCE,
            })
            .await?;

        Ok(inserted_id(result.inserted_id))
    }

    async fn insert_analytics(&self, event: &NewAnalyticsEvent) -> Result<(), StoreError> {
        self.collection(ANALYTICS)?
            .insert_one(doc! {
                "name": event.name.as_str(),
                "timestamp": event.timestamp.as_str(),
                "url": event.url.as_str(),
                "buttonText": event.button_text.clone(),
                "created_at": BsonDateTime::now(),
            })
            .await?;

        Ok(())
    }

    async fn insert_chat(&self, chat: &NewChatMessage) -> Result<String, StoreError> {
        let result = self
            .collection(CHATS)?
            .insert_one(doc! {
                "message": chat.message.as_str(),
                "user_email": chat.user_email.clone(),
                "created_at": BsonDateTime::now(),
            })
            .await?;

        Ok(inserted_id(result.inserted_id))
    }

    async fn list_leads(&self, limit: Option<i64>) -> Result<Vec<LeadRecord>, StoreError> {
        let leads = self.collection(LEADS)?;
        let mut find = leads.find(doc! {}).sort(doc! { "created_at": -1 });

        if let Some(limit) = limit {
            find = find.limit(limit);
        }

        let documents: Vec<Document> = find.await?.try_collect().await?;

        Ok(decode::<LeadDocument>(LEADS, documents)
            .into_iter()
            .map(LeadRecord::from)
            .collect())
    }

    async fn list_analytics(&self) -> Result<Vec<AnalyticsRecord>, StoreError> {
        let analytics = self.collection(ANALYTICS)?;
        let documents: Vec<Document> = analytics.find(doc! {}).await?.try_collect().await?;

        Ok(decode::<AnalyticsDocument>(ANALYTICS, documents)
            .into_iter()
            .map(AnalyticsRecord::from)
            .collect())
    }

    async fn record_event(&self, name: &str, data: serde_json::Value) -> Result<(), StoreError> {
        let data = Bson::try_from(data)?;

        self.collection(ANALYTICS)?
            .insert_one(doc! {
                "name": name,
                "timestamp": Utc::now().to_rfc3339(),
                "url": "/api/leads",
                "buttonText": Bson::Null,
                "data": data,
                "created_at": BsonDateTime::now(),
            })
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use bson::{Bson, doc, oid::ObjectId};

    use super::{AnalyticsDocument, LeadDocument, decode, inserted_id};
    use crate::models::{AnalyticsRecord, LeadRecord};

    #[test]
    fn test_inserted_id_is_hex() {
        let oid = ObjectId::new();

        assert_eq!(inserted_id(Bson::ObjectId(oid)), oid.to_hex());
        assert_eq!(inserted_id(Bson::ObjectId(oid)).len(), 24);
    }

    #[test]
    fn test_decode_skips_malformed_documents() {
        let oid = ObjectId::new();
        let documents = vec![
            doc! {
                "_id": oid,
                "name": "Ava",
                "email": "ava@x.com",
                "niche": "saas",
                "problem": "manual onboarding",
                "created_at": bson::DateTime::now(),
                "source": "web_form",
            },
            doc! { "_id": ObjectId::new(), "name": "missing fields" },
        ];

        let leads: Vec<LeadRecord> = decode::<LeadDocument>("leads", documents)
            .into_iter()
            .map(LeadRecord::from)
            .collect();

        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0].id, oid.to_hex());
        assert_eq!(leads[0].source, "web_form");
    }

    #[test]
    fn test_analytics_data_becomes_json() {
        let documents = vec![doc! {
            "_id": ObjectId::new(),
            "name": "lead_submitted",
            "timestamp": "2026-01-01T00:00:00Z",
            "url": "/api/leads",
            "buttonText": Bson::Null,
            "data": { "email": "ava@x.com", "niche": "saas" },
            "created_at": bson::DateTime::now(),
        }];

        let events: Vec<AnalyticsRecord> = decode::<AnalyticsDocument>("analytics", documents)
            .into_iter()
            .map(AnalyticsRecord::from)
            .collect();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].button_text, None);
        assert_eq!(
            events[0].data,
            Some(serde_json::json!({ "email": "ava@x.com", "niche": "saas" }))
        );
    }
}
