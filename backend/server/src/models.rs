//! Payloads accepted by the API, validated domain values and the records
//! returned by the admin listings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const LEAD_SOURCE: &str = "web_form";

#[derive(Debug, Deserialize)]
pub struct LeadSubmission {
    pub name: String,
    pub email: String,
    pub niche: String,
    pub problem: String,
}

#[derive(Debug, Deserialize)]
pub struct AnalyticsPayload {
    pub name: String,
    pub timestamp: String,
    pub url: String,
    #[serde(rename = "buttonText", default)]
    pub button_text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatPayload {
    pub message: String,
    #[serde(default)]
    pub user_email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginPayload {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

/// A lead that passed validation and is ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLead {
    pub name: String,
    pub email: String,
    pub niche: String,
    pub problem: String,
}

#[derive(Debug, Clone)]
pub struct NewAnalyticsEvent {
    pub name: String,
    pub timestamp: String,
    pub url: String,
    pub button_text: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewChatMessage {
    pub message: String,
    pub user_email: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeadRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub niche: String,
    pub problem: String,
    pub created_at: DateTime<Utc>,
    pub source: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub timestamp: String,
    pub url: String,
    #[serde(rename = "buttonText")]
    pub button_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct LeadAccepted {
    pub status: &'static str,
    pub message: &'static str,
    pub lead_id: String,
}

#[derive(Debug, Serialize)]
pub struct LeadList<T> {
    pub count: usize,
    pub leads: Vec<T>,
}

#[derive(Debug, Serialize)]
pub struct EventList {
    pub count: usize,
    pub events: Vec<AnalyticsRecord>,
}

#[derive(Debug, Serialize)]
pub struct LoginOutcome {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub message: &'static str,
}

impl<T> From<Vec<T>> for LeadList<T> {
    fn from(leads: Vec<T>) -> Self {
        Self {
            count: leads.len(),
            leads,
        }
    }
}

impl From<Vec<AnalyticsRecord>> for EventList {
    fn from(events: Vec<AnalyticsRecord>) -> Self {
        Self {
            count: events.len(),
            events,
        }
    }
}

impl From<AnalyticsPayload> for NewAnalyticsEvent {
    fn from(payload: AnalyticsPayload) -> Self {
        Self {
            name: payload.name,
            timestamp: payload.timestamp,
            url: payload.url,
            button_text: payload.button_text,
        }
    }
}

impl From<ChatPayload> for NewChatMessage {
    fn from(payload: ChatPayload) -> Self {
        Self {
            message: payload.message,
            user_email: payload.user_email,
        }
    }
}
