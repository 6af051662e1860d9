use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
};
use chrono::Utc;
use serde_json::{Value, json};
use tracing::{debug, error, info, warn};

use crate::{
    cache::LEAD_DEDUP_TTL,
    error::AppError,
    models::{
        AnalyticsPayload, ChatPayload, EventList, LeadAccepted, LeadList, LeadRecord, LeadSubmission,
        ListQuery, LoginOutcome, LoginPayload, NewAnalyticsEvent, NewChatMessage,
    },
    mysql::{DEFAULT_MIRROR_LIMIT, MirroredLead},
    state::State as AppState,
    utils::{admin_token, lead_key, normalize_email, validate_lead},
};

type SharedState = State<Arc<AppState>>;

pub const LEAD_SUBMITTED_EVENT: &str = "lead_submitted";

fn parse<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload.map(|Json(value)| value).map_err(|rejection| {
        debug!("Rejected payload: {}", rejection.body_text());
        AppError::MalformedPayload
    })
}

pub async fn submit_lead_handler(
    State(state): SharedState,
    payload: Result<Json<LeadSubmission>, JsonRejection>,
) -> Result<Json<LeadAccepted>, AppError> {
    let lead = validate_lead(parse(payload)?)?;
    let key = lead_key(&lead.email);

    match state.cache.get(&key).await {
        Ok(Some(_)) => return Err(AppError::DuplicateLead),
        Ok(None) => {}
        Err(e) => warn!("Cache get error, dedup skipped for {}: {e}", lead.email),
    }

    let lead_id = state.primary.insert_lead(&lead).await.map_err(|e| {
        error!("Error submitting lead: {e}");
        e
    })?;

    match state.secondary.insert_lead(&lead).await {
        Ok(Some(row_id)) => debug!("Lead mirrored to MySQL as row {row_id}"),
        Ok(None) => info!("Lead {} already mirrored to MySQL", lead.email),
        Err(e) => warn!("Error mirroring lead: {e}"),
    }

    if let Err(e) = state.cache.set(&key, "submitted", LEAD_DEDUP_TTL).await {
        warn!("Cache set error: {e}");
    }

    let event = json!({ "email": lead.email, "niche": lead.niche });
    if let Err(e) = state.primary.record_event(LEAD_SUBMITTED_EVENT, event).await {
        warn!("Logging error: {e}");
    }

    let response = LeadAccepted {
        status: "success",
        message: "Lead submitted successfully",
        lead_id,
    };

    let notifier = state.notifier.clone();
    tokio::spawn(async move {
        notifier
            .notify(&lead.email, &lead.name, &lead.niche, &lead.problem)
            .await;
    });

    Ok(Json(response))
}

pub async fn list_leads_handler(
    State(state): SharedState,
    Query(query): Query<ListQuery>,
) -> Result<Json<LeadList<LeadRecord>>, AppError> {
    if !state.primary.is_available() {
        return Ok(Json(LeadList::from(Vec::new())));
    }

    let limit = query.limit.filter(|limit| *limit > 0);
    let leads = state.primary.list_leads(limit).await.map_err(|e| {
        error!("Error fetching leads: {e}");
        e
    })?;

    Ok(Json(LeadList::from(leads)))
}

pub async fn mirrored_leads_handler(
    State(state): SharedState,
    Query(query): Query<ListQuery>,
) -> Json<LeadList<MirroredLead>> {
    let limit = query
        .limit
        .filter(|limit| *limit > 0)
        .unwrap_or(DEFAULT_MIRROR_LIMIT);

    let leads = state.secondary.list_leads(limit).await.unwrap_or_else(|e| {
        warn!("Error fetching mirrored leads: {e}");
        Vec::new()
    });

    Json(LeadList::from(leads))
}

pub async fn clear_dedup_handler(
    State(state): SharedState,
    Path(email): Path<String>,
) -> Json<Value> {
    if let Err(e) = state.cache.delete(&lead_key(&normalize_email(&email))).await {
        warn!("Cache delete error: {e}");
    }

    Json(json!({ "status": "cleared" }))
}

pub async fn track_analytics_handler(
    State(state): SharedState,
    payload: Result<Json<AnalyticsPayload>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let event = NewAnalyticsEvent::from(parse(payload)?);

    if let Err(e) = state.primary.insert_analytics(&event).await {
        error!("Analytics error: {e}");
        return Ok(Json(json!({ "status": "error", "detail": e.to_string() })));
    }

    if let Err(e) = state.secondary.insert_analytics(&event).await {
        warn!("Error mirroring analytics: {e}");
    }

    Ok(Json(json!({ "status": "tracked" })))
}

pub async fn list_analytics_handler(State(state): SharedState) -> Result<Json<EventList>, AppError> {
    if !state.primary.is_available() {
        return Ok(Json(EventList::from(Vec::new())));
    }

    let events = state.primary.list_analytics().await.map_err(|e| {
        error!("Error fetching analytics: {e}");
        e
    })?;

    Ok(Json(EventList::from(events)))
}

pub async fn chat_handler(
    State(state): SharedState,
    payload: Result<Json<ChatPayload>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let chat = NewChatMessage::from(parse(payload)?);

    let message_id = state.primary.insert_chat(&chat).await.map_err(|e| {
        error!("Chat error: {e}");
        e
    })?;

    Ok(Json(json!({ "status": "success", "message_id": message_id })))
}

pub async fn login_handler(
    State(state): SharedState,
    payload: Result<Json<LoginPayload>, JsonRejection>,
) -> Result<Json<LoginOutcome>, AppError> {
    let credentials = parse(payload)?;

    let outcome = if credentials.username == state.config.admin_username
        && credentials.password == state.config.admin_password
    {
        LoginOutcome {
            authenticated: true,
            token: Some(admin_token(Utc::now())),
            message: "Login successful",
        }
    } else {
        LoginOutcome {
            authenticated: false,
            token: None,
            message: "Invalid credentials",
        }
    };

    Ok(Json(outcome))
}

pub async fn api_health_handler() -> Json<Value> {
    Json(json!({ "status": "ok", "api": "v1" }))
}

pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok", "service": "AutoMate AI Backend" }))
}
