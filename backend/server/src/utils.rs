use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::{
    error::AppError,
    models::{LeadSubmission, NewLead},
};

pub const LEAD_KEY_PREFIX: &str = "lead:";

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$")
        .expect("email pattern compiles")
});

pub fn lead_key(email: &str) -> String {
    format!("{LEAD_KEY_PREFIX}{email}")
}

pub fn is_valid_email(email: &str) -> bool {
    email.len() <= 254 && !email.contains("..") && EMAIL.is_match(email)
}

/// Domains are case-insensitive, the local part is kept as typed.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();

    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{local}@{}", domain.to_ascii_lowercase()),
        None => email.to_string(),
    }
}

pub fn validate_lead(submission: LeadSubmission) -> Result<NewLead, AppError> {
    let email = normalize_email(&submission.email);
    if !is_valid_email(&email) {
        return Err(AppError::Validation(
            "email: value is not a valid email address".to_string(),
        ));
    }

    Ok(NewLead {
        name: required("name", submission.name)?,
        email,
        niche: required("niche", submission.niche)?,
        problem: required("problem", submission.problem)?,
    })
}

fn required(field: &str, value: String) -> Result<String, AppError> {
    let trimmed = value.trim();

    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{field}: field required")));
    }

    Ok(trimmed.to_string())
}

/// Placeholder admin token. Nothing verifies it on later requests.
pub fn admin_token(now: DateTime<Utc>) -> String {
    format!(
        "admin_session_{}.{:06}",
        now.timestamp(),
        now.timestamp_subsec_micros()
    )
}
