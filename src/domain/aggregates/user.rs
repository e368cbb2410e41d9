//! Users and the authenticated identity of a request

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::validate_email;

use crate::domain::value_objects::RecordStatus;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    #[serde(skip)]
    pub password_hash: String,
    #[serde(skip)]
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
}

/// Login identifier: users sign up with either an email or a phone number
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoginId {
    Email(String),
    Phone(String),
}

impl LoginId {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.contains('@') {
            return validate_email(raw).then(|| Self::Email(raw.to_ascii_lowercase()));
        }
        let digits = raw.strip_prefix('+').unwrap_or(raw);
        let valid =
            (10..=15).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit());
        valid.then(|| Self::Phone(digits.to_string()))
    }
}

/// Caller identity resolved from the request's token, passed explicitly to services
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AuthedUser {
    pub id: Uuid,
}

impl AuthedUser {
    pub fn new(id: Uuid) -> Self {
        Self { id }
    }
}
