//! Address Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::RecordStatus;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Address {
    pub id: Uuid,
    #[serde(skip)]
    pub user_id: Uuid,
    pub name: String,
    /// At most one active address per user carries the flag
    pub is_default: bool,
    pub street: String,
    pub district: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: String,
    pub postal_code: String,
    #[serde(skip)]
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
}

/// The user-editable part of an address
#[derive(Clone, Debug, Default)]
pub struct AddressFields {
    pub name: String,
    pub street: String,
    pub district: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub postal_code: String,
}

fn optional(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

impl Address {
    pub fn new(user_id: Uuid, fields: AddressFields) -> Self {
        let mut address = Self {
            id: Uuid::now_v7(),
            user_id,
            name: String::new(),
            is_default: false,
            street: String::new(),
            district: None,
            city: None,
            state: None,
            country: String::new(),
            postal_code: String::new(),
            status: RecordStatus::Active,
            created_at: Utc::now(),
        };
        address.apply(fields);
        address
    }

    pub fn apply(&mut self, fields: AddressFields) {
        self.name = fields.name;
        self.street = fields.street;
        self.district = optional(fields.district);
        self.city = optional(fields.city);
        self.state = optional(fields.state);
        self.country = fields.country;
        self.postal_code = fields.postal_code;
    }

    pub fn is_usable_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id && self.status.is_active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_fields_become_none() {
        let a = Address::new(
            Uuid::now_v7(),
            AddressFields {
                name: "Home".into(),
                street: "Jl. Merdeka 1".into(),
                district: "  ".into(),
                city: "Bandung".into(),
                country: "ID".into(),
                postal_code: "40111".into(),
                ..Default::default()
            },
        );
        assert_eq!(a.district, None);
        assert_eq!(a.city.as_deref(), Some("Bandung"));
        assert!(!a.is_default);
    }
}
