//! Wishlist entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::RecordStatus;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Wishlist {
    pub id: Uuid,
    #[serde(skip)]
    pub user_id: Uuid,
    pub product_id: Uuid,
    #[serde(skip)]
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
}

impl Wishlist {
    pub fn new(user_id: Uuid, product_id: Uuid) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id,
            product_id,
            status: RecordStatus::Active,
            created_at: Utc::now(),
        }
    }
}
