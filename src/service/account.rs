//! Registration and credential checks

use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::domain::aggregates::{LoginId, User};
use crate::domain::value_objects::RecordStatus;
use crate::service::validate;
use crate::store::Store;
use crate::{EcommerceError, Result};

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// Email address or phone number
    #[validate(length(min = 3, max = 254))]
    pub email_or_phone: String,
    #[validate(length(min = 8, max = 72))]
    pub password: String,
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1))]
    pub email_or_phone: String,
    #[validate(length(min = 1))]
    pub password: String,
}

fn login_id(raw: &str) -> Result<LoginId> {
    LoginId::parse(raw).ok_or_else(|| {
        EcommerceError::Validation("expected an email address or a phone number".into())
    })
}

fn blocking_err(e: tokio::task::JoinError) -> EcommerceError {
    EcommerceError::Storage(format!("password task failed: {e}"))
}

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn Store>,
    bcrypt_cost: u32,
}

impl AccountService {
    pub fn new(store: Arc<dyn Store>, bcrypt_cost: u32) -> Self {
        Self { store, bcrypt_cost }
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<User> {
        validate(&request)?;
        let login = login_id(&request.email_or_phone)?;
        let cost = self.bcrypt_cost;
        let password = request.password;
        let password_hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(blocking_err)?
            .map_err(|e| EcommerceError::Storage(format!("password hashing failed: {e}")))?;

        let (email, phone_number) = match login {
            LoginId::Email(e) => (Some(e), None),
            LoginId::Phone(p) => (None, Some(p)),
        };
        let user = User {
            id: Uuid::now_v7(),
            name: request.name.trim().to_string(),
            email,
            phone_number,
            password_hash,
            status: RecordStatus::Active,
            created_at: Utc::now(),
        };
        self.store.insert_user(&user).await?;
        tracing::info!(user_id = %user.id, "Registered user");
        Ok(user)
    }

    /// Unknown identifiers and wrong passwords fail the same way.
    pub async fn login(&self, request: LoginRequest) -> Result<User> {
        validate(&request)?;
        let login =
            LoginId::parse(&request.email_or_phone).ok_or(EcommerceError::InvalidCredentials)?;
        let user = self
            .store
            .user_by_login(&login)
            .await?
            .ok_or(EcommerceError::InvalidCredentials)?;
        let hash = user.password_hash.clone();
        let password = request.password;
        let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(blocking_err)?
            .unwrap_or(false);
        if !verified {
            tracing::warn!(user_id = %user.id, "Rejected login");
            return Err(EcommerceError::InvalidCredentials);
        }
        Ok(user)
    }
}
