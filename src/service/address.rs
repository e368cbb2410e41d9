//! Address book: keyed CRUD with a single default address per user

use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::domain::aggregates::{Address, AddressFields, AuthedUser};
use crate::domain::value_objects::{Page, PageRequest};
use crate::service::validate;
use crate::store::Store;
use crate::{EcommerceError, Result};

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AddressRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 255))]
    pub street: String,
    #[serde(default)]
    pub district: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[validate(length(min = 1, max = 100))]
    pub country: String,
    #[validate(length(min = 1, max = 20))]
    pub postal_code: String,
}

impl From<AddressRequest> for AddressFields {
    fn from(r: AddressRequest) -> Self {
        Self {
            name: r.name,
            street: r.street,
            district: r.district,
            city: r.city,
            state: r.state,
            country: r.country,
            postal_code: r.postal_code,
        }
    }
}

#[derive(Clone)]
pub struct AddressService {
    store: Arc<dyn Store>,
}

impl AddressService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// The first address a user adds becomes the default.
    pub async fn add_address(&self, user: &AuthedUser, request: AddressRequest) -> Result<Address> {
        validate(&request)?;
        let address = self
            .store
            .insert_address(Address::new(user.id, request.into()))
            .await?;
        tracing::info!(
            user_id = %user.id,
            address_id = %address.id,
            is_default = address.is_default,
            "Added address"
        );
        Ok(address)
    }

    pub async fn list_addresses(
        &self,
        user: &AuthedUser,
        page: PageRequest,
    ) -> Result<Page<Address>> {
        let (rows, total) = self.store.addresses(user.id, &page).await?;
        Ok(Page::new(rows, &page, total))
    }

    pub async fn address_by_id(&self, user: &AuthedUser, id: Uuid) -> Result<Address> {
        let address = self
            .store
            .address(id)
            .await?
            .ok_or(EcommerceError::AddressNotFound)?;
        if address.user_id != user.id {
            return Err(EcommerceError::NotOwner("address"));
        }
        Ok(address)
    }

    pub async fn update_address(
        &self,
        user: &AuthedUser,
        id: Uuid,
        request: AddressRequest,
    ) -> Result<Address> {
        validate(&request)?;
        let mut address = self.address_by_id(user, id).await?;
        address.apply(request.into());
        self.store.update_address(&address).await?;
        Ok(address)
    }

    /// Clearing the flag leaves the user without a default address.
    pub async fn set_default(
        &self,
        user: &AuthedUser,
        id: Uuid,
        is_default: bool,
    ) -> Result<Address> {
        let mut address = self.address_by_id(user, id).await?;
        self.store
            .set_default_address(user.id, id, is_default)
            .await?;
        address.is_default = is_default;
        tracing::info!(
            user_id = %user.id,
            address_id = %id,
            is_default,
            "Changed default address"
        );
        Ok(address)
    }

    pub async fn remove_address(&self, user: &AuthedUser, id: Uuid) -> Result<()> {
        let address = self.address_by_id(user, id).await?;
        self.store.delete_address(address.id).await?;
        tracing::info!(user_id = %user.id, address_id = %id, "Removed address");
        Ok(())
    }
}
