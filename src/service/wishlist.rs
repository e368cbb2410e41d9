//! Wishlist manager

use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::aggregates::{AuthedUser, Wishlist};
use crate::domain::value_objects::{Page, PageRequest};
use crate::service::catalog::ProductView;
use crate::store::Store;
use crate::{EcommerceError, Result};

#[derive(Clone, Debug, Serialize)]
pub struct WishlistView {
    #[serde(flatten)]
    pub entry: Wishlist,
    pub product: ProductView,
}

#[derive(Clone)]
pub struct WishlistService {
    store: Arc<dyn Store>,
}

impl WishlistService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Adding a product that is already listed returns the existing entry.
    pub async fn add_to_wishlist(&self, user: &AuthedUser, product_id: Uuid) -> Result<Wishlist> {
        self.store
            .product(product_id)
            .await?
            .ok_or(EcommerceError::ProductNotFound)?;
        if let Some(existing) = self
            .store
            .wishlist_entry_for(user.id, product_id)
            .await?
        {
            return Ok(existing);
        }
        let entry = Wishlist::new(user.id, product_id);
        self.store.insert_wishlist(&entry).await?;
        tracing::info!(user_id = %user.id, product_id = %product_id, "Added to wishlist");
        Ok(entry)
    }

    /// Entries whose product is gone are left out of the page.
    pub async fn wishlist(
        &self,
        user: &AuthedUser,
        page: PageRequest,
    ) -> Result<Page<WishlistView>> {
        let (entries, total) = self.store.wishlists(user.id, &page).await?;
        let mut items = Vec::with_capacity(entries.len());
        for entry in entries {
            match self.store.product(entry.product_id).await? {
                Some(product) => items.push(WishlistView {
                    entry,
                    product: product.into(),
                }),
                None => tracing::warn!(
                    wishlist_id = %entry.id,
                    product_id = %entry.product_id,
                    "Wishlist product missing"
                ),
            }
        }
        Ok(Page::new(items, &page, total))
    }

    pub async fn remove_from_wishlist(&self, user: &AuthedUser, id: Uuid) -> Result<()> {
        let entry = self
            .store
            .wishlist_entry(id)
            .await?
            .ok_or(EcommerceError::WishlistNotFound)?;
        if entry.user_id != user.id {
            return Err(EcommerceError::NotOwner("wishlist entry"));
        }
        self.store.delete_wishlist(entry.id).await?;
        Ok(())
    }
}
