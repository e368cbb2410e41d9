//! Cart accumulator
//!
//! One active cart per user, created on the first add. Line subtotals are
//! always priced from the catalog, never from the client. Every mutation runs
//! in one unit of work with the cart row locked, and the cart totals are
//! written in the same transaction as the lines they summarize.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::aggregates::{AuthedUser, Cart, CartItem, CartItemVariant};
use crate::domain::pricing::{compute_subtotal, PromoFormula};
use crate::domain::value_objects::Quantity;
use crate::service::catalog::{CatalogService, ChosenOption, PricedProduct, ProductView};
use crate::store::Store;
use crate::{EcommerceError, Result};

#[derive(Clone, Debug, Deserialize)]
pub struct VariantPick {
    pub variant_id: Uuid,
    pub variant_option_id: Uuid,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CartItemAddRequest {
    pub product_id: Uuid,
    #[serde(default)]
    pub variants: Vec<VariantPick>,
    #[serde(default)]
    pub quantity: i32,
}

#[derive(Clone, Copy, Debug)]
pub struct CartItemUpdate {
    pub cart_item_id: Uuid,
    pub quantity: i32,
}

#[derive(Clone, Debug, Serialize)]
pub struct CartItemView {
    #[serde(flatten)]
    pub item: CartItem,
    pub product: Option<ProductView>,
    pub variants: Vec<ChosenOption>,
}

#[derive(Clone, Debug, Serialize)]
pub struct CartView {
    #[serde(flatten)]
    pub cart: Cart,
    pub items: Vec<CartItemView>,
}

fn ensure_writable(cart: &Cart, user: &AuthedUser) -> Result<()> {
    if cart.user_id != user.id {
        return Err(EcommerceError::NotOwner("cart"));
    }
    if !cart.is_open() {
        return Err(EcommerceError::CartCheckedOut);
    }
    Ok(())
}

fn quantity(raw: i32) -> Result<Quantity> {
    Quantity::requested(raw).map_err(|_| EcommerceError::InvalidQuantity)
}

#[derive(Clone)]
pub struct CartService {
    store: Arc<dyn Store>,
    catalog: CatalogService,
    formula: PromoFormula,
}

impl CartService {
    pub fn new(store: Arc<dyn Store>, catalog: CatalogService, formula: PromoFormula) -> Self {
        Self {
            store,
            catalog,
            formula,
        }
    }

    fn subtotal(&self, priced: &PricedProduct, additional: Decimal, quantity: Quantity) -> Decimal {
        compute_subtotal(
            priced.unit_price(),
            additional,
            Decimal::ZERO,
            priced.promo_pct(),
            quantity.value(),
            self.formula,
        )
    }

    pub async fn add_product_to_cart(
        &self,
        user: &AuthedUser,
        request: CartItemAddRequest,
    ) -> Result<Cart> {
        let quantity = quantity(request.quantity)?;
        let priced = self
            .catalog
            .priced_product(request.product_id, Utc::now().date_naive())
            .await?;

        let mut picks = Vec::new();
        if priced.product.has_variant {
            for pick in &request.variants {
                let option = self
                    .catalog
                    .resolve_option(&priced.product, pick.variant_id, pick.variant_option_id)
                    .await?;
                picks.push((pick.variant_id, option));
            }
        }
        let additional: Decimal = picks.iter().map(|(_, o)| o.additional_price).sum();
        let subtotal = self.subtotal(&priced, additional, quantity);

        let mut uow = self.store.begin().await?;
        let mut cart = match uow.cart_for_user(user.id).await? {
            Some(cart) => cart,
            None => {
                let cart = Cart::new(user.id);
                uow.insert_cart(&cart).await?;
                tracing::info!(user_id = %user.id, cart_id = %cart.id, "Created cart");
                cart
            }
        };

        let item = CartItem::new(cart.id, priced.product.id, quantity, subtotal);
        uow.insert_cart_item(&item).await?;
        for (variant_id, option) in &picks {
            let picked =
                CartItemVariant::new(item.id, *variant_id, option.id, option.additional_price);
            uow.insert_cart_item_variant(&picked).await?;
        }
        cart.accumulate(item.quantity, item.subtotal)?;
        uow.save_cart_totals(&cart).await?;
        uow.commit().await?;

        tracing::info!(
            user_id = %user.id,
            cart_id = %cart.id,
            product_id = %item.product_id,
            quantity = item.quantity,
            subtotal = %item.subtotal,
            "Added product to cart"
        );
        Ok(cart)
    }

    /// Sets a new quantity and reprices the line from the current catalog and
    /// the surcharges captured when its options were picked.
    pub async fn update_item_in_cart(
        &self,
        user: &AuthedUser,
        update: CartItemUpdate,
    ) -> Result<Cart> {
        let quantity = quantity(update.quantity)?;
        let item = self
            .store
            .cart_item(update.cart_item_id)
            .await?
            .ok_or(EcommerceError::CartItemNotFound)?;
        let cart = self
            .store
            .cart(item.cart_id)
            .await?
            .ok_or(EcommerceError::CartNotFound)?;
        ensure_writable(&cart, user)?;

        let priced = self
            .catalog
            .priced_product(item.product_id, Utc::now().date_naive())
            .await?;
        let additional: Decimal = self
            .store
            .cart_item_variants(item.id)
            .await?
            .iter()
            .map(|v| v.additional_price)
            .sum();
        let subtotal = self.subtotal(&priced, additional, quantity);

        let mut uow = self.store.begin().await?;
        let mut cart = uow
            .cart_by_id(cart.id)
            .await?
            .ok_or(EcommerceError::CartNotFound)?;
        ensure_writable(&cart, user)?;
        let mut items = uow.cart_items(cart.id).await?;
        let line = items
            .iter_mut()
            .find(|i| i.id == item.id)
            .ok_or(EcommerceError::CartItemNotFound)?;
        line.quantity = quantity.value();
        line.subtotal = subtotal;
        uow.update_cart_item(line).await?;
        cart.reconcile(&items)?;
        uow.save_cart_totals(&cart).await?;
        uow.commit().await?;

        tracing::info!(
            user_id = %user.id,
            cart_id = %cart.id,
            cart_item_id = %item.id,
            quantity = quantity.value(),
            total_price = %cart.total_price,
            "Updated cart item"
        );
        Ok(cart)
    }

    pub async fn delete_item_in_cart(&self, user: &AuthedUser, cart_item_id: Uuid) -> Result<Cart> {
        let item = self
            .store
            .cart_item(cart_item_id)
            .await?
            .ok_or(EcommerceError::CartItemNotFound)?;
        let cart = self
            .store
            .cart(item.cart_id)
            .await?
            .ok_or(EcommerceError::CartNotFound)?;
        ensure_writable(&cart, user)?;

        let mut uow = self.store.begin().await?;
        let mut cart = uow
            .cart_by_id(cart.id)
            .await?
            .ok_or(EcommerceError::CartNotFound)?;
        ensure_writable(&cart, user)?;
        uow.delete_cart_item(item.id).await?;
        let items = uow.cart_items(cart.id).await?;
        cart.reconcile(&items)?;
        uow.save_cart_totals(&cart).await?;
        uow.commit().await?;

        tracing::info!(
            user_id = %user.id,
            cart_id = %cart.id,
            cart_item_id = %item.id,
            "Removed cart item"
        );
        Ok(cart)
    }

    pub async fn cart_by_user(&self, user: &AuthedUser) -> Result<Option<CartView>> {
        let Some(cart) = self.store.active_cart(user.id).await? else {
            return Ok(None);
        };
        let mut items = Vec::new();
        for item in self.store.cart_items(cart.id).await? {
            let product = self
                .store
                .product(item.product_id)
                .await?
                .map(ProductView::from);
            let mut variants = Vec::new();
            for picked in self.store.cart_item_variants(item.id).await? {
                let chosen = self
                    .catalog
                    .chosen_option(picked.variant_id, picked.option_id, picked.additional_price)
                    .await?;
                variants.push(chosen);
            }
            items.push(CartItemView {
                item,
                product,
                variants,
            });
        }
        Ok(Some(CartView { cart, items }))
    }
}
