use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

use super::fault::{FaultInjector, FaultPoint};
use super::Tables;
use crate::domain::aggregates::{
    Cart, CartItem, CartItemVariant, CartStatus, OrderItem, OrderItemVariant, OrderStatus,
};
use crate::domain::value_objects::RecordStatus;
use crate::store::UnitOfWork;
use crate::{EcommerceError, Result};

pub(super) struct MemoryUnitOfWork {
    tables: OwnedMutexGuard<Tables>,
    // restored on drop unless committed
    snapshot: Option<Tables>,
    faults: Arc<FaultInjector>,
}

impl MemoryUnitOfWork {
    pub(super) fn new(tables: OwnedMutexGuard<Tables>, faults: Arc<FaultInjector>) -> Self {
        let snapshot = Some((*tables).clone());
        Self {
            tables,
            snapshot,
            faults,
        }
    }
}

impl Drop for MemoryUnitOfWork {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            *self.tables = snapshot;
        }
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn cart_for_user(&mut self, user_id: Uuid) -> Result<Option<Cart>> {
        Ok(self.tables.open_cart_for(user_id))
    }

    async fn cart_by_id(&mut self, id: Uuid) -> Result<Option<Cart>> {
        Ok(self.tables.live_cart(id))
    }

    async fn cart_items(&mut self, cart_id: Uuid) -> Result<Vec<CartItem>> {
        Ok(self.tables.active_cart_items(cart_id))
    }

    async fn cart_item_variants(&mut self, cart_item_id: Uuid) -> Result<Vec<CartItemVariant>> {
        Ok(self.tables.active_cart_item_variants(cart_item_id))
    }

    async fn insert_cart(&mut self, cart: &Cart) -> Result<()> {
        self.faults.check(FaultPoint::InsertCart)?;
        if cart.is_open() && self.tables.open_cart_for(cart.user_id).is_some() {
            return Err(EcommerceError::Storage(format!(
                "user {} already has an active cart",
                cart.user_id
            )));
        }
        self.tables.carts.insert(cart.id, cart.clone());
        Ok(())
    }

    async fn insert_cart_item(&mut self, item: &CartItem) -> Result<()> {
        self.faults.check(FaultPoint::InsertCartItem)?;
        self.tables.cart_items.insert(item.id, item.clone());
        Ok(())
    }

    async fn insert_cart_item_variant(&mut self, variant: &CartItemVariant) -> Result<()> {
        self.faults.check(FaultPoint::InsertCartItemVariant)?;
        self.tables
            .cart_item_variants
            .insert(variant.id, variant.clone());
        Ok(())
    }

    async fn update_cart_item(&mut self, item: &CartItem) -> Result<()> {
        self.faults.check(FaultPoint::UpdateCartItem)?;
        let row = self
            .tables
            .cart_items
            .get_mut(&item.id)
            .ok_or(EcommerceError::CartItemNotFound)?;
        row.quantity = item.quantity;
        row.subtotal = item.subtotal;
        Ok(())
    }

    async fn delete_cart_item(&mut self, id: Uuid) -> Result<()> {
        let row = self
            .tables
            .cart_items
            .get_mut(&id)
            .ok_or(EcommerceError::CartItemNotFound)?;
        row.status = RecordStatus::Deleted;
        for v in self
            .tables
            .cart_item_variants
            .values_mut()
            .filter(|v| v.cart_item_id == id)
        {
            v.status = RecordStatus::Deleted;
        }
        Ok(())
    }

    async fn save_cart_totals(&mut self, cart: &Cart) -> Result<()> {
        self.faults.check(FaultPoint::SaveCartTotals)?;
        let row = self
            .tables
            .carts
            .get_mut(&cart.id)
            .ok_or(EcommerceError::CartNotFound)?;
        row.total_amount = cart.total_amount;
        row.total_price = cart.total_price;
        row.updated_at = Some(Utc::now());
        Ok(())
    }

    async fn checkout_cart(&mut self, id: Uuid) -> Result<bool> {
        self.faults.check(FaultPoint::CheckoutCart)?;
        match self.tables.carts.get_mut(&id) {
            Some(cart) if cart.is_open() => {
                cart.cart_status = CartStatus::Checkout;
                cart.updated_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn insert_order_item(&mut self, item: &OrderItem) -> Result<()> {
        self.faults.check(FaultPoint::InsertOrderItem)?;
        self.tables.order_items.insert(item.id, item.clone());
        Ok(())
    }

    async fn insert_order_item_variant(&mut self, variant: &OrderItemVariant) -> Result<()> {
        self.faults.check(FaultPoint::InsertOrderItemVariant)?;
        self.tables
            .order_item_variants
            .insert(variant.id, variant.clone());
        Ok(())
    }

    async fn set_order_status(&mut self, id: Uuid, status: OrderStatus) -> Result<()> {
        self.faults.check(FaultPoint::SetOrderStatus)?;
        self.tables.stamp_order(id, status)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let mut this = self;
        this.snapshot = None;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        drop(self);
        Ok(())
    }
}
