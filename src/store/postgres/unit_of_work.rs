use async_trait::async_trait;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use super::rows::{convert, CartItemRow, CartItemVariantRow, CartRow};
use super::{CART_COLUMNS, CART_ITEM_COLUMNS, CART_ITEM_VARIANT_COLUMNS};
use crate::domain::aggregates::{
    Cart, CartItem, CartItemVariant, OrderItem, OrderItemVariant, OrderStatus,
};
use crate::store::UnitOfWork;
use crate::Result;

pub(super) struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

impl PgUnitOfWork {
    pub(super) fn new(tx: Transaction<'static, Postgres>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn cart_for_user(&mut self, user_id: Uuid) -> Result<Option<Cart>> {
        let sql = format!(
            "SELECT {CART_COLUMNS} FROM carts \
             WHERE user_id = $1 AND cart_status = 'active' AND status = 'active' FOR UPDATE"
        );
        let row = sqlx::query_as::<_, CartRow>(&sql)
            .bind(user_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.map(Cart::try_from).transpose()
    }

    async fn cart_by_id(&mut self, id: Uuid) -> Result<Option<Cart>> {
        let sql = format!(
            "SELECT {CART_COLUMNS} FROM carts WHERE id = $1 AND status = 'active' FOR UPDATE"
        );
        let row = sqlx::query_as::<_, CartRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.map(Cart::try_from).transpose()
    }

    async fn cart_items(&mut self, cart_id: Uuid) -> Result<Vec<CartItem>> {
        let sql = format!(
            "SELECT {CART_ITEM_COLUMNS} FROM cart_items \
             WHERE cart_id = $1 AND status = 'active' ORDER BY id"
        );
        let rows = sqlx::query_as::<_, CartItemRow>(&sql)
            .bind(cart_id)
            .fetch_all(&mut *self.tx)
            .await?;
        convert(rows)
    }

    async fn cart_item_variants(&mut self, cart_item_id: Uuid) -> Result<Vec<CartItemVariant>> {
        let sql = format!(
            "SELECT {CART_ITEM_VARIANT_COLUMNS} FROM cart_item_variants \
             WHERE cart_item_id = $1 AND status = 'active' ORDER BY id"
        );
        let rows = sqlx::query_as::<_, CartItemVariantRow>(&sql)
            .bind(cart_item_id)
            .fetch_all(&mut *self.tx)
            .await?;
        convert(rows)
    }

    async fn insert_cart(&mut self, cart: &Cart) -> Result<()> {
        sqlx::query(
            "INSERT INTO carts \
             (id, user_id, total_amount, total_price, cart_status, status, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(cart.id)
        .bind(cart.user_id)
        .bind(cart.total_amount)
        .bind(cart.total_price)
        .bind(cart.cart_status.as_str())
        .bind(cart.status.as_str())
        .bind(cart.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn insert_cart_item(&mut self, item: &CartItem) -> Result<()> {
        sqlx::query(
            "INSERT INTO cart_items (id, cart_id, product_id, quantity, subtotal, status) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(item.id)
        .bind(item.cart_id)
        .bind(item.product_id)
        .bind(item.quantity)
        .bind(item.subtotal)
        .bind(item.status.as_str())
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn insert_cart_item_variant(&mut self, variant: &CartItemVariant) -> Result<()> {
        sqlx::query(
            "INSERT INTO cart_item_variants \
             (id, cart_item_id, variant_id, option_id, additional_price, status) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(variant.id)
        .bind(variant.cart_item_id)
        .bind(variant.variant_id)
        .bind(variant.option_id)
        .bind(variant.additional_price)
        .bind(variant.status.as_str())
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn update_cart_item(&mut self, item: &CartItem) -> Result<()> {
        sqlx::query("UPDATE cart_items SET quantity = $2, subtotal = $3 WHERE id = $1")
            .bind(item.id)
            .bind(item.quantity)
            .bind(item.subtotal)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn delete_cart_item(&mut self, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE cart_items SET status = 'deleted', deleted_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        sqlx::query(
            "UPDATE cart_item_variants SET status = 'deleted', deleted_at = NOW() \
             WHERE cart_item_id = $1 AND status = 'active'",
        )
        .bind(id)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn save_cart_totals(&mut self, cart: &Cart) -> Result<()> {
        sqlx::query(
            "UPDATE carts SET total_amount = $2, total_price = $3, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(cart.id)
        .bind(cart.total_amount)
        .bind(cart.total_price)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn checkout_cart(&mut self, id: Uuid) -> Result<bool> {
        let done = sqlx::query(
            "UPDATE carts SET cart_status = 'checkout', updated_at = NOW() \
             WHERE id = $1 AND cart_status = 'active' AND status = 'active'",
        )
        .bind(id)
        .execute(&mut *self.tx)
        .await?;
        Ok(done.rows_affected() == 1)
    }

    async fn insert_order_item(&mut self, item: &OrderItem) -> Result<()> {
        sqlx::query(
            "INSERT INTO order_items (id, order_id, product_id, cart_item_id, quantity, subtotal) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(item.id)
        .bind(item.order_id)
        .bind(item.product_id)
        .bind(item.cart_item_id)
        .bind(item.quantity)
        .bind(item.subtotal)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn insert_order_item_variant(&mut self, variant: &OrderItemVariant) -> Result<()> {
        sqlx::query(
            "INSERT INTO order_item_variants \
             (id, order_item_id, variant_id, option_id, additional_price) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(variant.id)
        .bind(variant.order_item_id)
        .bind(variant.variant_id)
        .bind(variant.option_id)
        .bind(variant.additional_price)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn set_order_status(&mut self, id: Uuid, status: OrderStatus) -> Result<()> {
        sqlx::query("UPDATE orders SET order_status = $2 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let this = *self;
        this.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        let this = *self;
        this.tx.rollback().await?;
        Ok(())
    }
}
