//! PostgreSQL store on a sqlx pool

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::aggregates::{
    Address, Cart, CartItem, CartItemVariant, Category, LoginId, Order, OrderItem,
    OrderItemVariant, OrderStatus, Placement, Product, ProductFilter, Recommendation, User,
    Variant, VariantOption, VariantWithOptions, WeeklyPromo, Wishlist,
};
use crate::domain::value_objects::PageRequest;
use crate::store::{
    AddressRepo, CartRepo, CatalogRepo, OrderRepo, Paged, Store, UnitOfWork, UserRepo,
    WishlistRepo,
};
use crate::{EcommerceError, Result};

mod rows;
mod unit_of_work;

use rows::*;
use unit_of_work::PgUnitOfWork;

const PRODUCT_COLUMNS: &str = "id, category_id, name, description, price, discount, photo_url, \
     has_variant, rating, total_stock, status, created_at";
const PROMO_COLUMNS: &str = "id, product_id, promo_discount, start_date, end_date, status";
pub(super) const CART_COLUMNS: &str =
    "id, user_id, total_amount, total_price, cart_status, status, created_at, updated_at";
pub(super) const CART_ITEM_COLUMNS: &str = "id, cart_id, product_id, quantity, subtotal, status";
pub(super) const CART_ITEM_VARIANT_COLUMNS: &str =
    "id, cart_item_id, variant_id, option_id, additional_price, status";
const ORDER_COLUMNS: &str = "id, user_id, cart_id, address_id, shipping_type, shipping_cost, \
     payment_method, total_amount, total_price, order_status, created_at";
const ADDRESS_COLUMNS: &str = "id, user_id, name, is_default, street, district, city, state, \
     country, postal_code, status, created_at";
const WISHLIST_COLUMNS: &str = "id, user_id, product_id, status, created_at";
const USER_COLUMNS: &str = "id, name, email, phone_number, password_hash, status, created_at";

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogRepo for PgStore {
    async fn product(&self, id: Uuid) -> Result<Option<Product>> {
        let sql =
            format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 AND status = 'active'");
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Product::try_from).transpose()
    }

    async fn product_including_deleted(&self, id: Uuid) -> Result<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Product::try_from).transpose()
    }

    async fn variants_with_options(&self, product_id: Uuid) -> Result<Vec<VariantWithOptions>> {
        let variants: Vec<Variant> = convert(
            sqlx::query_as::<_, VariantRow>(
                "SELECT id, product_id, attribute_name, status FROM variations \
                 WHERE product_id = $1 AND status = 'active' ORDER BY id",
            )
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?,
        )?;
        let ids: Vec<Uuid> = variants.iter().map(|v| v.id).collect();
        let options: Vec<VariantOption> = convert(
            sqlx::query_as::<_, VariantOptionRow>(
                "SELECT id, variant_id, option_value, additional_price, stock, status \
                 FROM variation_options \
                 WHERE variant_id = ANY($1) AND status = 'active' ORDER BY id",
            )
            .bind(&ids)
            .fetch_all(&self.pool)
            .await?,
        )?;
        Ok(variants
            .into_iter()
            .map(|variant| {
                let options = options
                    .iter()
                    .filter(|o| o.variant_id == variant.id)
                    .cloned()
                    .collect();
                VariantWithOptions { variant, options }
            })
            .collect())
    }

    async fn variant(&self, id: Uuid) -> Result<Option<Variant>> {
        let row = sqlx::query_as::<_, VariantRow>(
            "SELECT id, product_id, attribute_name, status FROM variations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Variant::try_from).transpose()
    }

    async fn variant_option(&self, id: Uuid) -> Result<Option<VariantOption>> {
        let row = sqlx::query_as::<_, VariantOptionRow>(
            "SELECT id, variant_id, option_value, additional_price, stock, status \
             FROM variation_options WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(VariantOption::try_from).transpose()
    }

    async fn active_promo(&self, product_id: Uuid, day: NaiveDate) -> Result<Option<WeeklyPromo>> {
        let sql = format!(
            "SELECT {PROMO_COLUMNS} FROM weekly_promos \
             WHERE product_id = $1 AND status = 'active' AND start_date <= $2 AND end_date >= $2 \
             ORDER BY start_date DESC, id DESC LIMIT 1"
        );
        let row = sqlx::query_as::<_, PromoRow>(&sql)
            .bind(product_id)
            .bind(day)
            .fetch_optional(&self.pool)
            .await?;
        row.map(WeeklyPromo::try_from).transpose()
    }

    async fn list_products(
        &self,
        filter: &ProductFilter,
        page: &PageRequest,
    ) -> Result<Paged<Product>> {
        const FILTER: &str = "status = 'active' \
             AND ($1::uuid IS NULL OR category_id = $1) \
             AND ($2::text IS NULL OR name ILIKE '%' || $2 || '%')";
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE {FILTER} \
             ORDER BY created_at DESC, id DESC LIMIT $3 OFFSET $4"
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(filter.category_id)
            .bind(filter.name.as_deref())
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;
        let total: (i64,) =
            sqlx::query_as(&format!("SELECT COUNT(*) FROM products WHERE {FILTER}"))
                .bind(filter.category_id)
                .bind(filter.name.as_deref())
                .fetch_one(&self.pool)
                .await?;
        Ok((convert(rows)?, total.0))
    }

    async fn list_active_promos(
        &self,
        day: NaiveDate,
        page: &PageRequest,
    ) -> Result<Paged<WeeklyPromo>> {
        const FILTER: &str = "w.status = 'active' AND w.start_date <= $1 AND w.end_date >= $1 \
             AND p.status = 'active'";
        let sql = format!(
            "SELECT w.id, w.product_id, w.promo_discount, w.start_date, w.end_date, w.status \
             FROM weekly_promos w JOIN products p ON p.id = w.product_id \
             WHERE {FILTER} ORDER BY w.id LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query_as::<_, PromoRow>(&sql)
            .bind(day)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;
        let total: (i64,) = sqlx::query_as(&format!(
            "SELECT COUNT(*) FROM weekly_promos w JOIN products p ON p.id = w.product_id \
             WHERE {FILTER}"
        ))
        .bind(day)
        .fetch_one(&self.pool)
        .await?;
        Ok((convert(rows)?, total.0))
    }

    async fn list_categories(&self, page: &PageRequest) -> Result<Paged<Category>> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, description, status FROM categories WHERE status = 'active' \
             ORDER BY name LIMIT $1 OFFSET $2",
        )
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;
        let total: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM categories WHERE status = 'active'")
                .fetch_one(&self.pool)
                .await?;
        Ok((convert(rows)?, total.0))
    }

    async fn list_recommendations(
        &self,
        placement: Placement,
        page: &PageRequest,
    ) -> Result<Paged<Recommendation>> {
        let flag = match placement {
            Placement::Recommended => "r.is_recommended",
            Placement::Banner => "r.set_in_banner",
        };
        let filter = format!("{flag} AND r.status = 'active' AND p.status = 'active'");
        let sql = format!(
            "SELECT r.id, r.product_id, r.title, r.subtitle, r.photo_url, r.is_recommended, \
             r.set_in_banner, r.status \
             FROM recommendations r JOIN products p ON p.id = r.product_id \
             WHERE {filter} ORDER BY r.id LIMIT $1 OFFSET $2"
        );
        let rows = sqlx::query_as::<_, RecommendationRow>(&sql)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;
        let total: (i64,) = sqlx::query_as(&format!(
            "SELECT COUNT(*) FROM recommendations r JOIN products p ON p.id = r.product_id \
             WHERE {filter}"
        ))
        .fetch_one(&self.pool)
        .await?;
        Ok((convert(rows)?, total.0))
    }

    async fn order_line_counts(&self, product_ids: &[Uuid]) -> Result<HashMap<Uuid, i64>> {
        let rows: Vec<(Uuid, i64)> = sqlx::query_as(
            "SELECT product_id, COUNT(*) FROM order_items \
             WHERE product_id = ANY($1) GROUP BY product_id",
        )
        .bind(product_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().collect())
    }
}

#[async_trait]
impl CartRepo for PgStore {
    async fn active_cart(&self, user_id: Uuid) -> Result<Option<Cart>> {
        let sql = format!(
            "SELECT {CART_COLUMNS} FROM carts \
             WHERE user_id = $1 AND cart_status = 'active' AND status = 'active'"
        );
        let row = sqlx::query_as::<_, CartRow>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Cart::try_from).transpose()
    }

    async fn cart(&self, id: Uuid) -> Result<Option<Cart>> {
        let sql = format!("SELECT {CART_COLUMNS} FROM carts WHERE id = $1 AND status = 'active'");
        let row = sqlx::query_as::<_, CartRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Cart::try_from).transpose()
    }

    async fn cart_item(&self, id: Uuid) -> Result<Option<CartItem>> {
        let sql = format!(
            "SELECT {CART_ITEM_COLUMNS} FROM cart_items WHERE id = $1 AND status = 'active'"
        );
        let row = sqlx::query_as::<_, CartItemRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(CartItem::try_from).transpose()
    }

    async fn cart_items(&self, cart_id: Uuid) -> Result<Vec<CartItem>> {
        let sql = format!(
            "SELECT {CART_ITEM_COLUMNS} FROM cart_items \
             WHERE cart_id = $1 AND status = 'active' ORDER BY id"
        );
        let rows = sqlx::query_as::<_, CartItemRow>(&sql)
            .bind(cart_id)
            .fetch_all(&self.pool)
            .await?;
        convert(rows)
    }

    async fn cart_item_variants(&self, cart_item_id: Uuid) -> Result<Vec<CartItemVariant>> {
        let sql = format!(
            "SELECT {CART_ITEM_VARIANT_COLUMNS} FROM cart_item_variants \
             WHERE cart_item_id = $1 AND status = 'active' ORDER BY id"
        );
        let rows = sqlx::query_as::<_, CartItemVariantRow>(&sql)
            .bind(cart_item_id)
            .fetch_all(&self.pool)
            .await?;
        convert(rows)
    }
}

#[async_trait]
impl OrderRepo for PgStore {
    async fn insert_order(&self, order: &Order) -> Result<()> {
        sqlx::query(
            "INSERT INTO orders (id, user_id, cart_id, address_id, shipping_type, shipping_cost, \
             payment_method, total_amount, total_price, order_status, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(order.id)
        .bind(order.user_id)
        .bind(order.cart_id)
        .bind(order.address_id)
        .bind(&order.shipping_type)
        .bind(order.shipping_cost)
        .bind(&order.payment_method)
        .bind(order.total_amount)
        .bind(order.total_price)
        .bind(order.order_status.as_str())
        .bind(order.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_order_status(&self, id: Uuid, status: OrderStatus) -> Result<()> {
        sqlx::query("UPDATE orders SET order_status = $2 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn order(&self, id: Uuid) -> Result<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Order::try_from).transpose()
    }

    async fn orders_by_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        convert(rows)
    }

    async fn order_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>> {
        let rows = sqlx::query_as::<_, OrderItemRow>(
            "SELECT id, order_id, product_id, quantity, subtotal, cart_item_id FROM order_items \
             WHERE order_id = $1 ORDER BY id",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(OrderItem::from).collect())
    }

    async fn order_item_variants(&self, order_item_id: Uuid) -> Result<Vec<OrderItemVariant>> {
        let rows = sqlx::query_as::<_, OrderItemVariantRow>(
            "SELECT id, order_item_id, variant_id, option_id, additional_price \
             FROM order_item_variants WHERE order_item_id = $1 ORDER BY id",
        )
        .bind(order_item_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(OrderItemVariant::from).collect())
    }
}

#[async_trait]
impl AddressRepo for PgStore {
    async fn insert_address(&self, mut address: Address) -> Result<Address> {
        let mut tx = self.pool.begin().await?;
        // serializes concurrent first inserts for one user
        sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(address.user_id)
            .fetch_optional(&mut *tx)
            .await?;
        let has_other: (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM addresses WHERE user_id = $1 AND status = 'active')",
        )
        .bind(address.user_id)
        .fetch_one(&mut *tx)
        .await?;
        address.is_default = !has_other.0;
        sqlx::query(
            "INSERT INTO addresses (id, user_id, name, is_default, street, district, city, \
             state, country, postal_code, status, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(address.id)
        .bind(address.user_id)
        .bind(&address.name)
        .bind(address.is_default)
        .bind(&address.street)
        .bind(&address.district)
        .bind(&address.city)
        .bind(&address.state)
        .bind(&address.country)
        .bind(&address.postal_code)
        .bind(address.status.as_str())
        .bind(address.created_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(address)
    }

    async fn address(&self, id: Uuid) -> Result<Option<Address>> {
        let sql =
            format!("SELECT {ADDRESS_COLUMNS} FROM addresses WHERE id = $1 AND status = 'active'");
        let row = sqlx::query_as::<_, AddressRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Address::try_from).transpose()
    }

    async fn addresses(&self, user_id: Uuid, page: &PageRequest) -> Result<Paged<Address>> {
        let sql = format!(
            "SELECT {ADDRESS_COLUMNS} FROM addresses WHERE user_id = $1 AND status = 'active' \
             ORDER BY is_default DESC, id LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query_as::<_, AddressRow>(&sql)
            .bind(user_id)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;
        let total: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM addresses WHERE user_id = $1 AND status = 'active'",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok((convert(rows)?, total.0))
    }

    async fn update_address(&self, address: &Address) -> Result<()> {
        let done = sqlx::query(
            "UPDATE addresses SET name = $2, street = $3, district = $4, city = $5, state = $6, \
             country = $7, postal_code = $8 WHERE id = $1 AND status = 'active'",
        )
        .bind(address.id)
        .bind(&address.name)
        .bind(&address.street)
        .bind(&address.district)
        .bind(&address.city)
        .bind(&address.state)
        .bind(&address.country)
        .bind(&address.postal_code)
        .execute(&self.pool)
        .await?;
        if done.rows_affected() == 0 {
            return Err(EcommerceError::AddressNotFound);
        }
        Ok(())
    }

    async fn set_default_address(&self, user_id: Uuid, id: Uuid, is_default: bool) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let target: Option<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM addresses \
             WHERE id = $1 AND user_id = $2 AND status = 'active' FOR UPDATE",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;
        if target.is_none() {
            return Err(EcommerceError::AddressNotFound);
        }
        if is_default {
            sqlx::query(
                "UPDATE addresses SET is_default = FALSE \
                 WHERE user_id = $1 AND is_default AND id <> $2",
            )
            .bind(user_id)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }
        sqlx::query("UPDATE addresses SET is_default = $2 WHERE id = $1")
            .bind(id)
            .bind(is_default)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete_address(&self, id: Uuid) -> Result<()> {
        sqlx::query(
            "UPDATE addresses SET status = 'deleted', is_default = FALSE, deleted_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl WishlistRepo for PgStore {
    async fn wishlist_entry(&self, id: Uuid) -> Result<Option<Wishlist>> {
        let sql = format!(
            "SELECT {WISHLIST_COLUMNS} FROM wishlists WHERE id = $1 AND status = 'active'"
        );
        let row = sqlx::query_as::<_, WishlistRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Wishlist::try_from).transpose()
    }

    async fn wishlist_entry_for(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<Wishlist>> {
        let sql = format!(
            "SELECT {WISHLIST_COLUMNS} FROM wishlists \
             WHERE user_id = $1 AND product_id = $2 AND status = 'active'"
        );
        let row = sqlx::query_as::<_, WishlistRow>(&sql)
            .bind(user_id)
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Wishlist::try_from).transpose()
    }

    async fn insert_wishlist(&self, entry: &Wishlist) -> Result<()> {
        sqlx::query(
            "INSERT INTO wishlists (id, user_id, product_id, status, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(entry.id)
        .bind(entry.user_id)
        .bind(entry.product_id)
        .bind(entry.status.as_str())
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn wishlists(&self, user_id: Uuid, page: &PageRequest) -> Result<Paged<Wishlist>> {
        let sql = format!(
            "SELECT {WISHLIST_COLUMNS} FROM wishlists WHERE user_id = $1 AND status = 'active' \
             ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query_as::<_, WishlistRow>(&sql)
            .bind(user_id)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;
        let total: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM wishlists WHERE user_id = $1 AND status = 'active'",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok((convert(rows)?, total.0))
    }

    async fn delete_wishlist(&self, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE wishlists SET status = 'deleted', deleted_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl UserRepo for PgStore {
    async fn insert_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            "INSERT INTO users (id, name, email, phone_number, password_hash, status, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone_number)
        .bind(&user.password_hash)
        .bind(user.status.as_str())
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                EcommerceError::DuplicateUser
            } else {
                e.into()
            }
        })?;
        Ok(())
    }

    async fn user_by_login(&self, login: &LoginId) -> Result<Option<User>> {
        let (column, value) = match login {
            LoginId::Email(e) => ("email", e),
            LoginId::Phone(p) => ("phone_number", p),
        };
        let sql =
            format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = $1 AND status = 'active'");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        Ok(Box::new(PgUnitOfWork::new(self.pool.begin().await?)))
    }
}
