//! Persistence seams
//!
//! Repository traits grouped per aggregate, a `Store` combining them, and a
//! `UnitOfWork` for the multi-row writes of the cart and order pipelines.
//! Plain repository calls each run on their own; everything that has to land
//! together goes through `Store::begin`.
//!
//! Lookups return `Ok(None)` for rows that are missing or soft-deleted.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::aggregates::{
    Address, Cart, CartItem, CartItemVariant, Category, LoginId, Order, OrderItem,
    OrderItemVariant, OrderStatus, Placement, Product, ProductFilter, Recommendation, User,
    Variant, VariantOption, VariantWithOptions, WeeklyPromo, Wishlist,
};
use crate::domain::value_objects::PageRequest;
use crate::Result;

pub mod memory;
pub mod postgres;

pub use memory::{FaultPoint, MemoryStore};
pub use postgres::PgStore;

/// A page of rows plus the total row count of the unpaginated query
pub type Paged<T> = (Vec<T>, i64);

// shared across awaits by the services, hence `Sync + Send`
#[async_trait]
pub trait CatalogRepo: Sync + Send {
    async fn product(&self, id: Uuid) -> Result<Option<Product>>;
    /// Also returns soft-deleted products, for order history
    async fn product_including_deleted(&self, id: Uuid) -> Result<Option<Product>>;
    async fn variants_with_options(&self, product_id: Uuid) -> Result<Vec<VariantWithOptions>>;
    async fn variant(&self, id: Uuid) -> Result<Option<Variant>>;
    async fn variant_option(&self, id: Uuid) -> Result<Option<VariantOption>>;
    /// Promo whose window contains `day`; the most recently started one wins
    async fn active_promo(&self, product_id: Uuid, day: NaiveDate) -> Result<Option<WeeklyPromo>>;
    async fn list_products(
        &self,
        filter: &ProductFilter,
        page: &PageRequest,
    ) -> Result<Paged<Product>>;
    async fn list_active_promos(
        &self,
        day: NaiveDate,
        page: &PageRequest,
    ) -> Result<Paged<WeeklyPromo>>;
    async fn list_categories(&self, page: &PageRequest) -> Result<Paged<Category>>;
    /// Recommendations for the placement whose product is still active
    async fn list_recommendations(
        &self,
        placement: Placement,
        page: &PageRequest,
    ) -> Result<Paged<Recommendation>>;
    /// Number of order lines per product; products never ordered are absent
    async fn order_line_counts(&self, product_ids: &[Uuid]) -> Result<HashMap<Uuid, i64>>;
}

#[async_trait]
pub trait CartRepo: Sync + Send {
    async fn active_cart(&self, user_id: Uuid) -> Result<Option<Cart>>;
    async fn cart(&self, id: Uuid) -> Result<Option<Cart>>;
    async fn cart_item(&self, id: Uuid) -> Result<Option<CartItem>>;
    async fn cart_items(&self, cart_id: Uuid) -> Result<Vec<CartItem>>;
    async fn cart_item_variants(&self, cart_item_id: Uuid) -> Result<Vec<CartItemVariant>>;
}

#[async_trait]
pub trait OrderRepo: Sync + Send {
    async fn insert_order(&self, order: &Order) -> Result<()>;
    async fn set_order_status(&self, id: Uuid, status: OrderStatus) -> Result<()>;
    async fn order(&self, id: Uuid) -> Result<Option<Order>>;
    async fn orders_by_user(&self, user_id: Uuid) -> Result<Vec<Order>>;
    async fn order_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>>;
    async fn order_item_variants(&self, order_item_id: Uuid) -> Result<Vec<OrderItemVariant>>;
}

#[async_trait]
pub trait AddressRepo: Sync + Send {
    /// Inserts the address, flagging it default when the user has no other
    /// active address. Returns the row as stored.
    async fn insert_address(&self, address: Address) -> Result<Address>;
    async fn address(&self, id: Uuid) -> Result<Option<Address>>;
    async fn addresses(&self, user_id: Uuid, page: &PageRequest) -> Result<Paged<Address>>;
    async fn update_address(&self, address: &Address) -> Result<()>;
    /// Clears the user's current default before setting the new flag, atomically
    async fn set_default_address(&self, user_id: Uuid, id: Uuid, is_default: bool) -> Result<()>;
    async fn delete_address(&self, id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait WishlistRepo: Sync + Send {
    async fn wishlist_entry(&self, id: Uuid) -> Result<Option<Wishlist>>;
    async fn wishlist_entry_for(&self, user_id: Uuid, product_id: Uuid) -> Result<Option<Wishlist>>;
    async fn insert_wishlist(&self, entry: &Wishlist) -> Result<()>;
    async fn wishlists(&self, user_id: Uuid, page: &PageRequest) -> Result<Paged<Wishlist>>;
    async fn delete_wishlist(&self, id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait UserRepo: Sync + Send {
    /// Fails with `DuplicateUser` when the email or phone number is taken
    async fn insert_user(&self, user: &User) -> Result<()>;
    async fn user_by_login(&self, login: &LoginId) -> Result<Option<User>>;
}

#[async_trait]
pub trait Store: CatalogRepo + CartRepo + OrderRepo + AddressRepo + WishlistRepo + UserRepo {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>>;
}

/// One open transaction. Dropping it without `commit` discards every write.
///
/// Cart reads through a unit of work lock the cart until the transaction
/// ends, so concurrent writers to the same cart serialize.
#[async_trait]
pub trait UnitOfWork: Send {
    async fn cart_for_user(&mut self, user_id: Uuid) -> Result<Option<Cart>>;
    async fn cart_by_id(&mut self, id: Uuid) -> Result<Option<Cart>>;
    async fn cart_items(&mut self, cart_id: Uuid) -> Result<Vec<CartItem>>;
    async fn cart_item_variants(&mut self, cart_item_id: Uuid) -> Result<Vec<CartItemVariant>>;

    async fn insert_cart(&mut self, cart: &Cart) -> Result<()>;
    async fn insert_cart_item(&mut self, item: &CartItem) -> Result<()>;
    async fn insert_cart_item_variant(&mut self, variant: &CartItemVariant) -> Result<()>;
    async fn update_cart_item(&mut self, item: &CartItem) -> Result<()>;
    /// Soft-deletes the item together with its variant picks
    async fn delete_cart_item(&mut self, id: Uuid) -> Result<()>;
    async fn save_cart_totals(&mut self, cart: &Cart) -> Result<()>;
    /// Flips an active cart to checkout. `false` when it was no longer active.
    async fn checkout_cart(&mut self, id: Uuid) -> Result<bool>;

    async fn insert_order_item(&mut self, item: &OrderItem) -> Result<()>;
    async fn insert_order_item_variant(&mut self, variant: &OrderItemVariant) -> Result<()>;
    async fn set_order_status(&mut self, id: Uuid, status: OrderStatus) -> Result<()>;

    async fn commit(self: Box<Self>) -> Result<()>;
    async fn rollback(self: Box<Self>) -> Result<()>;
}
