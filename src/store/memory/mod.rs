//! In-memory store
//!
//! All tables sit behind one async mutex. A unit of work holds the mutex for
//! its whole lifetime together with a snapshot of the tables, which is put
//! back when the unit of work is dropped uncommitted. Calling a repository
//! method on the same store while holding a unit of work deadlocks.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::aggregates::{
    Address, Cart, CartItem, CartItemVariant, Category, LoginId, Order, OrderItem,
    OrderItemVariant, OrderStatus, Placement, Product, ProductFilter, Recommendation, User,
    Variant, VariantOption, VariantWithOptions, WeeklyPromo, Wishlist,
};
use crate::domain::value_objects::{PageRequest, RecordStatus};
use crate::store::{
    AddressRepo, CartRepo, CatalogRepo, OrderRepo, Paged, Store, UnitOfWork, UserRepo,
    WishlistRepo,
};
use crate::{EcommerceError, Result};

mod fault;
mod unit_of_work;

use fault::FaultInjector;
pub use fault::FaultPoint;
use unit_of_work::MemoryUnitOfWork;

// keyed by v7 ids, so iteration order is creation order
#[derive(Clone, Debug, Default)]
pub(crate) struct Tables {
    pub(crate) users: BTreeMap<Uuid, User>,
    pub(crate) categories: BTreeMap<Uuid, Category>,
    pub(crate) products: BTreeMap<Uuid, Product>,
    pub(crate) variants: BTreeMap<Uuid, Variant>,
    pub(crate) options: BTreeMap<Uuid, VariantOption>,
    pub(crate) promos: BTreeMap<Uuid, WeeklyPromo>,
    pub(crate) recommendations: BTreeMap<Uuid, Recommendation>,
    pub(crate) carts: BTreeMap<Uuid, Cart>,
    pub(crate) cart_items: BTreeMap<Uuid, CartItem>,
    pub(crate) cart_item_variants: BTreeMap<Uuid, CartItemVariant>,
    pub(crate) orders: BTreeMap<Uuid, Order>,
    pub(crate) order_items: BTreeMap<Uuid, OrderItem>,
    pub(crate) order_item_variants: BTreeMap<Uuid, OrderItemVariant>,
    pub(crate) addresses: BTreeMap<Uuid, Address>,
    pub(crate) wishlists: BTreeMap<Uuid, Wishlist>,
}

impl Tables {
    pub(crate) fn active_cart_items(&self, cart_id: Uuid) -> Vec<CartItem> {
        self.cart_items
            .values()
            .filter(|i| i.cart_id == cart_id && i.status.is_active())
            .cloned()
            .collect()
    }

    pub(crate) fn active_cart_item_variants(&self, cart_item_id: Uuid) -> Vec<CartItemVariant> {
        self.cart_item_variants
            .values()
            .filter(|v| v.cart_item_id == cart_item_id && v.status.is_active())
            .cloned()
            .collect()
    }

    pub(crate) fn open_cart_for(&self, user_id: Uuid) -> Option<Cart> {
        self.carts
            .values()
            .find(|c| c.user_id == user_id && c.is_open())
            .cloned()
    }

    pub(crate) fn live_cart(&self, id: Uuid) -> Option<Cart> {
        self.carts.get(&id).filter(|c| c.status.is_active()).cloned()
    }

    pub(crate) fn stamp_order(&mut self, id: Uuid, status: OrderStatus) -> Result<()> {
        let order = self
            .orders
            .get_mut(&id)
            .ok_or(EcommerceError::OrderNotFound)?;
        order.order_status = status;
        Ok(())
    }

    fn product_is_active(&self, id: Uuid) -> bool {
        self.products.get(&id).is_some_and(|p| p.status.is_active())
    }
}

fn paginate<'a, T: Clone + 'a>(rows: impl Iterator<Item = &'a T>, page: &PageRequest) -> Paged<T> {
    let rows: Vec<&T> = rows.collect();
    let total = rows.len() as i64;
    let items = rows
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit() as usize)
        .cloned()
        .collect();
    (items, total)
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    faults: Arc<FaultInjector>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the `nth` write at `point` fail with a storage error.
    pub fn fail_on(&self, point: FaultPoint, nth: u32) {
        self.faults.arm(point, nth);
    }

    pub async fn seed_category(&self, category: Category) {
        self.tables
            .lock()
            .await
            .categories
            .insert(category.id, category);
    }

    /// Inserts or replaces the product row
    pub async fn seed_product(&self, product: Product) {
        self.tables
            .lock()
            .await
            .products
            .insert(product.id, product);
    }

    pub async fn seed_variant(&self, variant: Variant, options: Vec<VariantOption>) {
        let mut tables = self.tables.lock().await;
        if let Some(product) = tables.products.get_mut(&variant.product_id) {
            product.has_variant = true;
        }
        for option in options {
            tables.options.insert(option.id, option);
        }
        tables.variants.insert(variant.id, variant);
    }

    pub async fn seed_promo(&self, promo: WeeklyPromo) {
        self.tables.lock().await.promos.insert(promo.id, promo);
    }

    pub async fn seed_recommendation(&self, recommendation: Recommendation) {
        self.tables
            .lock()
            .await
            .recommendations
            .insert(recommendation.id, recommendation);
    }
}

#[async_trait]
impl CatalogRepo for MemoryStore {
    async fn product(&self, id: Uuid) -> Result<Option<Product>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .products
            .get(&id)
            .filter(|p| p.status.is_active())
            .cloned())
    }

    async fn product_including_deleted(&self, id: Uuid) -> Result<Option<Product>> {
        Ok(self.tables.lock().await.products.get(&id).cloned())
    }

    async fn variants_with_options(&self, product_id: Uuid) -> Result<Vec<VariantWithOptions>> {
        let tables = self.tables.lock().await;
        let variants = tables
            .variants
            .values()
            .filter(|v| v.product_id == product_id && v.status.is_active())
            .map(|v| VariantWithOptions {
                variant: v.clone(),
                options: tables
                    .options
                    .values()
                    .filter(|o| o.variant_id == v.id && o.status.is_active())
                    .cloned()
                    .collect(),
            })
            .collect();
        Ok(variants)
    }

    async fn variant(&self, id: Uuid) -> Result<Option<Variant>> {
        Ok(self.tables.lock().await.variants.get(&id).cloned())
    }

    async fn variant_option(&self, id: Uuid) -> Result<Option<VariantOption>> {
        Ok(self.tables.lock().await.options.get(&id).cloned())
    }

    async fn active_promo(&self, product_id: Uuid, day: NaiveDate) -> Result<Option<WeeklyPromo>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .promos
            .values()
            .filter(|p| p.product_id == product_id && p.is_active_on(day))
            .max_by_key(|p| (p.start_date, p.id))
            .cloned())
    }

    async fn list_products(
        &self,
        filter: &ProductFilter,
        page: &PageRequest,
    ) -> Result<Paged<Product>> {
        let tables = self.tables.lock().await;
        let needle = filter.name.as_deref().map(str::to_lowercase);
        let rows = tables.products.values().rev().filter(|p| {
            p.status.is_active()
                && filter.category_id.map_or(true, |c| p.category_id == Some(c))
                && needle
                    .as_deref()
                    .map_or(true, |n| p.name.to_lowercase().contains(n))
        });
        Ok(paginate(rows, page))
    }

    async fn list_active_promos(
        &self,
        day: NaiveDate,
        page: &PageRequest,
    ) -> Result<Paged<WeeklyPromo>> {
        let tables = self.tables.lock().await;
        let rows = tables
            .promos
            .values()
            .filter(|p| p.is_active_on(day) && tables.product_is_active(p.product_id));
        Ok(paginate(rows, page))
    }

    async fn list_categories(&self, page: &PageRequest) -> Result<Paged<Category>> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<&Category> = tables
            .categories
            .values()
            .filter(|c| c.status.is_active())
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(paginate(rows.into_iter(), page))
    }

    async fn list_recommendations(
        &self,
        placement: Placement,
        page: &PageRequest,
    ) -> Result<Paged<Recommendation>> {
        let tables = self.tables.lock().await;
        let rows = tables.recommendations.values().filter(|r| {
            r.status.is_active() && r.matches(placement) && tables.product_is_active(r.product_id)
        });
        Ok(paginate(rows, page))
    }

    async fn order_line_counts(&self, product_ids: &[Uuid]) -> Result<HashMap<Uuid, i64>> {
        let tables = self.tables.lock().await;
        let mut counts = HashMap::new();
        for line in tables
            .order_items
            .values()
            .filter(|i| product_ids.contains(&i.product_id))
        {
            *counts.entry(line.product_id).or_insert(0) += 1;
        }
        Ok(counts)
    }
}

#[async_trait]
impl CartRepo for MemoryStore {
    async fn active_cart(&self, user_id: Uuid) -> Result<Option<Cart>> {
        Ok(self.tables.lock().await.open_cart_for(user_id))
    }

    async fn cart(&self, id: Uuid) -> Result<Option<Cart>> {
        Ok(self.tables.lock().await.live_cart(id))
    }

    async fn cart_item(&self, id: Uuid) -> Result<Option<CartItem>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .cart_items
            .get(&id)
            .filter(|i| i.status.is_active())
            .cloned())
    }

    async fn cart_items(&self, cart_id: Uuid) -> Result<Vec<CartItem>> {
        Ok(self.tables.lock().await.active_cart_items(cart_id))
    }

    async fn cart_item_variants(&self, cart_item_id: Uuid) -> Result<Vec<CartItemVariant>> {
        Ok(self
            .tables
            .lock()
            .await
            .active_cart_item_variants(cart_item_id))
    }
}

#[async_trait]
impl OrderRepo for MemoryStore {
    async fn insert_order(&self, order: &Order) -> Result<()> {
        self.faults.check(FaultPoint::InsertOrder)?;
        self.tables
            .lock()
            .await
            .orders
            .insert(order.id, order.clone());
        Ok(())
    }

    async fn set_order_status(&self, id: Uuid, status: OrderStatus) -> Result<()> {
        self.faults.check(FaultPoint::SetOrderStatus)?;
        self.tables.lock().await.stamp_order(id, status)
    }

    async fn order(&self, id: Uuid) -> Result<Option<Order>> {
        Ok(self.tables.lock().await.orders.get(&id).cloned())
    }

    async fn orders_by_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .orders
            .values()
            .rev()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn order_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .order_items
            .values()
            .filter(|i| i.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn order_item_variants(&self, order_item_id: Uuid) -> Result<Vec<OrderItemVariant>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .order_item_variants
            .values()
            .filter(|v| v.order_item_id == order_item_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AddressRepo for MemoryStore {
    async fn insert_address(&self, mut address: Address) -> Result<Address> {
        let mut tables = self.tables.lock().await;
        address.is_default = !tables
            .addresses
            .values()
            .any(|a| a.user_id == address.user_id && a.status.is_active());
        tables.addresses.insert(address.id, address.clone());
        Ok(address)
    }

    async fn address(&self, id: Uuid) -> Result<Option<Address>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .addresses
            .get(&id)
            .filter(|a| a.status.is_active())
            .cloned())
    }

    async fn addresses(&self, user_id: Uuid, page: &PageRequest) -> Result<Paged<Address>> {
        let tables = self.tables.lock().await;
        let rows = tables
            .addresses
            .values()
            .filter(|a| a.user_id == user_id && a.status.is_active());
        Ok(paginate(rows, page))
    }

    async fn update_address(&self, address: &Address) -> Result<()> {
        let mut tables = self.tables.lock().await;
        match tables.addresses.get_mut(&address.id) {
            Some(row) if row.status.is_active() => {
                let is_default = row.is_default;
                *row = Address {
                    is_default,
                    ..address.clone()
                };
                Ok(())
            }
            _ => Err(EcommerceError::AddressNotFound),
        }
    }

    async fn set_default_address(&self, user_id: Uuid, id: Uuid, is_default: bool) -> Result<()> {
        let mut tables = self.tables.lock().await;
        if !tables
            .addresses
            .get(&id)
            .is_some_and(|a| a.is_usable_by(user_id))
        {
            return Err(EcommerceError::AddressNotFound);
        }
        if is_default {
            for a in tables.addresses.values_mut().filter(|a| a.user_id == user_id) {
                a.is_default = false;
            }
        }
        if let Some(a) = tables.addresses.get_mut(&id) {
            a.is_default = is_default;
        }
        Ok(())
    }

    async fn delete_address(&self, id: Uuid) -> Result<()> {
        let mut tables = self.tables.lock().await;
        if let Some(a) = tables.addresses.get_mut(&id) {
            a.status = RecordStatus::Deleted;
            a.is_default = false;
        }
        Ok(())
    }
}

#[async_trait]
impl WishlistRepo for MemoryStore {
    async fn wishlist_entry(&self, id: Uuid) -> Result<Option<Wishlist>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .wishlists
            .get(&id)
            .filter(|w| w.status.is_active())
            .cloned())
    }

    async fn wishlist_entry_for(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<Wishlist>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .wishlists
            .values()
            .find(|w| w.user_id == user_id && w.product_id == product_id && w.status.is_active())
            .cloned())
    }

    async fn insert_wishlist(&self, entry: &Wishlist) -> Result<()> {
        self.tables
            .lock()
            .await
            .wishlists
            .insert(entry.id, entry.clone());
        Ok(())
    }

    async fn wishlists(&self, user_id: Uuid, page: &PageRequest) -> Result<Paged<Wishlist>> {
        let tables = self.tables.lock().await;
        let rows = tables
            .wishlists
            .values()
            .rev()
            .filter(|w| w.user_id == user_id && w.status.is_active());
        Ok(paginate(rows, page))
    }

    async fn delete_wishlist(&self, id: Uuid) -> Result<()> {
        if let Some(w) = self.tables.lock().await.wishlists.get_mut(&id) {
            w.status = RecordStatus::Deleted;
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn insert_user(&self, user: &User) -> Result<()> {
        let mut tables = self.tables.lock().await;
        let taken = tables.users.values().any(|u| {
            (user.email.is_some() && u.email == user.email)
                || (user.phone_number.is_some() && u.phone_number == user.phone_number)
        });
        if taken {
            return Err(EcommerceError::DuplicateUser);
        }
        tables.users.insert(
            user.id,
            User {
                created_at: Utc::now(),
                ..user.clone()
            },
        );
        Ok(())
    }

    async fn user_by_login(&self, login: &LoginId) -> Result<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .values()
            .find(|u| {
                u.status.is_active()
                    && match login {
                        LoginId::Email(e) => u.email.as_deref() == Some(e.as_str()),
                        LoginId::Phone(p) => u.phone_number.as_deref() == Some(p.as_str()),
                    }
            })
            .cloned())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        let guard = self.tables.clone().lock_owned().await;
        Ok(Box::new(MemoryUnitOfWork::new(guard, self.faults.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn test_dropped_unit_of_work_restores_tables() {
        let store = MemoryStore::new();
        let user = Uuid::now_v7();
        {
            let mut uow = store.begin().await.unwrap();
            uow.insert_cart(&Cart::new(user)).await.unwrap();
        }
        assert!(store.active_cart(user).await.unwrap().is_none());

        let mut uow = store.begin().await.unwrap();
        uow.insert_cart(&Cart::new(user)).await.unwrap();
        uow.commit().await.unwrap();
        assert!(store.active_cart(user).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_first_address_becomes_default() {
        let store = MemoryStore::new();
        let user = Uuid::now_v7();
        let first = store
            .insert_address(Address::new(user, Default::default()))
            .await
            .unwrap();
        let second = store
            .insert_address(Address::new(user, Default::default()))
            .await
            .unwrap();
        assert!(first.is_default && !second.is_default);

        store
            .set_default_address(user, second.id, true)
            .await
            .unwrap();
        assert!(!store.address(first.id).await.unwrap().unwrap().is_default);
        assert!(store.address(second.id).await.unwrap().unwrap().is_default);
    }

    #[tokio::test]
    async fn test_product_listing_filters_and_pages() {
        let store = MemoryStore::new();
        for name in ["Red Shirt", "Blue Shirt", "Sneakers"] {
            store
                .seed_product(Product::create(name, Decimal::new(10, 0), Decimal::ZERO))
                .await;
        }
        let filter = ProductFilter {
            name: Some("shirt".into()),
            category_id: None,
        };
        let (items, total) = store
            .list_products(&filter, &PageRequest::new(Some(1), Some(1)))
            .await
            .unwrap();
        assert_eq!((items.len(), total), (1, 2));
    }

    #[tokio::test]
    async fn test_recommendations_skip_retired_products() {
        let store = MemoryStore::new();
        let kept = Product::create("Tote", Decimal::new(10, 0), Decimal::ZERO);
        let mut retired = Product::create("Cap", Decimal::new(10, 0), Decimal::ZERO);
        retired.status = RecordStatus::Deleted;
        for product in [&kept, &retired] {
            store.seed_product(product.clone()).await;
            let mut rec = Recommendation::new(product.id, product.name.clone(), "");
            rec.set_in_banner = true;
            store.seed_recommendation(rec).await;
        }
        let (banner, total) = store
            .list_recommendations(Placement::Banner, &PageRequest::default())
            .await
            .unwrap();
        assert_eq!((banner.len(), total), (1, 1));
        assert_eq!(banner[0].product_id, kept.id);
        let (rail, _) = store
            .list_recommendations(Placement::Recommended, &PageRequest::default())
            .await
            .unwrap();
        assert!(rail.is_empty());
        assert!(store.product(retired.id).await.unwrap().is_none());
        assert!(store
            .product_including_deleted(retired.id)
            .await
            .unwrap()
            .is_some());
    }
}
