#![allow(dead_code)]

pub mod db;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use storefront::domain::aggregates::{
    Address, AuthedUser, Product, Recommendation, Variant, VariantOption, WeeklyPromo,
};
use storefront::domain::events::DomainEvent;
use storefront::domain::pricing::PromoFormula;
use storefront::publisher::EventPublisher;
use storefront::service::{AddressRequest, CartItemAddRequest, Services, VariantPick};
use storefront::store::MemoryStore;

#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<DomainEvent>>,
}

impl RecordingPublisher {
    pub fn subjects(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(DomainEvent::subject)
            .collect()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: DomainEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub struct Shop {
    pub store: MemoryStore,
    pub services: Services,
    pub events: Arc<RecordingPublisher>,
}

pub fn shop(formula: PromoFormula) -> Shop {
    let store = MemoryStore::new();
    let events = Arc::new(RecordingPublisher::default());
    let services = Services::new(Arc::new(store.clone()), events.clone(), formula, 4);
    Shop {
        store,
        services,
        events,
    }
}

pub fn dec(units: i64, scale: u32) -> Decimal {
    Decimal::new(units, scale)
}

pub fn shopper() -> AuthedUser {
    AuthedUser::new(Uuid::now_v7())
}

/// Price 100.00, 10% off, with a "Size" variant whose "L" option costs 5.00 more
pub struct Hoodie {
    pub product: Product,
    pub size: Variant,
    pub large: VariantOption,
}

impl Hoodie {
    pub fn add(&self, quantity: i32) -> CartItemAddRequest {
        CartItemAddRequest {
            product_id: self.product.id,
            variants: vec![VariantPick {
                variant_id: self.size.id,
                variant_option_id: self.large.id,
            }],
            quantity,
        }
    }
}

pub async fn seed_hoodie(store: &MemoryStore, promo_pct: Option<i64>) -> Hoodie {
    let product = Product::create("Hoodie", dec(100, 0), dec(10, 0));
    let size = Variant::new(product.id, "Size");
    let large = VariantOption::new(size.id, "L", dec(5, 0));
    store.seed_product(product.clone()).await;
    store.seed_variant(size.clone(), vec![large.clone()]).await;
    if let Some(pct) = promo_pct {
        let today = Utc::now().date_naive();
        let promo = WeeklyPromo::new(
            product.id,
            dec(pct, 0),
            today - Duration::days(1),
            today + Duration::days(5),
        );
        store.seed_promo(promo).await;
    }
    Hoodie {
        product,
        size,
        large,
    }
}

pub async fn seed_plain(store: &MemoryStore, name: &str, price: Decimal) -> Product {
    let product = Product::create(name, price, Decimal::ZERO);
    store.seed_product(product.clone()).await;
    product
}

/// Places `product` on the recommendation rail, the banner, or both
pub async fn seed_placement(
    store: &MemoryStore,
    product: &Product,
    recommended: bool,
    banner: bool,
) -> Recommendation {
    let mut rec = Recommendation::new(product.id, product.name.clone(), "Picked for you");
    rec.is_recommended = recommended;
    rec.set_in_banner = banner;
    store.seed_recommendation(rec.clone()).await;
    rec
}

pub fn plain(product: &Product, quantity: i32) -> CartItemAddRequest {
    CartItemAddRequest {
        product_id: product.id,
        variants: vec![],
        quantity,
    }
}

pub async fn home_address(services: &Services, user: &AuthedUser) -> Address {
    let request = AddressRequest {
        name: "Home".into(),
        street: "12 Market Street".into(),
        district: String::new(),
        city: "Leeds".into(),
        state: String::new(),
        country: "GB".into(),
        postal_code: "LS1 6AA".into(),
    };
    services.addresses.add_address(user, request).await.unwrap()
}
