//! Application services
//!
//! Each service owns a handle to the store and takes the caller's identity
//! as an explicit argument where ownership matters.

use std::sync::Arc;
use validator::Validate;

use crate::domain::pricing::PromoFormula;
use crate::publisher::EventPublisher;
use crate::store::Store;
use crate::{EcommerceError, Result};

pub mod account;
pub mod address;
pub mod cart;
pub mod catalog;
pub mod order;
pub mod wishlist;

pub use account::{AccountService, LoginRequest, RegisterRequest};
pub use address::{AddressRequest, AddressService};
pub use cart::{
    CartItemAddRequest, CartItemUpdate, CartItemView, CartService, CartView, VariantPick,
};
pub use catalog::{
    CatalogService, ChosenOption, PricedProduct, ProductDetail, ProductView, PromoProduct,
    RecommendationView,
};
pub use order::{OrderCreateRequest, OrderItemView, OrderService, OrderView};
pub use wishlist::{WishlistService, WishlistView};

#[derive(Clone)]
pub struct Services {
    pub catalog: CatalogService,
    pub cart: CartService,
    pub orders: OrderService,
    pub addresses: AddressService,
    pub wishlist: WishlistService,
    pub accounts: AccountService,
}

impl Services {
    pub fn new(
        store: Arc<dyn Store>,
        publisher: Arc<dyn EventPublisher>,
        formula: PromoFormula,
        bcrypt_cost: u32,
    ) -> Self {
        let catalog = CatalogService::new(store.clone());
        Self {
            cart: CartService::new(store.clone(), catalog.clone(), formula),
            orders: OrderService::new(store.clone(), catalog.clone(), publisher),
            addresses: AddressService::new(store.clone()),
            wishlist: WishlistService::new(store.clone()),
            accounts: AccountService::new(store, bcrypt_cost),
            catalog,
        }
    }
}

pub(crate) fn validate<T: Validate>(request: &T) -> Result<()> {
    request
        .validate()
        .map_err(|e| EcommerceError::Validation(e.to_string()))
}
