//! Storefront backend
//!
//! REST backend for a small storefront: accounts, catalog browsing, wishlists,
//! addresses, a per-user shopping cart and order placement.
//!
//! ## Layout
//! - `domain`: aggregates, value objects, pricing and events
//! - `store`: repository traits plus PostgreSQL and in-memory backends
//! - `service`: catalog lookup, cart accumulator, order materializer and the
//!   account/address/wishlist managers
//! - `api`: axum router, JWT identity extractor and error mapping

use thiserror::Error;
use uuid::Uuid;

pub mod api;
pub mod config;
pub mod domain;
pub mod publisher;
pub mod service;
pub mod store;

pub use config::AppConfig;
pub use domain::aggregates::AuthedUser;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum EcommerceError {
    #[error("Product not found")]
    ProductNotFound,

    #[error("Variant option not found for this product")]
    VariantOptionNotFound,

    #[error("Cart not found")]
    CartNotFound,

    #[error("Cart item not found")]
    CartItemNotFound,

    #[error("Cart already checked out")]
    CartCheckedOut,

    #[error("Cart has no items")]
    EmptyCart,

    #[error("Order not found")]
    OrderNotFound,

    #[error("Order {order_id} failed: {reason}")]
    OrderFailed { order_id: Uuid, reason: String },

    #[error("Address not found")]
    AddressNotFound,

    #[error("Wishlist entry not found")]
    WishlistNotFound,

    #[error("Not authorized to access this {0}")]
    NotOwner(&'static str),

    #[error("Invalid quantity")]
    InvalidQuantity,

    #[error("User already registered")]
    DuplicateUser,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Authentication required: {0}")]
    Unauthenticated(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, EcommerceError>;
