//! HTTP surface

use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::domain::value_objects::PageRequest;
use crate::service::Services;

pub mod auth;
mod error;
mod handlers;

pub use auth::{Claims, JwtKeys};

#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub jwt: JwtKeys,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl From<PageQuery> for PageRequest {
    fn from(q: PageQuery) -> Self {
        PageRequest::new(q.page, q.per_page)
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "healthy", "service": "storefront"}))
}

pub fn router(state: AppState) -> Router {
    use handlers::*;

    // fixed product paths must be registered ahead of `/api/products/:id`
    Router::new()
        .route("/health", get(health))
        .route("/api/register", post(register))
        .route("/api/login", post(login))
        .route("/api/categories", get(list_categories))
        .route("/api/products", get(list_products))
        .route("/api/products/weekly-promo", get(list_weekly_promos))
        .route("/api/products/recommendation", get(list_recommended))
        .route("/api/products/banner", get(list_banner))
        .route("/api/products/:id", get(product_detail))
        .route("/api/wishlist", get(wishlist).post(add_to_wishlist))
        .route("/api/wishlist/:id", delete(remove_from_wishlist))
        .route("/api/addresses", get(list_addresses).post(add_address))
        .route(
            "/api/addresses/:id",
            get(address_by_id)
                .put(update_address)
                .delete(remove_address),
        )
        .route("/api/addresses/:id/default", put(set_default_address))
        .route("/api/cart", get(cart_by_user).post(add_product_to_cart))
        .route(
            "/api/cart/items/:id",
            put(update_item_in_cart).delete(delete_item_in_cart),
        )
        .route("/api/orders", get(orders_by_user).post(create_order))
        .route("/api/orders/:id", get(order_by_id))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
