use axum::extract::{Path, Query, State};
use axum::http::header::SET_COOKIE;
use axum::http::StatusCode;
use axum::response::{AppendHeaders, IntoResponse};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use super::auth::TOKEN_COOKIE;
use super::{AppState, PageQuery};
use crate::domain::aggregates::{
    Address, AuthedUser, Cart, Category, Order, Placement, ProductFilter, User, Wishlist,
};
use crate::domain::value_objects::{Page, PageRequest};
use crate::service::{
    AddressRequest, CartItemAddRequest, CartItemUpdate, CartView, LoginRequest,
    OrderCreateRequest, OrderView, ProductDetail, ProductView, PromoProduct, RecommendationView,
    RegisterRequest, WishlistView,
};
use crate::{EcommerceError, Result};

// accounts

pub(super) async fn register(
    State(s): State<AppState>,
    Json(r): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>)> {
    let user = s.services.accounts.register(r).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub(super) async fn login(
    State(s): State<AppState>,
    Json(r): Json<LoginRequest>,
) -> Result<impl IntoResponse> {
    let user = s.services.accounts.login(r).await?;
    let token = s.jwt.issue(user.id)?;
    let cookie = format!(
        "{TOKEN_COOKIE}={token}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        s.jwt.ttl().num_seconds()
    );
    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(serde_json::json!({ "token": token, "user": user })),
    ))
}

// catalog

#[derive(Debug, Deserialize)]
pub(super) struct ProductQuery {
    page: Option<u32>,
    per_page: Option<u32>,
    name: Option<String>,
    category_id: Option<Uuid>,
}

pub(super) async fn list_products(
    State(s): State<AppState>,
    Query(q): Query<ProductQuery>,
) -> Result<Json<Page<ProductView>>> {
    let filter = ProductFilter {
        name: q.name.filter(|n| !n.trim().is_empty()),
        category_id: q.category_id,
    };
    let page = PageRequest::new(q.page, q.per_page);
    Ok(Json(s.services.catalog.list_products(&filter, page).await?))
}

pub(super) async fn product_detail(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProductDetail>> {
    let detail = s
        .services
        .catalog
        .product_detail(id, Utc::now().date_naive())
        .await?;
    detail.map(Json).ok_or(EcommerceError::ProductNotFound)
}

pub(super) async fn list_weekly_promos(
    State(s): State<AppState>,
    Query(q): Query<PageQuery>,
) -> Result<Json<Page<PromoProduct>>> {
    let page = s
        .services
        .catalog
        .list_weekly_promos(Utc::now().date_naive(), q.into())
        .await?;
    Ok(Json(page))
}

pub(super) async fn list_recommended(
    State(s): State<AppState>,
    Query(q): Query<PageQuery>,
) -> Result<Json<Page<RecommendationView>>> {
    let page = s
        .services
        .catalog
        .list_recommendations(Placement::Recommended, q.into())
        .await?;
    Ok(Json(page))
}

pub(super) async fn list_banner(
    State(s): State<AppState>,
    Query(q): Query<PageQuery>,
) -> Result<Json<Page<RecommendationView>>> {
    let page = s
        .services
        .catalog
        .list_recommendations(Placement::Banner, q.into())
        .await?;
    Ok(Json(page))
}

pub(super) async fn list_categories(
    State(s): State<AppState>,
    Query(q): Query<PageQuery>,
) -> Result<Json<Page<Category>>> {
    Ok(Json(s.services.catalog.list_categories(q.into()).await?))
}

// wishlist

#[derive(Debug, Deserialize)]
pub(super) struct WishlistAddRequest {
    product_id: Uuid,
}

pub(super) async fn wishlist(
    State(s): State<AppState>,
    user: AuthedUser,
    Query(q): Query<PageQuery>,
) -> Result<Json<Page<WishlistView>>> {
    Ok(Json(s.services.wishlist.wishlist(&user, q.into()).await?))
}

pub(super) async fn add_to_wishlist(
    State(s): State<AppState>,
    user: AuthedUser,
    Json(r): Json<WishlistAddRequest>,
) -> Result<(StatusCode, Json<Wishlist>)> {
    let entry = s
        .services
        .wishlist
        .add_to_wishlist(&user, r.product_id)
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub(super) async fn remove_from_wishlist(
    State(s): State<AppState>,
    user: AuthedUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    s.services.wishlist.remove_from_wishlist(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// addresses

#[derive(Debug, Deserialize)]
pub(super) struct DefaultFlag {
    #[serde(default = "yes")]
    is_default: bool,
}

fn yes() -> bool {
    true
}

pub(super) async fn list_addresses(
    State(s): State<AppState>,
    user: AuthedUser,
    Query(q): Query<PageQuery>,
) -> Result<Json<Page<Address>>> {
    Ok(Json(
        s.services.addresses.list_addresses(&user, q.into()).await?,
    ))
}

pub(super) async fn add_address(
    State(s): State<AppState>,
    user: AuthedUser,
    Json(r): Json<AddressRequest>,
) -> Result<(StatusCode, Json<Address>)> {
    let address = s.services.addresses.add_address(&user, r).await?;
    Ok((StatusCode::CREATED, Json(address)))
}

pub(super) async fn address_by_id(
    State(s): State<AppState>,
    user: AuthedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Address>> {
    Ok(Json(s.services.addresses.address_by_id(&user, id).await?))
}

pub(super) async fn update_address(
    State(s): State<AppState>,
    user: AuthedUser,
    Path(id): Path<Uuid>,
    Json(r): Json<AddressRequest>,
) -> Result<Json<Address>> {
    Ok(Json(
        s.services.addresses.update_address(&user, id, r).await?,
    ))
}

pub(super) async fn set_default_address(
    State(s): State<AppState>,
    user: AuthedUser,
    Path(id): Path<Uuid>,
    Json(r): Json<DefaultFlag>,
) -> Result<Json<Address>> {
    let address = s
        .services
        .addresses
        .set_default(&user, id, r.is_default)
        .await?;
    Ok(Json(address))
}

pub(super) async fn remove_address(
    State(s): State<AppState>,
    user: AuthedUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    s.services.addresses.remove_address(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// cart

#[derive(Debug, Deserialize)]
pub(super) struct CartItemUpdateRequest {
    #[serde(default)]
    quantity: i32,
}

pub(super) async fn cart_by_user(
    State(s): State<AppState>,
    user: AuthedUser,
) -> Result<Json<CartView>> {
    s.services
        .cart
        .cart_by_user(&user)
        .await?
        .map(Json)
        .ok_or(EcommerceError::CartNotFound)
}

pub(super) async fn add_product_to_cart(
    State(s): State<AppState>,
    user: AuthedUser,
    Json(r): Json<CartItemAddRequest>,
) -> Result<(StatusCode, Json<Cart>)> {
    let cart = s.services.cart.add_product_to_cart(&user, r).await?;
    Ok((StatusCode::CREATED, Json(cart)))
}

pub(super) async fn update_item_in_cart(
    State(s): State<AppState>,
    user: AuthedUser,
    Path(id): Path<Uuid>,
    Json(r): Json<CartItemUpdateRequest>,
) -> Result<Json<Cart>> {
    let update = CartItemUpdate {
        cart_item_id: id,
        quantity: r.quantity,
    };
    Ok(Json(
        s.services.cart.update_item_in_cart(&user, update).await?,
    ))
}

pub(super) async fn delete_item_in_cart(
    State(s): State<AppState>,
    user: AuthedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Cart>> {
    Ok(Json(s.services.cart.delete_item_in_cart(&user, id).await?))
}

// orders

pub(super) async fn create_order(
    State(s): State<AppState>,
    user: AuthedUser,
    Json(r): Json<OrderCreateRequest>,
) -> Result<(StatusCode, Json<Order>)> {
    let order = s.services.orders.create_order(&user, r).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub(super) async fn orders_by_user(
    State(s): State<AppState>,
    user: AuthedUser,
) -> Result<Json<Vec<OrderView>>> {
    Ok(Json(s.services.orders.orders_by_user(&user).await?))
}

pub(super) async fn order_by_id(
    State(s): State<AppState>,
    user: AuthedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderView>> {
    Ok(Json(s.services.orders.order_by_id(&user, id).await?))
}
