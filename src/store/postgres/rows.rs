//! Row shapes as read from Postgres, converted into aggregates

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::aggregates::{
    Address, Cart, CartItem, CartItemVariant, Category, Order, OrderItem, OrderItemVariant,
    Product, Recommendation, User, Variant, VariantOption, WeeklyPromo, Wishlist,
};
use crate::domain::value_objects::UnknownStatus;
use crate::{EcommerceError, Result};

fn parse<T: FromStr<Err = UnknownStatus>>(raw: &str) -> Result<T> {
    raw.parse()
        .map_err(|e: UnknownStatus| EcommerceError::Storage(e.to_string()))
}

#[derive(sqlx::FromRow)]
pub(super) struct CategoryRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    status: String,
}

impl TryFrom<CategoryRow> for Category {
    type Error = EcommerceError;

    fn try_from(r: CategoryRow) -> Result<Self> {
        Ok(Self {
            id: r.id,
            name: r.name,
            description: r.description,
            status: parse(&r.status)?,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(super) struct ProductRow {
    id: Uuid,
    category_id: Option<Uuid>,
    name: String,
    description: String,
    price: Decimal,
    discount: Decimal,
    photo_url: Option<String>,
    has_variant: bool,
    rating: f64,
    total_stock: i32,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = EcommerceError;

    fn try_from(r: ProductRow) -> Result<Self> {
        Ok(Self {
            id: r.id,
            category_id: r.category_id,
            name: r.name,
            description: r.description,
            price: r.price,
            discount: r.discount,
            photo_url: r.photo_url,
            has_variant: r.has_variant,
            rating: r.rating,
            total_stock: r.total_stock,
            status: parse(&r.status)?,
            created_at: r.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(super) struct VariantRow {
    id: Uuid,
    product_id: Uuid,
    attribute_name: String,
    status: String,
}

impl TryFrom<VariantRow> for Variant {
    type Error = EcommerceError;

    fn try_from(r: VariantRow) -> Result<Self> {
        Ok(Self {
            id: r.id,
            product_id: r.product_id,
            attribute_name: r.attribute_name,
            status: parse(&r.status)?,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(super) struct VariantOptionRow {
    id: Uuid,
    variant_id: Uuid,
    option_value: String,
    additional_price: Decimal,
    stock: i32,
    status: String,
}

impl TryFrom<VariantOptionRow> for VariantOption {
    type Error = EcommerceError;

    fn try_from(r: VariantOptionRow) -> Result<Self> {
        Ok(Self {
            id: r.id,
            variant_id: r.variant_id,
            option_value: r.option_value,
            additional_price: r.additional_price,
            stock: r.stock,
            status: parse(&r.status)?,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(super) struct PromoRow {
    id: Uuid,
    product_id: Uuid,
    promo_discount: Decimal,
    start_date: NaiveDate,
    end_date: NaiveDate,
    status: String,
}

impl TryFrom<PromoRow> for WeeklyPromo {
    type Error = EcommerceError;

    fn try_from(r: PromoRow) -> Result<Self> {
        Ok(Self {
            id: r.id,
            product_id: r.product_id,
            promo_discount: r.promo_discount,
            start_date: r.start_date,
            end_date: r.end_date,
            status: parse(&r.status)?,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(super) struct RecommendationRow {
    id: Uuid,
    product_id: Uuid,
    title: String,
    subtitle: String,
    photo_url: Option<String>,
    is_recommended: bool,
    set_in_banner: bool,
    status: String,
}

impl TryFrom<RecommendationRow> for Recommendation {
    type Error = EcommerceError;

    fn try_from(r: RecommendationRow) -> Result<Self> {
        Ok(Self {
            id: r.id,
            product_id: r.product_id,
            title: r.title,
            subtitle: r.subtitle,
            photo_url: r.photo_url,
            is_recommended: r.is_recommended,
            set_in_banner: r.set_in_banner,
            status: parse(&r.status)?,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(super) struct CartRow {
    id: Uuid,
    user_id: Uuid,
    total_amount: i32,
    total_price: Decimal,
    cart_status: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<CartRow> for Cart {
    type Error = EcommerceError;

    fn try_from(r: CartRow) -> Result<Self> {
        Ok(Self {
            id: r.id,
            user_id: r.user_id,
            total_amount: r.total_amount,
            total_price: r.total_price,
            cart_status: parse(&r.cart_status)?,
            status: parse(&r.status)?,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(super) struct CartItemRow {
    id: Uuid,
    cart_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    subtotal: Decimal,
    status: String,
}

impl TryFrom<CartItemRow> for CartItem {
    type Error = EcommerceError;

    fn try_from(r: CartItemRow) -> Result<Self> {
        Ok(Self {
            id: r.id,
            cart_id: r.cart_id,
            product_id: r.product_id,
            quantity: r.quantity,
            subtotal: r.subtotal,
            status: parse(&r.status)?,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(super) struct CartItemVariantRow {
    id: Uuid,
    cart_item_id: Uuid,
    variant_id: Uuid,
    option_id: Uuid,
    additional_price: Decimal,
    status: String,
}

impl TryFrom<CartItemVariantRow> for CartItemVariant {
    type Error = EcommerceError;

    fn try_from(r: CartItemVariantRow) -> Result<Self> {
        Ok(Self {
            id: r.id,
            cart_item_id: r.cart_item_id,
            variant_id: r.variant_id,
            option_id: r.option_id,
            additional_price: r.additional_price,
            status: parse(&r.status)?,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(super) struct OrderRow {
    id: Uuid,
    user_id: Uuid,
    cart_id: Uuid,
    address_id: Uuid,
    shipping_type: String,
    shipping_cost: Decimal,
    payment_method: String,
    total_amount: i32,
    total_price: Decimal,
    order_status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = EcommerceError;

    fn try_from(r: OrderRow) -> Result<Self> {
        Ok(Self {
            id: r.id,
            user_id: r.user_id,
            cart_id: r.cart_id,
            address_id: r.address_id,
            shipping_type: r.shipping_type,
            shipping_cost: r.shipping_cost,
            payment_method: r.payment_method,
            total_amount: r.total_amount,
            total_price: r.total_price,
            order_status: parse(&r.order_status)?,
            created_at: r.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(super) struct OrderItemRow {
    id: Uuid,
    order_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    subtotal: Decimal,
    cart_item_id: Uuid,
}

impl From<OrderItemRow> for OrderItem {
    fn from(r: OrderItemRow) -> Self {
        Self {
            id: r.id,
            order_id: r.order_id,
            product_id: r.product_id,
            quantity: r.quantity,
            subtotal: r.subtotal,
            cart_item_id: r.cart_item_id,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(super) struct OrderItemVariantRow {
    id: Uuid,
    order_item_id: Uuid,
    variant_id: Uuid,
    option_id: Uuid,
    additional_price: Decimal,
}

impl From<OrderItemVariantRow> for OrderItemVariant {
    fn from(r: OrderItemVariantRow) -> Self {
        Self {
            id: r.id,
            order_item_id: r.order_item_id,
            variant_id: r.variant_id,
            option_id: r.option_id,
            additional_price: r.additional_price,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(super) struct AddressRow {
    id: Uuid,
    user_id: Uuid,
    name: String,
    is_default: bool,
    street: String,
    district: Option<String>,
    city: Option<String>,
    state: Option<String>,
    country: String,
    postal_code: String,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<AddressRow> for Address {
    type Error = EcommerceError;

    fn try_from(r: AddressRow) -> Result<Self> {
        Ok(Self {
            id: r.id,
            user_id: r.user_id,
            name: r.name,
            is_default: r.is_default,
            street: r.street,
            district: r.district,
            city: r.city,
            state: r.state,
            country: r.country,
            postal_code: r.postal_code,
            status: parse(&r.status)?,
            created_at: r.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(super) struct WishlistRow {
    id: Uuid,
    user_id: Uuid,
    product_id: Uuid,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<WishlistRow> for Wishlist {
    type Error = EcommerceError;

    fn try_from(r: WishlistRow) -> Result<Self> {
        Ok(Self {
            id: r.id,
            user_id: r.user_id,
            product_id: r.product_id,
            status: parse(&r.status)?,
            created_at: r.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(super) struct UserRow {
    id: Uuid,
    name: String,
    email: Option<String>,
    phone_number: Option<String>,
    password_hash: String,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = EcommerceError;

    fn try_from(r: UserRow) -> Result<Self> {
        Ok(Self {
            id: r.id,
            name: r.name,
            email: r.email,
            phone_number: r.phone_number,
            password_hash: r.password_hash,
            status: parse(&r.status)?,
            created_at: r.created_at,
        })
    }
}

/// Converts a batch of rows, failing on the first bad one.
pub(super) fn convert<R, T: TryFrom<R, Error = EcommerceError>>(rows: Vec<R>) -> Result<Vec<T>> {
    rows.into_iter().map(T::try_from).collect()
}
