//! Catalog aggregates: products, variants, weekly promos, recommendations and categories

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::pricing::discounted_price;
use crate::domain::value_objects::RecordStatus;

/// Products created within this many days count as new
pub const NEW_PRODUCT_DAYS: i64 = 30;

/// A product ordered on more order lines than this counts as best selling
pub const BEST_SELLING_MIN_LINES: i64 = 10;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[serde(skip)]
    pub status: RecordStatus,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            description: None,
            status: RecordStatus::Active,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    /// Percent, 0 to 100
    pub discount: Decimal,
    pub photo_url: Option<String>,
    pub has_variant: bool,
    pub rating: f64,
    pub total_stock: i32,
    #[serde(skip)]
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn create(name: impl Into<String>, price: Decimal, discount: Decimal) -> Self {
        Self {
            id: Uuid::now_v7(),
            category_id: None,
            name: name.into(),
            description: String::new(),
            price,
            discount,
            photo_url: None,
            has_variant: false,
            rating: 0.0,
            total_stock: 0,
            status: RecordStatus::Active,
            created_at: Utc::now(),
        }
    }

    pub fn price_after_discount(&self) -> Decimal {
        discounted_price(self.price, self.discount)
    }

    pub fn is_new_at(&self, now: DateTime<Utc>) -> bool {
        self.created_at > now - Duration::days(NEW_PRODUCT_DAYS)
    }
}

/// Listing badges derived from a product's age and order history
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SpecialProduct {
    pub is_best_selling: bool,
    pub is_new_product: bool,
}

impl SpecialProduct {
    pub fn assess(product: &Product, order_lines: i64, now: DateTime<Utc>) -> Self {
        Self {
            is_best_selling: order_lines > BEST_SELLING_MIN_LINES,
            is_new_product: product.is_new_at(now),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Variant {
    pub id: Uuid,
    pub product_id: Uuid,
    /// e.g. "Size"
    pub attribute_name: String,
    #[serde(skip)]
    pub status: RecordStatus,
}

impl Variant {
    pub fn new(product_id: Uuid, attribute_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            product_id,
            attribute_name: attribute_name.into(),
            status: RecordStatus::Active,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VariantOption {
    pub id: Uuid,
    pub variant_id: Uuid,
    /// e.g. "L"
    pub option_value: String,
    pub additional_price: Decimal,
    pub stock: i32,
    #[serde(skip)]
    pub status: RecordStatus,
}

impl VariantOption {
    pub fn new(
        variant_id: Uuid,
        option_value: impl Into<String>,
        additional_price: Decimal,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            variant_id,
            option_value: option_value.into(),
            additional_price,
            stock: 0,
            status: RecordStatus::Active,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct VariantWithOptions {
    #[serde(flatten)]
    pub variant: Variant,
    pub options: Vec<VariantOption>,
}

impl VariantWithOptions {
    pub fn option(&self, option_id: Uuid) -> Option<&VariantOption> {
        self.options.iter().find(|o| o.id == option_id)
    }
}

/// Time-boxed extra discount on one product
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WeeklyPromo {
    pub id: Uuid,
    pub product_id: Uuid,
    pub promo_discount: Decimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(skip)]
    pub status: RecordStatus,
}

impl WeeklyPromo {
    pub fn new(
        product_id: Uuid,
        promo_discount: Decimal,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            product_id,
            promo_discount,
            start_date,
            end_date,
            status: RecordStatus::Active,
        }
    }

    pub fn is_active_on(&self, day: NaiveDate) -> bool {
        self.status.is_active() && self.start_date <= day && day <= self.end_date
    }
}

/// Curated placement of a product on the recommendation rail or the home banner
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: Uuid,
    pub product_id: Uuid,
    pub title: String,
    pub subtitle: String,
    pub photo_url: Option<String>,
    pub is_recommended: bool,
    pub set_in_banner: bool,
    #[serde(skip)]
    pub status: RecordStatus,
}

impl Recommendation {
    pub fn new(product_id: Uuid, title: impl Into<String>, subtitle: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            product_id,
            title: title.into(),
            subtitle: subtitle.into(),
            photo_url: None,
            is_recommended: false,
            set_in_banner: false,
            status: RecordStatus::Active,
        }
    }

    pub fn matches(&self, placement: Placement) -> bool {
        match placement {
            Placement::Recommended => self.is_recommended,
            Placement::Banner => self.set_in_banner,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    Recommended,
    Banner,
}

#[derive(Clone, Debug, Default)]
pub struct ProductFilter {
    pub name: Option<String>,
    pub category_id: Option<Uuid>,
}
