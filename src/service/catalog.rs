//! Catalog lookup: products, variants, promos, recommendations and categories

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::aggregates::{
    Category, Placement, Product, ProductFilter, Recommendation, SpecialProduct, Variant,
    VariantOption, VariantWithOptions, WeeklyPromo,
};
use crate::domain::pricing::discounted_price;
use crate::domain::value_objects::{Page, PageRequest};
use crate::store::Store;
use crate::{EcommerceError, Result};

/// Product as shown to shoppers. Catalog listings carry the badges; products
/// embedded in carts, orders and wishlists leave them out.
#[derive(Clone, Debug, Serialize)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub price_after_discount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub special_products: Option<SpecialProduct>,
}

impl ProductView {
    pub fn with_badges(product: Product, special: SpecialProduct) -> Self {
        Self {
            special_products: Some(special),
            ..Self::from(product)
        }
    }
}

impl From<Product> for ProductView {
    fn from(product: Product) -> Self {
        Self {
            price_after_discount: product.price_after_discount(),
            product,
            special_products: None,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: ProductView,
    pub variants: Vec<VariantWithOptions>,
    pub promo: Option<WeeklyPromo>,
    pub promo_price: Option<Decimal>,
}

#[derive(Clone, Debug, Serialize)]
pub struct PromoProduct {
    #[serde(flatten)]
    pub promo: WeeklyPromo,
    pub product: ProductView,
    pub promo_price: Decimal,
}

#[derive(Clone, Debug, Serialize)]
pub struct RecommendationView {
    #[serde(flatten)]
    pub recommendation: Recommendation,
    pub product: ProductView,
    /// Where the client fetches the product detail
    pub path_url: String,
}

/// A variant pick hydrated for display, with the price captured when it was picked
#[derive(Clone, Debug, Serialize)]
pub struct ChosenOption {
    pub variant: Option<Variant>,
    pub option: Option<VariantOption>,
    pub additional_price: Decimal,
}

/// A product together with the promo active on the pricing day
#[derive(Clone, Debug)]
pub struct PricedProduct {
    pub product: Product,
    pub promo: Option<WeeklyPromo>,
}

impl PricedProduct {
    pub fn unit_price(&self) -> Decimal {
        self.product.price_after_discount()
    }

    pub fn promo_pct(&self) -> Option<Decimal> {
        self.promo.as_ref().map(|p| p.promo_discount)
    }
}

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn Store>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Attaches the new and best-selling badges, one count query per batch.
    async fn badged(&self, products: Vec<Product>) -> Result<Vec<ProductView>> {
        let ids: Vec<Uuid> = products.iter().map(|p| p.id).collect();
        let counts = self.store.order_line_counts(&ids).await?;
        let now = Utc::now();
        Ok(products
            .into_iter()
            .map(|product| {
                let lines = counts.get(&product.id).copied().unwrap_or(0);
                let special = SpecialProduct::assess(&product, lines, now);
                ProductView::with_badges(product, special)
            })
            .collect())
    }

    pub async fn product_detail(
        &self,
        product_id: Uuid,
        today: NaiveDate,
    ) -> Result<Option<ProductDetail>> {
        let Some(product) = self.store.product(product_id).await? else {
            return Ok(None);
        };
        let variants = if product.has_variant {
            self.store.variants_with_options(product.id).await?
        } else {
            Vec::new()
        };
        let promo = self.store.active_promo(product.id, today).await?;
        let Some(view) = self.badged(vec![product]).await?.pop() else {
            return Ok(None);
        };
        let promo_price = promo
            .as_ref()
            .map(|p| discounted_price(view.price_after_discount, p.promo_discount));
        Ok(Some(ProductDetail {
            product: view,
            variants,
            promo,
            promo_price,
        }))
    }

    pub async fn active_promo(
        &self,
        product_id: Uuid,
        today: NaiveDate,
    ) -> Result<Option<WeeklyPromo>> {
        self.store.active_promo(product_id, today).await
    }

    /// Product plus its promo for pricing a cart line. Missing products are an error.
    pub async fn priced_product(
        &self,
        product_id: Uuid,
        today: NaiveDate,
    ) -> Result<PricedProduct> {
        let product = self
            .store
            .product(product_id)
            .await?
            .ok_or(EcommerceError::ProductNotFound)?;
        let promo = self.store.active_promo(product.id, today).await?;
        tracing::debug!(
            %product_id,
            promo = ?promo.as_ref().map(|p| p.promo_discount),
            "Priced product"
        );
        Ok(PricedProduct { product, promo })
    }

    /// Resolves a picked option, requiring it to belong to `variant_id` of a
    /// variant-bearing product.
    pub async fn resolve_option(
        &self,
        product: &Product,
        variant_id: Uuid,
        option_id: Uuid,
    ) -> Result<VariantOption> {
        let variant = self.store.variant(variant_id).await?;
        let option = self.store.variant_option(option_id).await?;
        match (variant, option) {
            (Some(v), Some(o))
                if v.product_id == product.id
                    && o.variant_id == v.id
                    && v.status.is_active()
                    && o.status.is_active() =>
            {
                Ok(o)
            }
            _ => Err(EcommerceError::VariantOptionNotFound),
        }
    }

    /// Looks up a picked variant and option for display. Rows deleted since
    /// the pick come back as `None`.
    pub async fn chosen_option(
        &self,
        variant_id: Uuid,
        option_id: Uuid,
        additional_price: Decimal,
    ) -> Result<ChosenOption> {
        Ok(ChosenOption {
            variant: self.store.variant(variant_id).await?,
            option: self.store.variant_option(option_id).await?,
            additional_price,
        })
    }

    pub async fn list_products(
        &self,
        filter: &ProductFilter,
        page: PageRequest,
    ) -> Result<Page<ProductView>> {
        let (rows, total) = self.store.list_products(filter, &page).await?;
        let views = self.badged(rows).await?;
        Ok(Page::new(views, &page, total))
    }

    pub async fn list_weekly_promos(
        &self,
        today: NaiveDate,
        page: PageRequest,
    ) -> Result<Page<PromoProduct>> {
        let (promos, total) = self.store.list_active_promos(today, &page).await?;
        let mut pairs = Vec::with_capacity(promos.len());
        for promo in promos {
            // a product deleted between the two reads drops out of the page
            let Some(product) = self.store.product(promo.product_id).await? else {
                tracing::warn!(
                    promo_id = %promo.id,
                    product_id = %promo.product_id,
                    "Promo product missing"
                );
                continue;
            };
            pairs.push((promo, product));
        }
        let (promos, products): (Vec<_>, Vec<_>) = pairs.into_iter().unzip();
        let items = promos
            .into_iter()
            .zip(self.badged(products).await?)
            .map(|(promo, product)| PromoProduct {
                promo_price: discounted_price(product.price_after_discount, promo.promo_discount),
                promo,
                product,
            })
            .collect();
        Ok(Page::new(items, &page, total))
    }

    pub async fn list_recommendations(
        &self,
        placement: Placement,
        page: PageRequest,
    ) -> Result<Page<RecommendationView>> {
        let (rows, total) = self.store.list_recommendations(placement, &page).await?;
        let mut pairs = Vec::with_capacity(rows.len());
        for recommendation in rows {
            let Some(product) = self.store.product(recommendation.product_id).await? else {
                tracing::warn!(
                    recommendation_id = %recommendation.id,
                    product_id = %recommendation.product_id,
                    "Recommended product missing"
                );
                continue;
            };
            pairs.push((recommendation, product));
        }
        let (recommendations, products): (Vec<_>, Vec<_>) = pairs.into_iter().unzip();
        let items = recommendations
            .into_iter()
            .zip(self.badged(products).await?)
            .map(|(recommendation, product)| RecommendationView {
                path_url: format!("/api/products/{}", recommendation.product_id),
                recommendation,
                product,
            })
            .collect();
        Ok(Page::new(items, &page, total))
    }

    pub async fn list_categories(&self, page: PageRequest) -> Result<Page<Category>> {
        let (rows, total) = self.store.list_categories(&page).await?;
        Ok(Page::new(rows, &page, total))
    }
}
