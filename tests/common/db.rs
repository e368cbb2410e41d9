//! Throwaway Postgres databases for the store tests

use rust_decimal::Decimal;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{ConnectOptions, Connection, PgConnection, PgPool};
use std::str::FromStr;
use uuid::Uuid;

use storefront::domain::aggregates::{Product, Recommendation, Variant, VariantOption};

/// One freshly migrated database per test, created next to the one
/// `DATABASE_URL` points at and dropped by [`TestDb::cleanup`].
pub struct TestDb {
    pub pool: PgPool,
    name: String,
    admin: PgConnectOptions,
}

impl TestDb {
    /// `None` when `DATABASE_URL` is unset, so the suite still runs without Postgres.
    pub async fn new() -> Option<Self> {
        let Ok(url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL is not set, skipping Postgres store test");
            return None;
        };
        let admin = PgConnectOptions::from_str(&url).expect("DATABASE_URL is not a Postgres URL");
        let name = format!("storefront_test_{}", Uuid::now_v7().simple());

        let mut conn = admin
            .connect()
            .await
            .expect("Failed to connect to the admin database");
        sqlx::query(&format!("CREATE DATABASE \"{name}\""))
            .execute(&mut conn)
            .await
            .expect("Failed to create test database");
        conn.close()
            .await
            .expect("Failed to close admin connection");

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_with(admin.clone().database(&name))
            .await
            .expect("Failed to create pool for test database");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations on test database");

        Some(Self { pool, name, admin })
    }

    pub async fn cleanup(self) {
        self.pool.close().await;
        let mut conn: PgConnection = match self.admin.connect().await {
            Ok(conn) => conn,
            Err(err) => {
                eprintln!("Failed to drop database '{}': {err}", self.name);
                return;
            }
        };
        let drop = format!("DROP DATABASE IF EXISTS \"{}\"", self.name);
        if let Err(err) = sqlx::query(&drop).execute(&mut conn).await {
            eprintln!("Failed to drop database '{}': {err}", self.name);
        }
        let _ = conn.close().await;
    }

    pub async fn insert_product(&self, product: &Product) {
        sqlx::query(
            "INSERT INTO products \
             (id, name, description, price, discount, has_variant, total_stock, status, \
              created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.discount)
        .bind(product.has_variant)
        .bind(product.total_stock)
        .bind(product.status.as_str())
        .bind(product.created_at)
        .execute(&self.pool)
        .await
        .expect("Failed to insert product");
    }

    pub async fn plain_product(&self, name: &str, price: Decimal) -> Product {
        let product = Product::create(name, price, Decimal::ZERO);
        self.insert_product(&product).await;
        product
    }

    /// Same shape as the in-memory hoodie: 100.00, 10% off, "L" costs 5.00 more
    pub async fn hoodie(&self) -> (Product, Variant, VariantOption) {
        let mut product = Product::create("Hoodie", Decimal::new(100, 0), Decimal::new(10, 0));
        product.has_variant = true;
        self.insert_product(&product).await;

        let size = Variant::new(product.id, "Size");
        sqlx::query("INSERT INTO variations (id, product_id, attribute_name) VALUES ($1, $2, $3)")
            .bind(size.id)
            .bind(size.product_id)
            .bind(&size.attribute_name)
            .execute(&self.pool)
            .await
            .expect("Failed to insert variant");

        let large = VariantOption::new(size.id, "L", Decimal::new(5, 0));
        sqlx::query(
            "INSERT INTO variation_options (id, variant_id, option_value, additional_price) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(large.id)
        .bind(large.variant_id)
        .bind(&large.option_value)
        .bind(large.additional_price)
        .execute(&self.pool)
        .await
        .expect("Failed to insert variant option");

        (product, size, large)
    }

    pub async fn insert_recommendation(&self, rec: &Recommendation) {
        sqlx::query(
            "INSERT INTO recommendations \
             (id, product_id, title, subtitle, is_recommended, set_in_banner) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(rec.id)
        .bind(rec.product_id)
        .bind(&rec.title)
        .bind(&rec.subtitle)
        .bind(rec.is_recommended)
        .bind(rec.set_in_banner)
        .execute(&self.pool)
        .await
        .expect("Failed to insert recommendation");
    }

    pub async fn retire_product(&self, id: Uuid) {
        sqlx::query("UPDATE products SET status = 'deleted', deleted_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .expect("Failed to retire product");
    }
}
