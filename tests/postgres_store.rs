//! Store behaviour against a real Postgres. Each test skips itself when
//! `DATABASE_URL` is unset.

mod common;

use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use common::db::TestDb;
use common::{dec, home_address, plain};
use storefront::domain::aggregates::{
    AuthedUser, Cart, CartStatus, LoginId, OrderStatus, Placement, Recommendation,
};
use storefront::domain::pricing::PromoFormula;
use storefront::domain::value_objects::PageRequest;
use storefront::publisher::NoopPublisher;
use storefront::service::{
    CartItemAddRequest, CartItemUpdate, OrderCreateRequest, RegisterRequest, Services, VariantPick,
};
use storefront::store::{CartRepo, CatalogRepo, OrderRepo, PgStore, Store, UnitOfWork, UserRepo};
use storefront::EcommerceError;

fn services(store: &PgStore) -> Services {
    Services::new(
        Arc::new(store.clone()),
        Arc::new(NoopPublisher),
        PromoFormula::Literal,
        4,
    )
}

async fn register(services: &Services, login: &str) -> AuthedUser {
    let request = RegisterRequest {
        name: "Ana".into(),
        email_or_phone: login.into(),
        password: "correct horse".into(),
    };
    let user = services.accounts.register(request).await.unwrap();
    AuthedUser::new(user.id)
}

fn checkout(cart_id: Uuid, address_id: Uuid, shipping_cost: Decimal) -> OrderCreateRequest {
    OrderCreateRequest {
        cart_id,
        address_id,
        shipping_type: "regular".into(),
        shipping_cost,
        payment_method: "bank_transfer".into(),
    }
}

#[tokio::test]
async fn cart_totals_follow_add_update_delete() {
    let Some(db) = TestDb::new().await else {
        return;
    };
    let store = PgStore::new(db.pool.clone());
    let services = services(&store);
    let user = register(&services, "cart@shop.io").await;
    let mug = db.plain_product("Mug", dec(1000, 2)).await;
    let lamp = db.plain_product("Lamp", dec(1500, 2)).await;
    let carts = &services.cart;

    carts
        .add_product_to_cart(&user, plain(&mug, 2))
        .await
        .unwrap();
    let cart = carts
        .add_product_to_cart(&user, plain(&lamp, 1))
        .await
        .unwrap();
    assert_eq!((cart.total_amount, cart.total_price), (3, dec(3500, 2)));

    let items = store.cart_items(cart.id).await.unwrap();
    assert_eq!(items.len(), 2);
    let mug_line = items.iter().find(|i| i.product_id == mug.id).unwrap();
    let lamp_line = items.iter().find(|i| i.product_id == lamp.id).unwrap();

    let update = CartItemUpdate {
        cart_item_id: mug_line.id,
        quantity: 5,
    };
    let cart = carts.update_item_in_cart(&user, update).await.unwrap();
    assert_eq!((cart.total_amount, cart.total_price), (6, dec(6500, 2)));

    let cart = carts
        .delete_item_in_cart(&user, lamp_line.id)
        .await
        .unwrap();
    assert_eq!((cart.total_amount, cart.total_price), (5, dec(5000, 2)));
    assert!(store.cart_item(lamp_line.id).await.unwrap().is_none());

    let stored = store.cart(cart.id).await.unwrap().unwrap();
    let remaining = store.cart_items(cart.id).await.unwrap();
    let sum: Decimal = remaining.iter().map(|i| i.subtotal).sum();
    assert_eq!(stored.total_price, sum);
    assert_eq!(stored.total_amount, 5);
    assert_eq!(stored.cart_status, CartStatus::Active);

    db.cleanup().await;
}

#[tokio::test]
async fn variant_surcharge_is_captured_on_the_line() {
    let Some(db) = TestDb::new().await else {
        return;
    };
    let store = PgStore::new(db.pool.clone());
    let services = services(&store);
    let user = register(&services, "+447700900456").await;
    let (hoodie, size, large) = db.hoodie().await;

    let request = CartItemAddRequest {
        product_id: hoodie.id,
        variants: vec![VariantPick {
            variant_id: size.id,
            variant_option_id: large.id,
        }],
        quantity: 2,
    };
    let cart = services
        .cart
        .add_product_to_cart(&user, request)
        .await
        .unwrap();
    assert_eq!(cart.total_price, dec(19000, 2));

    let line = store.cart_items(cart.id).await.unwrap().remove(0);
    let picks = store.cart_item_variants(line.id).await.unwrap();
    assert_eq!(picks.len(), 1);
    assert_eq!(picks[0].option_id, large.id);
    assert_eq!(picks[0].additional_price, dec(5, 0));

    db.cleanup().await;
}

#[tokio::test]
async fn order_closes_the_cart() {
    let Some(db) = TestDb::new().await else {
        return;
    };
    let store = PgStore::new(db.pool.clone());
    let services = services(&store);
    let user = register(&services, "order@shop.io").await;
    let address = home_address(&services, &user).await;
    let mug = db.plain_product("Mug", dec(1000, 2)).await;
    let lamp = db.plain_product("Lamp", dec(1500, 2)).await;

    services
        .cart
        .add_product_to_cart(&user, plain(&mug, 2))
        .await
        .unwrap();
    let cart = services
        .cart
        .add_product_to_cart(&user, plain(&lamp, 1))
        .await
        .unwrap();
    let request = checkout(cart.id, address.id, dec(500, 2));
    let order = services.orders.create_order(&user, request).await.unwrap();
    assert_eq!(order.order_status, OrderStatus::Success);
    assert_eq!(order.total_price, dec(4000, 2));

    let stored = store.order(order.id).await.unwrap().unwrap();
    assert_eq!(stored.order_status, OrderStatus::Success);
    assert_eq!((stored.total_amount, stored.total_price), (3, dec(4000, 2)));
    assert_eq!(stored.shipping_cost, dec(500, 2));
    assert_eq!(store.order_items(order.id).await.unwrap().len(), 2);

    let closed = store.cart(cart.id).await.unwrap().unwrap();
    assert_eq!(closed.cart_status, CartStatus::Checkout);
    assert!(store.active_cart(user.id).await.unwrap().is_none());

    let request = checkout(cart.id, address.id, Decimal::ZERO);
    let again = services.orders.create_order(&user, request).await;
    assert!(matches!(again, Err(EcommerceError::CartCheckedOut)));

    let counts = store
        .order_line_counts(&[mug.id, lamp.id, Uuid::now_v7()])
        .await
        .unwrap();
    assert_eq!(counts.get(&mug.id), Some(&1));
    assert_eq!(counts.len(), 2);

    db.cleanup().await;
}

#[tokio::test]
async fn failed_materialization_keeps_the_cart_open() {
    let Some(db) = TestDb::new().await else {
        return;
    };
    let store = PgStore::new(db.pool.clone());
    let services = services(&store);
    let user = register(&services, "failed@shop.io").await;
    let address = home_address(&services, &user).await;
    let mug = db.plain_product("Mug", dec(1000, 2)).await;
    let cart = services
        .cart
        .add_product_to_cart(&user, plain(&mug, 2))
        .await
        .unwrap();

    sqlx::query(
        "CREATE FUNCTION reject_order_items() RETURNS trigger AS $$ \
         BEGIN RAISE EXCEPTION 'order items are frozen'; END $$ LANGUAGE plpgsql",
    )
    .execute(&db.pool)
    .await
    .unwrap();
    sqlx::query(
        "CREATE TRIGGER order_items_frozen BEFORE INSERT ON order_items \
         FOR EACH ROW EXECUTE FUNCTION reject_order_items()",
    )
    .execute(&db.pool)
    .await
    .unwrap();

    let request = checkout(cart.id, address.id, Decimal::ZERO);
    let err = services
        .orders
        .create_order(&user, request)
        .await
        .unwrap_err();
    let order_id = match err {
        EcommerceError::OrderFailed { order_id, .. } => order_id,
        other => panic!("expected OrderFailed, got {other:?}"),
    };
    let order = store.order(order_id).await.unwrap().unwrap();
    assert_eq!(order.order_status, OrderStatus::Failed);
    assert!(store.order_items(order_id).await.unwrap().is_empty());
    let still_open = store.active_cart(user.id).await.unwrap().unwrap();
    assert_eq!(still_open.id, cart.id);

    sqlx::query("DROP TRIGGER order_items_frozen ON order_items")
        .execute(&db.pool)
        .await
        .unwrap();
    let request = checkout(cart.id, address.id, Decimal::ZERO);
    let retry = services.orders.create_order(&user, request).await.unwrap();
    assert_eq!(retry.order_status, OrderStatus::Success);
    assert_eq!(store.orders_by_user(user.id).await.unwrap().len(), 2);

    db.cleanup().await;
}

#[tokio::test]
async fn checkout_flips_a_cart_only_once() {
    let Some(db) = TestDb::new().await else {
        return;
    };
    let store = PgStore::new(db.pool.clone());
    let services = services(&store);
    let user = register(&services, "flip@shop.io").await;
    let cart = Cart::new(user.id);

    let mut uow = store.begin().await.unwrap();
    uow.insert_cart(&cart).await.unwrap();
    uow.commit().await.unwrap();

    let mut uow = store.begin().await.unwrap();
    assert!(uow.checkout_cart(cart.id).await.unwrap());
    uow.commit().await.unwrap();

    let mut uow = store.begin().await.unwrap();
    assert!(!uow.checkout_cart(cart.id).await.unwrap());
    uow.rollback().await.unwrap();

    let stored = store.cart(cart.id).await.unwrap().unwrap();
    assert_eq!(stored.cart_status, CartStatus::Checkout);

    db.cleanup().await;
}

#[tokio::test]
async fn one_active_cart_per_user() {
    let Some(db) = TestDb::new().await else {
        return;
    };
    let store = PgStore::new(db.pool.clone());
    let services = services(&store);
    let user = register(&services, "single@shop.io").await;

    let first = Cart::new(user.id);
    let mut uow = store.begin().await.unwrap();
    uow.insert_cart(&first).await.unwrap();
    uow.commit().await.unwrap();

    let mut uow = store.begin().await.unwrap();
    let err = uow.insert_cart(&Cart::new(user.id)).await.unwrap_err();
    assert!(matches!(err, EcommerceError::Database(_)));
    drop(uow);

    // a checked-out cart no longer counts against the index
    let mut uow = store.begin().await.unwrap();
    assert!(uow.checkout_cart(first.id).await.unwrap());
    let second = Cart::new(user.id);
    uow.insert_cart(&second).await.unwrap();
    uow.commit().await.unwrap();
    assert_eq!(
        store.active_cart(user.id).await.unwrap().map(|c| c.id),
        Some(second.id)
    );

    db.cleanup().await;
}

#[tokio::test]
async fn duplicate_login_is_rejected() {
    let Some(db) = TestDb::new().await else {
        return;
    };
    let store = PgStore::new(db.pool.clone());
    let services = services(&store);
    let user = register(&services, "taken@shop.io").await;

    let again = RegisterRequest {
        name: "Bo".into(),
        email_or_phone: "taken@shop.io".into(),
        password: "another secret".into(),
    };
    let err = services.accounts.register(again).await.unwrap_err();
    assert!(matches!(err, EcommerceError::DuplicateUser));

    let login = LoginId::Email("taken@shop.io".into());
    let stored = store.user_by_login(&login).await.unwrap().unwrap();
    assert_eq!(stored.id, user.id);
    assert_eq!(stored.name, "Ana");
    assert!(stored.phone_number.is_none());

    db.cleanup().await;
}

#[tokio::test]
async fn recommendations_skip_retired_products() {
    let Some(db) = TestDb::new().await else {
        return;
    };
    let store = PgStore::new(db.pool.clone());
    let lamp = db.plain_product("Lamp", dec(40, 0)).await;
    let rug = db.plain_product("Rug", dec(120, 0)).await;
    let vase = db.plain_product("Vase", dec(25, 0)).await;
    let placements = [(&lamp, true, true), (&rug, true, false), (&vase, false, true)];
    for (product, recommended, banner) in placements {
        let mut rec = Recommendation::new(product.id, product.name.clone(), "Picked for you");
        rec.is_recommended = recommended;
        rec.set_in_banner = banner;
        db.insert_recommendation(&rec).await;
    }

    let page = PageRequest::new(None, None);
    let (rail, total) = store
        .list_recommendations(Placement::Recommended, &page)
        .await
        .unwrap();
    assert_eq!(total, 2);
    assert_eq!(rail[0].product_id, lamp.id);
    assert_eq!(rail[0].title, "Lamp");

    let one = PageRequest::new(None, Some(1));
    let (banner, total) = store
        .list_recommendations(Placement::Banner, &one)
        .await
        .unwrap();
    assert_eq!((banner.len(), total), (1, 2));

    db.retire_product(lamp.id).await;
    let (rail, total) = store
        .list_recommendations(Placement::Recommended, &page)
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(rail[0].product_id, rug.id);

    assert!(store.product(lamp.id).await.unwrap().is_none());
    let retired = store
        .product_including_deleted(lamp.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!((retired.name.as_str(), retired.price), ("Lamp", dec(40, 0)));

    db.cleanup().await;
}
