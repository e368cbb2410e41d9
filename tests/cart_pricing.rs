mod common;

use common::*;
use storefront::domain::pricing::PromoFormula;
use storefront::service::CartItemUpdate;
use storefront::domain::value_objects::Quantity;
use storefront::store::{CartRepo, FaultPoint};
use storefront::EcommerceError;

#[tokio::test]
async fn variant_surcharge_without_promo() {
    let shop = shop(PromoFormula::Literal);
    let hoodie = seed_hoodie(&shop.store, None).await;
    let user = shopper();

    let cart = shop
        .services
        .cart
        .add_product_to_cart(&user, hoodie.add(2))
        .await
        .unwrap();
    assert_eq!(cart.total_amount, 2);
    assert_eq!(cart.total_price, dec(19000, 2));

    let view = shop
        .services
        .cart
        .cart_by_user(&user)
        .await
        .unwrap()
        .unwrap();
    let line = &view.items[0];
    assert_eq!(line.item.subtotal, dec(19000, 2));
    assert_eq!(line.variants[0].additional_price, dec(5, 0));
    assert_eq!(
        line.variants[0].option.as_ref().map(|o| o.option_value.as_str()),
        Some("L")
    );
}

#[tokio::test]
async fn literal_promo_formula() {
    let shop = shop(PromoFormula::Literal);
    let hoodie = seed_hoodie(&shop.store, Some(20)).await;
    let cart = shop
        .services
        .cart
        .add_product_to_cart(&shopper(), hoodie.add(2))
        .await
        .unwrap();
    assert_eq!(cart.total_price, dec(3800, 2));
}

#[tokio::test]
async fn multiplicative_promo_formula() {
    let shop = shop(PromoFormula::Multiplicative);
    let hoodie = seed_hoodie(&shop.store, Some(20)).await;
    let cart = shop
        .services
        .cart
        .add_product_to_cart(&shopper(), hoodie.add(2))
        .await
        .unwrap();
    assert_eq!(cart.total_price, dec(15200, 2));
}

#[tokio::test]
async fn option_from_another_variant_is_rejected() {
    let shop = shop(PromoFormula::Literal);
    let hoodie = seed_hoodie(&shop.store, None).await;
    let other = seed_hoodie(&shop.store, None).await;
    let user = shopper();

    let mut request = hoodie.add(1);
    request.variants[0].variant_option_id = other.large.id;
    let err = shop
        .services
        .cart
        .add_product_to_cart(&user, request)
        .await
        .unwrap_err();
    assert!(matches!(err, EcommerceError::VariantOptionNotFound));
    assert!(shop.store.active_cart(user.id).await.unwrap().is_none());
}

#[tokio::test]
async fn totals_follow_update_and_delete() {
    let shop = shop(PromoFormula::Literal);
    let mug = seed_plain(&shop.store, "Mug", dec(1000, 2)).await;
    let lamp = seed_plain(&shop.store, "Lamp", dec(1500, 2)).await;
    let sock = seed_plain(&shop.store, "Socks", dec(100, 2)).await;
    let user = shopper();
    let carts = &shop.services.cart;

    carts
        .add_product_to_cart(&user, plain(&mug, 2))
        .await
        .unwrap();
    carts
        .add_product_to_cart(&user, plain(&lamp, 1))
        .await
        .unwrap();
    let cart = carts
        .add_product_to_cart(&user, plain(&sock, 4))
        .await
        .unwrap();
    assert_eq!((cart.total_amount, cart.total_price), (7, dec(3900, 2)));

    let items = shop.store.cart_items(cart.id).await.unwrap();
    let sock_line = items.iter().find(|i| i.product_id == sock.id).unwrap();
    let cart = carts
        .delete_item_in_cart(&user, sock_line.id)
        .await
        .unwrap();
    assert_eq!((cart.total_amount, cart.total_price), (3, dec(3500, 2)));

    let mug_line = items.iter().find(|i| i.product_id == mug.id).unwrap();
    let update = CartItemUpdate {
        cart_item_id: mug_line.id,
        quantity: 5,
    };
    let cart = carts.update_item_in_cart(&user, update).await.unwrap();
    assert_eq!((cart.total_amount, cart.total_price), (6, dec(6500, 2)));

    let remaining = shop.store.cart_items(cart.id).await.unwrap();
    let sum: rust_decimal::Decimal = remaining.iter().map(|i| i.subtotal).sum();
    assert_eq!(remaining.len(), 2);
    assert_eq!(sum, cart.total_price);
}

#[tokio::test]
async fn update_reprices_with_captured_surcharge() {
    let shop = shop(PromoFormula::Literal);
    let hoodie = seed_hoodie(&shop.store, None).await;
    let user = shopper();
    let cart = shop
        .services
        .cart
        .add_product_to_cart(&user, hoodie.add(2))
        .await
        .unwrap();
    let line = shop.store.cart_items(cart.id).await.unwrap().remove(0);

    let update = CartItemUpdate {
        cart_item_id: line.id,
        quantity: 0,
    };
    let cart = shop
        .services
        .cart
        .update_item_in_cart(&user, update)
        .await
        .unwrap();
    assert_eq!((cart.total_amount, cart.total_price), (1, dec(9500, 2)));
}

#[tokio::test]
async fn reading_the_cart_is_idempotent() {
    let shop = shop(PromoFormula::Literal);
    let hoodie = seed_hoodie(&shop.store, Some(20)).await;
    let user = shopper();
    shop.services
        .cart
        .add_product_to_cart(&user, hoodie.add(3))
        .await
        .unwrap();

    let first = shop
        .services
        .cart
        .cart_by_user(&user)
        .await
        .unwrap()
        .unwrap();
    let second = shop
        .services
        .cart
        .cart_by_user(&user)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.cart.total_amount, second.cart.total_amount);
    assert_eq!(first.cart.total_price, second.cart.total_price);
    assert_eq!(first.items.len(), second.items.len());
}

#[tokio::test]
async fn cross_user_update_changes_nothing() {
    let shop = shop(PromoFormula::Literal);
    let mug = seed_plain(&shop.store, "Mug", dec(1000, 2)).await;
    let owner = shopper();
    let cart = shop
        .services
        .cart
        .add_product_to_cart(&owner, plain(&mug, 2))
        .await
        .unwrap();
    let line = shop.store.cart_items(cart.id).await.unwrap().remove(0);

    let intruder = shopper();
    let update = CartItemUpdate {
        cart_item_id: line.id,
        quantity: 9,
    };
    let err = shop
        .services
        .cart
        .update_item_in_cart(&intruder, update)
        .await
        .unwrap_err();
    assert!(matches!(err, EcommerceError::NotOwner(_)));
    let err = shop
        .services
        .cart
        .delete_item_in_cart(&intruder, line.id)
        .await
        .unwrap_err();
    assert!(matches!(err, EcommerceError::NotOwner(_)));

    let after = shop.store.cart(cart.id).await.unwrap().unwrap();
    assert_eq!((after.total_amount, after.total_price), (2, dec(2000, 2)));
    let stored = shop.store.cart_item(line.id).await.unwrap().unwrap();
    assert_eq!(stored.quantity, 2);
}

#[tokio::test]
async fn failed_add_leaves_no_trace() {
    let shop = shop(PromoFormula::Literal);
    let hoodie = seed_hoodie(&shop.store, None).await;
    let user = shopper();

    shop.store.fail_on(FaultPoint::InsertCartItemVariant, 1);
    let err = shop
        .services
        .cart
        .add_product_to_cart(&user, hoodie.add(1))
        .await
        .unwrap_err();
    assert!(matches!(err, EcommerceError::Storage(_)));
    assert!(shop.store.active_cart(user.id).await.unwrap().is_none());

    let cart = shop
        .services
        .cart
        .add_product_to_cart(&user, hoodie.add(1))
        .await
        .unwrap();
    shop.store.fail_on(FaultPoint::InsertCartItemVariant, 1);
    shop.services
        .cart
        .add_product_to_cart(&user, hoodie.add(3))
        .await
        .unwrap_err();

    let after = shop.store.active_cart(user.id).await.unwrap().unwrap();
    assert_eq!(after.id, cart.id);
    assert_eq!((after.total_amount, after.total_price), (1, dec(9500, 2)));
    assert_eq!(shop.store.cart_items(cart.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn update_past_the_line_ceiling_is_rejected() {
    let shop = shop(PromoFormula::Literal);
    let mug = seed_plain(&shop.store, "Mug", dec(1000, 2)).await;
    let user = shopper();
    let request = plain(&mug, Quantity::MAX);
    let cart = shop
        .services
        .cart
        .add_product_to_cart(&user, request)
        .await
        .unwrap();
    assert_eq!(cart.total_price, dec(100_000, 0));
    let line = shop.store.cart_items(cart.id).await.unwrap().remove(0);

    let update = CartItemUpdate {
        cart_item_id: line.id,
        quantity: Quantity::MAX + 1,
    };
    let err = shop
        .services
        .cart
        .update_item_in_cart(&user, update)
        .await
        .unwrap_err();
    assert!(matches!(err, EcommerceError::InvalidQuantity));
    let after = shop.store.cart(cart.id).await.unwrap().unwrap();
    assert_eq!(
        (after.total_amount, after.total_price),
        (Quantity::MAX, dec(100_000, 0))
    );
    let stored = shop.store.cart_item(line.id).await.unwrap().unwrap();
    assert_eq!(stored.quantity, Quantity::MAX);
}
