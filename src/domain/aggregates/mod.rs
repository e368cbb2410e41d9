//! Aggregates module
pub mod address;
pub mod cart;
pub mod order;
pub mod product;
pub mod user;
pub mod wishlist;

pub use address::{Address, AddressFields};
pub use cart::{Cart, CartItem, CartItemVariant, CartStatus};
pub use order::{Order, OrderItem, OrderItemVariant, OrderStatus, Shipping};
pub use product::{
    Category, Placement, Product, ProductFilter, Recommendation, SpecialProduct, Variant,
    VariantOption, VariantWithOptions, WeeklyPromo,
};
pub use user::{AuthedUser, LoginId, User};
pub use wishlist::Wishlist;
