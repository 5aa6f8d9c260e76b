//! Cart and checkout domain module.
//!
//! The cart is a list of line items keyed by variant; checkout prices a cart
//! (discount code, shipping, tax) into a [`CheckoutQuote`]. Persistence of cart
//! state is an infrastructure concern (see `atomic-infra`'s cart stores).

pub mod cart;
pub mod checkout;
pub mod discount;

pub use cart::{CART_STORAGE_KEY, Cart, CartItem};
pub use checkout::{Address, CheckoutLine, CheckoutPolicy, CheckoutQuote, CheckoutRequest};
pub use discount::{DiscountCode, DiscountKind};
