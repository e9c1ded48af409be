//! Core types for Marketstall.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart_name;
pub mod credentials;
pub mod id;
pub mod price;
pub mod quantity;
pub mod status;

pub use cart_name::{CartName, CartNameError};
pub use credentials::{Credentials, CredentialsError, Password, Username};
pub use id::*;
pub use price::{CurrencyCode, Discount, DiscountError, Price};
pub use quantity::{Quantity, QuantityError};
pub use status::*;
