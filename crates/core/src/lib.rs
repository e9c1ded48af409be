//! Marketstall Core - Shared domain types.
//!
//! This crate provides the types shared by every Marketstall component:
//! - `storefront` - Backend-for-frontend server and commerce API client
//! - `cli` - Command-line front end for the same operations
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no HTTP
//! clients. The commerce backend owns all durable state; these types describe
//! the transient copies the storefront holds.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices and discounts, quantities, cart names,
//!   statuses and login credentials

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
