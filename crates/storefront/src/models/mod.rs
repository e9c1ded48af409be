//! Types the storefront keeps in server-side sessions.

pub mod session;

pub use session::{StoredToken, keys as session_keys};
