//! Session-related types.
//!
//! Types stored in the session for authentication and cart state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{AccessToken, Authorization};

/// Session-stored backend token.
///
/// Kept as a plain string since session values must serialize; it is
/// wrapped in a secret again as soon as it is read.
#[derive(Clone, Serialize, Deserialize)]
pub struct StoredToken {
    access_token: String,
    pub logged_in_at: DateTime<Utc>,
}

impl StoredToken {
    /// Store `token`, stamped with the current time.
    #[must_use]
    pub fn new(token: &AccessToken) -> Self {
        Self {
            access_token: token.expose().to_string(),
            logged_in_at: Utc::now(),
        }
    }

    /// Authorization for backend calls made on the user's behalf.
    #[must_use]
    pub fn authorization(&self) -> Authorization {
        AccessToken::new(self.access_token.clone()).bearer()
    }
}

impl std::fmt::Debug for StoredToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredToken")
            .field("access_token", &"[REDACTED]")
            .field("logged_in_at", &self.logged_in_at)
            .finish()
    }
}

/// Session keys for authentication and cart data.
pub mod keys {
    /// Key for the backend access token.
    pub const TOKEN: &str = "token";

    /// Key for the selected default cart.
    pub const DEFAULT_CART: &str = "default_cart";

    /// Key for the local (pre-login) cart.
    pub const LOCAL_CART: &str = "local_cart";
}
