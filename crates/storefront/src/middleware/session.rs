//! Session middleware configuration.
//!
//! Sets up in-memory sessions using tower-sessions, plus helpers for the
//! cart slices kept in them.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tower_sessions::{Expiry, MemoryStore, Session, SessionManagerLayer};

use crate::cart::{DEFAULT_TTL, Persisted};
use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "marketstall_session";

/// Create the session layer with an in-memory store.
///
/// Sessions expire after `config.session_ttl` without a request.
#[must_use]
pub fn create_session_layer(config: &StorefrontConfig) -> SessionManagerLayer<MemoryStore> {
    let expiry_seconds = i64::try_from(config.session_ttl.as_secs()).unwrap_or(i64::MAX);

    SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(expiry_seconds),
        ))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

/// Load a slice from the session, or its default when absent or stale.
///
/// Undecodable values are treated as absent.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn load_slice<T>(session: &Session, key: &str) -> Result<T, tower_sessions::session::Error>
where
    T: DeserializeOwned + Default,
{
    let stored = match session.get::<Persisted<T>>(key).await {
        Ok(stored) => stored,
        Err(tower_sessions::session::Error::SerdeJson(e)) => {
            tracing::warn!(key, error = %e, "Discarding undecodable session value");
            None
        }
        Err(e) => return Err(e),
    };

    Ok(stored
        .and_then(|persisted| persisted.into_fresh(DEFAULT_TTL))
        .unwrap_or_default())
}

/// Store a slice in the session, stamped with the current time.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn store_slice<T>(
    session: &Session,
    key: &str,
    value: T,
) -> Result<(), tower_sessions::session::Error>
where
    T: Serialize + Send + Sync,
{
    session.insert(key, Persisted::new(value)).await
}
