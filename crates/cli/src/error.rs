//! CLI error type.

use marketstall_storefront::api::ApiError;
use marketstall_storefront::cart::CartError;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// No usable token is stored.
    #[error("Not logged in. Run `mstall login <username>` first.")]
    NotLoggedIn,

    /// The platform has no config directory for the state file.
    #[error("No config directory found; pass --state-file")]
    NoConfigDir,

    /// The selected default cart no longer exists.
    #[error("Default cart {0} is no longer listed by the backend; run `mstall cart init`")]
    CartGone(marketstall_core::CartId),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Cart(#[from] CartError),

    /// Reading or writing the state file failed.
    #[error("State file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Whether the backend rejected the stored token.
    #[must_use]
    pub fn is_auth_failure(&self) -> bool {
        match self {
            Self::Api(e) => e.is_auth_failure(),
            Self::Cart(e) => e.api_error().is_some_and(ApiError::is_auth_failure),
            _ => false,
        }
    }
}
