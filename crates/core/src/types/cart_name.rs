//! Cart name type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`CartName`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartNameError {
    /// The name is empty or whitespace.
    #[error("cart name cannot be empty")]
    Empty,
    /// The name is longer than the backend column allows.
    #[error("cart name must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
}

/// The name of a cart.
///
/// By convention every user has exactly one cart named
/// [`CartName::DEFAULT`], which is the active cart for checkout.
///
/// ## Constraints
///
/// - Not empty or whitespace-only
/// - At most 50 characters
///
/// ## Examples
///
/// ```
/// use marketstall_core::CartName;
///
/// assert!(CartName::default_cart().is_default());
/// assert!(CartName::parse("wishlist").is_ok());
/// assert!(CartName::parse("   ").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartName(String);

impl CartName {
    /// Name of the conventional active cart.
    pub const DEFAULT: &'static str = "default";

    /// Maximum length of a cart name.
    pub const MAX_LENGTH: usize = 50;

    /// Parse a `CartName` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is blank or longer than 50 characters.
    pub fn parse(s: &str) -> Result<Self, CartNameError> {
        if s.trim().is_empty() {
            return Err(CartNameError::Empty);
        }
        if s.chars().count() > Self::MAX_LENGTH {
            return Err(CartNameError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        Ok(Self(s.to_owned()))
    }

    /// The `default` cart name.
    #[must_use]
    pub fn default_cart() -> Self {
        Self(Self::DEFAULT.to_owned())
    }

    /// Whether this is the conventional default cart.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.0 == Self::DEFAULT
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CartName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl core::str::FromStr for CartName {
    type Err = CartNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for CartName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
