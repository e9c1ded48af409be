//! Login credentials.
//!
//! Validation happens before any request reaches the backend, so an empty
//! username or a too-short password never costs a round trip.

use core::fmt;

use secrecy::{ExposeSecret, SecretString};

/// Errors that can occur when validating [`Credentials`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialsError {
    /// The username is empty.
    #[error("Username is required.")]
    EmptyUsername,
    /// The username is longer than the backend column allows.
    #[error("username must be at most {max} characters")]
    UsernameTooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The password is shorter than the minimum.
    #[error("Password must be at least {min} characters long.")]
    PasswordTooShort {
        /// Minimum required length.
        min: usize,
    },
}

/// A login username.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Username(String);

impl Username {
    /// Maximum length of a username.
    pub const MAX_LENGTH: usize = 255;

    /// Parse a `Username`.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is blank or longer than 255 characters.
    pub fn parse(s: &str) -> Result<Self, CredentialsError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(CredentialsError::EmptyUsername);
        }
        if trimmed.chars().count() > Self::MAX_LENGTH {
            return Err(CredentialsError::UsernameTooLong {
                max: Self::MAX_LENGTH,
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the username as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A login password. `Debug` never prints the value.
#[derive(Clone)]
pub struct Password(SecretString);

impl Password {
    /// Minimum accepted password length.
    pub const MIN_LENGTH: usize = 6;

    /// Validate a password.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialsError::PasswordTooShort`] if the password has
    /// fewer than six characters.
    pub fn parse(s: &str) -> Result<Self, CredentialsError> {
        if s.chars().count() < Self::MIN_LENGTH {
            return Err(CredentialsError::PasswordTooShort {
                min: Self::MIN_LENGTH,
            });
        }
        Ok(Self(SecretString::from(s)))
    }

    /// Expose the password for transmission.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password([REDACTED])")
    }
}

/// A validated username and password pair.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: Username,
    pub password: Password,
}

impl Credentials {
    /// Validate a username and password.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure, checking the username first.
    pub fn parse(username: &str, password: &str) -> Result<Self, CredentialsError> {
        Ok(Self {
            username: Username::parse(username)?,
            password: Password::parse(password)?,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_credentials() {
        let creds = Credentials::parse("  shopper ", "hunter22").unwrap();
        assert_eq!(creds.username.as_str(), "shopper");
        assert_eq!(creds.password.expose(), "hunter22");
    }

    #[test]
    fn test_empty_username() {
        assert_eq!(
            Credentials::parse("", "hunter22").unwrap_err(),
            CredentialsError::EmptyUsername
        );
    }

    #[test]
    fn test_short_password() {
        assert_eq!(
            Credentials::parse("shopper", "12345").unwrap_err(),
            CredentialsError::PasswordTooShort { min: 6 }
        );
        assert!(Password::parse("123456").is_ok());
    }

    #[test]
    fn test_debug_redacts_password() {
        let creds = Credentials::parse("shopper", "topsecret").unwrap();
        let debug = format!("{creds:?}");
        assert!(debug.contains("shopper"));
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("topsecret"));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            CredentialsError::PasswordTooShort { min: 6 }.to_string(),
            "Password must be at least 6 characters long."
        );
    }
}
