//! Status enums for backend entities.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a cart.
///
/// Maps to the backend's `CartStatus` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CartStatus {
    #[default]
    Active,
    Inactive,
    Abandoned,
}

impl CartStatus {
    /// Whether items can still be added to a cart in this status.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Active)
    }
}

impl std::fmt::Display for CartStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Inactive => write!(f, "inactive"),
            Self::Abandoned => write!(f, "abandoned"),
        }
    }
}

impl std::str::FromStr for CartStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "abandoned" => Ok(Self::Abandoned),
            _ => Err(format!("invalid cart status: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_status_wire_format() {
        let status: CartStatus = serde_json::from_str("\"abandoned\"").unwrap();
        assert_eq!(status, CartStatus::Abandoned);
        assert_eq!(serde_json::to_string(&CartStatus::Active).unwrap(), "\"active\"");
    }

    #[test]
    fn test_cart_status_display_round_trips_from_str() {
        for status in [CartStatus::Active, CartStatus::Inactive, CartStatus::Abandoned] {
            assert_eq!(status.to_string().parse::<CartStatus>().unwrap(), status);
        }
        assert!("closed".parse::<CartStatus>().is_err());
    }

    #[test]
    fn test_only_active_is_open() {
        assert!(CartStatus::Active.is_open());
        assert!(!CartStatus::Abandoned.is_open());
    }
}
