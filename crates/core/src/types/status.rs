//! Status enums for checkout sessions.

use serde::{Deserialize, Serialize};

/// Lifecycle of a recorded checkout session.
///
/// A session is created `Open` and only moves forward. Once `Completed` it
/// never leaves that state, so redelivered or out-of-order provider events
/// cannot undo a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStatus {
    #[default]
    Open,
    Completed,
    Expired,
    Failed,
}

impl CheckoutStatus {
    /// Whether moving from `self` to `next` is a forward transition.
    ///
    /// Re-applying the current state is allowed (idempotent redelivery).
    /// `Expired`/`Failed` may still become `Completed`, since an async
    /// payment can succeed after the provider reported a failure.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::Open, _) => true,
            (Self::Completed, next) => matches!(next, Self::Completed),
            (Self::Expired | Self::Failed, next) => !matches!(next, Self::Open),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Completed => "completed",
            Self::Expired => "expired",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for CheckoutStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CheckoutStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "completed" => Ok(Self::Completed),
            "expired" => Ok(Self::Expired),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("invalid checkout status: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_completed_is_sticky() {
        let completed = CheckoutStatus::Completed;
        assert!(completed.can_transition_to(CheckoutStatus::Completed));
        assert!(!completed.can_transition_to(CheckoutStatus::Open));
        assert!(!completed.can_transition_to(CheckoutStatus::Expired));
        assert!(!completed.can_transition_to(CheckoutStatus::Failed));
    }

    #[test]
    fn test_open_moves_anywhere() {
        for next in [
            CheckoutStatus::Completed,
            CheckoutStatus::Expired,
            CheckoutStatus::Failed,
        ] {
            assert!(CheckoutStatus::Open.can_transition_to(next));
        }
    }

    #[test]
    fn test_failed_can_still_complete() {
        assert!(CheckoutStatus::Failed.can_transition_to(CheckoutStatus::Completed));
        assert!(!CheckoutStatus::Expired.can_transition_to(CheckoutStatus::Open));
    }

    #[test]
    fn test_string_roundtrip() {
        for status in [
            CheckoutStatus::Open,
            CheckoutStatus::Completed,
            CheckoutStatus::Expired,
            CheckoutStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<CheckoutStatus>().unwrap(), status);
        }
        assert!("paid".parse::<CheckoutStatus>().is_err());
    }
}
