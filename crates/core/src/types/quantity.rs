//! Cart line quantity.

use serde::{Deserialize, Serialize};

/// A strictly positive item count.
///
/// Carts never store zero or negative quantities; removing an item deletes
/// the line instead. No upper bound is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct Quantity(i32);

/// Error returned when a quantity is not at least one.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("quantity must be at least 1 (got {0})")]
pub struct InvalidQuantity(pub i64);

impl Quantity {
    pub const ONE: Self = Self(1);

    /// # Errors
    ///
    /// Returns [`InvalidQuantity`] for values below one.
    pub fn new(value: i32) -> Result<Self, InvalidQuantity> {
        if value < 1 {
            return Err(InvalidQuantity(i64::from(value)));
        }
        Ok(Self(value))
    }

    #[must_use]
    pub const fn get(self) -> i32 {
        self.0
    }

    /// Adds two quantities, saturating at `i32::MAX`.
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::ONE
    }
}

impl TryFrom<i32> for Quantity {
    type Error = InvalidQuantity;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<i64> for Quantity {
    type Error = InvalidQuantity;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        i32::try_from(value)
            .map_err(|_| InvalidQuantity(value))
            .and_then(Self::new)
    }
}

impl From<Quantity> for i32 {
    fn from(quantity: Quantity) -> Self {
        quantity.0
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_zero_and_negative() {
        assert_eq!(Quantity::new(0), Err(InvalidQuantity(0)));
        assert_eq!(Quantity::new(-3), Err(InvalidQuantity(-3)));
        assert!(Quantity::try_from(i64::from(i32::MAX) + 1).is_err());
    }

    #[test]
    fn test_saturating_add() {
        let two = Quantity::new(2).unwrap();
        assert_eq!(two.saturating_add(Quantity::ONE).get(), 3);
        let max = Quantity::new(i32::MAX).unwrap();
        assert_eq!(max.saturating_add(two).get(), i32::MAX);
    }

    #[test]
    fn test_deserialize_validates() {
        assert_eq!(serde_json::from_str::<Quantity>("4").unwrap().get(), 4);
        assert!(serde_json::from_str::<Quantity>("0").is_err());
    }
}
