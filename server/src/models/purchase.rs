use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::UserId;
use crate::store::StoreError;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Purchase {
    pub id: Uuid,
    pub event_id: Uuid,
    pub buyer: UserId,
    pub purchased_at: DateTime<Utc>,
    pub quantity: i32,
    pub total_price: Decimal,
}

/// A strictly positive ticket count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Quantity(i32);

impl Quantity {
    pub fn new(value: i64) -> Result<Self, StoreError> {
        match i32::try_from(value) {
            Ok(v) if v > 0 => Ok(Self(v)),
            _ => Err(StoreError::InvalidQuantity(value)),
        }
    }

    pub fn get(self) -> i32 {
        self.0
    }

    /// Price of `self` tickets at `unit_price` each.
    pub fn total(self, unit_price: Decimal) -> Result<Decimal, StoreError> {
        Decimal::from(self.0)
            .checked_mul(unit_price)
            .ok_or_else(|| StoreError::Validation("total price out of range".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_quantity_rejects_non_positive() {
        assert!(matches!(
            Quantity::new(0),
            Err(StoreError::InvalidQuantity(0))
        ));
        assert!(matches!(
            Quantity::new(-3),
            Err(StoreError::InvalidQuantity(-3))
        ));
    }

    #[test]
    fn test_quantity_rejects_overflow() {
        let too_big = i64::from(i32::MAX) + 1;
        assert!(Quantity::new(too_big).is_err());
    }

    #[test]
    fn test_total_multiplies_unit_price() {
        let quantity = Quantity::new(3).unwrap();
        assert_eq!(
            quantity.total(Decimal::new(1000, 2)).unwrap(),
            Decimal::new(3000, 2)
        );
    }

    #[test]
    fn test_total_overflow_is_an_error() {
        let quantity = Quantity::new(2).unwrap();
        assert!(matches!(
            quantity.total(Decimal::MAX),
            Err(StoreError::Validation(_))
        ));
    }
}
