//! Non-negative monetary value for wallet balances and movements.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;

/// Default policy ceiling for a single recharge or payment.
pub const MAX_AMOUNT: i64 = 10_000_000;

/// Money held in or moved through a wallet.
///
/// Amount is an integer count of whole currency units. The wallet works in a
/// single currency, so no currency tag is carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a new Money value.
    pub fn new(amount: i64) -> Result<Self, DomainError> {
        if amount < 0 {
            return Err(DomainError::NegativeAmount);
        }
        Ok(Self(amount))
    }

    /// Creates a zero-value Money.
    pub fn zero() -> Self {
        Self(0)
    }

    /// Validates a movement amount against the policy ceiling: `0 < amount <= max`.
    pub fn movement(amount: i64, max: i64) -> Result<Self, DomainError> {
        if amount <= 0 || amount > max {
            return Err(DomainError::InvalidAmount { amount, max });
        }
        Ok(Self(amount))
    }

    /// Returns the amount in currency units.
    pub fn amount(&self) -> i64 {
        self.0
    }

    /// Checked addition.
    pub fn checked_add(&self, other: Money) -> Result<Money, DomainError> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or(DomainError::BalanceOverflow)
    }

    /// Checked subtraction - returns error if the result would be negative.
    pub fn checked_sub(&self, other: Money) -> Result<Money, DomainError> {
        if self.0 < other.0 {
            return Err(DomainError::InsufficientFunds {
                available: self.0,
                requested: other.0,
            });
        }
        Ok(Money(self.0 - other.0))
    }

    /// Returns true if this Money covers the other.
    pub fn covers(&self, other: &Money) -> bool {
        self.0 >= other.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Thousands grouping, e.g. 1,250,000
        let digits = self.0.to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }
        write!(f, "${}", grouped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_creation() {
        let money = Money::new(1000).unwrap();
        assert_eq!(money.amount(), 1000);
    }

    #[test]
    fn test_negative_money_fails() {
        let result = Money::new(-100);
        assert!(matches!(result, Err(DomainError::NegativeAmount)));
    }

    #[test]
    fn test_movement_bounds() {
        assert!(Money::movement(1, MAX_AMOUNT).is_ok());
        assert!(Money::movement(MAX_AMOUNT, MAX_AMOUNT).is_ok());
        assert!(matches!(
            Money::movement(0, MAX_AMOUNT),
            Err(DomainError::InvalidAmount { amount: 0, .. })
        ));
        assert!(matches!(
            Money::movement(-5, MAX_AMOUNT),
            Err(DomainError::InvalidAmount { .. })
        ));
        assert!(matches!(
            Money::movement(MAX_AMOUNT + 1, MAX_AMOUNT),
            Err(DomainError::InvalidAmount { .. })
        ));
    }

    #[test]
    fn test_money_subtraction_insufficient() {
        let a = Money::new(100).unwrap();
        let b = Money::new(150).unwrap();
        assert!(matches!(
            a.checked_sub(b),
            Err(DomainError::InsufficientFunds {
                available: 100,
                requested: 150
            })
        ));
        assert_eq!(b.checked_sub(a).unwrap().amount(), 50);
    }

    #[test]
    fn test_money_addition_overflow() {
        let a = Money::new(i64::MAX).unwrap();
        assert!(matches!(
            a.checked_add(Money::new(1).unwrap()),
            Err(DomainError::BalanceOverflow)
        ));
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::new(1_250_000).unwrap().to_string(), "$1,250,000");
        assert_eq!(Money::new(950).unwrap().to_string(), "$950");
        assert_eq!(Money::zero().to_string(), "$0");
    }
}
