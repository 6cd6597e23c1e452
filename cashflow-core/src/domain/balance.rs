//! Daily balance domain model

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The persisted running balance for one calendar date.
///
/// Exactly one row exists per `balance_date`; recomputing a date overwrites
/// the numeric fields in place rather than inserting a second row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyBalance {
    pub id: Uuid,
    pub balance_date: NaiveDate,
    /// The final balance stored for the previous day, or zero if none exists
    pub previous_balance: Decimal,
    /// Sum of the date's Credit transaction amounts
    pub total_credits: Decimal,
    /// Sum of the date's Debit transaction amounts
    pub total_debits: Decimal,
    pub final_balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DailyBalance {
    /// Build a balance for a date from its components.
    ///
    /// The id generated here only survives the first persistence of the date;
    /// re-saving an existing date keeps the stored id and created_at.
    pub fn new(
        balance_date: NaiveDate,
        previous_balance: Decimal,
        total_credits: Decimal,
        total_debits: Decimal,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            balance_date,
            previous_balance,
            total_credits,
            total_debits,
            final_balance: previous_balance + total_credits - total_debits,
            created_at: now,
            updated_at: now,
        }
    }

    /// Compact projection for listings and the summary endpoint
    pub fn summary(&self) -> BalanceSummary {
        BalanceSummary {
            balance_date: self.balance_date,
            previous_balance: self.previous_balance,
            total_credits: self.total_credits,
            total_debits: self.total_debits,
            final_balance: self.final_balance,
        }
    }
}

/// The compact view of a daily balance: the date plus the four amounts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceSummary {
    pub balance_date: NaiveDate,
    pub previous_balance: Decimal,
    pub total_credits: Decimal,
    pub total_debits: Decimal,
    pub final_balance: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_final_balance_identity() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let balance = DailyBalance::new(
            date,
            Decimal::new(20000, 2), // 200.00
            Decimal::new(15000, 2), // 150.00
            Decimal::new(3000, 2),  // 30.00
        );

        assert_eq!(balance.final_balance, Decimal::new(32000, 2)); // 320.00
        assert_eq!(
            balance.final_balance,
            balance.previous_balance + balance.total_credits - balance.total_debits
        );
    }

    #[test]
    fn test_negative_final_balance_allowed() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let balance = DailyBalance::new(
            date,
            Decimal::ZERO,
            Decimal::new(1000, 2),
            Decimal::new(2500, 2),
        );

        assert_eq!(balance.final_balance, Decimal::new(-1500, 2));
    }

    #[test]
    fn test_summary_projection() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let balance = DailyBalance::new(
            date,
            Decimal::new(100, 2),
            Decimal::new(200, 2),
            Decimal::new(50, 2),
        );

        let summary = balance.summary();
        assert_eq!(summary.balance_date, date);
        assert_eq!(summary.final_balance, balance.final_balance);
    }
}
