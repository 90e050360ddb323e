use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::quarter::QuarterView;

/// Fundraising goals for a year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct YearTarget {
    #[serde(with = "rust_decimal::serde::float")]
    pub quarterly_requirement: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub vision_amount: Decimal,
}

impl YearTarget {
    pub const DEFAULT_QUARTERLY_REQUIREMENT: i64 = 75_000;
    pub const DEFAULT_VISION_AMOUNT: i64 = 81_000;
}

impl Default for YearTarget {
    fn default() -> Self {
        Self {
            quarterly_requirement: Decimal::from(Self::DEFAULT_QUARTERLY_REQUIREMENT),
            vision_amount: Decimal::from(Self::DEFAULT_VISION_AMOUNT),
        }
    }
}

/// Cached aggregate of all quarters of a year
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct YearRollup {
    #[serde(with = "rust_decimal::serde::float")]
    pub total_income: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_expense: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub cumulative_surplus: Decimal,
}

impl YearRollup {
    /// Same sums the database aggregate produces when refreshing the rollup row
    pub fn from_quarters<'a>(quarters: impl IntoIterator<Item = &'a QuarterView>) -> Self {
        quarters.into_iter().fold(Self::default(), |acc, q| Self {
            total_income: acc.total_income + q.income_total_current,
            total_expense: acc.total_expense + q.expense_total_current,
            cumulative_surplus: acc.cumulative_surplus + q.surplus,
        })
    }
}
