use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::ops::Add;

/// Row id of a stored quarter
pub type QuarterId = i32;

/// A value reported for the current year alongside the prior-year comparison
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearPair {
    #[serde(with = "rust_decimal::serde::float")]
    pub current: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub prior_year: Decimal,
}

impl YearPair {
    pub fn new(current: Decimal, prior_year: Decimal) -> Self {
        Self { current, prior_year }
    }
}

impl Add for YearPair {
    type Output = YearPair;

    fn add(self, rhs: YearPair) -> YearPair {
        YearPair {
            current: self.current + rhs.current,
            prior_year: self.prior_year + rhs.prior_year,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IncomeBreakdown {
    pub donations: YearPair,
    pub mission: YearPair,
    pub other: YearPair,
}

impl IncomeBreakdown {
    pub fn total(&self) -> YearPair {
        self.donations + self.mission + self.other
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpenseBreakdown {
    pub building: YearPair,
    pub personnel: YearPair,
    pub mission: YearPair,
    pub other: YearPair,
}

impl ExpenseBreakdown {
    pub fn total(&self) -> YearPair {
        self.building + self.personnel + self.mission + self.other
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonorBehavior {
    #[serde(with = "rust_decimal::serde::float")]
    pub regular_percent: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub irregular_percent: Decimal,
}

/// Top-level quarter row as written by the save path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuarterRecord {
    pub year: i32,
    pub quarter: i32,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub surplus: Decimal,
    pub balance: YearPair,
}

/// Flat row of the quarter report join; absent breakdown columns read as `None`
#[derive(Debug, Clone, Default, sqlx::FromRow)]
pub struct QuarterReportRow {
    pub id: QuarterId,
    pub year: i32,
    pub quarter: i32,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub surplus: Option<Decimal>,
    pub balance_current: Option<Decimal>,
    pub balance_prior_year: Option<Decimal>,
    pub donations_current: Option<Decimal>,
    pub donations_prior_year: Option<Decimal>,
    pub mission_income_current: Option<Decimal>,
    pub mission_income_prior_year: Option<Decimal>,
    pub other_income_current: Option<Decimal>,
    pub other_income_prior_year: Option<Decimal>,
    pub income_total_current: Option<Decimal>,
    pub income_total_prior_year: Option<Decimal>,
    pub building_current: Option<Decimal>,
    pub building_prior_year: Option<Decimal>,
    pub personnel_current: Option<Decimal>,
    pub personnel_prior_year: Option<Decimal>,
    pub mission_expense_current: Option<Decimal>,
    pub mission_expense_prior_year: Option<Decimal>,
    pub other_expense_current: Option<Decimal>,
    pub other_expense_prior_year: Option<Decimal>,
    pub expense_total_current: Option<Decimal>,
    pub expense_total_prior_year: Option<Decimal>,
    pub regular_donors_percent: Option<Decimal>,
    pub irregular_donors_percent: Option<Decimal>,
}

/// One entry of the `quarters` array returned by the report endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuarterView {
    pub id: QuarterId,
    pub year: i32,
    pub quarter: i32,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    #[serde(with = "rust_decimal::serde::float")]
    pub surplus: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance_current: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance_prior_year: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub donations_current: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub donations_prior_year: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub mission_income_current: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub mission_income_prior_year: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub other_income_current: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub other_income_prior_year: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub income_total_current: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub income_total_prior_year: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub building_current: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub building_prior_year: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub personnel_current: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub personnel_prior_year: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub mission_expense_current: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub mission_expense_prior_year: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub other_expense_current: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub other_expense_prior_year: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub expense_total_current: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub expense_total_prior_year: Decimal,
    pub donor_behavior: Option<DonorBehavior>,
}

impl From<QuarterReportRow> for QuarterView {
    fn from(row: QuarterReportRow) -> Self {
        let zero = |v: Option<Decimal>| v.unwrap_or(Decimal::ZERO);

        let donor_behavior = match (row.regular_donors_percent, row.irregular_donors_percent) {
            (Some(regular_percent), Some(irregular_percent)) => Some(DonorBehavior {
                regular_percent,
                irregular_percent,
            }),
            _ => None,
        };

        Self {
            id: row.id,
            year: row.year,
            quarter: row.quarter,
            period_start: row.period_start,
            period_end: row.period_end,
            surplus: zero(row.surplus),
            balance_current: zero(row.balance_current),
            balance_prior_year: zero(row.balance_prior_year),
            donations_current: zero(row.donations_current),
            donations_prior_year: zero(row.donations_prior_year),
            mission_income_current: zero(row.mission_income_current),
            mission_income_prior_year: zero(row.mission_income_prior_year),
            other_income_current: zero(row.other_income_current),
            other_income_prior_year: zero(row.other_income_prior_year),
            income_total_current: zero(row.income_total_current),
            income_total_prior_year: zero(row.income_total_prior_year),
            building_current: zero(row.building_current),
            building_prior_year: zero(row.building_prior_year),
            personnel_current: zero(row.personnel_current),
            personnel_prior_year: zero(row.personnel_prior_year),
            mission_expense_current: zero(row.mission_expense_current),
            mission_expense_prior_year: zero(row.mission_expense_prior_year),
            other_expense_current: zero(row.other_expense_current),
            other_expense_prior_year: zero(row.other_expense_prior_year),
            expense_total_current: zero(row.expense_total_current),
            expense_total_prior_year: zero(row.expense_total_prior_year),
            donor_behavior,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn income_total_sums_all_categories_per_year() {
        let income = IncomeBreakdown {
            donations: YearPair::new(d("42632.15"), d("40000")),
            mission: YearPair::new(d("2831.41"), d("1000.50")),
            other: YearPair::new(d("23146.59"), d("0.50")),
        };

        assert_eq!(income.total(), YearPair::new(d("68610.15"), d("41001.00")));
    }

    #[test]
    fn expense_total_sums_all_categories_per_year() {
        let expense = ExpenseBreakdown {
            building: YearPair::new(d("24159.53"), d("1")),
            personnel: YearPair::new(d("35613.77"), d("2")),
            mission: YearPair::new(d("2658.00"), d("3")),
            other: YearPair::new(d("9751.34"), d("4")),
        };

        assert_eq!(expense.total(), YearPair::new(d("72182.64"), d("10")));
    }

    #[test]
    fn report_row_without_breakdowns_reads_as_zero() {
        let view = QuarterView::from(QuarterReportRow {
            id: 7,
            year: 2025,
            quarter: 2,
            surplus: Some(d("12.5")),
            ..Default::default()
        });

        assert_eq!(view.surplus, d("12.5"));
        assert_eq!(view.income_total_current, Decimal::ZERO);
        assert_eq!(view.building_prior_year, Decimal::ZERO);
        assert!(view.donor_behavior.is_none());

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["donationsCurrent"], serde_json::json!(0.0));
        assert_eq!(json["surplus"], serde_json::json!(12.5));
        assert!(json["donorBehavior"].is_null());
    }
}
