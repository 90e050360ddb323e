use chrono::{DateTime, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::de::{self, Unexpected};
use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::database::models::{
    DonorBehavior, ExpenseBreakdown, IncomeBreakdown, QuarterRecord, YearPair, YearTarget,
};

/// Request body of `POST /save-quarter`.
///
/// Field names are camelCase; the German snake_case names used by the
/// original dashboard form are accepted as aliases. Numbers may arrive as
/// JSON numbers or numeric strings, and an empty string counts as absent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuarterSubmission {
    #[serde(default, alias = "jahr", deserialize_with = "opt_i32")]
    pub year: Option<i32>,
    #[serde(default, alias = "quartal", deserialize_with = "opt_i32")]
    pub quarter: Option<i32>,

    #[serde(default, alias = "period_start", deserialize_with = "opt_date")]
    pub period_start: Option<NaiveDate>,
    #[serde(default, alias = "period_end", deserialize_with = "opt_date")]
    pub period_end: Option<NaiveDate>,

    #[serde(default, alias = "kontostand_aktuell", deserialize_with = "opt_decimal")]
    pub balance_current: Option<Decimal>,
    #[serde(default, alias = "kontostand_vorjahr", deserialize_with = "opt_decimal")]
    pub balance_prior_year: Option<Decimal>,

    #[serde(default, alias = "spenden_aktuell", deserialize_with = "opt_decimal")]
    pub donations_current: Option<Decimal>,
    #[serde(default, alias = "spenden_vorjahr", deserialize_with = "opt_decimal")]
    pub donations_prior_year: Option<Decimal>,
    #[serde(default, alias = "mission_einnahmen_aktuell", deserialize_with = "opt_decimal")]
    pub mission_income_current: Option<Decimal>,
    #[serde(default, alias = "mission_einnahmen_vorjahr", deserialize_with = "opt_decimal")]
    pub mission_income_prior_year: Option<Decimal>,
    #[serde(default, alias = "sonstige_einnahmen_aktuell", deserialize_with = "opt_decimal")]
    pub other_income_current: Option<Decimal>,
    #[serde(default, alias = "sonstige_einnahmen_vorjahr", deserialize_with = "opt_decimal")]
    pub other_income_prior_year: Option<Decimal>,

    #[serde(default, alias = "gebaeude_aktuell", deserialize_with = "opt_decimal")]
    pub building_current: Option<Decimal>,
    #[serde(default, alias = "gebaeude_vorjahr", deserialize_with = "opt_decimal")]
    pub building_prior_year: Option<Decimal>,
    #[serde(default, alias = "personal_aktuell", deserialize_with = "opt_decimal")]
    pub personnel_current: Option<Decimal>,
    #[serde(default, alias = "personal_vorjahr", deserialize_with = "opt_decimal")]
    pub personnel_prior_year: Option<Decimal>,
    #[serde(default, alias = "mission_ausgaben_aktuell", deserialize_with = "opt_decimal")]
    pub mission_expense_current: Option<Decimal>,
    #[serde(default, alias = "mission_ausgaben_vorjahr", deserialize_with = "opt_decimal")]
    pub mission_expense_prior_year: Option<Decimal>,
    #[serde(default, alias = "sonstige_ausgaben_aktuell", deserialize_with = "opt_decimal")]
    pub other_expense_current: Option<Decimal>,
    #[serde(default, alias = "sonstige_ausgaben_vorjahr", deserialize_with = "opt_decimal")]
    pub other_expense_prior_year: Option<Decimal>,

    #[serde(default, alias = "regelmaessig_prozent", deserialize_with = "opt_decimal")]
    pub regular_donors_percent: Option<Decimal>,
    #[serde(default, alias = "unregelmaessig_prozent", deserialize_with = "opt_decimal")]
    pub irregular_donors_percent: Option<Decimal>,

    #[serde(default, alias = "quartalsbedarf", deserialize_with = "opt_decimal")]
    pub quarterly_requirement: Option<Decimal>,
    #[serde(default, alias = "visionsbetrag", deserialize_with = "opt_decimal")]
    pub vision_amount: Option<Decimal>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("Jahr und Quartal sind erforderlich")]
    MissingYearOrQuarter,

    #[error("Quartal muss zwischen 1 und 4 liegen (erhalten: {0})")]
    QuarterOutOfRange(i32),

    #[error("Ungültiges Jahr: {0}")]
    YearOutOfRange(i32),

    #[error("Betrag außerhalb des zulässigen Bereichs: {0}")]
    AmountOutOfRange(&'static str),
}

/// A validated submission with every optional amount resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuarterDraft {
    pub year: i32,
    pub quarter: i32,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub balance: YearPair,
    pub income: IncomeBreakdown,
    pub expense: ExpenseBreakdown,
    pub donor_behavior: Option<DonorBehavior>,
    pub target: YearTarget,
}

/// Derived figures of a quarter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuarterTotals {
    pub income: YearPair,
    pub expense: YearPair,
    pub surplus: Decimal,
}

pub const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1900..=9999;

/// Largest accepted magnitude of a single amount. Four of them summed per
/// quarter and four quarters per year stay inside `NUMERIC(14,2)`.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1410065408, 2, 0, false, 0); // 10^10

/// Percentages are stored as `NUMERIC(5,2)`.
pub const MAX_PERCENT: Decimal = Decimal::from_parts(99999, 0, 0, false, 2); // 999.99

/// Amounts are kept in whole cents so totals match the stored sub-fields.
fn cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn amount(field: &'static str, value: Option<Decimal>) -> Result<Decimal, SubmissionError> {
    let value = cents(value.unwrap_or_default());
    if value.abs() > MAX_AMOUNT {
        return Err(SubmissionError::AmountOutOfRange(field));
    }
    Ok(value)
}

fn percent(field: &'static str, value: Decimal) -> Result<Decimal, SubmissionError> {
    let value = cents(value);
    if value.abs() > MAX_PERCENT {
        return Err(SubmissionError::AmountOutOfRange(field));
    }
    Ok(value)
}

fn pair(
    fields: (&'static str, &'static str),
    current: Option<Decimal>,
    prior_year: Option<Decimal>,
) -> Result<YearPair, SubmissionError> {
    Ok(YearPair::new(amount(fields.0, current)?, amount(fields.1, prior_year)?))
}

impl QuarterSubmission {
    pub fn validate(self) -> Result<QuarterDraft, SubmissionError> {
        // zero counts as missing, matching the dashboard form
        let (year, quarter) = match (self.year, self.quarter) {
            (Some(y), Some(q)) if y != 0 && q != 0 => (y, q),
            _ => return Err(SubmissionError::MissingYearOrQuarter),
        };

        if !(1..=4).contains(&quarter) {
            return Err(SubmissionError::QuarterOutOfRange(quarter));
        }
        if !YEAR_RANGE.contains(&year) {
            return Err(SubmissionError::YearOutOfRange(year));
        }

        let donor_behavior = match (self.regular_donors_percent, self.irregular_donors_percent) {
            (Some(regular), Some(irregular)) => Some(DonorBehavior {
                regular_percent: percent("regularDonorsPercent", regular)?,
                irregular_percent: percent("irregularDonorsPercent", irregular)?,
            }),
            _ => None,
        };

        let defaults = YearTarget::default();
        let target = YearTarget {
            quarterly_requirement: amount(
                "quarterlyRequirement",
                Some(self.quarterly_requirement.unwrap_or(defaults.quarterly_requirement)),
            )?,
            vision_amount: amount(
                "visionAmount",
                Some(self.vision_amount.unwrap_or(defaults.vision_amount)),
            )?,
        };

        Ok(QuarterDraft {
            year,
            quarter,
            period_start: self.period_start,
            period_end: self.period_end,
            balance: pair(
                ("balanceCurrent", "balancePriorYear"),
                self.balance_current,
                self.balance_prior_year,
            )?,
            income: IncomeBreakdown {
                donations: pair(
                    ("donationsCurrent", "donationsPriorYear"),
                    self.donations_current,
                    self.donations_prior_year,
                )?,
                mission: pair(
                    ("missionIncomeCurrent", "missionIncomePriorYear"),
                    self.mission_income_current,
                    self.mission_income_prior_year,
                )?,
                other: pair(
                    ("otherIncomeCurrent", "otherIncomePriorYear"),
                    self.other_income_current,
                    self.other_income_prior_year,
                )?,
            },
            expense: ExpenseBreakdown {
                building: pair(
                    ("buildingCurrent", "buildingPriorYear"),
                    self.building_current,
                    self.building_prior_year,
                )?,
                personnel: pair(
                    ("personnelCurrent", "personnelPriorYear"),
                    self.personnel_current,
                    self.personnel_prior_year,
                )?,
                mission: pair(
                    ("missionExpenseCurrent", "missionExpensePriorYear"),
                    self.mission_expense_current,
                    self.mission_expense_prior_year,
                )?,
                other: pair(
                    ("otherExpenseCurrent", "otherExpensePriorYear"),
                    self.other_expense_current,
                    self.other_expense_prior_year,
                )?,
            },
            donor_behavior,
            target,
        })
    }
}

impl QuarterDraft {
    pub fn totals(&self) -> QuarterTotals {
        let income = self.income.total();
        let expense = self.expense.total();

        QuarterTotals {
            income,
            expense,
            surplus: income.current - expense.current,
        }
    }

    pub fn record(&self, totals: &QuarterTotals) -> QuarterRecord {
        QuarterRecord {
            year: self.year,
            quarter: self.quarter,
            period_start: self.period_start,
            period_end: self.period_end,
            surplus: totals.surplus,
            balance: self.balance,
        }
    }
}

fn opt_i32<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<serde_json::Value>::deserialize(deserializer)?;
    let Some(value) = opt else {
        return Ok(None);
    };
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Number(n) => n
            .as_i64()
            .and_then(|i| i32::try_from(i).ok())
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("expected a whole number, got {}", n))),
        serde_json::Value::String(s) if s.trim().is_empty() => Ok(None),
        serde_json::Value::String(s) => s
            .trim()
            .parse::<i32>()
            .map(Some)
            .map_err(|_| de::Error::invalid_value(Unexpected::Str(&s), &"a whole number")),
        other => Err(de::Error::custom(format!("expected a whole number, got {}", other))),
    }
}

fn opt_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<serde_json::Value>::deserialize(deserializer)?;
    let Some(value) = opt else {
        return Ok(None);
    };
    match value {
        serde_json::Value::Null => Ok(None),
        // the textual form keeps the exact digits the client sent
        serde_json::Value::Number(n) => parse_decimal(&n.to_string())
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("invalid amount {}", n))),
        serde_json::Value::String(s) if s.trim().is_empty() => Ok(None),
        serde_json::Value::String(s) => parse_decimal(s.trim())
            .map(Some)
            .ok_or_else(|| de::Error::invalid_value(Unexpected::Str(&s), &"a decimal amount")),
        other => Err(de::Error::custom(format!("expected an amount, got {}", other))),
    }
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    s.parse::<Decimal>()
        .ok()
        .or_else(|| Decimal::from_scientific(s).ok())
}

fn opt_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    let Some(s) = opt else {
        return Ok(None);
    };
    let s = s.trim();
    if s.is_empty() {
        return Ok(None);
    }
    // plain dates from the form, full timestamps when a report row is echoed back
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
        .map(Some)
        .ok_or_else(|| de::Error::invalid_value(Unexpected::Str(s), &"a date like 2025-03-31"))
}
