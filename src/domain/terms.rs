use crate::error::InvalidPlanTerms;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How often installments fall due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cadence {
    Monthly,
    Weekly,
    Daily,
}

impl Cadence {
    /// Number of periods used to convert an annual rate into a per-period rate.
    pub fn periods_per_year(self) -> u32 {
        match self {
            Cadence::Monthly => 12,
            Cadence::Weekly => 52,
            Cadence::Daily => 365,
        }
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Cadence::Monthly => "monthly",
            Cadence::Weekly => "weekly",
            Cadence::Daily => "daily",
        };
        f.write_str(name)
    }
}

impl FromStr for Cadence {
    type Err = InvalidPlanTerms;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monthly" => Ok(Cadence::Monthly),
            "weekly" => Ok(Cadence::Weekly),
            "daily" => Ok(Cadence::Daily),
            other => Err(InvalidPlanTerms::new(
                "cadence",
                format!("unsupported cadence '{other}', expected monthly, weekly or daily"),
            )),
        }
    }
}

/// The complete set of terms a plan is financed under.
///
/// Terms are immutable once a plan exists. Range checks happen in
/// [`AmortizationEngine::compute_schedule`](super::amortization::AmortizationEngine::compute_schedule),
/// so a `PlanTerms` value on its own is not proof of validity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanTerms {
    pub principal: Decimal,
    pub annual_rate_percent: Decimal,
    pub tenor_count: u32,
    pub cadence: Cadence,
    pub start_date: NaiveDate,
}

impl PlanTerms {
    /// Builds terms from raw text fields, as they arrive from CSV rows or
    /// command-line flags.
    ///
    /// Non-finite spellings (`NaN`, `inf`, ...) and negative tenors are
    /// rejected here because neither `Decimal` nor `u32` can represent them.
    pub fn parse(
        principal: &str,
        annual_rate_percent: &str,
        tenor_count: &str,
        cadence: &str,
        start_date: &str,
    ) -> Result<Self, InvalidPlanTerms> {
        let principal = parse_decimal("principal", principal)?;
        let annual_rate_percent = parse_decimal("annual_rate_percent", annual_rate_percent)?;

        let tenor: i64 = tenor_count.trim().parse().map_err(|_| {
            InvalidPlanTerms::new(
                "tenor_count",
                format!("'{}' is not an integer", tenor_count.trim()),
            )
        })?;
        if tenor < 1 {
            return Err(InvalidPlanTerms::new(
                "tenor_count",
                format!("must be at least 1, got {tenor}"),
            ));
        }
        let tenor_count = u32::try_from(tenor).map_err(|_| {
            InvalidPlanTerms::new("tenor_count", format!("{tenor} is out of range"))
        })?;

        let cadence = cadence.parse()?;
        let start_date = NaiveDate::parse_from_str(start_date.trim(), "%Y-%m-%d").map_err(|e| {
            InvalidPlanTerms::new(
                "start_date",
                format!("'{}' is not a YYYY-MM-DD date: {e}", start_date.trim()),
            )
        })?;

        Ok(Self {
            principal,
            annual_rate_percent,
            tenor_count,
            cadence,
            start_date,
        })
    }
}

/// Parses an exact decimal, refusing non-finite spellings outright instead
/// of letting them degrade into a generic parse failure or a zero.
pub fn parse_decimal(field: &'static str, raw: &str) -> Result<Decimal, InvalidPlanTerms> {
    let raw = raw.trim();
    let unsigned = raw.trim_start_matches(['+', '-']).to_ascii_lowercase();
    if matches!(unsigned.as_str(), "nan" | "inf" | "infinity") {
        return Err(InvalidPlanTerms::new(
            field,
            format!("'{raw}' is not a finite number"),
        ));
    }
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|_| InvalidPlanTerms::new(field, format!("'{raw}' is not a decimal number")))
}

/// Converts a binary float supplied by a caller into an exact decimal.
///
/// Only finite values are accepted; the conversion keeps the shortest
/// decimal representation of the float.
pub fn decimal_from_f64(field: &'static str, value: f64) -> Result<Decimal, InvalidPlanTerms> {
    if !value.is_finite() {
        return Err(InvalidPlanTerms::new(
            field,
            format!("{value} is not a finite number"),
        ));
    }
    parse_decimal(field, &value.to_string())
}
