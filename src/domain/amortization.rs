//! Level-payment amortization over exact decimals.

use super::money::{DEFAULT_CURRENCY_SCALE, Money};
use super::terms::{Cadence, PlanTerms};
use crate::error::InvalidPlanTerms;
use chrono::{Days, Months, NaiveDate};
use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

const PERCENT: Decimal = dec!(100);

/// Upper bound on installments per plan. Fifty years of weekly payments.
pub const MAX_TENOR_COUNT: u32 = 2_600;

/// One row of a computed schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleLine {
    pub sequence: u32,
    pub due_date: NaiveDate,
    pub total: Money,
    pub principal: Money,
    pub interest: Money,
}

/// The ordered output of [`AmortizationEngine::compute_schedule`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    /// The rounded level payment every line but the last is built around.
    pub payment: Money,
    pub lines: Vec<ScheduleLine>,
}

impl Schedule {
    pub fn total_principal(&self) -> Money {
        self.lines.iter().map(|l| l.principal).sum()
    }

    pub fn total_interest(&self) -> Money {
        self.lines.iter().map(|l| l.interest).sum()
    }

    pub fn total_payable(&self) -> Money {
        self.lines.iter().map(|l| l.total).sum()
    }
}

/// Computes amortization schedules for plan terms.
///
/// The engine carries only the currency precision, so it is `Copy` and can be
/// shared freely across threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmortizationEngine {
    scale: u32,
}

impl Default for AmortizationEngine {
    fn default() -> Self {
        Self::new(DEFAULT_CURRENCY_SCALE)
    }
}

impl AmortizationEngine {
    /// Creates an engine rounding to `scale` minor-unit places.
    pub fn new(scale: u32) -> Self {
        Self { scale }
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Produces the installment schedule for `terms`.
    ///
    /// Interest is charged on the running balance at the per-period rate and
    /// rounded half-to-even. The final line takes the whole remaining balance
    /// as principal, so the principal column always sums to the principal.
    pub fn compute_schedule(&self, terms: &PlanTerms) -> Result<Schedule, InvalidPlanTerms> {
        self.validate(terms)?;

        let n = terms.tenor_count;
        let rate = per_period_rate(terms.cadence, terms.annual_rate_percent)?;
        let payment = Money::rounded(level_payment(terms.principal, rate, n)?, self.scale);

        let mut balance = terms.principal;
        let mut lines = Vec::with_capacity(n as usize);

        for sequence in 1..=n {
            let interest = Money::rounded(
                balance
                    .checked_mul(rate)
                    .ok_or_else(|| overflow("principal"))?,
                self.scale,
            );
            let principal = if sequence == n {
                Money::rounded(balance, self.scale)
            } else {
                let level = payment.value() - interest.value();
                Money::rounded(level.min(balance).max(Decimal::ZERO), self.scale)
            };
            balance -= principal.value();

            lines.push(ScheduleLine {
                sequence,
                due_date: due_date(terms.start_date, terms.cadence, sequence)?,
                total: principal + interest,
                principal,
                interest,
            });
        }

        Ok(Schedule { payment, lines })
    }

    fn validate(&self, terms: &PlanTerms) -> Result<(), InvalidPlanTerms> {
        if terms.principal <= Decimal::ZERO {
            return Err(InvalidPlanTerms::new(
                "principal",
                format!("must be greater than zero, got {}", terms.principal),
            ));
        }
        if terms.principal.round_dp(self.scale) != terms.principal {
            return Err(InvalidPlanTerms::new(
                "principal",
                format!(
                    "{} is finer than the currency minor unit ({} places)",
                    terms.principal, self.scale
                ),
            ));
        }
        if terms.annual_rate_percent < Decimal::ZERO {
            return Err(InvalidPlanTerms::new(
                "annual_rate_percent",
                format!("must not be negative, got {}", terms.annual_rate_percent),
            ));
        }
        if terms.tenor_count == 0 {
            return Err(InvalidPlanTerms::new("tenor_count", "must be at least 1"));
        }
        if terms.tenor_count > MAX_TENOR_COUNT {
            return Err(InvalidPlanTerms::new(
                "tenor_count",
                format!("must be at most {MAX_TENOR_COUNT}, got {}", terms.tenor_count),
            ));
        }
        // The last due date is the furthest out.
        due_date(terms.start_date, terms.cadence, terms.tenor_count)
            .map_err(|e| InvalidPlanTerms::new("tenor_count", e.reason))?;
        Ok(())
    }
}

fn per_period_rate(cadence: Cadence, annual_rate_percent: Decimal) -> Result<Decimal, InvalidPlanTerms> {
    (annual_rate_percent / Decimal::from(cadence.periods_per_year()))
        .checked_div(PERCENT)
        .ok_or_else(|| overflow("annual_rate_percent"))
}

/// `principal * r / (1 - (1 + r)^-n)`, or an even split when `r` is zero.
fn level_payment(principal: Decimal, rate: Decimal, n: u32) -> Result<Decimal, InvalidPlanTerms> {
    if rate.is_zero() {
        return Ok(principal / Decimal::from(n));
    }

    let growth = (Decimal::ONE + rate)
        .checked_powu(u64::from(n))
        .ok_or_else(|| overflow("tenor_count"))?;
    let discount = Decimal::ONE
        .checked_div(growth)
        .ok_or_else(|| overflow("tenor_count"))?;
    let denominator = Decimal::ONE - discount;
    if denominator.is_zero() {
        // (1 + r)^n too close to one to be distinguished at decimal precision.
        return Ok(principal / Decimal::from(n));
    }

    principal
        .checked_mul(rate)
        .and_then(|v| v.checked_div(denominator))
        .ok_or_else(|| overflow("principal"))
}

fn due_date(start: NaiveDate, cadence: Cadence, sequence: u32) -> Result<NaiveDate, InvalidPlanTerms> {
    let date = match cadence {
        Cadence::Monthly => start.checked_add_months(Months::new(sequence)),
        Cadence::Weekly => start.checked_add_days(Days::new(7 * u64::from(sequence))),
        Cadence::Daily => start.checked_add_days(Days::new(u64::from(sequence))),
    };
    date.ok_or_else(|| {
        InvalidPlanTerms::new(
            "start_date",
            format!("installment {sequence} falls outside the supported calendar"),
        )
    })
}

fn overflow(field: &'static str) -> InvalidPlanTerms {
    InvalidPlanTerms::new(field, "schedule exceeds the range of exact decimal arithmetic")
}
