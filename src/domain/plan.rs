use super::installment::{Installment, InstallmentStatus};
use super::money::Money;
use super::terms::PlanTerms;
use crate::error::InvalidPlanTerms;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque plan identifier assigned by the caller.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Clone, Copy)]
#[serde(transparent)]
pub struct PlanId(pub u64);

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Opaque merchant reference.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Clone)]
#[serde(transparent)]
pub struct MerchantId(pub String);

/// Customer reference. Only the shape of an email address is checked.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Clone)]
#[serde(transparent)]
pub struct CustomerEmail(String);

impl CustomerEmail {
    pub fn parse(raw: &str) -> Result<Self, InvalidPlanTerms> {
        let raw = raw.trim();
        let shaped = match raw.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && !domain.contains('@')
                    && domain.contains('.')
                    && !domain.starts_with('.')
                    && !domain.ends_with('.')
            }
            None => false,
        };
        if shaped {
            Ok(Self(raw.to_string()))
        } else {
            Err(InvalidPlanTerms::new(
                "customer",
                format!("'{raw}' is not an email address"),
            ))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CustomerEmail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An already-authorized request to open a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPlan {
    pub id: PlanId,
    pub merchant: MerchantId,
    pub customer: CustomerEmail,
    pub terms: PlanTerms,
}

/// A financing agreement. Terms never change after creation and the status
/// is not stored here; see [`PlanStatus::of`].
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct PaymentPlan {
    pub id: PlanId,
    pub merchant: MerchantId,
    pub customer: CustomerEmail,
    pub terms: PlanTerms,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    Active,
    Completed,
    Cancelled,
}

impl PlanStatus {
    /// Derives the plan status from its installments.
    pub fn of(installments: &[Installment]) -> Self {
        if installments
            .iter()
            .any(|i| i.status == InstallmentStatus::Cancelled)
        {
            PlanStatus::Cancelled
        } else if !installments.is_empty()
            && installments
                .iter()
                .all(|i| i.status == InstallmentStatus::Paid)
        {
            PlanStatus::Completed
        } else {
            PlanStatus::Active
        }
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlanStatus::Active => "active",
            PlanStatus::Completed => "completed",
            PlanStatus::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Read-side projection of a plan and its installments.
#[derive(Debug, Serialize, PartialEq, Eq, Clone)]
pub struct PlanSummary {
    pub plan: PlanId,
    pub customer: CustomerEmail,
    pub status: PlanStatus,
    pub installments: usize,
    pub paid: usize,
    pub pending: usize,
    pub late: usize,
    pub cancelled: usize,
    pub paid_amount: Money,
    pub outstanding: Money,
    pub next_due_date: Option<NaiveDate>,
}

impl PlanSummary {
    pub fn new(plan: &PaymentPlan, installments: &[Installment]) -> Self {
        let count = |status: InstallmentStatus| installments.iter().filter(|i| i.status == status).count();
        let paid_amount: Money = installments.iter().filter_map(|i| i.paid_amount).sum();
        let outstanding: Money = installments
            .iter()
            .filter(|i| !i.status.is_terminal())
            .map(|i| i.total)
            .sum();
        let next_due_date = installments
            .iter()
            .filter(|i| !i.status.is_terminal())
            .map(|i| i.due_date)
            .min();

        Self {
            plan: plan.id,
            customer: plan.customer.clone(),
            status: PlanStatus::of(installments),
            installments: installments.len(),
            paid: count(InstallmentStatus::Paid),
            pending: count(InstallmentStatus::Pending),
            late: count(InstallmentStatus::Late),
            cancelled: count(InstallmentStatus::Cancelled),
            paid_amount,
            outstanding,
            next_due_date,
        }
    }
}
