use super::amortization::ScheduleLine;
use super::money::Money;
use super::plan::PlanId;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum InstallmentStatus {
    Pending,
    Paid,
    Late,
    Cancelled,
}

impl InstallmentStatus {
    /// `Paid` and `Cancelled` refuse every further transition.
    pub fn is_terminal(self) -> bool {
        matches!(self, InstallmentStatus::Paid | InstallmentStatus::Cancelled)
    }
}

impl fmt::Display for InstallmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InstallmentStatus::Pending => "pending",
            InstallmentStatus::Paid => "paid",
            InstallmentStatus::Late => "late",
            InstallmentStatus::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Identifies an installment by its plan and its 1-based position.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Clone, Copy)]
pub struct InstallmentId {
    pub plan: PlanId,
    pub sequence: u32,
}

impl InstallmentId {
    pub fn new(plan: PlanId, sequence: u32) -> Self {
        Self { plan, sequence }
    }
}

impl fmt::Display for InstallmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.plan, self.sequence)
    }
}

/// One scheduled payment line of a plan.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Installment {
    pub id: InstallmentId,
    pub due_date: NaiveDate,
    /// Amount due; always `principal + interest`.
    pub total: Money,
    pub principal: Money,
    pub interest: Money,
    pub status: InstallmentStatus,
    /// Set only on the transition to `Paid`.
    pub paid_at: Option<NaiveDateTime>,
    /// Set only on the transition to `Paid`.
    pub paid_amount: Option<Money>,
    /// Set only on the transition to `Cancelled`.
    pub cancelled_at: Option<NaiveDateTime>,
}

impl Installment {
    /// Seeds a `Pending` installment from a schedule line.
    pub fn from_schedule(plan: PlanId, line: &ScheduleLine) -> Self {
        Self {
            id: InstallmentId::new(plan, line.sequence),
            due_date: line.due_date,
            total: line.total,
            principal: line.principal,
            interest: line.interest,
            status: InstallmentStatus::Pending,
            paid_at: None,
            paid_amount: None,
            cancelled_at: None,
        }
    }

    pub fn is_overdue(&self, cutoff: NaiveDate) -> bool {
        self.status == InstallmentStatus::Pending && self.due_date < cutoff
    }

    /// Whether `other` was scheduled with the same due date and amounts.
    pub fn same_schedule(&self, other: &Installment) -> bool {
        self.id == other.id
            && self.due_date == other.due_date
            && self.total == other.total
            && self.principal == other.principal
            && self.interest == other.interest
    }

    /// Copies status and the transition stamps from `other`, leaving the
    /// scheduled fields untouched.
    pub fn apply_lifecycle(&mut self, other: &Installment) {
        self.status = other.status;
        self.paid_at = other.paid_at;
        self.paid_amount = other.paid_amount;
        self.cancelled_at = other.cancelled_at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line() -> ScheduleLine {
        ScheduleLine {
            sequence: 2,
            due_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            total: Money::new(dec!(106.62)),
            principal: Money::new(dec!(95.57)),
            interest: Money::new(dec!(11.05)),
        }
    }

    #[test]
    fn test_apply_lifecycle_keeps_schedule() {
        let mut stored = Installment::from_schedule(PlanId(1), &line());
        let mut doctored = stored.clone();
        doctored.total = Money::new(dec!(1.00));
        doctored.principal = Money::new(dec!(1.00));
        doctored.status = InstallmentStatus::Paid;
        doctored.paid_amount = Some(Money::new(dec!(1.00)));

        assert!(!stored.same_schedule(&doctored));
        stored.apply_lifecycle(&doctored);
        assert_eq!(stored.status, InstallmentStatus::Paid);
        assert_eq!(stored.total, Money::new(dec!(106.62)));
        assert_eq!(stored.principal, Money::new(dec!(95.57)));
    }

    #[test]
    fn test_seeded_installment_is_pending() {
        let installment = Installment::from_schedule(PlanId(7), &line());
        assert_eq!(installment.id, InstallmentId::new(PlanId(7), 2));
        assert_eq!(installment.status, InstallmentStatus::Pending);
        assert_eq!(installment.principal + installment.interest, installment.total);
        assert!(installment.paid_at.is_none());
        assert!(installment.paid_amount.is_none());
    }

    #[test]
    fn test_is_overdue_is_strict() {
        let installment = Installment::from_schedule(PlanId(1), &line());
        assert!(!installment.is_overdue(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()));
        assert!(installment.is_overdue(NaiveDate::from_ymd_opt(2025, 3, 2).unwrap()));
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(InstallmentStatus::Paid.is_terminal());
        assert!(InstallmentStatus::Cancelled.is_terminal());
        assert!(!InstallmentStatus::Pending.is_terminal());
        assert!(!InstallmentStatus::Late.is_terminal());
    }

    #[test]
    fn test_id_display() {
        assert_eq!(InstallmentId::new(PlanId(12), 3).to_string(), "12#3");
    }
}
