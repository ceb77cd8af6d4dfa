use super::installment::InstallmentId;
use super::money::Money;
use super::plan::PlanId;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Facts emitted by lifecycle transitions.
///
/// Events are plain values for a notification or reporting collaborator to
/// consume; nothing in this crate delivers them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    InstallmentBecameLate {
        installment: InstallmentId,
        due_date: NaiveDate,
        as_of: NaiveDateTime,
    },
    PaymentDueSoon {
        installment: InstallmentId,
        due_date: NaiveDate,
        amount_due: Money,
        as_of: NaiveDateTime,
    },
    InstallmentPaid {
        installment: InstallmentId,
        amount: Money,
        paid_at: NaiveDateTime,
    },
    PlanCompleted {
        plan: PlanId,
        completed_at: NaiveDateTime,
    },
    PlanCancelled {
        plan: PlanId,
        cancelled_at: NaiveDateTime,
        installments_cancelled: usize,
    },
}

impl DomainEvent {
    pub fn plan(&self) -> PlanId {
        match self {
            DomainEvent::InstallmentBecameLate { installment, .. }
            | DomainEvent::PaymentDueSoon { installment, .. }
            | DomainEvent::InstallmentPaid { installment, .. } => installment.plan,
            DomainEvent::PlanCompleted { plan, .. } | DomainEvent::PlanCancelled { plan, .. } => {
                *plan
            }
        }
    }
}
