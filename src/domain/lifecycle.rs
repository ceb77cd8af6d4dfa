//! Installment state machine.
//!
//! ```text
//! pending --pay--> paid
//! pending --sweep--> late --pay--> paid
//! pending | late --cancel--> cancelled
//! ```
//!
//! Every function here is pure: it takes a snapshot and returns the
//! transitions to apply. Applying them atomically is the store's job, using
//! each transition's `expected` status as the compare-and-set guard.

use super::events::DomainEvent;
use super::installment::{Installment, InstallmentStatus};
use super::money::{Amount, Money};
use super::plan::{PlanId, PlanStatus};
use crate::error::PaymentError;
use chrono::{Days, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Rules the lifecycle applies on top of the state table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LifecyclePolicy {
    /// Accept payments larger than the amount due. Partial payments are
    /// never accepted.
    pub allow_overpayment: bool,
    /// Days past the due date before a sweep marks an installment late.
    pub grace_days: u32,
}

impl LifecyclePolicy {
    /// Installments due strictly before this date are overdue at `as_of`.
    pub fn overdue_cutoff(&self, as_of: NaiveDateTime) -> NaiveDate {
        let today = as_of.date();
        today
            .checked_sub_days(Days::new(u64::from(self.grace_days)))
            .unwrap_or(NaiveDate::MIN)
    }
}

/// A single installment state change, guarded by the status it was computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub expected: InstallmentStatus,
    pub installment: Installment,
    pub event: Option<DomainEvent>,
}

/// The all-or-nothing result of cancelling a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanCancellation {
    pub transitions: Vec<Transition>,
    pub event: DomainEvent,
}

/// Applies a payment to `installment`.
///
/// The amount must equal the total due, or exceed it when the policy allows
/// overpayment. Terminal installments are refused without being touched.
pub fn record_payment(
    installment: &Installment,
    amount: Amount,
    at: NaiveDateTime,
    policy: &LifecyclePolicy,
) -> Result<Transition, PaymentError> {
    if installment.status.is_terminal() {
        return Err(PaymentError::TerminalStateConflict {
            installment: installment.id,
            status: installment.status,
        });
    }

    let tendered = Money::from(amount);
    let accepted = tendered == installment.total
        || (policy.allow_overpayment && tendered > installment.total);
    if !accepted {
        return Err(PaymentError::AmountMismatch {
            installment: installment.id,
            due: installment.total.value(),
            tendered: tendered.value(),
        });
    }

    let mut paid = installment.clone();
    paid.status = InstallmentStatus::Paid;
    paid.paid_at = Some(at);
    paid.paid_amount = Some(tendered);

    Ok(Transition {
        expected: installment.status,
        event: Some(DomainEvent::InstallmentPaid {
            installment: installment.id,
            amount: tendered,
            paid_at: at,
        }),
        installment: paid,
    })
}

/// Marks `installment` late if it is still pending and overdue at `as_of`.
pub fn mark_late(
    installment: &Installment,
    as_of: NaiveDateTime,
    policy: &LifecyclePolicy,
) -> Option<Transition> {
    if !installment.is_overdue(policy.overdue_cutoff(as_of)) {
        return None;
    }

    let mut late = installment.clone();
    late.status = InstallmentStatus::Late;

    Some(Transition {
        expected: InstallmentStatus::Pending,
        event: Some(DomainEvent::InstallmentBecameLate {
            installment: installment.id,
            due_date: installment.due_date,
            as_of,
        }),
        installment: late,
    })
}

/// Computes the late transitions for a batch of installments.
///
/// Only `pending` installments due before the cutoff move, so a second run
/// over the applied result yields nothing.
pub fn sweep_overdue(
    as_of: NaiveDateTime,
    installments: &[Installment],
    policy: &LifecyclePolicy,
) -> Vec<Transition> {
    installments
        .iter()
        .filter_map(|i| mark_late(i, as_of, policy))
        .collect()
}

/// Cancels every installment of a plan.
///
/// A plan with any paid or cancelled installment is refused as a whole:
/// there is no partial cancellation of an unpaid remainder.
pub fn cancel_plan(
    plan: PlanId,
    installments: &[Installment],
    at: NaiveDateTime,
) -> Result<PlanCancellation, PaymentError> {
    let mut ordered: Vec<&Installment> = installments.iter().collect();
    ordered.sort_by_key(|i| i.id.sequence);

    if let Some(terminal) = ordered.iter().find(|i| i.status.is_terminal()) {
        return Err(PaymentError::TerminalStateConflict {
            installment: terminal.id,
            status: terminal.status,
        });
    }

    let transitions: Vec<Transition> = ordered
        .into_iter()
        .map(|i| {
            let mut cancelled = i.clone();
            cancelled.status = InstallmentStatus::Cancelled;
            cancelled.cancelled_at = Some(at);
            Transition {
                expected: i.status,
                installment: cancelled,
                event: None,
            }
        })
        .collect();

    Ok(PlanCancellation {
        event: DomainEvent::PlanCancelled {
            plan,
            cancelled_at: at,
            installments_cancelled: transitions.len(),
        },
        transitions,
    })
}

/// `PaymentDueSoon` facts for open installments due on `target_date`.
pub fn payment_reminders(
    as_of: NaiveDateTime,
    target_date: NaiveDate,
    installments: &[Installment],
) -> Vec<DomainEvent> {
    installments
        .iter()
        .filter(|i| !i.status.is_terminal() && i.due_date == target_date)
        .map(|i| DomainEvent::PaymentDueSoon {
            installment: i.id,
            due_date: i.due_date,
            amount_due: i.total,
            as_of,
        })
        .collect()
}

/// Returns `PlanCompleted` when every installment of the plan is paid.
pub fn completion_event(
    plan: PlanId,
    installments: &[Installment],
    at: NaiveDateTime,
) -> Option<DomainEvent> {
    (PlanStatus::of(installments) == PlanStatus::Completed).then_some(DomainEvent::PlanCompleted {
        plan,
        completed_at: at,
    })
}
