use crate::config::EngineConfig;
use crate::domain::amortization::{AmortizationEngine, Schedule};
use crate::domain::events::DomainEvent;
use crate::domain::installment::{Installment, InstallmentId, InstallmentStatus};
use crate::domain::lifecycle::{self, LifecyclePolicy};
use crate::domain::money::Amount;
use crate::domain::plan::{NewPlan, PaymentPlan, PlanId, PlanStatus, PlanSummary};
use crate::domain::ports::{InstallmentStoreBox, PlanStoreBox};
use crate::error::{BnplError, PaymentError, Result};
use chrono::{Days, NaiveDate, NaiveDateTime};
use tracing::{debug, info, warn};

/// A freshly opened plan with its seeded installments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanCreated {
    pub plan: PaymentPlan,
    pub schedule: Schedule,
    pub installments: Vec<Installment>,
}

/// The committed result of a payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentOutcome {
    pub installment: Installment,
    pub events: Vec<DomainEvent>,
}

/// What a sweep changed. An empty report is the normal no-op outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub as_of: NaiveDateTime,
    pub transitioned: Vec<Installment>,
    pub events: Vec<DomainEvent>,
    /// Candidates whose status changed between the scan and the write.
    pub skipped: usize,
}

impl SweepReport {
    pub fn is_noop(&self) -> bool {
        self.transitioned.is_empty()
    }
}

/// Read-only preview of a sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverdueReport {
    pub as_of: NaiveDateTime,
    pub cutoff: NaiveDate,
    /// Pending installments a sweep at `as_of` would mark late.
    pub overdue_pending: Vec<Installment>,
    pub already_late: usize,
}

/// Open installments falling due on one upcoming date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpcomingDueReport {
    pub as_of: NaiveDateTime,
    pub days_ahead: u32,
    pub target_date: NaiveDate,
    pub due: Vec<Installment>,
    /// One `PaymentDueSoon` per entry of `due`.
    pub reminders: Vec<DomainEvent>,
}

/// The committed result of a plan cancellation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancellationOutcome {
    pub installments: Vec<Installment>,
    pub event: DomainEvent,
}

/// A lifecycle event arriving from payment intake or the sweep scheduler.
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleCommand {
    Pay {
        installment: InstallmentId,
        amount: Amount,
        at: NaiveDateTime,
    },
    Sweep {
        as_of: NaiveDateTime,
    },
    Cancel {
        plan: PlanId,
        at: NaiveDateTime,
    },
}

/// The entry point for plan creation and installment lifecycle events.
///
/// `BnplEngine` computes schedules, validates transitions against the
/// lifecycle rules and commits them through the store ports. Every status
/// change is a conditional write, so the engine itself holds no locks and can
/// be shared across tasks behind an `Arc`.
pub struct BnplEngine {
    plan_store: PlanStoreBox,
    installment_store: InstallmentStoreBox,
    amortization: AmortizationEngine,
    policy: LifecyclePolicy,
}

impl BnplEngine {
    /// Creates a new `BnplEngine` instance.
    ///
    /// # Arguments
    ///
    /// * `plan_store` - The store for plan headers.
    /// * `installment_store` - The store for installments.
    /// * `config` - Currency precision and lifecycle policy.
    pub fn new(
        plan_store: PlanStoreBox,
        installment_store: InstallmentStoreBox,
        config: EngineConfig,
    ) -> Self {
        Self {
            plan_store,
            installment_store,
            amortization: config.amortization(),
            policy: config.lifecycle_policy(),
        }
    }

    pub fn policy(&self) -> &LifecyclePolicy {
        &self.policy
    }

    /// Computes the schedule for `request` and persists the plan together
    /// with one `pending` installment per schedule line.
    pub async fn create_plan(&self, request: NewPlan, created_at: NaiveDateTime) -> Result<PlanCreated> {
        let schedule = self.amortization.compute_schedule(&request.terms)?;

        let plan = PaymentPlan {
            id: request.id,
            merchant: request.merchant,
            customer: request.customer,
            terms: request.terms,
            created_at,
        };
        if !self.plan_store.insert(plan.clone()).await? {
            return Err(BnplError::DuplicatePlan(plan.id));
        }

        let installments: Vec<Installment> = schedule
            .lines
            .iter()
            .map(|line| Installment::from_schedule(plan.id, line))
            .collect();
        if let Err(e) = self.installment_store.insert_all(installments.clone()).await {
            warn!(plan = %plan.id, error = %e, "seeding installments failed, removing plan");
            self.plan_store.remove(plan.id).await?;
            return Err(e);
        }

        info!(
            plan = %plan.id,
            principal = %plan.terms.principal,
            installments = installments.len(),
            payment = %schedule.payment,
            "plan created"
        );

        Ok(PlanCreated {
            plan,
            schedule,
            installments,
        })
    }

    /// Records a payment against the caller's snapshot of an installment.
    ///
    /// The write only lands if the stored status still equals the snapshot's
    /// status and the stored amounts match the snapshot's. Otherwise the
    /// result is `ConcurrentPaymentConflict`; the caller may refetch and retry.
    pub async fn record_payment(
        &self,
        installment: &Installment,
        amount: Amount,
        at: NaiveDateTime,
    ) -> Result<PaymentOutcome> {
        let transition = lifecycle::record_payment(installment, amount, at, &self.policy)?;
        let id = transition.installment.id;

        if !self
            .installment_store
            .compare_and_set(transition.expected, transition.installment.clone())
            .await?
        {
            warn!(installment = %id, expected = %transition.expected, "payment lost a concurrent update");
            return Err(PaymentError::ConcurrentPaymentConflict {
                installment: id,
                expected: transition.expected,
            }
            .into());
        }
        debug!(installment = %id, amount = %amount.value(), "installment paid");

        let mut events: Vec<DomainEvent> = transition.event.into_iter().collect();
        let siblings = self.installment_store.for_plan(id.plan).await?;
        if let Some(completed) = lifecycle::completion_event(id.plan, &siblings, at) {
            info!(plan = %id.plan, "plan completed");
            events.push(completed);
        }

        Ok(PaymentOutcome {
            installment: transition.installment,
            events,
        })
    }

    /// Fetches the current state of `id` and records a payment against it.
    pub async fn pay(&self, id: InstallmentId, amount: Amount, at: NaiveDateTime) -> Result<PaymentOutcome> {
        let installment = self
            .installment_store
            .get(id)
            .await?
            .ok_or(BnplError::InstallmentNotFound(id))?;
        self.record_payment(&installment, amount, at).await
    }

    /// Dispatches a command and returns the events it emitted.
    pub async fn apply(&self, command: LifecycleCommand) -> Result<Vec<DomainEvent>> {
        match command {
            LifecycleCommand::Pay {
                installment,
                amount,
                at,
            } => Ok(self.pay(installment, amount, at).await?.events),
            LifecycleCommand::Sweep { as_of } => Ok(self.sweep_overdue(as_of).await?.events),
            LifecycleCommand::Cancel { plan, at } => Ok(vec![self.cancel_plan(plan, at).await?.event]),
        }
    }

    /// Marks every pending installment overdue at `as_of` as late.
    ///
    /// Running the sweep again for the same `as_of` changes nothing.
    pub async fn sweep_overdue(&self, as_of: NaiveDateTime) -> Result<SweepReport> {
        let pending = self
            .installment_store
            .with_status(InstallmentStatus::Pending)
            .await?;
        let transitions = lifecycle::sweep_overdue(as_of, &pending, &self.policy);

        let mut report = SweepReport {
            as_of,
            transitioned: Vec::with_capacity(transitions.len()),
            events: Vec::with_capacity(transitions.len()),
            skipped: 0,
        };

        for transition in transitions {
            let id = transition.installment.id;
            if self
                .installment_store
                .compare_and_set(transition.expected, transition.installment.clone())
                .await?
            {
                report.events.extend(transition.event);
                report.transitioned.push(transition.installment);
            } else {
                debug!(installment = %id, "skipped: changed during sweep");
                report.skipped += 1;
            }
        }

        if report.is_noop() {
            debug!(as_of = %as_of, "sweep found nothing overdue");
        } else {
            info!(as_of = %as_of, late = report.transitioned.len(), "sweep marked installments late");
        }

        Ok(report)
    }

    /// Lists what a sweep at `as_of` would do without writing anything.
    pub async fn overdue_report(&self, as_of: NaiveDateTime) -> Result<OverdueReport> {
        let cutoff = self.policy.overdue_cutoff(as_of);
        let overdue_pending = self
            .installment_store
            .with_status(InstallmentStatus::Pending)
            .await?
            .into_iter()
            .filter(|i| i.is_overdue(cutoff))
            .collect();
        let already_late = self
            .installment_store
            .with_status(InstallmentStatus::Late)
            .await?
            .len();

        Ok(OverdueReport {
            as_of,
            cutoff,
            overdue_pending,
            already_late,
        })
    }

    /// Collects reminder facts for pending or late installments due exactly
    /// `days_ahead` days after `as_of`. Nothing is written.
    pub async fn upcoming_due(&self, as_of: NaiveDateTime, days_ahead: u32) -> Result<UpcomingDueReport> {
        let target_date = as_of
            .date()
            .checked_add_days(Days::new(u64::from(days_ahead)))
            .ok_or_else(|| {
                BnplError::MalformedEvent(format!("{days_ahead} days after {as_of} is out of range"))
            })?;

        let mut open = self
            .installment_store
            .with_status(InstallmentStatus::Pending)
            .await?;
        open.extend(self.installment_store.with_status(InstallmentStatus::Late).await?);
        open.sort_by_key(|i| i.id);

        let reminders = lifecycle::payment_reminders(as_of, target_date, &open);
        let due: Vec<Installment> = open
            .into_iter()
            .filter(|i| i.due_date == target_date)
            .collect();
        debug!(target_date = %target_date, due = due.len(), "upcoming installments collected");

        Ok(UpcomingDueReport {
            as_of,
            days_ahead,
            target_date,
            due,
            reminders,
        })
    }

    /// Cancels every installment of a plan in one conditional batch.
    ///
    /// Plans with a paid or cancelled installment are refused with
    /// `TerminalStateConflict`.
    pub async fn cancel_plan(&self, plan_id: PlanId, at: NaiveDateTime) -> Result<CancellationOutcome> {
        if self.plan_store.get(plan_id).await?.is_none() {
            return Err(BnplError::PlanNotFound(plan_id));
        }
        let installments = self.installment_store.for_plan(plan_id).await?;
        let cancellation = lifecycle::cancel_plan(plan_id, &installments, at)?;

        let updates: Vec<(InstallmentStatus, Installment)> = cancellation
            .transitions
            .iter()
            .map(|t| (t.expected, t.installment.clone()))
            .collect();
        if !self.installment_store.compare_and_set_all(updates).await? {
            let first = &cancellation.transitions[0];
            warn!(plan = %plan_id, "cancellation lost a concurrent update");
            return Err(PaymentError::ConcurrentPaymentConflict {
                installment: first.installment.id,
                expected: first.expected,
            }
            .into());
        }

        info!(plan = %plan_id, installments = cancellation.transitions.len(), "plan cancelled");

        Ok(CancellationOutcome {
            installments: cancellation
                .transitions
                .into_iter()
                .map(|t| t.installment)
                .collect(),
            event: cancellation.event,
        })
    }

    pub async fn plan_status(&self, plan_id: PlanId) -> Result<PlanStatus> {
        if self.plan_store.get(plan_id).await?.is_none() {
            return Err(BnplError::PlanNotFound(plan_id));
        }
        let installments = self.installment_store.for_plan(plan_id).await?;
        Ok(PlanStatus::of(&installments))
    }

    pub async fn summary(&self, plan_id: PlanId) -> Result<PlanSummary> {
        let plan = self
            .plan_store
            .get(plan_id)
            .await?
            .ok_or(BnplError::PlanNotFound(plan_id))?;
        let installments = self.installment_store.for_plan(plan_id).await?;
        Ok(PlanSummary::new(&plan, &installments))
    }

    pub async fn summaries(&self) -> Result<Vec<PlanSummary>> {
        let mut summaries = Vec::new();
        for plan in self.plan_store.all_plans().await? {
            let installments = self.installment_store.for_plan(plan.id).await?;
            summaries.push(PlanSummary::new(&plan, &installments));
        }
        Ok(summaries)
    }

    /// Consumes the engine and returns the final state of all installments.
    pub async fn into_results(self) -> Result<Vec<Installment>> {
        let mut all = self.installment_store.all_installments().await?;
        all.sort_by_key(|i| i.id);
        Ok(all)
    }
}
