use super::installment::{Installment, InstallmentId, InstallmentStatus};
use super::plan::{PaymentPlan, PlanId};
use crate::error::Result;
use async_trait::async_trait;

/// Storage for plan headers (terms and parties). Plans are write-once.
#[async_trait]
pub trait PlanStore: Send + Sync {
    /// Inserts a new plan. Returns `false` without writing if the id is taken.
    async fn insert(&self, plan: PaymentPlan) -> Result<bool>;
    async fn get(&self, plan_id: PlanId) -> Result<Option<PaymentPlan>>;
    /// Deletes a plan header. Only used to undo a creation whose
    /// installments could not be written.
    async fn remove(&self, plan_id: PlanId) -> Result<bool>;
    async fn all_plans(&self) -> Result<Vec<PaymentPlan>>;
}

/// Storage for installments.
///
/// Every status change goes through a conditional write so that two
/// callers working from the same snapshot cannot both succeed.
#[async_trait]
pub trait InstallmentStore: Send + Sync {
    /// Seeds the installments of a freshly created plan.
    async fn insert_all(&self, installments: Vec<Installment>) -> Result<()>;
    async fn get(&self, id: InstallmentId) -> Result<Option<Installment>>;
    /// Installments of one plan, ordered by sequence.
    async fn for_plan(&self, plan_id: PlanId) -> Result<Vec<Installment>>;
    async fn with_status(&self, status: InstallmentStatus) -> Result<Vec<Installment>>;
    async fn all_installments(&self) -> Result<Vec<Installment>>;

    /// Moves the stored installment to the status and stamps of `updated`
    /// only if its current status equals `expected` and its schedule matches
    /// `updated`. Scheduled amounts are never overwritten. Returns whether
    /// the write happened.
    async fn compare_and_set(&self, expected: InstallmentStatus, updated: Installment)
    -> Result<bool>;

    /// Applies every `(expected, updated)` pair under the same rules, or
    /// none of them if any pair fails its check.
    async fn compare_and_set_all(
        &self,
        updates: Vec<(InstallmentStatus, Installment)>,
    ) -> Result<bool>;
}

pub type PlanStoreBox = Box<dyn PlanStore>;
pub type InstallmentStoreBox = Box<dyn InstallmentStore>;
