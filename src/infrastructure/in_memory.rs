use crate::domain::installment::{Installment, InstallmentId, InstallmentStatus};
use crate::domain::plan::{PaymentPlan, PlanId};
use crate::domain::ports::{InstallmentStore, PlanStore};
use crate::error::{BnplError, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory store for plan headers.
///
/// Uses `Arc<RwLock<HashMap<PlanId, PaymentPlan>>>` so clones share state.
#[derive(Default, Clone)]
pub struct InMemoryPlanStore {
    plans: Arc<RwLock<HashMap<PlanId, PaymentPlan>>>,
}

impl InMemoryPlanStore {
    /// Creates a new, empty in-memory plan store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PlanStore for InMemoryPlanStore {
    async fn insert(&self, plan: PaymentPlan) -> Result<bool> {
        let mut plans = self.plans.write().await;
        if plans.contains_key(&plan.id) {
            return Ok(false);
        }
        plans.insert(plan.id, plan);
        Ok(true)
    }

    async fn get(&self, plan_id: PlanId) -> Result<Option<PaymentPlan>> {
        let plans = self.plans.read().await;
        Ok(plans.get(&plan_id).cloned())
    }

    async fn remove(&self, plan_id: PlanId) -> Result<bool> {
        let mut plans = self.plans.write().await;
        Ok(plans.remove(&plan_id).is_some())
    }

    async fn all_plans(&self) -> Result<Vec<PaymentPlan>> {
        let plans = self.plans.read().await;
        let mut all: Vec<PaymentPlan> = plans.values().cloned().collect();
        all.sort_by_key(|p| p.id);
        Ok(all)
    }
}

/// A thread-safe in-memory store for installments.
///
/// The map is ordered by `(plan, sequence)`, so per-plan reads are range
/// scans. Conditional writes hold the write lock across compare and swap,
/// which is what makes them atomic.
#[derive(Default, Clone)]
pub struct InMemoryInstallmentStore {
    installments: Arc<RwLock<BTreeMap<InstallmentId, Installment>>>,
}

impl InMemoryInstallmentStore {
    /// Creates a new, empty in-memory installment store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InstallmentStore for InMemoryInstallmentStore {
    async fn insert_all(&self, installments: Vec<Installment>) -> Result<()> {
        let mut stored = self.installments.write().await;
        for installment in installments {
            stored.insert(installment.id, installment);
        }
        Ok(())
    }

    async fn get(&self, id: InstallmentId) -> Result<Option<Installment>> {
        let stored = self.installments.read().await;
        Ok(stored.get(&id).cloned())
    }

    async fn for_plan(&self, plan_id: PlanId) -> Result<Vec<Installment>> {
        let stored = self.installments.read().await;
        let range = InstallmentId::new(plan_id, u32::MIN)..=InstallmentId::new(plan_id, u32::MAX);
        Ok(stored.range(range).map(|(_, i)| i.clone()).collect())
    }

    async fn with_status(&self, status: InstallmentStatus) -> Result<Vec<Installment>> {
        let stored = self.installments.read().await;
        Ok(stored
            .values()
            .filter(|i| i.status == status)
            .cloned()
            .collect())
    }

    async fn all_installments(&self) -> Result<Vec<Installment>> {
        let stored = self.installments.read().await;
        Ok(stored.values().cloned().collect())
    }

    async fn compare_and_set(
        &self,
        expected: InstallmentStatus,
        updated: Installment,
    ) -> Result<bool> {
        let mut stored = self.installments.write().await;
        let current = stored
            .get_mut(&updated.id)
            .ok_or(BnplError::InstallmentNotFound(updated.id))?;
        if current.status != expected || !current.same_schedule(&updated) {
            return Ok(false);
        }
        current.apply_lifecycle(&updated);
        Ok(true)
    }

    async fn compare_and_set_all(
        &self,
        updates: Vec<(InstallmentStatus, Installment)>,
    ) -> Result<bool> {
        let mut stored = self.installments.write().await;
        for (expected, updated) in &updates {
            let current = stored
                .get(&updated.id)
                .ok_or(BnplError::InstallmentNotFound(updated.id))?;
            if current.status != *expected || !current.same_schedule(updated) {
                return Ok(false);
            }
        }
        for (_, updated) in &updates {
            if let Some(current) = stored.get_mut(&updated.id) {
                current.apply_lifecycle(updated);
            }
        }
        Ok(true)
    }
}
