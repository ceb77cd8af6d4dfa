use crate::domain::installment::{Installment, InstallmentId, InstallmentStatus};
use crate::domain::plan::{PaymentPlan, PlanId};
use crate::domain::ports::{InstallmentStore, PlanStore};
use crate::error::{BnplError, Result};
use async_trait::async_trait;
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options, WriteBatch,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for storing plan headers.
pub const CF_PLANS: &str = "plans";
/// Column Family for storing installments.
pub const CF_INSTALLMENTS: &str = "installments";

/// A persistent store implementation using RocksDB.
///
/// Plans are keyed by the big-endian plan id and installments by
/// `plan id ++ sequence`, so a plan's installments are one contiguous,
/// ordered key range.
///
/// Every write goes through `write_lock`, which turns the read-compare-write
/// of a conditional update into a single critical section. Clones share both
/// the database handle and the lock.
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families ("plans" and "installments") exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_plans = ColumnFamilyDescriptor::new(CF_PLANS, Options::default());
        let cf_installments = ColumnFamilyDescriptor::new(CF_INSTALLMENTS, Options::default());

        let db = DB::open_cf_descriptors(&opts, path, vec![cf_plans, cf_installments])?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            BnplError::Internal(Box::new(std::io::Error::other(format!(
                "{name} column family not found"
            ))))
        })
    }

    fn read<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_pinned_cf(cf, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Decodes every value whose key starts with `prefix`.
    fn scan<T: DeserializeOwned>(&self, cf_name: &str, prefix: &[u8]) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let mut values = Vec::new();
        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(prefix, Direction::Forward));

        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            values.push(serde_json::from_slice(&value)?);
        }

        Ok(values)
    }
}

fn plan_key(plan_id: PlanId) -> [u8; 8] {
    plan_id.0.to_be_bytes()
}

fn installment_key(id: InstallmentId) -> [u8; 12] {
    let mut key = [0u8; 12];
    key[..8].copy_from_slice(&id.plan.0.to_be_bytes());
    key[8..].copy_from_slice(&id.sequence.to_be_bytes());
    key
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

#[async_trait]
impl PlanStore for RocksDBStore {
    async fn insert(&self, plan: PaymentPlan) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let cf = self.cf(CF_PLANS)?;
        let key = plan_key(plan.id);

        if self.db.get_pinned_cf(cf, key)?.is_some() {
            return Ok(false);
        }
        self.db.put_cf(cf, key, encode(&plan)?)?;

        Ok(true)
    }

    async fn get(&self, plan_id: PlanId) -> Result<Option<PaymentPlan>> {
        self.read(CF_PLANS, &plan_key(plan_id))
    }

    async fn remove(&self, plan_id: PlanId) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let cf = self.cf(CF_PLANS)?;
        let key = plan_key(plan_id);

        if self.db.get_pinned_cf(cf, key)?.is_none() {
            return Ok(false);
        }
        self.db.delete_cf(cf, key)?;

        Ok(true)
    }

    async fn all_plans(&self) -> Result<Vec<PaymentPlan>> {
        self.scan(CF_PLANS, &[])
    }
}

#[async_trait]
impl InstallmentStore for RocksDBStore {
    async fn insert_all(&self, installments: Vec<Installment>) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let cf = self.cf(CF_INSTALLMENTS)?;

        let mut batch = WriteBatch::default();
        for installment in &installments {
            batch.put_cf(cf, installment_key(installment.id), encode(installment)?);
        }
        self.db.write(batch)?;

        Ok(())
    }

    async fn get(&self, id: InstallmentId) -> Result<Option<Installment>> {
        self.read(CF_INSTALLMENTS, &installment_key(id))
    }

    async fn for_plan(&self, plan_id: PlanId) -> Result<Vec<Installment>> {
        self.scan(CF_INSTALLMENTS, &plan_key(plan_id))
    }

    async fn with_status(&self, status: InstallmentStatus) -> Result<Vec<Installment>> {
        let all: Vec<Installment> = self.scan(CF_INSTALLMENTS, &[])?;
        Ok(all.into_iter().filter(|i| i.status == status).collect())
    }

    async fn all_installments(&self) -> Result<Vec<Installment>> {
        self.scan(CF_INSTALLMENTS, &[])
    }

    async fn compare_and_set(
        &self,
        expected: InstallmentStatus,
        updated: Installment,
    ) -> Result<bool> {
        let _guard = self.write_lock.lock().await;

        let mut current: Installment = self
            .read(CF_INSTALLMENTS, &installment_key(updated.id))?
            .ok_or(BnplError::InstallmentNotFound(updated.id))?;
        if current.status != expected || !current.same_schedule(&updated) {
            return Ok(false);
        }
        current.apply_lifecycle(&updated);

        let cf = self.cf(CF_INSTALLMENTS)?;
        self.db
            .put_cf(cf, installment_key(current.id), encode(&current)?)?;

        Ok(true)
    }

    async fn compare_and_set_all(
        &self,
        updates: Vec<(InstallmentStatus, Installment)>,
    ) -> Result<bool> {
        let _guard = self.write_lock.lock().await;

        let mut staged = Vec::with_capacity(updates.len());
        for (expected, updated) in &updates {
            let mut current: Installment = self
                .read(CF_INSTALLMENTS, &installment_key(updated.id))?
                .ok_or(BnplError::InstallmentNotFound(updated.id))?;
            if current.status != *expected || !current.same_schedule(updated) {
                return Ok(false);
            }
            current.apply_lifecycle(updated);
            staged.push(current);
        }

        let cf = self.cf(CF_INSTALLMENTS)?;
        let mut batch = WriteBatch::default();
        for installment in &staged {
            batch.put_cf(cf, installment_key(installment.id), encode(installment)?);
        }
        self.db.write(batch)?;

        Ok(true)
    }
}
