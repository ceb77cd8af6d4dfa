#![allow(dead_code)]

use bnpl_engine::application::engine::BnplEngine;
use bnpl_engine::config::EngineConfig;
use bnpl_engine::domain::plan::{CustomerEmail, MerchantId, NewPlan, PlanId};
use bnpl_engine::domain::terms::{Cadence, PlanTerms};
use bnpl_engine::infrastructure::in_memory::{InMemoryInstallmentStore, InMemoryPlanStore};
use chrono::{NaiveDate, NaiveDateTime};
use rand::Rng;
use rust_decimal::Decimal;
use std::io::Error;
use std::path::Path;

pub fn engine(config: EngineConfig) -> BnplEngine {
    BnplEngine::new(
        Box::new(InMemoryPlanStore::new()),
        Box::new(InMemoryInstallmentStore::new()),
        config,
    )
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
    date(y, m, d).and_hms_opt(12, 0, 0).unwrap()
}

pub fn new_plan(id: u64, terms: PlanTerms) -> NewPlan {
    NewPlan {
        id: PlanId(id),
        merchant: MerchantId(format!("merchant-{id}")),
        customer: CustomerEmail::parse(&format!("customer{id}@example.com")).unwrap(),
        terms,
    }
}

/// Terms in the range merchants actually offer: up to 100k principal in
/// cents, 0-60% APR with two decimals, 1-60 installments.
pub fn random_terms<R: Rng>(rng: &mut R) -> PlanTerms {
    let cadence = match rng.gen_range(0..3) {
        0 => Cadence::Monthly,
        1 => Cadence::Weekly,
        _ => Cadence::Daily,
    };
    PlanTerms {
        principal: Decimal::new(rng.gen_range(1..=10_000_000), 2),
        annual_rate_percent: Decimal::new(rng.gen_range(0..=6_000), 2),
        tenor_count: rng.gen_range(1..=60),
        cadence,
        start_date: date(2024, rng.gen_range(1..=12), rng.gen_range(1..=28)),
    }
}

pub fn write_plans_csv(path: &Path, rows: &[[&str; 8]]) -> Result<(), Error> {
    let mut wtr = csv::WriterBuilder::new().from_path(path)?;
    wtr.write_record([
        "plan", "merchant", "customer", "principal", "rate", "tenor", "cadence", "start",
    ])?;
    for row in rows {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_events_csv(path: &Path, rows: &[[&str; 5]]) -> Result<(), Error> {
    let mut wtr = csv::WriterBuilder::new().from_path(path)?;
    wtr.write_record(["type", "plan", "installment", "amount", "at"])?;
    for row in rows {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}
