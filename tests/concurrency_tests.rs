mod common;

use bnpl_engine::config::EngineConfig;
use bnpl_engine::domain::installment::{InstallmentId, InstallmentStatus};
use bnpl_engine::domain::money::Amount;
use bnpl_engine::domain::plan::PlanId;
use bnpl_engine::domain::terms::{Cadence, PlanTerms};
use bnpl_engine::error::{BnplError, PaymentError};
use rust_decimal_macros::dec;
use std::sync::Arc;

fn terms(tenor: u32) -> PlanTerms {
    PlanTerms {
        principal: dec!(100.00) * rust_decimal::Decimal::from(tenor),
        annual_rate_percent: dec!(0),
        tenor_count: tenor,
        cadence: Cadence::Monthly,
        start_date: common::date(2025, 1, 1),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_payments_on_one_snapshot() {
    let engine = Arc::new(common::engine(EngineConfig::default()));
    let created = engine
        .create_plan(common::new_plan(1, terms(1)), common::at(2025, 1, 1))
        .await
        .unwrap();
    let snapshot = created.installments[0].clone();
    let amount = Amount::new(dec!(100.00)).unwrap();

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let snapshot = snapshot.clone();
            tokio::spawn(async move {
                engine
                    .record_payment(&snapshot, amount, common::at(2025, 1, 20))
                    .await
            })
        })
        .collect();

    let mut paid = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(outcome) => {
                assert_eq!(outcome.installment.status, InstallmentStatus::Paid);
                paid += 1;
            }
            Err(BnplError::Payment(PaymentError::ConcurrentPaymentConflict { installment, expected })) => {
                assert_eq!(installment, snapshot.id);
                assert_eq!(expected, InstallmentStatus::Pending);
                conflicts += 1;
            }
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!((paid, conflicts), (1, 1));

    // A retry after refetching sees the terminal state
    let err = engine
        .pay(snapshot.id, amount, common::at(2025, 1, 21))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "TERMINAL_STATE_CONFLICT");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_payments_racing_a_sweep_never_lose_a_write() {
    let engine = Arc::new(common::engine(EngineConfig::default()));
    let tenor = 24;
    engine
        .create_plan(common::new_plan(1, terms(tenor)), common::at(2025, 1, 1))
        .await
        .unwrap();
    let as_of = common::at(2030, 1, 1);

    let sweeper = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.sweep_overdue(as_of).await })
    };
    let payers: Vec<_> = (1..=tenor)
        .map(|sequence| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move {
                let id = InstallmentId::new(PlanId(1), sequence);
                let amount = Amount::new(dec!(100.00)).unwrap();
                loop {
                    match engine.pay(id, amount, as_of).await {
                        Err(e) if e.is_retryable() => continue,
                        other => return other,
                    }
                }
            })
        })
        .collect();

    let report = sweeper.await.unwrap().unwrap();
    for payer in payers {
        payer.await.unwrap().unwrap();
    }

    // Whichever side won each race, every installment ends paid
    let summary = engine.summary(PlanId(1)).await.unwrap();
    assert_eq!(summary.paid, tenor as usize);
    assert_eq!(summary.late, 0);
    assert!(report.transitioned.len() + report.skipped <= tenor as usize);
}
