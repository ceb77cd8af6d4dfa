mod common;

use bnpl_engine::config::EngineConfig;
use bnpl_engine::domain::events::DomainEvent;
use bnpl_engine::domain::installment::{InstallmentId, InstallmentStatus};
use bnpl_engine::domain::money::{Amount, Money};
use bnpl_engine::domain::plan::{PlanId, PlanStatus};
use bnpl_engine::domain::terms::{Cadence, PlanTerms};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn terms(principal: Decimal, tenor: u32) -> PlanTerms {
    PlanTerms {
        principal,
        annual_rate_percent: dec!(0),
        tenor_count: tenor,
        cadence: Cadence::Monthly,
        start_date: common::date(2025, 1, 1),
    }
}

fn amount(value: Decimal) -> Amount {
    Amount::new(value).unwrap()
}

#[tokio::test]
async fn test_full_repayment_completes_plan() {
    let engine = common::engine(EngineConfig::default());
    let created = engine
        .create_plan(common::new_plan(1, terms(dec!(300.00), 3)), common::at(2025, 1, 1))
        .await
        .unwrap();

    let mut completions = 0;
    for installment in &created.installments {
        let outcome = engine
            .record_payment(installment, amount(installment.total.value()), common::at(2025, 1, 20))
            .await
            .unwrap();
        completions += outcome
            .events
            .iter()
            .filter(|e| matches!(e, DomainEvent::PlanCompleted { .. }))
            .count();
    }

    assert_eq!(completions, 1);
    assert_eq!(engine.plan_status(PlanId(1)).await.unwrap(), PlanStatus::Completed);
    let summary = engine.summary(PlanId(1)).await.unwrap();
    assert_eq!(summary.paid, 3);
    assert_eq!(summary.paid_amount, Money::new(dec!(300.00)));
    assert_eq!(summary.outstanding, Money::ZERO);
    assert_eq!(summary.next_due_date, None);
}

#[tokio::test]
async fn test_terminal_installments_are_immutable() {
    let engine = common::engine(EngineConfig::default());
    engine
        .create_plan(common::new_plan(1, terms(dec!(200.00), 2)), common::at(2025, 1, 1))
        .await
        .unwrap();
    let id = InstallmentId::new(PlanId(1), 1);
    let paid = engine
        .pay(id, amount(dec!(100.00)), common::at(2025, 1, 15))
        .await
        .unwrap()
        .installment;

    let err = engine
        .pay(id, amount(dec!(100.00)), common::at(2025, 1, 16))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "TERMINAL_STATE_CONFLICT");
    assert!(!err.is_retryable());

    // A sweep long after the due date leaves the paid installment alone
    let report = engine.sweep_overdue(common::at(2026, 1, 1)).await.unwrap();
    assert_eq!(report.transitioned.len(), 1);
    assert_eq!(report.transitioned[0].id.sequence, 2);

    let results = engine.into_results().await.unwrap();
    assert_eq!(results[0], paid);
}

#[tokio::test]
async fn test_sweep_is_idempotent() {
    let engine = common::engine(EngineConfig::default());
    engine
        .create_plan(common::new_plan(1, terms(dec!(400.00), 4)), common::at(2025, 1, 1))
        .await
        .unwrap();
    let as_of = common::at(2025, 3, 15);

    let first = engine.sweep_overdue(as_of).await.unwrap();
    assert_eq!(first.transitioned.len(), 2);
    assert_eq!(first.events.len(), 2);

    let second = engine.sweep_overdue(as_of).await.unwrap();
    assert!(second.is_noop());
    assert!(second.events.is_empty());
    assert_eq!(second.skipped, 0);
}

#[tokio::test]
async fn test_due_today_is_not_overdue() {
    let engine = common::engine(EngineConfig::default());
    engine
        .create_plan(common::new_plan(1, terms(dec!(100.00), 1)), common::at(2025, 1, 1))
        .await
        .unwrap();

    // Due 2025-02-01; the sweep compares calendar dates, not timestamps
    assert!(engine.sweep_overdue(common::at(2025, 2, 1)).await.unwrap().is_noop());
    assert_eq!(
        engine.sweep_overdue(common::at(2025, 2, 2)).await.unwrap().transitioned.len(),
        1
    );
}

#[tokio::test]
async fn test_grace_days_delay_the_sweep() {
    let config = EngineConfig {
        grace_days: 5,
        ..EngineConfig::default()
    };
    let engine = common::engine(config);
    engine
        .create_plan(common::new_plan(1, terms(dec!(100.00), 1)), common::at(2025, 1, 1))
        .await
        .unwrap();

    let preview = engine.overdue_report(common::at(2025, 2, 6)).await.unwrap();
    assert_eq!(preview.cutoff, common::date(2025, 2, 1));
    assert!(preview.overdue_pending.is_empty());
    assert!(engine.sweep_overdue(common::at(2025, 2, 6)).await.unwrap().is_noop());

    let preview = engine.overdue_report(common::at(2025, 2, 7)).await.unwrap();
    assert_eq!(preview.overdue_pending.len(), 1);
    assert_eq!(engine.sweep_overdue(common::at(2025, 2, 7)).await.unwrap().transitioned.len(), 1);
    assert_eq!(engine.overdue_report(common::at(2025, 2, 7)).await.unwrap().already_late, 1);
}

#[tokio::test]
async fn test_overpayment_policy() {
    let strict = common::engine(EngineConfig::default());
    strict
        .create_plan(common::new_plan(1, terms(dec!(100.00), 1)), common::at(2025, 1, 1))
        .await
        .unwrap();
    let err = strict
        .pay(InstallmentId::new(PlanId(1), 1), amount(dec!(120.00)), common::at(2025, 1, 10))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "AMOUNT_MISMATCH");

    let lenient = common::engine(EngineConfig {
        allow_overpayment: true,
        ..EngineConfig::default()
    });
    lenient
        .create_plan(common::new_plan(1, terms(dec!(100.00), 1)), common::at(2025, 1, 1))
        .await
        .unwrap();
    let partial = lenient
        .pay(InstallmentId::new(PlanId(1), 1), amount(dec!(99.99)), common::at(2025, 1, 10))
        .await
        .unwrap_err();
    assert_eq!(partial.error_code(), "AMOUNT_MISMATCH");
    let outcome = lenient
        .pay(InstallmentId::new(PlanId(1), 1), amount(dec!(120.00)), common::at(2025, 1, 10))
        .await
        .unwrap();
    assert_eq!(outcome.installment.paid_amount, Some(Money::new(dec!(120.00))));
}

#[tokio::test]
async fn test_cancellation_rolls_up_and_blocks_payment() {
    let engine = common::engine(EngineConfig::default());
    engine
        .create_plan(common::new_plan(1, terms(dec!(300.00), 3)), common::at(2025, 1, 1))
        .await
        .unwrap();
    engine.sweep_overdue(common::at(2025, 2, 10)).await.unwrap();

    let outcome = engine.cancel_plan(PlanId(1), common::at(2025, 2, 11)).await.unwrap();
    assert_eq!(outcome.installments.len(), 3);
    assert!(outcome
        .installments
        .iter()
        .all(|i| i.status == InstallmentStatus::Cancelled && i.cancelled_at.is_some()));
    assert_eq!(engine.plan_status(PlanId(1)).await.unwrap(), PlanStatus::Cancelled);

    let err = engine
        .pay(InstallmentId::new(PlanId(1), 2), amount(dec!(100.00)), common::at(2025, 2, 12))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "TERMINAL_STATE_CONFLICT");

    let err = engine.cancel_plan(PlanId(1), common::at(2025, 2, 13)).await.unwrap_err();
    assert_eq!(err.error_code(), "TERMINAL_STATE_CONFLICT");
}

#[tokio::test]
async fn test_unknown_plan() {
    let engine = common::engine(EngineConfig::default());
    assert_eq!(engine.plan_status(PlanId(9)).await.unwrap_err().error_code(), "NOT_FOUND");
    assert_eq!(
        engine.cancel_plan(PlanId(9), common::at(2025, 1, 1)).await.unwrap_err().error_code(),
        "NOT_FOUND"
    );
    assert!(engine.summaries().await.unwrap().is_empty());
}
