use crate::domain::installment::{InstallmentId, InstallmentStatus};
use crate::domain::plan::PlanId;
use miette::Diagnostic;
use rust_decimal::Decimal;
use thiserror::Error;

/// Plan terms that cannot be scheduled. Never worth retrying unchanged.
#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
#[error("invalid plan terms: {field}: {reason}")]
#[diagnostic(code(bnpl::invalid_plan_terms))]
pub struct InvalidPlanTerms {
    pub field: &'static str,
    pub reason: String,
}

impl InvalidPlanTerms {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Rejections raised by the installment lifecycle.
#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum PaymentError {
    #[error("payment of {tendered} for installment {installment} does not match the {due} due")]
    #[diagnostic(code(bnpl::amount_mismatch))]
    AmountMismatch {
        installment: InstallmentId,
        due: Decimal,
        tendered: Decimal,
    },
    #[error("installment {installment} is already {status}")]
    #[diagnostic(code(bnpl::terminal_state_conflict))]
    TerminalStateConflict {
        installment: InstallmentId,
        status: InstallmentStatus,
    },
    #[error("installment {installment} changed since it was read as {expected}; refetch and retry")]
    #[diagnostic(code(bnpl::concurrent_payment_conflict))]
    ConcurrentPaymentConflict {
        installment: InstallmentId,
        expected: InstallmentStatus,
    },
    #[error("invalid payment amount {amount}: {reason}")]
    #[diagnostic(code(bnpl::invalid_amount))]
    InvalidAmount { amount: Decimal, reason: String },
}

#[derive(Error, Diagnostic, Debug)]
pub enum BnplError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    InvalidPlanTerms(#[from] InvalidPlanTerms),
    #[error(transparent)]
    #[diagnostic(transparent)]
    Payment(#[from] PaymentError),
    #[error("plan {0} not found")]
    #[diagnostic(code(bnpl::plan_not_found))]
    PlanNotFound(PlanId),
    #[error("installment {0} not found")]
    #[diagnostic(code(bnpl::installment_not_found))]
    InstallmentNotFound(InstallmentId),
    #[error("plan {0} already exists")]
    #[diagnostic(code(bnpl::duplicate_plan))]
    DuplicatePlan(PlanId),
    #[error("malformed event: {0}")]
    #[diagnostic(code(bnpl::malformed_event))]
    MalformedEvent(String),
    #[error("CSV error: {0}")]
    #[diagnostic(code(bnpl::csv))]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    #[diagnostic(code(bnpl::io))]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    #[diagnostic(code(bnpl::serialization))]
    Serialization(#[from] serde_json::Error),
    #[error("internal error: {0}")]
    #[diagnostic(code(bnpl::internal))]
    Internal(Box<dyn std::error::Error + Send + Sync>),
    #[cfg(feature = "storage-rocksdb")]
    #[error("storage error: {0}")]
    #[diagnostic(code(bnpl::storage))]
    Storage(#[from] rocksdb::Error),
}

impl BnplError {
    /// Stable machine-readable code for API layers to map onto responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            BnplError::InvalidPlanTerms(_) => "INVALID_PLAN_TERMS",
            BnplError::Payment(e) => e.error_code(),
            BnplError::PlanNotFound(_) | BnplError::InstallmentNotFound(_) => "NOT_FOUND",
            BnplError::DuplicatePlan(_) => "DUPLICATE_PLAN",
            BnplError::MalformedEvent(_) | BnplError::Csv(_) | BnplError::Serialization(_) => {
                "MALFORMED_INPUT"
            }
            BnplError::Io(_) | BnplError::Internal(_) => "INTERNAL",
            #[cfg(feature = "storage-rocksdb")]
            BnplError::Storage(_) => "INTERNAL",
        }
    }

    /// Whether repeating the operation after refetching state can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BnplError::Payment(e) if e.is_retryable())
    }
}

impl PaymentError {
    pub fn error_code(&self) -> &'static str {
        match self {
            PaymentError::AmountMismatch { .. } => "AMOUNT_MISMATCH",
            PaymentError::TerminalStateConflict { .. } => "TERMINAL_STATE_CONFLICT",
            PaymentError::ConcurrentPaymentConflict { .. } => "CONCURRENT_PAYMENT_CONFLICT",
            PaymentError::InvalidAmount { .. } => "INVALID_AMOUNT",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, PaymentError::ConcurrentPaymentConflict { .. })
    }
}

pub type Result<T> = std::result::Result<T, BnplError>;
