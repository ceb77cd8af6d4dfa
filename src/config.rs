use crate::domain::amortization::AmortizationEngine;
use crate::domain::lifecycle::LifecyclePolicy;
use crate::domain::money::DEFAULT_CURRENCY_SCALE;
use clap::Args;

/// Engine settings, settable by flag or environment variable.
#[derive(Args, Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Decimal places of the currency minor unit
    #[arg(long, env = "BNPL_CURRENCY_SCALE", default_value_t = DEFAULT_CURRENCY_SCALE)]
    pub currency_scale: u32,

    /// Accept payments above the amount due
    #[arg(long, env = "BNPL_ALLOW_OVERPAYMENT")]
    pub allow_overpayment: bool,

    /// Days past the due date before an installment is swept to late
    #[arg(long, env = "BNPL_GRACE_DAYS", default_value_t = 0)]
    pub grace_days: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            currency_scale: DEFAULT_CURRENCY_SCALE,
            allow_overpayment: false,
            grace_days: 0,
        }
    }
}

impl EngineConfig {
    pub fn amortization(&self) -> AmortizationEngine {
        AmortizationEngine::new(self.currency_scale)
    }

    pub fn lifecycle_policy(&self) -> LifecyclePolicy {
        LifecyclePolicy {
            allow_overpayment: self.allow_overpayment,
            grace_days: self.grace_days,
        }
    }
}
