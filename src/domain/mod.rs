//! Domain layer: value objects, the amortization engine, the installment
//! state machine and the ports the application layer persists through.

pub mod amortization;
pub mod events;
pub mod installment;
pub mod lifecycle;
pub mod money;
pub mod plan;
pub mod ports;
pub mod terms;
