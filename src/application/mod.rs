//! Application layer orchestrating the domain over the store ports.
//!
//! This module defines the `BnplEngine`, the entry point for opening plans
//! and driving installments through payments, sweeps and cancellations.
//! Concurrency control is delegated to the stores' conditional writes.

pub mod engine;
