//! Operation Processor
//!
//! Validates currency operations against ledger state and turns accepted
//! ones into state merge values.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │               Consensus pipeline                     │
//! │        PreProcess (per round) → Process              │
//! └────────────────────┬────────────────────────────────┘
//!                      │ Operation + StateReader
//!                      ↓
//! ┌─────────────────────────────────────────────────────┐
//! │                 Processors                           │
//! │  currency-register (pooled) | genesis-currencies     │
//! └────────────────────┬────────────────────────────────┘
//!                      │ Vec<StateMergeValue>
//!                      ↓
//! ┌─────────────────────────────────────────────────────┐
//! │                 Ledger State                         │
//! │  Create / Add / Replace merge, all or nothing        │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Outcomes
//!
//! - **Accepted**: PreProcess passed, or Process produced merge values
//! - **Rejected**: the operation is invalid for this round, see
//!   [`RejectionReason`]
//! - **Error**: processing failed; [`Error::StateUnavailable`] is retryable
//!
//! # Invariants
//!
//! - PreProcess checks run in a fixed order and stop at the first failure
//! - A suffrage node counts at most once towards the threshold
//! - Pooled processors carry nothing from one operation to the next

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod config;
pub mod currency_register;
pub mod error;
pub mod genesis_currencies;
pub mod metrics;
pub mod operation;
pub mod pool;
pub mod precondition;
pub mod processor;
pub mod suffrage;
pub mod zero_account;

// Re-exports
pub use config::Config;
pub use currency_register::{CurrencyRegisterProcessor, CurrencyRegisterProcessorFactory};
pub use error::{Error, RejectionReason, Result, StateCheckError};
pub use genesis_currencies::GenesisCurrenciesProcessor;
pub use metrics::Metrics;
pub use operation::{
    CurrencyRegister, CurrencyRegisterFact, FactHash, GenesisCurrencies, GenesisCurrenciesFact,
    NetworkId, NodeSign, Operation, OperationKind,
};
pub use pool::{Pooled, ProcessorPool, Reset};
pub use processor::{OperationProcessor, Outcome, Processors};
pub use suffrage::{QuorumError, Suffrage, Threshold};
