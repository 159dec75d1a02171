//! Processor trait and operation dispatch
//!
//! The consensus pipeline calls [`Processors::pre_process`] for every
//! candidate round and, once accepted, [`Processors::process`] to obtain the
//! merge values. Each call borrows a processor for exactly that operation and
//! returns it afterwards.

use crate::currency_register::CurrencyRegisterProcessorFactory;
use crate::genesis_currencies::GenesisCurrenciesProcessor;
use crate::metrics::Metrics;
use crate::operation::{NetworkId, Operation, OperationKind};
use crate::{Config, RejectionReason, Result};
use ledger_state::{Height, StateMergeValue, StateReader};
use std::time::Instant;
use tracing::warn;

/// Result of a pre-process or process step that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// Operation accepted
    Accepted(T),
    /// Operation rejected for this round
    Rejected(RejectionReason),
}

impl<T> Outcome<T> {
    /// Whether the operation was accepted
    pub fn is_accepted(&self) -> bool {
        matches!(self, Outcome::Accepted(_))
    }

    /// Rejection reason, if rejected
    pub fn rejection(&self) -> Option<&RejectionReason> {
        match self {
            Outcome::Accepted(_) => None,
            Outcome::Rejected(reason) => Some(reason),
        }
    }

    /// Accepted value, if accepted
    pub fn accepted(self) -> Option<T> {
        match self {
            Outcome::Accepted(value) => Some(value),
            Outcome::Rejected(_) => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Outcome::Accepted(_) => "accepted",
            Outcome::Rejected(_) => "rejected",
        }
    }
}

/// Two-phase processor of one operation type
pub trait OperationProcessor {
    /// Operation handled
    type Operation;

    /// Validate the operation against current state
    fn pre_process(&self, op: &Self::Operation, state: &dyn StateReader) -> Result<Outcome<()>>;

    /// Compute the merge values of an accepted operation
    fn process(
        &self,
        op: &Self::Operation,
        state: &dyn StateReader,
    ) -> Result<Outcome<Vec<StateMergeValue>>>;
}

/// Dispatches operations to their processors
#[derive(Debug)]
pub struct Processors {
    currency_register: CurrencyRegisterProcessorFactory,
    metrics: Metrics,
}

impl Processors {
    /// Create from configuration
    pub fn new(config: &Config) -> Result<Self> {
        let currency_register = CurrencyRegisterProcessorFactory::new(
            NetworkId::new(&config.network_id),
            config.threshold()?,
            config.pool.max_idle,
        );

        Ok(Self {
            currency_register,
            metrics: Metrics::new()?,
        })
    }

    /// Currency register factory
    pub fn currency_register(&self) -> &CurrencyRegisterProcessorFactory {
        &self.currency_register
    }

    /// Metrics
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Validate `op` at `height`
    pub fn pre_process(
        &self,
        height: Height,
        op: &Operation,
        state: &dyn StateReader,
    ) -> Result<Outcome<()>> {
        let outcome = match op {
            Operation::CurrencyRegister(op) => {
                let processor = self.currency_register.new_processor(height, state)?;
                let outcome = processor.pre_process(op, state);
                processor.close();
                outcome
            }
            Operation::GenesisCurrencies(op) => {
                GenesisCurrenciesProcessor::new(height).pre_process(op, state)
            }
        }?;

        self.record(op.kind(), "pre_process", &outcome);
        self.metrics
            .preprocessed
            .with_label_values(&[op.kind().as_str(), outcome.label()])
            .inc();
        self.refresh_pool_reused();

        Ok(outcome)
    }

    /// Compute the merge values of `op` at `height`
    pub fn process(
        &self,
        height: Height,
        op: &Operation,
        state: &dyn StateReader,
    ) -> Result<Outcome<Vec<StateMergeValue>>> {
        let started = Instant::now();

        let outcome = match op {
            Operation::CurrencyRegister(op) => {
                let processor = self.currency_register.new_processor(height, state)?;
                let outcome = processor.process(op, state);
                processor.close();
                outcome
            }
            Operation::GenesisCurrencies(op) => {
                GenesisCurrenciesProcessor::new(height).process(op, state)
            }
        }?;

        self.record(op.kind(), "process", &outcome);
        self.metrics
            .processed
            .with_label_values(&[op.kind().as_str(), outcome.label()])
            .inc();
        self.metrics
            .process_duration
            .observe(started.elapsed().as_secs_f64());
        if let Outcome::Accepted(values) = &outcome {
            self.metrics.merge_values.inc_by(values.len() as u64);
        }
        self.refresh_pool_reused();

        Ok(outcome)
    }

    fn refresh_pool_reused(&self) {
        self.metrics
            .pool_reused
            .set(self.currency_register.pool().reused() as i64);
    }

    fn record<T>(&self, kind: OperationKind, step: &str, outcome: &Outcome<T>) {
        if let Outcome::Rejected(reason) = outcome {
            warn!("Operation rejected: kind={}, step={}, reason={}", kind, step, reason);
        }
    }
}
