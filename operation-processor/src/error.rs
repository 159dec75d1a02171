//! Error types for operation processing
//!
//! Two kinds of failure leave a processor:
//!
//! - [`RejectionReason`]: the operation is invalid against the current state.
//!   It is dropped from this round and may be resubmitted. Returned inside
//!   [`crate::Outcome::Rejected`], never as an `Err`.
//! - [`Error`]: processing itself failed. `StateUnavailable` is retryable,
//!   everything else halts processing of this operation.

use crate::suffrage::QuorumError;
use ledger_state::{Address, CurrencyId};
use thiserror::Error;

/// Result type for operation processing
pub type Result<T> = std::result::Result<T, Error>;

/// Processing errors
#[derive(Error, Debug)]
pub enum Error {
    /// State accessor failed
    #[error("State error: {0}")]
    State(#[from] ledger_state::Error),

    /// Required state is not readable yet; retry later
    #[error("State unavailable: {0}")]
    StateUnavailable(String),

    /// Programming invariant broken (wrong value kind, unexpected conflict)
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Metrics registration error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the caller should retry later instead of giving up
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::StateUnavailable(_))
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}

/// Precondition failure on a single state key
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateCheckError {
    /// Expected state is absent
    #[error("state not found, {key:?}")]
    Missing {
        /// State key
        key: String,
    },

    /// State that must not exist is present
    #[error("state already exists, {key:?}")]
    Conflicting {
        /// State key
        key: String,
    },
}

/// Why an operation was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    /// Suffrage quorum not reached
    #[error("not enough signs: {0}")]
    NotEnoughSigns(#[source] QuorumError),

    /// Currency is already registered
    #[error("currency design already exists, {currency}: {cause}")]
    CurrencyDesignExists {
        /// Currency
        currency: CurrencyId,
        /// Failed check
        #[source]
        cause: StateCheckError,
    },

    /// Genesis account of a new currency does not exist
    #[error("genesis account not found, {address}: {cause}")]
    GenesisAccountNotFound {
        /// Genesis account
        address: Address,
        /// Failed check
        #[source]
        cause: StateCheckError,
    },

    /// Genesis account of a new currency is a contract account
    #[error("contract account cannot be genesis account of currency, {address}: {cause}")]
    ContractGenesisAccount {
        /// Genesis account
        address: Address,
        /// Failed check
        #[source]
        cause: StateCheckError,
    },

    /// Fee receiver does not exist
    #[error("feeer receiver not found, {address}: {cause}")]
    FeeReceiverNotFound {
        /// Fee receiver
        address: Address,
        /// Failed check
        #[source]
        cause: StateCheckError,
    },

    /// Fee receiver is a contract account
    #[error("contract account cannot be fee receiver, {address}: {cause}")]
    ContractFeeReceiver {
        /// Fee receiver
        address: Address,
        /// Failed check
        #[source]
        cause: StateCheckError,
    },

    /// Balance already exists
    #[error("account balance already exists, {key:?}: {cause}")]
    BalanceExists {
        /// Balance state key
        key: String,
        /// Failed check
        #[source]
        cause: StateCheckError,
    },

    /// Founding account of a genesis operation already exists
    #[error("genesis account already exists, {address}: {cause}")]
    GenesisAccountExists {
        /// Founding account
        address: Address,
        /// Failed check
        #[source]
        cause: StateCheckError,
    },
}

impl RejectionReason {
    /// Failed state check behind this rejection, if any
    pub fn state_check(&self) -> Option<&StateCheckError> {
        match self {
            RejectionReason::NotEnoughSigns(_) => None,
            RejectionReason::CurrencyDesignExists { cause, .. }
            | RejectionReason::GenesisAccountNotFound { cause, .. }
            | RejectionReason::ContractGenesisAccount { cause, .. }
            | RejectionReason::FeeReceiverNotFound { cause, .. }
            | RejectionReason::ContractFeeReceiver { cause, .. }
            | RejectionReason::BalanceExists { cause, .. }
            | RejectionReason::GenesisAccountExists { cause, .. } => Some(cause),
        }
    }

    /// Whether the rejection comes from state that already exists
    pub fn is_conflict(&self) -> bool {
        matches!(self.state_check(), Some(StateCheckError::Conflicting { .. }))
    }
}
