//! Ledger State
//!
//! Data model and versioned key/value state for the currency ledger.
//!
//! # Architecture
//!
//! - **State keys**: every logical fact (account, balance, currency design,
//!   contract account, suffrage) lives under its own string key
//! - **Merge values**: processors never write state, they emit
//!   [`StateMergeValue`]s that the store reduces against the prior value
//! - **Merge rules**: balances add, currency designs replace, everything
//!   else is create-once
//!
//! # Invariants
//!
//! - A create-once key is never created twice
//! - Balance merges are commutative and currency-checked
//! - A batch of merge values is committed all or nothing

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod crypto;
pub mod error;
pub mod state;
pub mod storage;
pub mod types;

// Re-exports
pub use crypto::KeyPair;
pub use error::{Error, Result};
pub use primitive_types::U256;
pub use state::{
    account_state_key, balance_state_key, contract_account_state_key,
    currency_design_state_key, MergeRule, State, StateMergeValue, StateReader, StateValue,
    SUFFRAGE_STATE_KEY,
};
pub use storage::MemoryState;
pub use types::{
    Account, Address, Amount, ContractAccountStatus, CurrencyDesign, CurrencyId, CurrencyPolicy,
    Feeer, Height, Key, Keys, PublicKey, Signature, SuffrageNode, SuffrageNodes,
};
