//! State preconditions
//!
//! The outer `Result` carries accessor failures, which are fatal. The inner
//! result is the precondition verdict, turned into a rejection by the caller:
//!
//! ```ignore
//! if let Err(cause) = check_not_exists_state(&key, state)? {
//!     return Ok(Outcome::Rejected(RejectionReason::BalanceExists { key, cause }));
//! }
//! ```

use crate::{Result, StateCheckError};
use ledger_state::{State, StateReader};

/// Precondition verdict
pub type Check<T> = std::result::Result<T, StateCheckError>;

/// Require a value at `key`; returns it
pub fn check_exists_state(key: &str, state: &dyn StateReader) -> Result<Check<State>> {
    Ok(match state.get(key)? {
        Some(st) => Ok(st),
        None => Err(StateCheckError::Missing {
            key: key.to_string(),
        }),
    })
}

/// Require no value at `key`
pub fn check_not_exists_state(key: &str, state: &dyn StateReader) -> Result<Check<()>> {
    Ok(match state.get(key)? {
        None => Ok(()),
        Some(_) => Err(StateCheckError::Conflicting {
            key: key.to_string(),
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use ledger_state::{MemoryState, StateValue, SuffrageNodes, SUFFRAGE_STATE_KEY};

    #[test]
    fn test_exists() {
        let store = MemoryState::new();
        store.set(
            SUFFRAGE_STATE_KEY,
            StateValue::Suffrage(SuffrageNodes::default()),
            0,
        );

        let st = check_exists_state(SUFFRAGE_STATE_KEY, &store).unwrap().unwrap();
        assert_eq!(st.key, SUFFRAGE_STATE_KEY);

        assert_eq!(
            check_exists_state("missing", &store).unwrap(),
            Err(StateCheckError::Missing {
                key: "missing".to_string()
            })
        );
    }

    #[test]
    fn test_not_exists() {
        let store = MemoryState::new();
        assert_eq!(check_not_exists_state("k", &store).unwrap(), Ok(()));

        store.set("k", StateValue::Suffrage(SuffrageNodes::default()), 0);
        assert_eq!(
            check_not_exists_state("k", &store).unwrap(),
            Err(StateCheckError::Conflicting {
                key: "k".to_string()
            })
        );
    }

    #[test]
    fn test_accessor_failure_is_fatal() {
        let broken = |_: &str| -> ledger_state::Result<Option<State>> {
            Err(ledger_state::Error::Storage("disk gone".to_string()))
        };

        assert!(matches!(
            check_not_exists_state("k", &broken),
            Err(Error::State(_))
        ));
        assert!(matches!(
            check_exists_state("k", &broken),
            Err(Error::State(_))
        ));
    }
}
