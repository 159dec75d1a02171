//! State keys, values and merge values
//!
//! Processors read state through a [`StateReader`] and describe every change
//! as a [`StateMergeValue`]. The store reduces each merge value against the
//! value currently at its key, following the [`MergeRule`] of the value kind.

use crate::types::{
    Account, Address, Amount, ContractAccountStatus, CurrencyDesign, CurrencyId, Height,
    SuffrageNodes,
};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Well-known key of the current suffrage
pub const SUFFRAGE_STATE_KEY: &str = "suffrage";

/// Key of an account's existence
pub fn account_state_key(address: &Address) -> String {
    format!("{}:account", address)
}

/// Key of an account's balance in one currency
pub fn balance_state_key(address: &Address, currency: &CurrencyId) -> String {
    format!("{}-{}:balance", address, currency)
}

/// Key of a currency design
pub fn currency_design_state_key(currency: &CurrencyId) -> String {
    format!("{}:currencydesign", currency)
}

/// Key marking an account as a contract account
pub fn contract_account_state_key(address: &Address) -> String {
    format!("{}:contractaccount", address)
}

/// Value stored under a state key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateValue {
    /// Account exists
    Account(Account),
    /// Balance of one currency
    Balance(Amount),
    /// Registered currency
    CurrencyDesign(CurrencyDesign),
    /// Contract account marker
    ContractAccount(ContractAccountStatus),
    /// Validator set
    Suffrage(SuffrageNodes),
}

impl StateValue {
    /// Kind name, for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            StateValue::Account(_) => "account",
            StateValue::Balance(_) => "balance",
            StateValue::CurrencyDesign(_) => "currency design",
            StateValue::ContractAccount(_) => "contract account",
            StateValue::Suffrage(_) => "suffrage",
        }
    }

    /// Merge rule of this kind
    pub fn merge_rule(&self) -> MergeRule {
        match self {
            StateValue::Balance(_) => MergeRule::Add,
            StateValue::CurrencyDesign(_) => MergeRule::Replace,
            StateValue::Account(_) | StateValue::ContractAccount(_) | StateValue::Suffrage(_) => {
                MergeRule::Create
            }
        }
    }

    /// Balance amount, if this is a balance
    pub fn as_balance(&self) -> Option<&Amount> {
        match self {
            StateValue::Balance(amount) => Some(amount),
            _ => None,
        }
    }

    /// Account, if this is an account
    pub fn as_account(&self) -> Option<&Account> {
        match self {
            StateValue::Account(account) => Some(account),
            _ => None,
        }
    }

    /// Currency design, if this is a currency design
    pub fn as_currency_design(&self) -> Option<&CurrencyDesign> {
        match self {
            StateValue::CurrencyDesign(design) => Some(design),
            _ => None,
        }
    }

    /// Suffrage nodes, if this is a suffrage
    pub fn as_suffrage(&self) -> Option<&SuffrageNodes> {
        match self {
            StateValue::Suffrage(nodes) => Some(nodes),
            _ => None,
        }
    }
}

/// How a merge value is reduced against the prior value at its key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeRule {
    /// Only valid when no prior value exists
    Create,
    /// Added to the prior value (commutative)
    Add,
    /// Overwrites the prior value
    Replace,
}

/// Stored state entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    /// State key
    pub key: String,

    /// Current value
    pub value: StateValue,

    /// Height of the last merge
    pub height: Height,
}

/// Delta for one state key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateMergeValue {
    key: String,
    value: StateValue,
}

impl StateMergeValue {
    /// Create new merge value
    pub fn new(key: impl Into<String>, value: StateValue) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    /// Target key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Delta
    pub fn value(&self) -> &StateValue {
        &self.value
    }

    /// Merge rule of the delta
    pub fn merge_rule(&self) -> MergeRule {
        self.value.merge_rule()
    }

    /// Reduce this delta against the prior value at its key
    pub fn merge(&self, prior: Option<&StateValue>) -> Result<StateValue> {
        let prior = match prior {
            None => return Ok(self.value.clone()),
            Some(prior) => prior,
        };

        match (self.merge_rule(), prior, &self.value) {
            (MergeRule::Create, _, _) => Err(Error::MergeConflict {
                key: self.key.clone(),
            }),
            (MergeRule::Add, StateValue::Balance(current), StateValue::Balance(delta)) => {
                Ok(StateValue::Balance(current.checked_add(delta)?))
            }
            (MergeRule::Replace, StateValue::CurrencyDesign(_), StateValue::CurrencyDesign(_)) => {
                Ok(self.value.clone())
            }
            (_, stored, merging) => Err(Error::KindMismatch {
                key: self.key.clone(),
                stored: stored.kind(),
                merging: merging.kind(),
            }),
        }
    }
}

/// Read access to versioned state
pub trait StateReader {
    /// Current state at `key`, `None` if absent
    fn get(&self, key: &str) -> Result<Option<State>>;
}

impl<F> StateReader for F
where
    F: Fn(&str) -> Result<Option<State>>,
{
    fn get(&self, key: &str) -> Result<Option<State>> {
        self(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CurrencyPolicy, Keys};
    use primitive_types::U256;

    fn usd() -> CurrencyId {
        CurrencyId::new("USD").unwrap()
    }

    fn address(s: &str) -> Address {
        Address::new(s).unwrap()
    }

    #[test]
    fn test_state_keys() {
        let a = address("alicemca");
        assert_eq!(account_state_key(&a), "alicemca:account");
        assert_eq!(balance_state_key(&a, &usd()), "alicemca-USD:balance");
        assert_eq!(currency_design_state_key(&usd()), "USD:currencydesign");
        assert_eq!(contract_account_state_key(&a), "alicemca:contractaccount");
    }

    #[test]
    fn test_balance_merge_adds() {
        let key = balance_state_key(&address("alicemca"), &usd());
        let prior = StateValue::Balance(Amount::new(usd(), U256::from(100u64)));
        let delta = StateMergeValue::new(
            key,
            StateValue::Balance(Amount::new(usd(), U256::from(23u64))),
        );

        assert_eq!(delta.merge_rule(), MergeRule::Add);
        let merged = delta.merge(Some(&prior)).unwrap();
        assert_eq!(merged.as_balance().unwrap().big(), U256::from(123u64));
    }

    #[test]
    fn test_balance_merge_currency_mismatch() {
        let eur = CurrencyId::new("EUR").unwrap();
        let prior = StateValue::Balance(Amount::zero(usd()));
        let delta = StateMergeValue::new("k", StateValue::Balance(Amount::zero(eur)));

        assert!(matches!(
            delta.merge(Some(&prior)),
            Err(Error::CurrencyMismatch { .. })
        ));
    }

    #[test]
    fn test_account_merge_is_create_once() {
        let usd = usd();
        let delta = StateMergeValue::new(
            account_state_key(&Address::zero(&usd)),
            StateValue::Account(Account::zero(&usd)),
        );

        assert!(delta.merge(None).is_ok());
        let prior = delta.value().clone();
        assert!(matches!(
            delta.merge(Some(&prior)),
            Err(Error::MergeConflict { .. })
        ));
    }

    #[test]
    fn test_design_merge_replaces() {
        let keys = Keys::new(
            vec![crate::types::Key::new(crate::types::PublicKey::from_bytes([1u8; 32]), 100).unwrap()],
            100,
        )
        .unwrap();
        let owner = Address::from_keys(&keys);

        let first = CurrencyDesign::new(
            Amount::new(usd(), U256::from(1u64)),
            owner.clone(),
            CurrencyPolicy::default(),
        );
        let second = CurrencyDesign::new(
            Amount::new(usd(), U256::from(2u64)),
            owner,
            CurrencyPolicy::default(),
        );

        let delta = StateMergeValue::new(
            currency_design_state_key(&usd()),
            StateValue::CurrencyDesign(second.clone()),
        );
        let merged = delta
            .merge(Some(&StateValue::CurrencyDesign(first)))
            .unwrap();
        assert_eq!(merged.as_currency_design(), Some(&second));
    }

    #[test]
    fn test_kind_mismatch() {
        let delta = StateMergeValue::new("k", StateValue::Balance(Amount::zero(usd())));
        let prior = StateValue::Suffrage(SuffrageNodes::default());

        assert!(matches!(
            delta.merge(Some(&prior)),
            Err(Error::KindMismatch { .. })
        ));
    }

    #[test]
    fn test_closure_reader() {
        let reader = |key: &str| -> Result<Option<State>> {
            if key == SUFFRAGE_STATE_KEY {
                Ok(Some(State {
                    key: key.to_string(),
                    value: StateValue::Suffrage(SuffrageNodes::default()),
                    height: 3,
                }))
            } else {
                Ok(None)
            }
        };

        assert!(reader.get(SUFFRAGE_STATE_KEY).unwrap().is_some());
        assert!(reader.get("missing").unwrap().is_none());
    }

    #[test]
    fn test_merge_value_json() {
        let delta = StateMergeValue::new("k", StateValue::Balance(Amount::zero(usd())));
        let json = serde_json::to_string(&delta).unwrap();
        let back: StateMergeValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, delta);
    }
}
