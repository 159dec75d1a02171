//! Pool (zero) account bootstrapping
//!
//! Every currency owns a keyless pool account at [`Address::zero`]. It is
//! created exactly once, together with its zero balance, when the currency is
//! introduced.

use crate::precondition::check_not_exists_state;
use crate::{Error, Result};
use ledger_state::{
    account_state_key, balance_state_key, Account, Address, Amount, CurrencyId, StateMergeValue,
    StateReader, StateValue,
};

/// Merge values creating the pool account of `currency` and its zero balance
///
/// Both keys must be absent. Callers only bootstrap a currency they have
/// just validated as new, so a conflict here is an invariant violation.
pub fn zero_account_merge_values(
    currency: &CurrencyId,
    state: &dyn StateReader,
) -> Result<[StateMergeValue; 2]> {
    let account = Account::zero(currency);
    let address: &Address = account.address();

    let account_key = account_state_key(address);
    if let Err(cause) = check_not_exists_state(&account_key, state)? {
        return Err(Error::InvariantViolation(format!(
            "zero account of {} already exists: {}",
            currency, cause
        )));
    }

    let balance_key = balance_state_key(address, currency);
    if let Err(cause) = check_not_exists_state(&balance_key, state)? {
        return Err(Error::InvariantViolation(format!(
            "zero account balance of {} already exists: {}",
            currency, cause
        )));
    }

    Ok([
        StateMergeValue::new(account_key, StateValue::Account(account)),
        StateMergeValue::new(
            balance_key,
            StateValue::Balance(Amount::zero(currency.clone())),
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_state::{MemoryState, U256};

    #[test]
    fn test_zero_account_values() {
        let usd = CurrencyId::new("USD").unwrap();
        let store = MemoryState::new();

        let [account, balance] = zero_account_merge_values(&usd, &store).unwrap();

        assert_eq!(account.key(), "USD-Xmca:account");
        let created = account.value().as_account().unwrap();
        assert!(created.keys().is_none());

        assert_eq!(balance.key(), "USD-Xmca-USD:balance");
        let zero = balance.value().as_balance().unwrap();
        assert_eq!(zero.big(), U256::zero());
        assert_eq!(zero.currency(), &usd);
    }

    #[test]
    fn test_second_bootstrap_is_fatal() {
        let usd = CurrencyId::new("USD").unwrap();
        let store = MemoryState::new();

        let values = zero_account_merge_values(&usd, &store).unwrap();
        store.merge(1, &values).unwrap();

        assert!(matches!(
            zero_account_merge_values(&usd, &store),
            Err(Error::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_dangling_zero_balance_is_fatal() {
        let usd = CurrencyId::new("USD").unwrap();
        let store = MemoryState::new();
        store.set(
            balance_state_key(&Address::zero(&usd), &usd),
            StateValue::Balance(Amount::zero(usd.clone())),
            0,
        );

        assert!(matches!(
            zero_account_merge_values(&usd, &store),
            Err(Error::InvariantViolation(_))
        ));
    }
}
