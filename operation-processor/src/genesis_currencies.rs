//! Genesis currencies processor
//!
//! Founds the first account of a chain and seeds its currencies. The whole
//! operation is rejected if the founding account, any currency design, or
//! any founding balance already exists; nothing is emitted in that case.
//!
//! Entries sharing a currency id are folded into one: their amounts are
//! summed and the policy of the last entry in fact order wins. Output order
//! is the founding account, then per currency (in order of first appearance)
//! its balance, its design and the two pool account values.

use crate::operation::GenesisCurrencies;
use crate::precondition::check_not_exists_state;
use crate::processor::{OperationProcessor, Outcome};
use crate::zero_account::zero_account_merge_values;
use crate::{Error, RejectionReason, Result};
use ledger_state::{
    account_state_key, balance_state_key, currency_design_state_key, Account, Amount,
    CurrencyDesign, CurrencyId, CurrencyPolicy, Height, StateMergeValue, StateReader, StateValue,
};
use std::collections::HashMap;
use tracing::{debug, info};

/// Processor for [`GenesisCurrencies`]
#[derive(Debug, Default, Clone, Copy)]
pub struct GenesisCurrenciesProcessor {
    height: Height,
}

/// Currency entries folded by currency id
struct Folded<'a> {
    policy: &'a CurrencyPolicy,
    total: Amount,
}

impl GenesisCurrenciesProcessor {
    /// Create processor for `height`
    pub fn new(height: Height) -> Self {
        Self { height }
    }

    /// Height
    pub fn height(&self) -> Height {
        self.height
    }
}

impl OperationProcessor for GenesisCurrenciesProcessor {
    type Operation = GenesisCurrencies;

    fn pre_process(&self, _op: &GenesisCurrencies, _state: &dyn StateReader) -> Result<Outcome<()>> {
        Ok(Outcome::Accepted(()))
    }

    fn process(
        &self,
        op: &GenesisCurrencies,
        state: &dyn StateReader,
    ) -> Result<Outcome<Vec<StateMergeValue>>> {
        let fact = op.fact();
        let address = fact.address();

        let account_key = account_state_key(&address);
        if let Err(cause) = check_not_exists_state(&account_key, state)? {
            return Ok(Outcome::Rejected(RejectionReason::GenesisAccountExists {
                address,
                cause,
            }));
        }

        let mut order: Vec<&CurrencyId> = Vec::new();
        let mut folded: HashMap<&CurrencyId, Folded<'_>> = HashMap::new();

        for design in fact.currencies() {
            let currency = design.currency();

            if let Some(entry) = folded.get_mut(currency) {
                entry.total = entry.total.checked_add(&design.amount).map_err(|e| {
                    Error::InvariantViolation(format!("genesis amount of {}: {}", currency, e))
                })?;
                entry.policy = &design.policy;
                continue;
            }

            if let Err(cause) =
                check_not_exists_state(&currency_design_state_key(currency), state)?
            {
                return Ok(Outcome::Rejected(RejectionReason::CurrencyDesignExists {
                    currency: currency.clone(),
                    cause,
                }));
            }

            let balance_key = balance_state_key(&address, currency);
            if let Err(cause) = check_not_exists_state(&balance_key, state)? {
                return Ok(Outcome::Rejected(RejectionReason::BalanceExists {
                    key: balance_key,
                    cause,
                }));
            }

            order.push(currency);
            folded.insert(
                currency,
                Folded {
                    policy: &design.policy,
                    total: design.amount.clone(),
                },
            );
        }

        let account = Account::new(address.clone(), fact.keys().clone())
            .map_err(|e| Error::InvariantViolation(format!("genesis account: {}", e)))?;

        let mut values = Vec::with_capacity(1 + order.len() * 4);
        values.push(StateMergeValue::new(
            account_key,
            StateValue::Account(account),
        ));

        for currency in order {
            let entry = folded.get(currency).ok_or_else(|| {
                Error::InvariantViolation(format!("genesis currency {} lost while folding", currency))
            })?;

            let design = CurrencyDesign::new(entry.total.clone(), address.clone(), entry.policy.clone());

            values.push(StateMergeValue::new(
                balance_state_key(&address, currency),
                StateValue::Balance(entry.total.clone()),
            ));
            values.push(StateMergeValue::new(
                currency_design_state_key(currency),
                StateValue::CurrencyDesign(design),
            ));
            values.extend(zero_account_merge_values(currency, state)?);

            debug!("Genesis currency seeded: currency={}, amount={}", currency, entry.total.big());
        }

        info!(
            "Genesis processed: height={}, account={}, currencies={}, values={}",
            self.height,
            address,
            folded.len(),
            values.len()
        );

        Ok(Outcome::Accepted(values))
    }
}
