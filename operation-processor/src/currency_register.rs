//! Currency register processor
//!
//! PreProcess checks, in order, stopping at the first failure:
//!
//! 1. suffrage signs reach the threshold
//! 2. the currency has no design yet
//! 3. the genesis account exists
//! 4. the genesis account is not a contract account
//! 5. a fee receiver, if any, exists and is not a contract account
//! 6. the genesis account has no balance in the currency yet
//!
//! Process emits, in order: genesis balance, currency design, pool account,
//! pool balance.

use crate::operation::{CurrencyRegister, NetworkId};
use crate::pool::{Pooled, ProcessorPool, Reset};
use crate::precondition::{check_exists_state, check_not_exists_state};
use crate::processor::{OperationProcessor, Outcome};
use crate::suffrage::{check_fact_signs_by_suffrage, Suffrage, Threshold};
use crate::zero_account::zero_account_merge_values;
use crate::{Error, RejectionReason, Result};
use ledger_state::{
    account_state_key, balance_state_key, contract_account_state_key, currency_design_state_key,
    CurrencyDesign, Height, StateMergeValue, StateReader, StateValue, SUFFRAGE_STATE_KEY,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Processor for [`CurrencyRegister`]
///
/// Holds the suffrage and threshold of one height. Instances come from a
/// [`CurrencyRegisterProcessorFactory`] and are reset when returned.
#[derive(Debug, Default)]
pub struct CurrencyRegisterProcessor {
    height: Option<Height>,
    network_id: Option<NetworkId>,
    suffrage: Option<Suffrage>,
    threshold: Option<Threshold>,
}

impl CurrencyRegisterProcessor {
    /// Height this processor was created for
    pub fn height(&self) -> Option<Height> {
        self.height
    }

    /// Captured suffrage
    pub fn suffrage(&self) -> Option<&Suffrage> {
        self.suffrage.as_ref()
    }

    /// Captured threshold
    pub fn threshold(&self) -> Option<Threshold> {
        self.threshold
    }

    fn quorum(&self) -> Result<(&Suffrage, Threshold, &NetworkId)> {
        match (&self.suffrage, self.threshold, &self.network_id) {
            (Some(suffrage), Some(threshold), Some(network_id)) => {
                Ok((suffrage, threshold, network_id))
            }
            _ => Err(Error::InvariantViolation(
                "currency register processor used before initialization".to_string(),
            )),
        }
    }
}

impl Reset for CurrencyRegisterProcessor {
    fn reset(&mut self) {
        self.height = None;
        self.network_id = None;
        self.suffrage = None;
        self.threshold = None;
    }
}

impl OperationProcessor for CurrencyRegisterProcessor {
    type Operation = CurrencyRegister;

    fn pre_process(&self, op: &CurrencyRegister, state: &dyn StateReader) -> Result<Outcome<()>> {
        let (suffrage, threshold, network_id) = self.quorum()?;
        let fact = op.fact();

        if let Err(err) = check_fact_signs_by_suffrage(
            suffrage,
            threshold,
            fact.hash(),
            network_id,
            op.node_signs(),
        ) {
            return Ok(Outcome::Rejected(RejectionReason::NotEnoughSigns(err)));
        }

        let design = fact.currency();
        let currency = design.currency();
        let genesis = &design.genesis_account;

        if let Err(cause) = check_not_exists_state(&currency_design_state_key(currency), state)? {
            return Ok(Outcome::Rejected(RejectionReason::CurrencyDesignExists {
                currency: currency.clone(),
                cause,
            }));
        }

        if let Err(cause) = check_exists_state(&account_state_key(genesis), state)? {
            return Ok(Outcome::Rejected(RejectionReason::GenesisAccountNotFound {
                address: genesis.clone(),
                cause,
            }));
        }

        if let Err(cause) = check_not_exists_state(&contract_account_state_key(genesis), state)? {
            return Ok(Outcome::Rejected(RejectionReason::ContractGenesisAccount {
                address: genesis.clone(),
                cause,
            }));
        }

        if let Some(receiver) = design.policy.feeer.receiver() {
            if let Err(cause) = check_exists_state(&account_state_key(receiver), state)? {
                return Ok(Outcome::Rejected(RejectionReason::FeeReceiverNotFound {
                    address: receiver.clone(),
                    cause,
                }));
            }

            if let Err(cause) =
                check_not_exists_state(&contract_account_state_key(receiver), state)?
            {
                return Ok(Outcome::Rejected(RejectionReason::ContractFeeReceiver {
                    address: receiver.clone(),
                    cause,
                }));
            }
        }

        let balance_key = balance_state_key(genesis, currency);
        if let Err(cause) = check_not_exists_state(&balance_key, state)? {
            return Ok(Outcome::Rejected(RejectionReason::BalanceExists {
                key: balance_key,
                cause,
            }));
        }

        debug!("Currency register pre-processed: currency={}, fact={}", currency, fact.hash());

        Ok(Outcome::Accepted(()))
    }

    fn process(
        &self,
        op: &CurrencyRegister,
        state: &dyn StateReader,
    ) -> Result<Outcome<Vec<StateMergeValue>>> {
        let design = op.fact().currency();
        let currency = design.currency();

        let mut values = Vec::with_capacity(4);

        values.push(StateMergeValue::new(
            balance_state_key(&design.genesis_account, currency),
            StateValue::Balance(design.amount.clone()),
        ));
        // the aggregate always starts at the genesis amount
        let stored = CurrencyDesign::new(
            design.amount.clone(),
            design.genesis_account.clone(),
            design.policy.clone(),
        );
        values.push(StateMergeValue::new(
            currency_design_state_key(currency),
            StateValue::CurrencyDesign(stored),
        ));
        values.extend(zero_account_merge_values(currency, state)?);

        info!(
            "Currency registered: currency={}, genesis_account={}, amount={}",
            currency,
            design.genesis_account,
            design.amount.big()
        );

        Ok(Outcome::Accepted(values))
    }
}

/// Creates [`CurrencyRegisterProcessor`]s for a height
///
/// Network id and threshold are fixed for the factory; the suffrage is read
/// from state every time a processor is created.
#[derive(Debug)]
pub struct CurrencyRegisterProcessorFactory {
    network_id: NetworkId,
    threshold: Threshold,
    pool: Arc<ProcessorPool<CurrencyRegisterProcessor>>,
}

impl CurrencyRegisterProcessorFactory {
    /// Create new factory backed by its own pool
    pub fn new(network_id: NetworkId, threshold: Threshold, max_idle: usize) -> Self {
        Self::with_pool(network_id, threshold, ProcessorPool::new(max_idle))
    }

    /// Create new factory on a shared pool
    pub fn with_pool(
        network_id: NetworkId,
        threshold: Threshold,
        pool: Arc<ProcessorPool<CurrencyRegisterProcessor>>,
    ) -> Self {
        Self {
            network_id,
            threshold,
            pool,
        }
    }

    /// Backing pool
    pub fn pool(&self) -> &Arc<ProcessorPool<CurrencyRegisterProcessor>> {
        &self.pool
    }

    /// Take a processor from the pool and bind it to `height`
    ///
    /// Fails with the retryable [`Error::StateUnavailable`] while the
    /// suffrage is not in state yet.
    pub fn new_processor(
        &self,
        height: Height,
        state: &dyn StateReader,
    ) -> Result<Pooled<CurrencyRegisterProcessor>> {
        let mut opp = self.pool.get();

        let nodes = match state.get(SUFFRAGE_STATE_KEY)? {
            None => {
                return Err(Error::StateUnavailable(format!(
                    "empty suffrage state at height {}",
                    height
                )))
            }
            Some(st) => match st.value {
                StateValue::Suffrage(nodes) => nodes,
                other => {
                    return Err(Error::InvariantViolation(format!(
                        "expected suffrage state, not {}",
                        other.kind()
                    )))
                }
            },
        };

        opp.height = Some(height);
        opp.network_id = Some(self.network_id.clone());
        opp.suffrage = Some(Suffrage::new(&nodes)?);
        opp.threshold = Some(self.threshold);

        debug!(
            "Created currency register processor: height={}, suffrage={}, threshold={}",
            height,
            nodes.nodes.len(),
            self.threshold
        );

        Ok(opp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::CurrencyRegisterFact;
    use ledger_state::{
        Account, Address, Amount, CurrencyDesign, CurrencyId, CurrencyPolicy, Key, KeyPair, Keys,
        MemoryState, SuffrageNode, SuffrageNodes, U256,
    };

    fn node(seed: u8) -> (Address, KeyPair) {
        (
            Address::new(format!("node{}mca", seed)).unwrap(),
            KeyPair::from_seed(&[seed; 32]),
        )
    }

    fn suffrage_nodes(nodes: &[(Address, KeyPair)]) -> SuffrageNodes {
        SuffrageNodes {
            nodes: nodes
                .iter()
                .map(|(address, kp)| SuffrageNode {
                    address: address.clone(),
                    publickey: kp.public_key(),
                })
                .collect(),
        }
    }

    fn factory() -> CurrencyRegisterProcessorFactory {
        CurrencyRegisterProcessorFactory::new(
            NetworkId::new("test"),
            Threshold::new(rust_decimal::Decimal::ONE_HUNDRED).unwrap(),
            4,
        )
    }

    fn genesis_account() -> Account {
        let key = Key::new(KeyPair::from_seed(&[9u8; 32]).public_key(), 100).unwrap();
        Account::from_keys(Keys::new(vec![key], 100).unwrap())
    }

    fn register(genesis: &Address) -> CurrencyRegister {
        let usd = CurrencyId::new("USD").unwrap();
        let design = CurrencyDesign::new(
            Amount::new(usd, U256::from(1_000u64)),
            genesis.clone(),
            CurrencyPolicy::default(),
        );
        CurrencyRegister::new(CurrencyRegisterFact::new(b"t".to_vec(), design).unwrap())
    }

    #[test]
    fn test_missing_suffrage_is_retryable() {
        let store = MemoryState::new();
        let err = factory().new_processor(10, &store).unwrap_err();

        assert!(matches!(err, Error::StateUnavailable(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_wrong_suffrage_kind() {
        let store = MemoryState::new();
        let usd = CurrencyId::new("USD").unwrap();
        store.set(SUFFRAGE_STATE_KEY, StateValue::Balance(Amount::zero(usd)), 0);

        let err = factory().new_processor(10, &store).unwrap_err();
        assert!(matches!(err, Error::InvariantViolation(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_processor_captures_height_and_suffrage() {
        let nodes = [node(1), node(2)];
        let store = MemoryState::new();
        store.set(SUFFRAGE_STATE_KEY, StateValue::Suffrage(suffrage_nodes(&nodes)), 0);

        let factory = factory();
        let processor = factory.new_processor(7, &store).unwrap();
        assert_eq!(processor.height(), Some(7));
        assert_eq!(processor.suffrage().map(Suffrage::len), Some(2));
        assert_eq!(
            processor.threshold().map(|t| t.percent()),
            Some(rust_decimal::Decimal::ONE_HUNDRED)
        );

        processor.close();
        assert_eq!(factory.pool().idle(), 1);
    }

    #[test]
    fn test_uninitialized_processor_fails() {
        let processor = CurrencyRegisterProcessor::default();
        let store = MemoryState::new();
        let op = register(genesis_account().address());

        let err = processor.pre_process(&op, &store).unwrap_err();
        assert!(matches!(err, Error::InvariantViolation(_)));
    }

    #[test]
    fn test_process_emits_four_values() {
        let nodes = [node(1)];
        let genesis = genesis_account();
        let store = MemoryState::new();
        store.set(SUFFRAGE_STATE_KEY, StateValue::Suffrage(suffrage_nodes(&nodes)), 0);
        store.set(
            account_state_key(genesis.address()),
            StateValue::Account(genesis.clone()),
            0,
        );

        let factory = factory();
        let network = NetworkId::new("test");
        let op = register(genesis.address()).signed_by(&nodes[0].1, nodes[0].0.clone(), &network);

        let processor = factory.new_processor(1, &store).unwrap();
        assert!(processor.pre_process(&op, &store).unwrap().is_accepted());

        let values = processor.process(&op, &store).unwrap().accepted().unwrap();
        let usd = CurrencyId::new("USD").unwrap();
        let zero = Address::zero(&usd);
        let keys: Vec<String> = values.iter().map(|v| v.key().to_string()).collect();
        assert_eq!(
            keys,
            vec![
                balance_state_key(genesis.address(), &usd),
                currency_design_state_key(&usd),
                account_state_key(&zero),
                balance_state_key(&zero, &usd),
            ]
        );
    }

    #[test]
    fn test_process_resets_aggregate_to_amount() {
        let nodes = [node(1)];
        let genesis = genesis_account();
        let store = MemoryState::new();
        store.set(SUFFRAGE_STATE_KEY, StateValue::Suffrage(suffrage_nodes(&nodes)), 0);

        let usd = CurrencyId::new("USD").unwrap();
        let mut design = CurrencyDesign::new(
            Amount::new(usd.clone(), U256::from(1_000u64)),
            genesis.address().clone(),
            CurrencyPolicy::default(),
        );
        design.aggregate = U256::from(5u64);
        let op = CurrencyRegister::new(CurrencyRegisterFact::new(b"t".to_vec(), design).unwrap());

        let factory = factory();
        let processor = factory.new_processor(1, &store).unwrap();
        let values = processor.process(&op, &store).unwrap().accepted().unwrap();

        let stored = values[1].value().as_currency_design().unwrap();
        assert_eq!(values[1].key(), currency_design_state_key(&usd));
        assert_eq!(stored.aggregate, U256::from(1_000u64));
        assert_eq!(stored.amount.big(), U256::from(1_000u64));
    }
}
