//! Operations and their facts
//!
//! A fact is the immutable payload of an operation. Its identity is the
//! SHA-256 of its canonical (bincode) bytes, computed once at construction.
//! Operations pair a fact with the node signs collected for it.

use crate::{Error, Result};
use ledger_state::crypto::hash_bytes;
use ledger_state::{Address, CurrencyDesign, KeyPair, Keys, PublicKey, Signature};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Content hash of a fact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FactHash([u8; 32]);

impl FactHash {
    /// Create from bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for FactHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Network identifier mixed into every signed message
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetworkId(Vec<u8>);

impl NetworkId {
    /// Create new network id
    pub fn new(id: impl AsRef<[u8]>) -> Self {
        Self(id.as_ref().to_vec())
    }

    /// Get bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Message signed for a fact on this network: `fact_hash || network_id`
    pub fn sign_message(&self, fact_hash: &FactHash) -> Vec<u8> {
        let mut message = Vec::with_capacity(32 + self.0.len());
        message.extend_from_slice(fact_hash.as_bytes());
        message.extend_from_slice(&self.0);
        message
    }
}

/// Signature of a node over a fact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSign {
    /// Signing node
    pub node: Address,

    /// Key used to sign
    pub signer: PublicKey,

    /// Signature over `fact_hash || network_id`
    pub signature: Signature,
}

impl NodeSign {
    /// Sign a fact as `node`
    pub fn sign(keypair: &KeyPair, node: Address, fact_hash: &FactHash, network_id: &NetworkId) -> Self {
        Self {
            node,
            signer: keypair.public_key(),
            signature: keypair.sign(&network_id.sign_message(fact_hash)),
        }
    }
}

fn fact_hash<T: Serialize>(content: &T) -> Result<FactHash> {
    let bytes = bincode::serialize(content)
        .map_err(|e| Error::InvariantViolation(format!("failed to encode fact: {}", e)))?;
    Ok(FactHash(hash_bytes(&bytes)))
}

/// Fact introducing a new currency
///
/// The hash is never serialized; deserializing recomputes it from content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrencyRegisterFact {
    #[serde(skip)]
    hash: FactHash,
    token: Vec<u8>,
    currency: CurrencyDesign,
}

impl CurrencyRegisterFact {
    /// Create new fact
    pub fn new(token: impl Into<Vec<u8>>, currency: CurrencyDesign) -> Result<Self> {
        let token = token.into();
        let hash = fact_hash(&(&token, &currency))?;

        Ok(Self {
            hash,
            token,
            currency,
        })
    }

    /// Content hash
    pub fn hash(&self) -> &FactHash {
        &self.hash
    }

    /// Token
    pub fn token(&self) -> &[u8] {
        &self.token
    }

    /// Currency being registered
    pub fn currency(&self) -> &CurrencyDesign {
        &self.currency
    }
}

impl<'de> Deserialize<'de> for CurrencyRegisterFact {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Content {
            token: Vec<u8>,
            currency: CurrencyDesign,
        }

        let content = Content::deserialize(deserializer)?;
        Self::new(content.token, content.currency).map_err(serde::de::Error::custom)
    }
}

/// Register a new currency; authorized by suffrage signs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyRegister {
    fact: CurrencyRegisterFact,
    signs: Vec<NodeSign>,
}

impl CurrencyRegister {
    /// Create an unsigned operation
    pub fn new(fact: CurrencyRegisterFact) -> Self {
        Self {
            fact,
            signs: Vec::new(),
        }
    }

    /// Add a node sign
    pub fn sign(&mut self, keypair: &KeyPair, node: Address, network_id: &NetworkId) {
        let sign = NodeSign::sign(keypair, node, self.fact.hash(), network_id);
        self.signs.push(sign);
    }

    /// Builder form of [`CurrencyRegister::sign`]
    pub fn signed_by(mut self, keypair: &KeyPair, node: Address, network_id: &NetworkId) -> Self {
        self.sign(keypair, node, network_id);
        self
    }

    /// Fact
    pub fn fact(&self) -> &CurrencyRegisterFact {
        &self.fact
    }

    /// Node signs
    pub fn node_signs(&self) -> &[NodeSign] {
        &self.signs
    }
}

/// Fact founding the first account with its currencies
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenesisCurrenciesFact {
    #[serde(skip)]
    hash: FactHash,
    token: Vec<u8>,
    keys: Keys,
    currencies: Vec<CurrencyDesign>,
}

impl GenesisCurrenciesFact {
    /// Create new fact
    pub fn new(
        token: impl Into<Vec<u8>>,
        keys: Keys,
        currencies: Vec<CurrencyDesign>,
    ) -> Result<Self> {
        let token = token.into();
        let hash = fact_hash(&(&token, &keys, &currencies))?;

        Ok(Self {
            hash,
            token,
            keys,
            currencies,
        })
    }

    /// Content hash
    pub fn hash(&self) -> &FactHash {
        &self.hash
    }

    /// Token
    pub fn token(&self) -> &[u8] {
        &self.token
    }

    /// Keys of the founding account
    pub fn keys(&self) -> &Keys {
        &self.keys
    }

    /// Currencies, in fact order
    pub fn currencies(&self) -> &[CurrencyDesign] {
        &self.currencies
    }

    /// Address of the founding account
    pub fn address(&self) -> Address {
        Address::from_keys(&self.keys)
    }
}

impl<'de> Deserialize<'de> for GenesisCurrenciesFact {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Content {
            token: Vec<u8>,
            keys: Keys,
            currencies: Vec<CurrencyDesign>,
        }

        let content = Content::deserialize(deserializer)?;
        Self::new(content.token, content.keys, content.currencies)
            .map_err(serde::de::Error::custom)
    }
}

/// Create the founding account and its currencies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisCurrencies {
    fact: GenesisCurrenciesFact,
    signs: Vec<NodeSign>,
}

impl GenesisCurrencies {
    /// Create an unsigned operation
    pub fn new(fact: GenesisCurrenciesFact) -> Self {
        Self {
            fact,
            signs: Vec::new(),
        }
    }

    /// Add a node sign
    pub fn sign(&mut self, keypair: &KeyPair, node: Address, network_id: &NetworkId) {
        let sign = NodeSign::sign(keypair, node, self.fact.hash(), network_id);
        self.signs.push(sign);
    }

    /// Fact
    pub fn fact(&self) -> &GenesisCurrenciesFact {
        &self.fact
    }

    /// Node signs
    pub fn node_signs(&self) -> &[NodeSign] {
        &self.signs
    }
}

/// Operation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// [`CurrencyRegister`]
    CurrencyRegister,
    /// [`GenesisCurrencies`]
    GenesisCurrencies,
}

impl OperationKind {
    /// Stable name, used in logs and metric labels
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::CurrencyRegister => "currency-register",
            OperationKind::GenesisCurrencies => "genesis-currencies",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Any operation handled by this crate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Register a currency
    CurrencyRegister(CurrencyRegister),
    /// Genesis
    GenesisCurrencies(GenesisCurrencies),
}

impl Operation {
    /// Kind
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::CurrencyRegister(_) => OperationKind::CurrencyRegister,
            Operation::GenesisCurrencies(_) => OperationKind::GenesisCurrencies,
        }
    }

    /// Hash of the operation's fact
    pub fn fact_hash(&self) -> &FactHash {
        match self {
            Operation::CurrencyRegister(op) => op.fact().hash(),
            Operation::GenesisCurrencies(op) => op.fact().hash(),
        }
    }
}

impl From<CurrencyRegister> for Operation {
    fn from(op: CurrencyRegister) -> Self {
        Operation::CurrencyRegister(op)
    }
}

impl From<GenesisCurrencies> for Operation {
    fn from(op: GenesisCurrencies) -> Self {
        Operation::GenesisCurrencies(op)
    }
}
