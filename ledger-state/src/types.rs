//! Core types for the ledger state
//!
//! All types are designed for:
//! - Deterministic serialization (bincode)
//! - Exact arithmetic (U256 magnitudes, Decimal ratios)
//! - Validation at construction, so a held value is always well-formed

use crate::{Error, Result};
use primitive_types::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Block height at which state was written
pub type Height = u64;

/// Suffix carried by every account address
const ADDRESS_SUFFIX: &str = "mca";

/// Suffix of the pool (zero) account address of a currency
const ZERO_ADDRESS_SUFFIX: &str = "-Xmca";

/// Currency identifier (e.g. "USD", "MCC")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CurrencyId(String);

impl CurrencyId {
    /// Minimum length
    pub const MIN_LEN: usize = 3;
    /// Maximum length
    pub const MAX_LEN: usize = 10;

    /// Create a validated currency id
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();

        if id.len() < Self::MIN_LEN || id.len() > Self::MAX_LEN {
            return Err(Error::InvalidValue(format!(
                "currency id {:?} must be {}..={} characters",
                id,
                Self::MIN_LEN,
                Self::MAX_LEN
            )));
        }

        let is_edge = |c: char| c.is_ascii_uppercase() || c.is_ascii_digit();
        let is_body = |c: char| is_edge(c) || matches!(c, '_' | '.' | '!' | '$' | '*' | '@');

        let first = id.chars().next().unwrap_or(' ');
        let last = id.chars().last().unwrap_or(' ');
        if !is_edge(first) || !is_edge(last) || !id.chars().all(is_body) {
            return Err(Error::InvalidValue(format!("invalid currency id {:?}", id)));
        }

        Ok(Self(id))
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CurrencyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Currency amount: a non-negative magnitude of one currency
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Amount {
    currency: CurrencyId,
    big: U256,
}

impl Amount {
    /// Create new amount
    pub fn new(currency: CurrencyId, big: U256) -> Self {
        Self { currency, big }
    }

    /// Zero amount of a currency
    pub fn zero(currency: CurrencyId) -> Self {
        Self::new(currency, U256::zero())
    }

    /// Currency of this amount
    pub fn currency(&self) -> &CurrencyId {
        &self.currency
    }

    /// Magnitude
    pub fn big(&self) -> U256 {
        self.big
    }

    /// Same currency, different magnitude
    pub fn with_big(&self, big: U256) -> Self {
        Self::new(self.currency.clone(), big)
    }

    /// Add two amounts of the same currency
    pub fn checked_add(&self, other: &Amount) -> Result<Amount> {
        if self.currency != other.currency {
            return Err(Error::CurrencyMismatch {
                expected: self.currency.to_string(),
                actual: other.currency.to_string(),
            });
        }

        let big = self.big.checked_add(other.big).ok_or_else(|| {
            Error::Overflow(format!("{} + {} {}", self.big, other.big, self.currency))
        })?;

        Ok(self.with_big(big))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.big, self.currency)
    }
}

/// Ed25519 public key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PublicKey([u8; 32]);

impl PublicKey {
    /// Create from bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse from hex
    pub fn from_hex(s: &str) -> Result<Self> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|e| Error::InvalidValue(format!("invalid public key {:?}: {}", s, e)))?;
        Ok(Self(bytes))
    }

    /// Get bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Digital signature (Ed25519)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Signature bytes (64 bytes)
    #[serde(with = "serde_bytes")]
    bytes: Vec<u8>,
}

impl Signature {
    /// Create from bytes
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self {
            bytes: bytes.to_vec(),
        }
    }

    /// Get bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Weighted signing key of an account
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Key {
    key: PublicKey,
    weight: u8,
}

impl Key {
    /// Create a key with weight in 1..=100
    pub fn new(key: PublicKey, weight: u8) -> Result<Self> {
        if weight == 0 || weight > 100 {
            return Err(Error::InvalidValue(format!(
                "key weight {} out of range 1..=100",
                weight
            )));
        }

        Ok(Self { key, weight })
    }

    /// Public key
    pub fn key(&self) -> &PublicKey {
        &self.key
    }

    /// Weight
    pub fn weight(&self) -> u8 {
        self.weight
    }
}

/// Account keys with signing threshold
///
/// Keys are kept sorted by public key so that the derived address does not
/// depend on the order in which they were supplied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Keys {
    keys: Vec<Key>,
    threshold: u8,
}

impl Keys {
    /// Create validated keys
    pub fn new(mut keys: Vec<Key>, threshold: u8) -> Result<Self> {
        if keys.is_empty() {
            return Err(Error::InvalidValue("empty keys".to_string()));
        }

        if threshold == 0 || threshold > 100 {
            return Err(Error::InvalidValue(format!(
                "keys threshold {} out of range 1..=100",
                threshold
            )));
        }

        keys.sort_by(|a, b| a.key.cmp(&b.key));
        if keys.windows(2).any(|w| w[0].key == w[1].key) {
            return Err(Error::InvalidValue("duplicated key".to_string()));
        }

        let total: u32 = keys.iter().map(|k| u32::from(k.weight)).sum();
        if total < u32::from(threshold) {
            return Err(Error::InvalidValue(format!(
                "sum of weights {} under threshold {}",
                total, threshold
            )));
        }

        Ok(Self { keys, threshold })
    }

    /// Keys, sorted by public key
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// Signing threshold
    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// Canonical bytes used for address derivation
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.keys.len() * 33 + 1);
        for key in &self.keys {
            bytes.extend_from_slice(key.key.as_bytes());
            bytes.push(key.weight);
        }
        bytes.push(self.threshold);
        bytes
    }
}

/// Account address
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(String);

impl Address {
    /// Create from an existing address string
    pub fn new(address: impl Into<String>) -> Result<Self> {
        let address = address.into();

        if !address.ends_with(ADDRESS_SUFFIX) || address.len() == ADDRESS_SUFFIX.len() {
            return Err(Error::InvalidValue(format!(
                "address {:?} must end with {:?}",
                address, ADDRESS_SUFFIX
            )));
        }

        if address.contains(':') || address.chars().any(char::is_whitespace) {
            return Err(Error::InvalidValue(format!("invalid address {:?}", address)));
        }

        Ok(Self(address))
    }

    /// Derive the address owned by a key set
    pub fn from_keys(keys: &Keys) -> Self {
        let digest = blake3::hash(&keys.canonical_bytes());
        Self(format!(
            "{}{}",
            hex::encode(&digest.as_bytes()[..20]),
            ADDRESS_SUFFIX
        ))
    }

    /// Pool (zero) account address of a currency
    pub fn zero(currency: &CurrencyId) -> Self {
        Self(format!("{}{}", currency, ZERO_ADDRESS_SUFFIX))
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Account: a keyed account, or a keyless pool account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    address: Address,
    keys: Option<Keys>,
}

impl Account {
    /// Create a keyed account; the address must be the one derived from `keys`
    pub fn new(address: Address, keys: Keys) -> Result<Self> {
        let expected = Address::from_keys(&keys);
        if expected != address {
            return Err(Error::InvalidValue(format!(
                "address {} does not match keys, expected {}",
                address, expected
            )));
        }

        Ok(Self {
            address,
            keys: Some(keys),
        })
    }

    /// Create a keyed account at the address derived from `keys`
    pub fn from_keys(keys: Keys) -> Self {
        Self {
            address: Address::from_keys(&keys),
            keys: Some(keys),
        }
    }

    /// Pool account of a currency; it has no signing keys
    pub fn zero(currency: &CurrencyId) -> Self {
        Self {
            address: Address::zero(currency),
            keys: None,
        }
    }

    /// Address
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Signing keys (none for pool accounts)
    pub fn keys(&self) -> Option<&Keys> {
        self.keys.as_ref()
    }
}

/// Fee computation strategy of a currency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Feeer {
    /// No fee
    Nil,
    /// Fixed fee per operation
    Fixed {
        /// Fee receiver
        receiver: Address,
        /// Fee
        amount: U256,
    },
    /// Fee proportional to the amount, clamped into [min, max]
    Ratio {
        /// Fee receiver
        receiver: Address,
        /// Ratio in [0, 1]
        ratio: Decimal,
        /// Minimum fee
        min: U256,
        /// Maximum fee
        max: U256,
    },
}

impl Feeer {
    /// Create a validated ratio feeer
    pub fn ratio(receiver: Address, ratio: Decimal, min: U256, max: U256) -> Result<Self> {
        if ratio < Decimal::ZERO || ratio > Decimal::ONE {
            return Err(Error::InvalidValue(format!(
                "fee ratio {} out of range [0, 1]",
                ratio
            )));
        }

        if min > max {
            return Err(Error::InvalidValue(format!(
                "fee min {} over max {}",
                min, max
            )));
        }

        Ok(Feeer::Ratio {
            receiver,
            ratio,
            min,
            max,
        })
    }

    /// Fee receiver, if any
    pub fn receiver(&self) -> Option<&Address> {
        match self {
            Feeer::Nil => None,
            Feeer::Fixed { receiver, .. } | Feeer::Ratio { receiver, .. } => Some(receiver),
        }
    }

    /// Fee charged for moving `amount`
    pub fn fee(&self, amount: U256) -> Result<U256> {
        match self {
            Feeer::Nil => Ok(U256::zero()),
            Feeer::Fixed { amount: fee, .. } => Ok(*fee),
            Feeer::Ratio {
                ratio, min, max, ..
            } => {
                // ratio = mantissa / 10^scale, mantissa is non-negative
                let mantissa = U256::from(ratio.mantissa().unsigned_abs());
                let scaled = amount
                    .checked_mul(mantissa)
                    .ok_or_else(|| Error::Overflow(format!("fee of {} at {}", amount, ratio)))?;
                let fee = scaled / U256::exp10(ratio.scale() as usize);

                Ok(fee.max(*min).min(*max))
            }
        }
    }
}

/// Currency policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyPolicy {
    /// Minimum balance a new account must be funded with
    pub new_account_min_balance: U256,

    /// Fee strategy
    pub feeer: Feeer,
}

impl CurrencyPolicy {
    /// Create new policy
    pub fn new(new_account_min_balance: U256, feeer: Feeer) -> Self {
        Self {
            new_account_min_balance,
            feeer,
        }
    }
}

impl Default for CurrencyPolicy {
    fn default() -> Self {
        Self::new(U256::zero(), Feeer::Nil)
    }
}

/// Registered currency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyDesign {
    /// Genesis amount; its currency is the currency id
    pub amount: Amount,

    /// Account holding the genesis amount
    pub genesis_account: Address,

    /// Policy
    pub policy: CurrencyPolicy,

    /// Total amount issued
    pub aggregate: U256,
}

impl CurrencyDesign {
    /// Create new design; the aggregate starts at the genesis amount
    pub fn new(amount: Amount, genesis_account: Address, policy: CurrencyPolicy) -> Self {
        let aggregate = amount.big();
        Self {
            amount,
            genesis_account,
            policy,
            aggregate,
        }
    }

    /// Currency id
    pub fn currency(&self) -> &CurrencyId {
        self.amount.currency()
    }

    /// Same design owned by another genesis account
    pub fn with_genesis_account(&self, genesis_account: Address) -> Self {
        Self {
            genesis_account,
            ..self.clone()
        }
    }
}

/// Marks an account as a contract account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractAccountStatus {
    /// Owner of the contract account
    pub owner: Address,

    /// Whether the contract account is active
    pub is_active: bool,
}

/// Suffrage member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuffrageNode {
    /// Node address
    pub address: Address,

    /// Node signing key
    pub publickey: PublicKey,
}

/// Current validator set, as stored under the suffrage key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuffrageNodes {
    /// Members
    pub nodes: Vec<SuffrageNode>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(seeds: &[u8]) -> Keys {
        let keys = seeds
            .iter()
            .map(|s| Key::new(PublicKey::from_bytes([*s; 32]), 100).unwrap())
            .collect();
        Keys::new(keys, 100).unwrap()
    }

    #[test]
    fn test_currency_id_validation() {
        assert!(CurrencyId::new("USD").is_ok());
        assert!(CurrencyId::new("MC_C.1").is_ok());
        assert!(CurrencyId::new("US").is_err());
        assert!(CurrencyId::new("usd").is_err());
        assert!(CurrencyId::new("_USD").is_err());
        assert!(CurrencyId::new("USD!").is_err());
        assert!(CurrencyId::new("ABCDEFGHIJK").is_err());
    }

    #[test]
    fn test_amount_checked_add() {
        let usd = CurrencyId::new("USD").unwrap();
        let eur = CurrencyId::new("EUR").unwrap();

        let a = Amount::new(usd.clone(), U256::from(1000u64));
        let b = Amount::new(usd, U256::from(500u64));
        assert_eq!(a.checked_add(&b).unwrap().big(), U256::from(1500u64));

        let c = Amount::new(eur, U256::one());
        assert!(matches!(
            a.checked_add(&c),
            Err(Error::CurrencyMismatch { .. })
        ));

        let max = a.with_big(U256::MAX);
        assert!(matches!(max.checked_add(&a), Err(Error::Overflow(_))));
    }

    #[test]
    fn test_keys_validation() {
        let k = PublicKey::from_bytes([1u8; 32]);
        assert!(Keys::new(vec![], 100).is_err());
        assert!(Key::new(k, 0).is_err());
        assert!(Keys::new(vec![Key::new(k, 50).unwrap()], 100).is_err());
        assert!(Keys::new(vec![Key::new(k, 50).unwrap(), Key::new(k, 50).unwrap()], 100).is_err());
    }

    #[test]
    fn test_address_from_keys_is_order_independent() {
        let a = keys(&[1, 2, 3]);
        let b = keys(&[3, 1, 2]);
        assert_eq!(Address::from_keys(&a), Address::from_keys(&b));
        assert_ne!(Address::from_keys(&a), Address::from_keys(&keys(&[1, 2])));
        assert!(Address::from_keys(&a).as_str().ends_with("mca"));
    }

    #[test]
    fn test_zero_address() {
        let usd = CurrencyId::new("USD").unwrap();
        assert_eq!(Address::zero(&usd).as_str(), "USD-Xmca");
        assert!(Account::zero(&usd).keys().is_none());
    }

    #[test]
    fn test_account_address_must_match_keys() {
        let k = keys(&[7]);
        let other = Address::new("someonemca").unwrap();
        assert!(Account::new(other, k.clone()).is_err());
        assert!(Account::new(Address::from_keys(&k), k).is_ok());
    }

    #[test]
    fn test_address_validation() {
        assert!(Address::new("abcmca").is_ok());
        assert!(Address::new("mca").is_err());
        assert!(Address::new("abc").is_err());
        assert!(Address::new("a:bmca").is_err());
    }

    #[test]
    fn test_feeer_fee() {
        let receiver = Address::new("feemca").unwrap();

        assert_eq!(Feeer::Nil.fee(U256::from(100u64)).unwrap(), U256::zero());

        let fixed = Feeer::Fixed {
            receiver: receiver.clone(),
            amount: U256::from(3u64),
        };
        assert_eq!(fixed.fee(U256::from(100u64)).unwrap(), U256::from(3u64));
        assert_eq!(fixed.receiver(), Some(&receiver));

        // 1.5% of 10_000 = 150, clamped into [10, 100]
        let ratio = Feeer::ratio(
            receiver.clone(),
            Decimal::new(15, 3),
            U256::from(10u64),
            U256::from(100u64),
        )
        .unwrap();
        assert_eq!(ratio.fee(U256::from(10_000u64)).unwrap(), U256::from(100u64));
        assert_eq!(ratio.fee(U256::from(2_000u64)).unwrap(), U256::from(30u64));
        assert_eq!(ratio.fee(U256::from(100u64)).unwrap(), U256::from(10u64));

        assert!(Feeer::ratio(receiver.clone(), Decimal::new(2, 0), U256::zero(), U256::one()).is_err());
        assert!(Feeer::ratio(receiver, Decimal::ONE, U256::from(2u64), U256::one()).is_err());
    }

    #[test]
    fn test_currency_design_aggregate() {
        let usd = CurrencyId::new("USD").unwrap();
        let genesis = Address::new("genesismca").unwrap();
        let design = CurrencyDesign::new(
            Amount::new(usd.clone(), U256::from(1000u64)),
            genesis,
            CurrencyPolicy::default(),
        );
        assert_eq!(design.aggregate, U256::from(1000u64));
        assert_eq!(design.currency(), &usd);

        let moved = design.with_genesis_account(Address::new("othermca").unwrap());
        assert_eq!(moved.genesis_account.as_str(), "othermca");
        assert_eq!(moved.amount, design.amount);
    }
}
