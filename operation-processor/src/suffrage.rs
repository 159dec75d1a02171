//! Suffrage, signing threshold and the quorum check
//!
//! An operation is authorized when enough distinct suffrage nodes signed its
//! fact. A sign counts only if its node is a suffrage member, the signer is
//! that member's key, and the signature verifies over
//! `fact_hash || network_id`.

use crate::operation::{FactHash, NetworkId, NodeSign};
use crate::{Error, Result};
use ledger_state::crypto::verify_signature;
use ledger_state::{Address, PublicKey, SuffrageNodes};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

/// Signing threshold, as a percentage of the suffrage in (0, 100]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Threshold(Decimal);

impl Threshold {
    /// Create a validated threshold
    pub fn new(percent: Decimal) -> Result<Self> {
        if percent <= Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
            return Err(Error::Config(format!(
                "threshold {} out of range (0, 100]",
                percent
            )));
        }

        Ok(Self(percent))
    }

    /// Percentage
    pub fn percent(&self) -> Decimal {
        self.0
    }

    /// Signs required out of `n` suffrage nodes: ceil(n * threshold / 100)
    pub fn required(&self, n: usize) -> usize {
        let required = (Decimal::from(n) * self.0 / Decimal::ONE_HUNDRED).ceil();
        required.to_usize().unwrap_or(n)
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self(Decimal::new(67, 0))
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Validator set snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suffrage {
    nodes: BTreeMap<Address, PublicKey>,
}

impl Suffrage {
    /// Build from the stored suffrage value
    pub fn new(nodes: &SuffrageNodes) -> Result<Self> {
        let mut members = BTreeMap::new();
        for node in &nodes.nodes {
            if members.insert(node.address.clone(), node.publickey).is_some() {
                return Err(Error::InvariantViolation(format!(
                    "duplicated suffrage node {}",
                    node.address
                )));
            }
        }

        Ok(Self { nodes: members })
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the suffrage is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether `node` is a member
    pub fn exists(&self, node: &Address) -> bool {
        self.nodes.contains_key(node)
    }

    /// Signing key of a member
    pub fn publickey(&self, node: &Address) -> Option<&PublicKey> {
        self.nodes.get(node)
    }
}

/// Quorum check failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuorumError {
    /// No suffrage node to sign
    #[error("empty suffrage")]
    EmptySuffrage,

    /// Too few valid signs
    #[error("{actual}/{required} valid suffrage signs")]
    NotEnoughSigns {
        /// Valid signs from distinct suffrage nodes
        actual: usize,
        /// Signs required by the threshold
        required: usize,
    },
}

/// Check that `signs` reach `threshold` of `suffrage`
pub fn check_fact_signs_by_suffrage(
    suffrage: &Suffrage,
    threshold: Threshold,
    fact_hash: &FactHash,
    network_id: &NetworkId,
    signs: &[NodeSign],
) -> std::result::Result<(), QuorumError> {
    if suffrage.is_empty() {
        return Err(QuorumError::EmptySuffrage);
    }

    let message = network_id.sign_message(fact_hash);

    let signed: BTreeSet<&Address> = signs
        .iter()
        .filter(|sign| suffrage.publickey(&sign.node) == Some(&sign.signer))
        .filter(|sign| verify_signature(&message, &sign.signature, &sign.signer))
        .map(|sign| &sign.node)
        .collect();

    let required = threshold.required(suffrage.len());
    if signed.len() < required {
        return Err(QuorumError::NotEnoughSigns {
            actual: signed.len(),
            required,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_state::{KeyPair, SuffrageNode};

    fn node(i: u8) -> (Address, KeyPair) {
        (
            Address::new(format!("node{}mca", i)).unwrap(),
            KeyPair::from_seed(&[i; 32]),
        )
    }

    fn suffrage(nodes: &[(Address, KeyPair)]) -> Suffrage {
        let nodes = SuffrageNodes {
            nodes: nodes
                .iter()
                .map(|(address, keypair)| SuffrageNode {
                    address: address.clone(),
                    publickey: keypair.public_key(),
                })
                .collect(),
        };
        Suffrage::new(&nodes).unwrap()
    }

    #[test]
    fn test_threshold_required() {
        let t = Threshold::new(Decimal::new(67, 0)).unwrap();
        assert_eq!(t.required(3), 3);
        assert_eq!(t.required(4), 3);
        assert_eq!(t.required(1), 1);

        let half = Threshold::new(Decimal::new(50, 0)).unwrap();
        assert_eq!(half.required(4), 2);
        assert_eq!(half.required(5), 3);

        assert!(Threshold::new(Decimal::ZERO).is_err());
        assert!(Threshold::new(Decimal::new(101, 0)).is_err());
    }

    #[test]
    fn test_quorum_reached() {
        let nodes: Vec<_> = (1..=3).map(node).collect();
        let suf = suffrage(&nodes);
        let network = NetworkId::new("testnet");
        let fact = FactHash::from_bytes([9u8; 32]);

        let signs: Vec<_> = nodes
            .iter()
            .take(2)
            .map(|(address, keypair)| NodeSign::sign(keypair, address.clone(), &fact, &network))
            .collect();

        let half = Threshold::new(Decimal::new(50, 0)).unwrap();
        assert!(check_fact_signs_by_suffrage(&suf, half, &fact, &network, &signs).is_ok());

        let all = Threshold::new(Decimal::ONE_HUNDRED).unwrap();
        assert_eq!(
            check_fact_signs_by_suffrage(&suf, all, &fact, &network, &signs),
            Err(QuorumError::NotEnoughSigns {
                actual: 2,
                required: 3
            })
        );
    }

    #[test]
    fn test_foreign_and_duplicate_signs_ignored() {
        let nodes: Vec<_> = (1..=2).map(node).collect();
        let suf = suffrage(&nodes);
        let network = NetworkId::new("testnet");
        let fact = FactHash::from_bytes([9u8; 32]);
        let (outsider, outsider_key) = node(7);

        let (address, keypair) = &nodes[0];
        let signs = vec![
            NodeSign::sign(keypair, address.clone(), &fact, &network),
            NodeSign::sign(keypair, address.clone(), &fact, &network),
            NodeSign::sign(&outsider_key, outsider, &fact, &network),
            // member address signed with someone else's key
            NodeSign::sign(&outsider_key, nodes[1].0.clone(), &fact, &network),
        ];

        let all = Threshold::new(Decimal::ONE_HUNDRED).unwrap();
        assert_eq!(
            check_fact_signs_by_suffrage(&suf, all, &fact, &network, &signs),
            Err(QuorumError::NotEnoughSigns {
                actual: 1,
                required: 2
            })
        );
    }

    #[test]
    fn test_wrong_network_rejected() {
        let nodes: Vec<_> = (1..=1).map(node).collect();
        let suf = suffrage(&nodes);
        let fact = FactHash::from_bytes([9u8; 32]);

        let (address, keypair) = &nodes[0];
        let signs = vec![NodeSign::sign(
            keypair,
            address.clone(),
            &fact,
            &NetworkId::new("mainnet"),
        )];

        assert!(check_fact_signs_by_suffrage(
            &suf,
            Threshold::default(),
            &fact,
            &NetworkId::new("testnet"),
            &signs
        )
        .is_err());
    }

    #[test]
    fn test_empty_suffrage() {
        let suf = Suffrage::new(&SuffrageNodes::default()).unwrap();
        assert_eq!(
            check_fact_signs_by_suffrage(
                &suf,
                Threshold::default(),
                &FactHash::from_bytes([0u8; 32]),
                &NetworkId::new("testnet"),
                &[]
            ),
            Err(QuorumError::EmptySuffrage)
        );
    }
}
