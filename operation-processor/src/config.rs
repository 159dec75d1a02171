//! Configuration for operation processing

use crate::operation::{GenesisCurrencies, GenesisCurrenciesFact};
use crate::suffrage::Threshold;
use crate::{Error, Result};
use ledger_state::{
    Address, Amount, CurrencyDesign, CurrencyId, CurrencyPolicy, Feeer, Key, Keys, PublicKey,
    U256,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Processor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Network id mixed into every signed fact
    pub network_id: String,

    /// Suffrage threshold, percent in (0, 100]
    pub threshold: Decimal,

    /// Processor pool configuration
    #[serde(default)]
    pub pool: PoolConfig,

    /// Genesis block content
    #[serde(default)]
    pub genesis: Option<GenesisConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network_id: "mitum".to_string(),
            threshold: Decimal::new(67, 0),
            pool: PoolConfig::default(),
            genesis: None,
        }
    }
}

/// Processor pool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Idle processors kept per operation type
    pub max_idle: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { max_idle: 64 }
    }
}

/// Genesis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenesisConfig {
    /// Fact token
    #[serde(default)]
    pub token: String,

    /// Keys of the founding account
    pub keys: Vec<KeyConfig>,

    /// Threshold of the founding account keys
    pub keys_threshold: u8,

    /// Currencies to seed
    pub currencies: Vec<CurrencyConfig>,
}

/// Account key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyConfig {
    /// Hex encoded ed25519 public key
    pub publickey: String,

    /// Weight, 1 to 100
    pub weight: u8,
}

/// Currency seeded at genesis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrencyConfig {
    /// Currency id
    pub currency: String,

    /// Genesis amount, decimal string
    pub amount: String,

    /// Minimum balance of new accounts, decimal string
    #[serde(default = "zero_string")]
    pub new_account_min_balance: String,

    /// Fee strategy
    #[serde(default)]
    pub feeer: FeeerConfig,
}

/// Fee strategy
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FeeerConfig {
    /// No fee
    #[default]
    Nil,
    /// Fixed fee
    Fixed {
        /// Fee receiver address
        receiver: String,
        /// Fee, decimal string
        amount: String,
    },
    /// Proportional fee
    Ratio {
        /// Fee receiver address
        receiver: String,
        /// Ratio in [0, 1]
        ratio: Decimal,
        /// Minimum fee, decimal string
        min: String,
        /// Maximum fee, decimal string
        max: String,
    },
}

fn zero_string() -> String {
    "0".to_string()
}

fn parse_big(field: &str, s: &str) -> Result<U256> {
    U256::from_dec_str(s).map_err(|e| Error::Config(format!("invalid {} {:?}: {:?}", field, s, e)))
}

impl FeeerConfig {
    fn build(&self) -> Result<Feeer> {
        match self {
            FeeerConfig::Nil => Ok(Feeer::Nil),
            FeeerConfig::Fixed { receiver, amount } => Ok(Feeer::Fixed {
                receiver: Address::new(receiver.as_str())?,
                amount: parse_big("fee amount", amount)?,
            }),
            FeeerConfig::Ratio {
                receiver,
                ratio,
                min,
                max,
            } => Ok(Feeer::ratio(
                Address::new(receiver.as_str())?,
                *ratio,
                parse_big("fee min", min)?,
                parse_big("fee max", max)?,
            )?),
        }
    }
}

impl GenesisConfig {
    /// Founding account keys
    pub fn keys(&self) -> Result<Keys> {
        let keys = self
            .keys
            .iter()
            .map(|k| Key::new(PublicKey::from_hex(&k.publickey)?, k.weight))
            .collect::<ledger_state::Result<Vec<_>>>()?;

        Ok(Keys::new(keys, self.keys_threshold)?)
    }

    /// Currency designs, genesis account set to the founding account
    pub fn currencies(&self, genesis_account: &Address) -> Result<Vec<CurrencyDesign>> {
        self.currencies
            .iter()
            .map(|c| -> Result<CurrencyDesign> {
                let currency = CurrencyId::new(c.currency.as_str())?;
                let amount = Amount::new(currency, parse_big("amount", &c.amount)?);
                let policy = CurrencyPolicy::new(
                    parse_big("new_account_min_balance", &c.new_account_min_balance)?,
                    c.feeer.build()?,
                );

                Ok(CurrencyDesign::new(amount, genesis_account.clone(), policy))
            })
            .collect()
    }

    /// Build the genesis operation
    pub fn operation(&self) -> Result<GenesisCurrencies> {
        let keys = self.keys()?;
        let address = Address::from_keys(&keys);
        let currencies = self.currencies(&address)?;

        let fact = GenesisCurrenciesFact::new(self.token.as_bytes(), keys, currencies)?;
        Ok(GenesisCurrencies::new(fact))
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.threshold()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        if let Ok(network_id) = std::env::var("PROCESSOR_NETWORK_ID") {
            config.network_id = network_id;
        }

        if let Ok(threshold) = std::env::var("PROCESSOR_THRESHOLD") {
            config.threshold = threshold
                .parse()
                .map_err(|e| Error::Config(format!("Invalid PROCESSOR_THRESHOLD: {}", e)))?;
        }

        if let Ok(max_idle) = std::env::var("PROCESSOR_POOL_MAX_IDLE") {
            config.pool.max_idle = max_idle
                .parse()
                .map_err(|e| Error::Config(format!("Invalid PROCESSOR_POOL_MAX_IDLE: {}", e)))?;
        }

        config.threshold()?;
        Ok(config)
    }

    /// Validated threshold
    pub fn threshold(&self) -> Result<Threshold> {
        Threshold::new(self.threshold)
    }
}
