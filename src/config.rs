//! Network deployments: contract addresses per chain.
//!
//! Addresses are supplied as data, either from the environment
//! ([`Network::from_env`]) or from a JSON table keyed by network name
//! ([`NetworkTable::from_json`]).

use std::collections::BTreeMap;

use alloy::primitives::{Address, hex::FromHexError};
use serde::Deserialize;
use url::Url;

use crate::pool::BALANCER_VAULT;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Environment configuration error: {0}")]
    Env(#[from] envy::Error),

    #[error("Invalid network table: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid address for {field}: {source}")]
    InvalidAddress {
        field: &'static str,
        source: FromHexError,
    },

    #[error("Invalid metadata cache URI: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Contracts of one deployment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Network {
    pub chain_id: u64,
    pub name: String,
    pub nft_factory: Address,
    pub datatoken_factory: Address,
    pub router: Address,
    pub vault: Address,
    pub ocean_token: Option<Address>,
    pub metadata_cache_uri: Option<Url>,
    /// First block worth scanning for events.
    pub start_block: u64,
}

impl Network {
    /// Reads `OCEAN_*` variables, e.g. `OCEAN_NFT_FACTORY`.
    pub fn from_env() -> Result<Self, ConfigError> {
        envy::prefixed("OCEAN_")
            .from_env::<NetworkConfig>()?
            .try_into()
    }
}

/// Raw network entry, addresses as hex strings.
#[derive(Clone, Debug, Deserialize)]
pub struct NetworkConfig {
    pub chain_id: u64,
    #[serde(default)]
    pub name: Option<String>,
    pub nft_factory: String,
    pub datatoken_factory: String,
    pub router: String,
    #[serde(default)]
    pub vault: Option<String>,
    #[serde(default)]
    pub ocean_token: Option<String>,
    #[serde(default)]
    pub metadata_cache_uri: Option<String>,
    #[serde(default)]
    pub start_block: u64,
}

impl TryFrom<NetworkConfig> for Network {
    type Error = ConfigError;

    fn try_from(config: NetworkConfig) -> Result<Self, Self::Error> {
        Ok(Self {
            chain_id: config.chain_id,
            name: config
                .name
                .unwrap_or_else(|| format!("chain-{}", config.chain_id)),
            nft_factory: parse_address("nft_factory", &config.nft_factory)?,
            datatoken_factory: parse_address("datatoken_factory", &config.datatoken_factory)?,
            router: parse_address("router", &config.router)?,
            vault: config
                .vault
                .as_deref()
                .map(|vault| parse_address("vault", vault))
                .transpose()?
                .unwrap_or(BALANCER_VAULT),
            ocean_token: config
                .ocean_token
                .as_deref()
                .map(|token| parse_address("ocean_token", token))
                .transpose()?,
            metadata_cache_uri: config
                .metadata_cache_uri
                .as_deref()
                .map(Url::parse)
                .transpose()?,
            start_block: config.start_block,
        })
    }
}

fn parse_address(field: &'static str, value: &str) -> Result<Address, ConfigError> {
    value
        .parse()
        .map_err(|source| ConfigError::InvalidAddress { field, source })
}

/// Known deployments keyed by network name.
#[derive(Clone, Debug, Default)]
pub struct NetworkTable {
    networks: BTreeMap<String, Network>,
}

impl NetworkTable {
    /// Parses `{"<name>": {"chain_id": .., "nft_factory": .., ..}, ..}`.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let raw: BTreeMap<String, NetworkConfig> = serde_json::from_str(json)?;
        let networks = raw
            .into_iter()
            .map(|(name, mut config)| {
                config.name.get_or_insert_with(|| name.clone());
                Network::try_from(config).map(|network| (name, network))
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { networks })
    }

    pub fn insert(&mut self, network: Network) {
        self.networks.insert(network.name.clone(), network);
    }

    pub fn by_name(&self, name: &str) -> Option<&Network> {
        self.networks.get(name)
    }

    pub fn by_chain_id(&self, chain_id: u64) -> Option<&Network> {
        self.networks
            .values()
            .find(|network| network.chain_id == chain_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Network> {
        self.networks.values()
    }
}
