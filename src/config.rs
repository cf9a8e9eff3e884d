//! Address book and event polling configuration
//!
//! Towns contracts live behind a handful of diamond proxies whose addresses
//! depend on the environment. [`ContractAddresses`] collects them and can be
//! loaded from a JSON deployment file or from `TOWNS_*` environment variables
//! (a `.env` file is honoured).

use std::env;
use std::str::FromStr;
use std::time::Duration;

use alloy_chains::NamedChain;
use alloy_primitives::Address;
use bon::Builder;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::chain::addresses::DELEGATE_REGISTRY_V1_ADDRESS;
use crate::{Result, TownsError};

pub const ENV_RPC_URL: &str = "TOWNS_RPC_URL";
pub const ENV_CHAIN_ID: &str = "TOWNS_CHAIN_ID";
pub const ENV_SPACE_FACTORY: &str = "TOWNS_SPACE_FACTORY_ADDRESS";
pub const ENV_BASE_REGISTRY: &str = "TOWNS_BASE_REGISTRY_ADDRESS";
pub const ENV_APP_REGISTRY: &str = "TOWNS_APP_REGISTRY_ADDRESS";
pub const ENV_DELEGATE_REGISTRY: &str = "TOWNS_DELEGATE_REGISTRY_ADDRESS";

/// Addresses of the Towns contracts for one environment.
///
/// - `space_factory` hosts the wallet link facet.
/// - `base_registry` hosts the entitlement checker and xchain facets.
/// - `app_registry` is the app registry diamond.
/// - `delegate_registry` defaults to the canonical delegate.xyz v1 registry.
///
/// Space addresses (channels, membership) are per community and are passed to
/// the contract wrappers directly.
///
/// # Example
///
/// ```rust
/// use towns_bindings::ContractAddresses;
///
/// let addresses = ContractAddresses::from_json(r#"{
///     "chainId": 84532,
///     "spaceFactory": "0x0000000000000000000000000000000000000001"
/// }"#).unwrap();
///
/// assert!(addresses.space_factory.is_some());
/// assert!(addresses.app_registry.is_none());
/// ```
#[derive(Builder, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractAddresses {
    pub chain_id: u64,
    pub rpc_url: Option<Url>,
    pub space_factory: Option<Address>,
    pub base_registry: Option<Address>,
    pub app_registry: Option<Address>,
    #[serde(default = "default_delegate_registry")]
    #[builder(default = DELEGATE_REGISTRY_V1_ADDRESS)]
    pub delegate_registry: Address,
}

fn default_delegate_registry() -> Address {
    DELEGATE_REGISTRY_V1_ADDRESS
}

impl ContractAddresses {
    /// Parse a JSON deployment description.
    pub fn from_json(json: &str) -> Result<Self> {
        let addresses: Self = serde_json::from_str(json)?;
        debug!(
            chain_id = addresses.chain_id,
            event = "contract_addresses_loaded_from_json"
        );
        Ok(addresses)
    }

    /// Load addresses from `TOWNS_*` environment variables.
    ///
    /// A `.env` file in the working directory is read first if present.
    /// `TOWNS_CHAIN_ID` is required; every address is optional.
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                warn!(error = %e, event = "dotenv_load_failed");
            }
        }

        let chain_id = env::var(ENV_CHAIN_ID)
            .map_err(|_| TownsError::InvalidConfig(format!("{ENV_CHAIN_ID} is not set")))?
            .parse::<u64>()
            .map_err(|e| TownsError::InvalidConfig(format!("{ENV_CHAIN_ID}: {e}")))?;

        let addresses = Self {
            chain_id,
            rpc_url: parse_env(ENV_RPC_URL)?,
            space_factory: parse_env(ENV_SPACE_FACTORY)?,
            base_registry: parse_env(ENV_BASE_REGISTRY)?,
            app_registry: parse_env(ENV_APP_REGISTRY)?,
            delegate_registry: parse_env(ENV_DELEGATE_REGISTRY)?
                .unwrap_or(DELEGATE_REGISTRY_V1_ADDRESS),
        };

        debug!(
            chain_id = addresses.chain_id,
            event = "contract_addresses_loaded_from_env"
        );
        Ok(addresses)
    }

    /// The named chain for `chain_id`, if alloy knows it.
    pub fn named_chain(&self) -> Option<NamedChain> {
        NamedChain::try_from(self.chain_id).ok()
    }

    /// Returns the space factory address or a configuration error.
    pub fn require_space_factory(&self) -> Result<Address> {
        self.space_factory
            .ok_or_else(|| TownsError::InvalidConfig("space factory address missing".into()))
    }

    /// Returns the base registry address or a configuration error.
    pub fn require_base_registry(&self) -> Result<Address> {
        self.base_registry
            .ok_or_else(|| TownsError::InvalidConfig("base registry address missing".into()))
    }

    /// Returns the app registry address or a configuration error.
    pub fn require_app_registry(&self) -> Result<Address> {
        self.app_registry
            .ok_or_else(|| TownsError::InvalidConfig("app registry address missing".into()))
    }
}

fn parse_env<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| TownsError::InvalidConfig(format!("{key}: {e}"))),
        Err(_) => Ok(None),
    }
}

/// Configuration for event queries and watch streams.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use towns_bindings::EventPollingConfig;
///
/// let config = EventPollingConfig::default()
///     .with_poll_interval(Duration::from_secs(1))
///     .with_max_block_range(500);
///
/// assert_eq!(config.max_block_range, 500);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventPollingConfig {
    /// Time to wait before polling again when no new block arrived.
    pub poll_interval: Duration,
    /// Largest block span requested in a single `eth_getLogs` call.
    pub max_block_range: u64,
}

impl Default for EventPollingConfig {
    /// Two seconds matches Base block time; 2000 blocks stays under the log
    /// range limit of common hosted RPC providers.
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            max_block_range: 2000,
        }
    }
}

impl EventPollingConfig {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the block span per `eth_getLogs` call. Zero is treated as one.
    pub fn with_max_block_range(mut self, range: u64) -> Self {
        self.max_block_range = range.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn test_from_json_defaults_delegate_registry() {
        let addresses = ContractAddresses::from_json(
            r#"{
                "chainId": 8453,
                "rpcUrl": "https://mainnet.base.org",
                "baseRegistry": "0x00000000000000000000000000000000000000aa"
            }"#,
        )
        .unwrap();

        assert_eq!(addresses.delegate_registry, DELEGATE_REGISTRY_V1_ADDRESS);
        assert_eq!(
            addresses.base_registry,
            Some(address!("00000000000000000000000000000000000000aa"))
        );
        assert_eq!(addresses.named_chain(), Some(NamedChain::Base));
        assert_eq!(
            addresses.rpc_url.as_ref().map(Url::as_str),
            Some("https://mainnet.base.org/")
        );
    }

    #[test]
    fn test_from_json_rejects_bad_address() {
        let result = ContractAddresses::from_json(r#"{"chainId": 1, "appRegistry": "0x1234"}"#);
        assert!(matches!(result, Err(TownsError::Json(_))));
    }

    #[test]
    fn test_require_missing_address() {
        let addresses = ContractAddresses::builder().chain_id(31337).build();

        assert!(matches!(
            addresses.require_app_registry(),
            Err(TownsError::InvalidConfig(_))
        ));
        assert_eq!(addresses.delegate_registry, DELEGATE_REGISTRY_V1_ADDRESS);
    }

    #[test]
    fn test_json_roundtrip_uses_camel_case() {
        let addresses = ContractAddresses::builder()
            .chain_id(84532)
            .space_factory(address!("0000000000000000000000000000000000000001"))
            .build();

        let json = serde_json::to_string(&addresses).unwrap();
        assert!(json.contains("\"spaceFactory\""));
        assert!(json.contains("\"delegateRegistry\""));
        assert_eq!(ContractAddresses::from_json(&json).unwrap(), addresses);
    }

    #[test]
    fn test_polling_config_defaults() {
        let config = EventPollingConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.max_block_range, 2000);
    }

    #[test]
    fn test_zero_block_range_is_clamped() {
        let config = EventPollingConfig::default().with_max_block_range(0);
        assert_eq!(config.max_block_range, 1);
    }
}
