//! Chain defaults for Towns contracts
//!
//! Towns runs its registries on Base (and Base Sepolia for testing), while
//! delegations are read from Ethereum mainnet. Local development targets Anvil.

pub mod addresses;

use std::time::Duration;

use alloy_chains::NamedChain;
use alloy_primitives::Address;

use crate::config::EventPollingConfig;
use crate::{Result, TownsError};
use addresses::DELEGATE_REGISTRY_V1_ADDRESS;

/// Chain-level defaults used when binding Towns contracts.
///
/// # Example
///
/// ```rust
/// use alloy_chains::NamedChain;
/// use towns_bindings::TownsChain;
///
/// assert_eq!(NamedChain::Base.average_block_time_secs().unwrap(), 2);
/// assert!(NamedChain::Polygon.average_block_time_secs().is_err());
/// ```
pub trait TownsChain {
    /// Returns true if Towns contracts are deployed on this chain.
    fn is_towns_chain(&self) -> bool;

    /// The delegate registry address on this chain.
    fn delegate_registry_address(&self) -> Result<Address>;

    /// Average block time, used to size watch poll intervals.
    fn average_block_time_secs(&self) -> Result<u64>;

    /// Polling configuration tuned to the chain's block time.
    fn event_polling_config(&self) -> Result<EventPollingConfig> {
        let block_time = self.average_block_time_secs()?;
        Ok(EventPollingConfig::default().with_poll_interval(Duration::from_secs(block_time)))
    }
}

impl TownsChain for NamedChain {
    fn is_towns_chain(&self) -> bool {
        use NamedChain::*;

        matches!(self, Base | BaseSepolia | AnvilHardhat)
    }

    fn delegate_registry_address(&self) -> Result<Address> {
        use NamedChain::*;

        match self {
            Mainnet | Sepolia | Base | BaseSepolia | Arbitrum | Optimism | Polygon => {
                Ok(DELEGATE_REGISTRY_V1_ADDRESS)
            }
            _ => Err(TownsError::UnsupportedChain(format!(
                "no delegate registry on {self}"
            ))),
        }
    }

    fn average_block_time_secs(&self) -> Result<u64> {
        use NamedChain::*;

        match self {
            Mainnet | Sepolia => Ok(12),
            Base | BaseSepolia => Ok(2),
            AnvilHardhat => Ok(1),
            _ => Err(TownsError::UnsupportedChain(self.to_string())),
        }
    }
}
