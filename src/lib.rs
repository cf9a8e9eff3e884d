//! # towns-bindings
//!
//! Typed Rust bindings for the Towns protocol contracts.
//!
//! Every contract gets a wrapper with three facets:
//!
//! - **Caller**: async view methods returning decoded values
//! - **Transactor**: `*_transaction` builders returning unsigned
//!   [`TransactionRequest`](alloy_rpc_types::TransactionRequest)s
//! - **Filterer**: historical queries, watch streams and log parsing through
//!   [`EventFilterer`]
//!
//! Reverts are decoded into each interface's custom errors and surfaced as
//! [`TownsError::Reverted`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use towns_bindings::contracts::wallet_link::WalletLinkContract;
//! use towns_bindings::ContractAddresses;
//! use alloy_provider::ProviderBuilder;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let addresses = ContractAddresses::from_env()?;
//! let provider = ProviderBuilder::new().connect("http://localhost:8545").await?;
//!
//! let wallet_link = WalletLinkContract::new(addresses.require_space_factory()?, provider);
//! let root_key = "0x742d35Cc6634C0532925a3b844Bc9e7595f8fA0d".parse()?;
//! for wallet in wallet_link.linked_wallets(root_key).await? {
//!     println!("{wallet:?}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Watching Events
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use towns_bindings::contracts::app_registry::{AppRegistryContract, IAppRegistry};
//! use alloy_provider::ProviderBuilder;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = ProviderBuilder::new().connect("http://localhost:8545").await?;
//! let registry = AppRegistryContract::new("0x0000000000000000000000000000000000000001".parse()?, provider);
//!
//! let account = "0x742d35Cc6634C0532925a3b844Bc9e7595f8fA0d".parse()?;
//! let query = registry.app_installed_query(&[], &[account], &[]);
//! let filterer = registry.events();
//! let mut installs = Box::pin(filterer.watch::<IAppRegistry::AppInstalled>(query));
//! while let Some(install) = installs.next().await {
//!     println!("installed {}", install?.event.app);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Public API
//!
//! - [`contracts`] - Contract wrappers and generated bindings
//! - [`EventFilterer`], [`EventQuery`] and [`DecodedEvent`] - Event access
//! - [`ContractAddresses`] and [`EventPollingConfig`] - Configuration
//! - [`TownsChain`] - Chain-level defaults
//! - [`DelegationType`], [`NodeVoteStatus`] and [`VirtualMachineType`] - Protocol enums
//! - [`TownsError`] and [`Result`] - Error types for error handling
//! - [`transact`] and [`deploy`] - Sending transactions and deploying contracts

mod chain;
mod config;
mod error;
mod events;
mod protocol;
mod revert;

pub mod contracts;
pub mod deploy;
pub mod providers;
pub mod testing;
pub mod traits;
pub mod transact;

pub use chain::addresses::DELEGATE_REGISTRY_V1_ADDRESS;
pub use chain::TownsChain;
pub use config::{ContractAddresses, EventPollingConfig};
pub use contracts::{
    app_registry::AppRegistryContract,
    channels::ChannelsContract,
    delegate_registry::{DelegateRegistryContract, Delegation},
    entitlement_checker::{EntitlementCheckerContract, XChainContract},
    membership::{MembershipContract, MembershipTerms},
    wallet_link::{RootKeyWallet, WalletLinkContract},
};
pub use error::{Result, TownsError};
pub use events::{
    address_topic, address_topics, bytes4_topic, decode_event, uint_topic, uint_topics,
    ContractEvents, DecodedEvent, EventFilterer, EventQuery,
};
pub use protocol::{
    DelegationType, InvalidDelegationType, InvalidVmType, InvalidVoteStatus, NodeVoteStatus,
    VirtualMachineType,
};

// Public module for advanced users who need custom instrumentation
pub mod spans;
