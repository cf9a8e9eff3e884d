//! Towns contract bindings
//!
//! Each module declares one contract interface with Alloy's `sol!` macro and
//! wraps the generated instance in an instrumented contract type:
//!
//! - [`DelegateRegistryContract`](delegate_registry::DelegateRegistryContract): delegate.xyz v1 registry
//! - [`AppRegistryContract`](app_registry::AppRegistryContract): app registry diamond
//! - [`ChannelsContract`](channels::ChannelsContract): channels facet of a Space
//! - [`MembershipContract`](membership::MembershipContract): membership facet of a Space
//! - [`WalletLinkContract`](wallet_link::WalletLinkContract): wallet link facet of the space factory
//! - [`XChainContract`](entitlement_checker::XChainContract) and
//!   [`EntitlementCheckerContract`](entitlement_checker::EntitlementCheckerContract):
//!   cross-chain entitlement facets of the base registry
//!
//! Every wrapper offers the same three facets: async view methods, unsigned
//! `*_transaction` builders for state-changing functions, and an
//! [`EventFilterer`](crate::EventFilterer) through `events()`.

pub mod app_registry;
pub mod channels;
pub mod delegate_registry;
pub mod entitlement_checker;
pub mod membership;
pub mod wallet_link;

use std::fmt::Debug;
use std::marker::PhantomData;

use alloy_contract::CallBuilder;
use alloy_network::Ethereum;
use alloy_primitives::Address;
use alloy_provider::Provider;
use alloy_rpc_types::BlockId;
use alloy_sol_types::{SolCall, SolInterface};
use tracing::{trace, Instrument};

use crate::{revert, spans, Result};

/// Where a view call goes: contract name for errors and spans, address, and
/// the block the wrapper is pinned to. `E` is the contract's errors enum.
pub(crate) struct CallTarget<E> {
    name: &'static str,
    address: Address,
    block: Option<BlockId>,
    _errors: PhantomData<fn() -> E>,
}

impl<E: SolInterface + Debug> CallTarget<E> {
    pub(crate) fn new(name: &'static str, address: Address, block: Option<BlockId>) -> Self {
        Self {
            name,
            address,
            block,
            _errors: PhantomData,
        }
    }

    /// Execute a view call and map reverts onto `E`.
    pub(crate) async fn call<P, C>(
        self,
        method: &'static str,
        builder: CallBuilder<&P, PhantomData<C>>,
    ) -> Result<C::Return>
    where
        P: Provider<Ethereum>,
        C: SolCall,
    {
        let span = spans::contract_call(self.name, &self.address, method);
        let builder = match self.block {
            Some(block) => builder.block(block),
            None => builder,
        };

        async {
            let result = builder.call().await;
            trace!(
                contract_address = %self.address,
                method = method,
                ok = result.is_ok(),
                "Contract call returned"
            );
            result.map_err(|e| {
                let error = revert::classify::<E>(self.name, e);
                spans::record_error(&error);
                error
            })
        }
        .instrument(span)
        .await
    }
}
