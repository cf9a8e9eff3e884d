//! Well-known contract addresses
//!
//! Towns deployments (space factory, base registry, app registry) differ per
//! environment and are supplied through [`ContractAddresses`](crate::ContractAddresses).
//! Only contracts deployed at a deterministic address on every chain live here.

use alloy_primitives::{address, Address};

/// delegate.xyz v1 `DelegationRegistry`, deployed with CREATE2 at the same
/// address on every supported chain.
///
/// <https://docs.delegate.xyz/technical-documentation/delegate-registry/contract-addresses>
pub const DELEGATE_REGISTRY_V1_ADDRESS: Address =
    address!("00000000000076A84feF008CDAbe6409d2FE638B");
