//! Delegate registry bindings and wrapper
//!
//! Towns reads cold-wallet delegations from the delegate.xyz v1 registry,
//! deployed at the same address on every supported chain (see
//! [`DELEGATE_REGISTRY_V1_ADDRESS`](crate::chain::addresses::DELEGATE_REGISTRY_V1_ADDRESS)).
//! A vault delegates to a hot wallet for all contracts, one contract, or one
//! token.

use alloy_network::Ethereum;
use alloy_primitives::{Address, FixedBytes, U256};
use alloy_provider::Provider;
use alloy_rpc_types::{BlockId, TransactionRequest};
use alloy_sol_types::{sol, GenericContractError};
use tracing::{debug, info, warn};

use crate::contracts::CallTarget;
use crate::events::{ContractEvents, EventFilterer};
use crate::protocol::DelegationType;
use crate::providers::{AlloyLogSource, TokioClock};
use crate::{spans, Result};
use IDelegationRegistry::{
    ContractDelegation, DelegationInfo, IDelegationRegistryEvents, IDelegationRegistryInstance,
    TokenDelegation,
};

/// JSON ABI of the v1 registry interface.
pub const ABI: &str = include_str!("../../abis/delegate_registry.json");

const CONTRACT: &str = "DelegationRegistry";

pub type DelegateRegistryFilterer<'a, P> =
    EventFilterer<AlloyLogSource<&'a P>, TokioClock, IDelegationRegistryEvents>;

/// A delegation record with its scope decoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Delegation {
    pub delegation_type: DelegationType,
    pub vault: Address,
    pub delegate: Address,
    /// Zero for [`DelegationType::All`].
    pub contract: Address,
    /// Zero unless [`DelegationType::Token`].
    pub token_id: U256,
}

impl TryFrom<DelegationInfo> for Delegation {
    type Error = crate::protocol::InvalidDelegationType;

    fn try_from(info: DelegationInfo) -> std::result::Result<Self, Self::Error> {
        Ok(Self {
            delegation_type: DelegationType::try_from(info.type_)?,
            vault: info.vault,
            delegate: info.delegate,
            contract: info.contract_,
            token_id: info.tokenId,
        })
    }
}

/// The delegate.xyz v1 registry wrapper
///
/// # Example
///
/// ```rust,no_run
/// use alloy_chains::NamedChain;
/// use alloy_provider::ProviderBuilder;
/// use towns_bindings::contracts::delegate_registry::DelegateRegistryContract;
/// use towns_bindings::TownsChain;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let provider = ProviderBuilder::new().connect("https://eth.llamarpc.com").await?;
/// let registry = DelegateRegistryContract::new(NamedChain::Mainnet.delegate_registry_address()?, provider);
///
/// let vault = "0x0000000000000000000000000000000000000001".parse()?;
/// for hot in registry.get_delegates_for_all(vault).await? {
///     println!("{hot} may act for {vault}");
/// }
/// # Ok(())
/// # }
/// ```
pub struct DelegateRegistryContract<P: Provider<Ethereum>> {
    instance: IDelegationRegistryInstance<P>,
    block: Option<BlockId>,
}

impl<P: Provider<Ethereum>> DelegateRegistryContract<P> {
    pub fn new(address: Address, provider: P) -> Self {
        debug!(
            contract_address = %address,
            event = "delegate_registry_contract_initialized"
        );
        Self {
            instance: IDelegationRegistryInstance::new(address, provider),
            block: None,
        }
    }

    pub fn at_block(mut self, block: BlockId) -> Self {
        self.block = Some(block);
        self
    }

    pub fn address(&self) -> Address {
        *self.instance.address()
    }

    pub fn instance(&self) -> &IDelegationRegistryInstance<P> {
        &self.instance
    }

    // The v1 registry declares no custom errors.
    fn target(&self) -> CallTarget<GenericContractError> {
        CallTarget::new(CONTRACT, self.address(), self.block)
    }

    pub async fn check_delegate_for_all(&self, delegate: Address, vault: Address) -> Result<bool> {
        self.target()
            .call(
                "checkDelegateForAll",
                self.instance.checkDelegateForAll(delegate, vault),
            )
            .await
    }

    pub async fn check_delegate_for_contract(
        &self,
        delegate: Address,
        vault: Address,
        contract: Address,
    ) -> Result<bool> {
        self.target()
            .call(
                "checkDelegateForContract",
                self.instance
                    .checkDelegateForContract(delegate, vault, contract),
            )
            .await
    }

    pub async fn check_delegate_for_token(
        &self,
        delegate: Address,
        vault: Address,
        contract: Address,
        token_id: U256,
    ) -> Result<bool> {
        self.target()
            .call(
                "checkDelegateForToken",
                self.instance
                    .checkDelegateForToken(delegate, vault, contract, token_id),
            )
            .await
    }

    pub async fn get_delegations_by_delegate(
        &self,
        delegate: Address,
    ) -> Result<Vec<DelegationInfo>> {
        self.target()
            .call(
                "getDelegationsByDelegate",
                self.instance.getDelegationsByDelegate(delegate),
            )
            .await
    }

    pub async fn get_delegates_for_all(&self, vault: Address) -> Result<Vec<Address>> {
        self.target()
            .call("getDelegatesForAll", self.instance.getDelegatesForAll(vault))
            .await
    }

    pub async fn get_delegates_for_contract(
        &self,
        vault: Address,
        contract: Address,
    ) -> Result<Vec<Address>> {
        self.target()
            .call(
                "getDelegatesForContract",
                self.instance.getDelegatesForContract(vault, contract),
            )
            .await
    }

    pub async fn get_delegates_for_token(
        &self,
        vault: Address,
        contract: Address,
        token_id: U256,
    ) -> Result<Vec<Address>> {
        self.target()
            .call(
                "getDelegatesForToken",
                self.instance.getDelegatesForToken(vault, contract, token_id),
            )
            .await
    }

    pub async fn get_contract_level_delegations(
        &self,
        vault: Address,
    ) -> Result<Vec<ContractDelegation>> {
        self.target()
            .call(
                "getContractLevelDelegations",
                self.instance.getContractLevelDelegations(vault),
            )
            .await
    }

    pub async fn get_token_level_delegations(&self, vault: Address) -> Result<Vec<TokenDelegation>> {
        self.target()
            .call(
                "getTokenLevelDelegations",
                self.instance.getTokenLevelDelegations(vault),
            )
            .await
    }

    pub async fn supports_interface(&self, interface_id: FixedBytes<4>) -> Result<bool> {
        self.target()
            .call("supportsInterface", self.instance.supportsInterface(interface_id))
            .await
    }

    /// Delegations held by `delegate`, with typed scopes.
    ///
    /// Records carrying a scope outside [`DelegationType`] are skipped.
    pub async fn delegation_types(&self, delegate: Address) -> Result<Vec<Delegation>> {
        let records = self.get_delegations_by_delegate(delegate).await?;
        let delegations = typed_delegations(delegate, records);

        debug!(
            delegate = %delegate,
            delegation_count = delegations.len(),
            contract_address = %self.address(),
            event = "delegations_fetched"
        );
        Ok(delegations)
    }

    pub fn delegate_for_all_transaction(
        &self,
        from: Address,
        delegate: Address,
        value: bool,
    ) -> TransactionRequest {
        let span = spans::build_transaction(CONTRACT, &self.address(), "delegateForAll", &from);
        let _guard = span.enter();

        info!(
            vault = %from,
            delegate = %delegate,
            enabled = value,
            contract_address = %self.address(),
            event = "delegate_for_all_transaction_created"
        );

        self.instance
            .delegateForAll(delegate, value)
            .from(from)
            .into_transaction_request()
    }

    pub fn delegate_for_contract_transaction(
        &self,
        from: Address,
        delegate: Address,
        contract: Address,
        value: bool,
    ) -> TransactionRequest {
        let span =
            spans::build_transaction(CONTRACT, &self.address(), "delegateForContract", &from);
        let _guard = span.enter();

        info!(
            vault = %from,
            delegate = %delegate,
            contract = %contract,
            enabled = value,
            contract_address = %self.address(),
            event = "delegate_for_contract_transaction_created"
        );

        self.instance
            .delegateForContract(delegate, contract, value)
            .from(from)
            .into_transaction_request()
    }

    pub fn delegate_for_token_transaction(
        &self,
        from: Address,
        delegate: Address,
        contract: Address,
        token_id: U256,
        value: bool,
    ) -> TransactionRequest {
        let span = spans::build_transaction(CONTRACT, &self.address(), "delegateForToken", &from);
        let _guard = span.enter();

        info!(
            vault = %from,
            delegate = %delegate,
            contract = %contract,
            token_id = %token_id,
            enabled = value,
            contract_address = %self.address(),
            event = "delegate_for_token_transaction_created"
        );

        self.instance
            .delegateForToken(delegate, contract, token_id, value)
            .from(from)
            .into_transaction_request()
    }

    /// Revoke every delegate of the sending vault.
    pub fn revoke_all_delegates_transaction(&self, from: Address) -> TransactionRequest {
        let span =
            spans::build_transaction(CONTRACT, &self.address(), "revokeAllDelegates", &from);
        let _guard = span.enter();

        info!(
            vault = %from,
            contract_address = %self.address(),
            event = "revoke_all_delegates_transaction_created"
        );

        self.instance
            .revokeAllDelegates()
            .from(from)
            .into_transaction_request()
    }

    pub fn revoke_delegate_transaction(&self, from: Address, delegate: Address) -> TransactionRequest {
        let span = spans::build_transaction(CONTRACT, &self.address(), "revokeDelegate", &from);
        let _guard = span.enter();

        info!(
            vault = %from,
            delegate = %delegate,
            contract_address = %self.address(),
            event = "revoke_delegate_transaction_created"
        );

        self.instance
            .revokeDelegate(delegate)
            .from(from)
            .into_transaction_request()
    }

    /// Sent by a delegate to drop its own delegation from `vault`.
    pub fn revoke_self_transaction(&self, from: Address, vault: Address) -> TransactionRequest {
        let span = spans::build_transaction(CONTRACT, &self.address(), "revokeSelf", &from);
        let _guard = span.enter();

        info!(
            delegate = %from,
            vault = %vault,
            contract_address = %self.address(),
            event = "revoke_self_transaction_created"
        );

        self.instance
            .revokeSelf(vault)
            .from(from)
            .into_transaction_request()
    }

    /// None of the registry's events are indexed; filter decoded events
    /// locally.
    pub fn events(&self) -> DelegateRegistryFilterer<'_, P> {
        EventFilterer::new(
            self.address(),
            AlloyLogSource::new(self.instance.provider()),
            TokioClock,
        )
    }
}

/// Convert raw registry records, dropping those with an out-of-range type.
pub fn typed_delegations(delegate: Address, records: Vec<DelegationInfo>) -> Vec<Delegation> {
    records
        .into_iter()
        .filter_map(|info| match Delegation::try_from(info) {
            Ok(delegation) => Some(delegation),
            Err(e) => {
                warn!(
                    delegate = %delegate,
                    error = %e,
                    event = "delegation_record_skipped"
                );
                None
            }
        })
        .collect()
}

impl ContractEvents for IDelegationRegistryEvents {
    fn selectors() -> &'static [[u8; 32]] {
        IDelegationRegistryEvents::SELECTORS
    }
}

sol!(
    #[allow(missing_docs)]
    #[sol(rpc, all_derives)]
    interface IDelegationRegistry {
        struct DelegationInfo {
            uint8 type_;
            address vault;
            address delegate;
            address contract_;
            uint256 tokenId;
        }

        struct ContractDelegation {
            address contract_;
            address delegate;
        }

        struct TokenDelegation {
            address contract_;
            uint256 tokenId;
            address delegate;
        }

        event DelegateForAll(address vault, address delegate, bool value);
        event DelegateForContract(address vault, address delegate, address contract_, bool value);
        event DelegateForToken(address vault, address delegate, address contract_, uint256 tokenId, bool value);
        event RevokeAllDelegates(address vault);
        event RevokeDelegate(address vault, address delegate);

        function delegateForAll(address delegate, bool value) external;
        function delegateForContract(address delegate, address contract_, bool value) external;
        function delegateForToken(address delegate, address contract_, uint256 tokenId, bool value) external;
        function revokeAllDelegates() external;
        function revokeDelegate(address delegate) external;
        function revokeSelf(address vault) external;
        function getDelegationsByDelegate(address delegate) external view returns (DelegationInfo[] memory);
        function getDelegatesForAll(address vault) external view returns (address[] memory);
        function getDelegatesForContract(address vault, address contract_) external view returns (address[] memory);
        function getDelegatesForToken(address vault, address contract_, uint256 tokenId) external view returns (address[] memory);
        function getContractLevelDelegations(address vault) external view returns (ContractDelegation[] memory delegations);
        function getTokenLevelDelegations(address vault) external view returns (TokenDelegation[] memory delegations);
        function checkDelegateForAll(address delegate, address vault) external view returns (bool);
        function checkDelegateForContract(address delegate, address vault, address contract_) external view returns (bool);
        function checkDelegateForToken(address delegate, address vault, address contract_, uint256 tokenId) external view returns (bool);
        function supportsInterface(bytes4 interfaceId) external view returns (bool);
    }
);

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use alloy_sol_types::SolCall;
    use rstest::rstest;

    const DELEGATE: Address = address!("0000000000000000000000000000000000000002");

    fn record(type_: u8, token_id: u64) -> DelegationInfo {
        DelegationInfo {
            type_,
            vault: address!("0000000000000000000000000000000000000001"),
            delegate: DELEGATE,
            contract_: Address::ZERO,
            tokenId: U256::from(token_id),
        }
    }

    #[test]
    fn test_check_delegate_for_all_selector() {
        assert_eq!(
            IDelegationRegistry::checkDelegateForAllCall::SELECTOR,
            [0x9c, 0x39, 0x5b, 0xc2]
        );
    }

    #[test]
    fn test_delegation_from_info() {
        let info = DelegationInfo {
            type_: 3,
            vault: address!("0000000000000000000000000000000000000001"),
            delegate: address!("0000000000000000000000000000000000000002"),
            contract_: address!("0000000000000000000000000000000000000003"),
            tokenId: U256::from(77),
        };

        let delegation = Delegation::try_from(info).unwrap();
        assert_eq!(delegation.delegation_type, DelegationType::Token);
        assert_eq!(delegation.token_id, U256::from(77));
    }

    #[test]
    fn test_delegation_rejects_unknown_scope() {
        let info = DelegationInfo {
            type_: 4,
            vault: Address::ZERO,
            delegate: Address::ZERO,
            contract_: Address::ZERO,
            tokenId: U256::ZERO,
        };

        assert!(Delegation::try_from(info).is_err());
    }

    #[rstest]
    #[case::all_valid(vec![1, 2, 3], vec![DelegationType::All, DelegationType::Contract, DelegationType::Token])]
    #[case::none_scope_kept(vec![0], vec![DelegationType::None])]
    #[case::first_out_of_range(vec![4], vec![])]
    #[case::far_out_of_range(vec![7, 255], vec![])]
    #[case::mixed(vec![3, 4, 1, 7, 2], vec![DelegationType::Token, DelegationType::All, DelegationType::Contract])]
    fn test_typed_delegations_skips_unknown_scopes(
        #[case] types: Vec<u8>,
        #[case] expected: Vec<DelegationType>,
    ) {
        let records = types.iter().map(|&t| record(t, 0)).collect();

        let delegations = typed_delegations(DELEGATE, records);

        let scopes: Vec<_> = delegations.iter().map(|d| d.delegation_type).collect();
        assert_eq!(scopes, expected);
    }

    #[test]
    fn test_typed_delegations_keeps_record_fields() {
        let delegations = typed_delegations(DELEGATE, vec![record(9, 1), record(3, 42)]);

        assert_eq!(delegations.len(), 1);
        assert_eq!(delegations[0].delegate, DELEGATE);
        assert_eq!(delegations[0].token_id, U256::from(42));
    }
}
