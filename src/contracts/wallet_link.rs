//! Wallet link facet bindings and wrapper
//!
//! A root key is the primary wallet of a Towns user; other EVM wallets and
//! non-EVM wallets (Solana) link to it with signed messages. The link facet
//! lives on the space factory diamond.
//!
//! Building the link signatures happens off-chain and is left to the caller;
//! this module only carries the signed payloads to the contract.

use alloy_network::Ethereum;
use alloy_primitives::{Address, B256, U256};
use alloy_provider::Provider;
use alloy_rpc_types::{BlockId, TransactionRequest};
use alloy_sol_types::sol;
use tracing::{debug, info, warn};

use crate::contracts::CallTarget;
use crate::events::{address_topics, ContractEvents, EventFilterer, EventQuery};
use crate::protocol::VirtualMachineType;
use crate::providers::{AlloyLogSource, TokioClock};
use crate::{spans, Result};
use IWalletLink::{
    IWalletLinkErrors, IWalletLinkEvents, IWalletLinkInstance, LinkedWallet, NonEVMLinkedWallet,
    Wallet,
};

/// JSON ABI of the wallet link facet.
pub const ABI: &str = include_str!("../../abis/wallet_link.json");

const CONTRACT: &str = "WalletLink";

pub type WalletLinkFilterer<'a, P> =
    EventFilterer<AlloyLogSource<&'a P>, TokioClock, IWalletLinkEvents>;

/// A wallet linked to a root key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RootKeyWallet {
    Evm(Address),
    NonEvm {
        /// Address in the VM's native encoding (base58 for Solana).
        address: String,
        vm_type: VirtualMachineType,
    },
}

/// The Towns wallet link facet wrapper
pub struct WalletLinkContract<P: Provider<Ethereum>> {
    instance: IWalletLinkInstance<P>,
    block: Option<BlockId>,
}

impl<P: Provider<Ethereum>> WalletLinkContract<P> {
    pub fn new(address: Address, provider: P) -> Self {
        debug!(
            contract_address = %address,
            event = "wallet_link_contract_initialized"
        );
        Self {
            instance: IWalletLinkInstance::new(address, provider),
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

    pub fn instance(&self) -> &IWalletLinkInstance<P> {
        &self.instance
    }

    fn target(&self) -> CallTarget<IWalletLinkErrors> {
        CallTarget::new(CONTRACT, self.address(), self.block)
    }

    pub async fn check_if_linked(&self, root_key: Address, wallet: Address) -> Result<bool> {
        self.target()
            .call("checkIfLinked", self.instance.checkIfLinked(root_key, wallet))
            .await
    }

    pub async fn check_if_non_evm_wallet_linked(
        &self,
        root_key: Address,
        wallet_hash: B256,
    ) -> Result<bool> {
        self.target()
            .call(
                "checkIfNonEVMWalletLinked",
                self.instance.checkIfNonEVMWalletLinked(root_key, wallet_hash),
            )
            .await
    }

    pub async fn get_all_wallets_by_root_key(&self, root_key: Address) -> Result<Vec<Wallet>> {
        self.target()
            .call(
                "getAllWalletsByRootKey",
                self.instance.getAllWalletsByRootKey(root_key),
            )
            .await
    }

    pub async fn get_default_wallet(&self, root_key: Address) -> Result<Address> {
        self.target()
            .call("getDefaultWallet", self.instance.getDefaultWallet(root_key))
            .await
    }

    pub async fn get_dependency(&self, dependency: B256) -> Result<Address> {
        self.target()
            .call("getDependency", self.instance.getDependency(dependency))
            .await
    }

    /// Nonce to sign into the next link message for `root_key`.
    pub async fn get_latest_nonce_for_root_key(&self, root_key: Address) -> Result<U256> {
        self.target()
            .call(
                "getLatestNonceForRootKey",
                self.instance.getLatestNonceForRootKey(root_key),
            )
            .await
    }

    /// Root key of `wallet`, zero if it is not linked.
    pub async fn get_root_key_for_wallet(&self, wallet: Address) -> Result<Address> {
        self.target()
            .call("getRootKeyForWallet", self.instance.getRootKeyForWallet(wallet))
            .await
    }

    pub async fn get_wallets_by_root_key(&self, root_key: Address) -> Result<Vec<Address>> {
        self.target()
            .call("getWalletsByRootKey", self.instance.getWalletsByRootKey(root_key))
            .await
    }

    /// EVM wallets and non-EVM wallets linked to `root_key`.
    ///
    /// Zero-tagged entries of `getAllWalletsByRootKey` are EVM wallets and
    /// are merged with `getWalletsByRootKey`. Entries with a VM tag this
    /// crate does not know are skipped.
    pub async fn linked_wallets(&self, root_key: Address) -> Result<Vec<RootKeyWallet>> {
        let (evm, all) = futures::try_join!(
            self.get_wallets_by_root_key(root_key),
            self.get_all_wallets_by_root_key(root_key),
        )?;

        let wallets = merge_linked_wallets(root_key, evm, all);

        debug!(
            root_key = %root_key,
            wallet_count = wallets.len(),
            contract_address = %self.address(),
            event = "linked_wallets_fetched"
        );
        Ok(wallets)
    }

    /// Link `wallet` to `root_wallet`.
    ///
    /// # Arguments
    ///
    /// * `from` - The account that signs the transaction
    /// * `wallet` - The wallet being linked, with its signature over the nonce
    /// * `root_wallet` - The root key, with its signature over the nonce
    /// * `nonce` - The value of
    ///   [`get_latest_nonce_for_root_key`](Self::get_latest_nonce_for_root_key)
    ///
    /// # Returns
    ///
    /// A `TransactionRequest` ready to be signed and sent
    pub fn link_wallet_to_root_key_transaction(
        &self,
        from: Address,
        wallet: LinkedWallet,
        root_wallet: LinkedWallet,
        nonce: U256,
    ) -> TransactionRequest {
        let span = spans::build_transaction(CONTRACT, &self.address(), "linkWalletToRootKey", &from);
        let _guard = span.enter();

        info!(
            from = %from,
            wallet = %wallet.addr,
            root_key = %root_wallet.addr,
            nonce = %nonce,
            contract_address = %self.address(),
            event = "link_wallet_to_root_key_transaction_created"
        );

        self.instance
            .linkWalletToRootKey(wallet, root_wallet, nonce)
            .from(from)
            .into_transaction_request()
    }

    /// Link the sending wallet to `root_wallet`.
    pub fn link_caller_to_root_key_transaction(
        &self,
        from: Address,
        root_wallet: LinkedWallet,
        nonce: U256,
    ) -> TransactionRequest {
        let span = spans::build_transaction(CONTRACT, &self.address(), "linkCallerToRootKey", &from);
        let _guard = span.enter();

        info!(
            from = %from,
            root_key = %root_wallet.addr,
            nonce = %nonce,
            contract_address = %self.address(),
            event = "link_caller_to_root_key_transaction_created"
        );

        self.instance
            .linkCallerToRootKey(root_wallet, nonce)
            .from(from)
            .into_transaction_request()
    }

    /// Link a non-EVM wallet to the sending root key.
    ///
    /// # Arguments
    ///
    /// * `from` - The root key account that signs
    /// * `wallet` - The wallet address, VM tag and VM-native signature
    /// * `nonce` - The root key's next nonce
    pub fn link_non_evm_wallet_to_root_key_transaction(
        &self,
        from: Address,
        wallet: NonEVMLinkedWallet,
        nonce: U256,
    ) -> TransactionRequest {
        let span =
            spans::build_transaction(CONTRACT, &self.address(), "linkNonEVMWalletToRootKey", &from);
        let _guard = span.enter();

        info!(
            from = %from,
            wallet = %wallet.wallet.addr,
            vm_type = wallet.wallet.vmType,
            nonce = %nonce,
            contract_address = %self.address(),
            event = "link_non_evm_wallet_to_root_key_transaction_created"
        );

        self.instance
            .linkNonEVMWalletToRootKey(wallet, nonce)
            .from(from)
            .into_transaction_request()
    }

    pub fn remove_link_transaction(
        &self,
        from: Address,
        wallet: Address,
        root_wallet: LinkedWallet,
        nonce: U256,
    ) -> TransactionRequest {
        let span = spans::build_transaction(CONTRACT, &self.address(), "removeLink", &from);
        let _guard = span.enter();

        info!(
            from = %from,
            wallet = %wallet,
            root_key = %root_wallet.addr,
            nonce = %nonce,
            contract_address = %self.address(),
            event = "remove_link_transaction_created"
        );

        self.instance
            .removeLink(wallet, root_wallet, nonce)
            .from(from)
            .into_transaction_request()
    }

    /// Unlink the sending wallet from its root key.
    pub fn remove_caller_link_transaction(&self, from: Address) -> TransactionRequest {
        let span = spans::build_transaction(CONTRACT, &self.address(), "removeCallerLink", &from);
        let _guard = span.enter();

        info!(
            from = %from,
            contract_address = %self.address(),
            event = "remove_caller_link_transaction_created"
        );

        self.instance
            .removeCallerLink()
            .from(from)
            .into_transaction_request()
    }

    pub fn remove_non_evm_wallet_link_transaction(
        &self,
        from: Address,
        wallet: Wallet,
        nonce: U256,
    ) -> TransactionRequest {
        let span =
            spans::build_transaction(CONTRACT, &self.address(), "removeNonEVMWalletLink", &from);
        let _guard = span.enter();

        info!(
            from = %from,
            wallet = %wallet.addr,
            nonce = %nonce,
            contract_address = %self.address(),
            event = "remove_non_evm_wallet_link_transaction_created"
        );

        self.instance
            .removeNonEVMWalletLink(wallet, nonce)
            .from(from)
            .into_transaction_request()
    }

    pub fn set_default_wallet_transaction(
        &self,
        from: Address,
        default_wallet: Address,
    ) -> TransactionRequest {
        let span = spans::build_transaction(CONTRACT, &self.address(), "setDefaultWallet", &from);
        let _guard = span.enter();

        info!(
            from = %from,
            default_wallet = %default_wallet,
            contract_address = %self.address(),
            event = "set_default_wallet_transaction_created"
        );

        self.instance
            .setDefaultWallet(default_wallet)
            .from(from)
            .into_transaction_request()
    }

    /// Owner only.
    pub fn set_dependency_transaction(
        &self,
        from: Address,
        dependency: B256,
        dependency_address: Address,
    ) -> TransactionRequest {
        let span = spans::build_transaction(CONTRACT, &self.address(), "setDependency", &from);
        let _guard = span.enter();

        info!(
            from = %from,
            dependency = %dependency,
            dependency_address = %dependency_address,
            contract_address = %self.address(),
            event = "set_dependency_transaction_created"
        );

        self.instance
            .setDependency(dependency, dependency_address)
            .from(from)
            .into_transaction_request()
    }

    pub fn events(&self) -> WalletLinkFilterer<'_, P> {
        EventFilterer::new(
            self.address(),
            AlloyLogSource::new(self.instance.provider()),
            TokioClock,
        )
    }

    pub fn link_wallet_to_root_key_query(
        &self,
        wallet: &[Address],
        root_key: &[Address],
    ) -> EventQuery {
        EventQuery::new()
            .topic1(address_topics(wallet))
            .topic2(address_topics(root_key))
    }

    pub fn remove_link_query(&self, wallet: &[Address], second_wallet: &[Address]) -> EventQuery {
        EventQuery::new()
            .topic1(address_topics(wallet))
            .topic2(address_topics(second_wallet))
    }

    /// Shared by `LinkNonEVMWalletToRootWallet` and `RemoveNonEVMWalletLink`.
    pub fn non_evm_wallet_link_query(
        &self,
        wallet_hash: &[B256],
        root_key: &[Address],
    ) -> EventQuery {
        EventQuery::new()
            .topic1(wallet_hash.iter().copied())
            .topic2(address_topics(root_key))
    }

    pub fn set_default_wallet_query(
        &self,
        root_key: &[Address],
        default_wallet: &[Address],
    ) -> EventQuery {
        EventQuery::new()
            .topic1(address_topics(root_key))
            .topic2(address_topics(default_wallet))
    }
}

/// Merge the EVM wallet list with the VM-tagged list of a root key.
///
/// `Unknown`-tagged entries that parse as EVM addresses join the EVM list
/// once. Entries with a VM tag outside [`VirtualMachineType`] are dropped.
pub fn merge_linked_wallets(
    root_key: Address,
    evm: Vec<Address>,
    tagged: Vec<Wallet>,
) -> Vec<RootKeyWallet> {
    let mut wallets: Vec<RootKeyWallet> = evm.into_iter().map(RootKeyWallet::Evm).collect();
    for wallet in tagged {
        match VirtualMachineType::from_u8(wallet.vmType) {
            Some(VirtualMachineType::Unknown) => match wallet.addr.parse::<Address>() {
                Ok(address) => {
                    let entry = RootKeyWallet::Evm(address);
                    if !wallets.contains(&entry) {
                        wallets.push(entry);
                    }
                }
                Err(_) => debug!(
                    root_key = %root_key,
                    wallet = %wallet.addr,
                    event = "untagged_wallet_skipped"
                ),
            },
            Some(vm_type) => wallets.push(RootKeyWallet::NonEvm {
                address: wallet.addr,
                vm_type,
            }),
            None => warn!(
                root_key = %root_key,
                wallet = %wallet.addr,
                vm_type = wallet.vmType,
                event = "unknown_vm_type_skipped"
            ),
        }
    }
    wallets
}

impl ContractEvents for IWalletLinkEvents {
    fn selectors() -> &'static [[u8; 32]] {
        IWalletLinkEvents::SELECTORS
    }
}

sol!(
    #[allow(missing_docs)]
    #[sol(rpc, all_derives)]
    interface IWalletLink {
        struct Wallet {
            string addr;
            uint8 vmType;
        }

        struct LinkedWallet {
            address addr;
            bytes signature;
            string message;
        }

        struct VMSpecificData {
            string key;
            bytes value;
        }

        struct NonEVMLinkedWallet {
            Wallet wallet;
            bytes signature;
            string message;
            VMSpecificData[] extraData;
        }

        event LinkNonEVMWalletToRootWallet(bytes32 indexed walletHash, address indexed rootKey);
        event LinkWalletToRootKey(address indexed wallet, address indexed rootKey);
        event RemoveLink(address indexed wallet, address indexed secondWallet);
        event RemoveNonEVMWalletLink(bytes32 indexed walletHash, address indexed rootKey);
        event SetDefaultWallet(address indexed rootKey, address indexed defaultWallet);

        error WalletLink__AddressMismatch();
        error WalletLink__CannotLinkToRootWallet(address wallet, address rootKey);
        error WalletLink__CannotLinkToSelf();
        error WalletLink__CannotRemoveDefaultWallet();
        error WalletLink__CannotRemoveRootWallet();
        error WalletLink__DefaultWalletAlreadySet();
        error WalletLink__InvalidAddress();
        error WalletLink__InvalidMessage();
        error WalletLink__InvalidNonEVMAddress();
        error WalletLink__InvalidSignature();
        error WalletLink__InvalidVMSpecificData(string key, bytes value);
        error WalletLink__LinkAlreadyExists(address wallet, address rootKey);
        error WalletLink__LinkedToAnotherRootKey(address wallet, address rootKey);
        error WalletLink__MaxLinkedWalletsReached();
        error WalletLink__NonEVMWalletAlreadyLinked(string wallet, address rootKey);
        error WalletLink__NonEVMWalletNotLinked(string wallet, address rootKey);
        error WalletLink__NotLinked(address wallet, address rootKey);
        error WalletLink__RootKeyMismatch(address callerRootKey, address rootKey);
        error WalletLink__UnsupportedVMType();

        function checkIfLinked(address rootKey, address wallet) external view returns (bool);
        function checkIfNonEVMWalletLinked(address rootKey, bytes32 walletHash) external view returns (bool);
        function getAllWalletsByRootKey(address rootKey) external view returns (Wallet[] memory wallets);
        function getDefaultWallet(address rootKey) external view returns (address);
        function getDependency(bytes32 dependency) external view returns (address);
        function getLatestNonceForRootKey(address rootKey) external view returns (uint256);
        function getRootKeyForWallet(address wallet) external view returns (address rootKey);
        function getWalletsByRootKey(address rootKey) external view returns (address[] memory wallets);
        function linkCallerToRootKey(LinkedWallet memory rootWallet, uint256 nonce) external;
        function linkNonEVMWalletToRootKey(NonEVMLinkedWallet memory wallet, uint256 nonce) external;
        function linkWalletToRootKey(LinkedWallet memory wallet, LinkedWallet memory rootWallet, uint256 nonce) external;
        function removeCallerLink() external;
        function removeLink(address wallet, LinkedWallet memory rootWallet, uint256 nonce) external;
        function removeNonEVMWalletLink(Wallet memory wallet, uint256 nonce) external;
        function setDefaultWallet(address defaultWallet) external;
        function setDependency(bytes32 dependency, address dependencyAddress) external;
    }
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::revert;
    use crate::TownsError;
    use alloy_primitives::{address, Bytes};
    use alloy_sol_types::SolInterface;
    use rstest::rstest;

    #[test]
    fn test_not_linked_revert_carries_wallet_and_root_key() {
        let wallet = address!("0000000000000000000000000000000000000001");
        let root_key = address!("0000000000000000000000000000000000000002");
        let data = IWalletLinkErrors::WalletLink__NotLinked(IWalletLink::WalletLink__NotLinked {
            wallet,
            rootKey: root_key,
        })
        .abi_encode();

        let error = revert::decode::<IWalletLinkErrors>(CONTRACT, Bytes::from(data));

        assert!(matches!(error, TownsError::Reverted { contract: "WalletLink", .. }));
        match error.decode_revert::<IWalletLinkErrors>() {
            Some(IWalletLinkErrors::WalletLink__NotLinked(inner)) => {
                assert_eq!(inner.wallet, wallet);
                assert_eq!(inner.rootKey, root_key);
            }
            other => panic!("unexpected revert: {other:?}"),
        }
    }

    #[test]
    fn test_link_wallet_query_uses_both_topics() {
        let provider = alloy_provider::ProviderBuilder::new()
            .connect_http("http://localhost:8545".parse().unwrap());
        let wallet_link =
            WalletLinkContract::new(address!("0000000000000000000000000000000000000f00"), provider);
        let root_key = address!("0000000000000000000000000000000000000002");

        let query = wallet_link.link_wallet_to_root_key_query(&[], &[root_key]);

        assert_eq!(query.topic1, None);
        assert_eq!(query.topic2, Some(vec![root_key.into_word()]));
    }

    const ROOT_KEY: Address = address!("00000000000000000000000000000000000000f0");
    const LINKED: Address = address!("00000000000000000000000000000000000000aa");

    fn tagged(addr: &str, vm_type: u8) -> Wallet {
        Wallet {
            addr: addr.to_string(),
            vmType: vm_type,
        }
    }

    #[rstest]
    #[case::exact_duplicate("0x00000000000000000000000000000000000000aa", 0, 1)]
    #[case::differently_cased_duplicate("0x00000000000000000000000000000000000000AA", 0, 1)]
    #[case::new_evm_address("0x00000000000000000000000000000000000000bb", 0, 2)]
    #[case::not_an_address("7EcDhSYGxXyscszYEp35KHN8vvw3svAuLKTzXwCFLtV", 0, 1)]
    #[case::unknown_vm_tag("0x00000000000000000000000000000000000000cc", 7, 1)]
    fn test_merge_linked_wallets_untagged_entries(
        #[case] addr: &str,
        #[case] vm_type: u8,
        #[case] expected_len: usize,
    ) {
        let wallets = merge_linked_wallets(ROOT_KEY, vec![LINKED], vec![tagged(addr, vm_type)]);

        assert_eq!(wallets.len(), expected_len);
        assert_eq!(wallets[0], RootKeyWallet::Evm(LINKED));
        assert!(wallets
            .iter()
            .all(|w| matches!(w, RootKeyWallet::Evm(_))));
    }

    #[test]
    fn test_merge_linked_wallets_keeps_solana_wallets() {
        let solana = "7EcDhSYGxXyscszYEp35KHN8vvw3svAuLKTzXwCFLtV";
        let wallets = merge_linked_wallets(
            ROOT_KEY,
            vec![LINKED],
            vec![
                tagged(solana, VirtualMachineType::Svm.as_u8()),
                tagged("0x00000000000000000000000000000000000000aa", 0),
                tagged("bogus", 7),
            ],
        );

        assert_eq!(
            wallets,
            vec![
                RootKeyWallet::Evm(LINKED),
                RootKeyWallet::NonEvm {
                    address: solana.to_string(),
                    vm_type: VirtualMachineType::Svm,
                },
            ]
        );
    }
}
