//! Cross-chain entitlement gateway bindings
//!
//! Entitlement checks that need state from other chains are routed through
//! the base registry: a Space requests a check, the [`EntitlementCheckerContract`]
//! facet picks a random set of registered nodes and emits
//! `EntitlementCheckRequested`, and each selected node evaluates the rules
//! off-chain and votes through the [`XChainContract`] facet with
//! `postEntitlementCheckResult`. The request completes once a majority of the
//! selected nodes agree.
//!
//! # Example
//!
//! ```rust,no_run
//! use alloy_provider::ProviderBuilder;
//! use towns_bindings::contracts::entitlement_checker::{IEntitlementChecker, EntitlementCheckerContract};
//! use towns_bindings::EventQuery;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = ProviderBuilder::new().connect("https://sepolia.base.org").await?;
//! let checker = EntitlementCheckerContract::new("0x0000000000000000000000000000000000000001".parse()?, provider);
//! let node = "0x0000000000000000000000000000000000000002".parse()?;
//!
//! let requests = checker
//!     .events()
//!     .query::<IEntitlementChecker::EntitlementCheckRequestedV2>(&EventQuery::new().from_block(1_000_000))
//!     .await?;
//! let mine = requests.iter().filter(|r| r.event.is_selected(node)).count();
//! println!("{mine} checks assigned to {node}");
//! # Ok(())
//! # }
//! ```

use alloy_network::Ethereum;
use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_provider::Provider;
use alloy_rpc_types::{BlockId, TransactionRequest};
use alloy_sol_types::sol;
use tracing::{debug, info};

use crate::contracts::CallTarget;
use crate::events::{address_topics, ContractEvents, EventFilterer, EventQuery};
use crate::protocol::{InvalidVoteStatus, NodeVoteStatus};
use crate::providers::{AlloyLogSource, TokioClock};
use crate::{spans, Result};
use IEntitlementChecker::{
    IEntitlementCheckerErrors, IEntitlementCheckerEvents, IEntitlementCheckerInstance,
};
use IXChain::{IXChainErrors, IXChainEvents, IXChainInstance};

/// JSON ABI of the xchain facet.
pub const XCHAIN_ABI: &str = include_str!("../../abis/xchain.json");

/// JSON ABI of the entitlement checker facet.
pub const ENTITLEMENT_CHECKER_ABI: &str = include_str!("../../abis/entitlement_checker.json");

const XCHAIN: &str = "XChain";
const ENTITLEMENT_CHECKER: &str = "EntitlementChecker";

pub type XChainFilterer<'a, P> = EventFilterer<AlloyLogSource<&'a P>, TokioClock, IXChainEvents>;

pub type EntitlementCheckerFilterer<'a, P> =
    EventFilterer<AlloyLogSource<&'a P>, TokioClock, IEntitlementCheckerEvents>;

/// The xchain facet wrapper: vote submission, completion checks and refunds.
pub struct XChainContract<P: Provider<Ethereum>> {
    instance: IXChainInstance<P>,
    block: Option<BlockId>,
}

impl<P: Provider<Ethereum>> XChainContract<P> {
    pub fn new(address: Address, provider: P) -> Self {
        debug!(
            contract_address = %address,
            event = "xchain_contract_initialized"
        );
        Self {
            instance: IXChainInstance::new(address, provider),
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

    pub fn instance(&self) -> &IXChainInstance<P> {
        &self.instance
    }

    fn target(&self) -> CallTarget<IXChainErrors> {
        CallTarget::new(XCHAIN, self.address(), self.block)
    }

    /// Whether request `request_id` of `transaction_id` has reached a result.
    pub async fn is_check_completed(&self, transaction_id: B256, request_id: U256) -> Result<bool> {
        self.target()
            .call(
                "isCheckCompleted",
                self.instance.isCheckCompleted(transaction_id, request_id),
            )
            .await
    }

    /// Submit a node's vote on an entitlement check.
    pub fn post_entitlement_check_result_transaction(
        &self,
        from: Address,
        transaction_id: B256,
        request_id: U256,
        result: NodeVoteStatus,
    ) -> TransactionRequest {
        let span =
            spans::build_transaction(XCHAIN, &self.address(), "postEntitlementCheckResult", &from);
        let _guard = span.enter();

        info!(
            from = %from,
            transaction_id = %transaction_id,
            request_id = %request_id,
            result = %result,
            contract_address = %self.address(),
            event = "post_entitlement_check_result_transaction_created"
        );

        self.instance
            .postEntitlementCheckResult(transaction_id, request_id, result.as_u8())
            .from(from)
            .into_transaction_request()
    }

    /// Refund the escrowed check fee of a request that never completed.
    pub fn provide_xchain_refund_transaction(
        &self,
        from: Address,
        sender: Address,
        transaction_id: B256,
    ) -> TransactionRequest {
        let span = spans::build_transaction(XCHAIN, &self.address(), "provideXChainRefund", &from);
        let _guard = span.enter();

        info!(
            from = %from,
            sender = %sender,
            transaction_id = %transaction_id,
            contract_address = %self.address(),
            event = "provide_xchain_refund_transaction_created"
        );

        self.instance
            .provideXChainRefund(sender, transaction_id)
            .from(from)
            .into_transaction_request()
    }

    /// One-time initializer after a standalone deployment.
    pub fn init_transaction(&self, from: Address) -> TransactionRequest {
        let span = spans::build_transaction(XCHAIN, &self.address(), "__XChain_init", &from);
        let _guard = span.enter();

        info!(
            from = %from,
            contract_address = %self.address(),
            event = "xchain_init_transaction_created"
        );

        self.instance
            .__XChain_init()
            .from(from)
            .into_transaction_request()
    }

    pub fn events(&self) -> XChainFilterer<'_, P> {
        EventFilterer::new(
            self.address(),
            AlloyLogSource::new(self.instance.provider()),
            TokioClock,
        )
    }

    pub fn entitlement_check_result_posted_query(&self, transaction_id: &[B256]) -> EventQuery {
        EventQuery::new().topic1(transaction_id.iter().copied())
    }

    /// Shared by `NodeRegistered` and `NodeUnregistered`.
    pub fn node_query(&self, node: &[Address]) -> EventQuery {
        EventQuery::new().topic1(address_topics(node))
    }

    pub fn ownership_transferred_query(
        &self,
        previous_owner: &[Address],
        new_owner: &[Address],
    ) -> EventQuery {
        EventQuery::new()
            .topic1(address_topics(previous_owner))
            .topic2(address_topics(new_owner))
    }
}

/// The entitlement checker facet wrapper: node registry and check requests.
pub struct EntitlementCheckerContract<P: Provider<Ethereum>> {
    instance: IEntitlementCheckerInstance<P>,
    block: Option<BlockId>,
}

impl<P: Provider<Ethereum>> EntitlementCheckerContract<P> {
    pub fn new(address: Address, provider: P) -> Self {
        debug!(
            contract_address = %address,
            event = "entitlement_checker_contract_initialized"
        );
        Self {
            instance: IEntitlementCheckerInstance::new(address, provider),
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

    pub fn instance(&self) -> &IEntitlementCheckerInstance<P> {
        &self.instance
    }

    fn target(&self) -> CallTarget<IEntitlementCheckerErrors> {
        CallTarget::new(ENTITLEMENT_CHECKER, self.address(), self.block)
    }

    pub async fn get_node_at_index(&self, index: U256) -> Result<Address> {
        self.target()
            .call("getNodeAtIndex", self.instance.getNodeAtIndex(index))
            .await
    }

    pub async fn get_node_count(&self) -> Result<U256> {
        self.target()
            .call("getNodeCount", self.instance.getNodeCount())
            .await
    }

    pub async fn get_nodes_by_operator(&self, operator: Address) -> Result<Vec<Address>> {
        self.target()
            .call("getNodesByOperator", self.instance.getNodesByOperator(operator))
            .await
    }

    /// Pseudo-random sample of `count` distinct registered nodes.
    pub async fn get_random_nodes(&self, count: U256) -> Result<Vec<Address>> {
        self.target()
            .call("getRandomNodes", self.instance.getRandomNodes(count))
            .await
    }

    pub async fn is_valid_node(&self, node: Address) -> Result<bool> {
        self.target()
            .call("isValidNode", self.instance.isValidNode(node))
            .await
    }

    /// Every registered node, read by index.
    pub async fn nodes(&self) -> Result<Vec<Address>> {
        let count = self.get_node_count().await?;
        let count = usize::try_from(count).map_err(|_| {
            crate::TownsError::Provider(format!("node count {count} does not fit in usize"))
        })?;

        let lookups = (0..count).map(|index| self.get_node_at_index(U256::from(index)));
        futures::future::try_join_all(lookups).await
    }

    /// Register `node` under the sending operator.
    pub fn register_node_transaction(&self, from: Address, node: Address) -> TransactionRequest {
        let span =
            spans::build_transaction(ENTITLEMENT_CHECKER, &self.address(), "registerNode", &from);
        let _guard = span.enter();

        info!(
            from = %from,
            node = %node,
            contract_address = %self.address(),
            event = "register_node_transaction_created"
        );

        self.instance
            .registerNode(node)
            .from(from)
            .into_transaction_request()
    }

    pub fn unregister_node_transaction(&self, from: Address, node: Address) -> TransactionRequest {
        let span =
            spans::build_transaction(ENTITLEMENT_CHECKER, &self.address(), "unregisterNode", &from);
        let _guard = span.enter();

        info!(
            from = %from,
            node = %node,
            contract_address = %self.address(),
            event = "unregister_node_transaction_created"
        );

        self.instance
            .unregisterNode(node)
            .from(from)
            .into_transaction_request()
    }

    /// Legacy check request with an explicit node set.
    pub fn request_entitlement_check_transaction(
        &self,
        from: Address,
        wallet: Address,
        transaction_id: B256,
        role_id: U256,
        nodes: Vec<Address>,
    ) -> TransactionRequest {
        let span = spans::build_transaction(
            ENTITLEMENT_CHECKER,
            &self.address(),
            "requestEntitlementCheck",
            &from,
        );
        let _guard = span.enter();

        info!(
            from = %from,
            wallet = %wallet,
            transaction_id = %transaction_id,
            role_id = %role_id,
            node_count = nodes.len(),
            contract_address = %self.address(),
            event = "request_entitlement_check_transaction_created"
        );

        self.instance
            .requestEntitlementCheck(wallet, transaction_id, role_id, nodes)
            .from(from)
            .into_transaction_request()
    }

    /// Check request where the checker selects nodes.
    ///
    /// # Arguments
    ///
    /// * `from` - The account that signs
    /// * `wallet` - The wallet whose entitlement is checked
    /// * `transaction_id` - Caller-chosen id grouping the requests of one action
    /// * `request_id` - Id of this request within `transaction_id`
    /// * `extra_data` - Opaque payload forwarded to the nodes
    /// * `value` - Native value escrowed for the check
    ///
    /// # Returns
    ///
    /// A `TransactionRequest` ready to be signed and sent
    pub fn request_entitlement_check_v2_transaction(
        &self,
        from: Address,
        wallet: Address,
        transaction_id: B256,
        request_id: U256,
        extra_data: Bytes,
        value: U256,
    ) -> TransactionRequest {
        let span = spans::build_transaction(
            ENTITLEMENT_CHECKER,
            &self.address(),
            "requestEntitlementCheckV2",
            &from,
        );
        let _guard = span.enter();

        info!(
            from = %from,
            wallet = %wallet,
            transaction_id = %transaction_id,
            request_id = %request_id,
            value = %value,
            contract_address = %self.address(),
            event = "request_entitlement_check_v2_transaction_created"
        );

        self.instance
            .requestEntitlementCheckV2(wallet, transaction_id, request_id, extra_data)
            .from(from)
            .value(value)
            .into_transaction_request()
    }

    pub fn init_transaction(&self, from: Address) -> TransactionRequest {
        let span = spans::build_transaction(
            ENTITLEMENT_CHECKER,
            &self.address(),
            "__EntitlementChecker_init",
            &from,
        );
        let _guard = span.enter();

        info!(
            from = %from,
            contract_address = %self.address(),
            event = "entitlement_checker_init_transaction_created"
        );

        self.instance
            .__EntitlementChecker_init()
            .from(from)
            .into_transaction_request()
    }

    pub fn events(&self) -> EntitlementCheckerFilterer<'_, P> {
        EventFilterer::new(
            self.address(),
            AlloyLogSource::new(self.instance.provider()),
            TokioClock,
        )
    }

    /// Shared by `NodeRegistered` and `NodeUnregistered`.
    pub fn node_query(&self, node: &[Address]) -> EventQuery {
        EventQuery::new().topic1(address_topics(node))
    }
}

impl IXChain::EntitlementCheckResultPosted {
    /// The posted result as a vote status.
    pub fn status(&self) -> std::result::Result<NodeVoteStatus, InvalidVoteStatus> {
        NodeVoteStatus::try_from(self.result)
    }
}

impl IEntitlementChecker::EntitlementCheckRequested {
    pub fn is_selected(&self, node: Address) -> bool {
        self.selectedNodes.contains(&node)
    }
}

impl IEntitlementChecker::EntitlementCheckRequestedV2 {
    pub fn is_selected(&self, node: Address) -> bool {
        self.selectedNodes.contains(&node)
    }
}

impl ContractEvents for IXChainEvents {
    fn selectors() -> &'static [[u8; 32]] {
        IXChainEvents::SELECTORS
    }
}

impl ContractEvents for IEntitlementCheckerEvents {
    fn selectors() -> &'static [[u8; 32]] {
        IEntitlementCheckerEvents::SELECTORS
    }
}

sol!(
    #[allow(missing_docs)]
    #[sol(rpc, all_derives)]
    interface IXChain {
        event EntitlementCheckRequested(address callerAddress, address contractAddress, bytes32 transactionId, uint256 roleId, address[] selectedNodes);
        event EntitlementCheckRequestedV2(address walletAddress, address spaceAddress, address resolverAddress, bytes32 transactionId, uint256 roleId, address[] selectedNodes);
        event EntitlementCheckResultPosted(bytes32 indexed transactionId, uint8 result);
        event Initialized(uint32 version);
        event InterfaceAdded(bytes4 indexed interfaceId);
        event InterfaceRemoved(bytes4 indexed interfaceId);
        event NodeRegistered(address indexed nodeAddress);
        event NodeUnregistered(address indexed nodeAddress);
        event OwnershipTransferred(address indexed previousOwner, address indexed newOwner);

        error EntitlementChecker_InsufficientFunds();
        error EntitlementChecker_InsufficientNumberOfNodes();
        error EntitlementChecker_InvalidNodeOperator();
        error EntitlementChecker_InvalidOperator();
        error EntitlementChecker_InvalidValue();
        error EntitlementChecker_NoPendingRequests();
        error EntitlementChecker_NoRefundsAvailable();
        error EntitlementChecker_NodeAlreadyRegistered();
        error EntitlementChecker_NodeNotRegistered();
        error EntitlementChecker_OperatorNotActive();
        error EntitlementGated_InvalidAddress();
        error EntitlementGated_InvalidEntitlement();
        error EntitlementGated_InvalidValue();
        error EntitlementGated_NodeAlreadyVoted();
        error EntitlementGated_NodeNotFound();
        error EntitlementGated_OnlyEntitlementChecker();
        error EntitlementGated_RequestIdNotFound();
        error EntitlementGated_TransactionCheckAlreadyCompleted();
        error EntitlementGated_TransactionCheckAlreadyRegistered();
        error EntitlementGated_TransactionNotRegistered();
        error Initializable_InInitializingState();
        error Initializable_NotInInitializingState();
        error Introspection_AlreadySupported();
        error Introspection_NotSupported();
        error Ownable__NotOwner(address account);
        error Ownable__ZeroAddress();
        error Reentrancy();

        function __XChain_init() external;
        function isCheckCompleted(bytes32 transactionId, uint256 requestId) external view returns (bool);
        function postEntitlementCheckResult(bytes32 transactionId, uint256 requestId, uint8 result) external;
        function provideXChainRefund(address senderAddress, bytes32 transactionId) external;
    }
);

sol!(
    #[allow(missing_docs)]
    #[sol(rpc, all_derives)]
    interface IEntitlementChecker {
        event EntitlementCheckRequested(address callerAddress, address contractAddress, bytes32 transactionId, uint256 roleId, address[] selectedNodes);
        event EntitlementCheckRequestedV2(address walletAddress, address spaceAddress, address resolverAddress, bytes32 transactionId, uint256 roleId, address[] selectedNodes);
        event Initialized(uint32 version);
        event InterfaceAdded(bytes4 indexed interfaceId);
        event InterfaceRemoved(bytes4 indexed interfaceId);
        event NodeRegistered(address indexed nodeAddress);
        event NodeUnregistered(address indexed nodeAddress);

        error EntitlementChecker_InsufficientFunds();
        error EntitlementChecker_InsufficientNumberOfNodes();
        error EntitlementChecker_InvalidNodeOperator();
        error EntitlementChecker_InvalidOperator();
        error EntitlementChecker_NoPendingRequests();
        error EntitlementChecker_NoRefundsAvailable();
        error EntitlementChecker_NodeAlreadyRegistered();
        error EntitlementChecker_NodeNotRegistered();
        error EntitlementChecker_OperatorNotActive();
        error Initializable_InInitializingState();
        error Initializable_NotInInitializingState();
        error Introspection_AlreadySupported();
        error Introspection_NotSupported();

        function __EntitlementChecker_init() external;
        function getNodeAtIndex(uint256 index) external view returns (address);
        function getNodeCount() external view returns (uint256);
        function getNodesByOperator(address operator) external view returns (address[] memory nodes);
        function getRandomNodes(uint256 count) external view returns (address[] memory);
        function isValidNode(address node) external view returns (bool);
        function registerNode(address node) external;
        function requestEntitlementCheck(address walletAddress, bytes32 transactionId, uint256 roleId, address[] memory nodes) external;
        function requestEntitlementCheckV2(address walletAddress, bytes32 transactionId, uint256 requestId, bytes memory extraData) external payable;
        function unregisterNode(address node) external;
    }
);

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use alloy_provider::ProviderBuilder;
    use alloy_sol_types::SolCall;
    use rstest::rstest;

    #[rstest]
    #[case(NodeVoteStatus::Passed, 1)]
    #[case(NodeVoteStatus::Failed, 2)]
    fn test_post_result_encodes_vote(#[case] status: NodeVoteStatus, #[case] wire: u8) {
        let provider = ProviderBuilder::new().connect_http("http://localhost:8545".parse().unwrap());
        let xchain = XChainContract::new(address!("0000000000000000000000000000000000000bb1"), provider);
        let node = address!("0000000000000000000000000000000000000d01");

        let tx = xchain.post_entitlement_check_result_transaction(
            node,
            B256::repeat_byte(0x11),
            U256::from(3),
            status,
        );

        let call =
            IXChain::postEntitlementCheckResultCall::abi_decode(tx.input.input().unwrap()).unwrap();
        assert_eq!(call.result, wire);
        assert_eq!(call.requestId, U256::from(3));
        assert_eq!(tx.from, Some(node));
    }

    #[test]
    fn test_result_posted_status() {
        let passed = IXChain::EntitlementCheckResultPosted {
            transactionId: B256::ZERO,
            result: 1,
        };
        let bogus = IXChain::EntitlementCheckResultPosted {
            transactionId: B256::ZERO,
            result: 9,
        };

        assert_eq!(passed.status(), Ok(NodeVoteStatus::Passed));
        assert_eq!(bogus.status(), Err(InvalidVoteStatus(9)));
    }

    #[test]
    fn test_request_selected_nodes() {
        let node = address!("0000000000000000000000000000000000000d01");
        let request = IEntitlementChecker::EntitlementCheckRequestedV2 {
            walletAddress: Address::ZERO,
            spaceAddress: Address::ZERO,
            resolverAddress: Address::ZERO,
            transactionId: B256::ZERO,
            roleId: U256::ZERO,
            selectedNodes: vec![node],
        };

        assert!(request.is_selected(node));
        assert!(!request.is_selected(Address::ZERO));
    }

    #[test]
    fn test_request_v2_transaction_escrows_value() {
        let provider = ProviderBuilder::new().connect_http("http://localhost:8545".parse().unwrap());
        let checker = EntitlementCheckerContract::new(
            address!("0000000000000000000000000000000000000bb2"),
            provider,
        );

        let tx = checker.request_entitlement_check_v2_transaction(
            Address::ZERO,
            address!("0000000000000000000000000000000000000e01"),
            B256::repeat_byte(1),
            U256::ZERO,
            Bytes::new(),
            U256::from(42),
        );

        assert_eq!(tx.value, Some(U256::from(42)));
    }
}
