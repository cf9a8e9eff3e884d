//! Channels facet bindings and wrapper
//!
//! Every Space exposes its channels through the `Channels` facet of the Space
//! diamond. The same address also emits the membership NFT, banning, roles
//! and ownership events of the other facets, so they are part of the
//! interface below.

use alloy_network::Ethereum;
use alloy_primitives::{Address, FixedBytes, B256, U256};
use alloy_provider::Provider;
use alloy_rpc_types::{BlockId, TransactionRequest};
use alloy_sol_types::sol;
use tracing::{debug, info};

use crate::contracts::CallTarget;
use crate::events::{address_topics, bytes4_topic, uint_topics, ContractEvents, EventFilterer, EventQuery};
use crate::providers::{AlloyLogSource, TokioClock};
use crate::{spans, Result};
use IChannels::{Channel, IChannelsErrors, IChannelsEvents, IChannelsInstance, RolePermissions};

/// JSON ABI of the channels facet.
pub const ABI: &str = include_str!("../../abis/channels.json");

const CONTRACT: &str = "Channels";

/// Filterer over the channels facet's events.
pub type ChannelsFilterer<'a, P> = EventFilterer<AlloyLogSource<&'a P>, TokioClock, IChannelsEvents>;

/// The Towns channels facet wrapper
pub struct ChannelsContract<P: Provider<Ethereum>> {
    instance: IChannelsInstance<P>,
    block: Option<BlockId>,
}

impl<P: Provider<Ethereum>> ChannelsContract<P> {
    /// Create a new ChannelsContract bound to a Space address.
    pub fn new(address: Address, provider: P) -> Self {
        debug!(
            contract_address = %address,
            event = "channels_contract_initialized"
        );
        Self {
            instance: IChannelsInstance::new(address, provider),
            block: None,
        }
    }

    /// Pin all view calls to `block`.
    pub fn at_block(mut self, block: BlockId) -> Self {
        self.block = Some(block);
        self
    }

    pub fn address(&self) -> Address {
        *self.instance.address()
    }

    pub fn instance(&self) -> &IChannelsInstance<P> {
        &self.instance
    }

    fn target(&self) -> CallTarget<IChannelsErrors> {
        CallTarget::new(CONTRACT, self.address(), self.block)
    }

    /// Reverts with `ChannelService__ChannelDoesNotExist` for unknown ids.
    pub async fn get_channel(&self, channel_id: B256) -> Result<Channel> {
        self.target()
            .call("getChannel", self.instance.getChannel(channel_id))
            .await
    }

    pub async fn get_channels(&self) -> Result<Vec<Channel>> {
        self.target()
            .call("getChannels", self.instance.getChannels())
            .await
    }

    pub async fn get_roles_by_channel(&self, channel_id: B256) -> Result<Vec<U256>> {
        self.target()
            .call("getRolesByChannel", self.instance.getRolesByChannel(channel_id))
            .await
    }

    /// Ids of every channel in the Space, disabled ones included.
    pub async fn channel_ids(&self) -> Result<Vec<B256>> {
        let channels = self.get_channels().await?;
        Ok(channels.into_iter().map(|channel| channel.id).collect())
    }

    /// Create a channel in the Space.
    ///
    /// # Arguments
    ///
    /// * `from` - The account that signs; needs the add-channel permission
    /// * `channel_id` - The new channel's id, unique within the Space
    /// * `metadata` - Free-form channel metadata
    /// * `role_ids` - Roles granted access to the channel
    ///
    /// # Returns
    ///
    /// A `TransactionRequest` ready to be signed and sent
    pub fn create_channel_transaction(
        &self,
        from: Address,
        channel_id: B256,
        metadata: String,
        role_ids: Vec<U256>,
    ) -> TransactionRequest {
        let span = spans::build_transaction(CONTRACT, &self.address(), "createChannel", &from);
        let _guard = span.enter();

        info!(
            from = %from,
            channel_id = %channel_id,
            role_count = role_ids.len(),
            contract_address = %self.address(),
            event = "create_channel_transaction_created"
        );

        self.instance
            .createChannel(channel_id, metadata, role_ids)
            .from(from)
            .into_transaction_request()
    }

    /// Create a channel whose roles carry channel-specific permissions.
    pub fn create_channel_with_override_permissions_transaction(
        &self,
        from: Address,
        channel_id: B256,
        metadata: String,
        role_permissions: Vec<RolePermissions>,
    ) -> TransactionRequest {
        let span = spans::build_transaction(
            CONTRACT,
            &self.address(),
            "createChannelWithOverridePermissions",
            &from,
        );
        let _guard = span.enter();

        info!(
            from = %from,
            channel_id = %channel_id,
            role_count = role_permissions.len(),
            contract_address = %self.address(),
            event = "create_channel_with_override_permissions_transaction_created"
        );

        self.instance
            .createChannelWithOverridePermissions(channel_id, metadata, role_permissions)
            .from(from)
            .into_transaction_request()
    }

    pub fn update_channel_transaction(
        &self,
        from: Address,
        channel_id: B256,
        metadata: String,
        disabled: bool,
    ) -> TransactionRequest {
        let span = spans::build_transaction(CONTRACT, &self.address(), "updateChannel", &from);
        let _guard = span.enter();

        info!(
            from = %from,
            channel_id = %channel_id,
            disabled = disabled,
            contract_address = %self.address(),
            event = "update_channel_transaction_created"
        );

        self.instance
            .updateChannel(channel_id, metadata, disabled)
            .from(from)
            .into_transaction_request()
    }

    pub fn remove_channel_transaction(&self, from: Address, channel_id: B256) -> TransactionRequest {
        let span = spans::build_transaction(CONTRACT, &self.address(), "removeChannel", &from);
        let _guard = span.enter();

        info!(
            from = %from,
            channel_id = %channel_id,
            contract_address = %self.address(),
            event = "remove_channel_transaction_created"
        );

        self.instance
            .removeChannel(channel_id)
            .from(from)
            .into_transaction_request()
    }

    pub fn add_role_to_channel_transaction(
        &self,
        from: Address,
        channel_id: B256,
        role_id: U256,
    ) -> TransactionRequest {
        let span = spans::build_transaction(CONTRACT, &self.address(), "addRoleToChannel", &from);
        let _guard = span.enter();

        info!(
            from = %from,
            channel_id = %channel_id,
            role_id = %role_id,
            contract_address = %self.address(),
            event = "add_role_to_channel_transaction_created"
        );

        self.instance
            .addRoleToChannel(channel_id, role_id)
            .from(from)
            .into_transaction_request()
    }

    pub fn remove_role_from_channel_transaction(
        &self,
        from: Address,
        channel_id: B256,
        role_id: U256,
    ) -> TransactionRequest {
        let span =
            spans::build_transaction(CONTRACT, &self.address(), "removeRoleFromChannel", &from);
        let _guard = span.enter();

        info!(
            from = %from,
            channel_id = %channel_id,
            role_id = %role_id,
            contract_address = %self.address(),
            event = "remove_role_from_channel_transaction_created"
        );

        self.instance
            .removeRoleFromChannel(channel_id, role_id)
            .from(from)
            .into_transaction_request()
    }

    /// Filterer facet over this Space's events.
    pub fn events(&self) -> ChannelsFilterer<'_, P> {
        EventFilterer::new(
            self.address(),
            AlloyLogSource::new(self.instance.provider()),
            TokioClock,
        )
    }

    // Indexed-event queries. Empty slices match any value.

    pub fn channel_created_query(&self, caller: &[Address]) -> EventQuery {
        EventQuery::new().topic1(address_topics(caller))
    }

    pub fn channel_updated_query(&self, caller: &[Address]) -> EventQuery {
        EventQuery::new().topic1(address_topics(caller))
    }

    pub fn channel_removed_query(&self, caller: &[Address]) -> EventQuery {
        EventQuery::new().topic1(address_topics(caller))
    }

    pub fn channel_role_added_query(&self, caller: &[Address]) -> EventQuery {
        EventQuery::new().topic1(address_topics(caller))
    }

    pub fn channel_role_removed_query(&self, caller: &[Address]) -> EventQuery {
        EventQuery::new().topic1(address_topics(caller))
    }

    pub fn banned_query(&self, moderator: &[Address], token_id: &[U256]) -> EventQuery {
        EventQuery::new()
            .topic1(address_topics(moderator))
            .topic2(uint_topics(token_id))
    }

    pub fn unbanned_query(&self, moderator: &[Address], token_id: &[U256]) -> EventQuery {
        EventQuery::new()
            .topic1(address_topics(moderator))
            .topic2(uint_topics(token_id))
    }

    pub fn transfer_query(&self, from: &[Address], to: &[Address], token_id: &[U256]) -> EventQuery {
        EventQuery::new()
            .topic1(address_topics(from))
            .topic2(address_topics(to))
            .topic3(uint_topics(token_id))
    }

    pub fn approval_query(
        &self,
        owner: &[Address],
        approved: &[Address],
        token_id: &[U256],
    ) -> EventQuery {
        EventQuery::new()
            .topic1(address_topics(owner))
            .topic2(address_topics(approved))
            .topic3(uint_topics(token_id))
    }

    pub fn approval_for_all_query(&self, owner: &[Address], operator: &[Address]) -> EventQuery {
        EventQuery::new()
            .topic1(address_topics(owner))
            .topic2(address_topics(operator))
    }

    /// `ConsecutiveTransfer` indexes `fromTokenId`, `from` and `to`.
    pub fn consecutive_transfer_query(
        &self,
        from_token_id: &[U256],
        from: &[Address],
        to: &[Address],
    ) -> EventQuery {
        EventQuery::new()
            .topic1(uint_topics(from_token_id))
            .topic2(address_topics(from))
            .topic3(address_topics(to))
    }

    pub fn role_created_query(&self, creator: &[Address], role_id: &[U256]) -> EventQuery {
        EventQuery::new()
            .topic1(address_topics(creator))
            .topic2(uint_topics(role_id))
    }

    pub fn role_updated_query(&self, updater: &[Address], role_id: &[U256]) -> EventQuery {
        EventQuery::new()
            .topic1(address_topics(updater))
            .topic2(uint_topics(role_id))
    }

    pub fn role_removed_query(&self, remover: &[Address], role_id: &[U256]) -> EventQuery {
        EventQuery::new()
            .topic1(address_topics(remover))
            .topic2(uint_topics(role_id))
    }

    /// Shared by the three `Permissions*ChannelRole` events.
    pub fn channel_role_permissions_query(
        &self,
        updater: &[Address],
        role_id: &[U256],
        channel_id: &[B256],
    ) -> EventQuery {
        EventQuery::new()
            .topic1(address_topics(updater))
            .topic2(uint_topics(role_id))
            .topic3(channel_id.iter().copied())
    }

    pub fn subscription_update_query(&self, token_id: &[U256]) -> EventQuery {
        EventQuery::new().topic1(uint_topics(token_id))
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

    /// Shared by `InterfaceAdded` and `InterfaceRemoved`.
    pub fn interface_query(&self, interface_id: &[FixedBytes<4>]) -> EventQuery {
        EventQuery::new().topic1(interface_id.iter().map(bytes4_topic))
    }
}

impl ContractEvents for IChannelsEvents {
    fn selectors() -> &'static [[u8; 32]] {
        IChannelsEvents::SELECTORS
    }
}

sol!(
    #[allow(missing_docs)]
    #[sol(rpc, all_derives)]
    interface IChannels {
        struct RolePermissions {
            uint256 roleId;
            string[] permissions;
        }

        struct Channel {
            bytes32 id;
            bool disabled;
            string metadata;
            uint256[] roleIds;
        }

        event Approval(address indexed owner, address indexed approved, uint256 indexed tokenId);
        event ApprovalForAll(address indexed owner, address indexed operator, bool approved);
        event Banned(address indexed moderator, uint256 indexed tokenId);
        event ChannelCreated(address indexed caller, bytes32 channelId);
        event ChannelRemoved(address indexed caller, bytes32 channelId);
        event ChannelRoleAdded(address indexed caller, bytes32 channelId, uint256 roleId);
        event ChannelRoleRemoved(address indexed caller, bytes32 channelId, uint256 roleId);
        event ChannelUpdated(address indexed caller, bytes32 channelId);
        event ConsecutiveTransfer(uint256 indexed fromTokenId, uint256 toTokenId, address indexed from, address indexed to);
        event Initialized(uint32 version);
        event InterfaceAdded(bytes4 indexed interfaceId);
        event InterfaceRemoved(bytes4 indexed interfaceId);
        event OwnershipTransferred(address indexed previousOwner, address indexed newOwner);
        event Paused(address account);
        event PermissionsAddedToChannelRole(address indexed updater, uint256 indexed roleId, bytes32 indexed channelId);
        event PermissionsRemovedFromChannelRole(address indexed updater, uint256 indexed roleId, bytes32 indexed channelId);
        event PermissionsUpdatedForChannelRole(address indexed updater, uint256 indexed roleId, bytes32 indexed channelId);
        event RoleCreated(address indexed creator, uint256 indexed roleId);
        event RoleRemoved(address indexed remover, uint256 indexed roleId);
        event RoleUpdated(address indexed updater, uint256 indexed roleId);
        event SubscriptionUpdate(uint256 indexed tokenId, uint64 expiration);
        event Transfer(address indexed from, address indexed to, uint256 indexed tokenId);
        event Unbanned(address indexed moderator, uint256 indexed tokenId);
        event Unpaused(address account);

        error ApprovalCallerNotOwnerNorApproved();
        error ApprovalQueryForNonexistentToken();
        error BalanceQueryForZeroAddress();
        error Banning__AlreadyBanned(uint256 tokenId);
        error Banning__CannotBanOwner();
        error Banning__CannotBanSelf();
        error Banning__InvalidTokenId(uint256 tokenId);
        error Banning__NotBanned(uint256 tokenId);
        error ChannelService__ChannelAlreadyExists();
        error ChannelService__ChannelDisabled();
        error ChannelService__ChannelDoesNotExist();
        error ChannelService__RoleAlreadyExists();
        error ChannelService__RoleDoesNotExist();
        error ERC5643__DurationZero();
        error ERC5643__InvalidTokenId(uint256 tokenId);
        error ERC5643__NotApprovedOrOwner();
        error ERC5643__SubscriptionNotRenewable(uint256 tokenId);
        error Entitlement__InvalidValue();
        error Entitlement__NotAllowed();
        error Entitlement__NotMember();
        error Entitlement__ValueAlreadyExists();
        error Initializable_InInitializingState();
        error Introspection_AlreadySupported();
        error Introspection_NotSupported();
        error MintERC2309QuantityExceedsLimit();
        error MintToZeroAddress();
        error MintZeroQuantity();
        error Ownable__NotOwner(address account);
        error Ownable__ZeroAddress();
        error OwnerQueryForNonexistentToken();
        error OwnershipNotInitializedForExtraData();
        error Pausable__NotPaused();
        error Pausable__Paused();
        error Roles__EntitlementAlreadyExists();
        error Roles__EntitlementDoesNotExist();
        error Roles__InvalidEntitlementAddress();
        error Roles__InvalidPermission();
        error Roles__PermissionAlreadyExists();
        error Roles__PermissionDoesNotExist();
        error Roles__RoleDoesNotExist();
        error TransferCallerNotOwnerNorApproved();
        error TransferFromIncorrectOwner();
        error TransferToNonERC721ReceiverImplementer();
        error TransferToZeroAddress();
        error URIQueryForNonexistentToken();

        function addRoleToChannel(bytes32 channelId, uint256 roleId) external;
        function createChannel(bytes32 channelId, string memory metadata, uint256[] memory roleIds) external;
        function createChannelWithOverridePermissions(bytes32 channelId, string memory metadata, RolePermissions[] memory rolePermissions) external;
        function getChannel(bytes32 channelId) external view returns (Channel memory channel);
        function getChannels() external view returns (Channel[] memory channels);
        function getRolesByChannel(bytes32 channelId) external view returns (uint256[] memory roleIds);
        function removeChannel(bytes32 channelId) external;
        function removeRoleFromChannel(bytes32 channelId, uint256 roleId) external;
        function updateChannel(bytes32 channelId, string memory metadata, bool disabled) external;
    }
);
