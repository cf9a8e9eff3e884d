//! Membership facet bindings and wrapper
//!
//! Joining a Space mints a membership NFT; the membership facet holds the
//! pricing, supply and duration settings and collects the fees.

use alloy_network::Ethereum;
use alloy_primitives::{Address, U256};
use alloy_provider::Provider;
use alloy_rpc_types::{BlockId, TransactionRequest};
use alloy_sol_types::sol;
use tracing::{debug, info};

use crate::contracts::CallTarget;
use crate::events::{address_topics, uint_topics, ContractEvents, EventFilterer, EventQuery};
use crate::providers::{AlloyLogSource, TokioClock};
use crate::{spans, Result};
use IMembership::{IMembershipErrors, IMembershipEvents, IMembershipInstance, ReferralTypes};

/// JSON ABI of the membership facet.
pub const ABI: &str = include_str!("../../abis/membership.json");

const CONTRACT: &str = "Membership";

pub type MembershipFilterer<'a, P> =
    EventFilterer<AlloyLogSource<&'a P>, TokioClock, IMembershipEvents>;

/// Membership settings of a Space, read in one go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipTerms {
    pub price: U256,
    /// Membership duration in seconds.
    pub duration: u64,
    /// Maximum number of members.
    pub limit: U256,
    /// Payment currency; the zero address is the native token.
    pub currency: Address,
    pub free_allocation: U256,
    pub pricing_module: Address,
}

/// The Towns membership facet wrapper
pub struct MembershipContract<P: Provider<Ethereum>> {
    instance: IMembershipInstance<P>,
    block: Option<BlockId>,
}

impl<P: Provider<Ethereum>> MembershipContract<P> {
    /// Create a new MembershipContract bound to a Space address.
    pub fn new(address: Address, provider: P) -> Self {
        debug!(
            contract_address = %address,
            event = "membership_contract_initialized"
        );
        Self {
            instance: IMembershipInstance::new(address, provider),
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

    pub fn instance(&self) -> &IMembershipInstance<P> {
        &self.instance
    }

    fn target(&self) -> CallTarget<IMembershipErrors> {
        CallTarget::new(CONTRACT, self.address(), self.block)
    }

    /// Expiry timestamp of a membership token.
    pub async fn expires_at(&self, token_id: U256) -> Result<U256> {
        self.target()
            .call("expiresAt", self.instance.expiresAt(token_id))
            .await
    }

    pub async fn get_membership_currency(&self) -> Result<Address> {
        self.target()
            .call("getMembershipCurrency", self.instance.getMembershipCurrency())
            .await
    }

    pub async fn get_membership_duration(&self) -> Result<u64> {
        self.target()
            .call("getMembershipDuration", self.instance.getMembershipDuration())
            .await
    }

    pub async fn get_membership_free_allocation(&self) -> Result<U256> {
        self.target()
            .call(
                "getMembershipFreeAllocation",
                self.instance.getMembershipFreeAllocation(),
            )
            .await
    }

    pub async fn get_membership_image(&self) -> Result<String> {
        self.target()
            .call("getMembershipImage", self.instance.getMembershipImage())
            .await
    }

    pub async fn get_membership_limit(&self) -> Result<U256> {
        self.target()
            .call("getMembershipLimit", self.instance.getMembershipLimit())
            .await
    }

    /// Current price to join, in the membership currency.
    pub async fn get_membership_price(&self) -> Result<U256> {
        self.target()
            .call("getMembershipPrice", self.instance.getMembershipPrice())
            .await
    }

    pub async fn get_membership_pricing_module(&self) -> Result<Address> {
        self.target()
            .call(
                "getMembershipPricingModule",
                self.instance.getMembershipPricingModule(),
            )
            .await
    }

    /// Price to renew `token_id`.
    ///
    /// # Arguments
    ///
    /// * `token_id` - The membership token to price
    ///
    /// # Returns
    ///
    /// The renewal price in the membership currency
    pub async fn get_membership_renewal_price(&self, token_id: U256) -> Result<U256> {
        self.target()
            .call(
                "getMembershipRenewalPrice",
                self.instance.getMembershipRenewalPrice(token_id),
            )
            .await
    }

    pub async fn get_protocol_fee(&self) -> Result<U256> {
        self.target()
            .call("getProtocolFee", self.instance.getProtocolFee())
            .await
    }

    pub async fn get_space_factory(&self) -> Result<Address> {
        self.target()
            .call("getSpaceFactory", self.instance.getSpaceFactory())
            .await
    }

    /// Fees collected by the Space and not yet withdrawn.
    pub async fn revenue(&self) -> Result<U256> {
        self.target()
            .call("revenue", self.instance.revenue())
            .await
    }

    /// Fetch price, duration, limit, currency, free allocation and pricing
    /// module concurrently.
    pub async fn terms(&self) -> Result<MembershipTerms> {
        let (price, duration, limit, currency, free_allocation, pricing_module) = futures::try_join!(
            self.get_membership_price(),
            self.get_membership_duration(),
            self.get_membership_limit(),
            self.get_membership_currency(),
            self.get_membership_free_allocation(),
            self.get_membership_pricing_module(),
        )?;

        debug!(
            price = %price,
            duration = duration,
            limit = %limit,
            currency = %currency,
            contract_address = %self.address(),
            event = "membership_terms_fetched"
        );

        Ok(MembershipTerms {
            price,
            duration,
            limit,
            currency,
            free_allocation,
            pricing_module,
        })
    }

    /// Mint a membership to `receiver`.
    ///
    /// This builds the transaction without sending it. Read the current price
    /// with [`get_membership_price`](Self::get_membership_price) first.
    ///
    /// # Arguments
    ///
    /// * `from` - The account that pays and signs
    /// * `receiver` - The address that receives the membership token
    /// * `value` - Native value attached, at least the join price
    ///
    /// # Returns
    ///
    /// A `TransactionRequest` ready to be signed and sent
    pub fn join_space_transaction(
        &self,
        from: Address,
        receiver: Address,
        value: U256,
    ) -> TransactionRequest {
        let span = spans::build_transaction(CONTRACT, &self.address(), "joinSpace", &from);
        let _guard = span.enter();

        info!(
            from = %from,
            receiver = %receiver,
            value = %value,
            contract_address = %self.address(),
            event = "join_space_transaction_created"
        );

        self.instance
            .joinSpace(receiver)
            .from(from)
            .value(value)
            .into_transaction_request()
    }

    /// Like [`join_space_transaction`](Self::join_space_transaction), crediting
    /// a partner or referral code.
    pub fn join_space_with_referral_transaction(
        &self,
        from: Address,
        receiver: Address,
        referral: ReferralTypes,
        value: U256,
    ) -> TransactionRequest {
        let span =
            spans::build_transaction(CONTRACT, &self.address(), "joinSpaceWithReferral", &from);
        let _guard = span.enter();

        info!(
            from = %from,
            receiver = %receiver,
            partner = %referral.partner,
            referral_code = %referral.referralCode,
            value = %value,
            contract_address = %self.address(),
            event = "join_space_with_referral_transaction_created"
        );

        self.instance
            .joinSpaceWithReferral(receiver, referral)
            .from(from)
            .value(value)
            .into_transaction_request()
    }

    /// Extend an existing membership by one duration.
    ///
    /// # Arguments
    ///
    /// * `from` - The account that pays and signs
    /// * `token_id` - The membership token to renew
    /// * `value` - Native value attached, at least
    ///   [`get_membership_renewal_price`](Self::get_membership_renewal_price)
    ///
    /// # Returns
    ///
    /// A `TransactionRequest` ready to be signed and sent
    pub fn renew_membership_transaction(
        &self,
        from: Address,
        token_id: U256,
        value: U256,
    ) -> TransactionRequest {
        let span = spans::build_transaction(CONTRACT, &self.address(), "renewMembership", &from);
        let _guard = span.enter();

        info!(
            from = %from,
            token_id = %token_id,
            value = %value,
            contract_address = %self.address(),
            event = "renew_membership_transaction_created"
        );

        self.instance
            .renewMembership(token_id)
            .from(from)
            .value(value)
            .into_transaction_request()
    }

    pub fn set_membership_duration_transaction(
        &self,
        from: Address,
        duration: u64,
    ) -> TransactionRequest {
        let span =
            spans::build_transaction(CONTRACT, &self.address(), "setMembershipDuration", &from);
        let _guard = span.enter();

        info!(
            from = %from,
            duration = duration,
            contract_address = %self.address(),
            event = "set_membership_duration_transaction_created"
        );

        self.instance
            .setMembershipDuration(duration)
            .from(from)
            .into_transaction_request()
    }

    pub fn set_membership_free_allocation_transaction(
        &self,
        from: Address,
        allocation: U256,
    ) -> TransactionRequest {
        let span = spans::build_transaction(
            CONTRACT,
            &self.address(),
            "setMembershipFreeAllocation",
            &from,
        );
        let _guard = span.enter();

        info!(
            from = %from,
            allocation = %allocation,
            contract_address = %self.address(),
            event = "set_membership_free_allocation_transaction_created"
        );

        self.instance
            .setMembershipFreeAllocation(allocation)
            .from(from)
            .into_transaction_request()
    }

    pub fn set_membership_image_transaction(&self, from: Address, image: String) -> TransactionRequest {
        let span = spans::build_transaction(CONTRACT, &self.address(), "setMembershipImage", &from);
        let _guard = span.enter();

        info!(
            from = %from,
            image = %image,
            contract_address = %self.address(),
            event = "set_membership_image_transaction_created"
        );

        self.instance
            .setMembershipImage(image)
            .from(from)
            .into_transaction_request()
    }

    pub fn set_membership_limit_transaction(&self, from: Address, limit: U256) -> TransactionRequest {
        let span = spans::build_transaction(CONTRACT, &self.address(), "setMembershipLimit", &from);
        let _guard = span.enter();

        info!(
            from = %from,
            limit = %limit,
            contract_address = %self.address(),
            event = "set_membership_limit_transaction_created"
        );

        self.instance
            .setMembershipLimit(limit)
            .from(from)
            .into_transaction_request()
    }

    pub fn set_membership_price_transaction(&self, from: Address, price: U256) -> TransactionRequest {
        let span = spans::build_transaction(CONTRACT, &self.address(), "setMembershipPrice", &from);
        let _guard = span.enter();

        info!(
            from = %from,
            price = %price,
            contract_address = %self.address(),
            event = "set_membership_price_transaction_created"
        );

        self.instance
            .setMembershipPrice(price)
            .from(from)
            .into_transaction_request()
    }

    pub fn set_membership_pricing_module_transaction(
        &self,
        from: Address,
        pricing_module: Address,
    ) -> TransactionRequest {
        let span = spans::build_transaction(
            CONTRACT,
            &self.address(),
            "setMembershipPricingModule",
            &from,
        );
        let _guard = span.enter();

        info!(
            from = %from,
            pricing_module = %pricing_module,
            contract_address = %self.address(),
            event = "set_membership_pricing_module_transaction_created"
        );

        self.instance
            .setMembershipPricingModule(pricing_module)
            .from(from)
            .into_transaction_request()
    }

    pub fn events(&self) -> MembershipFilterer<'_, P> {
        EventFilterer::new(
            self.address(),
            AlloyLogSource::new(self.instance.provider()),
            TokioClock,
        )
    }

    pub fn membership_token_issued_query(
        &self,
        recipient: &[Address],
        token_id: &[U256],
    ) -> EventQuery {
        EventQuery::new()
            .topic1(address_topics(recipient))
            .topic2(uint_topics(token_id))
    }

    pub fn membership_token_rejected_query(&self, recipient: &[Address]) -> EventQuery {
        EventQuery::new().topic1(address_topics(recipient))
    }

    pub fn membership_withdrawal_query(&self, recipient: &[Address]) -> EventQuery {
        EventQuery::new().topic1(address_topics(recipient))
    }

    pub fn membership_currency_updated_query(&self, currency: &[Address]) -> EventQuery {
        EventQuery::new().topic1(address_topics(currency))
    }

    pub fn membership_fee_recipient_updated_query(&self, recipient: &[Address]) -> EventQuery {
        EventQuery::new().topic1(address_topics(recipient))
    }

    pub fn membership_price_updated_query(&self, price: &[U256]) -> EventQuery {
        EventQuery::new().topic1(uint_topics(price))
    }

    pub fn membership_limit_updated_query(&self, limit: &[U256]) -> EventQuery {
        EventQuery::new().topic1(uint_topics(limit))
    }

    pub fn membership_free_allocation_updated_query(&self, allocation: &[U256]) -> EventQuery {
        EventQuery::new().topic1(uint_topics(allocation))
    }
}

impl ContractEvents for IMembershipEvents {
    fn selectors() -> &'static [[u8; 32]] {
        IMembershipEvents::SELECTORS
    }
}

sol!(
    #[allow(missing_docs)]
    #[sol(rpc, all_derives)]
    interface IMembership {
        struct ReferralTypes {
            address partner;
            address userReferral;
            string referralCode;
        }

        event MembershipCurrencyUpdated(address indexed currency);
        event MembershipFeeRecipientUpdated(address indexed recipient);
        event MembershipFreeAllocationUpdated(uint256 indexed allocation);
        event MembershipLimitUpdated(uint256 indexed limit);
        event MembershipPriceUpdated(uint256 indexed price);
        event MembershipTokenIssued(address indexed recipient, uint256 indexed tokenId);
        event MembershipTokenRejected(address indexed recipient);
        event MembershipWithdrawal(address indexed recipient, uint256 amount);

        error Membership__AlreadyMember();
        error Membership__Banned();
        error Membership__InsufficientAllowance();
        error Membership__InsufficientPayment();
        error Membership__InvalidAddress();
        error Membership__InvalidCurrency();
        error Membership__InvalidDuration();
        error Membership__InvalidFeeRecipient();
        error Membership__InvalidFreeAllocation();
        error Membership__InvalidLimit();
        error Membership__InvalidMaxSupply();
        error Membership__InvalidPayment();
        error Membership__InvalidPrice();
        error Membership__InvalidPricingModule();
        error Membership__InvalidTokenId();
        error Membership__InvalidTransactionType();
        error Membership__MaxSupplyReached();
        error Membership__NotExpired();
        error Membership__PriceTooLow();

        function expiresAt(uint256 tokenId) external view returns (uint256);
        function getMembershipCurrency() external view returns (address);
        function getMembershipDuration() external view returns (uint64);
        function getMembershipFreeAllocation() external view returns (uint256);
        function getMembershipImage() external view returns (string memory);
        function getMembershipLimit() external view returns (uint256);
        function getMembershipPrice() external view returns (uint256);
        function getMembershipPricingModule() external view returns (address);
        function getMembershipRenewalPrice(uint256 tokenId) external view returns (uint256);
        function getProtocolFee() external view returns (uint256);
        function getSpaceFactory() external view returns (address);
        function joinSpace(address receiver) external payable;
        function joinSpaceWithReferral(address receiver, ReferralTypes memory referral) external payable;
        function renewMembership(uint256 tokenId) external payable;
        function revenue() external view returns (uint256);
        function setMembershipDuration(uint64 duration) external;
        function setMembershipFreeAllocation(uint256 newAllocation) external;
        function setMembershipImage(string memory image) external;
        function setMembershipLimit(uint256 newLimit) external;
        function setMembershipPrice(uint256 newPrice) external;
        function setMembershipPricingModule(address pricingModule) external;
    }
);

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use alloy_provider::ProviderBuilder;
    use alloy_sol_types::SolCall;

    #[test]
    fn test_join_space_with_referral_transaction() {
        let provider = ProviderBuilder::new().connect_http("http://localhost:8545".parse().unwrap());
        let membership =
            MembershipContract::new(address!("00000000000000000000000000000000000005ac"), provider);
        let receiver = address!("0000000000000000000000000000000000000b0b");
        let referral = ReferralTypes {
            partner: address!("0000000000000000000000000000000000000a11"),
            userReferral: Address::ZERO,
            referralCode: "TOWNS".to_string(),
        };

        let tx = membership.join_space_with_referral_transaction(
            receiver,
            receiver,
            referral.clone(),
            U256::from(10u64.pow(15)),
        );

        assert_eq!(tx.from, Some(receiver));
        assert_eq!(tx.value, Some(U256::from(10u64.pow(15))));
        let decoded =
            IMembership::joinSpaceWithReferralCall::abi_decode(tx.input.input().unwrap()).unwrap();
        assert_eq!(decoded.receiver, receiver);
        assert_eq!(decoded.referral, referral);
    }
}
