//! Deployment of the contracts whose creation code ships with this crate
//!
//! The channels, xchain and entitlement checker facets can be deployed
//! standalone, which is how local test networks are set up. None of them
//! takes constructor arguments; the xchain and entitlement checker facets
//! are initialized afterwards with their `init_transaction`.

use alloy_network::{Ethereum, TransactionBuilder};
use alloy_primitives::{hex, Address, Bytes};
use alloy_provider::Provider;
use alloy_rpc_types::TransactionRequest;
use tracing::{info, Instrument};

use crate::contracts::channels::ChannelsContract;
use crate::contracts::entitlement_checker::{EntitlementCheckerContract, XChainContract};
use crate::{spans, transact, Result, TownsError};

const CHANNELS_BYTECODE: &str = include_str!("../bytecode/channels.bin");
const XCHAIN_BYTECODE: &str = include_str!("../bytecode/xchain.bin");
const ENTITLEMENT_CHECKER_BYTECODE: &str = include_str!("../bytecode/entitlement_checker.bin");

/// Creation code of the channels facet.
pub fn channels_bytecode() -> Result<Bytes> {
    decode_bytecode(CHANNELS_BYTECODE)
}

/// Creation code of the xchain facet.
pub fn xchain_bytecode() -> Result<Bytes> {
    decode_bytecode(XCHAIN_BYTECODE)
}

/// Creation code of the entitlement checker facet.
pub fn entitlement_checker_bytecode() -> Result<Bytes> {
    decode_bytecode(ENTITLEMENT_CHECKER_BYTECODE)
}

fn decode_bytecode(encoded: &str) -> Result<Bytes> {
    Ok(Bytes::from(hex::decode(encoded.trim())?))
}

/// Deploy the channels facet from `from` and bind a wrapper to it.
pub async fn deploy_channels<P: Provider<Ethereum>>(
    provider: P,
    from: Address,
) -> Result<ChannelsContract<P>> {
    let address = deploy_code(&provider, "Channels", from, channels_bytecode()?).await?;
    Ok(ChannelsContract::new(address, provider))
}

/// Deploy the xchain facet from `from` and bind a wrapper to it.
pub async fn deploy_xchain<P: Provider<Ethereum>>(
    provider: P,
    from: Address,
) -> Result<XChainContract<P>> {
    let address = deploy_code(&provider, "XChain", from, xchain_bytecode()?).await?;
    Ok(XChainContract::new(address, provider))
}

/// Deploy the entitlement checker facet from `from` and bind a wrapper to it.
pub async fn deploy_entitlement_checker<P: Provider<Ethereum>>(
    provider: P,
    from: Address,
) -> Result<EntitlementCheckerContract<P>> {
    let address = deploy_code(
        &provider,
        "EntitlementChecker",
        from,
        entitlement_checker_bytecode()?,
    )
    .await?;
    Ok(EntitlementCheckerContract::new(address, provider))
}

async fn deploy_code<P: Provider<Ethereum>>(
    provider: &P,
    contract: &'static str,
    from: Address,
    code: Bytes,
) -> Result<Address> {
    let span = spans::deploy_contract(contract, code.len());

    async move {
        let tx = TransactionRequest::default()
            .from(from)
            .with_deploy_code(code);
        let receipt = transact::send(provider, tx, 1).await?;

        let address = receipt
            .contract_address
            .ok_or(TownsError::MissingContractAddress {
                tx_hash: receipt.transaction_hash,
            })
            .inspect_err(|e| spans::record_error(e))?;

        tracing::Span::current().record("contract_address", tracing::field::display(&address));
        info!(
            contract = contract,
            contract_address = %address,
            tx_hash = %receipt.transaction_hash,
            event = "contract_deployed"
        );
        Ok(address)
    }
    .instrument(span)
    .await
}
