//! Transaction submission helpers
//!
//! Contract wrappers only build unsigned [`TransactionRequest`]s. Signing is
//! the provider's job (a wallet filler or a node-managed account); these
//! helpers submit a request, wait for the receipt and pull typed events out
//! of it.

use alloy_network::Ethereum;
use alloy_primitives::Address;
use alloy_provider::Provider;
use alloy_rpc_types::{TransactionReceipt, TransactionRequest};
use alloy_sol_types::SolEvent;
use tracing::{info, warn, Instrument};

use crate::events::{decode_event, DecodedEvent};
use crate::{spans, Result, TownsError};

/// Send `tx` and wait until it has `confirmations` confirmations.
///
/// Fails with [`TownsError::TransactionFailed`] when the receipt reports a
/// reverted execution.
///
/// # Example
///
/// ```rust,no_run
/// use alloy_provider::ProviderBuilder;
/// use towns_bindings::contracts::membership::MembershipContract;
/// use towns_bindings::transact;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let provider = ProviderBuilder::new().connect("http://localhost:8545").await?;
/// let space = "0x0000000000000000000000000000000000000001".parse()?;
/// let member = "0x0000000000000000000000000000000000000002".parse()?;
/// let membership = MembershipContract::new(space, &provider);
///
/// let price = membership.get_membership_price().await?;
/// let tx = membership.join_space_transaction(member, member, price);
/// let receipt = transact::send(&provider, tx, 1).await?;
/// println!("joined in block {:?}", receipt.block_number);
/// # Ok(())
/// # }
/// ```
pub async fn send<P>(
    provider: &P,
    tx: TransactionRequest,
    confirmations: u64,
) -> Result<TransactionReceipt>
where
    P: Provider<Ethereum>,
{
    let to = tx.to.as_ref().and_then(|kind| kind.to()).copied();
    let span = spans::send_transaction(to.as_ref(), confirmations);

    async move {
        let pending = provider
            .send_transaction(tx)
            .await
            .inspect_err(|e| spans::record_error(e))?;
        let tx_hash = *pending.tx_hash();
        spans::record_tx_hash(&tx_hash);

        info!(
            tx_hash = %tx_hash,
            to = ?to,
            event = "transaction_sent"
        );

        let receipt = pending
            .with_required_confirmations(confirmations)
            .get_receipt()
            .await
            .inspect_err(|e| spans::record_error(e))?;

        if !receipt.status() {
            warn!(
                tx_hash = %tx_hash,
                block_number = ?receipt.block_number,
                gas_used = receipt.gas_used,
                event = "transaction_reverted"
            );
            let error = TownsError::TransactionFailed { tx_hash };
            spans::record_error(&error);
            return Err(error);
        }

        info!(
            tx_hash = %tx_hash,
            block_number = ?receipt.block_number,
            gas_used = receipt.gas_used,
            event = "transaction_confirmed"
        );
        Ok(receipt)
    }
    .instrument(span)
    .await
}

/// Every `E` event that `contract` emitted in the transaction.
pub fn receipt_events<E: SolEvent>(
    receipt: &TransactionReceipt,
    contract: Address,
) -> Result<Vec<DecodedEvent<E>>> {
    receipt
        .inner
        .logs()
        .iter()
        .filter(|log| log.address() == contract && log.topic0() == Some(&E::SIGNATURE_HASH))
        .map(decode_event::<E>)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::wallet_link::IWalletLink;
    use crate::testing::log_for;
    use alloy_primitives::address;
    use serde_json::json;

    const WALLET_LINK: Address = address!("00000000000000000000000000000000000000aa");

    fn receipt_with_logs(logs: Vec<alloy_rpc_types::Log>) -> TransactionReceipt {
        serde_json::from_value(json!({
            "type": "0x2",
            "status": "0x1",
            "cumulativeGasUsed": "0x5208",
            "logs": logs,
            "logsBloom": format!("0x{}", "00".repeat(256)),
            "transactionHash": format!("0x{}", "11".repeat(32)),
            "transactionIndex": "0x0",
            "blockHash": format!("0x{}", "22".repeat(32)),
            "blockNumber": "0xa",
            "gasUsed": "0x5208",
            "effectiveGasPrice": "0x3b9aca00",
            "from": "0x00000000000000000000000000000000000000a1",
            "to": WALLET_LINK,
            "contractAddress": null
        }))
        .unwrap()
    }

    #[test]
    fn test_receipt_events_filters_by_contract_and_event() {
        let wallet = address!("00000000000000000000000000000000000000b1");
        let root_key = address!("00000000000000000000000000000000000000b2");
        let linked = IWalletLink::LinkWalletToRootKey {
            wallet,
            rootKey: root_key,
        };
        let removed = IWalletLink::RemoveLink {
            wallet,
            secondWallet: root_key,
        };
        let other = address!("00000000000000000000000000000000000000cc");

        let receipt = receipt_with_logs(vec![
            log_for(WALLET_LINK, &linked, 10, 0),
            log_for(WALLET_LINK, &removed, 10, 1),
            log_for(other, &linked, 10, 2),
        ]);

        let events =
            receipt_events::<IWalletLink::LinkWalletToRootKey>(&receipt, WALLET_LINK).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event.rootKey, root_key);
        assert_eq!(events[0].log_index, Some(0));
    }
}
