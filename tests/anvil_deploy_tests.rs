//! Deployment tests against a local Anvil node
//!
//! These need the `anvil` binary on `PATH` and are ignored by default:
//!
//! ```sh
//! cargo test --test anvil_deploy_tests -- --ignored
//! ```

use alloy_primitives::{B256, U256};
use alloy_provider::{ProviderBuilder, WalletProvider};
use towns_bindings::deploy::{deploy_channels, deploy_entitlement_checker, deploy_xchain};
use towns_bindings::TownsError;

#[tokio::test]
#[ignore = "requires anvil"]
async fn test_deploy_channels_and_read_empty_state() {
    let provider = ProviderBuilder::new().connect_anvil_with_wallet();
    let from = provider.default_signer_address();

    let channels = deploy_channels(&provider, from).await.unwrap();

    assert!(channels.get_channels().await.unwrap().is_empty());
    let missing = channels.get_channel(B256::with_last_byte(1)).await;
    assert!(
        matches!(missing, Err(TownsError::Reverted { .. } | TownsError::UnknownRevert { .. })),
        "Reading an unknown channel should revert"
    );
}

#[tokio::test]
#[ignore = "requires anvil"]
async fn test_deploy_xchain_reports_no_completed_checks() {
    let provider = ProviderBuilder::new().connect_anvil_with_wallet();
    let from = provider.default_signer_address();

    let xchain = deploy_xchain(&provider, from).await.unwrap();

    let completed = xchain
        .is_check_completed(B256::with_last_byte(1), U256::from(1))
        .await
        .unwrap();
    assert!(!completed);
}

#[tokio::test]
#[ignore = "requires anvil"]
async fn test_deploy_entitlement_checker_starts_without_nodes() {
    let provider = ProviderBuilder::new().connect_anvil_with_wallet();
    let from = provider.default_signer_address();

    let checker = deploy_entitlement_checker(&provider, from).await.unwrap();

    assert_eq!(checker.get_node_count().await.unwrap(), U256::ZERO);
    assert!(checker.nodes().await.unwrap().is_empty());
    assert!(!checker.is_valid_node(from).await.unwrap());
}
