//! The inline bindings must expose exactly the selectors of the shipped ABI
//! files, so the JSON and the `sol!` declarations cannot drift apart.

use alloy_json_abi::JsonAbi;
use std::collections::BTreeSet;
use towns_bindings::contracts::{
    app_registry, channels, delegate_registry, entitlement_checker, membership, wallet_link,
};

struct AbiSelectors {
    functions: BTreeSet<[u8; 4]>,
    events: BTreeSet<[u8; 32]>,
    errors: BTreeSet<[u8; 4]>,
}

fn json_selectors(abi: &str) -> AbiSelectors {
    let abi: JsonAbi = serde_json::from_str(abi).expect("ABI file should parse");
    AbiSelectors {
        functions: abi.functions().map(|f| f.selector().0).collect(),
        events: abi
            .events()
            .filter(|e| !e.anonymous)
            .map(|e| e.selector().0)
            .collect(),
        errors: abi.errors().map(|e| e.selector().0).collect(),
    }
}

fn set<const N: usize>(selectors: &[[u8; N]]) -> BTreeSet<[u8; N]> {
    selectors.iter().copied().collect()
}

macro_rules! conformance_test {
    ($test:ident, $abi:expr, $calls:ty, $events:ty, $errors:ty) => {
        #[test]
        fn $test() {
            let json = json_selectors($abi);
            assert_eq!(json.functions, set(<$calls>::SELECTORS), "function selectors");
            assert_eq!(json.events, set(<$events>::SELECTORS), "event selectors");
            assert_eq!(json.errors, set(<$errors>::SELECTORS), "error selectors");
        }
    };
}

conformance_test!(
    test_app_registry_matches_abi,
    app_registry::ABI,
    app_registry::IAppRegistry::IAppRegistryCalls,
    app_registry::IAppRegistry::IAppRegistryEvents,
    app_registry::IAppRegistry::IAppRegistryErrors
);

conformance_test!(
    test_channels_matches_abi,
    channels::ABI,
    channels::IChannels::IChannelsCalls,
    channels::IChannels::IChannelsEvents,
    channels::IChannels::IChannelsErrors
);

conformance_test!(
    test_membership_matches_abi,
    membership::ABI,
    membership::IMembership::IMembershipCalls,
    membership::IMembership::IMembershipEvents,
    membership::IMembership::IMembershipErrors
);

conformance_test!(
    test_wallet_link_matches_abi,
    wallet_link::ABI,
    wallet_link::IWalletLink::IWalletLinkCalls,
    wallet_link::IWalletLink::IWalletLinkEvents,
    wallet_link::IWalletLink::IWalletLinkErrors
);

conformance_test!(
    test_xchain_matches_abi,
    entitlement_checker::XCHAIN_ABI,
    entitlement_checker::IXChain::IXChainCalls,
    entitlement_checker::IXChain::IXChainEvents,
    entitlement_checker::IXChain::IXChainErrors
);

conformance_test!(
    test_entitlement_checker_matches_abi,
    entitlement_checker::ENTITLEMENT_CHECKER_ABI,
    entitlement_checker::IEntitlementChecker::IEntitlementCheckerCalls,
    entitlement_checker::IEntitlementChecker::IEntitlementCheckerEvents,
    entitlement_checker::IEntitlementChecker::IEntitlementCheckerErrors
);

#[test]
fn test_delegate_registry_matches_abi() {
    use delegate_registry::IDelegationRegistry::{
        IDelegationRegistryCalls, IDelegationRegistryEvents,
    };

    let json = json_selectors(delegate_registry::ABI);
    assert_eq!(json.functions, set(IDelegationRegistryCalls::SELECTORS));
    assert_eq!(json.events, set(IDelegationRegistryEvents::SELECTORS));
    assert!(json.errors.is_empty(), "The v1 registry declares no custom errors");
}
