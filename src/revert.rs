//! Revert data classification
//!
//! Contract calls that revert come back from the node as JSON-RPC errors with
//! the raw revert payload attached. This module maps that payload onto the
//! custom errors declared in a contract's ABI, falling back to the standard
//! `Error(string)` / `Panic(uint256)` encodings.

use std::fmt::Debug;

use alloy_primitives::Bytes;
use alloy_sol_types::{decode_revert_reason, SolInterface};
use tracing::debug;

use crate::error::TownsError;

/// Convert a failed contract call into a [`TownsError`], decoding revert data
/// against the custom errors of `E` when present.
pub(crate) fn classify<E>(contract: &'static str, error: alloy_contract::Error) -> TownsError
where
    E: SolInterface + Debug,
{
    match error.as_revert_data() {
        Some(data) => decode::<E>(contract, data),
        None => TownsError::Contract(error),
    }
}

/// Decode a revert payload returned by `contract`.
///
/// Custom errors of `E` win over the generic encodings. Empty payloads and
/// payloads that match nothing become [`TownsError::UnknownRevert`].
pub fn decode<E>(contract: &'static str, data: Bytes) -> TownsError
where
    E: SolInterface + Debug,
{
    if data.is_empty() {
        return TownsError::UnknownRevert { contract, data };
    }

    if let Ok(custom) = E::abi_decode(&data) {
        debug!(
            contract = contract,
            selector = %alloy_primitives::hex::encode(custom.selector()),
            event = "custom_error_decoded"
        );
        return TownsError::Reverted {
            contract,
            reason: format!("{custom:?}"),
            data,
        };
    }

    if E::valid_selector(selector_of(&data)) {
        // Known selector with a malformed body; keep it raw.
        return TownsError::UnknownRevert { contract, data };
    }

    match decode_revert_reason(&data) {
        Some(reason) => TownsError::Reverted {
            contract,
            reason,
            data,
        },
        None => TownsError::UnknownRevert { contract, data },
    }
}

fn selector_of(data: &[u8]) -> [u8; 4] {
    let mut selector = [0u8; 4];
    let len = data.len().min(4);
    selector[..len].copy_from_slice(&data[..len]);
    selector
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::channels::IChannels::{self, IChannelsErrors};
    use alloy_primitives::U256;
    use alloy_sol_types::{Revert, SolError};

    #[test]
    fn test_decodes_custom_error_with_arguments() {
        let payload = IChannelsErrors::Banning__AlreadyBanned(IChannels::Banning__AlreadyBanned {
            tokenId: U256::from(7),
        })
        .abi_encode();

        let err = decode::<IChannelsErrors>("Channels", payload.into());

        let decoded = err.decode_revert::<IChannelsErrors>();
        match decoded {
            Some(IChannelsErrors::Banning__AlreadyBanned(inner)) => {
                assert_eq!(inner.tokenId, U256::from(7));
            }
            other => panic!("unexpected decode: {other:?}"),
        }
        assert!(matches!(err, TownsError::Reverted { contract: "Channels", .. }));
    }

    #[test]
    fn test_decodes_string_revert() {
        let payload = Revert {
            reason: "not allowed".to_string(),
        }
        .abi_encode();

        let err = decode::<IChannelsErrors>("Channels", payload.into());

        match err {
            TownsError::Reverted { reason, .. } => assert!(reason.contains("not allowed")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_revert_is_unknown() {
        let err = decode::<IChannelsErrors>("Channels", Bytes::new());
        assert!(matches!(err, TownsError::UnknownRevert { .. }));
        assert!(err.decode_revert::<IChannelsErrors>().is_none());
    }

    #[test]
    fn test_truncated_custom_error_stays_raw() {
        let mut payload = IChannels::Banning__NotBanned::SELECTOR.to_vec();
        payload.extend_from_slice(&[0u8; 5]);

        let err = decode::<IChannelsErrors>("Channels", payload.into());

        assert!(matches!(err, TownsError::UnknownRevert { .. }));
    }
}
