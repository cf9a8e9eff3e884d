use alloy_primitives::{Address, Bytes, TxHash, B256};
use alloy_sol_types::SolInterface;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TownsError {
    #[error("{contract} reverted: {reason}")]
    Reverted {
        contract: &'static str,
        reason: String,
        data: Bytes,
    },

    #[error("{contract} reverted with unrecognized data: {data}")]
    UnknownRevert { contract: &'static str, data: Bytes },

    #[error("Contract call failed: {0}")]
    Contract(#[from] alloy_contract::Error),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("RPC error: {0}")]
    Rpc(#[from] alloy_json_rpc::RpcError<alloy_transport::TransportErrorKind>),

    #[error("Pending transaction error: {0}")]
    PendingTransaction(#[from] alloy_provider::PendingTransactionError),

    #[error("Transaction {tx_hash} failed on chain")]
    TransactionFailed { tx_hash: TxHash },

    #[error("Deployment transaction {tx_hash} did not create a contract")]
    MissingContractAddress { tx_hash: TxHash },

    #[error("Log does not match event: expected topic {expected}, found {found:?}")]
    EventMismatch { expected: B256, found: Option<B256> },

    #[error("Log emitted by {found}, expected {expected}")]
    LogAddressMismatch { expected: Address, found: Address },

    #[error("Chain not supported: {0}")]
    UnsupportedChain(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("ABI encoding/decoding error: {0}")]
    Abi(#[from] alloy_sol_types::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Hex conversion error: {0}")]
    Hex(#[from] alloy_primitives::hex::FromHexError),
}

impl TownsError {
    /// Raw revert payload, if the error carries one.
    pub fn revert_data(&self) -> Option<&Bytes> {
        match self {
            Self::Reverted { data, .. } | Self::UnknownRevert { data, .. } => Some(data),
            _ => None,
        }
    }

    /// Decodes the revert payload into one of the custom errors of `E`.
    ///
    /// ```rust
    /// use alloy_primitives::Bytes;
    /// use alloy_sol_types::SolInterface;
    /// use towns_bindings::contracts::app_registry::IAppRegistry;
    /// use towns_bindings::TownsError;
    ///
    /// let revert = IAppRegistry::IAppRegistryErrors::AppNotRegistered(
    ///     IAppRegistry::AppNotRegistered {},
    /// );
    /// let err = TownsError::Reverted {
    ///     contract: "AppRegistry",
    ///     reason: "AppNotRegistered".into(),
    ///     data: Bytes::from(revert.abi_encode()),
    /// };
    ///
    /// assert!(matches!(
    ///     err.decode_revert::<IAppRegistry::IAppRegistryErrors>(),
    ///     Some(IAppRegistry::IAppRegistryErrors::AppNotRegistered(_))
    /// ));
    /// ```
    pub fn decode_revert<E: SolInterface>(&self) -> Option<E> {
        self.revert_data().and_then(|data| E::abi_decode(data).ok())
    }
}

pub type Result<T> = std::result::Result<T, TownsError>;
