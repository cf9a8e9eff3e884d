//! OpenTelemetry span helpers for contract operations
//!
//! Span names are static and prefixed with `towns_bindings.`; variable data
//! goes into structured attributes. The wrappers open these spans internally,
//! and they are public so callers can nest their own work under the same
//! names.
//!
//! # Example
//!
//! ```rust,no_run
//! use towns_bindings::spans;
//! use alloy_primitives::Address;
//!
//! let span = spans::contract_call("AppRegistry", &Address::ZERO, "getAppById");
//! let _guard = span.enter();
//! ```

use alloy_primitives::{Address, TxHash};
use tracing::Span;

/// Create span for a read-only contract call.
///
/// Parent: caller operation
/// Children: provider RPC calls (`eth_call`)
#[inline]
pub fn contract_call(contract: &'static str, address: &Address, method: &'static str) -> Span {
    tracing::debug_span!(
        "towns_bindings.contract_call",
        contract = contract,
        contract_address = %address,
        method = method,
        error.type = tracing::field::Empty,
        error.message = tracing::field::Empty,
        error.source = tracing::field::Empty,
        otel.status_code = "OK",
    )
}

/// Create span for building an unsigned transaction request.
#[inline]
pub fn build_transaction(
    contract: &'static str,
    address: &Address,
    method: &'static str,
    from: &Address,
) -> Span {
    tracing::debug_span!(
        "towns_bindings.build_transaction",
        contract = contract,
        contract_address = %address,
        method = method,
        from = %from,
    )
}

/// Create span for a historical event query.
///
/// Parent: caller operation
/// Children: one `eth_getLogs` per block chunk
#[inline]
pub fn query_events(
    address: &Address,
    event: &'static str,
    from_block: u64,
    to_block: Option<u64>,
) -> Span {
    tracing::info_span!(
        "towns_bindings.query_events",
        contract_address = %address,
        event_name = event,
        from_block = from_block,
        to_block = to_block,
        chunks = tracing::field::Empty,
        log_count = tracing::field::Empty,
        error.type = tracing::field::Empty,
        error.message = tracing::field::Empty,
        error.source = tracing::field::Empty,
        otel.status_code = "OK",
    )
}

/// Create span for a single poll of a watch stream.
#[inline]
pub fn watch_poll(address: &Address, event: &'static str, from_block: u64, head: u64) -> Span {
    tracing::debug_span!(
        "towns_bindings.watch_poll",
        contract_address = %address,
        event_name = event,
        from_block = from_block,
        head = head,
    )
}

/// Create span for opening a pubsub log subscription.
#[inline]
pub fn subscribe_events(address: &Address, event: &'static str) -> Span {
    tracing::info_span!(
        "towns_bindings.subscribe_events",
        contract_address = %address,
        event_name = event,
        error.type = tracing::field::Empty,
        error.message = tracing::field::Empty,
        error.source = tracing::field::Empty,
        otel.status_code = "OK",
    )
}

/// Create span for a contract deployment.
///
/// Parent: caller operation
/// Children: send_transaction
#[inline]
pub fn deploy_contract(contract: &'static str, bytecode_len: usize) -> Span {
    tracing::info_span!(
        "towns_bindings.deploy_contract",
        contract = contract,
        bytecode_len_bytes = bytecode_len,
        contract_address = tracing::field::Empty,
        error.type = tracing::field::Empty,
        error.message = tracing::field::Empty,
        error.source = tracing::field::Empty,
        otel.status_code = "OK",
    )
}

/// Create span for submitting a transaction and waiting for its receipt.
#[inline]
pub fn send_transaction(to: Option<&Address>, required_confirmations: u64) -> Span {
    tracing::info_span!(
        "towns_bindings.send_transaction",
        to = to.map(tracing::field::display),
        required_confirmations = required_confirmations,
        tx_hash = tracing::field::Empty,
        error.type = tracing::field::Empty,
        error.message = tracing::field::Empty,
        error.source = tracing::field::Empty,
        otel.status_code = "OK",
    )
}

/// Record the hash of a submitted transaction on the current span.
pub fn record_tx_hash(tx_hash: &TxHash) {
    Span::current().record("tx_hash", tracing::field::display(tx_hash));
}

/// Record error attributes on the current span.
///
/// Follows OpenTelemetry semantic conventions:
/// - error.type: the error variant
/// - error.message: human-readable message
/// - error.source: the underlying cause, when there is one
///
/// # Example
///
/// ```rust,no_run
/// use towns_bindings::{spans, TownsError};
///
/// # fn example() -> Result<(), TownsError> {
/// let span = tracing::info_span!("towns_bindings.operation");
/// let _guard = span.enter();
///
/// let result = some_operation();
/// if let Err(ref e) = result {
///     spans::record_error(e);
/// }
/// result
/// # }
/// # fn some_operation() -> Result<(), TownsError> { Ok(()) }
/// ```
pub fn record_error<E: std::error::Error>(error: &E) {
    let current_span = Span::current();
    let message = error.to_string();
    current_span.record("error.type", message.split(':').next().unwrap_or("Unknown"));
    current_span.record("error.message", message.as_str());
    current_span.record("otel.status_code", "ERROR");

    if let Some(source) = error.source() {
        current_span.record("error.source", source.to_string());
    }
}
