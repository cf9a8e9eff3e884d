//! Core trait abstractions for event access.
//!
//! The filterer facet only needs two things from a node: logs matching a
//! filter and the current head. Keeping those behind a trait lets tests drive
//! queries and watch streams with fakes, including RPC failures and chains
//! that stall.
//!
//! # Example: Implementing a Test Fake
//!
//! ```rust,ignore
//! use towns_bindings::traits::LogSource;
//!
//! struct StaticLogs(Vec<Log>);
//!
//! #[async_trait::async_trait]
//! impl LogSource for StaticLogs {
//!     async fn get_logs(&self, _filter: &Filter) -> Result<Vec<Log>> {
//!         Ok(self.0.clone())
//!     }
//!
//!     async fn get_block_number(&self) -> Result<u64> {
//!         Ok(100)
//!     }
//! }
//! ```

use alloy_rpc_types::{Filter, Log};
use async_trait::async_trait;
use std::time::{Duration, Instant};

use crate::error::Result;

/// Source of contract logs.
///
/// # Test Scenarios
///
/// Implementing this trait with fakes enables testing:
/// - Logs arriving across several polls
/// - Heads that do not advance
/// - RPC failures in the middle of a watch
/// - Range-limited providers
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Returns the logs matching `filter`, in chain order.
    ///
    /// # Errors
    ///
    /// Returns an error if the RPC call fails.
    async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>>;

    /// Gets the current block number.
    ///
    /// # Errors
    ///
    /// Returns an error if the RPC call fails.
    async fn get_block_number(&self) -> Result<u64>;
}

/// Trait for time-based operations.
///
/// Watch streams sleep between polls through this trait so tests can run
/// them without waiting.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Asynchronously sleeps for the given duration.
    async fn sleep(&self, duration: Duration);

    /// Returns the current instant in time.
    fn now(&self) -> Instant;
}
