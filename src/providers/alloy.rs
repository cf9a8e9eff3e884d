//! Alloy-based log source implementation.

use alloy_network::Ethereum;
use alloy_provider::Provider;
use alloy_rpc_types::{Filter, Log};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use tracing::{debug, instrument, trace};

use crate::error::Result;
use crate::traits::LogSource;

/// Production log source wrapping Alloy's [`Provider`] trait.
///
/// Contract wrappers build one of these around a borrowed provider for every
/// filterer they hand out; `Provider` is implemented for `&P`, so no clone
/// of the underlying transport is needed.
///
/// # Examples
///
/// ```rust,no_run
/// use towns_bindings::providers::AlloyLogSource;
/// use alloy_provider::ProviderBuilder;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let provider = ProviderBuilder::new().connect("http://localhost:8545").await?;
/// let logs = AlloyLogSource::new(&provider);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct AlloyLogSource<P> {
    provider: P,
}

impl<P: Provider<Ethereum>> AlloyLogSource<P> {
    /// Creates a new [`AlloyLogSource`] wrapping the given Alloy provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Returns a reference to the underlying Alloy provider.
    pub fn inner(&self) -> &P {
        &self.provider
    }

    /// Opens an `eth_subscribe("logs")` subscription for `filter`.
    ///
    /// Requires a pubsub transport (WebSocket or IPC).
    #[instrument(skip(self, filter))]
    pub async fn subscribe_logs(&self, filter: &Filter) -> Result<impl Stream<Item = Log> + Unpin> {
        let subscription = self.provider.subscribe_logs(filter).await?;
        debug!(event = "log_subscription_opened");
        Ok(subscription.into_stream().boxed())
    }
}

#[async_trait]
impl<P> LogSource for AlloyLogSource<P>
where
    P: Provider<Ethereum> + Send + Sync,
{
    #[instrument(skip(self, filter))]
    async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>> {
        trace!("Fetching logs");
        let logs = self.provider.get_logs(filter).await?;
        debug!(log_count = logs.len(), "Logs retrieved");
        Ok(logs)
    }

    #[instrument(skip(self))]
    async fn get_block_number(&self) -> Result<u64> {
        trace!("Fetching current block number");
        let block_number = self.provider.get_block_number().await?;
        debug!(block_number = block_number, "Current block number retrieved");
        Ok(block_number)
    }
}
