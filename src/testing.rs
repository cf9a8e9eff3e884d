//! Test utilities and fake implementations for event filtering
//!
//! [`FakeLogSource`] stands in for a node: it holds a fixed set of logs,
//! answers `eth_getLogs` filters against them and reports a scripted chain
//! head. [`FakeClock`] lets watch streams run without waiting.
//!
//! These fakes are used by the integration tests to exercise chunked
//! queries, polling streams and RPC failures.

use alloy_primitives::{Address, B256};
use alloy_rpc_types::{Filter, Log};
use alloy_sol_types::SolEvent;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::traits::{Clock, LogSource};
use crate::{Result, TownsError};

// ============================================================================
// Fake Log Source
// ============================================================================

/// A fake node serving pre-configured logs.
///
/// This allows testing scenarios like:
/// - Logs spread over a wide block range
/// - A head that advances between polls
/// - `eth_getLogs` failing after a number of successful calls
/// - Filters that the caller actually sent
#[derive(Clone, Debug, Default)]
pub struct FakeLogSource {
    inner: Arc<Mutex<FakeChain>>,
}

#[derive(Debug, Default)]
struct FakeChain {
    logs: Vec<Log>,
    head: u64,
    scheduled_heads: VecDeque<u64>,
    fail_get_logs_after: Option<usize>,
    fail_block_number: bool,
    filters: Vec<Filter>,
}

impl FakeLogSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// A source whose head is fixed at `head`.
    pub fn with_head(head: u64) -> Self {
        let source = Self::default();
        source.set_head(head);
        source
    }

    /// Add a log to the chain.
    pub fn add_log(&self, log: Log) {
        self.inner.lock().unwrap().logs.push(log);
    }

    /// Set the head reported once the scheduled heads are used up.
    pub fn set_head(&self, head: u64) {
        self.inner.lock().unwrap().head = head;
    }

    /// Heads returned by the next `get_block_number` calls, in order.
    ///
    /// After the schedule runs out the last scheduled head sticks.
    pub fn schedule_heads(&self, heads: impl IntoIterator<Item = u64>) {
        self.inner.lock().unwrap().scheduled_heads.extend(heads);
    }

    /// Fail every `get_logs` call after `calls` successful ones.
    pub fn fail_get_logs_after(&self, calls: usize) {
        self.inner.lock().unwrap().fail_get_logs_after = Some(calls);
    }

    /// Fail every `get_block_number` call.
    pub fn fail_block_number(&self) {
        self.inner.lock().unwrap().fail_block_number = true;
    }

    /// Filters passed to `get_logs`, in call order.
    pub fn filters(&self) -> Vec<Filter> {
        self.inner.lock().unwrap().filters.clone()
    }

    /// Block windows requested through `get_logs`, in call order.
    pub fn requested_ranges(&self) -> Vec<(u64, u64)> {
        self.filters()
            .iter()
            .map(|filter| {
                (
                    filter.get_from_block().unwrap_or_default(),
                    filter.get_to_block().unwrap_or(u64::MAX),
                )
            })
            .collect()
    }

    /// Number of `get_logs` calls made so far.
    pub fn get_logs_count(&self) -> usize {
        self.inner.lock().unwrap().filters.len()
    }
}

#[async_trait]
impl LogSource for FakeLogSource {
    async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>> {
        let mut chain = self.inner.lock().unwrap();

        if let Some(limit) = chain.fail_get_logs_after {
            if chain.filters.len() >= limit {
                return Err(TownsError::Provider("Simulated RPC error".to_string()));
            }
        }
        chain.filters.push(filter.clone());

        Ok(chain
            .logs
            .iter()
            .filter(|log| log_matches(filter, log))
            .cloned()
            .collect())
    }

    async fn get_block_number(&self) -> Result<u64> {
        let mut chain = self.inner.lock().unwrap();

        if chain.fail_block_number {
            return Err(TownsError::Provider("Simulated RPC error".to_string()));
        }
        if let Some(head) = chain.scheduled_heads.pop_front() {
            chain.head = head;
        }
        Ok(chain.head)
    }
}

fn log_matches(filter: &Filter, log: &Log) -> bool {
    let Some(block) = log.block_number else {
        return false;
    };
    if filter.get_from_block().is_some_and(|from| block < from) {
        return false;
    }
    if filter.get_to_block().is_some_and(|to| block > to) {
        return false;
    }
    if !filter.address.matches(&log.address()) {
        return false;
    }

    let topics = log.topics();
    filter.topics.iter().enumerate().all(|(i, wanted)| {
        wanted.is_empty() || topics.get(i).is_some_and(|topic| wanted.matches(topic))
    })
}

/// An RPC log carrying `event`, as emitted by `address`.
///
/// The transaction hash is derived from the block and log index so every
/// log in a test chain is distinct.
pub fn log_for<E: SolEvent>(address: Address, event: &E, block: u64, log_index: u64) -> Log {
    let mut tx_hash = [0u8; 32];
    tx_hash[16..24].copy_from_slice(&block.to_be_bytes());
    tx_hash[24..].copy_from_slice(&log_index.to_be_bytes());

    Log {
        inner: alloy_primitives::Log {
            address,
            data: event.encode_log_data(),
        },
        block_number: Some(block),
        block_hash: Some(B256::with_last_byte((block % 256) as u8)),
        transaction_hash: Some(B256::from(tx_hash)),
        log_index: Some(log_index),
        ..Default::default()
    }
}

// ============================================================================
// Fake Clock
// ============================================================================

/// A fake clock that allows fast-forwarding time in tests.
///
/// Sleeping returns immediately and advances the clock instead.
#[derive(Clone, Debug)]
pub struct FakeClock {
    current_time: Arc<Mutex<Instant>>,
    sleep_log: Arc<Mutex<Vec<Duration>>>,
}

impl Default for FakeClock {
    fn default() -> Self {
        Self {
            current_time: Arc::new(Mutex::new(Instant::now())),
            sleep_log: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl FakeClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fast-forward the clock by the given duration
    pub fn advance(&self, duration: Duration) {
        let mut time = self.current_time.lock().unwrap();
        *time += duration;
    }

    /// Get the total time "slept" by this clock
    pub fn total_sleep_time(&self) -> Duration {
        self.sleep_log.lock().unwrap().iter().sum()
    }

    /// Get the number of times sleep was called
    pub fn sleep_count(&self) -> usize {
        self.sleep_log.lock().unwrap().len()
    }
}

#[async_trait]
impl Clock for FakeClock {
    async fn sleep(&self, duration: Duration) {
        self.sleep_log.lock().unwrap().push(duration);
        self.advance(duration);
    }

    fn now(&self) -> Instant {
        *self.current_time.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::channels::IChannels;
    use crate::events::address_topic;
    use alloy_primitives::{address, U256};

    const SPACE: Address = address!("00000000000000000000000000000000000000aa");

    fn channel_created(caller: Address, id: u8) -> IChannels::ChannelCreated {
        IChannels::ChannelCreated {
            caller,
            channelId: B256::with_last_byte(id),
        }
    }

    #[tokio::test]
    async fn test_fake_clock_tracks_sleep_calls() {
        let clock = FakeClock::new();
        let start = clock.now();

        clock.sleep(Duration::from_secs(2)).await;
        clock.sleep(Duration::from_secs(3)).await;

        assert_eq!(clock.sleep_count(), 2);
        assert_eq!(clock.total_sleep_time(), Duration::from_secs(5));
        assert_eq!(clock.now() - start, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_fake_log_source_filters_by_block_and_topic() {
        let alice = address!("00000000000000000000000000000000000000a1");
        let bob = address!("00000000000000000000000000000000000000b0");
        let source = FakeLogSource::with_head(100);
        source.add_log(log_for(SPACE, &channel_created(alice, 1), 10, 0));
        source.add_log(log_for(SPACE, &channel_created(bob, 2), 20, 0));
        source.add_log(log_for(SPACE, &channel_created(alice, 3), 90, 1));

        let filter = Filter::new()
            .address(SPACE)
            .event_signature(IChannels::ChannelCreated::SIGNATURE_HASH)
            .topic1(address_topic(&alice))
            .from_block(0)
            .to_block(50);

        let logs = source.get_logs(&filter).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].block_number, Some(10));
        assert_eq!(source.requested_ranges(), vec![(0, 50)]);
    }

    #[tokio::test]
    async fn test_fake_log_source_ignores_other_addresses() {
        let other = address!("00000000000000000000000000000000000000bb");
        let source = FakeLogSource::with_head(10);
        source.add_log(log_for(other, &channel_created(SPACE, 1), 5, 0));

        let filter = Filter::new().address(SPACE).from_block(0).to_block(10);
        assert!(source.get_logs(&filter).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fake_log_source_scheduled_heads_stick() {
        let source = FakeLogSource::with_head(1);
        source.schedule_heads([5, 9]);

        assert_eq!(source.get_block_number().await.unwrap(), 5);
        assert_eq!(source.get_block_number().await.unwrap(), 9);
        assert_eq!(source.get_block_number().await.unwrap(), 9);
    }

    #[tokio::test]
    async fn test_fake_log_source_failure_after_calls() {
        let source = FakeLogSource::with_head(10);
        source.fail_get_logs_after(1);
        let filter = Filter::new().address(SPACE).from_block(0).to_block(10);

        assert!(source.get_logs(&filter).await.is_ok());
        let result = source.get_logs(&filter).await;
        assert!(matches!(result.unwrap_err(), TownsError::Provider(_)));
        assert_eq!(source.get_logs_count(), 1);
    }

    #[test]
    fn test_log_for_encodes_event() {
        let event = IChannels::ChannelRoleAdded {
            caller: SPACE,
            channelId: B256::with_last_byte(7),
            roleId: U256::from(3),
        };
        let log = log_for(SPACE, &event, 42, 3);

        assert_eq!(log.topic0(), Some(&IChannels::ChannelRoleAdded::SIGNATURE_HASH));
        assert_eq!(log.block_number, Some(42));
        assert_eq!(log.log_index, Some(3));
        assert_ne!(log.transaction_hash, log_for(SPACE, &event, 42, 4).transaction_hash);
    }
}
