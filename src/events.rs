//! Event filtering for Towns contracts
//!
//! [`EventFilterer`] is the filterer facet every contract wrapper hands out
//! through `events()`. It runs historical queries (split into block chunks
//! the RPC provider accepts), polling watch streams, pubsub subscriptions and
//! single-log parsing.
//!
//! Log access and sleeping go through [`LogSource`] and [`Clock`] so the
//! polling logic can be tested without a node.
//!
//! # Example
//!
//! ```rust,no_run
//! use alloy_provider::ProviderBuilder;
//! use futures::StreamExt;
//! use towns_bindings::contracts::channels::{ChannelsContract, IChannels};
//! use towns_bindings::EventQuery;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = ProviderBuilder::new().connect("http://localhost:8545").await?;
//! let channels = ChannelsContract::new("0x0000000000000000000000000000000000000001".parse()?, provider);
//!
//! let events = channels.events();
//! let created = events
//!     .query::<IChannels::ChannelCreated>(&EventQuery::new().from_block(1).to_block(50_000))
//!     .await?;
//! println!("{} channels created so far", created.len());
//!
//! let mut stream = Box::pin(events.watch::<IChannels::ChannelCreated>(EventQuery::new()));
//! while let Some(event) = stream.next().await {
//!     println!("{:?}", event?.event.channelId);
//! }
//! # Ok(())
//! # }
//! ```

use std::collections::VecDeque;
use std::marker::PhantomData;

use alloy_network::Ethereum;
use alloy_primitives::{Address, TxHash, B256, U256};
use alloy_provider::Provider;
use alloy_rpc_types::{Filter, Log};
use alloy_sol_types::{SolEvent, SolEventInterface};
use futures::{Stream, StreamExt};
use tracing::{debug, trace, warn, Instrument};

use crate::config::EventPollingConfig;
use crate::providers::AlloyLogSource;
use crate::spans;
use crate::traits::{Clock, LogSource};
use crate::{Result, TownsError};

/// The events enum generated for a contract interface.
///
/// Implemented for every `*Events` enum so that [`EventFilterer::query_all`]
/// can restrict `topic0` to the contract's own events. Diamond proxies emit
/// events from many facets at the same address.
pub trait ContractEvents: SolEventInterface + Sized {
    /// `topic0` of every event in the interface.
    fn selectors() -> &'static [[u8; 32]];
}

/// Block range and indexed-topic filters for an event query.
///
/// Topic slots hold alternatives: a log matches when its topic equals any of
/// the listed values. `None` matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventQuery {
    pub from_block: Option<u64>,
    pub to_block: Option<u64>,
    pub topic1: Option<Vec<B256>>,
    pub topic2: Option<Vec<B256>>,
    pub topic3: Option<Vec<B256>>,
}

impl EventQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_block(mut self, block: u64) -> Self {
        self.from_block = Some(block);
        self
    }

    pub fn to_block(mut self, block: u64) -> Self {
        self.to_block = Some(block);
        self
    }

    pub fn topic1(mut self, values: impl IntoIterator<Item = B256>) -> Self {
        self.topic1 = non_empty(values);
        self
    }

    pub fn topic2(mut self, values: impl IntoIterator<Item = B256>) -> Self {
        self.topic2 = non_empty(values);
        self
    }

    pub fn topic3(mut self, values: impl IntoIterator<Item = B256>) -> Self {
        self.topic3 = non_empty(values);
        self
    }

    /// Builds the RPC filter for the given contract, event selectors and
    /// block window.
    pub(crate) fn to_filter(
        &self,
        address: Address,
        selectors: Vec<B256>,
        from_block: u64,
        to_block: u64,
    ) -> Filter {
        let mut filter = Filter::new()
            .address(address)
            .event_signature(selectors)
            .from_block(from_block)
            .to_block(to_block);

        if let Some(topic) = &self.topic1 {
            filter = filter.topic1(topic.clone());
        }
        if let Some(topic) = &self.topic2 {
            filter = filter.topic2(topic.clone());
        }
        if let Some(topic) = &self.topic3 {
            filter = filter.topic3(topic.clone());
        }
        filter
    }

    /// Filter without a block window, for pubsub subscriptions.
    pub(crate) fn to_subscription_filter(&self, address: Address, selectors: Vec<B256>) -> Filter {
        let mut filter = Filter::new().address(address).event_signature(selectors);
        if let Some(topic) = &self.topic1 {
            filter = filter.topic1(topic.clone());
        }
        if let Some(topic) = &self.topic2 {
            filter = filter.topic2(topic.clone());
        }
        if let Some(topic) = &self.topic3 {
            filter = filter.topic3(topic.clone());
        }
        filter
    }
}

fn non_empty(values: impl IntoIterator<Item = B256>) -> Option<Vec<B256>> {
    let values: Vec<B256> = values.into_iter().collect();
    (!values.is_empty()).then_some(values)
}

/// Topic encoding of an indexed `address` argument.
pub fn address_topic(address: &Address) -> B256 {
    address.into_word()
}

/// Topic encoding of an indexed `uint256` argument.
pub fn uint_topic(value: &U256) -> B256 {
    B256::from(*value)
}

/// Topic alternatives for an indexed `address` argument.
pub fn address_topics(values: &[Address]) -> Vec<B256> {
    values.iter().map(address_topic).collect()
}

/// Topic alternatives for an indexed `uint256` argument.
pub fn uint_topics(values: &[U256]) -> Vec<B256> {
    values.iter().map(uint_topic).collect()
}

/// Topic encoding of an indexed `bytes4` argument.
pub fn bytes4_topic(value: &alloy_primitives::FixedBytes<4>) -> B256 {
    let mut word = B256::ZERO;
    word[..4].copy_from_slice(value.as_slice());
    word
}

/// A decoded event together with the metadata of the log it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedEvent<E> {
    pub event: E,
    pub address: Address,
    pub block_number: Option<u64>,
    pub block_hash: Option<B256>,
    pub transaction_hash: Option<TxHash>,
    pub log_index: Option<u64>,
    /// Set when the log was dropped by a reorg.
    pub removed: bool,
}

impl<E> DecodedEvent<E> {
    pub(crate) fn new(event: E, log: &Log) -> Self {
        Self {
            event,
            address: log.address(),
            block_number: log.block_number,
            block_hash: log.block_hash,
            transaction_hash: log.transaction_hash,
            log_index: log.log_index,
            removed: log.removed,
        }
    }
}

/// Decode `log` as event `E`, checking `topic0` first.
pub fn decode_event<E: SolEvent>(log: &Log) -> Result<DecodedEvent<E>> {
    let topic0 = log.topic0().copied();
    if topic0 != Some(E::SIGNATURE_HASH) {
        return Err(TownsError::EventMismatch {
            expected: E::SIGNATURE_HASH,
            found: topic0,
        });
    }
    let event = E::decode_log_data(log.data())?;
    Ok(DecodedEvent::new(event, log))
}

fn decode_any<Ev: SolEventInterface>(log: &Log) -> Result<DecodedEvent<Ev>> {
    let event = Ev::decode_raw_log(log.topics(), &log.data().data)?;
    Ok(DecodedEvent::new(event, log))
}

/// Filterer facet bound to one contract address.
///
/// `Ev` is the contract's events enum, used by [`query_all`](Self::query_all).
pub struct EventFilterer<S, C, Ev> {
    address: Address,
    source: S,
    clock: C,
    config: EventPollingConfig,
    _events: PhantomData<fn() -> Ev>,
}

impl<S, C, Ev> std::fmt::Debug for EventFilterer<S, C, Ev> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventFilterer")
            .field("address", &self.address)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S, C, Ev> EventFilterer<S, C, Ev>
where
    S: LogSource,
    C: Clock,
{
    pub fn new(address: Address, source: S, clock: C) -> Self {
        Self {
            address,
            source,
            clock,
            config: EventPollingConfig::default(),
            _events: PhantomData,
        }
    }

    pub fn with_config(mut self, config: EventPollingConfig) -> Self {
        self.config = config;
        self
    }

    /// The contract address logs are filtered on.
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn config(&self) -> &EventPollingConfig {
        &self.config
    }

    /// Historical logs of event `E` matching `query`.
    ///
    /// A missing `from_block` starts at genesis; a missing `to_block` ends at
    /// the current head. Wide ranges are fetched in consecutive chunks of at
    /// most `max_block_range` blocks.
    pub async fn query<E: SolEvent>(&self, query: &EventQuery) -> Result<Vec<DecodedEvent<E>>> {
        let span = spans::query_events(
            &self.address,
            event_name::<E>(),
            query.from_block.unwrap_or(0),
            query.to_block,
        );
        async {
            let logs = self
                .fetch_logs(query, vec![E::SIGNATURE_HASH])
                .await
                .inspect_err(|e| spans::record_error(e))?;
            logs.iter().map(decode_event::<E>).collect()
        }
        .instrument(span)
        .await
    }

    /// Historical logs of every event in `Ev`, decoded into the enum.
    pub async fn query_all(&self, query: &EventQuery) -> Result<Vec<DecodedEvent<Ev>>>
    where
        Ev: ContractEvents,
    {
        let span = spans::query_events(
            &self.address,
            Ev::NAME,
            query.from_block.unwrap_or(0),
            query.to_block,
        );
        async {
            let selectors = Ev::selectors().iter().copied().map(B256::from).collect();
            let logs = self
                .fetch_logs(query, selectors)
                .await
                .inspect_err(|e| spans::record_error(e))?;
            logs.iter().map(decode_any::<Ev>).collect()
        }
        .instrument(span)
        .await
    }

    /// Decode a single log as event `E` emitted by this contract.
    pub fn parse_log<E: SolEvent>(&self, log: &Log) -> Result<DecodedEvent<E>> {
        if log.address() != self.address {
            return Err(TownsError::LogAddressMismatch {
                expected: self.address,
                found: log.address(),
            });
        }
        decode_event::<E>(log)
    }

    /// Stream of new `E` events, polled every `poll_interval`.
    ///
    /// Starts at `query.from_block` or, if unset, after the current head.
    /// Events are yielded in chain order. The stream ends after yielding an
    /// RPC or decoding error, or once `query.to_block` has been covered.
    /// Dropping the stream stops polling.
    pub fn watch<E: SolEvent + 'static>(
        &self,
        query: EventQuery,
    ) -> impl Stream<Item = Result<DecodedEvent<E>>> + '_ {
        debug!(
            contract_address = %self.address,
            event_name = event_name::<E>(),
            from_block = ?query.from_block,
            event = "event_watch_started"
        );

        let state = WatchState {
            next_block: query.from_block,
            query,
            buffer: VecDeque::new(),
            finished: false,
        };

        futures::stream::unfold(state, move |mut state| async move {
            loop {
                if let Some(event) = state.buffer.pop_front() {
                    return Some((Ok(event), state));
                }
                if state.finished {
                    return None;
                }

                match self.poll_once::<E>(&mut state).await {
                    Ok(PollOutcome::Advanced) => {}
                    Ok(PollOutcome::Idle) => self.clock.sleep(self.config.poll_interval).await,
                    Ok(PollOutcome::Exhausted) => state.finished = true,
                    Err(e) => {
                        warn!(
                            contract_address = %self.address,
                            error = %e,
                            event = "event_watch_failed"
                        );
                        state.finished = true;
                        state.buffer.clear();
                        return Some((Err(e), state));
                    }
                }
            }
        })
    }

    async fn poll_once<E: SolEvent>(&self, state: &mut WatchState<E>) -> Result<PollOutcome> {
        let head = self.source.get_block_number().await?;

        let from = match state.next_block {
            Some(block) => block,
            None => {
                state.next_block = Some(head + 1);
                return Ok(PollOutcome::Idle);
            }
        };

        if let Some(end) = state.query.to_block {
            if from > end {
                return Ok(PollOutcome::Exhausted);
            }
        }
        if from > head {
            trace!(from_block = from, head = head, "No new blocks");
            return Ok(PollOutcome::Idle);
        }

        let range = self.config.max_block_range.max(1);
        let mut to = head.min(from.saturating_add(range - 1));
        if let Some(end) = state.query.to_block {
            to = to.min(end);
        }

        let span = spans::watch_poll(&self.address, event_name::<E>(), from, head);
        let filter = state
            .query
            .to_filter(self.address, vec![E::SIGNATURE_HASH], from, to);
        let started = self.clock.now();
        let logs = self.source.get_logs(&filter).instrument(span).await?;
        for log in &logs {
            state.buffer.push_back(decode_event::<E>(log)?);
        }
        trace!(
            from_block = from,
            to_block = to,
            log_count = logs.len(),
            elapsed_ms = self.clock.now().duration_since(started).as_millis() as u64,
            "Watch window fetched"
        );

        state.next_block = Some(to + 1);
        Ok(PollOutcome::Advanced)
    }

    async fn fetch_logs(&self, query: &EventQuery, selectors: Vec<B256>) -> Result<Vec<Log>> {
        let from = query.from_block.unwrap_or(0);
        let to = match query.to_block {
            Some(block) => block,
            None => self.source.get_block_number().await?,
        };

        let mut logs = Vec::new();
        let mut chunks = 0usize;
        for (start, end) in block_chunks(from, to, self.config.max_block_range) {
            let filter = query.to_filter(self.address, selectors.clone(), start, end);
            let chunk = self.source.get_logs(&filter).await?;
            trace!(from_block = start, to_block = end, log_count = chunk.len(), "Fetched chunk");
            logs.extend(chunk);
            chunks += 1;
        }

        let span = tracing::Span::current();
        span.record("chunks", chunks);
        span.record("log_count", logs.len());
        debug!(
            contract_address = %self.address,
            from_block = from,
            to_block = to,
            chunks = chunks,
            log_count = logs.len(),
            event = "event_query_completed"
        );
        Ok(logs)
    }
}

impl<P, C, Ev> EventFilterer<AlloyLogSource<P>, C, Ev>
where
    P: Provider<Ethereum> + Send + Sync,
    C: Clock,
{
    /// Push-based stream of `E` events over `eth_subscribe`.
    ///
    /// Needs a WebSocket or IPC provider. Block bounds in `query` are
    /// ignored; topics apply. Logs that fail to decode are yielded as errors
    /// without ending the stream.
    pub async fn subscribe<E: SolEvent>(
        &self,
        query: &EventQuery,
    ) -> Result<impl Stream<Item = Result<DecodedEvent<E>>> + Unpin> {
        let span = spans::subscribe_events(&self.address, event_name::<E>());
        let filter = query.to_subscription_filter(self.address, vec![E::SIGNATURE_HASH]);
        let logs = self
            .source
            .subscribe_logs(&filter)
            .instrument(span)
            .await?;
        Ok(logs.map(|log| decode_event::<E>(&log)))
    }
}

enum PollOutcome {
    /// A block window was fetched.
    Advanced,
    /// Nothing new yet.
    Idle,
    /// `to_block` has been covered.
    Exhausted,
}

struct WatchState<E> {
    query: EventQuery,
    next_block: Option<u64>,
    buffer: VecDeque<DecodedEvent<E>>,
    finished: bool,
}

/// Splits `[from, to]` into consecutive inclusive windows of at most `size`
/// blocks.
pub(crate) fn block_chunks(from: u64, to: u64, size: u64) -> impl Iterator<Item = (u64, u64)> {
    let size = size.max(1);
    let mut next = (from <= to).then_some(from);
    std::iter::from_fn(move || {
        let start = next?;
        let end = start.saturating_add(size - 1).min(to);
        next = (end < to).then(|| end + 1);
        Some((start, end))
    })
}

fn event_name<E: SolEvent>() -> &'static str {
    E::SIGNATURE
        .split_once('(')
        .map(|(name, _)| name)
        .unwrap_or(E::SIGNATURE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use rstest::rstest;

    #[rstest]
    #[case(0, 0, 10, vec![(0, 0)])]
    #[case(0, 9, 10, vec![(0, 9)])]
    #[case(0, 10, 10, vec![(0, 9), (10, 10)])]
    #[case(5, 24, 10, vec![(5, 14), (15, 24)])]
    #[case(7, 3, 10, vec![])]
    #[case(1, 3, 1, vec![(1, 1), (2, 2), (3, 3)])]
    fn test_block_chunks(
        #[case] from: u64,
        #[case] to: u64,
        #[case] size: u64,
        #[case] expected: Vec<(u64, u64)>,
    ) {
        assert_eq!(block_chunks(from, to, size).collect::<Vec<_>>(), expected);
    }

    #[test]
    fn test_block_chunks_at_u64_max() {
        let chunks: Vec<_> = block_chunks(u64::MAX - 1, u64::MAX, 2000).collect();
        assert_eq!(chunks, vec![(u64::MAX - 1, u64::MAX)]);
    }

    #[test]
    fn test_topic_helpers() {
        let account = address!("00000000000000000000000000000000000000aa");
        assert_eq!(address_topic(&account).as_slice()[31], 0xaa);
        assert_eq!(address_topic(&account).as_slice()[..12], [0u8; 12]);

        assert_eq!(uint_topic(&U256::from(258)).as_slice()[30..], [1, 2]);

        let interface_id = alloy_primitives::FixedBytes::<4>::from([0xde, 0xad, 0xbe, 0xef]);
        let topic = bytes4_topic(&interface_id);
        assert_eq!(topic.as_slice()[..4], [0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(topic.as_slice()[4..], [0u8; 28]);
    }

    #[test]
    fn test_empty_topic_list_matches_everything() {
        let query = EventQuery::new().topic1(Vec::new()).topic2([B256::ZERO]);
        assert_eq!(query.topic1, None);
        assert_eq!(query.topic2, Some(vec![B256::ZERO]));
    }

    #[test]
    fn test_filter_carries_window_and_topics() {
        let contract = address!("0000000000000000000000000000000000000001");
        let query = EventQuery::new().topic3([B256::repeat_byte(3)]);
        let filter = query.to_filter(contract, vec![B256::repeat_byte(9)], 10, 20);

        assert_eq!(filter.get_from_block(), Some(10));
        assert_eq!(filter.get_to_block(), Some(20));
        assert!(filter.address.matches(&contract));
        assert!(filter.topics[0].matches(&B256::repeat_byte(9)));
        assert!(filter.topics[1].is_empty());
        assert!(filter.topics[3].matches(&B256::repeat_byte(3)));
        assert!(!filter.topics[3].matches(&B256::repeat_byte(4)));
    }
}
