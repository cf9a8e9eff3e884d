//! Integration tests for event filtering using fake implementations
//!
//! Queries and watch streams run against a scripted chain, so chunking,
//! polling and failure handling can be checked without a node.

use alloy_primitives::{address, Address, B256, U256};
use alloy_provider::ProviderBuilder;
use futures::StreamExt;
use std::time::Duration;
use towns_bindings::contracts::channels::IChannels::{self, IChannelsEvents};
use towns_bindings::contracts::membership::IMembership;
use towns_bindings::testing::{log_for, FakeClock, FakeLogSource};
use towns_bindings::{ChannelsContract, EventFilterer, EventPollingConfig, EventQuery, TownsError};

const SPACE: Address = address!("00000000000000000000000000000000000000aa");
const ALICE: Address = address!("00000000000000000000000000000000000000a1");
const BOB: Address = address!("00000000000000000000000000000000000000b0");

type ChannelsFilterer = EventFilterer<FakeLogSource, FakeClock, IChannelsEvents>;

/// Helper function to create a filterer over fake providers
fn create_test_filterer(
    source: FakeLogSource,
    clock: FakeClock,
    max_block_range: u64,
) -> ChannelsFilterer {
    EventFilterer::new(SPACE, source, clock).with_config(
        EventPollingConfig::default()
            .with_poll_interval(Duration::from_secs(2))
            .with_max_block_range(max_block_range),
    )
}

fn channel_created(caller: Address, id: u8) -> IChannels::ChannelCreated {
    IChannels::ChannelCreated {
        caller,
        channelId: B256::with_last_byte(id),
    }
}

#[tokio::test]
async fn test_query_splits_wide_ranges_into_chunks() {
    let source = FakeLogSource::with_head(5_000);
    source.add_log(log_for(SPACE, &channel_created(ALICE, 1), 10, 0));
    source.add_log(log_for(SPACE, &channel_created(ALICE, 2), 1_500, 0));
    source.add_log(log_for(SPACE, &channel_created(BOB, 3), 2_499, 4));
    source.add_log(log_for(SPACE, &channel_created(BOB, 4), 2_500, 0));

    let filterer = create_test_filterer(source.clone(), FakeClock::new(), 1_000);
    let events = filterer
        .query::<IChannels::ChannelCreated>(&EventQuery::new().from_block(0).to_block(2_499))
        .await
        .unwrap();

    let ids: Vec<u8> = events.iter().map(|e| e.event.channelId[31]).collect();
    assert_eq!(ids, vec![1, 2, 3], "Events must come back in chain order");

    insta::assert_snapshot!(
        format!("{:?}", source.requested_ranges()),
        @"[(0, 999), (1000, 1999), (2000, 2499)]"
    );
}

#[tokio::test]
async fn test_query_without_upper_bound_ends_at_head() {
    let source = FakeLogSource::with_head(120);
    source.add_log(log_for(SPACE, &channel_created(ALICE, 1), 100, 0));
    source.add_log(log_for(SPACE, &channel_created(ALICE, 2), 121, 0));

    let filterer = create_test_filterer(source.clone(), FakeClock::new(), 2_000);
    let events = filterer
        .query::<IChannels::ChannelCreated>(&EventQuery::new().from_block(50))
        .await
        .unwrap();

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].block_number, Some(100));
    assert_eq!(source.requested_ranges(), vec![(50, 120)]);
}

#[tokio::test]
async fn test_query_applies_indexed_topic_filters() {
    let source = FakeLogSource::with_head(100);
    source.add_log(log_for(SPACE, &channel_created(ALICE, 1), 10, 0));
    source.add_log(log_for(SPACE, &channel_created(BOB, 2), 11, 0));
    source.add_log(log_for(SPACE, &channel_created(ALICE, 3), 12, 0));

    // Query helpers only build filters, so an unreachable endpoint is fine.
    let provider = ProviderBuilder::new().connect_http("http://localhost:8545".parse().unwrap());
    let channels = ChannelsContract::new(SPACE, provider);
    let query = channels.channel_created_query(&[BOB]).from_block(0);

    let filterer = create_test_filterer(source, FakeClock::new(), 2_000);
    let events = filterer
        .query::<IChannels::ChannelCreated>(&query)
        .await
        .unwrap();

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event.caller, BOB);
}

#[tokio::test]
async fn test_query_all_decodes_only_contract_events() {
    let source = FakeLogSource::with_head(100);
    source.add_log(log_for(SPACE, &channel_created(ALICE, 1), 10, 0));
    source.add_log(log_for(
        SPACE,
        &IChannels::ChannelRoleAdded {
            caller: ALICE,
            channelId: B256::with_last_byte(1),
            roleId: U256::from(7),
        },
        10,
        1,
    ));
    // Another facet of the same diamond.
    source.add_log(log_for(
        SPACE,
        &IMembership::MembershipTokenIssued {
            recipient: BOB,
            tokenId: U256::from(1),
        },
        11,
        0,
    ));

    let filterer = create_test_filterer(source, FakeClock::new(), 2_000);
    let events = filterer
        .query_all(&EventQuery::new().from_block(0))
        .await
        .unwrap();

    assert_eq!(events.len(), 2);
    assert!(matches!(events[0].event, IChannelsEvents::ChannelCreated(_)));
    assert!(matches!(
        &events[1].event,
        IChannelsEvents::ChannelRoleAdded(added) if added.roleId == U256::from(7)
    ));
}

#[tokio::test]
async fn test_query_propagates_rpc_failure() {
    let source = FakeLogSource::with_head(100);
    source.fail_get_logs_after(0);

    let filterer = create_test_filterer(source, FakeClock::new(), 2_000);
    let result = filterer
        .query::<IChannels::ChannelCreated>(&EventQuery::new())
        .await;

    assert!(
        matches!(result.unwrap_err(), TownsError::Provider(_)),
        "Expected the simulated RPC error"
    );
}

#[tokio::test]
async fn test_parse_log_rejects_foreign_logs() {
    let other = address!("00000000000000000000000000000000000000bb");
    let filterer = create_test_filterer(FakeLogSource::new(), FakeClock::new(), 2_000);

    let foreign = log_for(other, &channel_created(ALICE, 1), 1, 0);
    assert!(matches!(
        filterer.parse_log::<IChannels::ChannelCreated>(&foreign),
        Err(TownsError::LogAddressMismatch { expected, found }) if expected == SPACE && found == other
    ));

    let wrong_event = log_for(SPACE, &channel_created(ALICE, 1), 1, 0);
    assert!(matches!(
        filterer.parse_log::<IChannels::ChannelRemoved>(&wrong_event),
        Err(TownsError::EventMismatch { .. })
    ));

    let parsed = filterer
        .parse_log::<IChannels::ChannelCreated>(&wrong_event)
        .unwrap();
    assert_eq!(parsed.event.caller, ALICE);
    assert_eq!(parsed.address, SPACE);
}

#[tokio::test]
async fn test_watch_bounded_range_ends_stream() {
    let source = FakeLogSource::with_head(20);
    source.add_log(log_for(SPACE, &channel_created(ALICE, 1), 3, 0));
    source.add_log(log_for(SPACE, &channel_created(ALICE, 2), 7, 0));
    source.add_log(log_for(SPACE, &channel_created(ALICE, 3), 12, 0));

    let clock = FakeClock::new();
    let filterer = create_test_filterer(source, clock.clone(), 2_000);
    let events: Vec<_> = filterer
        .watch::<IChannels::ChannelCreated>(EventQuery::new().from_block(1).to_block(10))
        .collect()
        .await;

    let blocks: Vec<_> = events
        .into_iter()
        .map(|e| e.unwrap().block_number)
        .collect();
    assert_eq!(blocks, vec![Some(3), Some(7)]);
    assert_eq!(clock.sleep_count(), 0, "A covered range needs no polling delay");
}

#[tokio::test]
async fn test_watch_starts_after_head_and_waits_for_new_blocks() {
    let source = FakeLogSource::new();
    source.schedule_heads([5, 5, 8]);
    source.add_log(log_for(SPACE, &channel_created(ALICE, 1), 4, 0));
    source.add_log(log_for(SPACE, &channel_created(BOB, 2), 7, 0));

    let clock = FakeClock::new();
    let filterer = create_test_filterer(source.clone(), clock.clone(), 2_000);
    let mut stream = std::pin::pin!(filterer.watch::<IChannels::ChannelCreated>(EventQuery::new()));
    let first = stream
        .next()
        .await
        .expect("stream should yield")
        .unwrap();

    assert_eq!(first.event.caller, BOB, "Logs before the start head are skipped");
    assert_eq!(first.block_number, Some(7));
    assert_eq!(clock.sleep_count(), 2);
    assert_eq!(clock.total_sleep_time(), Duration::from_secs(4));
    assert_eq!(source.requested_ranges(), vec![(6, 8)]);
}

#[tokio::test]
async fn test_watch_yields_error_once_then_ends() {
    let source = FakeLogSource::with_head(20);
    source.add_log(log_for(SPACE, &channel_created(ALICE, 1), 2, 0));
    source.add_log(log_for(SPACE, &channel_created(ALICE, 2), 8, 0));
    source.fail_get_logs_after(1);

    let filterer = create_test_filterer(source, FakeClock::new(), 5);
    let results: Vec<_> = filterer
        .watch::<IChannels::ChannelCreated>(EventQuery::new().from_block(0))
        .collect()
        .await;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].as_ref().unwrap().block_number, Some(2));
    assert!(matches!(results[1], Err(TownsError::Provider(_))));
}

#[tokio::test]
async fn test_watch_head_failure_ends_stream() {
    let source = FakeLogSource::with_head(20);
    source.fail_block_number();

    let filterer = create_test_filterer(source.clone(), FakeClock::new(), 2_000);
    let results: Vec<_> = filterer
        .watch::<IChannels::ChannelCreated>(EventQuery::new())
        .collect()
        .await;

    assert_eq!(results.len(), 1);
    assert!(results[0].is_err());
    assert_eq!(source.get_logs_count(), 0);
}

#[tokio::test]
async fn test_watch_and_query_agree_on_zero_block_range() {
    let source = FakeLogSource::with_head(10);
    source.add_log(log_for(SPACE, &channel_created(ALICE, 1), 2, 0));
    source.add_log(log_for(SPACE, &channel_created(BOB, 2), 5, 0));

    // Bypasses the builder clamp on purpose.
    let config = EventPollingConfig {
        poll_interval: Duration::from_secs(1),
        max_block_range: 0,
    };
    let filterer: ChannelsFilterer =
        EventFilterer::new(SPACE, source.clone(), FakeClock::new()).with_config(config);
    let query = EventQuery::new().from_block(0).to_block(5);

    let queried = filterer
        .query::<IChannels::ChannelCreated>(&query)
        .await
        .unwrap();
    let watched: Vec<_> = filterer
        .watch::<IChannels::ChannelCreated>(query)
        .collect()
        .await;

    assert_eq!(queried.len(), 2);
    let watched_blocks: Vec<_> = watched
        .into_iter()
        .map(|e| e.unwrap().block_number)
        .collect();
    assert_eq!(watched_blocks, vec![Some(2), Some(5)]);
    // Both paths fall back to single-block windows: six for the query, six for the watch.
    assert_eq!(source.get_logs_count(), 12);
}
