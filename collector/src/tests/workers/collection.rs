use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use chrono::Utc;
use rstest::rstest;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::core::client::auth::AuthError;
use crate::core::error::FetchError;
use crate::error::CollectorError;
use crate::tests::common::{block_keys, fast_budget, loop_params, storage, FakeChain, InMemoryStorage};
use crate::types::checkpoint::{Checkpoint, LoopState};
use crate::types::params::{LoopParams, RateBudget};
use crate::types::record::CollectionRecord;
use crate::types::work::{WorkKind, WorkSet, WorkUnit};
use crate::worker::checkpoint::CheckpointStore;
use crate::worker::collection::CollectionLoop;
use crate::worker::fetcher::{FetchOutcome, Fetcher};
use crate::worker::unit::{BlockCollector, FeeSampleCollector, MockUnitCollector};

fn work(kind: WorkKind, heights: impl IntoIterator<Item = u64>) -> WorkSet {
    WorkSet::new(kind, heights.into_iter().map(WorkUnit).collect::<BTreeSet<_>>())
}

fn record(unit: WorkUnit) -> CollectionRecord {
    CollectionRecord {
        work_unit_id: unit,
        kind: WorkKind::Blocks,
        derived_subkeys: BTreeMap::new(),
        collected_at: Utc::now(),
        raw_payload: json!({"height": unit.height()}),
    }
}

fn collection_loop(storage: &Arc<InMemoryStorage>, params: LoopParams) -> (CollectionLoop, Arc<CheckpointStore>) {
    let checkpoints = Arc::new(CheckpointStore::new(storage.clone()));
    (CollectionLoop::new(storage.clone(), Arc::clone(&checkpoints), params), checkpoints)
}

fn block_collector(chain: Arc<FakeChain>, budget: RateBudget) -> BlockCollector {
    BlockCollector::new(Arc::new(Fetcher::new(chain, budget)))
}

fn checkpoints(storage: &InMemoryStorage, kind: WorkKind) -> Vec<Checkpoint> {
    storage
        .keys_with_prefix(&format!("checkpoints/{}_checkpoint_", kind.as_str()))
        .iter()
        .map(|key| serde_json::from_value(storage.json(key)).unwrap())
        .collect()
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn stores_one_object_per_unit_and_checkpoints_completion(
    storage: Arc<InMemoryStorage>,
    fast_budget: RateBudget,
    loop_params: LoopParams,
) {
    let chain = Arc::new(FakeChain::new(109));
    let (collection, _) = collection_loop(&storage, loop_params);
    let token = CancellationToken::new();

    let blocks = work(WorkKind::Blocks, [101, 102, 103, 105, 106, 107, 109]);
    let summary = collection.run(&block_collector(chain.clone(), fast_budget), &blocks, &token).await.unwrap();

    assert_eq!(summary.state, LoopState::Completed);
    assert_eq!((summary.completed, summary.failed, summary.remaining), (7, 0, 0));
    assert_eq!(summary.last_completed_unit, Some(WorkUnit(109)));
    assert_eq!(block_keys(&storage).len(), 7);
    assert_eq!(chain.requests_matching("block-height/"), 7);

    let stored = storage.json("blocks/height_105.json");
    assert_eq!(stored["work_unit_id"], json!(105));
    assert_eq!(stored["derived_subkeys"]["block_hash"], json!(FakeChain::hash_of(105)));
    assert_eq!(stored["raw_payload"]["height"], json!(105));

    let written = checkpoints(&storage, WorkKind::Blocks);
    assert_eq!(written.len(), 1);
    let last = &written[0];
    assert_eq!(last.state, LoopState::Completed);
    assert_eq!((last.completed_count, last.failed_count, last.remaining_count), (7, 0, 0));
    assert!(last.completed_gracefully);
    assert!(!last.shutdown_flag);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn fee_samples_store_stats_and_transactions(
    storage: Arc<InMemoryStorage>,
    fast_budget: RateBudget,
    loop_params: LoopParams,
) {
    let chain = Arc::new(FakeChain::new(120));
    let (collection, _) = collection_loop(&storage, loop_params);
    let samples = FeeSampleCollector::new(Arc::new(Fetcher::new(chain.clone(), fast_budget)));

    let units = work(WorkKind::FeeSamples, [100, 110, 120]);
    let summary = collection.run(&samples, &units, &CancellationToken::new()).await.unwrap();

    assert_eq!(summary.completed, 3);
    assert_eq!(
        storage.keys_with_prefix("fees/historical/"),
        vec![
            "fees/historical/height_100_fees.json",
            "fees/historical/height_110_fees.json",
            "fees/historical/height_120_fees.json"
        ]
    );
    let stored = storage.json("fees/historical/height_110_fees.json");
    assert_eq!(stored["kind"], json!("fee_samples"));
    assert_eq!(stored["raw_payload"]["fee_stats"]["tx_count"], json!(2));
    assert_eq!(stored["raw_payload"]["fee_stats"]["fee_max"], json!(2000));
    assert_eq!(chain.requests_matching("block/"), 6);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn empty_work_set_completes_immediately(storage: Arc<InMemoryStorage>, loop_params: LoopParams) {
    let (collection, checkpoint_store) = collection_loop(&storage, loop_params);
    let collector = MockUnitCollector::new();

    let summary = collection.run(&collector, &work(WorkKind::Blocks, []), &CancellationToken::new()).await.unwrap();

    assert_eq!(summary.state, LoopState::Completed);
    assert_eq!(summary.total, 0);
    let latest = checkpoint_store.latest(WorkKind::Blocks).await.unwrap().unwrap();
    assert_eq!(latest.state, LoopState::Completed);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn checkpoints_every_n_processed_units(storage: Arc<InMemoryStorage>) {
    let params = LoopParams { checkpoint_every: 3, batch_size: 100, ..loop_params::default() };
    let (collection, _) = collection_loop(&storage, params);
    let mut collector = MockUnitCollector::new();
    collector.expect_collect().returning(|unit, _| Ok(FetchOutcome::Data(record(unit))));

    collection.run(&collector, &work(WorkKind::Blocks, 1..=10), &CancellationToken::new()).await.unwrap();

    let written = checkpoints(&storage, WorkKind::Blocks);
    let counts: Vec<_> = written.iter().map(|c| (c.state, c.completed_count)).collect();
    assert_eq!(
        counts,
        vec![
            (LoopState::Running, 3),
            (LoopState::Running, 6),
            (LoopState::Running, 9),
            (LoopState::Completed, 10)
        ]
    );
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn pauses_between_batches(storage: Arc<InMemoryStorage>) {
    let params = LoopParams { batch_size: 2, batch_pause: Duration::from_secs(5), ..loop_params::default() };
    let (collection, _) = collection_loop(&storage, params);
    let mut collector = MockUnitCollector::new();
    collector.expect_collect().returning(|unit, _| Ok(FetchOutcome::Data(record(unit))));

    let started = tokio::time::Instant::now();
    collection.run(&collector, &work(WorkKind::Blocks, 1..=5), &CancellationToken::new()).await.unwrap();

    // Pauses after units 2 and 4, none after the last one.
    assert_eq!(started.elapsed(), Duration::from_secs(10));
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn failed_units_are_counted_and_skipped(storage: Arc<InMemoryStorage>, loop_params: LoopParams) {
    let (collection, _) = collection_loop(&storage, loop_params);
    let mut collector = MockUnitCollector::new();
    collector.expect_collect().returning(|unit, _| {
        if unit.height() % 3 == 0 {
            Err(FetchError::NonRetryable { endpoint: format!("block-height/{unit}"), status: 404, body: String::new() })
        } else {
            Ok(FetchOutcome::Data(record(unit)))
        }
    });

    let summary = collection.run(&collector, &work(WorkKind::Blocks, 1..=7), &CancellationToken::new()).await.unwrap();

    assert_eq!(summary.state, LoopState::Completed);
    assert_eq!((summary.completed, summary.failed), (5, 2));
    assert_eq!(summary.failures.iter().map(|(unit, _)| *unit).collect::<Vec<_>>(), vec![WorkUnit(3), WorkUnit(6)]);
    assert_eq!(summary.last_completed_unit, Some(WorkUnit(2)));

    let last = checkpoints(&storage, WorkKind::Blocks).pop().unwrap();
    assert_eq!(last.failed_units, vec![WorkUnit(3), WorkUnit(6)]);
    assert_eq!(last.last_completed_unit, Some(WorkUnit(2)));
    assert!(last.completed_gracefully);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn failure_on_first_unit_leaves_no_low_water_mark(storage: Arc<InMemoryStorage>, loop_params: LoopParams) {
    let (collection, _) = collection_loop(&storage, loop_params);
    let mut collector = MockUnitCollector::new();
    collector.expect_collect().returning(|unit, _| {
        if unit == WorkUnit(1) {
            Err(FetchError::NonRetryable { endpoint: "block-height/1".into(), status: 404, body: String::new() })
        } else {
            Ok(FetchOutcome::Data(record(unit)))
        }
    });

    let summary = collection.run(&collector, &work(WorkKind::Blocks, 1..=4), &CancellationToken::new()).await.unwrap();

    assert_eq!((summary.completed, summary.failed), (3, 1));
    assert_eq!(summary.last_completed_unit, None);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn failed_put_leaves_unit_incomplete(
    storage: Arc<InMemoryStorage>,
    fast_budget: RateBudget,
    loop_params: LoopParams,
) {
    storage.fail_puts_for("blocks/height_102.json");
    let (collection, _) = collection_loop(&storage, loop_params);

    let collector = block_collector(Arc::new(FakeChain::new(110)), fast_budget);
    let blocks = work(WorkKind::Blocks, 101..=103);
    let summary = collection.run(&collector, &blocks, &CancellationToken::new()).await.unwrap();

    assert_eq!((summary.completed, summary.failed), (2, 1));
    assert_eq!(block_keys(&storage), vec!["blocks/height_101.json", "blocks/height_103.json"]);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn exhausted_retries_fail_only_that_unit(
    storage: Arc<InMemoryStorage>,
    fast_budget: RateBudget,
    loop_params: LoopParams,
) {
    let chain = Arc::new(FakeChain::new(110));
    chain.make_unavailable(102);
    let (collection, _) = collection_loop(&storage, loop_params);

    let collector = block_collector(chain.clone(), fast_budget.clone());
    let blocks = work(WorkKind::Blocks, 101..=103);
    let summary = collection.run(&collector, &blocks, &CancellationToken::new()).await.unwrap();

    assert_eq!((summary.completed, summary.failed), (2, 1));
    assert_matches!(summary.failures.as_slice(), [(WorkUnit(102), cause)] if cause.contains("giving up"));
    assert_eq!(chain.requests_matching("block-height/102"), fast_budget.max_retries as usize);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn aborts_once_failures_exceed_ceiling(storage: Arc<InMemoryStorage>) {
    let params = LoopParams { max_failures: 2, ..loop_params::default() };
    let (collection, _) = collection_loop(&storage, params);
    let mut collector = MockUnitCollector::new();
    collector.expect_collect().times(3).returning(|unit, _| {
        Err(FetchError::RetriesExhausted {
            endpoint: format!("block-height/{unit}"),
            attempts: 3,
            last_cause: "503".into(),
        })
    });

    let summary = collection.run(&collector, &work(WorkKind::Blocks, 1..=10), &CancellationToken::new()).await.unwrap();

    assert_eq!(summary.state, LoopState::Aborted);
    assert_eq!((summary.completed, summary.failed, summary.remaining), (0, 3, 7));
    let last = checkpoints(&storage, WorkKind::Blocks).pop().unwrap();
    assert_eq!(last.state, LoopState::Aborted);
    assert!(!last.completed_gracefully);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn auth_failure_stops_the_loop_with_an_error(storage: Arc<InMemoryStorage>, loop_params: LoopParams) {
    let (collection, _) = collection_loop(&storage, loop_params);
    let mut collector = MockUnitCollector::new();
    collector.expect_collect().times(2).returning(|unit, _| {
        if unit == WorkUnit(1) {
            Ok(FetchOutcome::Data(record(unit)))
        } else {
            Err(FetchError::Auth(AuthError::Rejected { status: 401, body: "invalid_client".into() }))
        }
    });

    let result = collection.run(&collector, &work(WorkKind::Blocks, 1..=5), &CancellationToken::new()).await;

    assert_matches!(result, Err(CollectorError::FetchError(FetchError::Auth(_))));
    let last = checkpoints(&storage, WorkKind::Blocks).pop().unwrap();
    assert_eq!(last.state, LoopState::Aborted);
    assert_eq!((last.completed_count, last.failed_count), (1, 1));
    assert_eq!(block_keys(&storage), vec!["blocks/height_1.json"]);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn shutdown_before_start_processes_nothing(storage: Arc<InMemoryStorage>, loop_params: LoopParams) {
    let (collection, _) = collection_loop(&storage, loop_params);
    let collector = MockUnitCollector::new();
    let token = CancellationToken::new();
    token.cancel();

    let summary = collection.run(&collector, &work(WorkKind::Blocks, 1..=3), &token).await.unwrap();

    assert_eq!(summary.state, LoopState::Interrupted);
    assert_eq!((summary.completed, summary.remaining), (0, 3));
    let last = checkpoints(&storage, WorkKind::Blocks).pop().unwrap();
    assert!(last.shutdown_flag);
    assert!(!last.completed_gracefully);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn shutdown_during_batch_pause_interrupts(storage: Arc<InMemoryStorage>) {
    let params = LoopParams { batch_size: 2, batch_pause: Duration::from_secs(300), ..loop_params::default() };
    let (collection, _) = collection_loop(&storage, params);
    let mut collector = MockUnitCollector::new();
    collector.expect_collect().times(2).returning(|unit, _| Ok(FetchOutcome::Data(record(unit))));
    let token = CancellationToken::new();

    let canceller = {
        let token = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(10)).await;
            token.cancel();
        })
    };
    let started = tokio::time::Instant::now();
    let summary = collection.run(&collector, &work(WorkKind::Blocks, 1..=6), &token).await.unwrap();
    canceller.await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(300));
    assert_eq!(summary.state, LoopState::Interrupted);
    assert_eq!((summary.completed, summary.remaining), (2, 4));
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn cancelled_fetch_writes_no_record(storage: Arc<InMemoryStorage>, loop_params: LoopParams) {
    let (collection, _) = collection_loop(&storage, loop_params);
    let mut collector = MockUnitCollector::new();
    collector.expect_collect().returning(|unit, _| {
        if unit == WorkUnit(3) {
            Ok(FetchOutcome::Cancelled)
        } else {
            Ok(FetchOutcome::Data(record(unit)))
        }
    });

    let summary = collection.run(&collector, &work(WorkKind::Blocks, 1..=5), &CancellationToken::new()).await.unwrap();

    assert_eq!(summary.state, LoopState::Interrupted);
    assert_eq!(summary.last_completed_unit, Some(WorkUnit(2)));
    assert_eq!(block_keys(&storage), vec!["blocks/height_1.json", "blocks/height_2.json"]);
}
