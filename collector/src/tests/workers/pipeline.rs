use std::sync::Arc;

use assert_matches::assert_matches;
use rstest::rstest;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::core::client::auth::AuthError;
use crate::core::client::upstream::{MockUpstreamClient, RawResponse, UpstreamError};
use crate::core::config::RunMode;
use crate::core::error::FetchError;
use crate::error::CollectorError;
use crate::tests::common::{block_keys, fast_budget, loop_params, storage, window, FakeChain, InMemoryStorage};
use crate::types::checkpoint::LoopState;
use crate::types::keys::{unit_prefix, KeyPattern};
use crate::types::params::{CollectionParams, LoopParams, RateBudget};
use crate::types::work::{WorkKind, WorkUnit};
use crate::worker::checkpoint::CheckpointStore;
use crate::worker::fetcher::Fetcher;
use crate::worker::planner::plan;
use crate::worker::scanner::scan_completed;
use crate::worker::Pipeline;

/// Ten blocks (100..=109) and samples every fifth block (100, 105).
const TIP: u64 = 109;

fn pipeline(
    storage: &Arc<InMemoryStorage>,
    chain: &Arc<FakeChain>,
    budget: RateBudget,
    collection: CollectionParams,
    loop_params: LoopParams,
) -> Pipeline {
    let fetcher = Arc::new(Fetcher::new(chain.clone(), budget));
    Pipeline::new(storage.clone(), fetcher, collection, loop_params, json!({"lookback_days": 9}))
}

async fn resume_plan(storage: &Arc<InMemoryStorage>) -> Vec<WorkUnit> {
    let completed_blocks =
        scan_completed(storage.as_ref(), unit_prefix(WorkKind::Blocks), &KeyPattern::for_kind(WorkKind::Blocks))
            .await
            .unwrap();
    plan(WorkUnit(TIP), &window(9, 5), &completed_blocks, &Default::default()).blocks.units().to_vec()
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn full_run_collects_only_missing_units(
    storage: Arc<InMemoryStorage>,
    fast_budget: RateBudget,
    loop_params: LoopParams,
) {
    for height in [100, 104, 108] {
        storage.seed(&format!("blocks/height_{height}.json"), "{}");
    }
    let chain = Arc::new(FakeChain::new(TIP));
    assert_eq!(resume_plan(&storage).await.len(), 7);

    let summary = pipeline(&storage, &chain, fast_budget, window(9, 5), loop_params)
        .run(RunMode::Full, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.tip_height, Some(TIP));
    assert_eq!(summary.planned_range, Some((WorkUnit(100), WorkUnit(TIP))));
    assert!(!summary.interrupted);
    assert!(summary.snapshots.iter().all(|outcome| outcome.is_ok()));

    let [blocks, samples] = summary.backfills.as_slice() else {
        panic!("expected two backfills, got {:?}", summary.backfills);
    };
    assert_eq!((blocks.kind, blocks.state), (WorkKind::Blocks, LoopState::Completed));
    assert_eq!((blocks.completed, blocks.failed), (7, 0));
    assert_eq!((samples.kind, samples.completed), (WorkKind::FeeSamples, 2));

    assert_eq!(block_keys(&storage).len(), 10);
    assert_eq!(chain.requests_matching("block-height/"), 7 + 2);
    assert_eq!(
        storage.keys_with_prefix("fees/historical/"),
        vec!["fees/historical/height_100_fees.json", "fees/historical/height_105_fees.json"]
    );
    assert!(summary.ensure_not_aborted().is_ok());
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn second_run_has_nothing_left_to_collect(
    storage: Arc<InMemoryStorage>,
    fast_budget: RateBudget,
    loop_params: LoopParams,
) {
    let chain = Arc::new(FakeChain::new(TIP));
    let pipeline = pipeline(&storage, &chain, fast_budget, window(9, 5), loop_params);

    pipeline.run(RunMode::Full, &CancellationToken::new()).await.unwrap();
    let stored_after_first = block_keys(&storage);
    let hash_lookups_after_first = chain.requests_matching("block-height/");

    let summary = pipeline.run(RunMode::Full, &CancellationToken::new()).await.unwrap();

    assert!(summary.backfills.iter().all(|run| run.total == 0 && run.state == LoopState::Completed));
    assert_eq!(block_keys(&storage), stored_after_first);
    assert_eq!(chain.requests_matching("block-height/"), hash_lookups_after_first);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn interrupted_run_resumes_where_it_stopped(
    storage: Arc<InMemoryStorage>,
    fast_budget: RateBudget,
    loop_params: LoopParams,
) {
    let chain = Arc::new(FakeChain::new(TIP));
    let pipeline = pipeline(&storage, &chain, fast_budget, window(9, 5), loop_params);
    let token = CancellationToken::new();
    storage.cancel_after_puts("blocks/", 2, token.clone());

    let summary = pipeline.run(RunMode::Full, &token).await.unwrap();

    assert!(summary.interrupted);
    assert_eq!(summary.backfills.len(), 1, "samples must not start after shutdown");
    assert_eq!(summary.backfills[0].state, LoopState::Interrupted);
    assert_eq!(block_keys(&storage), vec!["blocks/height_100.json", "blocks/height_101.json"]);
    assert!(summary.ensure_not_aborted().is_ok());

    let checkpoint = CheckpointStore::new(storage.clone()).latest(WorkKind::Blocks).await.unwrap().unwrap();
    assert_eq!(checkpoint.state, LoopState::Interrupted);
    assert_eq!(checkpoint.completed_count, 2);
    assert_eq!(checkpoint.last_completed_unit, Some(WorkUnit(101)));
    assert!(checkpoint.shutdown_flag);
    assert!(!checkpoint.completed_gracefully);

    let remaining = resume_plan(&storage).await;
    assert_eq!(remaining, (102..=TIP).map(WorkUnit).collect::<Vec<_>>());

    let summary = pipeline.run(RunMode::Full, &CancellationToken::new()).await.unwrap();

    assert_eq!(summary.backfills[0].completed, 8);
    assert_eq!(block_keys(&storage).len(), 10);
    // Two blocks, then the other eight, then both samples. Nothing fetched twice.
    assert_eq!(chain.requests_matching("block-height/"), 2 + 8 + 2);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn aborted_backfill_fails_the_invocation(storage: Arc<InMemoryStorage>, fast_budget: RateBudget) {
    let chain = Arc::new(FakeChain::new(TIP));
    for height in 100..=TIP {
        chain.make_unavailable(height);
    }
    let params = LoopParams { max_failures: 2, ..loop_params::default() };

    let summary = pipeline(&storage, &chain, fast_budget, window(9, 5), params)
        .run(RunMode::Full, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.backfills[0].state, LoopState::Aborted);
    assert_eq!(summary.backfills[0].failed, 3);
    assert!(block_keys(&storage).is_empty());
    assert_matches!(summary.ensure_not_aborted(), Err(CollectorError::Aborted { kind: WorkKind::Blocks, failed: 3 }));
    assert_eq!(storage.keys_with_prefix("metadata/").len(), 1);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn current_only_takes_snapshots_without_backfill(
    storage: Arc<InMemoryStorage>,
    fast_budget: RateBudget,
    loop_params: LoopParams,
) {
    let chain = Arc::new(FakeChain::new(TIP));

    let summary = pipeline(&storage, &chain, fast_budget, window(9, 5), loop_params)
        .run(RunMode::CurrentOnly, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(chain.requests(), vec!["mempool", "fee-estimates"]);
    assert!(summary.backfills.is_empty());
    assert_eq!(summary.tip_height, None);
    assert!(block_keys(&storage).is_empty());

    let mempool = storage.keys_with_prefix("mempool/");
    assert_eq!(mempool.len(), 1);
    assert_eq!(storage.json(&mempool[0])["data"]["count"], json!(4200));
    assert_eq!(storage.keys_with_prefix("fees/current/").len(), 1);

    let summary_keys = storage.keys_with_prefix("metadata/collection_summary_");
    assert_eq!(summary_keys.len(), 1);
    let stored = storage.json(&summary_keys[0]);
    assert_eq!(stored["mode"], json!("current_only"));
    assert_eq!(stored["settings"], json!({"lookback_days": 9}));
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn tip_failure_is_an_error_but_summary_is_written(
    storage: Arc<InMemoryStorage>,
    fast_budget: RateBudget,
    loop_params: LoopParams,
) {
    let mut upstream = MockUpstreamClient::new();
    upstream.expect_get().returning(|_| {
        Ok(RawResponse { status: 503, content_type: None, retry_after: None, body: "maintenance".to_string() })
    });
    let fetcher = Arc::new(Fetcher::new(Arc::new(upstream), fast_budget));
    let pipeline = Pipeline::new(storage.clone(), fetcher, window(9, 5), loop_params, json!({}));

    let result = pipeline.run(RunMode::Full, &CancellationToken::new()).await;

    assert_matches!(result, Err(CollectorError::FetchError(_)));
    let summary_keys = storage.keys_with_prefix("metadata/");
    assert_eq!(summary_keys.len(), 1);
    let stored = storage.json(&summary_keys[0]);
    assert_eq!(stored["tip_height"], json!(null));
    assert_eq!(stored["snapshots"][0]["key"], json!(null));
    assert!(storage.keys_with_prefix("mempool/").is_empty());
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn rejected_credentials_during_snapshots_stop_the_run(
    storage: Arc<InMemoryStorage>,
    fast_budget: RateBudget,
    loop_params: LoopParams,
) {
    let mut upstream = MockUpstreamClient::new();
    upstream.expect_get().times(1).returning(|_| {
        Err(UpstreamError::Auth(AuthError::Rejected { status: 401, body: "invalid_client".into() }))
    });
    let fetcher = Arc::new(Fetcher::new(Arc::new(upstream), fast_budget));
    let pipeline = Pipeline::new(storage.clone(), fetcher, window(9, 5), loop_params, json!({}));

    let result = pipeline.run(RunMode::Full, &CancellationToken::new()).await;

    assert_matches!(result, Err(CollectorError::FetchError(FetchError::Auth(_))));
    let summary_keys = storage.keys_with_prefix("metadata/");
    assert_eq!(summary_keys.len(), 1);
    let stored = storage.json(&summary_keys[0]);
    assert_eq!(stored["snapshots"].as_array().map(Vec::len), Some(1));
    assert_eq!(stored["snapshots"][0]["name"], json!("mempool"));
    assert_eq!(stored["backfills"], json!([]));
    assert!(storage.keys_with_prefix("fees/current/").is_empty());
}
