
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use rstest::fixture;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

pub use chain::FakeChain;

use crate::core::client::storage::{StorageClient, StorageError};
use crate::types::params::{CollectionParams, LoopParams, RateBudget};
use crate::types::work::WorkUnit;

/// Cancel `token` once `count` objects were stored under `prefix`.
struct CancelAfter {
    prefix: String,
    count: usize,
    token: CancellationToken,
}

/// Object store kept in memory. Puts are atomic: an object is either fully
/// present or absent.
#[derive(Default)]
pub struct InMemoryStorage {
    objects: Mutex<BTreeMap<String, Bytes>>,
    failing_keys: Mutex<BTreeSet<String>>,
    cancel_after: Mutex<Option<CancelAfter>>,
    puts: AtomicUsize,
}

impl InMemoryStorage {
    pub fn seed(&self, key: &str, data: &str) {
        self.objects.lock().unwrap().insert(key.to_string(), Bytes::from(data.to_string()));
    }

    pub fn fail_puts_for(&self, key: &str) {
        self.failing_keys.lock().unwrap().insert(key.to_string());
    }

    pub fn cancel_after_puts(&self, prefix: &str, count: usize, token: CancellationToken) {
        *self.cancel_after.lock().unwrap() = Some(CancelAfter { prefix: prefix.to_string(), count, token });
    }

    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.objects.lock().unwrap().keys().filter(|key| key.starts_with(prefix)).cloned().collect()
    }

    pub fn json(&self, key: &str) -> Value {
        let objects = self.objects.lock().unwrap();
        let data = objects.get(key).unwrap_or_else(|| panic!("no object at {key}"));
        serde_json::from_slice(data).unwrap()
    }

    /// Successful puts since creation.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StorageClient for InMemoryStorage {
    async fn get_data(&self, key: &str) -> Result<Bytes, StorageError> {
        self.objects.lock().unwrap().get(key).cloned().ok_or_else(|| StorageError::ObjectNotFound(key.to_string()))
    }

    async fn put_data(&self, data: Bytes, key: &str) -> Result<(), StorageError> {
        if self.failing_keys.lock().unwrap().contains(key) {
            return Err(StorageError::ObjectStreamError(format!("injected failure for {key}")));
        }
        self.objects.lock().unwrap().insert(key.to_string(), data);
        self.puts.fetch_add(1, Ordering::SeqCst);

        if let Some(cancel) = self.cancel_after.lock().unwrap().as_ref() {
            if self.keys_with_prefix(&cancel.prefix).len() >= cancel.count {
                cancel.token.cancel();
            }
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.objects.lock().unwrap().contains_key(key))
    }

    fn list_keys(&self, prefix: &str) -> BoxStream<'static, Result<String, StorageError>> {
        stream::iter(self.keys_with_prefix(prefix).into_iter().map(Ok)).boxed()
    }
}

#[fixture]
pub fn storage() -> Arc<InMemoryStorage> {
    Arc::new(InMemoryStorage::default())
}

/// Budget with short delays. Tests run on paused time, so waits cost nothing.
#[fixture]
pub fn fast_budget() -> RateBudget {
    RateBudget {
        base_delay: Duration::from_millis(10),
        max_retries: 2,
        retry_base_delay: 2.0,
        burst_extra_delay: Duration::from_secs(1),
        burst_interval: 50,
        throttle_default: Duration::from_secs(60),
        max_throttle_waits: 5,
    }
}

#[fixture]
pub fn loop_params() -> LoopParams {
    LoopParams {
        batch_size: 4,
        batch_pause: Duration::from_secs(1),
        checkpoint_every: 100,
        max_failures: 5,
        shutdown_timeout: Duration::from_secs(5),
    }
}

/// Window of `lookback + 1` units ending at the tip.
pub fn window(lookback: u64, stride: u64) -> CollectionParams {
    CollectionParams {
        lookback_days: lookback,
        blocks_per_day: 1,
        sample_stride: stride,
        first_valid_height: WorkUnit(0),
    }
}

pub fn block_keys(storage: &InMemoryStorage) -> Vec<String> {
    storage.keys_with_prefix("blocks/height_")
}
