use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use chrono::{DateTime, Duration, DurationRound, Utc};
use futures::TryStreamExt;
use tracing::{debug, warn};

use crate::core::client::storage::{StorageClient, StorageError};
use crate::types::checkpoint::Checkpoint;
use crate::types::keys::{checkpoint_key, checkpoint_prefix};
use crate::types::work::WorkKind;

/// Append-only checkpoint log in object storage.
///
/// Each write goes to a new key whose millisecond timestamp is strictly greater
/// than the previous one for the same kind, so key order is write order.
pub struct CheckpointStore {
    storage: Arc<dyn StorageClient>,
    last_written: Mutex<HashMap<WorkKind, DateTime<Utc>>>,
}

impl CheckpointStore {
    pub fn new(storage: Arc<dyn StorageClient>) -> Self {
        Self { storage, last_written: Mutex::new(HashMap::new()) }
    }

    /// Next timestamp for `kind`: now at millisecond precision, bumped past the last one if needed.
    fn next_timestamp(&self, kind: WorkKind) -> DateTime<Utc> {
        let now = Utc::now();
        let now = now.duration_trunc(Duration::milliseconds(1)).unwrap_or(now);
        let mut last_written = self.last_written.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let stamp = match last_written.get(&kind) {
            Some(last) if now <= *last => *last + Duration::milliseconds(1),
            _ => now,
        };
        last_written.insert(kind, stamp);
        stamp
    }

    /// Stamp and store `checkpoint`, returning its key.
    pub async fn write(&self, checkpoint: &mut Checkpoint) -> Result<String, StorageError> {
        checkpoint.timestamp = self.next_timestamp(checkpoint.kind);
        let key = checkpoint_key(checkpoint.kind, checkpoint.timestamp);
        let body = serde_json::to_vec_pretty(checkpoint)?;
        self.storage.put_data(Bytes::from(body), &key).await?;
        debug!(kind = %checkpoint.kind, key = %key, state = ?checkpoint.state, "Checkpoint written");
        Ok(key)
    }

    /// Most recent checkpoint for `kind`, if any was ever written.
    pub async fn latest(&self, kind: WorkKind) -> Result<Option<Checkpoint>, StorageError> {
        let prefix = checkpoint_prefix(kind);
        let newest = self
            .storage
            .list_keys(&prefix)
            .try_fold(None::<String>, |newest, key| {
                let keep = key.ends_with(".json") && newest.as_ref().map_or(true, |n| key > *n);
                futures::future::ready(Ok(if keep { Some(key) } else { newest }))
            })
            .await?;

        let Some(key) = newest else {
            return Ok(None);
        };
        let data = self.storage.get_data(&key).await?;
        match serde_json::from_slice(&data) {
            Ok(checkpoint) => Ok(Some(checkpoint)),
            Err(e) => {
                warn!(key = %key, error = %e, "Ignoring unreadable checkpoint");
                Ok(None)
            }
        }
    }
}
