use std::collections::BTreeSet;

use futures::TryStreamExt;
use tracing::debug;

use crate::core::client::storage::{StorageClient, StorageError};
use crate::types::keys::KeyPattern;
use crate::types::work::WorkUnit;

/// Units embedded in `keys`. Keys not matching `pattern` are ignored.
pub fn keys_to_units<I, S>(keys: I, pattern: &KeyPattern) -> BTreeSet<WorkUnit>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    keys.into_iter().filter_map(|key| pattern.unit_of(key.as_ref())).collect()
}

/// Rebuild the completed set for `prefix` from what is in storage.
///
/// An empty or absent prefix yields an empty set.
pub async fn scan_completed(
    storage: &dyn StorageClient,
    prefix: &str,
    pattern: &KeyPattern,
) -> Result<BTreeSet<WorkUnit>, StorageError> {
    let keys: Vec<String> = storage.list_keys(prefix).try_collect().await?;
    let completed = keys_to_units(&keys, pattern);
    debug!(prefix, scanned = keys.len(), completed = completed.len(), "Scanned stored keys");
    Ok(completed)
}
