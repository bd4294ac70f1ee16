pub mod checkpoint;
pub mod constant;
pub mod keys;
pub mod params;
pub mod record;
pub mod summary;
pub mod work;

pub use checkpoint::{Checkpoint, LoopState};
pub use keys::KeyPattern;
pub use record::{CollectionRecord, SnapshotRecord};
pub use summary::{CollectionSummary, RunSummary, SnapshotOutcome};
pub use work::{WorkKind, WorkSet, WorkUnit};
