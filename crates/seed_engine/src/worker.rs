use tokio_util::sync::CancellationToken;

use crate::{ItemProgress, WorkerError};

pub trait ProgressSink: Send + Sync {
    fn emit(&self, progress: ItemProgress);
}

/// Discovers the catalog items and processes them one by one.
///
/// Implementations report through `sink` at least once per discovered batch
/// and once more at the end, and check `cancel` between items. Returns the
/// final number of items processed.
#[async_trait::async_trait]
pub trait ItemWorker: Send + Sync {
    async fn process(
        &self,
        max_items: Option<u64>,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<u64, WorkerError>;
}
