//! Synthetic catalog worker used by the demo host.

use std::time::Duration;

use seed_core::PHASE_DISCOVERING;
use seed_engine::{ItemProgress, ItemWorker, ProgressSink, WorkerError};
use seed_logging::seed_debug;
use tokio_util::sync::CancellationToken;

pub const PHASE_DOWNLOADING: &str = "downloading";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSettings {
    pub item_count: u64,
    pub batch_size: u64,
    pub item_delay: Duration,
    pub discovery_delay: Duration,
}

/// Discovers a fixed-size catalog page by page, then "downloads" each food
/// item with a fixed delay.
pub struct CatalogWorker {
    settings: CatalogSettings,
}

impl CatalogWorker {
    pub fn new(settings: CatalogSettings) -> Self {
        Self { settings }
    }
}

#[async_trait::async_trait]
impl ItemWorker for CatalogWorker {
    async fn process(
        &self,
        max_items: Option<u64>,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<u64, WorkerError> {
        let limit = max_items.map_or(self.settings.item_count, |max| {
            max.min(self.settings.item_count)
        });
        let batch = self.settings.batch_size.max(1);

        let mut discovered = 0;
        sink.emit(ItemProgress::new(0, 0, PHASE_DISCOVERING));
        while discovered < limit {
            pause(self.settings.discovery_delay, cancel).await?;
            discovered = (discovered + batch).min(limit);
            seed_debug!("Discovered {} of {} catalog items", discovered, limit);
            sink.emit(ItemProgress::new(0, discovered, PHASE_DISCOVERING));
        }

        for downloaded in 1..=limit {
            pause(self.settings.item_delay, cancel).await?;
            sink.emit(ItemProgress::new(downloaded, limit, PHASE_DOWNLOADING));
        }
        Ok(limit)
    }
}

/// Sleeps unless cancelled first.
async fn pause(delay: Duration, cancel: &CancellationToken) -> Result<(), WorkerError> {
    tokio::select! {
        _ = cancel.cancelled() => Err(WorkerError::cancelled()),
        _ = tokio::time::sleep(delay) => Ok(()),
    }
}
