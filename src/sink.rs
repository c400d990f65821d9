use parking_lot::RwLock;
use std::sync::Arc;

use crate::types::PredictionRow;

/// Receives one batch of results per cycle. Rendering and persistence live
/// behind this seam.
pub trait ResultSink: Send + Sync {
    fn emit(&self, rows: &[PredictionRow]);
}

/// Latest completed cycle, shared with the HTTP read path.
#[derive(Default)]
pub struct CycleCache {
    latest: RwLock<Vec<PredictionRow>>,
}

impl CycleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, rows: &[PredictionRow]) {
        *self.latest.write() = rows.to_vec();
    }

    pub fn latest(&self) -> Vec<PredictionRow> {
        self.latest.read().clone()
    }
}

/// Production sink: logs a per-vehicle line each cycle and refreshes the
/// cache the API serves from.
pub struct LogSink {
    cache: Arc<CycleCache>,
}

impl LogSink {
    pub fn new(cache: Arc<CycleCache>) -> Self {
        Self { cache }
    }
}

impl ResultSink for LogSink {
    fn emit(&self, rows: &[PredictionRow]) {
        for row in rows {
            tracing::info!(
                "bus={} route={} time={} delay={}s ratio={:.2} temp={:.1}C weather={} ({:?})",
                row.vehicle_id,
                row.route_id,
                row.time,
                row.eta_delay_seconds,
                row.traffic_ratio,
                row.temperature,
                row.condition,
                row.source
            );
        }
        self.cache.store(rows);
    }
}
