use std::collections::HashSet;
use std::time::Duration;

use futures::future;
use tokio::time::MissedTickBehavior;

use crate::enrich::SideInfoProvider;
use crate::features::WeatherEncoder;
use crate::feed::PositionSource;
use crate::predictor::Predictor;
use crate::sink::ResultSink;
use crate::types::{PredictionRow, VehicleSnapshot};
use crate::window::WindowStore;

const IST_OFFSET_SECS: i64 = 5 * 3600 + 30 * 60;

/// Drives one poll-enrich-window-score-emit pass per tick.
///
/// Vehicles within a cycle are processed concurrently and independently;
/// the two side-info fetches for one vehicle run concurrently with each
/// other. Per vehicle, append-snapshot-predict is strictly sequential.
pub struct Scheduler<S, E, K>
where
    S: PositionSource,
    E: SideInfoProvider,
    K: ResultSink,
{
    feed: S,
    side: E,
    encoder: WeatherEncoder,
    store: WindowStore,
    predictor: Predictor,
    sink: K,
    max_vehicles: usize,
    stale_after_cycles: u64,
    cycle: u64,
}

impl<S, E, K> Scheduler<S, E, K>
where
    S: PositionSource,
    E: SideInfoProvider,
    K: ResultSink,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        feed: S,
        side: E,
        encoder: WeatherEncoder,
        store: WindowStore,
        predictor: Predictor,
        sink: K,
        max_vehicles: usize,
        stale_after_cycles: u64,
    ) -> Self {
        Self {
            feed,
            side,
            encoder,
            store,
            predictor,
            sink,
            max_vehicles,
            stale_after_cycles,
            cycle: 0,
        }
    }

    /// Run forever at a fixed cadence. Each cycle is independent; there is
    /// no cross-cycle backpressure.
    pub async fn run(mut self, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.run_cycle().await;
        }
    }

    /// One full pass across all currently visible vehicles.
    pub async fn run_cycle(&mut self) {
        self.cycle += 1;
        let cycle = self.cycle;

        let buses = match self.feed.poll().await {
            Ok(buses) => buses,
            Err(e) => {
                // Window state stays untouched; retried next tick.
                tracing::warn!("position feed unavailable, skipping cycle {}: {}", cycle, e);
                return;
            }
        };

        let seen = buses.len();
        // Feeds may repeat a vehicle across entities; the store's contract
        // is one append per vehicle per cycle, so keep first sightings only.
        let mut ids = HashSet::new();
        let rows: Vec<PredictionRow> = future::join_all(
            buses
                .iter()
                .filter(|bus| ids.insert(bus.vehicle_id.as_str()))
                .take(self.max_vehicles)
                .map(|bus| self.process_vehicle(bus, cycle)),
        )
        .await;

        self.sink.emit(&rows);

        let evicted = self.store.evict_stale(cycle, self.stale_after_cycles);
        tracing::info!(
            "cycle {}: {} vehicles processed ({} in feed), {} tracked, {} stale evicted",
            cycle,
            rows.len(),
            seen,
            self.store.tracked(),
            evicted
        );
    }

    async fn process_vehicle(&self, bus: &VehicleSnapshot, cycle: u64) -> PredictionRow {
        let (traffic, weather) = tokio::join!(
            self.side.fetch_traffic(bus.latitude, bus.longitude),
            self.side.fetch_weather(bus.latitude, bus.longitude),
        );

        let tuple = self.encoder.encode(traffic.as_ref(), weather.as_ref());
        self.store.append(&bus.vehicle_id, tuple, cycle);
        let window = self.store.snapshot(&bus.vehicle_id);
        let (eta, source) = self.predictor.predict(&window, tuple.traffic_ratio);

        PredictionRow {
            vehicle_id: bus.vehicle_id.clone(),
            route_id: bus.route_id.clone(),
            latitude: bus.latitude,
            longitude: bus.longitude,
            time: ist_time(bus.timestamp),
            eta_delay_seconds: eta,
            traffic_ratio: tuple.traffic_ratio,
            temperature: tuple.temperature,
            condition: weather
                .map(|w| w.condition)
                .unwrap_or_else(|| crate::features::DEFAULT_CONDITION.to_string()),
            source,
        }
    }
}

/// Display time for the dashboard: feed timestamps are UTC, shown as IST.
fn ist_time(unix_ts: u64) -> String {
    match chrono::DateTime::from_timestamp(unix_ts as i64, 0) {
        Some(utc) => (utc + chrono::Duration::seconds(IST_OFFSET_SECS))
            .format("%H:%M:%S")
            .to_string(),
        None => "--:--:--".to_string(),
    }
}
