use std::sync::Arc;

use crate::enrich::HttpSideInfo;
use crate::features::WeatherEncoder;
use crate::feed::GtfsRealtimeFeed;
use crate::model::LstmScorer;
use crate::predictor::Predictor;
use crate::scheduler::Scheduler;
use crate::sink::{CycleCache, LogSink};
use crate::window::WindowStore;

mod api;
mod config;
mod enrich;
mod features;
mod feed;
mod model;
mod predictor;
mod scheduler;
mod sink;
mod types;
mod window;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // Everything that can be missing fails here, before the first cycle.
    let cfg = config::AppConfig::from_env()?;

    let scorer = LstmScorer::load(&cfg.model_path, &cfg.meta_path)?;
    tracing::info!(
        "loaded model; window={} classes={:?}",
        scorer.meta().window,
        scorer.meta().weather_classes
    );
    let encoder = WeatherEncoder::from_classes(&scorer.meta().weather_classes);
    let window_len = scorer.meta().window;

    let client = reqwest::Client::builder()
        .timeout(cfg.fetch_timeout)
        .build()?;

    let feed = GtfsRealtimeFeed::new(client.clone(), cfg.feed_url.clone(), cfg.feed_api_key.clone());
    let side = HttpSideInfo::new(
        client,
        cfg.traffic_url.clone(),
        cfg.traffic_api_key.clone(),
        cfg.weather_url.clone(),
        cfg.weather_api_key.clone(),
    );

    let cache = Arc::new(CycleCache::new());
    let scheduler = Scheduler::new(
        feed,
        side,
        encoder,
        WindowStore::new(window_len),
        Predictor::new(Arc::new(scorer), window_len),
        LogSink::new(cache.clone()),
        cfg.max_vehicles,
        cfg.stale_after_cycles,
    );

    let interval = cfg.cycle_interval;
    tokio::spawn(async move { scheduler.run(interval).await });

    let app = api::router(api::ApiState { cache });
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], cfg.port));
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let server = async move { axum::serve(listener, app).await };
    tokio::select! {
        r = server => { r?; }
        _ = tokio::signal::ctrl_c() => { tracing::info!("shutdown signal received"); }
    }

    Ok(())
}
