use async_trait::async_trait;
use gtfs_rt::FeedMessage;
use prost::Message;
use reqwest::Client;
use thiserror::Error;

use crate::types::VehicleSnapshot;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("feed returned HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error("feed decode failed: {0}")]
    Decode(#[from] prost::DecodeError),
}

/// Source of vehicle positions, polled once per cycle. A failed poll skips
/// the whole tick; window state is left untouched for the next attempt.
#[async_trait]
pub trait PositionSource: Send + Sync {
    async fn poll(&self) -> Result<Vec<VehicleSnapshot>, FeedError>;
}

/// GTFS-realtime vehicle-positions feed over HTTP.
pub struct GtfsRealtimeFeed {
    client: Client,
    url: String,
    api_key: String,
}

impl GtfsRealtimeFeed {
    pub fn new(client: Client, url: String, api_key: String) -> Self {
        Self {
            client,
            url,
            api_key,
        }
    }
}

#[async_trait]
impl PositionSource for GtfsRealtimeFeed {
    async fn poll(&self) -> Result<Vec<VehicleSnapshot>, FeedError> {
        let resp = self
            .client
            .get(&self.url)
            .header("x-api-key", &self.api_key)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(FeedError::Status(resp.status()));
        }
        let body = resp.bytes().await?;
        let feed = FeedMessage::decode(&*body)?;

        let buses = feed
            .entity
            .into_iter()
            .filter_map(|entity| entity.vehicle)
            .filter_map(|v| {
                // Entities without an id or a position are useless downstream.
                let id = v.vehicle.as_ref().and_then(|d| d.id.clone())?;
                let pos = v.position.as_ref()?;
                Some(VehicleSnapshot {
                    vehicle_id: id,
                    route_id: v
                        .trip
                        .as_ref()
                        .and_then(|t| t.route_id.clone())
                        .unwrap_or_default(),
                    trip_id: v
                        .trip
                        .as_ref()
                        .and_then(|t| t.trip_id.clone())
                        .unwrap_or_default(),
                    latitude: pos.latitude as f64,
                    longitude: pos.longitude as f64,
                    timestamp: v.timestamp.unwrap_or(0),
                    speed: pos.speed,
                })
            })
            .collect();

        Ok(buses)
    }
}
