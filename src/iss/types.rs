//! ISS position data types, errors and worker messages.

use bevy::prelude::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::core::coordinates::{CartesianPoint, CoordError, GeoCoordinate};

pub const DEFAULT_ENDPOINT: &str = "http://api.open-notify.org/iss-now.json";

/// Shortest period the poller will tick at.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Upper bound for any configured duration, in seconds.
const MAX_CONFIG_SECS: f64 = 86_400.0;
const DEFAULT_POLL_INTERVAL_SECS: f64 = 5.0;

/// Latitude/longitude exactly as the API sends them: numbers quoted as strings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeoPosition {
    pub latitude: String,
    pub longitude: String,
}

impl GeoPosition {
    pub fn parse(&self) -> Result<GeoCoordinate, IssError> {
        Ok(GeoCoordinate::parse(&self.latitude, &self.longitude)?)
    }
}

/// Decoded `iss-now.json` payload. Unknown fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct PositionResponse {
    pub iss_position: GeoPosition,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
}

impl PositionResponse {
    pub fn timestamp_utc(&self) -> Option<DateTime<Utc>> {
        self.timestamp
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
    }
}

/// One successful poll, ready for the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionFix {
    pub coordinate: GeoCoordinate,
    pub point: CartesianPoint,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssErrorKind {
    Network,
    Decode,
    InvalidCoordinate,
}

/// Everything that can go wrong in one poll. All of it is recoverable; the next tick
/// simply tries again.
#[derive(Debug, Error)]
pub enum IssError {
    #[error("network error: {0}")]
    Network(String),

    #[error("could not decode position response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    InvalidCoordinate(#[from] CoordError),
}

impl IssError {
    pub fn kind(&self) -> IssErrorKind {
        match self {
            IssError::Network(_) => IssErrorKind::Network,
            IssError::Decode(_) => IssErrorKind::Decode,
            IssError::InvalidCoordinate(_) => IssErrorKind::InvalidCoordinate,
        }
    }
}

impl From<reqwest::Error> for IssError {
    fn from(err: reqwest::Error) -> Self {
        IssError::Network(err.to_string())
    }
}

/// Poller tunables.
#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IssConfig {
    pub endpoint: String,
    pub poll_interval_secs: f64,
    /// Radius of the sphere the marker sits on, in globe-local units.
    pub marker_orbit_radius: f64,
    /// Unset keeps the transport's default timeout.
    pub request_timeout_secs: Option<f64>,
}

impl Default for IssConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            marker_orbit_radius: 0.25,
            request_timeout_secs: None,
        }
    }
}

impl IssConfig {
    /// Clamped to [`MIN_POLL_INTERVAL`]; NaN or values over a day fall back to the default.
    pub fn poll_interval(&self) -> Duration {
        let secs = self.poll_interval_secs;
        if !secs.is_finite() || secs > MAX_CONFIG_SECS {
            warn!(poll_interval_secs = secs, "invalid poll interval, using default");
            return Duration::from_secs_f64(DEFAULT_POLL_INTERVAL_SECS);
        }
        Duration::try_from_secs_f64(secs)
            .unwrap_or(Duration::ZERO)
            .max(MIN_POLL_INTERVAL)
    }

    /// `None` unless set to a positive number of seconds no larger than a day.
    pub fn request_timeout(&self) -> Option<Duration> {
        let secs = self.request_timeout_secs?;
        if !secs.is_finite() || secs <= 0.0 || secs > MAX_CONFIG_SECS {
            warn!(request_timeout_secs = secs, "invalid request timeout, ignoring");
            return None;
        }
        Duration::try_from_secs_f64(secs).ok()
    }
}

/// Commands for the poller worker thread.
#[derive(Debug)]
pub enum PollCommand {
    Start { interval: Duration },
    Fetch { generation: u64 },
    Stop,
}

/// Result of one fetch, tagged with the generation that requested it.
#[derive(Debug)]
pub struct PollOutcome {
    pub generation: u64,
    pub result: Result<PositionFix, IssError>,
}

/// Last known ISS state, owned by the main thread.
#[derive(Resource, Debug, Default)]
pub struct IssTrackState {
    pub last_fix: Option<PositionFix>,
    pub last_update: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub fixes_received: u64,
    pub errors_received: u64,
}

impl IssTrackState {
    pub fn record_fix(&mut self, fix: PositionFix, now: DateTime<Utc>) {
        self.last_fix = Some(fix);
        self.last_update = Some(now);
        self.last_error = None;
        self.fixes_received += 1;
    }

    /// The last good fix is kept; errors never move the marker.
    pub fn record_error(&mut self, error: &IssError) {
        self.last_error = Some(error.to_string());
        self.errors_received += 1;
    }
}
