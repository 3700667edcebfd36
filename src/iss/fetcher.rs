//! ISS position fetch: transport, decode and coordinate conversion.

use bevy::log::debug;
use reqwest::header::{CACHE_CONTROL, HeaderMap, HeaderValue, PRAGMA};
use std::future::Future;

use crate::iss::types::{IssConfig, IssError, PositionFix, PositionResponse};

/// Where position bodies come from. The poller only needs the raw body; decoding is
/// shared by every source.
pub trait PositionSource: Send + Sync + 'static {
    fn fetch(&self) -> impl Future<Output = Result<String, IssError>> + Send;
}

/// Plain HTTP GET against the open-notify endpoint.
pub struct HttpSource {
    client: reqwest::Client,
    url: String,
}

impl HttpSource {
    pub fn new(config: &IssConfig) -> Result<Self, IssError> {
        // Always ask intermediaries for a fresh copy; reqwest itself never caches.
        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            url: config.endpoint.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl PositionSource for HttpSource {
    fn fetch(&self) -> impl Future<Output = Result<String, IssError>> + Send {
        async move {
            let resp = self.client.get(&self.url).send().await?;
            let status = resp.status();
            if !status.is_success() {
                return Err(IssError::Network(format!("HTTP {} for {}", status, self.url)));
            }
            let body = resp.text().await?;
            debug!(status = %status, bytes = body.len(), "ISS position fetched");
            Ok(body)
        }
    }
}

/// Fetch one body from `source` and turn it into a fix.
pub async fn fetch_position<S: PositionSource>(
    source: &S,
    radius: f64,
) -> Result<PositionFix, IssError> {
    let body = source.fetch().await?;
    parse_position(&body, radius)
}

/// Decode an `iss-now.json` body and place it on the marker sphere.
pub fn parse_position(body: &str, radius: f64) -> Result<PositionFix, IssError> {
    let response: PositionResponse = serde_json::from_str(body)?;
    let coordinate = response.iss_position.parse()?;
    Ok(PositionFix {
        coordinate,
        point: coordinate.to_cartesian(radius),
        timestamp: response.timestamp_utc(),
    })
}
