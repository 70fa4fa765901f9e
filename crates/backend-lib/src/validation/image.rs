// ============================
// crates/backend-lib/src/validation/image.rs
// ============================
//! Remote image URL checks.
use std::time::Duration;

use futures_util::future::join_all;
use reqwest::{
    header::{CONTENT_LENGTH, CONTENT_TYPE},
    Client, Url,
};
use tracing::debug;

/// Largest accepted image, in bytes
pub const MAX_IMAGE_BYTES: u64 = 500 * 1024;

/// Default per-request timeout
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Checks that URLs point at reasonably small images
#[derive(Debug, Clone)]
pub struct ImageProbe {
    client: Client,
}

impl ImageProbe {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// `true` when `url` answers with an `image/*` body no larger than [`MAX_IMAGE_BYTES`]
    pub async fn is_acceptable_image(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            debug!(url, "rejecting unparseable image url");
            return false;
        };
        if parsed.host_str().is_none() {
            return false;
        }

        let response = match self.client.get(parsed).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!(url, error = %e, "image probe failed");
                return false;
            }
        };

        let headers = response.headers();
        let is_image = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.trim_start().to_ascii_lowercase().starts_with("image/"));

        let size = headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());

        is_image && size.is_some_and(|bytes| bytes <= MAX_IMAGE_BYTES)
    }

    /// Probe every URL concurrently; `true` only if all pass
    pub async fn all_acceptable(&self, urls: &[String]) -> bool {
        join_all(urls.iter().map(|url| self.is_acceptable_image(url)))
            .await
            .into_iter()
            .all(|ok| ok)
    }
}

/// Probe `urls` with a fresh client using [`DEFAULT_PROBE_TIMEOUT`]
pub async fn probe_image_urls(urls: &[String]) -> bool {
    match ImageProbe::new(DEFAULT_PROBE_TIMEOUT) {
        Ok(probe) => probe.all_acceptable(urls).await,
        Err(e) => {
            debug!(error = %e, "could not build image probe client");
            false
        }
    }
}
