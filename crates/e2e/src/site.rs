//! Reachability check for the hosted translator

use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};

/// Pause between reachability attempts
const RETRY_INTERVAL: Duration = Duration::from_millis(500);

/// HTTP probe run once before browsers are launched
pub struct SiteProbe {
    client: reqwest::Client,
}

impl SiteProbe {
    pub fn new() -> E2eResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client })
    }

    /// Wait until `url` answers with a success status
    pub async fn wait_until_reachable(&self, url: &str, timeout: Duration) -> E2eResult<()> {
        let start = Instant::now();
        let mut attempts = 0;

        loop {
            attempts += 1;

            match self.client.get(url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    info!("{} reachable after {} attempt(s)", url, attempts);
                    return Ok(());
                }
                Ok(resp) => {
                    warn!("{} returned {}", url, resp.status());
                }
                Err(e) => {
                    if attempts == 1 {
                        info!("Waiting for {} to respond...", url);
                    }
                    if !e.is_connect() && !e.is_timeout() {
                        warn!("Reachability check error: {}", e);
                    }
                }
            }

            if start.elapsed() >= timeout {
                return Err(E2eError::SiteUnreachable {
                    url: url.to_string(),
                    attempts,
                });
            }
            sleep(RETRY_INTERVAL).await;
        }
    }
}
