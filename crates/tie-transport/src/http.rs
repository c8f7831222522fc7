//! ---
//! tie_section: "04-networking-delivery"
//! tie_subsection: "module"
//! tie_type: "source"
//! tie_scope: "code"
//! tie_description: "Delivery channels and outcome reporting."
//! tie_version: "v0.1.0"
//! tie_owner: "tbd"
//! ---
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

use crate::{DeliveryFailure, DeliveryOutcome, Result};

/// POSTs each message body to a fixed URL.
///
/// Idle connections are not pooled: every message opens and releases its own.
#[derive(Debug, Clone)]
pub struct HttpChannel {
    client: Client,
    url: String,
}

impl HttpChannel {
    /// Channel targeting `url`, giving up on connects after `connect_timeout`.
    pub fn new(url: impl Into<String>, connect_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .pool_max_idle_per_host(0)
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Destination URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// POST the raw message. Any HTTP response counts as sent.
    pub async fn deliver(&self, message: &str) -> DeliveryOutcome {
        match self
            .client
            .post(&self.url)
            .body(message.to_owned())
            .send()
            .await
        {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    debug!(url = %self.url, status = status.as_u16(), "message posted");
                } else {
                    warn!(url = %self.url, status = status.as_u16(), "endpoint answered with non-success status");
                }
                DeliveryOutcome::Sent { ack: None }
            }
            Err(err) => {
                warn!(url = %self.url, error = %err, "http delivery failed");
                DeliveryOutcome::Failed(DeliveryFailure::ConnectionError {
                    url: self.url.clone(),
                    cause: err.to_string(),
                })
            }
        }
    }
}
