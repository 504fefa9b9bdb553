//! Webhook delivery: batched embeds, paced between batches.

use serde::Serialize;
use tracing::{debug, warn};

use super::embed::Embed;
use super::{EMBEDS_PER_MESSAGE, PACE};

#[derive(Serialize)]
struct WebhookPayload<'a> {
    embeds: &'a [Embed],
}

pub struct WebhookSender {
    client: reqwest::Client,
    url: String,
}

impl WebhookSender {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }

    /// Posts the embeds in batches of at most ten, one second apart. A
    /// failed batch is logged and skipped; later batches are still sent.
    pub async fn send(&self, embeds: &[Embed]) {
        let batches: Vec<&[Embed]> = embeds.chunks(EMBEDS_PER_MESSAGE).collect();
        let total = batches.len();

        for (i, batch) in batches.into_iter().enumerate() {
            let result = self
                .client
                .post(&self.url)
                .json(&WebhookPayload { embeds: batch })
                .send()
                .await
                .and_then(|resp| resp.error_for_status());

            match result {
                Ok(_) => debug!(batch = i + 1, total, size = batch.len(), "webhook batch sent"),
                Err(e) => warn!(batch = i + 1, total, error = %e, "webhook batch failed"),
            }

            if i + 1 < total {
                tokio::time::sleep(PACE).await;
            }
        }
    }
}
