//! Bot-token delivery via the Discord REST API, one message per record.

use serde::Serialize;
use tracing::{debug, warn};

use super::PACE;
use super::embed::Embed;

const API_BASE: &str = "https://discord.com/api/v10";

#[derive(Serialize)]
struct MessagePayload<'a> {
    embeds: &'a [Embed],
}

pub struct BotSender {
    client: reqwest::Client,
    token: String,
    channel_id: String,
}

impl BotSender {
    pub fn new(token: String, channel_id: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
            channel_id,
        }
    }

    /// Posts one message per embed to the configured channel, one second
    /// apart. Failures are logged and skipped, delivery continues.
    pub async fn send(&self, embeds: &[Embed]) {
        let url = format!("{API_BASE}/channels/{}/messages", self.channel_id);
        let total = embeds.len();

        for (i, embed) in embeds.iter().enumerate() {
            let result = self
                .client
                .post(&url)
                .header("Authorization", format!("Bot {}", self.token))
                .json(&MessagePayload {
                    embeds: std::slice::from_ref(embed),
                })
                .send()
                .await
                .and_then(|resp| resp.error_for_status());

            match result {
                Ok(_) => debug!(message = i + 1, total, "channel message sent"),
                Err(e) => warn!(message = i + 1, total, error = %e, "channel message failed"),
            }

            if i + 1 < total {
                tokio::time::sleep(PACE).await;
            }
        }
    }
}
