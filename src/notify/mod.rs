//! Delivery of novel records to Discord.
//!
//! Two sinks: a webhook posting batched embeds, and a bot-token client
//! posting one message per record. Both pace their requests to stay under
//! Discord's throughput limits. Delivery is at-most-once: records are
//! already marked seen in state when `send` runs, and a failed batch or
//! message is logged and skipped without retry, so a transient sink failure
//! can silently drop a notification.

pub mod embed;

mod discord;
mod webhook;

use std::time::Duration;

use anyhow::{Result, bail};
use tracing::info;

use crate::config::DiscordConfig;
use crate::extract::{DelayUpdate, ServiceAlert};
use discord::BotSender;
use embed::{alert_embed, update_embed};
use webhook::WebhookSender;

/// Discord allows at most 10 embeds per message.
pub(crate) const EMBEDS_PER_MESSAGE: usize = 10;
/// Pause between consecutive requests to one sink.
pub(crate) const PACE: Duration = Duration::from_secs(1);

pub enum Notifier {
    Webhook(WebhookSender),
    Bot(BotSender),
}

impl Notifier {
    /// Picks the sink from the config; the webhook wins when both are set.
    pub fn from_config(config: &DiscordConfig) -> Result<Self> {
        if let Some(url) = &config.webhook_url {
            return Ok(Notifier::Webhook(WebhookSender::new(url.clone())));
        }
        match (&config.token, &config.channel_id) {
            (Some(token), Some(channel_id)) => Ok(Notifier::Bot(BotSender::new(
                token.clone(),
                channel_id.clone(),
            ))),
            _ => bail!("no notification target configured"),
        }
    }

    /// Sends alert embeds first, then update embeds, preserving feed order
    /// within each kind.
    pub async fn send(&self, alerts: &[ServiceAlert], updates: &[DelayUpdate]) {
        let embeds: Vec<_> = alerts
            .iter()
            .map(alert_embed)
            .chain(updates.iter().map(update_embed))
            .collect();
        if embeds.is_empty() {
            return;
        }

        info!(
            alerts = alerts.len(),
            updates = updates.len(),
            "sending notifications"
        );
        match self {
            Notifier::Webhook(sender) => sender.send(&embeds).await,
            Notifier::Bot(sender) => sender.send(&embeds).await,
        }
    }
}
