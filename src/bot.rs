//! One full pipeline cycle: load → prune → fetch → extract → detect →
//! notify → save.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::config::Config;
use crate::detect::{detect_alerts, detect_updates};
use crate::extract::extract;
use crate::fetch::{ApiKeyParam, BasicClient, fetch_feed};
use crate::notify::Notifier;
use crate::parser::parse_feed;
use crate::state::{StateStore, retention_window};

/// Counts reported by one run, for the closing log line.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub alerts_seen: usize,
    pub alerts_novel: usize,
    pub updates_seen: usize,
    pub updates_novel: usize,
}

pub struct DisruptionBot {
    config: Config,
    store: StateStore,
}

impl DisruptionBot {
    pub fn new(config: Config) -> Self {
        let store = StateStore::new(&config.state_dir);
        Self { config, store }
    }

    /// Runs one poll cycle. A fetch or decode failure aborts before any
    /// state is persisted, so the next run resumes from the last successful
    /// one. With `dry_run` the cycle detects and logs but neither delivers
    /// nor saves.
    pub async fn run_once(&mut self, dry_run: bool) -> Result<RunSummary> {
        self.store.load();
        self.store.prune(retention_window());

        info!(url = %self.config.feed.url, "fetching feed");
        let bytes = self.fetch_bytes().await?;
        let feed = parse_feed(&bytes).context("feed decode failed")?;
        info!(entities = feed.entity.len(), "feed decoded");

        let (alerts, updates) = extract(&feed, &self.config.filters);
        let (novel_alerts, alert_deltas) = detect_alerts(&alerts, &self.store);
        let (novel_updates, update_deltas) = detect_updates(&updates, &self.store);
        self.store.apply(alert_deltas);
        self.store.apply(update_deltas);

        let summary = RunSummary {
            alerts_seen: alerts.len(),
            alerts_novel: novel_alerts.len(),
            updates_seen: updates.len(),
            updates_novel: novel_updates.len(),
        };
        info!(
            alerts = summary.alerts_seen,
            alerts_novel = summary.alerts_novel,
            updates = summary.updates_seen,
            updates_novel = summary.updates_novel,
            "detection complete"
        );

        if dry_run {
            info!("dry run, skipping delivery and state save");
            return Ok(summary);
        }

        if !novel_alerts.is_empty() || !novel_updates.is_empty() {
            let notifier = Notifier::from_config(&self.config.discord)?;
            notifier.send(&novel_alerts, &novel_updates).await;
        } else {
            info!("nothing novel to send");
        }

        self.store.save();

        let stats = self.store.stats();
        info!(
            alerts = stats.alert_count,
            updates = stats.update_count,
            "state persisted"
        );

        Ok(summary)
    }

    async fn fetch_bytes(&self) -> Result<Vec<u8>> {
        let url = &self.config.feed.url;
        match &self.config.feed.api_key {
            Some(key) => {
                let client = ApiKeyParam::new(BasicClient::new(), "apikey", key.clone());
                fetch_feed(&client, url).await
            }
            None => fetch_feed(&BasicClient::new(), url).await,
        }
    }
}
