//! Durable seen-record store backing novelty detection.
//!
//! The store is a JSON document (`bot-state.json`) holding the ids reported
//! in the last 24 hours. Unreadable prior state means a fresh start, and a
//! failed save is logged but never fails the run: the worst case either way
//! is a handful of duplicate notifications, not a crash.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::detect::StateDelta;

pub const STATE_FILE_NAME: &str = "bot-state.json";

/// How long a seen record suppresses re-notification.
pub fn retention_window() -> Duration {
    Duration::hours(24)
}

/// State entry for a reported alert. `timestamp` is the first sighting in
/// milliseconds since the epoch; `header_text` records what was reported and
/// is never compared against later sightings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeenAlert {
    pub timestamp: i64,
    pub header_text: String,
}

/// State entry for a reported delay. Overwritten, timestamp included,
/// whenever the delay value changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeenUpdate {
    pub timestamp: i64,
    pub delay: i32,
    pub route_id: String,
}

/// On-disk document. Field names stay camelCase for compatibility with state
/// files written by earlier deployments of this bot.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedState {
    #[serde(default)]
    last_alerts: HashMap<String, SeenAlert>,
    #[serde(default)]
    last_updates: HashMap<String, SeenUpdate>,
    #[serde(default)]
    last_run: Option<DateTime<Utc>>,
}

/// Read-only view of the store for logging and the `stats` subcommand.
#[derive(Debug, Serialize)]
pub struct StateStats {
    pub alert_count: usize,
    pub update_count: usize,
    pub last_run: Option<DateTime<Utc>>,
}

/// Owns the persisted seen-record map for the lifetime of one process run.
/// The pipeline is strictly sequential, so there is no concurrent access.
pub struct StateStore {
    path: PathBuf,
    state: PersistedState,
}

impl StateStore {
    /// Creates an empty store that will persist under `state_dir`.
    pub fn new(state_dir: &Path) -> Self {
        Self {
            path: state_dir.join(STATE_FILE_NAME),
            state: PersistedState::default(),
        }
    }

    /// Loads prior state from disk. A missing file is a normal first run;
    /// any other read or parse failure is logged and treated as empty.
    pub fn load(&mut self) {
        match fs::read_to_string(&self.path) {
            Ok(raw) => match serde_json::from_str::<PersistedState>(&raw) {
                Ok(state) => {
                    self.state = state;
                    info!(
                        alerts = self.state.last_alerts.len(),
                        updates = self.state.last_updates.len(),
                        "state loaded"
                    );
                }
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "state file unreadable, starting empty");
                    self.state = PersistedState::default();
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("no prior state found, starting fresh");
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "state load failed, starting empty");
                self.state = PersistedState::default();
            }
        }
    }

    /// Persists the current state, stamping `lastRun`. A write failure is
    /// logged but does not fail the run; the next run simply re-detects
    /// whatever the lost entries would have suppressed.
    pub fn save(&mut self) {
        self.state.last_run = Some(Utc::now());

        let result = self
            .path
            .parent()
            .map(fs::create_dir_all)
            .unwrap_or(Ok(()))
            .and_then(|()| {
                let json = serde_json::to_string_pretty(&self.state)?;
                fs::write(&self.path, json)
            });

        match result {
            Ok(()) => debug!(path = %self.path.display(), "state saved"),
            Err(e) => warn!(path = %self.path.display(), error = %e, "state save failed"),
        }
    }

    /// Evicts every entry older than `max_age`, so a long-gone record becomes
    /// eligible for re-notification. Runs once per cycle before detection.
    pub fn prune(&mut self, max_age: Duration) {
        self.prune_at(Utc::now().timestamp_millis(), max_age);
    }

    /// Eviction requires age strictly greater than `max_age`; an entry
    /// exactly at the boundary is kept.
    pub fn prune_at(&mut self, now_ms: i64, max_age: Duration) {
        let max_age_ms = max_age.num_milliseconds();
        let before_alerts = self.state.last_alerts.len();
        let before_updates = self.state.last_updates.len();

        self.state
            .last_alerts
            .retain(|_, e| now_ms - e.timestamp <= max_age_ms);
        self.state
            .last_updates
            .retain(|_, e| now_ms - e.timestamp <= max_age_ms);

        let removed_alerts = before_alerts - self.state.last_alerts.len();
        let removed_updates = before_updates - self.state.last_updates.len();
        if removed_alerts > 0 || removed_updates > 0 {
            info!(removed_alerts, removed_updates, "pruned aged-out entries");
        }
    }

    /// Applies detector deltas, stamping them with the current wall clock.
    pub fn apply(&mut self, deltas: Vec<StateDelta>) {
        self.apply_at(deltas, Utc::now().timestamp_millis());
    }

    pub fn apply_at(&mut self, deltas: Vec<StateDelta>, now_ms: i64) {
        for delta in deltas {
            match delta {
                StateDelta::RecordAlert { id, header_text } => {
                    self.state.last_alerts.insert(
                        id,
                        SeenAlert {
                            timestamp: now_ms,
                            header_text,
                        },
                    );
                }
                StateDelta::RecordUpdate {
                    id,
                    delay_secs,
                    route_id,
                } => {
                    self.state.last_updates.insert(
                        id,
                        SeenUpdate {
                            timestamp: now_ms,
                            delay: delay_secs,
                            route_id,
                        },
                    );
                }
            }
        }
    }

    pub fn has_alert(&self, id: &str) -> bool {
        self.state.last_alerts.contains_key(id)
    }

    /// The delay most recently recorded for `id`, if any.
    pub fn last_delay(&self, id: &str) -> Option<i32> {
        self.state.last_updates.get(id).map(|e| e.delay)
    }

    pub fn stats(&self) -> StateStats {
        StateStats {
            alert_count: self.state.last_alerts.len(),
            update_count: self.state.last_updates.len(),
            last_run: self.state.last_run,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn temp_store(name: &str) -> StateStore {
        let dir = env::temp_dir().join(format!("gtfs_rt_notify_state_{name}"));
        let _ = fs::remove_dir_all(&dir);
        StateStore::new(&dir)
    }

    fn alert_delta(id: &str) -> StateDelta {
        StateDelta::RecordAlert {
            id: id.to_string(),
            header_text: "Störung".to_string(),
        }
    }

    fn update_delta(id: &str, delay_secs: i32) -> StateDelta {
        StateDelta::RecordUpdate {
            id: id.to_string(),
            delay_secs,
            route_id: "100".to_string(),
        }
    }

    #[test]
    fn test_load_missing_file_starts_empty() {
        let mut store = temp_store("missing");
        store.load();

        let stats = store.stats();
        assert_eq!(stats.alert_count, 0);
        assert_eq!(stats.update_count, 0);
        assert!(stats.last_run.is_none());
    }

    #[test]
    fn test_load_corrupt_file_starts_empty() {
        let dir = env::temp_dir().join("gtfs_rt_notify_state_corrupt");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(STATE_FILE_NAME), "{not json").unwrap();

        let mut store = StateStore::new(&dir);
        store.apply_at(vec![alert_delta("stale")], 1);
        store.load();
        assert_eq!(store.stats().alert_count, 0);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_save_and_reload_roundtrip() {
        let dir = env::temp_dir().join("gtfs_rt_notify_state_roundtrip");
        let _ = fs::remove_dir_all(&dir);

        let mut store = StateStore::new(&dir);
        store.apply_at(vec![alert_delta("A1"), update_delta("t1_s1", 600)], 42);
        store.save();

        let mut reloaded = StateStore::new(&dir);
        reloaded.load();
        assert!(reloaded.has_alert("A1"));
        assert_eq!(reloaded.last_delay("t1_s1"), Some(600));
        assert!(reloaded.stats().last_run.is_some());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_state_file_uses_camel_case_wire_names() {
        let dir = env::temp_dir().join("gtfs_rt_notify_state_wire");
        let _ = fs::remove_dir_all(&dir);

        let mut store = StateStore::new(&dir);
        store.apply_at(vec![alert_delta("A1"), update_delta("t1_s1", 600)], 42);
        store.save();

        let raw = fs::read_to_string(dir.join(STATE_FILE_NAME)).unwrap();
        assert!(raw.contains("\"lastAlerts\""));
        assert!(raw.contains("\"lastUpdates\""));
        assert!(raw.contains("\"lastRun\""));
        assert!(raw.contains("\"headerText\""));
        assert!(raw.contains("\"routeId\""));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_prune_removes_aged_entries() {
        let mut store = temp_store("prune");
        let day_ms = retention_window().num_milliseconds();

        store.apply_at(vec![alert_delta("old"), update_delta("old-u", 600)], 0);
        store.apply_at(
            vec![alert_delta("fresh"), update_delta("fresh-u", 300)],
            day_ms,
        );

        store.prune_at(day_ms + 1, retention_window());
        assert!(!store.has_alert("old"));
        assert_eq!(store.last_delay("old-u"), None);
        assert!(store.has_alert("fresh"));
        assert_eq!(store.last_delay("fresh-u"), Some(300));
    }

    #[test]
    fn test_prune_keeps_entry_exactly_at_boundary() {
        let mut store = temp_store("prune_boundary");
        store.apply_at(vec![alert_delta("edge")], 0);

        store.prune_at(retention_window().num_milliseconds(), retention_window());
        assert!(store.has_alert("edge"));
    }

    #[test]
    fn test_apply_overwrites_update_and_refreshes_timestamp() {
        let mut store = temp_store("overwrite");
        store.apply_at(vec![update_delta("t1_s1", 600)], 1_000);
        store.apply_at(vec![update_delta("t1_s1", 900)], 2_000);

        assert_eq!(store.last_delay("t1_s1"), Some(900));
        // The refreshed timestamp keeps the entry alive relative to the
        // second sighting.
        store.prune_at(2_000 + retention_window().num_milliseconds(), retention_window());
        assert_eq!(store.last_delay("t1_s1"), Some(900));
    }

    #[test]
    fn test_stats_counts() {
        let mut store = temp_store("stats");
        store.apply_at(
            vec![
                alert_delta("A1"),
                alert_delta("A2"),
                update_delta("t1_s1", 600),
            ],
            1,
        );

        let stats = store.stats();
        assert_eq!(stats.alert_count, 2);
        assert_eq!(stats.update_count, 1);
    }
}
