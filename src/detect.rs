//! Novelty detection against the persisted seen-record state.
//!
//! Detection is pure: it reads the store and returns the novel records plus
//! the [`StateDelta`]s to apply, so the identity rules can be tested without
//! touching a store. Alerts are reported once per id; delay updates are
//! re-reported whenever the observed delay differs from the stored one.

use std::collections::{HashMap, HashSet};

use crate::extract::{DelayUpdate, ServiceAlert};
use crate::state::StateStore;

/// One pending mutation of the seen-record state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateDelta {
    RecordAlert {
        id: String,
        header_text: String,
    },
    RecordUpdate {
        id: String,
        delay_secs: i32,
        route_id: String,
    },
}

/// Returns the alerts whose id has never been recorded, in feed order.
///
/// A recorded id stays suppressed until it ages out of the store, even if
/// the alert's header text changes in the meantime.
pub fn detect_alerts(
    alerts: &[ServiceAlert],
    store: &StateStore,
) -> (Vec<ServiceAlert>, Vec<StateDelta>) {
    let mut novel = Vec::new();
    let mut deltas = Vec::new();
    let mut pending: HashSet<&str> = HashSet::new();

    for alert in alerts {
        if store.has_alert(&alert.id) || pending.contains(alert.id.as_str()) {
            continue;
        }
        pending.insert(&alert.id);
        deltas.push(StateDelta::RecordAlert {
            id: alert.id.clone(),
            header_text: alert.header_text.clone(),
        });
        novel.push(alert.clone());
    }

    (novel, deltas)
}

/// Returns the updates that are new or whose delay changed, in feed order.
///
/// An unchanged delay on a repeated poll is suppressed; any changed value,
/// including a smaller one or a sign flip, is emitted again and overwrites
/// the stored entry.
pub fn detect_updates(
    updates: &[DelayUpdate],
    store: &StateStore,
) -> (Vec<DelayUpdate>, Vec<StateDelta>) {
    let mut novel = Vec::new();
    let mut deltas = Vec::new();
    let mut pending: HashMap<&str, i32> = HashMap::new();

    for update in updates {
        let last = pending
            .get(update.id.as_str())
            .copied()
            .or_else(|| store.last_delay(&update.id));
        if last == Some(update.delay_secs) {
            continue;
        }
        pending.insert(&update.id, update.delay_secs);
        deltas.push(StateDelta::RecordUpdate {
            id: update.id.clone(),
            delay_secs: update.delay_secs,
            route_id: update.route_id.clone(),
        });
        novel.push(update.clone());
    }

    (novel, deltas)
}
