//! Turns decoded feed entities into normalized alert and delay records.
//!
//! Extraction is lossy on purpose: entities that are not alerts or trip
//! updates are ignored, and a single malformed entity is skipped without
//! failing the batch.

use serde::Serialize;
use tracing::debug;

use crate::config::FilterConfig;
use crate::gtfs_rt::{Alert, FeedEntity, FeedMessage, TranslatedString, alert};

/// Translation language preferred when resolving localized feed text.
pub const PREFERRED_LANGUAGE: &str = "de";

#[derive(Debug, Clone, Serialize)]
pub struct ActivePeriod {
    pub start: Option<u64>,
    pub end: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InformedEntity {
    pub route_id: Option<String>,
    pub stop_id: Option<String>,
    pub direction_id: Option<u32>,
}

/// A service disruption announcement from the feed.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceAlert {
    pub id: String,
    pub header_text: String,
    pub description_text: String,
    pub cause: i32,
    pub effect: i32,
    pub active_periods: Vec<ActivePeriod>,
    pub informed_entities: Vec<InformedEntity>,
    pub url: Option<String>,
}

/// One trip's schedule deviation at one stop. `id` is `trip_id + "_" +
/// stop_id`, stable across polls for the same scheduled stop visit.
#[derive(Debug, Clone, Serialize)]
pub struct DelayUpdate {
    pub id: String,
    pub trip_id: String,
    pub route_id: String,
    pub stop_id: String,
    pub start_date: String,
    pub stop_sequence: u32,
    pub delay_secs: i32,
}

/// Extracts both record kinds from one feed snapshot, applying the line
/// filter and the minimum-delay threshold from `filters`.
pub fn extract(feed: &FeedMessage, filters: &FilterConfig) -> (Vec<ServiceAlert>, Vec<DelayUpdate>) {
    (
        extract_alerts(feed, filters),
        extract_updates(feed, filters),
    )
}

/// Builds a [`ServiceAlert`] for every alert-carrying entity that passes the
/// line filter. Entities without a usable id are skipped.
pub fn extract_alerts(feed: &FeedMessage, filters: &FilterConfig) -> Vec<ServiceAlert> {
    feed.entity
        .iter()
        .filter_map(|entity| {
            let alert = entity.alert.as_ref()?;
            let record = build_alert(entity, alert)?;
            matches_alert_filter(&record, &filters.lines).then_some(record)
        })
        .collect()
}

/// Builds a [`DelayUpdate`] per stop-time update whose effective delay meets
/// the threshold. The effective delay is the arrival delay if present,
/// otherwise the departure delay; a stop update carrying neither is skipped.
pub fn extract_updates(feed: &FeedMessage, filters: &FilterConfig) -> Vec<DelayUpdate> {
    let mut updates = Vec::new();

    for entity in &feed.entity {
        let Some(trip_update) = entity.trip_update.as_ref() else {
            continue;
        };
        let trip = &trip_update.trip;
        let trip_id = trip.trip_id.clone().unwrap_or_default();
        if trip_id.is_empty() {
            debug!(entity = %entity.id, "skipping trip update without trip_id");
            continue;
        }
        let route_id = trip.route_id.clone().unwrap_or_default();

        for stu in &trip_update.stop_time_update {
            let delay = stu
                .arrival
                .as_ref()
                .and_then(|ev| ev.delay)
                .or_else(|| stu.departure.as_ref().and_then(|ev| ev.delay));
            let Some(delay_secs) = delay else {
                continue;
            };
            if delay_secs.abs() < filters.min_delay_secs {
                continue;
            }

            let stop_id = stu.stop_id.clone().unwrap_or_default();
            if stop_id.is_empty() {
                debug!(entity = %entity.id, "skipping stop time update without stop_id");
                continue;
            }
            if !matches_line_filter(&route_id, &filters.lines) {
                continue;
            }

            updates.push(DelayUpdate {
                id: format!("{trip_id}_{stop_id}"),
                trip_id: trip_id.clone(),
                route_id: route_id.clone(),
                stop_id,
                start_date: trip.start_date.clone().unwrap_or_default(),
                stop_sequence: stu.stop_sequence.unwrap_or_default(),
                delay_secs,
            });
        }
    }

    updates
}

fn build_alert(entity: &FeedEntity, alert: &Alert) -> Option<ServiceAlert> {
    if entity.id.is_empty() {
        debug!("skipping alert entity without id");
        return None;
    }

    let url = resolve_text(alert.url.as_ref());

    Some(ServiceAlert {
        id: entity.id.clone(),
        header_text: resolve_text(alert.header_text.as_ref()),
        description_text: resolve_text(alert.description_text.as_ref()),
        cause: alert.cause.unwrap_or(alert::Cause::UnknownCause as i32),
        effect: alert.effect.unwrap_or(alert::Effect::UnknownEffect as i32),
        active_periods: alert
            .active_period
            .iter()
            .map(|p| ActivePeriod {
                start: p.start,
                end: p.end,
            })
            .collect(),
        informed_entities: alert
            .informed_entity
            .iter()
            .map(|e| InformedEntity {
                route_id: e.route_id.clone(),
                stop_id: e.stop_id.clone(),
                direction_id: e.direction_id,
            })
            .collect(),
        url: (!url.is_empty()).then_some(url),
    })
}

/// An empty allow-list keeps everything; otherwise at least one informed
/// entity must name an allowed route.
fn matches_alert_filter(alert: &ServiceAlert, lines: &[String]) -> bool {
    lines.is_empty()
        || alert
            .informed_entities
            .iter()
            .filter_map(|e| e.route_id.as_deref())
            .any(|route| lines.iter().any(|l| l == route))
}

fn matches_line_filter(route_id: &str, lines: &[String]) -> bool {
    lines.is_empty() || lines.iter().any(|l| l == route_id)
}

/// Resolves localized feed text: the preferred language wins, else the first
/// translation, else an empty string. Never fails.
pub(crate) fn resolve_text(text: Option<&TranslatedString>) -> String {
    let Some(text) = text else {
        return String::new();
    };
    text.translation
        .iter()
        .find(|t| t.language.as_deref() == Some(PREFERRED_LANGUAGE))
        .or_else(|| text.translation.first())
        .map(|t| t.text.clone())
        .unwrap_or_default()
}
