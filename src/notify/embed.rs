//! Discord embed payloads for novel records.

use chrono::Utc;
use serde::Serialize;

use crate::extract::{DelayUpdate, ServiceAlert};

const COLOR_LATE: u32 = 0xFF9800;
const COLOR_EARLY: u32 = 0x4CAF50;
const COLOR_FALLBACK: u32 = 0x808080;

#[derive(Debug, Clone, Serialize)]
pub struct Embed {
    pub color: u32,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

pub fn alert_embed(alert: &ServiceAlert) -> Embed {
    let mut fields = Vec::new();

    let routes = alert
        .informed_entities
        .iter()
        .filter_map(|e| e.route_id.as_deref())
        .collect::<Vec<_>>()
        .join(", ");
    if !routes.is_empty() {
        fields.push(EmbedField {
            name: "Betroffene Linien".to_string(),
            value: routes,
            inline: false,
        });
    }

    Embed {
        color: effect_color(alert.effect),
        title: format!("⚠️ {}", alert.header_text),
        description: Some(if alert.description_text.is_empty() {
            "Keine Details verfügbar".to_string()
        } else {
            alert.description_text.clone()
        }),
        timestamp: Utc::now().to_rfc3339(),
        fields,
    }
}

pub fn update_embed(update: &DelayUpdate) -> Embed {
    let route = if update.route_id.is_empty() {
        "Unbekannt"
    } else {
        &update.route_id
    };

    Embed {
        color: if update.delay_secs > 0 {
            COLOR_LATE
        } else {
            COLOR_EARLY
        },
        title: format!("🚇 Verspätung auf Linie {route}"),
        description: None,
        timestamp: Utc::now().to_rfc3339(),
        fields: vec![
            EmbedField {
                name: "Verspätung".to_string(),
                value: format_delay(update.delay_secs),
                inline: true,
            },
            EmbedField {
                name: "Haltestelle".to_string(),
                value: update.stop_id.clone(),
                inline: true,
            },
        ],
    }
}

/// Renders a delay as signed whole minutes, e.g. `+7 Min` / `-2 Min`.
pub fn format_delay(delay_secs: i32) -> String {
    let minutes = delay_secs.abs() / 60;
    let sign = if delay_secs >= 0 { '+' } else { '-' };
    format!("{sign}{minutes} Min")
}

/// Maps GTFS-RT effect codes to embed colors, grey for anything unmapped.
fn effect_color(effect: i32) -> u32 {
    match effect {
        1 => 0xFF0000, // NO_SERVICE
        2 => 0xFF9800, // REDUCED_SERVICE
        3 => 0xFFC107, // SIGNIFICANT_DELAYS
        4 => 0x2196F3, // DETOUR
        5 => 0x9C27B0, // ADDITIONAL_SERVICE
        6 => 0x795548, // MODIFIED_SERVICE
        7 => 0xF44336, // OTHER_EFFECT
        8 => 0x000000, // UNKNOWN_EFFECT
        _ => COLOR_FALLBACK,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::InformedEntity;

    fn alert_with_routes(routes: &[Option<&str>]) -> ServiceAlert {
        ServiceAlert {
            id: "A1".to_string(),
            header_text: "Signalstörung".to_string(),
            description_text: String::new(),
            cause: 3,
            effect: 3,
            active_periods: vec![],
            informed_entities: routes
                .iter()
                .map(|r| InformedEntity {
                    route_id: r.map(str::to_string),
                    stop_id: None,
                    direction_id: None,
                })
                .collect(),
            url: None,
        }
    }

    fn update(delay_secs: i32, route_id: &str) -> DelayUpdate {
        DelayUpdate {
            id: "t1_s1".to_string(),
            trip_id: "t1".to_string(),
            route_id: route_id.to_string(),
            stop_id: "s1".to_string(),
            start_date: "20260807".to_string(),
            stop_sequence: 1,
            delay_secs,
        }
    }

    #[test]
    fn test_format_delay_truncates_to_minutes() {
        assert_eq!(format_delay(420), "+7 Min");
        assert_eq!(format_delay(300), "+5 Min");
        assert_eq!(format_delay(359), "+5 Min");
        assert_eq!(format_delay(-120), "-2 Min");
        assert_eq!(format_delay(0), "+0 Min");
    }

    #[test]
    fn test_alert_embed_lists_affected_routes() {
        let embed = alert_embed(&alert_with_routes(&[Some("100"), None, Some("S7")]));
        assert_eq!(embed.title, "⚠️ Signalstörung");
        assert_eq!(embed.fields.len(), 1);
        assert_eq!(embed.fields[0].name, "Betroffene Linien");
        assert_eq!(embed.fields[0].value, "100, S7");
        assert_eq!(embed.color, 0xFFC107);
    }

    #[test]
    fn test_alert_embed_without_routes_or_description() {
        let embed = alert_embed(&alert_with_routes(&[None]));
        assert!(embed.fields.is_empty());
        assert_eq!(embed.description.as_deref(), Some("Keine Details verfügbar"));
    }

    #[test]
    fn test_unknown_effect_code_gets_fallback_color() {
        let mut alert = alert_with_routes(&[]);
        alert.effect = 42;
        assert_eq!(alert_embed(&alert).color, COLOR_FALLBACK);
    }

    #[test]
    fn test_update_embed_colors_by_sign() {
        assert_eq!(update_embed(&update(600, "100")).color, COLOR_LATE);
        assert_eq!(update_embed(&update(-600, "100")).color, COLOR_EARLY);
    }

    #[test]
    fn test_update_embed_unknown_route() {
        let embed = update_embed(&update(600, ""));
        assert_eq!(embed.title, "🚇 Verspätung auf Linie Unbekannt");
    }
}
