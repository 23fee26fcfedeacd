//! Incident and disruption payloads exchanged with the disruption management API.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use ops_console_transit::{DirectionId, RouteIdentifier, RouteType, StopCode, StopGroupIdentifier, StopIdentifier};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IncidentId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisruptionId(pub u64);

/// Which kind of entity a disruption is expressed against
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
pub enum DisruptionType {
    Routes,
    Stops,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    #[default]
    Unknown,
    Minor,
    Serious,
    Headline,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum DisruptionStatus {
    #[default]
    Draft,
    NotStarted,
    InProgress,
    Resolved,
}

/// One affected route, stop, or route-at-stop, flattened the way the API
/// stores it. Which fields are present decides what the entry means.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffectedEntity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_id: Option<RouteIdentifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_short_name: Option<Arc<str>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_type: Option<RouteType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_id: Option<StopIdentifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_code: Option<StopCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_name: Option<Arc<str>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_lon: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction_id: Option<DirectionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<StopGroupIdentifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_name: Option<Arc<str>>,
}

/// Rider-facing mitigation guidance
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workaround {
    /// `all`, `route` or `stop`
    #[serde(rename = "type")]
    pub kind: Arc<str>,
    /// Route short name or stop code the text applies to; empty for `all`
    #[serde(default)]
    pub key: Arc<str>,
    pub workaround: Arc<str>,
}

/// Weekly recurrence for planned disruptions
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrencePatternPayload {
    pub dtstart: NaiveDate,
    pub until: NaiveDate,
    /// Weekdays, 0 = Monday
    pub byweekday: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisruptionPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disruption_id: Option<DisruptionId>,
    pub impact: Arc<str>,
    pub cause: Arc<str>,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub status: DisruptionStatus,
    pub disruption_type: DisruptionType,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub header: Arc<str>,
    #[serde(default)]
    pub description: Arc<str>,
    #[serde(default)]
    pub affected_entities: Vec<AffectedEntity>,
    #[serde(default)]
    pub workarounds: Vec<Workaround>,
    #[serde(default)]
    pub recurrent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence_pattern: Option<RecurrencePatternPayload>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incident_id: Option<IncidentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    pub header: Arc<str>,
    pub cause: Arc<str>,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub status: DisruptionStatus,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub disruptions: Vec<DisruptionPayload>,
}

/// Body returned by `POST /incident` and `PUT /incident`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentSaveResponse {
    pub incident_id: IncidentId,
    pub version: u32,
    #[serde(default)]
    pub create_notification: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisruptionListResponse {
    #[serde(default)]
    pub disruptions: Vec<DisruptionPayload>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentListResponse {
    #[serde(default)]
    pub incidents: Vec<IncidentPayload>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_response_uses_camel_case() {
        let response: IncidentSaveResponse =
            serde_json::from_str(r#"{"incidentId": 1204, "version": 3, "createNotification": true}"#).unwrap();
        assert_eq!(response.incident_id, IncidentId(1204));
        assert_eq!(response.version, 3);
        assert!(response.create_notification);
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(serde_json::to_string(&Severity::Headline).unwrap(), "\"HEADLINE\"");
        assert_eq!(serde_json::to_string(&DisruptionStatus::NotStarted).unwrap(), "\"not-started\"");
        assert_eq!("Stops".parse::<DisruptionType>().unwrap(), DisruptionType::Stops);
        assert_eq!(Severity::Serious.to_string(), "SERIOUS");
    }

    #[test]
    fn test_disruption_payload_parses_minimal_record() {
        let json = r#"{
            "disruptionId": 77,
            "impact": "CANCELLATIONS",
            "cause": "CONGESTION",
            "disruptionType": "Routes",
            "startTime": "2026-10-19T07:00:00Z",
            "header": "Buses cancelled",
            "affectedEntities": [
                {"routeId": "INN-202", "routeShortName": "INN", "routeType": 3},
                {"routeId": "INN-202", "routeShortName": "INN", "routeType": 3, "stopCode": "7036", "directionId": 0}
            ]
        }"#;

        let payload: DisruptionPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.disruption_id, Some(DisruptionId(77)));
        assert_eq!(payload.severity, Severity::Unknown);
        assert_eq!(payload.status, DisruptionStatus::Draft);
        assert!(payload.end_time.is_none());
        assert_eq!(payload.affected_entities.len(), 2);
        assert_eq!(payload.affected_entities[1].stop_code, Some(StopCode::new("7036")));
        assert!(!payload.recurrent);
    }
}
