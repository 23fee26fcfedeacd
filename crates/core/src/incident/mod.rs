//! Incident drafts edited by the wizard, and their conversion to and from
//! the disruption management API payloads.

pub mod schedule;

use std::{collections::HashSet, sync::Arc};

use api_types::{
    AffectedEntity, DisruptionId, DisruptionPayload, DisruptionStatus, DisruptionType, IncidentId,
    IncidentPayload, IncidentSaveResponse, Severity, Workaround,
};
use chrono::{DateTime, Utc};
use ops_console_transit::{RouteIdentifier, RouteRef, RouteType, StopIdentifier, StopRef};

use crate::affected::{AffectedEntitySet, RouteAffectation, SelectionStep, SelectionWarning};

pub use schedule::{RecurrencePattern, WeekdayFlags};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required.")]
    MissingField(&'static str),

    #[error("The end time must be after the start time.")]
    EndBeforeStart,

    #[error("Disruption {number}: {warning}", number = .index + 1)]
    Selection { index: usize, warning: SelectionWarning },

    #[error("An incident needs at least one disruption.")]
    NoDisruptions,

    #[error("Affected entity {index} has neither a route nor a stop.")]
    MalformedEntity { index: usize },

    #[error("Invalid recurrence: {0}")]
    InvalidRecurrence(String),
}

// ============================================================================
// Affected entities on the wire
// ============================================================================

fn route_fields(route: &RouteRef) -> AffectedEntity {
    AffectedEntity {
        route_id: Some(route.route_id.clone()),
        route_short_name: Some(Arc::clone(&route.route_short_name)),
        route_type: Some(route.route_type),
        ..Default::default()
    }
}

fn with_stop_fields(entity: AffectedEntity, stop: &StopRef) -> AffectedEntity {
    AffectedEntity {
        stop_id: Some(stop.stop_id.clone()),
        stop_code: Some(stop.stop_code.clone()),
        stop_name: Some(Arc::clone(&stop.stop_name)),
        stop_lat: Some(stop.lat),
        stop_lon: Some(stop.lon),
        direction_id: stop.direction_id,
        group_id: stop.group_id.clone(),
        group_name: stop.group_name.clone(),
        ..entity
    }
}

/// Flattens a selection into the API's affected-entity list
pub fn entities_to_payload(set: &AffectedEntitySet) -> Vec<AffectedEntity> {
    let routes = set.affected_routes.iter().map(|affectation| match affectation {
        RouteAffectation::Bare(route) => route_fields(route),
        RouteAffectation::AtStop(route, stop) => with_stop_fields(route_fields(route), stop),
    });
    let stops = set
        .affected_stops
        .iter()
        .map(|stop| with_stop_fields(AffectedEntity::default(), stop));
    routes.chain(stops).collect()
}

fn stop_from_entity(entity: &AffectedEntity) -> Option<StopRef> {
    let stop_code = entity.stop_code.clone()?;
    Some(StopRef {
        stop_id: entity
            .stop_id
            .clone()
            .unwrap_or_else(|| StopIdentifier::new(stop_code.as_str())),
        stop_name: entity.stop_name.clone().unwrap_or_else(|| stop_code.as_str().into()),
        lat: entity.stop_lat.unwrap_or_default(),
        lon: entity.stop_lon.unwrap_or_default(),
        direction_id: entity.direction_id,
        group_id: entity.group_id.clone(),
        group_name: entity.group_name.clone(),
        stop_code,
    })
}

fn route_from_entity(entity: &AffectedEntity, route_id: &RouteIdentifier) -> RouteRef {
    let short_name = entity
        .route_short_name
        .clone()
        .unwrap_or_else(|| route_id.as_str().into());
    RouteRef::new(
        route_id.clone(),
        short_name,
        entity.route_type.unwrap_or(RouteType::Bus),
    )
}

/// Rebuilds a selection from a saved affected-entity list.
///
/// Entries with a route become route affectations (stop-qualified when they
/// also carry a stop), the rest become affected stops. A bare entry is
/// dropped when the same route also has stop-qualified entries.
pub fn entities_from_payload(entities: &[AffectedEntity]) -> Result<AffectedEntitySet, ValidationError> {
    let mut set = AffectedEntitySet::new();
    for (index, entity) in entities.iter().enumerate() {
        match (&entity.route_id, stop_from_entity(entity)) {
            (Some(route_id), Some(stop)) => set
                .affected_routes
                .push(RouteAffectation::AtStop(route_from_entity(entity, route_id), stop)),
            (Some(route_id), None) => set
                .affected_routes
                .push(RouteAffectation::Bare(route_from_entity(entity, route_id))),
            (None, Some(stop)) => set.affected_stops.push(stop),
            (None, None) => return Err(ValidationError::MalformedEntity { index }),
        }
    }

    let qualified: HashSet<RouteIdentifier> = set
        .affected_routes
        .iter()
        .filter(|a| !a.is_bare())
        .map(|a| a.route_id().clone())
        .collect();
    let mut seen = HashSet::new();
    set.affected_routes
        .retain(|a| !(a.is_bare() && qualified.contains(a.route_id())) && seen.insert(a.key()));

    let mut seen = HashSet::new();
    set.affected_stops.retain(|stop| seen.insert(stop.key()));

    Ok(set)
}

// ============================================================================
// Drafts
// ============================================================================

/// One effect of an incident as edited in the wizard
#[derive(Clone, Debug, PartialEq)]
pub struct DisruptionDraft {
    pub disruption_id: Option<DisruptionId>,
    pub impact: String,
    /// Falls back to the incident's cause when empty
    pub cause: String,
    pub severity: Severity,
    pub status: DisruptionStatus,
    pub disruption_type: DisruptionType,
    /// Falls back to the incident's window when unset
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub header: String,
    pub description: String,
    pub selection: SelectionStep,
    pub workarounds: Vec<Workaround>,
    pub recurrence: Option<RecurrencePattern>,
}

impl DisruptionDraft {
    pub fn new(disruption_type: DisruptionType, max_entities: usize) -> Self {
        Self {
            disruption_id: None,
            impact: String::new(),
            cause: String::new(),
            severity: Severity::default(),
            status: DisruptionStatus::default(),
            disruption_type,
            start_time: None,
            end_time: None,
            header: String::new(),
            description: String::new(),
            selection: SelectionStep::new(max_entities),
            workarounds: Vec::new(),
            recurrence: None,
        }
    }

    fn to_payload(&self, index: usize, incident: &IncidentDraft) -> Result<DisruptionPayload, ValidationError> {
        if self.impact.trim().is_empty() {
            return Err(ValidationError::MissingField("Impact"));
        }
        self.selection
            .check()
            .map_err(|warning| ValidationError::Selection { index, warning })?;

        let start_time = self
            .start_time
            .or(incident.start_time)
            .ok_or(ValidationError::MissingField("Start time"))?;
        let end_time = self.end_time.or(incident.end_time);
        check_window(start_time, end_time)?;

        if let Some(recurrence) = &self.recurrence {
            recurrence.validate()?;
        }

        let header = non_empty_or(&self.header, &incident.header);
        let cause = non_empty_or(&self.cause, &incident.cause);

        Ok(DisruptionPayload {
            disruption_id: self.disruption_id,
            impact: self.impact.trim().into(),
            cause: cause.into(),
            severity: self.severity,
            status: self.status,
            disruption_type: self.disruption_type,
            start_time,
            end_time,
            header: header.into(),
            description: self.description.as_str().into(),
            affected_entities: entities_to_payload(self.selection.entities()),
            workarounds: self.workarounds.clone(),
            recurrent: self.recurrence.is_some(),
            recurrence_pattern: self.recurrence.as_ref().map(RecurrencePattern::to_payload),
        })
    }

    fn from_payload(payload: &DisruptionPayload, max_entities: usize) -> Result<Self, ValidationError> {
        let entities = entities_from_payload(&payload.affected_entities)?;
        let recurrence = match (&payload.recurrence_pattern, payload.recurrent) {
            (Some(pattern), true) => Some(RecurrencePattern::from_payload(pattern)?),
            _ => None,
        };

        Ok(Self {
            disruption_id: payload.disruption_id,
            impact: payload.impact.to_string(),
            cause: payload.cause.to_string(),
            severity: payload.severity,
            status: payload.status,
            disruption_type: payload.disruption_type,
            start_time: Some(payload.start_time),
            end_time: payload.end_time,
            header: payload.header.to_string(),
            description: payload.description.to_string(),
            selection: SelectionStep::with_entities(entities, max_entities),
            workarounds: payload.workarounds.clone(),
            recurrence,
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct IncidentDraft {
    pub incident_id: Option<IncidentId>,
    pub version: Option<u32>,
    pub header: String,
    pub cause: String,
    pub status: DisruptionStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub disruptions: Vec<DisruptionDraft>,
}

impl IncidentDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_new(&self) -> bool {
        self.incident_id.is_none()
    }

    pub fn add_disruption(&mut self, disruption: DisruptionDraft) -> usize {
        self.disruptions.push(disruption);
        self.disruptions.len() - 1
    }

    pub fn remove_disruption(&mut self, index: usize) -> Option<DisruptionDraft> {
        (index < self.disruptions.len()).then(|| self.disruptions.remove(index))
    }

    /// Highest severity across the incident's disruptions
    pub fn severity(&self) -> Severity {
        self.disruptions
            .iter()
            .map(|d| d.severity)
            .max()
            .unwrap_or_default()
    }

    /// Validates the draft and builds the body of `POST`/`PUT /incident`.
    pub fn to_payload(&self) -> Result<IncidentPayload, ValidationError> {
        if self.header.trim().is_empty() {
            return Err(ValidationError::MissingField("Header"));
        }
        if self.cause.trim().is_empty() {
            return Err(ValidationError::MissingField("Cause"));
        }
        let start_time = self.start_time.ok_or(ValidationError::MissingField("Start time"))?;
        check_window(start_time, self.end_time)?;

        if self.disruptions.is_empty() {
            return Err(ValidationError::NoDisruptions);
        }
        let disruptions = self
            .disruptions
            .iter()
            .enumerate()
            .map(|(index, disruption)| disruption.to_payload(index, self))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(IncidentPayload {
            incident_id: self.incident_id,
            version: self.version,
            header: self.header.trim().into(),
            cause: self.cause.trim().into(),
            severity: self.severity(),
            status: self.status,
            start_time,
            end_time: self.end_time,
            disruptions,
        })
    }

    /// Rebuilds a draft from a fetched incident for editing
    pub fn from_record(record: &IncidentPayload, max_entities: usize) -> Result<Self, ValidationError> {
        let disruptions = record
            .disruptions
            .iter()
            .map(|payload| DisruptionDraft::from_payload(payload, max_entities))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            incident_id: record.incident_id,
            version: record.version,
            header: record.header.to_string(),
            cause: record.cause.to_string(),
            status: record.status,
            start_time: Some(record.start_time),
            end_time: record.end_time,
            disruptions,
        })
    }

    /// Records the identity assigned by the server after a save
    pub fn apply_save_response(&mut self, response: &IncidentSaveResponse) {
        self.incident_id = Some(response.incident_id);
        self.version = Some(response.version);
    }
}

fn check_window(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Result<(), ValidationError> {
    match end {
        Some(end) if end <= start => Err(ValidationError::EndBeforeStart),
        _ => Ok(()),
    }
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    match value.trim() {
        "" => fallback.trim(),
        trimmed => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Weekday};
    use ops_console_transit::{DirectionId, StopCode};

    use super::*;
    use crate::affected::{
        fixtures::{directed_stop, group_stop, route, stop},
        toggle_route_stop,
    };

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 7, 0, 0).unwrap()
    }

    fn disruption(set: AffectedEntitySet) -> DisruptionDraft {
        let mut draft = DisruptionDraft::new(DisruptionType::Routes, 200);
        draft.impact = "CANCELLATIONS".into();
        draft.severity = Severity::Minor;
        draft.selection = SelectionStep::with_entities(set, 200);
        draft
    }

    fn incident(disruptions: Vec<DisruptionDraft>) -> IncidentDraft {
        IncidentDraft {
            header: "Inner Link diverted".into(),
            cause: "ROADWORKS".into(),
            start_time: Some(start()),
            end_time: Some(start() + Duration::hours(4)),
            disruptions,
            ..Default::default()
        }
    }

    fn mixed_selection() -> AffectedEntitySet {
        let inn = route("INN-202", "INN");
        let routes = toggle_route_stop(
            &[RouteAffectation::Bare(inn.clone())],
            &inn,
            &directed_stop("7036", DirectionId::Outbound),
            true,
        );
        AffectedEntitySet {
            affected_routes: [routes, vec![RouteAffectation::Bare(route("NX1-203", "NX1"))]].concat(),
            affected_stops: vec![stop("8500"), group_stop("7037", "1")],
        }
    }

    #[test]
    fn test_entities_flatten_and_rebuild() {
        let set = mixed_selection();
        let entities = entities_to_payload(&set);
        assert_eq!(entities.len(), 4);

        let at_stop = &entities[0];
        assert_eq!(at_stop.route_short_name.as_deref(), Some("INN"));
        assert_eq!(at_stop.stop_code, Some(StopCode::new("7036")));
        assert_eq!(at_stop.direction_id, Some(DirectionId::Outbound));

        assert!(entities[1].stop_code.is_none());
        assert!(entities[2].route_id.is_none());
        assert!(entities[3].group_id.is_some());

        assert_eq!(entities_from_payload(&entities).unwrap(), set);
    }

    #[test]
    fn test_rebuild_drops_bare_entry_next_to_qualified_ones() {
        let inn = route("INN-202", "INN");
        let entities = vec![
            route_fields(&inn),
            with_stop_fields(route_fields(&inn), &stop("7036")),
        ];
        let set = entities_from_payload(&entities).unwrap();
        assert_eq!(set.affected_routes.len(), 1);
        assert!(!set.affected_routes[0].is_bare());
        assert!(set.is_consistent());
    }

    #[test]
    fn test_malformed_entity_is_rejected() {
        let entities = vec![route_fields(&route("R1", "INN")), AffectedEntity::default()];
        assert_eq!(
            entities_from_payload(&entities),
            Err(ValidationError::MalformedEntity { index: 1 })
        );
    }

    #[test]
    fn test_payload_round_trip() {
        let mut effect = disruption(mixed_selection());
        effect.recurrence = Some(RecurrencePattern::new(
            start().date_naive(),
            start().date_naive() + Duration::days(14),
            [Weekday::Mon, Weekday::Tue],
        ));
        let mut draft = incident(vec![effect]);
        draft.apply_save_response(&IncidentSaveResponse {
            incident_id: IncidentId(1204),
            version: 2,
            create_notification: false,
        });

        let payload = draft.to_payload().unwrap();
        assert_eq!(payload.incident_id, Some(IncidentId(1204)));
        assert_eq!(payload.disruptions[0].header.as_ref(), "Inner Link diverted");
        assert_eq!(payload.disruptions[0].cause.as_ref(), "ROADWORKS");
        assert!(payload.disruptions[0].recurrent);

        let json = serde_json::to_string(&payload).unwrap();
        let parsed: IncidentPayload = serde_json::from_str(&json).unwrap();
        let rebuilt = IncidentDraft::from_record(&parsed, 200).unwrap();

        assert_eq!(rebuilt.version, Some(2));
        let effect = &rebuilt.disruptions[0];
        assert_eq!(effect.selection.entities(), &mixed_selection());
        assert_eq!(effect.recurrence, draft.disruptions[0].recurrence);
        assert_eq!(effect.start_time, Some(start()));
    }

    #[test]
    fn test_incident_severity_is_highest_of_its_disruptions() {
        let mut serious = disruption(mixed_selection());
        serious.severity = Severity::Serious;
        let draft = incident(vec![disruption(mixed_selection()), serious]);
        assert_eq!(draft.to_payload().unwrap().severity, Severity::Serious);
    }

    #[test]
    fn test_required_fields() {
        let mut draft = incident(vec![disruption(mixed_selection())]);
        draft.header = "  ".into();
        assert_eq!(draft.to_payload(), Err(ValidationError::MissingField("Header")));

        let mut draft = incident(vec![]);
        assert_eq!(draft.to_payload(), Err(ValidationError::NoDisruptions));

        draft.end_time = Some(start() - Duration::minutes(5));
        assert_eq!(draft.to_payload(), Err(ValidationError::EndBeforeStart));

        let mut effect = disruption(mixed_selection());
        effect.impact.clear();
        assert_eq!(
            incident(vec![effect]).to_payload(),
            Err(ValidationError::MissingField("Impact"))
        );
    }

    #[test]
    fn test_selection_warnings_name_the_disruption() {
        let stops = (0..201).map(|i| stop(&format!("{i:04}"))).collect();
        let draft = incident(vec![
            disruption(mixed_selection()),
            disruption(AffectedEntitySet {
                affected_routes: vec![],
                affected_stops: stops,
            }),
        ]);

        let err = draft.to_payload().unwrap_err();
        assert_eq!(
            err,
            ValidationError::Selection {
                index: 1,
                warning: SelectionWarning::TooManyEntities { total: 201, max: 200 },
            }
        );
        let message = err.to_string();
        assert!(message.starts_with("Disruption 2:"));
        assert!(message.contains("201"));
    }

    #[test]
    fn test_remove_disruption() {
        let mut draft = incident(vec![]);
        assert_eq!(draft.add_disruption(disruption(mixed_selection())), 0);
        assert!(draft.remove_disruption(3).is_none());
        assert!(draft.remove_disruption(0).is_some());
        assert!(draft.is_new());
    }
}
