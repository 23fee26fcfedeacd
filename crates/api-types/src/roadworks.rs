//! Roadworks payloads: worksites, traffic-management layouts, and the CARS
//! feature layer.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorksiteRecord {
    pub worksite_code: Arc<str>,
    #[serde(default)]
    pub worksite_name: Option<Arc<str>>,
    #[serde(default)]
    pub project_start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub project_end_date: Option<DateTime<Utc>>,
    /// Temporary traffic-management plan ids, used to query `/layout`
    #[serde(default)]
    pub tmp_ids: Vec<Arc<str>>,
    /// Fields this console does not interpret but shows verbatim
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutImpact {
    #[serde(default)]
    pub impact_type: Option<Arc<str>>,
    pub geometry: geojson::Geometry,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutRecord {
    pub tmp_id: Arc<str>,
    #[serde(default)]
    pub impacts: Vec<LayoutImpact>,
}

/// Attribute table of one CARS feature. Dates are epoch milliseconds on the wire.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CarsProperties {
    #[serde(default)]
    pub worksite_code: Option<Arc<str>>,
    #[serde(default)]
    pub worksite_name: Option<Arc<str>>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub project_start_date: Option<DateTime<Utc>>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub project_end_date: Option<DateTime<Utc>>,
    #[serde(default, rename = "Shape__Area")]
    pub shape_area: Option<f64>,
}

/// One CARS roadworks polygon as served by `GET /feature`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CarsFeature {
    #[serde(default)]
    pub geometry: Option<geojson::Geometry>,
    #[serde(default)]
    pub properties: CarsProperties,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cars_feature_parses_pascal_case_properties() {
        let json = r#"{
            "type": "Feature",
            "geometry": {"type": "Polygon", "coordinates": [[[174.76, -36.84], [174.77, -36.84], [174.77, -36.85], [174.76, -36.84]]]},
            "properties": {
                "WorksiteCode": "W-1001",
                "ProjectStartDate": 1760832000000,
                "ProjectEndDate": null,
                "Shape__Area": 1520.5
            }
        }"#;

        let feature: CarsFeature = serde_json::from_str(json).unwrap();
        assert_eq!(feature.properties.worksite_code.as_deref(), Some("W-1001"));
        assert_eq!(
            feature.properties.project_start_date.map(|d| d.timestamp_millis()),
            Some(1_760_832_000_000)
        );
        assert!(feature.properties.project_end_date.is_none());
        assert_eq!(feature.properties.shape_area, Some(1520.5));
        assert!(feature.geometry.is_some());
    }

    #[test]
    fn test_worksite_keeps_unknown_fields() {
        let json = r#"{"worksiteCode": "W-1001", "tmpIds": ["T1", "T2"], "contractor": "Downer"}"#;
        let worksite: WorksiteRecord = serde_json::from_str(json).unwrap();
        assert_eq!(worksite.tmp_ids.len(), 2);
        assert_eq!(worksite.extra["contractor"], "Downer");
    }
}
