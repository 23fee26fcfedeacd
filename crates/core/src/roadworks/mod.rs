//! Roadworks overlay: worksite details and the CARS feature layer.

pub mod cache;

use std::{cmp::Ordering, sync::Arc, time::Duration};

use api_types::{CarsFeature, LayoutRecord, WorksiteRecord};
use chrono::{DateTime, Days, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Utc};
use geo::Contains;
use geojson::Value;
use strum::{Display, EnumString};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{ConsoleFuture, Result};

pub use cache::{RoadworksCache, SessionStorage};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString)]
pub enum CarActivation {
    Activated,
    Deactivated,
}

/// A worksite is active from its start until its end; without a start it
/// never is.
pub fn check_car_activation(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> CarActivation {
    match (start, end) {
        (Some(start), _) if start > now => CarActivation::Deactivated,
        (Some(_), Some(end)) if now > end => CarActivation::Deactivated,
        (Some(_), _) => CarActivation::Activated,
        (None, _) => CarActivation::Deactivated,
    }
}

fn local_instant<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime, earliest: bool) -> DateTime<Utc> {
    let local = tz.from_local_datetime(&naive);
    let resolved = if earliest { local.earliest() } else { local.latest() };
    resolved
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| naive.and_utc())
}

/// `[start of yesterday, end of tomorrow]` in the timezone of `now`
pub fn today_window<Tz: TimeZone>(now: &DateTime<Tz>) -> (DateTime<Utc>, DateTime<Utc>) {
    let today = now.date_naive();
    let tz = now.timezone();
    let yesterday = today.checked_sub_days(Days::new(1)).unwrap_or(NaiveDate::MIN);
    let day_after_tomorrow = today.checked_add_days(Days::new(2)).unwrap_or(NaiveDate::MAX);

    (
        local_instant(&tz, midnight(yesterday), true),
        local_instant(&tz, midnight(day_after_tomorrow) - TimeDelta::milliseconds(1), false),
    )
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(0, 0, 0).unwrap_or_default()
}

/// Keeps the cars whose project window overlaps yesterday through tomorrow.
/// A car without an end date runs indefinitely; one without a start date
/// never overlaps.
pub fn filter_cars_by_date<Tz: TimeZone>(
    cars: &[CarsFeature],
    filter_by_today: bool,
    now: &DateTime<Tz>,
) -> Vec<CarsFeature> {
    if !filter_by_today {
        return cars.to_vec();
    }

    let (from, to) = today_window(now);
    cars.iter()
        .filter(|car| {
            let props = &car.properties;
            let Some(start) = props.project_start_date else {
                return false;
            };
            start <= to && props.project_end_date.is_none_or(|end| end >= from)
        })
        .cloned()
        .collect()
}

fn swap_position(mut position: Vec<f64>) -> Vec<f64> {
    if position.len() >= 2 {
        position.swap(0, 1);
    }
    position
}

fn swap_rings(rings: &[Vec<Vec<f64>>]) -> Vec<Vec<Vec<f64>>> {
    rings
        .iter()
        .map(|ring| ring.iter().cloned().map(swap_position).collect())
        .collect()
}

/// Flips polygon rings from GeoJSON `[lon, lat]` to `[lat, lon]` for the map
/// layer. Other geometry kinds are returned unchanged.
pub fn remap_coordinates(geometry: &geojson::Geometry) -> geojson::Geometry {
    let value = match &geometry.value {
        Value::Polygon(rings) => Value::Polygon(swap_rings(rings)),
        Value::MultiPolygon(polygons) => {
            Value::MultiPolygon(polygons.iter().map(|rings| swap_rings(rings)).collect())
        }
        other => other.clone(),
    };
    geojson::Geometry::new(value)
}

/// Largest area first so small worksites are drawn, and hit, on top.
/// Features without an area go last.
pub fn sort_by_area_desc(cars: &mut [CarsFeature]) {
    cars.sort_by(|a, b| match (a.properties.shape_area, b.properties.shape_area) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

// ============================================================================
// Overlay
// ============================================================================

#[derive(Clone, Debug)]
pub struct CarsOverlayFeature {
    pub worksite_code: Option<Arc<str>>,
    pub worksite_name: Option<Arc<str>>,
    pub activation: CarActivation,
    pub shape_area: Option<f64>,
    /// `[lat, lon]` ordered, ready for the map layer
    pub geometry: Option<geojson::Geometry>,
    footprint: Option<geo::Geometry<f64>>,
}

impl CarsOverlayFeature {
    fn from_feature(feature: CarsFeature, now: DateTime<Utc>) -> Self {
        let props = feature.properties;
        let footprint = feature
            .geometry
            .as_ref()
            .and_then(|g| geo::Geometry::<f64>::try_from(g.value.clone()).ok());
        Self {
            activation: check_car_activation(props.project_start_date, props.project_end_date, now),
            worksite_code: props.worksite_code,
            worksite_name: props.worksite_name,
            shape_area: props.shape_area,
            geometry: feature.geometry.as_ref().map(remap_coordinates),
            footprint,
        }
    }

    /// Whether the footprint covers `(lon, lat)`
    pub fn covers(&self, lon: f64, lat: f64) -> bool {
        self.footprint
            .as_ref()
            .is_some_and(|shape| shape.contains(&geo::Point::new(lon, lat)))
    }
}

/// Filtered, sorted and remapped CARS features in draw order
pub fn prepare_overlay<Tz: TimeZone>(
    cars: &[CarsFeature],
    filter_by_today: bool,
    now: &DateTime<Tz>,
) -> Vec<CarsOverlayFeature> {
    let mut cars = filter_cars_by_date(cars, filter_by_today, now);
    sort_by_area_desc(&mut cars);
    let now = now.with_timezone(&Utc);
    cars.into_iter()
        .map(|car| CarsOverlayFeature::from_feature(car, now))
        .collect()
}

/// The feature drawn on top at a point, i.e. the last one covering it
pub fn feature_at(overlay: &[CarsOverlayFeature], lon: f64, lat: f64) -> Option<&CarsOverlayFeature> {
    overlay.iter().rev().find(|feature| feature.covers(lon, lat))
}

// ============================================================================
// Service
// ============================================================================

/// Remote roadworks endpoints
pub trait RoadworksSource: Send + Sync {
    fn fetch_worksite<'a>(
        &'a self,
        worksite_code: &'a str,
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> ConsoleFuture<'a, WorksiteRecord>;

    fn fetch_layouts<'a>(
        &'a self,
        tmp_ids: &'a [Arc<str>],
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> ConsoleFuture<'a, Vec<LayoutRecord>>;

    fn fetch_cars_features(&self) -> ConsoleFuture<'_, Vec<CarsFeature>>;
}

#[derive(Clone, Debug, PartialEq)]
pub struct WorksiteDetail {
    pub worksite: WorksiteRecord,
    pub layouts: Vec<LayoutRecord>,
}

pub struct RoadworksService<S> {
    source: S,
    cache: Mutex<RoadworksCache>,
}

impl<S: RoadworksSource> RoadworksService<S> {
    pub fn new(source: S, cache_expiry: Duration) -> Self {
        Self {
            source,
            cache: Mutex::new(RoadworksCache::new(cache_expiry)),
        }
    }

    /// CARS features, from the session cache unless stale or `force_fetch`
    pub async fn cars_features(&self, force_fetch: bool, now: DateTime<Utc>) -> Result<Vec<CarsFeature>> {
        if !force_fetch {
            if let Some(cached) = self.cache.lock().await.get(now) {
                debug!(count = cached.len(), "Using cached CARS features");
                return Ok(cached);
            }
        }

        let features = self.source.fetch_cars_features().await.inspect_err(|e| {
            warn!("Fetching CARS features failed: {e}");
        })?;
        self.cache.lock().await.put(&features, now)?;
        debug!(count = features.len(), force_fetch, "Fetched CARS features");
        Ok(features)
    }

    pub async fn overlay<Tz: TimeZone>(
        &self,
        force_fetch: bool,
        filter_by_today: bool,
        now: &DateTime<Tz>,
    ) -> Result<Vec<CarsOverlayFeature>> {
        let features = self.cars_features(force_fetch, now.with_timezone(&Utc)).await?;
        Ok(prepare_overlay(&features, filter_by_today, now))
    }

    /// A worksite with the traffic-management layouts of its plans
    pub async fn worksite_detail(
        &self,
        worksite_code: &str,
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> Result<WorksiteDetail> {
        let worksite = self.source.fetch_worksite(worksite_code, date_from, date_to).await?;
        let layouts = if worksite.tmp_ids.is_empty() {
            Vec::new()
        } else {
            self.source
                .fetch_layouts(&worksite.tmp_ids, date_from, date_to)
                .await?
        };
        Ok(WorksiteDetail { worksite, layouts })
    }
}
