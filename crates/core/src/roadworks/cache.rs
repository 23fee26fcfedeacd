//! Session-scoped cache of the CARS feature layer.

use std::{collections::HashMap, time::Duration};

use api_types::CarsFeature;
use chrono::{DateTime, Utc};
use tracing::warn;

use crate::error::Result;

pub const CARS_FEATURES_KEY: &str = "carsFeatures";
pub const CARS_FETCHED_AT_KEY: &str = "carsFeaturesFetchedAt";

/// String key/value storage that lives as long as the operator's session
#[derive(Clone, Debug, Default)]
pub struct SessionStorage {
    items: HashMap<String, String>,
}

impl SessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.items.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.items.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.items.remove(key)
    }
}

#[derive(Clone, Debug)]
pub struct RoadworksCache {
    storage: SessionStorage,
    expiry: Duration,
}

impl RoadworksCache {
    pub fn new(expiry: Duration) -> Self {
        Self::with_storage(SessionStorage::new(), expiry)
    }

    pub fn with_storage(storage: SessionStorage, expiry: Duration) -> Self {
        Self { storage, expiry }
    }

    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        let millis = self.storage.get(CARS_FETCHED_AT_KEY)?.parse().ok()?;
        DateTime::from_timestamp_millis(millis)
    }

    /// Cached features, unless missing, unreadable or older than the expiry
    pub fn get(&self, now: DateTime<Utc>) -> Option<Vec<CarsFeature>> {
        let fetched_at = self.fetched_at()?;
        let fresh = match now.signed_duration_since(fetched_at).to_std() {
            Ok(age) => age < self.expiry,
            // Stamped in the future, i.e. the clock moved backwards
            Err(_) => true,
        };
        if !fresh {
            return None;
        }

        let raw = self.storage.get(CARS_FEATURES_KEY)?;
        match serde_json::from_str(raw) {
            Ok(features) => Some(features),
            Err(e) => {
                warn!("Discarding unreadable CARS cache entry: {e}");
                None
            }
        }
    }

    pub fn put(&mut self, features: &[CarsFeature], now: DateTime<Utc>) -> Result<()> {
        let raw = serde_json::to_string(features)?;
        self.storage.set(CARS_FEATURES_KEY, raw);
        self.storage.set(CARS_FETCHED_AT_KEY, now.timestamp_millis().to_string());
        Ok(())
    }

    pub fn invalidate(&mut self) {
        self.storage.remove(CARS_FEATURES_KEY);
        self.storage.remove(CARS_FETCHED_AT_KEY);
    }
}

#[cfg(test)]
mod tests {
    use api_types::CarsProperties;
    use chrono::{TimeDelta, TimeZone};

    use super::*;

    fn feature(code: &str) -> CarsFeature {
        CarsFeature {
            geometry: None,
            properties: CarsProperties {
                worksite_code: Some(code.into()),
                ..Default::default()
            },
        }
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_entries_expire_after_fifteen_minutes() {
        let mut cache = RoadworksCache::new(Duration::from_secs(15 * 60));
        assert!(cache.get(noon()).is_none());

        cache.put(&[feature("W-1")], noon()).unwrap();
        assert_eq!(cache.fetched_at(), Some(noon()));
        assert_eq!(cache.get(noon() + TimeDelta::minutes(14)).unwrap().len(), 1);
        assert!(cache.get(noon() + TimeDelta::minutes(15)).is_none());
        assert!(cache.get(noon() + TimeDelta::hours(2)).is_none());
    }

    #[test]
    fn test_corrupt_entry_is_a_miss() {
        let mut storage = SessionStorage::new();
        storage.set(CARS_FEATURES_KEY, "{not json");
        storage.set(CARS_FETCHED_AT_KEY, noon().timestamp_millis().to_string());
        let cache = RoadworksCache::with_storage(storage, Duration::from_secs(900));
        assert!(cache.get(noon()).is_none());
    }

    #[test]
    fn test_invalidate() {
        let mut cache = RoadworksCache::new(Duration::from_secs(900));
        cache.put(&[feature("W-1")], noon()).unwrap();
        cache.invalidate();
        assert!(cache.get(noon()).is_none());
        assert!(cache.fetched_at().is_none());
    }
}
