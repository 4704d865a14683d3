//! # Reading Store Interface
//!
//! Persistence lives outside the engine. The scoring code only needs a narrow,
//! read-only view of past readings, ordered most-recent-first, so that is all
//! [`ReadingStore`] exposes. Any backend (SQL, HTTP, files) can implement it;
//! [`MemoryStore`] is the in-process implementation used by tests and the CLI.

use crate::error::StoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// One processed trap upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PestReading {
    /// Monotonic, assigned by the store.
    pub id: u64,
    /// Submitting user.
    pub owner: String,
    /// Grouping key for community aggregation.
    pub area: String,
    #[serde(default)]
    pub dark_pixel_ratio: f64,
    /// `None` when the upload could not be counted.
    #[serde(default)]
    pub estimated_pest_count: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// One set of field microclimate measurements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MicroclimateReading {
    pub id: u64,
    pub owner: String,
    pub area: String,
    #[serde(default)]
    pub air_temperature: Option<f64>,
    #[serde(default)]
    pub soil_temperature: Option<f64>,
    #[serde(default)]
    pub soil_moisture: Option<f64>,
    #[serde(default)]
    pub relative_humidity: Option<f64>,
    /// Stored level label ("minimal" ... "critical").
    #[serde(default)]
    pub heat_stress_level: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Read-only access to reading history. Every fetch returns at most `limit`
/// rows, most recent first. An empty result is not an error.
pub trait ReadingStore {
    fn pest_readings(
        &self,
        user: &str,
        area: &str,
        limit: usize,
    ) -> Result<Vec<PestReading>, StoreError>;

    fn community_pest_readings(
        &self,
        area: &str,
        limit: usize,
    ) -> Result<Vec<PestReading>, StoreError>;

    fn microclimate_readings(
        &self,
        user: &str,
        area: &str,
        limit: usize,
    ) -> Result<Vec<MicroclimateReading>, StoreError>;

    fn community_microclimate_readings(
        &self,
        area: &str,
        limit: usize,
    ) -> Result<Vec<MicroclimateReading>, StoreError>;

    /// Distinct submitters in the area, over all history.
    fn participant_count(&self, area: &str) -> Result<u64, StoreError>;
}

/// Serialized form of a [`MemoryStore`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub pest_readings: Vec<PestReading>,
    #[serde(default)]
    pub microclimate_readings: Vec<MicroclimateReading>,
}

/// In-memory store. Rows are kept sorted most-recent-first.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pest: Vec<PestReading>,
    microclimate: Vec<MicroclimateReading>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes both tables as-is and sorts each once.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let StoreSnapshot {
            mut pest_readings,
            mut microclimate_readings,
        } = snapshot;
        pest_readings.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        microclimate_readings.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Self {
            pest: pest_readings,
            microclimate: microclimate_readings,
        }
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let contents = fs::read_to_string(path)?;
        let snapshot: StoreSnapshot = serde_json::from_str(&contents)?;
        Ok(Self::from_snapshot(snapshot))
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            pest_readings: self.pest.clone(),
            microclimate_readings: self.microclimate.clone(),
        }
    }

    /// Places a single row at its sorted position.
    pub fn insert_pest(&mut self, reading: PestReading) {
        let key = (reading.created_at, reading.id);
        let at = self.pest.partition_point(|r| (r.created_at, r.id) > key);
        self.pest.insert(at, reading);
    }

    pub fn insert_microclimate(&mut self, reading: MicroclimateReading) {
        let key = (reading.created_at, reading.id);
        let at = self
            .microclimate
            .partition_point(|r| (r.created_at, r.id) > key);
        self.microclimate.insert(at, reading);
    }

    /// Next free id across both tables.
    pub fn next_id(&self) -> u64 {
        let pest = self.pest.iter().map(|r| r.id);
        let micro = self.microclimate.iter().map(|r| r.id);
        pest.chain(micro).max().map_or(1, |id| id + 1)
    }
}

impl ReadingStore for MemoryStore {
    fn pest_readings(
        &self,
        user: &str,
        area: &str,
        limit: usize,
    ) -> Result<Vec<PestReading>, StoreError> {
        Ok(self
            .pest
            .iter()
            .filter(|r| r.owner == user && r.area == area)
            .take(limit)
            .cloned()
            .collect())
    }

    fn community_pest_readings(
        &self,
        area: &str,
        limit: usize,
    ) -> Result<Vec<PestReading>, StoreError> {
        Ok(self
            .pest
            .iter()
            .filter(|r| r.area == area)
            .take(limit)
            .cloned()
            .collect())
    }

    fn microclimate_readings(
        &self,
        user: &str,
        area: &str,
        limit: usize,
    ) -> Result<Vec<MicroclimateReading>, StoreError> {
        Ok(self
            .microclimate
            .iter()
            .filter(|r| r.owner == user && r.area == area)
            .take(limit)
            .cloned()
            .collect())
    }

    fn community_microclimate_readings(
        &self,
        area: &str,
        limit: usize,
    ) -> Result<Vec<MicroclimateReading>, StoreError> {
        Ok(self
            .microclimate
            .iter()
            .filter(|r| r.area == area)
            .take(limit)
            .cloned()
            .collect())
    }

    fn participant_count(&self, area: &str) -> Result<u64, StoreError> {
        let owners: BTreeSet<&str> = self
            .pest
            .iter()
            .filter(|r| r.area == area)
            .map(|r| r.owner.as_str())
            .chain(
                self.microclimate
                    .iter()
                    .filter(|r| r.area == area)
                    .map(|r| r.owner.as_str()),
            )
            .collect();
        Ok(owners.len() as u64)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use chrono::Duration;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn readings_come_back_most_recent_first() {
        let mut store = MemoryStore::new();
        let mut history = pest_history("ana", "KE", &[Some(1), Some(2), Some(3)]);
        history.reverse();
        for reading in history {
            store.insert_pest(reading);
        }

        let fetched = store.pest_readings("ana", "KE", 10).unwrap();
        let counts: Vec<Option<i64>> = fetched.iter().map(|r| r.estimated_pest_count).collect();
        assert_eq!(counts, vec![Some(1), Some(2), Some(3)]);
        assert!(fetched.windows(2).all(|w| w[0].created_at >= w[1].created_at));
    }

    #[test]
    fn limit_and_filters_apply() {
        let mut store = MemoryStore::new();
        for r in pest_history("ana", "KE", &[Some(1); 5]) {
            store.insert_pest(r);
        }
        for r in pest_history("ben", "KE", &[Some(9); 3]) {
            store.insert_pest(r);
        }
        for r in pest_history("cy", "UG", &[Some(4); 2]) {
            store.insert_pest(r);
        }

        assert_eq!(store.pest_readings("ana", "KE", 3).unwrap().len(), 3);
        assert_eq!(store.pest_readings("ana", "UG", 3).unwrap().len(), 0);
        assert_eq!(store.community_pest_readings("KE", 100).unwrap().len(), 8);
        assert_eq!(store.community_pest_readings("KE", 4).unwrap().len(), 4);
        assert_eq!(store.participant_count("KE").unwrap(), 2);
        assert_eq!(store.participant_count("UG").unwrap(), 1);
        assert_eq!(store.participant_count("TZ").unwrap(), 0);
    }

    #[test]
    fn participants_include_microclimate_only_submitters() {
        let mut store = MemoryStore::new();
        for r in pest_history("ana", "KE", &[Some(1)]) {
            store.insert_pest(r);
        }
        store.insert_microclimate(heat_reading(9, "dee", "KE", Some("low"), epoch()));
        let earlier = epoch() - Duration::hours(1);
        store.insert_microclimate(heat_reading(10, "dee", "KE", Some("high"), earlier));
        assert_eq!(store.participant_count("KE").unwrap(), 2);
        assert_eq!(store.community_microclimate_readings("KE", 50).unwrap().len(), 2);
        assert_eq!(store.microclimate_readings("dee", "KE", 1).unwrap()[0].id, 9);
        assert_eq!(store.next_id(), 11);
    }

    #[test]
    fn loads_json_snapshot() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "pest_readings": [
                    {{"id": 1, "owner": "ana", "area": "KE", "estimated_pest_count": 4,
                      "created_at": "2024-06-01T10:00:00Z"}},
                    {{"id": 2, "owner": "ana", "area": "KE", "dark_pixel_ratio": 0.2,
                      "created_at": "2024-06-01T11:00:00Z"}}
                ]
            }}"#
        )
        .unwrap();

        let store = MemoryStore::from_json_file(file.path()).unwrap();
        let readings = store.pest_readings("ana", "KE", 20).unwrap();
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].id, 2);
        assert_eq!(readings[0].estimated_pest_count, None);
        assert_eq!(readings[1].estimated_pest_count, Some(4));
        assert!(store.snapshot().microclimate_readings.is_empty());
    }

    #[test]
    fn oldest_first_snapshot_is_sorted_on_load() {
        let mut pest_readings = pest_history("ana", "KE", &[Some(3), Some(2), Some(1)]);
        pest_readings.reverse();
        let twin = PestReading {
            id: 7,
            ..pest_readings[2].clone()
        };
        pest_readings.push(twin);
        let microclimate_readings = (0..4)
            .map(|i| heat_reading(10 + i, "dee", "KE", None, epoch() + Duration::hours(i as i64)))
            .collect();
        let store = MemoryStore::from_snapshot(StoreSnapshot {
            pest_readings,
            microclimate_readings,
        });

        let ids: Vec<u64> = store
            .community_pest_readings("KE", 10)
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        // Same timestamp breaks ties by id, higher first.
        assert_eq!(ids, vec![7, 3, 2, 1]);

        let heat_ids: Vec<u64> = store
            .community_microclimate_readings("KE", 10)
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(heat_ids, vec![13, 12, 11, 10]);
    }

    #[test]
    fn malformed_snapshot_is_a_store_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[not a snapshot").unwrap();
        assert!(matches!(
            MemoryStore::from_json_file(file.path()),
            Err(StoreError::Json(_))
        ));
        assert!(matches!(
            MemoryStore::from_json_file("/nonexistent/snapshot.json"),
            Err(StoreError::Io(_))
        ));
    }
}
