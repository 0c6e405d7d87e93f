//! Cache of resolved travel costs, keyed by stop pair and service.
//!
//! Shared between the builder's workers; writes are idempotent per key.
//! Optionally persisted as JSON so later runs can skip service calls.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use fxhash::FxHashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::matrix::TravelCost;
use crate::stop::{Coordinate, Stop, StopId};

/// Identity of a cached leg.
///
/// Coordinates are part of the key so an id that moved between runs is never
/// served a stale cost.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub origin: StopId,
    pub destination: StopId,
    pub fingerprint: String,
    coordinates: [u64; 4],
}

impl CacheKey {
    pub fn new(origin: &Stop, destination: &Stop, fingerprint: &str) -> Self {
        Self {
            origin: origin.id().clone(),
            destination: destination.id().clone(),
            fingerprint: fingerprint.to_string(),
            coordinates: coordinate_bits(origin.coordinate(), destination.coordinate()),
        }
    }
}

fn coordinate_bits(origin: Coordinate, destination: Coordinate) -> [u64; 4] {
    [
        origin.lat.to_bits(),
        origin.lng.to_bits(),
        destination.lat.to_bits(),
        destination.lng.to_bits(),
    ]
}

#[derive(Serialize, Deserialize)]
struct CacheEntry {
    key: CacheKey,
    cost: TravelCost,
}

#[derive(Debug, Default)]
pub struct MatrixCache {
    entries: RwLock<FxHashMap<CacheKey, TravelCost>>,
}

impl MatrixCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<TravelCost> {
        self.entries.read().get(key).copied()
    }

    pub fn insert(&self, key: CacheKey, cost: TravelCost) {
        self.entries.write().insert(key, cost);
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Loads a cache file. A missing file yields an empty cache.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            debug!(path = %path.display(), "no matrix cache file, starting empty");
            return Ok(Self::new());
        }

        let file = File::open(path)?;
        let entries: Vec<CacheEntry> = serde_json::from_reader(BufReader::new(file))?;
        debug!(path = %path.display(), entries = entries.len(), "loaded matrix cache");

        let map = entries.into_iter().map(|entry| (entry.key, entry.cost)).collect();
        Ok(Self {
            entries: RwLock::new(map),
        })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut entries = self
            .entries
            .read()
            .iter()
            .map(|(key, cost)| CacheEntry {
                key: key.clone(),
                cost: *cost,
            })
            .collect::<Vec<_>>();
        entries.sort_by(|a, b| {
            (&a.key.fingerprint, &a.key.origin, &a.key.destination).cmp(&(
                &b.key.fingerprint,
                &b.key.origin,
                &b.key.destination,
            ))
        });

        let file = File::create(path.as_ref())?;
        let mut writer = BufWriter::with_capacity(64 * 1024, file);
        serde_json::to_writer(&mut writer, &entries)?;
        writer.flush()?;

        debug!(path = %path.as_ref().display(), entries = entries.len(), "saved matrix cache");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stop(id: &str, lat: f64, lng: f64) -> Stop {
        Stop::new(id, Coordinate { lat, lng }).unwrap()
    }

    #[test]
    fn test_key_depends_on_fingerprint_and_direction() {
        let (a, b) = (stop("a", 7.0, 125.0), stop("b", 7.1, 125.1));
        let cache = MatrixCache::new();
        cache.insert(CacheKey::new(&a, &b, "osrm:car"), TravelCost::new(10.0, 1.0));

        assert!(cache.get(&CacheKey::new(&a, &b, "osrm:car")).is_some());
        assert!(cache.get(&CacheKey::new(&b, &a, "osrm:car")).is_none());
        assert!(cache.get(&CacheKey::new(&a, &b, "osrm:bike")).is_none());
    }

    #[test]
    fn test_moved_stop_misses() {
        let cache = MatrixCache::new();
        let b = stop("b", 7.1, 125.1);
        cache.insert(CacheKey::new(&stop("a", 7.0, 125.0), &b, "x"), TravelCost::ZERO);
        assert!(cache.get(&CacheKey::new(&stop("a", 7.0, 125.2), &b, "x")).is_none());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matrix-cache.json");

        let (a, b) = (stop("a", 7.0, 125.0), stop("b", 7.1, 125.1));
        let cache = MatrixCache::new();
        cache.insert(CacheKey::new(&a, &b, "ors"), TravelCost::new(1500.0, 180.0));
        cache.insert(CacheKey::new(&b, &a, "ors"), TravelCost::new(1650.0, 200.0));
        cache.save(&path).unwrap();

        let loaded = MatrixCache::load(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(
            loaded.get(&CacheKey::new(&b, &a, "ors")),
            Some(TravelCost::new(1650.0, 200.0))
        );
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = MatrixCache::load(dir.path().join("absent.json")).unwrap();
        assert!(cache.is_empty());
    }
}
