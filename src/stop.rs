//! Stop registry: coordinates, stops and the validated stop set of a run.

use std::fmt;

use fxhash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::error::{PlannerError, Result};
use crate::records::DeliveryRecord;

/// Identifier of a stop, unique within a run.
///
/// Ordering is lexicographic and is used as the deterministic tie-break
/// during route construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StopId(String);

impl StopId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for StopId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for StopId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for StopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    /// Creates a coordinate, rejecting non-finite or out-of-range values.
    pub fn new(lat: f64, lng: f64) -> Result<Self> {
        let coordinate = Self { lat, lng };
        coordinate.validate()?;
        Ok(coordinate)
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    pub fn validate(&self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(PlannerError::invalid_input(format!(
                "coordinate ({}, {}) is outside lat [-90, 90] / lng [-180, 180]",
                self.lat, self.lng
            )))
        }
    }
}

/// A delivery location. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stop {
    pub(crate) id: StopId,
    pub(crate) coordinate: Coordinate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) zone: Option<String>,
    /// Parcels to drop here; unknown counts as one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) parcels: Option<u32>,
}

impl Stop {
    pub fn new(id: impl Into<StopId>, coordinate: Coordinate) -> Result<Self> {
        let id = id.into();
        if id.as_str().trim().is_empty() {
            return Err(PlannerError::invalid_input("stop identifier is empty"));
        }
        coordinate.validate().map_err(|err| err.with_context(&format!("stop {id}")))?;
        Ok(Self {
            id,
            coordinate,
            label: None,
            zone: None,
            parcels: None,
        })
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_zone(mut self, zone: impl Into<String>) -> Self {
        self.zone = Some(zone.into());
        self
    }

    pub fn with_parcels(mut self, parcels: u32) -> Self {
        self.parcels = Some(parcels);
        self
    }

    pub fn id(&self) -> &StopId {
        &self.id
    }

    pub fn coordinate(&self) -> Coordinate {
        self.coordinate
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn zone(&self) -> Option<&str> {
        self.zone.as_deref()
    }

    pub fn parcels(&self) -> Option<u32> {
        self.parcels
    }

    /// Parcel count used for load figures.
    pub fn parcel_count(&self) -> u32 {
        self.parcels.unwrap_or(1)
    }
}

/// The validated stops of one run. The depot is always the first entry.
#[derive(Debug, Clone, PartialEq)]
pub struct StopSet {
    stops: Vec<Stop>,
}

impl StopSet {
    /// Builds a stop set from a depot and at least one delivery stop.
    ///
    /// Identifiers must be unique across the depot and the stops.
    pub fn new(depot: Stop, visits: Vec<Stop>) -> Result<Self> {
        if visits.is_empty() {
            return Err(PlannerError::invalid_input(
                "at least one stop besides the depot is required",
            ));
        }

        let mut stops = Vec::with_capacity(visits.len() + 1);
        stops.push(depot);
        stops.extend(visits);

        let mut seen = FxHashSet::default();
        for stop in &stops {
            stop.coordinate.validate()?;
            if !seen.insert(stop.id.clone()) {
                return Err(PlannerError::invalid_input(format!(
                    "duplicate stop identifier {}",
                    stop.id
                )));
            }
        }

        Ok(Self { stops })
    }

    /// Normalizes raw delivery records into stops.
    pub fn from_records(depot: Stop, records: &[DeliveryRecord]) -> Result<Self> {
        let visits = records
            .iter()
            .enumerate()
            .map(|(row, record)| {
                let coordinate = Coordinate {
                    lat: record.latitude,
                    lng: record.longitude,
                };
                let mut stop = Stop::new(record.id.trim(), coordinate)
                    .map_err(|err| err.with_context(&format!("record {}", row + 1)))?;
                if let Some(label) = record.display_label() {
                    stop = stop.with_label(label);
                }
                if let Some(zone) = record.zone.as_deref().filter(|zone| !zone.is_empty()) {
                    stop = stop.with_zone(zone);
                }
                if let Some(parcels) = record.parcels {
                    stop = stop.with_parcels(parcels);
                }
                Ok(stop)
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(depot, visits)
    }

    pub fn depot(&self) -> &Stop {
        &self.stops[0]
    }

    /// Delivery stops, excluding the depot.
    pub fn visits(&self) -> &[Stop] {
        &self.stops[1..]
    }

    /// All stops, depot first.
    pub fn as_slice(&self) -> &[Stop] {
        &self.stops
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }
}
