//! Routes and the metrics derived from them.

use fxhash::FxHashSet;
use serde::Serialize;

use crate::config::Objective;
use crate::error::{PlannerError, Result};
use crate::matrix::CostMatrix;
use crate::stop::{Coordinate, Stop, StopId, StopSet};

/// A closed tour: starts and ends at the depot and visits every other stop
/// exactly once.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Route {
    stops: Vec<Stop>,
}

impl Route {
    /// Builds `depot, visits.., depot`, rejecting empty or repeating tours.
    pub fn new(depot: Stop, visits: Vec<Stop>) -> Result<Self> {
        if visits.is_empty() {
            return Err(PlannerError::invalid_input("a route needs at least one stop"));
        }

        let mut seen = FxHashSet::default();
        seen.insert(depot.id().clone());
        for stop in &visits {
            if !seen.insert(stop.id().clone()) {
                return Err(PlannerError::invalid_input(format!(
                    "stop {} appears twice in the route",
                    stop.id()
                )));
            }
        }

        let mut stops = Vec::with_capacity(visits.len() + 2);
        stops.push(depot.clone());
        stops.extend(visits);
        stops.push(depot);
        Ok(Self { stops })
    }

    /// `tour` indexes into `stops` and is already a closed permutation.
    pub(crate) fn from_indices(stops: &StopSet, tour: &[usize]) -> Self {
        let all = stops.as_slice();
        Self {
            stops: tour.iter().map(|&i| all[i].clone()).collect(),
        }
    }

    /// All entries, depot at both ends.
    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    pub fn depot(&self) -> &Stop {
        &self.stops[0]
    }

    /// Delivery stops in visiting order.
    pub fn visits(&self) -> &[Stop] {
        &self.stops[1..self.stops.len() - 1]
    }

    pub fn ids(&self) -> Vec<&StopId> {
        self.stops.iter().map(Stop::id).collect()
    }

    pub fn coordinates(&self) -> Vec<Coordinate> {
        self.stops.iter().map(Stop::coordinate).collect()
    }

    /// Number of entries, the closing depot included.
    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    /// Consecutive (from, to) pairs, the closing leg included.
    pub fn legs(&self) -> impl Iterator<Item = (&Stop, &Stop)> {
        self.stops.windows(2).map(|pair| (&pair[0], &pair[1]))
    }

    /// Total cost under `objective`.
    pub fn cost(&self, matrix: &CostMatrix, objective: Objective) -> Result<f64> {
        self.legs().try_fold(0.0, |total, (from, to)| {
            Ok(total + matrix.cost(from.id(), to.id())?.value(objective))
        })
    }
}

/// Travel between two consecutive route entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leg {
    pub from: StopId,
    pub to: StopId,
    pub distance: f64,
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteMetrics {
    /// Meters, closing leg included.
    pub total_distance: f64,
    /// Seconds of travel, closing leg included.
    pub total_duration: f64,
    /// One entry per consecutive pair of route entries.
    pub legs: Vec<Leg>,
}

/// Per-stop detail for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisitDetail {
    /// 1-based position in the visiting order.
    pub sequence: usize,
    pub stop_id: StopId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    pub parcels: u32,
    pub coordinate: Coordinate,
    pub leg_distance: f64,
    pub leg_duration: f64,
    pub distance_from_depot: f64,
    pub duration_from_depot: f64,
    pub cumulative_distance: f64,
    pub cumulative_duration: f64,
    /// Seconds after departure: travel so far plus service at earlier stops.
    pub arrival_offset: f64,
    pub remaining_stops: usize,
    /// Parcels still on board after this drop.
    pub remaining_parcels: u32,
}

/// The artifact handed to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedRoute {
    pub route: Route,
    pub metrics: RouteMetrics,
    pub visits: Vec<VisitDetail>,
    /// Seconds spent at stops.
    pub total_service_time: f64,
    pub total_parcels: u32,
    /// Encoded polyline (precision 5) through the stops in order.
    pub polyline: String,
}

impl PlannedRoute {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
