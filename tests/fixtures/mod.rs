//! Test fixtures for delivery-planner.
//!
//! Provides realistic test data including:
//! - Real Davao City locations (from OpenStreetMap)
//! - Stop and matrix builders
//! - Fake routing services that count, fail or stall

#![allow(dead_code)]

pub mod davao_locations;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use delivery_planner::ServiceError;
use delivery_planner::haversine::HaversineMatrix;
use delivery_planner::matrix::{CostMatrix, TravelCost};
use delivery_planner::stop::{Coordinate, Stop, StopSet};
use delivery_planner::traits::RoutingService;

pub use davao_locations::*;

pub fn stop(id: &str, lat: f64, lng: f64) -> Stop {
    Stop::new(id, Coordinate { lat, lng }).expect("valid stop")
}

/// Hub plus the first `count` delivery points, ids `s01`, `s02`, ...
pub fn davao_stops(count: usize) -> StopSet {
    let depot = stop("hub", HUB.lat, HUB.lng).with_label(HUB.name);
    let visits = delivery_points(count)
        .iter()
        .enumerate()
        .map(|(i, location)| {
            stop(&format!("s{:02}", i + 1), location.lat, location.lng).with_label(location.name)
        })
        .collect();
    StopSet::new(depot, visits).expect("valid stop set")
}

/// Stops with placeholder coordinates, ids as given, first id is the depot.
pub fn named_stops(ids: &[&str]) -> StopSet {
    let depot = stop(ids[0], 0.0, 0.0);
    let visits = ids[1..]
        .iter()
        .enumerate()
        .map(|(i, id)| stop(id, 0.0, i as f64 * 0.01))
        .collect();
    StopSet::new(depot, visits).expect("valid stop set")
}

/// Matrix whose distance and duration both equal `table[i][j]`.
pub fn matrix_from_table(stops: &StopSet, table: &[Vec<f64>]) -> CostMatrix {
    let ids = stops.as_slice().iter().map(|s| s.id().clone()).collect();
    let mut matrix = CostMatrix::new(ids);
    for (i, from) in stops.as_slice().iter().enumerate() {
        for (j, to) in stops.as_slice().iter().enumerate() {
            if i != j {
                matrix.insert(from.id(), to.id(), TravelCost::new(table[i][j], table[i][j]));
            }
        }
    }
    matrix
}

/// Haversine costs, counting every request.
#[derive(Default)]
pub struct CountingService {
    pub inner: HaversineMatrix,
    pub calls: AtomicUsize,
    pub cap: Option<usize>,
}

impl CountingService {
    pub fn with_cap(cap: usize) -> Self {
        Self {
            cap: Some(cap),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RoutingService for CountingService {
    fn fingerprint(&self) -> String {
        self.inner.fingerprint()
    }

    fn max_locations_per_request(&self) -> Option<usize> {
        self.cap
    }

    fn table(
        &self,
        origins: &[Coordinate],
        destinations: &[Coordinate],
    ) -> Result<Vec<Vec<TravelCost>>, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.table(origins, destinations)
    }
}

/// Fails the first `failures` requests with `error`, then answers.
pub struct FlakyService {
    inner: HaversineMatrix,
    failures: usize,
    error: ServiceError,
    calls: AtomicUsize,
}

impl FlakyService {
    pub fn new(failures: usize, error: ServiceError) -> Self {
        Self {
            inner: HaversineMatrix::default(),
            failures,
            error,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn unavailable(failures: usize) -> Self {
        Self::new(failures, ServiceError::Unavailable("503 Service Unavailable".into()))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RoutingService for FlakyService {
    fn fingerprint(&self) -> String {
        "flaky".to_string()
    }

    fn table(
        &self,
        origins: &[Coordinate],
        destinations: &[Coordinate],
    ) -> Result<Vec<Vec<TravelCost>>, ServiceError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(self.error.clone());
        }
        self.inner.table(origins, destinations)
    }
}

/// Answers correctly after sleeping.
pub struct SlowService {
    pub delay: Duration,
    pub cap: usize,
    pub calls: AtomicUsize,
}

impl RoutingService for SlowService {
    fn fingerprint(&self) -> String {
        "slow".to_string()
    }

    fn max_locations_per_request(&self) -> Option<usize> {
        Some(self.cap)
    }

    fn table(
        &self,
        origins: &[Coordinate],
        destinations: &[Coordinate],
    ) -> Result<Vec<Vec<TravelCost>>, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        HaversineMatrix::default().table(origins, destinations)
    }
}
