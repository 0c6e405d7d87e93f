//! Core capability traits for the planner.
//!
//! A routing service knows nothing about stops, caching or retries; the
//! matrix builder owns those.

use std::time::Duration;

use crate::error::ServiceError;
use crate::matrix::TravelCost;
use crate::stop::Coordinate;

/// Provides travel costs between coordinates.
pub trait RoutingService: Send + Sync {
    /// Identifies the service and its parameters (profile, speed, ...).
    ///
    /// Cached costs are only reused under the same fingerprint.
    fn fingerprint(&self) -> String;

    /// Largest number of origins (and of destinations) per request, if capped.
    fn max_locations_per_request(&self) -> Option<usize> {
        None
    }

    /// Returns one row per origin, one column per destination.
    fn table(
        &self,
        origins: &[Coordinate],
        destinations: &[Coordinate],
    ) -> Result<Vec<Vec<TravelCost>>, ServiceError>;

    /// Like [`table`](Self::table), giving up after `timeout` where the
    /// service can bound a single request.
    fn table_within(
        &self,
        origins: &[Coordinate],
        destinations: &[Coordinate],
        timeout: Option<Duration>,
    ) -> Result<Vec<Vec<TravelCost>>, ServiceError> {
        let _ = timeout;
        self.table(origins, destinations)
    }
}

impl<S: RoutingService + ?Sized> RoutingService for &S {
    fn fingerprint(&self) -> String {
        (**self).fingerprint()
    }

    fn max_locations_per_request(&self) -> Option<usize> {
        (**self).max_locations_per_request()
    }

    fn table(
        &self,
        origins: &[Coordinate],
        destinations: &[Coordinate],
    ) -> Result<Vec<Vec<TravelCost>>, ServiceError> {
        (**self).table(origins, destinations)
    }

    fn table_within(
        &self,
        origins: &[Coordinate],
        destinations: &[Coordinate],
        timeout: Option<Duration>,
    ) -> Result<Vec<Vec<TravelCost>>, ServiceError> {
        (**self).table_within(origins, destinations, timeout)
    }
}

impl<S: RoutingService + ?Sized> RoutingService for Box<S> {
    fn fingerprint(&self) -> String {
        (**self).fingerprint()
    }

    fn max_locations_per_request(&self) -> Option<usize> {
        (**self).max_locations_per_request()
    }

    fn table(
        &self,
        origins: &[Coordinate],
        destinations: &[Coordinate],
    ) -> Result<Vec<Vec<TravelCost>>, ServiceError> {
        (**self).table(origins, destinations)
    }

    fn table_within(
        &self,
        origins: &[Coordinate],
        destinations: &[Coordinate],
        timeout: Option<Duration>,
    ) -> Result<Vec<Vec<TravelCost>>, ServiceError> {
        (**self).table_within(origins, destinations, timeout)
    }
}
