//! Route assembler: sums leg costs along a route and derives per-stop detail.

use crate::error::Result;
use crate::matrix::CostMatrix;
use crate::polyline::Polyline;
use crate::route::{Leg, PlannedRoute, Route, RouteMetrics, VisitDetail};
use crate::stop::Stop;

#[derive(Debug, Clone)]
pub struct AssembleOptions {
    /// Seconds spent at each delivery stop.
    pub service_time: f64,
}

impl Default for AssembleOptions {
    fn default() -> Self {
        Self { service_time: 360.0 }
    }
}

/// Leg-by-leg metrics, closing leg included.
pub fn route_metrics(route: &Route, matrix: &CostMatrix) -> Result<RouteMetrics> {
    let legs = route
        .legs()
        .map(|(from, to)| {
            let cost = matrix.cost(from.id(), to.id())?;
            Ok(Leg {
                from: from.id().clone(),
                to: to.id().clone(),
                distance: cost.distance,
                duration: cost.duration,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(RouteMetrics {
        total_distance: legs.iter().map(|leg| leg.distance).sum(),
        total_duration: legs.iter().map(|leg| leg.duration).sum(),
        legs,
    })
}

pub fn assemble(route: Route, matrix: &CostMatrix, options: &AssembleOptions) -> Result<PlannedRoute> {
    let metrics = route_metrics(&route, matrix)?;
    let depot = route.depot();
    let stop_count = route.visits().len();

    let total_parcels = route.visits().iter().map(Stop::parcel_count).sum::<u32>();

    let mut visits = Vec::with_capacity(stop_count);
    let mut cumulative_distance = 0.0;
    let mut cumulative_duration = 0.0;
    let mut remaining_parcels = total_parcels;

    for (position, (stop, leg)) in route.visits().iter().zip(&metrics.legs).enumerate() {
        cumulative_distance += leg.distance;
        cumulative_duration += leg.duration;
        let from_depot = matrix.cost(depot.id(), stop.id())?;
        remaining_parcels = remaining_parcels.saturating_sub(stop.parcel_count());

        visits.push(VisitDetail {
            sequence: position + 1,
            stop_id: stop.id().clone(),
            label: stop.label().map(str::to_string),
            zone: stop.zone().map(str::to_string),
            parcels: stop.parcel_count(),
            coordinate: stop.coordinate(),
            leg_distance: leg.distance,
            leg_duration: leg.duration,
            distance_from_depot: from_depot.distance,
            duration_from_depot: from_depot.duration,
            cumulative_distance,
            cumulative_duration,
            arrival_offset: cumulative_duration + options.service_time * position as f64,
            remaining_stops: stop_count - position - 1,
            remaining_parcels,
        });
    }

    let polyline = Polyline::from_coordinates(&route.coordinates()).encode(5);

    Ok(PlannedRoute {
        route,
        metrics,
        visits,
        total_service_time: options.service_time * stop_count as f64,
        total_parcels,
        polyline,
    })
}
