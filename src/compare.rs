//! Route comparison against simple baselines.
//!
//! The planned route is priced next to the stops in input order and a
//! straight-line nearest-neighbor tour. Every method is priced on the same
//! road matrix so the figures are comparable.

use std::fmt;

use fxhash::FxHashSet;
use serde::Serialize;

use crate::assembler::{AssembleOptions, route_metrics};
use crate::config::Objective;
use crate::error::Result;
use crate::haversine::HaversineMatrix;
use crate::matrix::CostMatrix;
use crate::route::Route;
use crate::solver::nearest_neighbor_route;
use crate::stop::StopSet;

/// Decimal places of the grid used to spot stops in an area already visited.
const AREA_PRECISION: i32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Method {
    Optimized,
    InputOrder,
    StraightLine,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Optimized => "optimized",
            Method::InputOrder => "input order",
            Method::StraightLine => "straight-line nearest neighbor",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodSummary {
    pub method: Method,
    pub route: Route,
    /// Meters, closing leg included.
    pub distance: f64,
    /// Seconds of travel plus service at every stop.
    pub total_time: f64,
    pub stops: usize,
    pub avg_time_per_stop: f64,
    /// Stops falling in an area an earlier stop already covered.
    pub redundant_stops: usize,
    /// Objective cost relative to the optimized route, in percent. `None` for
    /// the optimized route itself or when its cost is zero.
    pub vs_optimized_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub objective: Objective,
    pub methods: Vec<MethodSummary>,
}

impl Comparison {
    pub fn get(&self, method: Method) -> Option<&MethodSummary> {
        self.methods.iter().find(|summary| summary.method == method)
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<32} {:>10} {:>10} {:>6} {:>10} {:>10} {:>12}",
            "method", "km", "min", "stops", "min/stop", "redundant", "vs optimized"
        )?;
        for summary in &self.methods {
            let versus = match summary.vs_optimized_pct {
                Some(pct) => format!("{pct:+.1}%"),
                None => "-".to_string(),
            };
            writeln!(
                f,
                "{:<32} {:>10.2} {:>10.1} {:>6} {:>10.1} {:>10} {:>12}",
                summary.method.to_string(),
                summary.distance / 1000.0,
                summary.total_time / 60.0,
                summary.stops,
                summary.avg_time_per_stop / 60.0,
                summary.redundant_stops,
                versus
            )?;
        }
        Ok(())
    }
}

/// Straight-line costs between every pair of stops. Never needs a service.
pub fn straight_line_matrix(stops: &StopSet) -> CostMatrix {
    let haversine = HaversineMatrix::default();
    let mut matrix = CostMatrix::new(stops.as_slice().iter().map(|s| s.id().clone()).collect());
    for from in stops.as_slice() {
        for to in stops.as_slice() {
            if from.id() != to.id() {
                matrix.insert(from.id(), to.id(), haversine.leg(from.coordinate(), to.coordinate()));
            }
        }
    }
    matrix
}

/// Nearest neighbor by great-circle distance, ties to the lowest id.
pub fn straight_line_route(stops: &StopSet) -> Result<Route> {
    nearest_neighbor_route(stops, &straight_line_matrix(stops), Objective::Distance)
}

/// Counts delivery stops whose rounded coordinate was already visited.
pub fn redundant_stops(route: &Route) -> usize {
    let factor = 10f64.powi(AREA_PRECISION);
    let mut seen = FxHashSet::default();
    route
        .visits()
        .iter()
        .filter(|stop| {
            let coordinate = stop.coordinate();
            let area = (
                (coordinate.lat * factor).round() as i64,
                (coordinate.lng * factor).round() as i64,
            );
            !seen.insert(area)
        })
        .count()
}

fn summarize(
    method: Method,
    route: Route,
    matrix: &CostMatrix,
    options: &AssembleOptions,
) -> Result<MethodSummary> {
    let metrics = route_metrics(&route, matrix)?;
    let stops = route.visits().len();
    let total_time = metrics.total_duration + options.service_time * stops as f64;

    Ok(MethodSummary {
        method,
        redundant_stops: redundant_stops(&route),
        route,
        distance: metrics.total_distance,
        total_time,
        stops,
        avg_time_per_stop: if stops > 0 { total_time / stops as f64 } else { 0.0 },
        vs_optimized_pct: None,
    })
}

/// Prices `optimized` and the baselines on `matrix`.
pub fn compare(
    stops: &StopSet,
    matrix: &CostMatrix,
    optimized: &Route,
    objective: Objective,
    options: &AssembleOptions,
) -> Result<Comparison> {
    let input_order = Route::new(stops.depot().clone(), stops.visits().to_vec())?;
    let baselines = [
        (Method::InputOrder, input_order),
        (Method::StraightLine, straight_line_route(stops)?),
    ];

    let reference = optimized.cost(matrix, objective)?;
    let mut methods = vec![summarize(Method::Optimized, optimized.clone(), matrix, options)?];
    for (method, route) in baselines {
        let cost = route.cost(matrix, objective)?;
        let mut summary = summarize(method, route, matrix, options)?;
        if reference > 0.0 {
            summary.vs_optimized_pct = Some((cost - reference) / reference * 100.0);
        }
        methods.push(summary);
    }

    Ok(Comparison { objective, methods })
}
