//! Route optimizer: nearest-neighbor construction followed by 2-opt.
//!
//! Costs are directed, so a reversed segment is re-priced edge by edge.
//! Everything iterates in index order; the same matrix and stop order always
//! give the same route.

use tracing::debug;

use crate::config::Objective;
use crate::error::Result;
use crate::matrix::CostMatrix;
use crate::route::Route;
use crate::stop::StopSet;

/// Moves must beat the current tour by more than this to be applied.
const IMPROVEMENT_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct SolveOptions {
    pub objective: Objective,
    /// Maximum number of 2-opt passes; n² when unset.
    pub max_passes: Option<usize>,
}

impl SolveOptions {
    pub fn new(objective: Objective) -> Self {
        Self {
            objective,
            max_passes: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Solution {
    pub route: Route,
    /// Tour cost after construction, before improvement.
    pub construction_cost: f64,
    /// Final tour cost.
    pub cost: f64,
    /// 2-opt passes run.
    pub passes: usize,
}

/// Dense objective costs, indexed like the stop set (depot = 0).
struct Costs {
    n: usize,
    values: Vec<f64>,
}

impl Costs {
    /// Reads every ordered pair up front, failing on the first gap.
    fn from_matrix(stops: &StopSet, matrix: &CostMatrix, objective: Objective) -> Result<Self> {
        let n = stops.len();
        let mut values = Vec::with_capacity(n * n);
        for from in stops.as_slice() {
            for to in stops.as_slice() {
                values.push(matrix.cost(from.id(), to.id())?.value(objective));
            }
        }
        Ok(Self { n, values })
    }

    #[inline]
    fn get(&self, from: usize, to: usize) -> f64 {
        self.values[from * self.n + to]
    }

    fn tour_cost(&self, tour: &[usize]) -> f64 {
        tour.windows(2).map(|leg| self.get(leg[0], leg[1])).sum()
    }
}

pub fn solve(stops: &StopSet, matrix: &CostMatrix, options: &SolveOptions) -> Result<Solution> {
    let costs = Costs::from_matrix(stops, matrix, options.objective)?;
    let n = stops.len();

    let mut tour = nearest_neighbor(stops, &costs);
    let construction_cost = costs.tour_cost(&tour);

    let passes = if n > 2 {
        let budget = options.max_passes.unwrap_or(n * n);
        two_opt(&mut tour, &costs, budget)
    } else {
        0
    };
    let cost = costs.tour_cost(&tour);

    debug!(
        stops = n,
        objective = %options.objective,
        construction_cost,
        cost,
        passes,
        "route optimized"
    );

    let route = Route::from_indices(stops, &tour);
    Ok(Solution {
        route,
        construction_cost,
        cost,
        passes,
    })
}

/// Greedy construction only, without improvement.
pub fn nearest_neighbor_route(
    stops: &StopSet,
    matrix: &CostMatrix,
    objective: Objective,
) -> Result<Route> {
    let costs = Costs::from_matrix(stops, matrix, objective)?;
    Ok(Route::from_indices(stops, &nearest_neighbor(stops, &costs)))
}

/// Greedy tour from the depot. Ties go to the lowest stop id.
fn nearest_neighbor(stops: &StopSet, costs: &Costs) -> Vec<usize> {
    let n = costs.n;
    let all = stops.as_slice();
    let mut visited = vec![false; n];
    let mut tour = Vec::with_capacity(n + 1);

    visited[0] = true;
    tour.push(0);
    let mut current = 0;

    for _ in 1..n {
        let mut best: Option<usize> = None;
        for candidate in 1..n {
            if visited[candidate] {
                continue;
            }
            best = match best {
                None => Some(candidate),
                Some(incumbent) => {
                    let order = costs
                        .get(current, candidate)
                        .total_cmp(&costs.get(current, incumbent))
                        .then_with(|| all[candidate].id().cmp(all[incumbent].id()));
                    if order.is_lt() { Some(candidate) } else { Some(incumbent) }
                }
            };
        }

        // n > 1 iterations over n - 1 unvisited stops; one is always left.
        let Some(next) = best else { break };
        visited[next] = true;
        tour.push(next);
        current = next;
    }

    tour.push(0);
    tour
}

/// Prefix sums of the tour walked forwards and backwards.
///
/// `forward[k]` is the cost of tour[0..=k]; `backward[k]` is the cost of the
/// same edges each traversed in reverse.
fn prefix_costs(tour: &[usize], costs: &Costs) -> (Vec<f64>, Vec<f64>) {
    let mut forward = vec![0.0; tour.len()];
    let mut backward = vec![0.0; tour.len()];
    for k in 1..tour.len() {
        forward[k] = forward[k - 1] + costs.get(tour[k - 1], tour[k]);
        backward[k] = backward[k - 1] + costs.get(tour[k], tour[k - 1]);
    }
    (forward, backward)
}

/// 2-opt: reverse tour[i+1..=j] whenever that strictly lowers the tour cost.
///
/// Edges i and j are never adjacent. The first and last edges both touch the
/// depot; pairing them reverses every delivery stop, which only changes the
/// cost when legs are priced differently by direction. Returns the number of
/// passes run.
fn two_opt(tour: &mut [usize], costs: &Costs, max_passes: usize) -> usize {
    // Tour holds n + 1 entries, edges are 0..n.
    let edges = tour.len() - 1;
    let mut passes = 0;

    while passes < max_passes {
        passes += 1;
        let mut improved = false;
        let (mut forward, mut backward) = prefix_costs(tour, costs);

        for i in 0..edges.saturating_sub(2) {
            for j in (i + 2)..edges {
                let (a, b) = (tour[i], tour[i + 1]);
                let (c, d) = (tour[j], tour[j + 1]);

                let before = costs.get(a, b) + (forward[j] - forward[i + 1]) + costs.get(c, d);
                let after = costs.get(a, c) + (backward[j] - backward[i + 1]) + costs.get(b, d);

                if after + IMPROVEMENT_EPSILON < before {
                    tour[i + 1..=j].reverse();
                    (forward, backward) = prefix_costs(tour, costs);
                    improved = true;
                }
            }
        }

        if !improved {
            break;
        }
    }

    passes
}
