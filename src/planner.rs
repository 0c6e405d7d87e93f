//! End-to-end planning: matrix, optimization, assembly.

use tracing::{debug, info};

use crate::assembler::{AssembleOptions, assemble};
use crate::builder::MatrixBuilder;
use crate::compare::{Comparison, compare};
use crate::config::PlannerConfig;
use crate::error::Result;
use crate::matrix::CostMatrix;
use crate::route::PlannedRoute;
use crate::solver::{SolveOptions, solve};
use crate::stop::StopSet;
use crate::traits::RoutingService;

pub struct Planner<S> {
    builder: MatrixBuilder<S>,
    solve_options: SolveOptions,
    assemble_options: AssembleOptions,
}

impl<S: RoutingService> Planner<S> {
    pub fn new(
        builder: MatrixBuilder<S>,
        solve_options: SolveOptions,
        assemble_options: AssembleOptions,
    ) -> Self {
        Self {
            builder,
            solve_options,
            assemble_options,
        }
    }

    pub fn from_config(service: S, config: &PlannerConfig) -> Result<Self> {
        config.validate()?;
        let builder = MatrixBuilder::new(service, config.build_options())?;
        Ok(Self::new(
            builder,
            config.solve_options()?,
            config.assemble_options(),
        ))
    }

    pub fn builder(&self) -> &MatrixBuilder<S> {
        &self.builder
    }

    pub fn plan(&self, stops: &StopSet) -> Result<PlannedRoute> {
        let (planned, _) = self.run(stops)?;
        Ok(planned)
    }

    /// Plans the route and prices it next to the baseline orderings on the
    /// same matrix.
    pub fn plan_with_comparison(&self, stops: &StopSet) -> Result<(PlannedRoute, Comparison)> {
        let (planned, matrix) = self.run(stops)?;
        let comparison = compare(
            stops,
            &matrix,
            &planned.route,
            self.solve_options.objective,
            &self.assemble_options,
        )?;

        for summary in &comparison.methods {
            debug!(
                method = %summary.method,
                distance_m = summary.distance,
                total_time_s = summary.total_time,
                redundant = summary.redundant_stops,
                vs_optimized_pct = ?summary.vs_optimized_pct,
                "route comparison"
            );
        }

        Ok((planned, comparison))
    }

    fn run(&self, stops: &StopSet) -> Result<(PlannedRoute, CostMatrix)> {
        let matrix = self.builder.build(stops.as_slice())?;
        let solution = solve(stops, &matrix, &self.solve_options)?;
        let planned = assemble(solution.route, &matrix, &self.assemble_options)?;

        info!(
            stops = stops.visits().len(),
            objective = %self.solve_options.objective,
            construction_cost = solution.construction_cost,
            cost = solution.cost,
            distance_m = planned.metrics.total_distance,
            duration_s = planned.metrics.total_duration,
            "route planned"
        );

        Ok((planned, matrix))
    }
}
