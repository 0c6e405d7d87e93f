//! Distance matrix builder.
//!
//! Resolves every ordered pair of stops through a [`RoutingService`]. Stops
//! are cut into chunks no larger than the service allows and each
//! (origin chunk, destination chunk) block is one request, so the stitched
//! result always covers the full matrix. Blocks run on a bounded worker pool
//! and are merged by stop-pair identity.

use std::ops::Range;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use fxhash::FxHashSet;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, MatrixCache};
use crate::error::{PlannerError, Result, RoutingFailure, ServiceError};
use crate::matrix::{CostMatrix, TravelCost};
use crate::stop::{Coordinate, Stop, StopId};
use crate::traits::RoutingService;

#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Total attempts per block, first try included.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Deadline for the whole build.
    pub build_timeout: Option<Duration>,
    /// Worker threads issuing requests.
    pub concurrency: usize,
    /// Cap on stops per side of a request, on top of the service's own cap.
    pub max_locations_per_request: Option<usize>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
            build_timeout: None,
            concurrency: 4,
            max_locations_per_request: None,
        }
    }
}

/// One request: origins in `rows`, destinations in `cols` (stop indices).
#[derive(Debug, Clone, PartialEq)]
struct Block {
    rows: Range<usize>,
    cols: Range<usize>,
}

impl Block {
    fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.rows
            .clone()
            .flat_map(move |i| self.cols.clone().map(move |j| (i, j)))
            .filter(|(i, j)| i != j)
    }
}

pub struct MatrixBuilder<S> {
    service: S,
    options: BuildOptions,
    cache: Arc<MatrixCache>,
    pool: rayon::ThreadPool,
}

impl<S: RoutingService> MatrixBuilder<S> {
    pub fn new(service: S, options: BuildOptions) -> Result<Self> {
        if options.max_attempts == 0 {
            return Err(PlannerError::config("max_attempts must be positive"));
        }
        if options.max_locations_per_request == Some(0) {
            return Err(PlannerError::config("max_locations_per_request must be positive"));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.concurrency.max(1))
            .thread_name(|i| format!("matrix-worker-{i}"))
            .build()
            .map_err(|err| PlannerError::config(format!("matrix worker pool: {err}")))?;

        Ok(Self {
            service,
            options,
            cache: Arc::new(MatrixCache::new()),
            pool,
        })
    }

    /// Shares an existing cache, e.g. one loaded from disk or used by
    /// another builder.
    pub fn with_cache(mut self, cache: Arc<MatrixCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> &Arc<MatrixCache> {
        &self.cache
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Builds the complete matrix for `stops` or fails without a partial
    /// result.
    pub fn build(&self, stops: &[Stop]) -> Result<CostMatrix> {
        validate_stops(stops)?;

        let fingerprint = self.service.fingerprint();
        let ids = stops.iter().map(|stop| stop.id().clone()).collect();
        let mut matrix = CostMatrix::new(ids);

        let mut cache_hits = 0usize;
        for (i, origin) in stops.iter().enumerate() {
            for (j, destination) in stops.iter().enumerate() {
                if i == j {
                    continue;
                }
                if let Some(cost) = self.cache.get(&CacheKey::new(origin, destination, &fingerprint)) {
                    matrix.set(i, j, cost);
                    cache_hits += 1;
                }
            }
        }

        let blocks = plan_blocks(stops.len(), self.chunk_size(stops.len()))
            .into_iter()
            .filter(|block| block.pairs().any(|(i, j)| matrix.get_at(i, j).is_none()))
            .collect::<Vec<_>>();

        info!(
            stops = stops.len(),
            cache_hits,
            requests = blocks.len(),
            service = %fingerprint,
            "building cost matrix"
        );

        if blocks.is_empty() {
            return Ok(matrix);
        }

        let deadline = self.options.build_timeout.map(|timeout| Instant::now() + timeout);
        let coordinates = stops.iter().map(Stop::coordinate).collect::<Vec<_>>();

        let results = self.pool.install(|| {
            blocks
                .par_iter()
                .map(|block| {
                    self.fetch_block(
                        &coordinates[block.rows.clone()],
                        &coordinates[block.cols.clone()],
                        deadline,
                    )
                })
                .collect::<Vec<_>>()
        });

        let mut failure = None;
        let mut unresolved = Vec::new();
        for (block, result) in blocks.iter().zip(results) {
            match result {
                Ok(rows) => {
                    for (i, j) in block.pairs() {
                        let cost = rows[i - block.rows.start][j - block.cols.start];
                        matrix.set(i, j, cost);
                        self.cache
                            .insert(CacheKey::new(&stops[i], &stops[j], &fingerprint), cost);
                    }
                }
                Err(cause) => {
                    unresolved.extend(block.pairs());
                    failure.get_or_insert(cause);
                }
            }
        }

        if let Some(cause) = failure {
            let unresolved = unresolved
                .into_iter()
                .filter(|&(i, j)| matrix.get_at(i, j).is_none())
                .map(|(i, j)| (stops[i].id().clone(), stops[j].id().clone()))
                .collect::<Vec<(StopId, StopId)>>();
            warn!(unresolved = unresolved.len(), error = %cause, "cost matrix build failed");
            return Err(PlannerError::RoutingService { unresolved, cause });
        }

        if let Some((from, to)) = matrix.missing_pairs().into_iter().next() {
            return Err(PlannerError::IncompleteMatrix { from, to });
        }

        debug!(cached = self.cache.len(), "cost matrix complete");
        Ok(matrix)
    }

    fn chunk_size(&self, n: usize) -> usize {
        [self.service.max_locations_per_request(), self.options.max_locations_per_request]
            .into_iter()
            .flatten()
            .min()
            .unwrap_or(n)
            .max(1)
    }

    /// Requests one block, retrying transient failures with exponential
    /// backoff. Sleeps never run past the deadline, and a response arriving
    /// after it is discarded.
    fn fetch_block(
        &self,
        origins: &[Coordinate],
        destinations: &[Coordinate],
        deadline: Option<Instant>,
    ) -> Result<Vec<Vec<TravelCost>>, RoutingFailure> {
        let mut delay = self.options.initial_backoff;
        let mut attempt = 1;

        loop {
            let remaining = match deadline {
                Some(deadline) => match deadline.checked_duration_since(Instant::now()) {
                    Some(remaining) if !remaining.is_zero() => Some(remaining),
                    _ => return Err(self.timeout()),
                },
                None => None,
            };

            let result = self.service.table_within(origins, destinations, remaining);
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return Err(self.timeout());
            }
            let result = result.and_then(|rows| check_table(rows, origins.len(), destinations.len()));

            match result {
                Ok(rows) => return Ok(rows),
                Err(err) if err.is_transient() && attempt < self.options.max_attempts => {
                    if let Some(deadline) = deadline {
                        if deadline.saturating_duration_since(Instant::now()) <= delay {
                            return Err(self.timeout());
                        }
                    }
                    warn!(
                        attempt,
                        max_attempts = self.options.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient routing failure, retrying"
                    );
                    thread::sleep(delay);
                    delay = (delay * 2).min(self.options.max_backoff);
                    attempt += 1;
                }
                Err(err) => {
                    debug!(attempt, error = %err, "giving up on block");
                    return Err(RoutingFailure::Service(err));
                }
            }
        }
    }

    fn timeout(&self) -> RoutingFailure {
        RoutingFailure::Timeout(self.options.build_timeout.unwrap_or_default())
    }
}

fn validate_stops(stops: &[Stop]) -> Result<()> {
    if stops.len() < 2 {
        return Err(PlannerError::invalid_input(format!(
            "a cost matrix needs at least 2 stops, got {}",
            stops.len()
        )));
    }

    let mut seen = FxHashSet::default();
    for stop in stops {
        stop.coordinate()
            .validate()
            .map_err(|err| err.with_context(&format!("stop {}", stop.id())))?;
        if !seen.insert(stop.id()) {
            return Err(PlannerError::invalid_input(format!(
                "duplicate stop identifier {}",
                stop.id()
            )));
        }
    }

    Ok(())
}

fn plan_blocks(n: usize, chunk: usize) -> Vec<Block> {
    let chunks = (0..n)
        .step_by(chunk)
        .map(|start| start..(start + chunk).min(n))
        .collect::<Vec<_>>();

    chunks
        .iter()
        .flat_map(|rows| {
            chunks.iter().map(move |cols| Block {
                rows: rows.clone(),
                cols: cols.clone(),
            })
        })
        .collect()
}

fn check_table(
    rows: Vec<Vec<TravelCost>>,
    origins: usize,
    destinations: usize,
) -> Result<Vec<Vec<TravelCost>>, ServiceError> {
    if rows.len() != origins || rows.iter().any(|row| row.len() != destinations) {
        return Err(ServiceError::InvalidResponse(format!(
            "expected a {origins}x{destinations} table"
        )));
    }
    if let Some(cost) = rows.iter().flatten().find(|cost| !cost.is_valid()) {
        return Err(ServiceError::InvalidResponse(format!(
            "negative or non-finite cost {cost:?}"
        )));
    }
    Ok(rows)
}
