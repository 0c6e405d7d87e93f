//! Planner configuration, loaded from TOML.
//!
//! Everything has a default except the optimization objective, which must be
//! chosen explicitly (in the file or on the command line).

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::assembler::AssembleOptions;
use crate::builder::BuildOptions;
use crate::error::{PlannerError, Result};
use crate::haversine::{DEFAULT_SPEED_KMH, HaversineMatrix};
use crate::ors::{DEFAULT_MAX_LOCATIONS, OrsClient, OrsConfig};
use crate::osrm::{OsrmClient, OsrmConfig};
use crate::solver::SolveOptions;
use crate::stop::{Coordinate, Stop};
use crate::traits::RoutingService;

/// Quantity minimized by the optimizer. Fixed for a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Objective {
    Distance,
    Duration,
}

impl FromStr for Objective {
    type Err = PlannerError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "distance" => Ok(Objective::Distance),
            "duration" => Ok(Objective::Duration),
            other => Err(PlannerError::config(format!(
                "unknown objective {other:?} (expected distance or duration)"
            ))),
        }
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Objective::Distance => "distance",
            Objective::Duration => "duration",
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlannerConfig {
    #[serde(default)]
    pub objective: Option<Objective>,
    #[serde(default)]
    pub depot: Option<DepotConfig>,
    #[serde(default)]
    pub matrix: MatrixSettings,
    #[serde(default)]
    pub optimizer: OptimizerSettings,
    #[serde(default)]
    pub assembly: AssemblySettings,
    #[serde(default)]
    pub service: ServiceSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DepotConfig {
    #[serde(default = "default_depot_id")]
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatrixSettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub build_timeout_secs: Option<u64>,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default)]
    pub max_locations_per_request: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OptimizerSettings {
    /// 2-opt pass budget; n² when unset.
    #[serde(default)]
    pub max_passes: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssemblySettings {
    #[serde(default = "default_service_time_secs")]
    pub service_time_secs: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    Osrm,
    Ors,
    Haversine,
}

impl FromStr for ServiceKind {
    type Err = PlannerError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "osrm" => Ok(ServiceKind::Osrm),
            "ors" | "openrouteservice" => Ok(ServiceKind::Ors),
            "haversine" => Ok(ServiceKind::Haversine),
            other => Err(PlannerError::config(format!("unknown routing service {other:?}"))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceSettings {
    #[serde(default = "default_service_kind")]
    pub kind: ServiceKind,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub profile: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_speed_kmh")]
    pub speed_kmh: f64,
}

fn default_depot_id() -> String {
    "depot".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    200
}

fn default_max_backoff_ms() -> u64 {
    5_000
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_concurrency() -> usize {
    4
}

fn default_service_time_secs() -> f64 {
    // Six minutes at each house.
    360.0
}

fn default_service_kind() -> ServiceKind {
    ServiceKind::Osrm
}

fn default_speed_kmh() -> f64 {
    DEFAULT_SPEED_KMH
}

impl Default for MatrixSettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            build_timeout_secs: None,
            concurrency: default_concurrency(),
            max_locations_per_request: None,
        }
    }
}

impl Default for AssemblySettings {
    fn default() -> Self {
        Self {
            service_time_secs: default_service_time_secs(),
        }
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            kind: default_service_kind(),
            base_url: None,
            profile: None,
            api_key: None,
            speed_kmh: default_speed_kmh(),
        }
    }
}

impl PlannerConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|err| {
            PlannerError::config(format!(
                "failed to read {}: {err}",
                path.as_ref().display()
            ))
        })?;
        content.parse()
    }

    /// The configured objective; a run cannot start without one.
    pub fn objective(&self) -> Result<Objective> {
        self.objective.ok_or_else(|| {
            PlannerError::config("objective must be set to \"distance\" or \"duration\"")
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.objective()?;

        let matrix = &self.matrix;
        if matrix.max_attempts == 0 {
            return Err(PlannerError::config("matrix.max_attempts must be positive"));
        }
        if matrix.request_timeout_secs == 0 {
            return Err(PlannerError::config("matrix.request_timeout_secs must be positive"));
        }
        if matrix.build_timeout_secs == Some(0) {
            return Err(PlannerError::config("matrix.build_timeout_secs must be positive"));
        }
        if matrix.concurrency == 0 {
            return Err(PlannerError::config("matrix.concurrency must be positive"));
        }
        if matrix.max_locations_per_request == Some(0) {
            return Err(PlannerError::config(
                "matrix.max_locations_per_request must be positive",
            ));
        }
        if self.optimizer.max_passes == Some(0) {
            return Err(PlannerError::config("optimizer.max_passes must be positive"));
        }
        if !(self.assembly.service_time_secs >= 0.0) {
            return Err(PlannerError::config("assembly.service_time_secs must not be negative"));
        }
        if !(self.service.speed_kmh > 0.0) {
            return Err(PlannerError::config("service.speed_kmh must be positive"));
        }

        Ok(())
    }

    pub fn depot_stop(&self) -> Result<Stop> {
        let depot = self
            .depot
            .as_ref()
            .ok_or_else(|| PlannerError::config("no depot configured"))?;
        let stop = Stop::new(
            depot.id.as_str(),
            Coordinate {
                lat: depot.latitude,
                lng: depot.longitude,
            },
        )?;
        Ok(match &depot.label {
            Some(label) => stop.with_label(label.clone()),
            None => stop,
        })
    }

    pub fn build_options(&self) -> BuildOptions {
        let matrix = &self.matrix;
        BuildOptions {
            max_attempts: matrix.max_attempts,
            initial_backoff: Duration::from_millis(matrix.initial_backoff_ms),
            max_backoff: Duration::from_millis(matrix.max_backoff_ms),
            build_timeout: matrix.build_timeout_secs.map(Duration::from_secs),
            concurrency: matrix.concurrency,
            max_locations_per_request: matrix.max_locations_per_request,
        }
    }

    pub fn solve_options(&self) -> Result<SolveOptions> {
        Ok(SolveOptions {
            objective: self.objective()?,
            max_passes: self.optimizer.max_passes,
        })
    }

    pub fn assemble_options(&self) -> AssembleOptions {
        AssembleOptions {
            service_time: self.assembly.service_time_secs,
        }
    }

    /// Creates the configured routing service.
    pub fn connect(&self) -> Result<Box<dyn RoutingService>> {
        let service = &self.service;
        let timeout_secs = self.matrix.request_timeout_secs;

        Ok(match service.kind {
            ServiceKind::Osrm => {
                let defaults = OsrmConfig::default();
                let client = OsrmClient::new(OsrmConfig {
                    base_url: service.base_url.clone().unwrap_or(defaults.base_url),
                    profile: service.profile.clone().unwrap_or(defaults.profile),
                    timeout_secs,
                    max_locations: self.matrix.max_locations_per_request,
                })
                .map_err(|err| PlannerError::config(format!("OSRM client: {err}")))?;
                Box::new(client)
            }
            ServiceKind::Ors => {
                let defaults = OrsConfig::default();
                let client = OrsClient::new(OrsConfig {
                    base_url: service.base_url.clone().unwrap_or(defaults.base_url),
                    profile: service.profile.clone().unwrap_or(defaults.profile),
                    api_key: service.api_key.clone(),
                    timeout_secs,
                    max_locations: self
                        .matrix
                        .max_locations_per_request
                        .unwrap_or(DEFAULT_MAX_LOCATIONS),
                })
                .map_err(|err| PlannerError::config(format!("ORS client: {err}")))?;
                Box::new(client)
            }
            ServiceKind::Haversine => Box::new(HaversineMatrix::new(service.speed_kmh)),
        })
    }
}

impl FromStr for PlannerConfig {
    type Err = PlannerError;

    fn from_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
