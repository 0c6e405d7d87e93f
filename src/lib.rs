//! delivery-planner core
//!
//! Builds a travel cost matrix for a set of delivery stops through a routing
//! service, orders the stops into a depot-rooted tour (nearest neighbor then
//! 2-opt) and assembles the result for display, optionally priced against
//! simple baseline orderings.

pub mod assembler;
pub mod builder;
pub mod cache;
pub mod compare;
pub mod config;
pub mod error;
pub mod haversine;
mod http;
pub mod matrix;
pub mod ors;
pub mod osrm;
pub mod planner;
pub mod polyline;
pub mod records;
pub mod route;
pub mod solver;
pub mod stop;
pub mod traits;

pub use error::{PlannerError, Result, RoutingFailure, ServiceError};
