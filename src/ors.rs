//! openrouteservice matrix adapter.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ServiceError;
use crate::http::{
    blocking_client, classify_status, classify_transport, combine_tables, with_timeout,
};
use crate::matrix::TravelCost;
use crate::stop::Coordinate;
use crate::traits::RoutingService;

/// Per-side request cap; the public matrix endpoint allows 2500 cells.
pub const DEFAULT_MAX_LOCATIONS: usize = 45;

#[derive(Debug, Clone)]
pub struct OrsConfig {
    pub base_url: String,
    pub profile: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub max_locations: usize,
}

impl Default for OrsConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/ors".to_string(),
            profile: "driving-car".to_string(),
            api_key: None,
            timeout_secs: 10,
            max_locations: DEFAULT_MAX_LOCATIONS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrsClient {
    config: OrsConfig,
    client: reqwest::blocking::Client,
}

impl OrsClient {
    pub fn new(config: OrsConfig) -> Result<Self, reqwest::Error> {
        let client = blocking_client(config.timeout_secs)?;
        Ok(Self { config, client })
    }
}

#[derive(Debug, Serialize, PartialEq)]
struct MatrixRequest {
    /// `[lng, lat]` pairs.
    locations: Vec<[f64; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sources: Option<Vec<usize>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    destinations: Option<Vec<usize>>,
    metrics: Vec<&'static str>,
    units: &'static str,
}

impl MatrixRequest {
    fn new(origins: &[Coordinate], destinations: &[Coordinate]) -> Self {
        let metrics = vec!["distance", "duration"];
        if origins == destinations {
            return Self {
                locations: origins.iter().map(|c| [c.lng, c.lat]).collect(),
                sources: None,
                destinations: None,
                metrics,
                units: "m",
            };
        }

        let locations = origins
            .iter()
            .chain(destinations)
            .map(|c| [c.lng, c.lat])
            .collect::<Vec<_>>();

        Self {
            sources: Some((0..origins.len()).collect()),
            destinations: Some((origins.len()..locations.len()).collect()),
            locations,
            metrics,
            units: "m",
        }
    }
}

#[derive(Debug, Deserialize)]
struct MatrixResponse {
    durations: Option<Vec<Vec<Option<f64>>>>,
    distances: Option<Vec<Vec<Option<f64>>>>,
}

impl RoutingService for OrsClient {
    fn fingerprint(&self) -> String {
        format!("ors:{}:{}", self.config.base_url, self.config.profile)
    }

    fn max_locations_per_request(&self) -> Option<usize> {
        Some(self.config.max_locations)
    }

    fn table(
        &self,
        origins: &[Coordinate],
        destinations: &[Coordinate],
    ) -> Result<Vec<Vec<TravelCost>>, ServiceError> {
        self.table_within(origins, destinations, None)
    }

    fn table_within(
        &self,
        origins: &[Coordinate],
        destinations: &[Coordinate],
        timeout: Option<Duration>,
    ) -> Result<Vec<Vec<TravelCost>>, ServiceError> {
        if origins.is_empty() || destinations.is_empty() {
            return Ok(vec![Vec::new(); origins.len()]);
        }

        let url = format!(
            "{}/v2/matrix/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.profile
        );
        let body = MatrixRequest::new(origins, destinations);
        debug!(origins = origins.len(), destinations = destinations.len(), "requesting ORS matrix");

        let mut request = self.client.post(url).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.header(reqwest::header::AUTHORIZATION, key);
        }

        let response = with_timeout(request, self.config.timeout_secs, timeout)
            .send()
            .map_err(classify_transport)?;
        let status = response.status();
        let text = response.text().map_err(classify_transport)?;
        if !status.is_success() {
            return Err(classify_status(status, &text));
        }

        let parsed: MatrixResponse = serde_json::from_str(&text)
            .map_err(|err| ServiceError::InvalidResponse(err.to_string()))?;
        combine_tables(parsed.distances, parsed.durations, origins.len(), destinations.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_request_omits_indices() {
        let points = [
            Coordinate { lat: 7.07, lng: 125.61 },
            Coordinate { lat: 7.08, lng: 125.62 },
        ];
        let request = MatrixRequest::new(&points, &points);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["locations"][0][0], 125.61);
        assert_eq!(json["locations"][0][1], 7.07);
        assert!(json.get("sources").is_none());
        assert_eq!(json["metrics"], serde_json::json!(["distance", "duration"]));
    }

    #[test]
    fn test_rectangular_request_indices() {
        let origins = [Coordinate { lat: 7.07, lng: 125.61 }];
        let destinations = [
            Coordinate { lat: 7.08, lng: 125.62 },
            Coordinate { lat: 7.09, lng: 125.63 },
        ];
        let request = MatrixRequest::new(&origins, &destinations);
        assert_eq!(request.locations.len(), 3);
        assert_eq!(request.sources, Some(vec![0]));
        assert_eq!(request.destinations, Some(vec![1, 2]));
    }

    #[test]
    fn test_default_cap() {
        let client = OrsClient::new(OrsConfig::default()).unwrap();
        assert_eq!(client.max_locations_per_request(), Some(DEFAULT_MAX_LOCATIONS));
        assert!(client.fingerprint().starts_with("ors:"));
    }
}
