//! OSRM HTTP adapter for distance matrices (table service).

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::ServiceError;
use crate::http::{
    blocking_client, classify_status, classify_transport, combine_tables, with_timeout,
};
use crate::matrix::TravelCost;
use crate::stop::Coordinate;
use crate::traits::RoutingService;

#[derive(Debug, Clone)]
pub struct OsrmConfig {
    pub base_url: String,
    pub profile: String,
    pub timeout_secs: u64,
    /// Table size cap of the server (`--max-table-size`), per side.
    pub max_locations: Option<usize>,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            profile: "car".to_string(),
            timeout_secs: 10,
            max_locations: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OsrmClient {
    config: OsrmConfig,
    client: reqwest::blocking::Client,
}

impl OsrmClient {
    pub fn new(config: OsrmConfig) -> Result<Self, reqwest::Error> {
        let client = blocking_client(config.timeout_secs)?;
        Ok(Self { config, client })
    }

    fn table_url(&self, origins: &[Coordinate], destinations: &[Coordinate]) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        let profile = &self.config.profile;

        // Square blocks are sent once; rectangular ones list both sides.
        if origins == destinations {
            return format!(
                "{base}/table/v1/{profile}/{}?annotations=duration,distance",
                format_coordinates(origins)
            );
        }

        let mut locations = origins.to_vec();
        locations.extend_from_slice(destinations);
        let sources = index_list(0..origins.len());
        let targets = index_list(origins.len()..locations.len());

        format!(
            "{base}/table/v1/{profile}/{}?annotations=duration,distance&sources={sources}&destinations={targets}",
            format_coordinates(&locations)
        )
    }
}

impl RoutingService for OsrmClient {
    fn fingerprint(&self) -> String {
        format!("osrm:{}:{}", self.config.base_url, self.config.profile)
    }

    fn max_locations_per_request(&self) -> Option<usize> {
        self.config.max_locations
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

        let url = self.table_url(origins, destinations);
        debug!(origins = origins.len(), destinations = destinations.len(), "requesting OSRM table");

        let request = self.client.get(url);
        let response = with_timeout(request, self.config.timeout_secs, timeout)
            .send()
            .map_err(classify_transport)?;
        let status = response.status();
        let body = response.text().map_err(classify_transport)?;

        parse_table_response(status, &body, origins.len(), destinations.len())
    }
}

#[derive(Debug, Deserialize)]
struct OsrmTableResponse {
    code: String,
    message: Option<String>,
    durations: Option<Vec<Vec<Option<f64>>>>,
    distances: Option<Vec<Vec<Option<f64>>>>,
}

fn parse_table_response(
    status: reqwest::StatusCode,
    body: &str,
    rows: usize,
    cols: usize,
) -> Result<Vec<Vec<TravelCost>>, ServiceError> {
    let parsed = match serde_json::from_str::<OsrmTableResponse>(body) {
        Ok(parsed) => parsed,
        Err(_) if !status.is_success() => return Err(classify_status(status, body)),
        Err(err) => return Err(ServiceError::InvalidResponse(err.to_string())),
    };

    if parsed.code != "Ok" {
        let detail = format!(
            "{}: {}",
            parsed.code,
            parsed.message.unwrap_or_default()
        );
        return Err(match parsed.code.as_str() {
            "InvalidQuery" | "InvalidValue" | "NoSegment" | "NoTable" => {
                ServiceError::InvalidCoordinates(detail)
            }
            _ if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() => {
                classify_status(status, &detail)
            }
            _ => ServiceError::InvalidResponse(detail),
        });
    }

    combine_tables(parsed.distances, parsed.durations, rows, cols)
}

fn format_coordinates(coordinates: &[Coordinate]) -> String {
    coordinates
        .iter()
        .map(|c| format!("{:.6},{:.6}", c.lng, c.lat))
        .collect::<Vec<_>>()
        .join(";")
}

fn index_list(range: std::ops::Range<usize>) -> String {
    range.map(|i| i.to_string()).collect::<Vec<_>>().join(";")
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::*;

    fn client() -> OsrmClient {
        OsrmClient::new(OsrmConfig::default()).unwrap()
    }

    #[test]
    fn test_square_block_url_lists_locations_once() {
        let points = [
            Coordinate { lat: 7.0731, lng: 125.6128 },
            Coordinate { lat: 7.0905, lng: 125.611 },
        ];
        let url = client().table_url(&points, &points);
        assert_eq!(
            url,
            "http://localhost:5000/table/v1/car/125.612800,7.073100;125.611000,7.090500?annotations=duration,distance"
        );
    }

    #[test]
    fn test_rectangular_block_url_uses_sources_and_destinations() {
        let origins = [Coordinate { lat: 7.0, lng: 125.0 }];
        let destinations = [
            Coordinate { lat: 7.1, lng: 125.1 },
            Coordinate { lat: 7.2, lng: 125.2 },
        ];
        let url = client().table_url(&origins, &destinations);
        assert!(url.ends_with("&sources=0&destinations=1;2"), "{url}");
    }

    #[test]
    fn test_parse_ok_response() {
        let body = r#"{"code":"Ok","durations":[[0,61.2],[58.4,0]],"distances":[[0,812.3],[790.1,0]]}"#;
        let rows = parse_table_response(StatusCode::OK, body, 2, 2).unwrap();
        assert_eq!(rows[0][1], TravelCost::new(812.3, 61.2));
        assert_eq!(rows[1][0], TravelCost::new(790.1, 58.4));
    }

    #[test]
    fn test_parse_error_codes() {
        let body = r#"{"code":"InvalidQuery","message":"Query string malformed"}"#;
        let err = parse_table_response(StatusCode::BAD_REQUEST, body, 1, 1).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidCoordinates(_)));

        let body = r#"{"code":"TooBig","message":"Too many table coordinates"}"#;
        let err = parse_table_response(StatusCode::BAD_REQUEST, body, 1, 1).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidResponse(_)));
    }

    #[test]
    fn test_parse_non_json_server_error() {
        let err = parse_table_response(StatusCode::BAD_GATEWAY, "<html>", 1, 1).unwrap_err();
        assert!(err.is_transient());
    }

    #[test]
    fn test_fingerprint_includes_profile() {
        let bike = OsrmClient::new(OsrmConfig {
            profile: "bike".to_string(),
            ..OsrmConfig::default()
        })
        .unwrap();
        assert_ne!(client().fingerprint(), bike.fingerprint());
    }
}
