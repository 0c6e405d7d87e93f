//! Helpers shared by the HTTP routing adapters.

use std::time::Duration;

use reqwest::StatusCode;

use crate::error::ServiceError;
use crate::matrix::TravelCost;

pub(crate) fn blocking_client(timeout_secs: u64) -> Result<reqwest::blocking::Client, reqwest::Error> {
    reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
}

/// Bounds one request by the client timeout or `remaining`, whichever is
/// shorter.
pub(crate) fn with_timeout(
    request: reqwest::blocking::RequestBuilder,
    client_timeout_secs: u64,
    remaining: Option<Duration>,
) -> reqwest::blocking::RequestBuilder {
    match remaining {
        Some(remaining) => {
            request.timeout(remaining.min(Duration::from_secs(client_timeout_secs)))
        }
        None => request,
    }
}

/// Maps an HTTP status to the error class the builder retries on.
pub(crate) fn classify_status(status: StatusCode, body: &str) -> ServiceError {
    let detail = format!("HTTP {}: {}", status.as_u16(), body.trim());
    match status {
        StatusCode::TOO_MANY_REQUESTS => ServiceError::RateLimited(detail),
        StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY => {
            ServiceError::InvalidCoordinates(detail)
        }
        status if status.is_server_error() => ServiceError::Unavailable(detail),
        _ => ServiceError::InvalidResponse(detail),
    }
}

pub(crate) fn classify_transport(err: reqwest::Error) -> ServiceError {
    if err.is_decode() {
        ServiceError::InvalidResponse(err.to_string())
    } else {
        ServiceError::Unavailable(err.to_string())
    }
}

/// Zips distance and duration tables into cost rows, checking the shape.
///
/// A `None` cell means the service found no route between the two points.
pub(crate) fn combine_tables(
    distances: Option<Vec<Vec<Option<f64>>>>,
    durations: Option<Vec<Vec<Option<f64>>>>,
    rows: usize,
    cols: usize,
) -> Result<Vec<Vec<TravelCost>>, ServiceError> {
    let distances =
        distances.ok_or_else(|| ServiceError::InvalidResponse("missing distances".to_string()))?;
    let durations =
        durations.ok_or_else(|| ServiceError::InvalidResponse("missing durations".to_string()))?;

    if distances.len() != rows || durations.len() != rows {
        return Err(ServiceError::InvalidResponse(format!(
            "expected {rows} rows, got {} distances and {} durations",
            distances.len(),
            durations.len()
        )));
    }

    distances
        .into_iter()
        .zip(durations)
        .enumerate()
        .map(|(row, (distance_row, duration_row))| {
            if distance_row.len() != cols || duration_row.len() != cols {
                return Err(ServiceError::InvalidResponse(format!(
                    "row {row}: expected {cols} columns"
                )));
            }
            distance_row
                .into_iter()
                .zip(duration_row)
                .enumerate()
                .map(|(col, cell)| match cell {
                    (Some(distance), Some(duration)) => Ok(TravelCost::new(distance, duration)),
                    _ => Err(ServiceError::InvalidCoordinates(format!(
                        "no route between origin {row} and destination {col}"
                    ))),
                })
                .collect()
        })
        .collect()
}
