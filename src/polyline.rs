//! Google encoded polyline format.
//!
//! The assembled route carries its stop sequence as an encoded string so a
//! map renderer can draw it without a second request.

use serde::Serialize;

use crate::stop::Coordinate;

/// Ordered points of a route line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Polyline {
    points: Vec<Coordinate>,
}

impl Polyline {
    pub fn from_coordinates(coordinates: &[Coordinate]) -> Self {
        Self {
            points: coordinates.to_vec(),
        }
    }

    /// Encodes the points keeping `precision` decimal places (5 for most map
    /// libraries, 6 for OSRM geometries).
    pub fn encode(&self, precision: u32) -> String {
        let factor = 10f64.powi(precision as i32);
        let mut encoded = String::new();
        let (mut prev_lat, mut prev_lng) = (0i64, 0i64);

        for point in &self.points {
            let lat = (point.lat * factor).round() as i64;
            let lng = (point.lng * factor).round() as i64;
            encode_value(lat - prev_lat, &mut encoded);
            encode_value(lng - prev_lng, &mut encoded);
            prev_lat = lat;
            prev_lng = lng;
        }

        encoded
    }
}

fn encode_value(value: i64, out: &mut String) {
    let mut value = if value < 0 { !(value << 1) } else { value << 1 };
    while value >= 0x20 {
        out.push((((value & 0x1f) | 0x20) as u8 + 63) as char);
        value >>= 5;
    }
    out.push((value as u8 + 63) as char);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(points: &[(f64, f64)]) -> Polyline {
        let coordinates = points
            .iter()
            .map(|&(lat, lng)| Coordinate { lat, lng })
            .collect::<Vec<_>>();
        Polyline::from_coordinates(&coordinates)
    }

    #[test]
    fn test_encode_reference_line() {
        let encoded = line(&[(38.5, -120.2), (40.7, -120.95), (43.252, -126.453)]).encode(5);
        assert_eq!(encoded, "_p~iF~ps|U_ulLnnqC_mqNvxq`@");
    }

    #[test]
    fn test_no_points_encode_to_empty_string() {
        assert_eq!(line(&[]).encode(5), "");
    }

    #[test]
    fn test_repeated_point_encodes_zero_deltas() {
        // "?" is a zero delta.
        let encoded = line(&[(38.5, -120.2), (38.5, -120.2)]).encode(5);
        assert_eq!(encoded, "_p~iF~ps|U??");
    }

    #[test]
    fn test_precision_scales_values() {
        // 1e-5 degrees is one unit at precision 5 and ten at precision 6.
        assert_eq!(line(&[(0.00001, 0.0)]).encode(5), "A?");
        assert_eq!(line(&[(0.00001, 0.0)]).encode(6), "S?");
    }
}
