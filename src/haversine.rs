//! Straight-line routing service.
//!
//! Costs come from the great-circle distance and a fixed average speed, so no
//! routing server is needed. Roads are ignored; real legs are longer.

use crate::error::ServiceError;
use crate::matrix::TravelCost;
use crate::stop::Coordinate;
use crate::traits::RoutingService;

/// City driving speed used when none is configured.
pub const DEFAULT_SPEED_KMH: f64 = 30.0;

const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone)]
pub struct HaversineMatrix {
    pub speed_kmh: f64,
}

impl Default for HaversineMatrix {
    fn default() -> Self {
        Self::new(DEFAULT_SPEED_KMH)
    }
}

impl HaversineMatrix {
    pub fn new(speed_kmh: f64) -> Self {
        Self { speed_kmh }
    }

    /// Great-circle distance in kilometers.
    pub fn haversine_km(from: Coordinate, to: Coordinate) -> f64 {
        let (from_lat, to_lat) = (from.lat.to_radians(), to.lat.to_radians());
        let half_dlat = (to.lat - from.lat).to_radians() / 2.0;
        let half_dlng = (to.lng - from.lng).to_radians() / 2.0;

        let h = half_dlat.sin().powi(2) + from_lat.cos() * to_lat.cos() * half_dlng.sin().powi(2);
        2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
    }

    /// Whole seconds to cover `km` at the configured speed.
    fn travel_seconds(&self, km: f64) -> f64 {
        (km / self.speed_kmh * 3600.0).round()
    }

    /// Cost of one straight-line leg: whole meters and whole seconds.
    pub fn leg(&self, from: Coordinate, to: Coordinate) -> TravelCost {
        let km = Self::haversine_km(from, to);
        TravelCost::new((km * 1000.0).round(), self.travel_seconds(km))
    }
}

impl RoutingService for HaversineMatrix {
    fn fingerprint(&self) -> String {
        format!("haversine:{}", self.speed_kmh)
    }

    fn table(
        &self,
        origins: &[Coordinate],
        destinations: &[Coordinate],
    ) -> Result<Vec<Vec<TravelCost>>, ServiceError> {
        Ok(origins
            .iter()
            .map(|from| destinations.iter().map(|to| self.leg(*from, *to)).collect())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CITY_HALL: Coordinate = Coordinate { lat: 7.0644, lng: 125.6078 };
    const AIRPORT: Coordinate = Coordinate { lat: 7.1255, lng: 125.6459 };

    #[test]
    fn test_zero_for_identical_points() {
        assert_eq!(HaversineMatrix::haversine_km(CITY_HALL, CITY_HALL), 0.0);
    }

    #[test]
    fn test_davao_to_cagayan_de_oro() {
        // About 190 km as the crow flies.
        let km = HaversineMatrix::haversine_km(CITY_HALL, Coordinate { lat: 8.48, lng: 124.65 });
        assert!((170.0..210.0).contains(&km), "got {km} km");
    }

    #[test]
    fn test_table_has_zero_diagonal_and_is_symmetric() {
        let points = [CITY_HALL, AIRPORT, Coordinate { lat: 7.09, lng: 125.60 }];
        let table = HaversineMatrix::default().table(&points, &points).unwrap();

        for i in 0..points.len() {
            assert_eq!(table[i][i], TravelCost::ZERO);
            for j in 0..points.len() {
                assert_eq!(table[i][j], table[j][i]);
            }
        }
    }

    #[test]
    fn test_rectangular_table() {
        let table = HaversineMatrix::default()
            .table(&[CITY_HALL], &[AIRPORT, CITY_HALL])
            .unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table[0].len(), 2);
        assert!(table[0][0].distance > 7_000.0 && table[0][0].distance < 9_000.0);
    }

    #[test]
    fn test_duration_follows_speed() {
        // 10 km at 40 km/h is a quarter hour.
        assert_eq!(HaversineMatrix::new(40.0).travel_seconds(10.0), 900.0);
        assert_eq!(HaversineMatrix::new(20.0).travel_seconds(10.0), 1800.0);
    }

    #[test]
    fn test_fingerprint_depends_on_speed() {
        assert_ne!(
            HaversineMatrix::new(30.0).fingerprint(),
            HaversineMatrix::new(45.0).fingerprint()
        );
    }
}
