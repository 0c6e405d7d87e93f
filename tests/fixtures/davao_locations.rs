//! Real Davao City locations for realistic test fixtures.
//!
//! Coordinates are approximate building positions from OpenStreetMap.

/// A named location with coordinates.
#[derive(Debug, Clone)]
pub struct Location {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub const fn new(name: &'static str, lat: f64, lng: f64) -> Self {
        Self { name, lat, lng }
    }

    pub fn coords(&self) -> (f64, f64) {
        (self.lat, self.lng)
    }
}

/// Delivery hub (start and end of every route).
pub const HUB: Location = Location::new("SMC Complex Hub", 7.070884, 125.619862);

// ============================================================================
// Delivery points
// ============================================================================

pub const DELIVERY_POINTS: &[Location] = &[
    Location::new("People's Park", 7.0731, 125.6128),
    Location::new("Abreeza Mall", 7.0917, 125.6109),
    Location::new("SM Lanang Premier", 7.0990, 125.6310),
    Location::new("Davao City Hall", 7.0644, 125.6078),
    Location::new("Gaisano Mall", 7.0781, 125.6146),
    Location::new("Victoria Plaza", 7.0845, 125.6111),
    Location::new("Matina Town Square", 7.0626, 125.5977),
    Location::new("SM City Davao Ecoland", 7.0498, 125.5883),
    Location::new("NCCC Mall Buhangin", 7.1064, 125.6177),
    Location::new("Davao Crocodile Park", 7.0953, 125.5882),
    Location::new("Francisco Bangoy Airport", 7.1255, 125.6459),
    Location::new("Magsaysay Park", 7.0678, 125.6247),
];

/// `count` delivery points starting from the first.
pub fn delivery_points(count: usize) -> &'static [Location] {
    &DELIVERY_POINTS[..count.min(DELIVERY_POINTS.len())]
}
