pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Urban road distance is approximated as a constant multiple of the
/// straight-line distance rather than real routing.
pub const ROAD_FACTOR: f64 = 1.35;

fn to_radians(degrees: f64) -> f64 {
    degrees * std::f64::consts::PI / 180.0
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

pub fn haversine_distance(
    latitude_1: f64,
    longitude_1: f64,
    latitude2: f64,
    longitude_2: f64,
) -> f64 {
    let lat1_rad = to_radians(latitude_1);
    let lon1_rad = to_radians(longitude_1);
    let lat2_rad = to_radians(latitude2);
    let lon2_rad = to_radians(longitude_2);

    let dlat = lat2_rad - lat1_rad;
    let dlon = lon2_rad - lon1_rad;

    let a = (dlat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Straight-line ("as the crow flies") distance between two points, in km.
pub fn straight_line_km(a: Coordinates, b: Coordinates) -> f64 {
    haversine_distance(a.lat, a.lng, b.lat, b.lng)
}

/// Approximate road distance: the straight line, inflated by `ROAD_FACTOR`.
///
/// Kept as a function distinct from `straight_line_km` so that callers
/// needing the straight-line distance (e.g. airport proximity checks) never
/// have to divide back out a multiplier applied upstream.
pub fn road_km(a: Coordinates, b: Coordinates) -> f64 {
    straight_line_km(a, b) * ROAD_FACTOR
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_point_has_zero_distance() {
        let p = Coordinates::new(12.9716, 77.5946);
        assert!(straight_line_km(p, p) < 1e-9);
    }

    #[test]
    fn road_km_is_straight_line_times_factor() {
        let a = Coordinates::new(12.9716, 77.5946);
        let b = Coordinates::new(12.9352, 77.6245);
        let straight = straight_line_km(a, b);
        assert!((road_km(a, b) - straight * ROAD_FACTOR).abs() < 1e-9);
    }
}
