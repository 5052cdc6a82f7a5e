//! Spherical geometry for region subdivision.
//!
//! All functions are pure: no I/O, no randomness, same input → same output.
//!
//! # Coordinate System
//!
//! - Latitude: degrees north (-90 to 90)
//! - Longitude: degrees east (-180 to 180)
//! - Bearing: degrees clockwise from true north (0-360)
//! - Distance: meters unless a [`DistanceUnit`] says otherwise

use std::f64::consts::PI;

use mapsweep_shared::{DistanceUnit, LatLng, SearchRegion};

/// Mean Earth radius in meters (IUGG).
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Degrees to radians conversion factor.
const DEG_TO_RAD: f64 = PI / 180.0;

/// Radians to degrees conversion factor.
const RAD_TO_DEG: f64 = 180.0 / PI;

/// Project a point along a bearing for a given distance.
///
/// Uses the spherical-earth destination formula, accurate enough for the
/// city-scale radii a sweep works with.
///
/// # Arguments
///
/// * `start` - Starting point
/// * `bearing_deg` - Bearing in degrees clockwise from north
/// * `distance_m` - Distance to travel in meters
///
/// # Example
///
/// ```
/// use mapsweep_geo::destination;
/// use mapsweep_shared::LatLng;
///
/// // ~111 km north of the equator is about one degree of latitude
/// let p = destination(LatLng::new(0.0, 0.0), 0.0, 111_195.0);
/// assert!((p.lat - 1.0).abs() < 0.01);
/// assert!(p.lng.abs() < 1e-9);
/// ```
pub fn destination(start: LatLng, bearing_deg: f64, distance_m: f64) -> LatLng {
    let lat1 = start.lat * DEG_TO_RAD;
    let lon1 = start.lng * DEG_TO_RAD;
    let bearing = bearing_deg * DEG_TO_RAD;
    let angular = distance_m / EARTH_RADIUS_M;

    let (sin_lat1, cos_lat1) = lat1.sin_cos();
    let (sin_d, cos_d) = angular.sin_cos();

    let lat2 = (sin_lat1 * cos_d + cos_lat1 * sin_d * bearing.cos()).asin();
    let lon2 = lon1 + (bearing.sin() * sin_d * cos_lat1).atan2(cos_d - sin_lat1 * lat2.sin());

    LatLng {
        lat: lat2 * RAD_TO_DEG,
        lng: normalize_longitude(lon2 * RAD_TO_DEG),
    }
}

/// Great-circle distance between two points in meters (haversine).
pub fn haversine_m(from: LatLng, to: LatLng) -> f64 {
    let lat1 = from.lat * DEG_TO_RAD;
    let lat2 = to.lat * DEG_TO_RAD;
    let delta_lat = (to.lat - from.lat) * DEG_TO_RAD;
    let delta_lon = (to.lng - from.lng) * DEG_TO_RAD;

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Split a region into `fanout` smaller, overlapping child regions.
///
/// Child centers sit half the parent radius away from the parent center, on
/// evenly spaced bearings starting due north and going clockwise. Each child
/// gets `radius / factor` and `depth + 1`. A kilometer radius that drops
/// below 1 km is re-expressed in meters so query text stays readable.
///
/// The union of the children approximately covers the parent; overlap is
/// expected and resolved downstream by identity-key deduplication.
/// Callers are responsible for `factor > 1` (see `ExploreConfig::validate`).
pub fn subdivide(region: &SearchRegion, fanout: u32, factor: f64) -> Vec<SearchRegion> {
    let offset_m = region.radius_meters() / 2.0;
    let (radius, unit) = scaled_radius(region.radius, region.unit, factor);

    (0..fanout)
        .map(|i| {
            let bearing = 360.0 * f64::from(i) / f64::from(fanout);
            SearchRegion {
                center: destination(region.center, bearing, offset_m),
                radius,
                unit,
                depth: region.depth + 1,
            }
        })
        .collect()
}

/// Radius in meters that children of `region` would have.
pub fn child_radius_m(region: &SearchRegion, factor: f64) -> f64 {
    region.radius_meters() / factor
}

fn scaled_radius(radius: f64, unit: DistanceUnit, factor: f64) -> (f64, DistanceUnit) {
    let scaled = radius / factor;
    match unit {
        DistanceUnit::Kilometers if scaled < 1.0 => (scaled * 1000.0, DistanceUnit::Meters),
        unit => (scaled, unit),
    }
}

/// Format a point with hemisphere letters, e.g. `("41.8781° N", "87.6298° W")`.
///
/// Values are printed as-is, without rounding.
pub fn format_coordinates(point: LatLng) -> (String, String) {
    let lat_dir = if point.lat >= 0.0 { 'N' } else { 'S' };
    let lon_dir = if point.lng >= 0.0 { 'E' } else { 'W' };
    (
        format!("{}° {lat_dir}", point.lat.abs()),
        format!("{}° {lon_dir}", point.lng.abs()),
    )
}

fn normalize_longitude(lng: f64) -> f64 {
    let wrapped = (lng + 180.0).rem_euclid(360.0) - 180.0;
    // rem_euclid maps +180 to -180; keep the sign the caller asked for.
    if wrapped == -180.0 && lng > 0.0 { 180.0 } else { wrapped }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chicago(radius: f64, unit: DistanceUnit) -> SearchRegion {
        SearchRegion::root(LatLng::new(41.8781, -87.6298), radius, unit)
    }

    #[test]
    fn destination_roundtrips_with_haversine() {
        let start = LatLng::new(41.8781, -87.6298);
        for bearing in [0.0, 45.0, 90.0, 180.0, 270.0] {
            let end = destination(start, bearing, 2500.0);
            let dist = haversine_m(start, end);
            assert!((dist - 2500.0).abs() < 0.5, "bearing {bearing}: {dist}");
        }
    }

    #[test]
    fn destination_wraps_antimeridian() {
        let p = destination(LatLng::new(0.0, 179.99), 90.0, 5000.0);
        assert!(p.lng < -179.0, "expected wrap, got {}", p.lng);
    }

    #[test]
    fn haversine_one_degree_latitude() {
        let d = haversine_m(LatLng::new(0.0, 0.0), LatLng::new(1.0, 0.0));
        assert!((d - 111_195.0).abs() < 100.0);
    }

    #[test]
    fn subdivide_shrinks_radius_and_increments_depth() {
        let parent = chicago(5.0, DistanceUnit::Kilometers);
        for fanout in 2..=8 {
            let children = subdivide(&parent, fanout, 2.0);
            assert_eq!(children.len(), fanout as usize);
            for child in &children {
                assert!(child.radius_meters() < parent.radius_meters());
                assert_eq!(child.depth, parent.depth + 1);
                assert!(child.validate().is_ok());
            }
        }
    }

    #[test]
    fn subdivide_places_children_half_a_radius_out() {
        let parent = chicago(4.0, DistanceUnit::Kilometers);
        let children = subdivide(&parent, 4, 2.0);

        for child in &children {
            let offset = haversine_m(parent.center, child.center);
            assert!((offset - 2000.0).abs() < 1.0, "offset {offset}");
        }

        // First child is due north: same longitude, higher latitude.
        assert!(children[0].center.lat > parent.center.lat);
        assert!((children[0].center.lng - parent.center.lng).abs() < 1e-9);
        // Second child (bearing 90) is east.
        assert!(children[1].center.lng > parent.center.lng);
    }

    #[test]
    fn subdivide_is_deterministic() {
        let parent = chicago(3.0, DistanceUnit::Kilometers);
        assert_eq!(subdivide(&parent, 6, 2.5), subdivide(&parent, 6, 2.5));
    }

    #[test]
    fn subdivide_switches_to_meters_below_one_km() {
        let parent = chicago(1.5, DistanceUnit::Kilometers);
        let children = subdivide(&parent, 4, 2.0);
        assert_eq!(children[0].unit, DistanceUnit::Meters);
        assert!((children[0].radius - 750.0).abs() < 1e-9);

        let grandchildren = subdivide(&children[0], 4, 2.0);
        assert_eq!(grandchildren[0].unit, DistanceUnit::Meters);
        assert!((grandchildren[0].radius - 375.0).abs() < 1e-9);
        assert_eq!(grandchildren[0].depth, 2);
    }

    #[test]
    fn child_radius_matches_subdivide() {
        let parent = chicago(5.0, DistanceUnit::Kilometers);
        let children = subdivide(&parent, 4, 2.0);
        assert!((child_radius_m(&parent, 2.0) - children[0].radius_meters()).abs() < 1e-9);
    }

    #[test]
    fn format_coordinates_uses_hemispheres() {
        let (lat, lng) = format_coordinates(LatLng::new(41.8781, -87.6298));
        assert_eq!(lat, "41.8781° N");
        assert_eq!(lng, "87.6298° W");

        let (lat, lng) = format_coordinates(LatLng::new(-33.8688, 151.2093));
        assert_eq!(lat, "33.8688° S");
        assert_eq!(lng, "151.2093° E");
    }
}
