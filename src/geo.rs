use crate::gpx_types::GpxPoint;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great circle distance in meters between two coordinates (haversine).
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Distance between two GPX points, including the elevation change when
/// both points carry one.
pub fn point_distance(a: &GpxPoint, b: &GpxPoint) -> f64 {
    let flat = haversine_distance(a.lat, a.lon, b.lat, b.lon);
    match (a.ele, b.ele) {
        (Some(ea), Some(eb)) => flat.hypot(eb - ea),
        _ => flat,
    }
}
