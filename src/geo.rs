/// Mean Earth radius used for great-circle distances (metres)
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine great-circle distance in metres between two decimal-degree
/// positions on a spherical Earth
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    EARTH_RADIUS_M * 2.0 * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Latitude `metres` due north of `lat`
pub fn offset_north(lat: f64, metres: f64) -> f64 {
    lat + (metres / EARTH_RADIUS_M).to_degrees()
}
