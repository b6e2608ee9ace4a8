use geo::Point;

// metres
const EARTH_RADIUS: f64 = 6_371_000.0;

/// Great-circle distance in metres between two points given in decimal
/// degrees (x is longitude, y is latitude). Symmetric, and exactly zero
/// for identical inputs.
pub fn haversine_meters(a: Point, b: Point) -> f64 {
    let lat_a = a.y().to_radians();
    let lat_b = b.y().to_radians();
    let half_dlat = (lat_b - lat_a) / 2.0;
    let half_dlon = (b.x() - a.x()).to_radians() / 2.0;

    let h = half_dlat.sin().powi(2) + lat_a.cos() * lat_b.cos() * half_dlon.sin().powi(2);
    2.0 * EARTH_RADIUS * h.sqrt().asin()
}

/// Grid bucket for a point, as `(lat cell, lon cell)` under floor
/// division. Floor keeps negative coordinates on their own side of the
/// axis instead of collapsing them into cell zero.
pub fn grid_cell(p: Point, cell_size_degrees: f64) -> (i64, i64) {
    (
        (p.y() / cell_size_degrees).floor() as i64,
        (p.x() / cell_size_degrees).floor() as i64,
    )
}
