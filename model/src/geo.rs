use anyhow::Result;

use feed::LonLat;

pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Great-circle distance in meters, by the haversine formula.
///
/// Both points must be valid WGS84 coordinates; garbage in, garbage out.
pub fn haversine_distance(a: LonLat, b: LonLat) -> f64 {
    let lat1 = a.y().to_radians();
    let lat2 = b.y().to_radians();
    let dlat = lat2 - lat1;
    let dlon = (b.x() - a.x()).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    // Rounding can push this just past 1 for nearly antipodal points
    let h = h.clamp(0.0, 1.0);
    EARTH_RADIUS_METERS * 2.0 * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Distance from `origin` to each point
pub fn distances_to(origin: LonLat, pts: &[LonLat]) -> Vec<f64> {
    pts.iter().map(|pt| haversine_distance(origin, *pt)).collect()
}

/// Elementwise distances between two equally long lists of points
pub fn paired_distances(from: &[LonLat], to: &[LonLat]) -> Result<Vec<f64>> {
    if from.len() != to.len() {
        bail!(
            "Can't pair up {} points with {} points",
            from.len(),
            to.len()
        );
    }
    Ok(from
        .iter()
        .zip(to)
        .map(|(a, b)| haversine_distance(*a, *b))
        .collect())
}
