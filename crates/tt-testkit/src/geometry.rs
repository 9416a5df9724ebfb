/// Mean earth radius in metres.
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Great-circle length of a lat/lon polyline, in metres.
pub fn haversine_m(points: &[(f64, f64)]) -> f64 {
    points
        .windows(2)
        .map(|w| segment_m(w[0], w[1]))
        .sum()
}

fn segment_m((lat1, lon1): (f64, f64), (lat2, lon2): (f64, f64)) -> f64 {
    let (p1, p2) = (lat1.to_radians(), lat2.to_radians());
    let dp = p2 - p1;
    let dl = (lon2 - lon1).to_radians();
    let a = (dp / 2.0).sin().powi(2) + p1.cos() * p2.cos() * (dl / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_degree_of_longitude_at_equator() {
        let m = haversine_m(&[(0.0, 0.0), (0.0, 1.0)]);
        assert!((m - 111_195.0).abs() < 10.0, "got {m}");
    }

    #[test]
    fn single_point_has_zero_length() {
        assert_eq!(haversine_m(&[(59.3, 18.0)]), 0.0);
        assert_eq!(haversine_m(&[]), 0.0);
    }
}
