use crate::models::hub::GeoPoint;
use crate::models::zone::MIN_BOUNDARY_VERTICES;

const EARTH_RADIUS_KM: f64 = 6_371.0;

/// Tolerance, in degrees, for treating a point as lying on a polygon edge.
const EDGE_EPSILON_DEG: f64 = 1e-9;

pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let sin_lat = (delta_lat / 2.0).sin();
    let sin_lng = (delta_lng / 2.0).sin();

    let haversine = sin_lat * sin_lat + lat1.cos() * lat2.cos() * sin_lng * sin_lng;
    let central_angle = 2.0 * haversine.sqrt().atan2((1.0 - haversine).sqrt());

    EARTH_RADIUS_KM * central_angle
}

/// Ray-casting parity test with latitude as x and longitude as y.
///
/// Fewer than three vertices never contain anything. Points on an edge or
/// vertex are treated as outside, so zones that only share an edge neither
/// claim the points on it nor count as overlapping.
pub fn point_in_polygon(vertices: &[GeoPoint], point: &GeoPoint) -> bool {
    let n = vertices.len();
    if n < MIN_BOUNDARY_VERTICES {
        return false;
    }

    if on_boundary(vertices, point) {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = (vertices[i].lat, vertices[i].lng);
        let (xj, yj) = (vertices[j].lat, vertices[j].lng);

        let straddles = (yi > point.lng) != (yj > point.lng);
        if straddles && point.lat < (xj - xi) * (point.lng - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }

    inside
}

/// Whether two boundaries share interior area.
///
/// Samples each polygon at its vertices, its edge midpoints and its vertex
/// centroid (when that lies inside the polygon) and tests the samples against
/// the other polygon. Boundary points count as outside, so polygons that only
/// touch along an edge or at a corner do not overlap, while duplicates and
/// polygons reusing a sibling's corners do. Crossings that place no sample of
/// either polygon inside the other are still missed.
pub fn boundaries_overlap(a: &[GeoPoint], b: &[GeoPoint]) -> bool {
    if a.len() < MIN_BOUNDARY_VERTICES || b.len() < MIN_BOUNDARY_VERTICES {
        return false;
    }

    overlap_samples(a).iter().any(|p| point_in_polygon(b, p))
        || overlap_samples(b).iter().any(|p| point_in_polygon(a, p))
}

fn overlap_samples(vertices: &[GeoPoint]) -> Vec<GeoPoint> {
    let n = vertices.len();
    let mut samples = Vec::with_capacity(2 * n + 1);
    samples.extend_from_slice(vertices);

    for i in 0..n {
        let (a, b) = (vertices[i], vertices[(i + 1) % n]);
        samples.push(GeoPoint::new((a.lat + b.lat) / 2.0, (a.lng + b.lng) / 2.0));
    }

    let centroid = GeoPoint::new(
        vertices.iter().map(|v| v.lat).sum::<f64>() / n as f64,
        vertices.iter().map(|v| v.lng).sum::<f64>() / n as f64,
    );
    if point_in_polygon(vertices, &centroid) {
        samples.push(centroid);
    }

    samples
}

fn on_boundary(vertices: &[GeoPoint], point: &GeoPoint) -> bool {
    let n = vertices.len();
    (0..n).any(|i| on_segment(&vertices[i], &vertices[(i + 1) % n], point))
}

fn on_segment(a: &GeoPoint, b: &GeoPoint, p: &GeoPoint) -> bool {
    let cross = (b.lat - a.lat) * (p.lng - a.lng) - (b.lng - a.lng) * (p.lat - a.lat);
    let length = ((b.lat - a.lat).powi(2) + (b.lng - a.lng).powi(2)).sqrt();
    if cross.abs() > EDGE_EPSILON_DEG * length.max(1.0) {
        return false;
    }

    p.lat >= a.lat.min(b.lat) - EDGE_EPSILON_DEG
        && p.lat <= a.lat.max(b.lat) + EDGE_EPSILON_DEG
        && p.lng >= a.lng.min(b.lng) - EDGE_EPSILON_DEG
        && p.lng <= a.lng.max(b.lng) + EDGE_EPSILON_DEG
}

#[cfg(test)]
mod tests {
    use super::{boundaries_overlap, haversine_km, point_in_polygon};
    use crate::models::hub::GeoPoint;

    fn polygon(points: &[(f64, f64)]) -> Vec<GeoPoint> {
        points.iter().map(|&(lat, lng)| GeoPoint::new(lat, lng)).collect()
    }

    fn square() -> Vec<GeoPoint> {
        polygon(&[(0.0, 0.0), (0.0, 10.0), (10.0, 10.0), (10.0, 0.0)])
    }

    #[test]
    fn zero_distance_for_same_point() {
        let p = GeoPoint::new(53.5511, 9.9937);
        let distance = haversine_km(&p, &p);
        assert!(distance < 1e-9);
    }

    #[test]
    fn london_to_paris_is_around_343_km() {
        let london = GeoPoint::new(51.5074, -0.1278);
        let paris = GeoPoint::new(48.8566, 2.3522);
        let distance = haversine_km(&london, &paris);
        assert!((distance - 343.0).abs() < 5.0);
    }

    #[test]
    fn one_degree_of_latitude_is_about_111_km() {
        let distance = haversine_km(&GeoPoint::new(0.0, 0.0), &GeoPoint::new(1.0, 0.0));
        assert!((distance - 111.19).abs() < 0.1);
    }

    #[test]
    fn square_contains_its_centre() {
        assert!(point_in_polygon(&square(), &GeoPoint::new(5.0, 5.0)));
    }

    #[test]
    fn square_excludes_far_point() {
        assert!(!point_in_polygon(&square(), &GeoPoint::new(20.0, 20.0)));
        assert!(!point_in_polygon(&square(), &GeoPoint::new(-1.0, 5.0)));
    }

    #[test]
    fn degenerate_polygon_contains_nothing() {
        let line = polygon(&[(0.0, 0.0), (10.0, 10.0)]);
        assert!(!point_in_polygon(&line, &GeoPoint::new(5.0, 5.0)));
        assert!(!point_in_polygon(&line, &GeoPoint::new(0.0, 0.0)));
        assert!(!point_in_polygon(&[], &GeoPoint::new(0.0, 0.0)));
    }

    #[test]
    fn edge_and_vertex_points_are_outside() {
        let sq = square();
        assert!(!point_in_polygon(&sq, &GeoPoint::new(0.0, 5.0)));
        assert!(!point_in_polygon(&sq, &GeoPoint::new(10.0, 5.0)));
        assert!(!point_in_polygon(&sq, &GeoPoint::new(5.0, 10.0)));
        assert!(!point_in_polygon(&sq, &GeoPoint::new(10.0, 10.0)));
        assert!(!point_in_polygon(&sq, &GeoPoint::new(0.0, 0.0)));
    }

    #[test]
    fn concave_polygon_respects_the_notch() {
        let l_shape = polygon(&[
            (0.0, 0.0),
            (0.0, 10.0),
            (5.0, 10.0),
            (5.0, 5.0),
            (10.0, 5.0),
            (10.0, 0.0),
        ]);

        assert!(point_in_polygon(&l_shape, &GeoPoint::new(2.0, 8.0)));
        assert!(point_in_polygon(&l_shape, &GeoPoint::new(7.0, 2.0)));
        assert!(!point_in_polygon(&l_shape, &GeoPoint::new(7.0, 7.0)));
    }

    #[test]
    fn vertex_order_does_not_matter() {
        let mut reversed = square();
        reversed.reverse();
        assert!(point_in_polygon(&reversed, &GeoPoint::new(5.0, 5.0)));
        assert!(!point_in_polygon(&reversed, &GeoPoint::new(15.0, 5.0)));
    }

    #[test]
    fn identical_boundaries_overlap() {
        assert!(boundaries_overlap(&square(), &square()));

        let mut rotated = square();
        rotated.rotate_left(2);
        assert!(boundaries_overlap(&square(), &rotated));
    }

    #[test]
    fn polygon_built_from_sibling_corners_overlaps() {
        let half = polygon(&[(0.0, 0.0), (0.0, 10.0), (10.0, 10.0)]);
        assert!(boundaries_overlap(&half, &square()));
        assert!(boundaries_overlap(&square(), &half));
    }

    #[test]
    fn touching_boundaries_do_not_overlap() {
        let east = polygon(&[(0.0, 10.0), (0.0, 20.0), (10.0, 20.0), (10.0, 10.0)]);
        let corner = polygon(&[(10.0, 10.0), (10.0, 20.0), (20.0, 20.0), (20.0, 10.0)]);
        assert!(!boundaries_overlap(&square(), &east));
        assert!(!boundaries_overlap(&square(), &corner));
    }

    #[test]
    fn edge_crossing_through_a_midpoint_overlaps() {
        let tall = polygon(&[(0.0, 4.0), (0.0, 6.0), (10.0, 6.0), (10.0, 4.0)]);
        let wide = polygon(&[(4.0, 0.0), (4.0, 10.0), (6.0, 10.0), (6.0, 0.0)]);
        assert!(boundaries_overlap(&tall, &wide));
    }
}
