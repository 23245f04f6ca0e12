// Re-inference of the hole quadrants from the hole outline

use super::{
    geometry::Polygon,
    types::{Point, Quadrant},
};

const RING_VERTICES: usize = 20;
const RING_START_OFFSET_DEG: f64 = -9.;
/// Vertex count of a quadrant produced by the current calibration tool:
/// the hole centre followed by six ring vertices.
pub(crate) const QUADRANT_VERTICES: usize = 7;

/// First ring vertex of each quadrant; every quadrant spans six consecutive
/// vertices so neighbours share an edge.
fn first_ring_vertex(quadrant: Quadrant) -> usize {
    match quadrant {
        Quadrant::Top => 18,
        Quadrant::Right => 3,
        Quadrant::Low => 8,
        Quadrant::Left => 13,
    }
}

/// Rebuilds the four quadrant polygons around the centroid of `hole`, using a
/// regular 20-gon with the hole's mean vertex distance as radius.
pub fn infer_quadrants(hole: &Polygon) -> Vec<(Quadrant, Polygon)> {
    let center = hole.centroid();
    let radius = hole
        .vertices()
        .iter()
        .map(|v| v.distance(&center))
        .sum::<f64>()
        / hole.vertices().len() as f64;

    let ring: Vec<Point> = (0..RING_VERTICES)
        .map(|i| {
            let angle = (360. / RING_VERTICES as f64 * i as f64 + RING_START_OFFSET_DEG).to_radians();
            Point::new(
                center.x + radius * angle.cos(),
                center.y + radius * angle.sin(),
            )
        })
        .collect();

    Quadrant::ALL
        .into_iter()
        .filter_map(|quadrant| {
            let start = first_ring_vertex(quadrant);
            let mut vertices = Vec::with_capacity(QUADRANT_VERTICES);
            vertices.push(center);
            vertices.extend((start..start + QUADRANT_VERTICES - 1).map(|i| ring[i % RING_VERTICES]));
            Polygon::new(vertices).ok().map(|polygon| (quadrant, polygon))
        })
        .collect()
}
