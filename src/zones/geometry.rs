// Polygon containment and moments

use super::types::Point;

const EPSILON: f64 = 1e-9;

/// Reasons a calibrated polygon cannot be used for containment tests.
#[derive(Clone, Debug, PartialEq)]
pub enum GeometryIssue {
    TooFewVertices(usize),
    NonFiniteVertex,
    ZeroArea,
}

impl std::fmt::Display for GeometryIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeometryIssue::TooFewVertices(n) => write!(f, "needs at least 3 vertices, got {}", n),
            GeometryIssue::NonFiniteVertex => write!(f, "contains a non-finite vertex"),
            GeometryIssue::ZeroArea => write!(f, "encloses no area"),
        }
    }
}

/// A validated simple polygon. Construction guarantees at least three finite
/// vertices and a non-zero area.
#[derive(Clone, Debug, PartialEq)]
pub struct Polygon {
    vertices: Vec<Point>,
    signed_area: f64,
}

impl Polygon {
    pub fn new(vertices: Vec<Point>) -> Result<Self, GeometryIssue> {
        if vertices.len() < 3 {
            return Err(GeometryIssue::TooFewVertices(vertices.len()));
        }
        if vertices.iter().any(|p| !p.is_finite()) {
            return Err(GeometryIssue::NonFiniteVertex);
        }
        let signed_area = shoelace(&vertices);
        if signed_area.abs() < EPSILON {
            return Err(GeometryIssue::ZeroArea);
        }
        Ok(Self {
            vertices,
            signed_area,
        })
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    pub fn area(&self) -> f64 {
        self.signed_area.abs()
    }

    /// Ray casting test. Points lying on an edge count as inside.
    pub fn contains(&self, point: Point) -> bool {
        if !point.is_finite() {
            return false;
        }
        let n = self.vertices.len();
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let a = self.vertices[i];
            let b = self.vertices[j];
            if on_segment(point, a, b) {
                return true;
            }
            if (a.y > point.y) != (b.y > point.y) {
                let x_cross = (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x;
                if point.x < x_cross {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    /// Area centroid from the first order polygon moments.
    pub fn centroid(&self) -> Point {
        let n = self.vertices.len();
        let (mut cx, mut cy) = (0., 0.);
        for i in 0..n {
            let a = self.vertices[i];
            let b = self.vertices[(i + 1) % n];
            let cross = a.x * b.y - b.x * a.y;
            cx += (a.x + b.x) * cross;
            cy += (a.y + b.y) * cross;
        }
        let factor = 1. / (6. * self.signed_area);
        Point::new(cx * factor, cy * factor)
    }
}

fn shoelace(vertices: &[Point]) -> f64 {
    let n = vertices.len();
    let mut sum = 0.;
    for i in 0..n {
        let a = vertices[i];
        let b = vertices[(i + 1) % n];
        sum += a.x * b.y - b.x * a.y;
    }
    sum / 2.
}

fn on_segment(p: Point, a: Point, b: Point) -> bool {
    let cross = (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
    if cross.abs() > EPSILON * (1. + a.distance(&b)) {
        return false;
    }
    p.x >= a.x.min(b.x) - EPSILON
        && p.x <= a.x.max(b.x) + EPSILON
        && p.y >= a.y.min(b.y) - EPSILON
        && p.y <= a.y.max(b.y) + EPSILON
}
