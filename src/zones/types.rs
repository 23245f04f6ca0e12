// Core data structures for the calibrated playing surface

use serde::{Deserialize, Serialize};

/// A 2D point in camera pixel coordinates.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn distance(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

impl From<[f64; 2]> for Point {
    fn from(value: [f64; 2]) -> Self {
        Self::new(value[0], value[1])
    }
}

/// A zone exactly as the calibration collaborator delivers it, before validation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ZoneDefinition {
    pub id: String,
    #[serde(with = "point_pairs")]
    pub points: Vec<Point>,
    #[serde(default)]
    pub parent: Option<String>,
}

impl ZoneDefinition {
    pub fn new(id: impl Into<String>, points: Vec<Point>) -> Self {
        Self {
            id: id.into(),
            points,
            parent: None,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }
}

/// Calibration files store vertices as `[x, y]` pairs.
mod point_pairs {
    use serde::{Deserialize, Deserializer, Serializer, ser::SerializeSeq};

    use super::Point;

    pub fn serialize<S: Serializer>(points: &[Point], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(points.len()))?;
        for point in points {
            seq.serialize_element(&[point.x, point.y])?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Point>, D::Error> {
        let pairs = Vec::<[f64; 2]>::deserialize(deserializer)?;
        Ok(pairs.into_iter().map(Point::from).collect())
    }
}

/// The part a primary zone plays in putt classification.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ZoneRole {
    /// Where a putt begins (the ramp)
    Launch,
    /// The hole
    Target,
    /// Ball re-emerges without having scored
    Return,
    /// Ball captured off target
    Catch,
    /// Anywhere else on the playing surface
    Field,
    /// Never produces events
    Exclusion,
}

impl ZoneRole {
    /// Higher wins when a point falls inside several primary zones.
    pub(crate) fn precedence(&self) -> u8 {
        match self {
            ZoneRole::Exclusion => 5,
            ZoneRole::Target => 4,
            ZoneRole::Return => 3,
            ZoneRole::Catch => 2,
            ZoneRole::Launch => 1,
            ZoneRole::Field => 0,
        }
    }
}

/// Directional subdivision of the target zone used to label makes.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Quadrant {
    Top,
    Right,
    Low,
    Left,
}

impl Quadrant {
    pub const ALL: [Quadrant; 4] = [Quadrant::Top, Quadrant::Right, Quadrant::Low, Quadrant::Left];

    pub fn as_str(&self) -> &'static str {
        match self {
            Quadrant::Top => "TOP",
            Quadrant::Right => "RIGHT",
            Quadrant::Low => "LOW",
            Quadrant::Left => "LEFT",
        }
    }
}

impl std::fmt::Display for Quadrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Zone ids of the target quadrants.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct QuadrantZones {
    pub top: String,
    pub right: String,
    pub low: String,
    pub left: String,
}

impl QuadrantZones {
    pub fn id(&self, quadrant: Quadrant) -> &str {
        match quadrant {
            Quadrant::Top => &self.top,
            Quadrant::Right => &self.right,
            Quadrant::Low => &self.low,
            Quadrant::Left => &self.left,
        }
    }

    pub fn quadrant_of(&self, zone_id: &str) -> Option<Quadrant> {
        Quadrant::ALL.into_iter().find(|q| self.id(*q) == zone_id)
    }
}

impl Default for QuadrantZones {
    fn default() -> Self {
        Self {
            top: "HOLE_TOP".to_string(),
            right: "HOLE_RIGHT".to_string(),
            low: "HOLE_LOW".to_string(),
            left: "HOLE_LEFT".to_string(),
        }
    }
}

/// Maps zone ids to the roles the classifier understands, so any equivalently
/// calibrated surface can be used.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ZoneRoles {
    pub launch: String,
    pub target: String,
    pub return_track: String,
    pub catch: String,
    pub field: Vec<String>,
    pub exclusion: Vec<String>,
    pub quadrants: QuadrantZones,
}

impl Default for ZoneRoles {
    fn default() -> Self {
        Self {
            launch: "RAMP".to_string(),
            target: "HOLE".to_string(),
            return_track: "RETURN_TRACK".to_string(),
            catch: "CATCH".to_string(),
            field: vec!["PUTTING_MAT".to_string(), "LEFT_OF_MAT".to_string()],
            exclusion: vec!["IGNORE_AREA".to_string()],
            quadrants: QuadrantZones::default(),
        }
    }
}

impl ZoneRoles {
    /// `None` for a zone that no role names. The caller decides what an
    /// unmapped zone counts as.
    pub fn role_of(&self, zone_id: &str) -> Option<ZoneRole> {
        if zone_id == self.launch {
            Some(ZoneRole::Launch)
        } else if zone_id == self.target {
            Some(ZoneRole::Target)
        } else if zone_id == self.return_track {
            Some(ZoneRole::Return)
        } else if zone_id == self.catch {
            Some(ZoneRole::Catch)
        } else if self.exclusion.iter().any(|z| z == zone_id) {
            Some(ZoneRole::Exclusion)
        } else if self.field.iter().any(|z| z == zone_id) {
            Some(ZoneRole::Field)
        } else {
            None
        }
    }
}
