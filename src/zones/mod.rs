// Region model: named polygons and point membership
// Zones are partially nested: the hole is split into quadrants and
// the ramp into lanes. Subzones only refine the label of their parent.

pub mod geometry;
pub mod quadrants;
pub mod storage;
pub mod types;

use log::{info, warn};

pub use geometry::{GeometryIssue, Polygon};
pub use storage::{Calibration, load_calibration, parse_calibration};
pub use types::{Point, Quadrant, QuadrantZones, ZoneDefinition, ZoneRole, ZoneRoles};

/// Problems found while building a zone set. None of them are fatal: the
/// affected zone simply never matches.
#[derive(Clone, Debug, PartialEq)]
pub enum ZoneWarning {
    Degenerate { zone: String, issue: GeometryIssue },
    MissingRoleZone { zone: String, role: ZoneRole },
    UnknownParent { zone: String, parent: String },
    DuplicateZone { zone: String },
    UnmappedZone { zone: String },
    QuadrantsReinferred { target: String },
}

impl std::fmt::Display for ZoneWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ZoneWarning::Degenerate { zone, issue } => {
                write!(f, "Zone {} disabled: polygon {}", zone, issue)
            }
            ZoneWarning::MissingRoleZone { zone, role } => {
                write!(f, "Zone {} ({:?}) is missing or disabled", zone, role)
            }
            ZoneWarning::UnknownParent { zone, parent } => {
                write!(f, "Subzone {} disabled: parent {} is not a primary zone", zone, parent)
            }
            ZoneWarning::DuplicateZone { zone } => {
                write!(f, "Zone {} defined more than once, keeping the first", zone)
            }
            ZoneWarning::UnmappedZone { zone } => {
                write!(f, "Zone {} has no role, treating it as field", zone)
            }
            ZoneWarning::QuadrantsReinferred { target } => {
                write!(f, "Quadrants of {} re-inferred from its outline", target)
            }
        }
    }
}

/// A validated zone. `polygon` is `None` when the calibrated geometry was
/// unusable, in which case the zone never matches.
#[derive(Clone, Debug)]
pub struct Zone {
    pub id: String,
    pub parent: Option<String>,
    pub polygon: Option<Polygon>,
}

impl Zone {
    pub fn contains(&self, point: Point) -> bool {
        self.polygon.as_ref().is_some_and(|p| p.contains(point))
    }

    pub fn is_enabled(&self) -> bool {
        self.polygon.is_some()
    }
}

/// Where a ball position resolved to on the playing surface.
#[derive(Clone, Debug, PartialEq)]
pub struct Location {
    /// Winning primary zone
    pub zone: String,
    pub role: ZoneRole,
    /// Most specific zone id: the matched subzone if any, else `zone`
    pub label: String,
    /// Set when `label` is one of the target quadrants
    pub quadrant: Option<Quadrant>,
    /// Whether the point is also inside the launch zone
    pub in_launch: bool,
    /// Whether the point is inside the return zone, whichever zone won
    pub in_return: bool,
    /// Whether the point is inside the catch zone, whichever zone won
    pub in_catch: bool,
}

struct PrimaryZone {
    zone: Zone,
    role: ZoneRole,
    subzones: Vec<Zone>,
}

/// The complete calibrated surface.
pub struct ZoneSet {
    primaries: Vec<PrimaryZone>,
    roles: ZoneRoles,
}

impl ZoneSet {
    /// Builds the zone set, degrading broken geometry to "never matched".
    pub fn new(calibration: Calibration, roles: ZoneRoles) -> (Self, Vec<ZoneWarning>) {
        let mut warnings = Vec::new();
        let mut primaries: Vec<PrimaryZone> = Vec::new();
        let mut children: Vec<Zone> = Vec::new();

        for definition in calibration.zones {
            let already_defined = primaries.iter().any(|p| p.zone.id == definition.id)
                || children.iter().any(|c| c.id == definition.id);
            if already_defined {
                warnings.push(ZoneWarning::DuplicateZone {
                    zone: definition.id,
                });
                continue;
            }
            let polygon = match Polygon::new(definition.points) {
                Ok(polygon) => Some(polygon),
                Err(issue) => {
                    warnings.push(ZoneWarning::Degenerate {
                        zone: definition.id.clone(),
                        issue,
                    });
                    None
                }
            };
            let zone = Zone {
                id: definition.id,
                parent: definition.parent,
                polygon,
            };
            if zone.parent.is_some() {
                children.push(zone);
            } else {
                let role = roles.role_of(&zone.id).unwrap_or_else(|| {
                    warnings.push(ZoneWarning::UnmappedZone {
                        zone: zone.id.clone(),
                    });
                    ZoneRole::Field
                });
                primaries.push(PrimaryZone {
                    role,
                    zone,
                    subzones: Vec::new(),
                });
            }
        }

        for child in children {
            let parent = child.parent.clone().unwrap_or_default();
            match primaries.iter_mut().find(|p| p.zone.id == parent) {
                Some(primary) => primary.subzones.push(child),
                None => warnings.push(ZoneWarning::UnknownParent {
                    zone: child.id,
                    parent,
                }),
            }
        }

        let mut zone_set = Self { primaries, roles };
        zone_set.recover_quadrants(calibration.legacy_format, &mut warnings);

        for (zone, role) in [
            (&zone_set.roles.launch, ZoneRole::Launch),
            (&zone_set.roles.target, ZoneRole::Target),
            (&zone_set.roles.return_track, ZoneRole::Return),
            (&zone_set.roles.catch, ZoneRole::Catch),
        ] {
            if !zone_set.zone(zone).is_some_and(Zone::is_enabled) {
                warnings.push(ZoneWarning::MissingRoleZone {
                    zone: zone.clone(),
                    role,
                });
            }
        }

        for warning in &warnings {
            warn!("{}", warning);
        }
        (zone_set, warnings)
    }

    /// Re-infers the target quadrants when any is unusable, or when a legacy
    /// calibration carries quadrants in the outdated format.
    fn recover_quadrants(&mut self, legacy_format: bool, warnings: &mut Vec<ZoneWarning>) {
        let quadrant_ids = self.roles.quadrants.clone();
        let target_id = self.roles.target.clone();
        let Some(target) = self.primaries.iter_mut().find(|p| p.zone.id == target_id) else {
            return;
        };
        let Some(outline) = target.zone.polygon.clone() else {
            return;
        };

        let needs_recovery = Quadrant::ALL.into_iter().any(|q| {
            match target.subzones.iter().find(|z| z.id == quadrant_ids.id(q)) {
                None => true,
                Some(zone) => match &zone.polygon {
                    None => true,
                    Some(p) => legacy_format && p.vertices().len() != quadrants::QUADRANT_VERTICES,
                },
            }
        });
        if !needs_recovery {
            return;
        }

        target
            .subzones
            .retain(|z| quadrant_ids.quadrant_of(&z.id).is_none());
        for (quadrant, polygon) in quadrants::infer_quadrants(&outline) {
            target.subzones.push(Zone {
                id: quadrant_ids.id(quadrant).to_string(),
                parent: Some(target_id.clone()),
                polygon: Some(polygon),
            });
        }
        // recovered quadrants are usable, drop the warnings that led here
        warnings.retain(|w| match w {
            ZoneWarning::Degenerate { zone, .. } | ZoneWarning::UnknownParent { zone, .. } => {
                quadrant_ids.quadrant_of(zone).is_none()
            }
            _ => true,
        });
        info!("Re-inferred quadrants for target zone {}", target_id);
        warnings.push(ZoneWarning::QuadrantsReinferred { target: target_id });
    }

    pub fn roles(&self) -> &ZoneRoles {
        &self.roles
    }

    /// Looks up a primary zone or subzone by id.
    pub fn zone(&self, id: &str) -> Option<&Zone> {
        self.primaries.iter().find_map(|p| {
            if p.zone.id == id {
                Some(&p.zone)
            } else {
                p.subzones.iter().find(|z| z.id == id)
            }
        })
    }

    pub fn zones(&self) -> impl Iterator<Item = &Zone> {
        self.primaries
            .iter()
            .flat_map(|p| std::iter::once(&p.zone).chain(p.subzones.iter()))
    }

    /// Resolves a ball position to its dominant primary zone and most specific
    /// label. Returns `None` when the point is outside every zone.
    pub fn locate(&self, point: Point) -> Option<Location> {
        let mut best: Option<&PrimaryZone> = None;
        let (mut in_launch, mut in_return, mut in_catch) = (false, false, false);
        for primary in &self.primaries {
            if !primary.zone.contains(point) {
                continue;
            }
            match primary.role {
                ZoneRole::Launch => in_launch = true,
                ZoneRole::Return => in_return = true,
                ZoneRole::Catch => in_catch = true,
                _ => {}
            }
            if best.is_none_or(|b| primary.role.precedence() > b.role.precedence()) {
                best = Some(primary);
            }
        }
        let primary = best?;

        let subzone = primary.subzones.iter().find(|z| z.contains(point));
        let label = subzone.map_or(&primary.zone.id, |z| &z.id).clone();
        let quadrant = match (primary.role, subzone) {
            (ZoneRole::Target, Some(z)) => self.roles.quadrants.quadrant_of(&z.id),
            _ => None,
        };
        Some(Location {
            zone: primary.zone.id.clone(),
            role: primary.role,
            label,
            quadrant,
            in_launch,
            in_return,
            in_catch,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<Point> {
        vec![
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
        ]
    }

    /// A surface laid out left to right: mat, ramp (three lanes), hole (four
    /// quadrants), catch. The return track runs along the bottom, the ignore
    /// area sits in the top left corner.
    pub(crate) fn test_calibration() -> Calibration {
        let zones = vec![
            ZoneDefinition::new("PUTTING_MAT", rect(0., 0., 100., 100.)),
            ZoneDefinition::new("RAMP", rect(100., 0., 200., 100.)),
            ZoneDefinition::new("RAMP_LEFT", rect(100., 0., 200., 33.)).with_parent("RAMP"),
            ZoneDefinition::new("RAMP_CENTER", rect(100., 33., 200., 66.)).with_parent("RAMP"),
            ZoneDefinition::new("RAMP_RIGHT", rect(100., 66., 200., 100.)).with_parent("RAMP"),
            ZoneDefinition::new("HOLE", rect(200., 25., 250., 75.)),
            ZoneDefinition::new("HOLE_TOP", rect(225., 25., 250., 70.)).with_parent("HOLE"),
            ZoneDefinition::new("HOLE_LEFT", rect(200., 25., 225., 50.)).with_parent("HOLE"),
            ZoneDefinition::new("HOLE_RIGHT", rect(200., 50., 225., 75.)).with_parent("HOLE"),
            ZoneDefinition::new("HOLE_LOW", rect(240., 70., 250., 75.)).with_parent("HOLE"),
            ZoneDefinition::new("CATCH", rect(250., 0., 300., 100.)),
            ZoneDefinition::new("RETURN_TRACK", rect(0., 100., 300., 130.)),
            ZoneDefinition::new("IGNORE_AREA", rect(0., 0., 10., 10.)),
        ];
        Calibration {
            zones,
            legacy_format: false,
        }
    }

    pub(crate) fn test_zone_set() -> ZoneSet {
        ZoneSet::new(test_calibration(), ZoneRoles::default()).0
    }

    #[test]
    fn test_valid_calibration_has_no_warnings() {
        let (_, warnings) = ZoneSet::new(test_calibration(), ZoneRoles::default());
        assert!(warnings.is_empty(), "{:?}", warnings);
    }

    #[test]
    fn test_locate_prefers_subzone_labels() {
        let zones = test_zone_set();
        let location = zones.locate(Point::new(150., 50.)).unwrap();
        assert_eq!(location.zone, "RAMP");
        assert_eq!(location.role, ZoneRole::Launch);
        assert_eq!(location.label, "RAMP_CENTER");
        assert!(location.in_launch);
        assert!(location.quadrant.is_none());

        let location = zones.locate(Point::new(230., 40.)).unwrap();
        assert_eq!(location.role, ZoneRole::Target);
        assert_eq!(location.quadrant, Some(Quadrant::Top));
    }

    #[test]
    fn test_locate_target_without_quadrant() {
        let zones = test_zone_set();
        // inside HOLE but between HOLE_TOP and HOLE_LOW
        let location = zones.locate(Point::new(230., 72.)).unwrap();
        assert_eq!(location.role, ZoneRole::Target);
        assert_eq!(location.label, "HOLE");
        assert!(location.quadrant.is_none());
        let location = zones.locate(Point::new(224.9, 74.9)).unwrap();
        assert_eq!(location.quadrant, Some(Quadrant::Right));
    }

    #[test]
    fn test_precedence_between_overlapping_zones() {
        let zones = test_zone_set();
        // ignore area overlaps the mat and wins
        let location = zones.locate(Point::new(5., 5.)).unwrap();
        assert_eq!(location.role, ZoneRole::Exclusion);
        // the shared edge of ramp and hole resolves to the hole
        let location = zones.locate(Point::new(200., 50.)).unwrap();
        assert_eq!(location.role, ZoneRole::Target);
        assert!(location.in_launch);
        assert!(zones.locate(Point::new(500., 500.)).is_none());
    }

    #[test]
    fn test_return_wins_where_it_overlaps_catch() {
        let zones = test_zone_set();
        // the return track's top edge runs along the bottom of the catch
        let location = zones.locate(Point::new(270., 100.)).unwrap();
        assert_eq!(location.role, ZoneRole::Return);
        assert!(location.in_return);
        assert!(location.in_catch);
        assert!(!location.in_launch);

        let location = zones.locate(Point::new(270., 50.)).unwrap();
        assert_eq!(location.role, ZoneRole::Catch);
        assert!(!location.in_return);
    }

    #[test]
    fn test_unmapped_zone_is_field_with_warning() {
        let mut calibration = test_calibration();
        calibration
            .zones
            .push(ZoneDefinition::new("BENCH", rect(400., 0., 450., 50.)));
        let (zones, warnings) = ZoneSet::new(calibration, ZoneRoles::default());
        assert_eq!(
            warnings,
            vec![ZoneWarning::UnmappedZone {
                zone: "BENCH".to_string()
            }]
        );
        let location = zones.locate(Point::new(420., 20.)).unwrap();
        assert_eq!(location.role, ZoneRole::Field);
    }

    #[test]
    fn test_degenerate_zone_never_matches() {
        let mut calibration = test_calibration();
        calibration.zones[3].points.truncate(2); // RAMP_CENTER
        let (zones, warnings) = ZoneSet::new(calibration, ZoneRoles::default());
        assert_eq!(
            warnings,
            vec![ZoneWarning::Degenerate {
                zone: "RAMP_CENTER".to_string(),
                issue: GeometryIssue::TooFewVertices(2)
            }]
        );
        let location = zones.locate(Point::new(150., 50.)).unwrap();
        assert_eq!(location.label, "RAMP");
    }

    #[test]
    fn test_missing_role_zone_is_reported() {
        let mut calibration = test_calibration();
        calibration.zones.retain(|z| z.id != "CATCH");
        let (_, warnings) = ZoneSet::new(calibration, ZoneRoles::default());
        assert!(warnings.contains(&ZoneWarning::MissingRoleZone {
            zone: "CATCH".to_string(),
            role: ZoneRole::Catch
        }));
    }

    #[test]
    fn test_unknown_parent_and_duplicates() {
        let mut calibration = test_calibration();
        calibration
            .zones
            .push(ZoneDefinition::new("LANE_X", rect(0., 0., 5., 5.)).with_parent("NOPE"));
        calibration
            .zones
            .push(ZoneDefinition::new("RAMP", rect(0., 0., 5., 5.)));
        let (zones, warnings) = ZoneSet::new(calibration, ZoneRoles::default());
        assert!(warnings.contains(&ZoneWarning::UnknownParent {
            zone: "LANE_X".to_string(),
            parent: "NOPE".to_string()
        }));
        assert!(warnings.contains(&ZoneWarning::DuplicateZone {
            zone: "RAMP".to_string()
        }));
        assert!(zones.zone("LANE_X").is_none());
    }

    #[test]
    fn test_missing_quadrants_are_reinferred() {
        let mut calibration = test_calibration();
        calibration.zones.retain(|z| !z.id.starts_with("HOLE_"));
        let (zones, warnings) = ZoneSet::new(calibration, ZoneRoles::default());
        assert_eq!(
            warnings,
            vec![ZoneWarning::QuadrantsReinferred {
                target: "HOLE".to_string()
            }]
        );
        for quadrant in Quadrant::ALL {
            assert!(zones
                .zone(zones.roles().quadrants.id(quadrant))
                .is_some_and(Zone::is_enabled));
        }
        // centre of HOLE is (225, 50); a point just right of it is TOP
        let location = zones.locate(Point::new(235., 50.)).unwrap();
        assert_eq!(location.quadrant, Some(Quadrant::Top));
    }

    #[test]
    fn test_legacy_quadrant_format_is_replaced() {
        let mut calibration = test_calibration();
        calibration.legacy_format = true;
        let (_, warnings) = ZoneSet::new(calibration, ZoneRoles::default());
        assert_eq!(
            warnings,
            vec![ZoneWarning::QuadrantsReinferred {
                target: "HOLE".to_string()
            }]
        );
    }
}
