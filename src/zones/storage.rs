// Loading zone calibrations from disk

use std::{collections::BTreeMap, fs, path::Path};

use log::{debug, info, warn};
use serde::Deserialize;

use crate::errors::PuttrackError;

use super::types::{Point, ZoneDefinition};

const LEGACY_SUFFIX: &str = "_ROI";

/// Zones handed over by the calibration collaborator.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Calibration {
    pub zones: Vec<ZoneDefinition>,
    /// Set when the zones came from the older flat `NAME_ROI -> points` map,
    /// whose hole quadrants may be in an outdated shape.
    pub legacy_format: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CalibrationFile {
    Zones { zones: Vec<ZoneDefinition> },
    Legacy(BTreeMap<String, serde_json::Value>),
}

/// Load a calibration file in either the zone list or the legacy map format.
pub fn load_calibration(path: &Path) -> Result<Calibration, PuttrackError> {
    let content =
        fs::read_to_string(path).map_err(|e| PuttrackError::ZoneConfigIOError { source: e })?;
    let calibration = parse_calibration(&content)?;
    info!(
        "Loaded {} zones from {:?} (legacy format: {})",
        calibration.zones.len(),
        path,
        calibration.legacy_format
    );
    Ok(calibration)
}

pub fn parse_calibration(content: &str) -> Result<Calibration, PuttrackError> {
    let file: CalibrationFile = serde_json::from_str(content)
        .map_err(|e| PuttrackError::ZoneConfigParseError { source: e })?;
    Ok(match file {
        CalibrationFile::Zones { zones } => Calibration {
            zones,
            legacy_format: false,
        },
        CalibrationFile::Legacy(map) => Calibration {
            zones: zones_from_legacy_map(map),
            legacy_format: true,
        },
    })
}

fn zones_from_legacy_map(map: BTreeMap<String, serde_json::Value>) -> Vec<ZoneDefinition> {
    let mut zones: Vec<ZoneDefinition> = map
        .into_iter()
        .filter_map(|(name, value)| {
            // some entries are wrapped as {"points": [...]}
            let value = match value {
                serde_json::Value::Object(mut obj) => obj.remove("points")?,
                other => other,
            };
            match serde_json::from_value::<Vec<[f64; 2]>>(value) {
                Ok(pairs) => {
                    let id = name
                        .strip_suffix(LEGACY_SUFFIX)
                        .unwrap_or(&name)
                        .to_string();
                    Some(ZoneDefinition::new(
                        id,
                        pairs.into_iter().map(Point::from).collect(),
                    ))
                }
                Err(e) => {
                    debug!("Skipping non-polygon calibration entry {}: {}", name, e);
                    None
                }
            }
        })
        .collect();

    // a zone named PARENT_SUFFIX belongs to the longest other zone named PARENT
    let ids: Vec<String> = zones.iter().map(|z| z.id.clone()).collect();
    for zone in zones.iter_mut() {
        zone.parent = ids
            .iter()
            .filter(|candidate| {
                *candidate != &zone.id
                    && zone
                        .id
                        .strip_prefix(candidate.as_str())
                        .is_some_and(|rest| rest.starts_with('_'))
            })
            .max_by_key(|candidate| candidate.len())
            .cloned();
    }
    if zones.is_empty() {
        warn!("Legacy calibration contained no polygons");
    }
    zones
}
