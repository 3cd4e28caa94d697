//! Sensor profiles and the registry that resolves them

use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::errors::{SceneError, SceneResult};

const DEFAULT_OPTICAL_PATTERN: &str = "SR_B.";
const DEFAULT_THERMAL_PATTERN: &str = "ST_B.*";
const DEFAULT_QA_BAND: &str = "QA_PIXEL";
/// dilated cloud, cloud, cloud shadow
const DEFAULT_MASK_BITS: [u8; 3] = [1, 3, 4];

lazy_static! {
    static ref BUILTIN_SENSORS: BTreeMap<String, SensorProfile> = {
        let content = include_str!("../../sensors.toml");
        let mut profiles = BTreeMap::new();
        if let Err(e) = SensorRegistry::merge_toml(&mut profiles, content) {
            eprintln!("Warning: Failed to parse built-in sensor table: {}", e);
        }
        profiles
    };
}

/// `value * gain + offset`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    pub gain: f64,
    pub offset: f64,
}

impl LinearScale {
    pub const fn new(gain: f64, offset: f64) -> Self {
        LinearScale { gain, offset }
    }

    /// Collection 2 surface reflectance
    pub const SURFACE_REFLECTANCE: LinearScale = LinearScale::new(0.0000275, -0.2);
    /// Collection 2 surface temperature, Kelvin
    pub const SURFACE_TEMPERATURE: LinearScale = LinearScale::new(0.00341802, 149.0);

    pub fn apply(&self, value: f64) -> f64 {
        value * self.gain + self.offset
    }
}

/// Band roles of one sensor
#[derive(Debug, Clone)]
pub struct SensorProfile {
    pub name: String,
    /// Archive collection id, e.g. `LANDSAT/LC08/C02/T1_L2`
    pub collection: String,
    pub optical_pattern: Regex,
    pub thermal_pattern: Regex,
    pub red: String,
    pub nir: String,
    pub thermal: String,
    pub qa: String,
    pub optical_scale: LinearScale,
    pub thermal_scale: LinearScale,
    /// QA bits that mark a pixel unusable
    pub mask_bits: Vec<u8>,
}

impl SensorProfile {
    /// Bands the standard transform chain reads
    pub fn required_bands(&self) -> Vec<&str> {
        vec![self.red.as_str(), self.nir.as_str(), self.thermal.as_str(), self.qa.as_str()]
    }

    pub fn is_optical(&self, band: &str) -> bool {
        self.optical_pattern.is_match(band)
    }

    pub fn is_thermal(&self, band: &str) -> bool {
        self.thermal_pattern.is_match(band)
    }

    /// OR of the masked QA bits
    pub fn mask_value(&self) -> u64 {
        self.mask_bits.iter().fold(0u64, |acc, bit| acc | (1u64 << bit))
    }

    /// Builds a profile from a `[sensors.<name>]` table, taking unset
    /// keys from `base` or from the Collection 2 defaults
    fn from_table(name: &str, table: &toml::value::Table, base: Option<&SensorProfile>) -> SceneResult<Self> {
        let text = |key: &str| -> SceneResult<Option<String>> {
            match table.get(key) {
                None => Ok(None),
                Some(value) => value
                    .as_str()
                    .map(|s| Some(s.to_string()))
                    .ok_or_else(|| SceneError::InvalidConfig(format!("sensors.{}.{} must be a string", name, key))),
            }
        };
        let number = |key: &str| -> SceneResult<Option<f64>> {
            match table.get(key) {
                None => Ok(None),
                Some(value) => value
                    .as_float()
                    .or_else(|| value.as_integer().map(|i| i as f64))
                    .map(Some)
                    .ok_or_else(|| SceneError::InvalidConfig(format!("sensors.{}.{} must be a number", name, key))),
            }
        };
        let role = |key: &str, inherited: Option<&String>| -> SceneResult<String> {
            text(key)?
                .or_else(|| inherited.cloned())
                .ok_or_else(|| SceneError::InvalidConfig(format!("sensors.{} is missing '{}'", name, key)))
        };

        let optical_pattern = match text("optical_pattern")? {
            Some(pattern) => compile_band_pattern(&pattern)?,
            None => base.map(|b| b.optical_pattern.clone()).map_or_else(|| compile_band_pattern(DEFAULT_OPTICAL_PATTERN), Ok)?,
        };
        let thermal_pattern = match text("thermal_pattern")? {
            Some(pattern) => compile_band_pattern(&pattern)?,
            None => base.map(|b| b.thermal_pattern.clone()).map_or_else(|| compile_band_pattern(DEFAULT_THERMAL_PATTERN), Ok)?,
        };

        let optical_base = base.map_or(LinearScale::SURFACE_REFLECTANCE, |b| b.optical_scale);
        let thermal_base = base.map_or(LinearScale::SURFACE_TEMPERATURE, |b| b.thermal_scale);

        let mask_bits = match table.get("mask_bits") {
            None => base.map_or_else(|| DEFAULT_MASK_BITS.to_vec(), |b| b.mask_bits.clone()),
            Some(value) => parse_mask_bits(name, value)?,
        };

        Ok(SensorProfile {
            name: name.to_string(),
            collection: role("collection", base.map(|b| &b.collection))?,
            optical_pattern,
            thermal_pattern,
            red: role("red", base.map(|b| &b.red))?,
            nir: role("nir", base.map(|b| &b.nir))?,
            thermal: role("thermal", base.map(|b| &b.thermal))?,
            qa: text("qa")?
                .or_else(|| base.map(|b| b.qa.clone()))
                .unwrap_or_else(|| DEFAULT_QA_BAND.to_string()),
            optical_scale: LinearScale::new(
                number("optical_gain")?.unwrap_or(optical_base.gain),
                number("optical_offset")?.unwrap_or(optical_base.offset),
            ),
            thermal_scale: LinearScale::new(
                number("thermal_gain")?.unwrap_or(thermal_base.gain),
                number("thermal_offset")?.unwrap_or(thermal_base.offset),
            ),
            mask_bits,
        })
    }
}

/// Band patterns must match whole band names
fn compile_band_pattern(pattern: &str) -> SceneResult<Regex> {
    Regex::new(&format!("^(?:{})$", pattern))
        .map_err(|e| SceneError::InvalidConfig(format!("Invalid band pattern '{}': {}", pattern, e)))
}

fn parse_mask_bits(name: &str, value: &toml::Value) -> SceneResult<Vec<u8>> {
    let invalid = || SceneError::InvalidConfig(format!("sensors.{}.mask_bits must be a list of bit numbers 0-63", name));
    value
        .as_array()
        .ok_or_else(invalid)?
        .iter()
        .map(|bit| bit.as_integer().filter(|b| (0..64).contains(b)).map(|b| b as u8).ok_or_else(invalid))
        .collect()
}

/// Named sensor profiles: the built-ins plus any configured overrides
#[derive(Debug, Clone)]
pub struct SensorRegistry {
    profiles: BTreeMap<String, SensorProfile>,
}

impl Default for SensorRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl SensorRegistry {
    pub fn builtin() -> Self {
        SensorRegistry { profiles: BUILTIN_SENSORS.clone() }
    }

    /// Applies the `[sensors.*]` tables of a TOML document
    ///
    /// A table named after an existing profile overrides only the keys it
    /// sets; `extends = "<name>"` starts a new profile from another one.
    pub fn apply_toml(&mut self, content: &str) -> SceneResult<()> {
        Self::merge_toml(&mut self.profiles, content)
    }

    pub fn apply_toml_file(&mut self, path: &Path) -> SceneResult<()> {
        let content = fs::read_to_string(path)?;
        self.apply_toml(&content)
    }

    fn merge_toml(profiles: &mut BTreeMap<String, SensorProfile>, content: &str) -> SceneResult<()> {
        let toml_value: toml::Value = content
            .parse()
            .map_err(|e| SceneError::InvalidConfig(format!("Failed to parse TOML: {}", e)))?;
        let sensors = match toml_value.get("sensors") {
            Some(value) => value
                .as_table()
                .ok_or_else(|| SceneError::InvalidConfig("'sensors' must be a table".to_string()))?,
            None => return Ok(()),
        };

        for (name, value) in sensors {
            let table = value
                .as_table()
                .ok_or_else(|| SceneError::InvalidConfig(format!("sensors.{} must be a table", name)))?;
            let base = match table.get("extends").and_then(|v| v.as_str()) {
                Some(parent) => Some(
                    profiles
                        .get(parent)
                        .cloned()
                        .ok_or_else(|| SceneError::InvalidConfig(format!("sensors.{} extends unknown sensor '{}'", name, parent)))?,
                ),
                None => profiles.get(name.as_str()).cloned(),
            };
            if base.is_some() {
                debug!("Overriding sensor profile {}", name);
            }
            let profile = SensorProfile::from_table(name, table, base.as_ref())?;
            profiles.insert(name.clone(), profile);
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> SceneResult<&SensorProfile> {
        self.profiles.get(name).ok_or_else(|| {
            SceneError::InvalidConfig(format!(
                "Unknown sensor '{}' (known: {})",
                name,
                self.names().join(", ")
            ))
        })
    }

    /// The profile whose collection id is `collection`
    pub fn for_collection(&self, collection: &str) -> Option<&SensorProfile> {
        let mut matches = self.profiles.values().filter(|p| p.collection == collection);
        let first = matches.next();
        if first.is_some() && matches.next().is_some() {
            warn!("Several sensors map to collection {}, using {}", collection, first.map_or("", |p| p.name.as_str()));
        }
        first
    }

    pub fn names(&self) -> Vec<&str> {
        self.profiles.keys().map(|k| k.as_str()).collect()
    }
}
