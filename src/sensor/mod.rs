//! Sensor band roles
//!
//! Which bands hold red, near-infrared, thermal and quality data, and
//! how raw digital numbers scale to physical units, per sensor.

mod profile;

pub use self::profile::{LinearScale, SensorProfile, SensorRegistry};
