//! Acquisition date helpers

use chrono::{Datelike, NaiveDate};

use crate::errors::{SceneError, SceneResult};

/// `2020-05-17` -> `20200517`
pub fn encode_yyyymmdd(date: NaiveDate) -> u32 {
    date.year() as u32 * 10_000 + date.month() * 100 + date.day()
}

/// Inverse of [`encode_yyyymmdd`]; `None` for values that are not a calendar day
pub fn decode_yyyymmdd(value: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt((value / 10_000) as i32, (value / 100) % 100, value % 100)
}

/// Parses `YYYY-MM-DD`
pub fn parse_iso_date(text: &str) -> SceneResult<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .map_err(|e| SceneError::InvalidConfig(format!("Invalid date '{}': {}", text, e)))
}

/// Parses the compact `YYYYMMDD` form used in Landsat product ids
pub fn parse_compact_date(text: &str) -> SceneResult<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y%m%d")
        .map_err(|e| SceneError::InvalidConfig(format!("Invalid acquisition date '{}': {}", text, e)))
}
