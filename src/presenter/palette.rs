//! Linear colour ramps

use crate::errors::{SceneError, SceneResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        RgbColor { r, g, b }
    }

    /// Parses `#RRGGBB` or `RRGGBB`
    pub fn from_hex(hex: &str) -> SceneResult<Self> {
        let digits = hex.trim().trim_start_matches('#');
        let invalid = || SceneError::InvalidConfig(format!("Invalid colour '{}'", hex));
        if digits.len() != 6 || !digits.is_ascii() {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).map_err(|_| invalid());
        Ok(RgbColor::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

/// Evenly spaced colour stops
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    stops: Vec<RgbColor>,
}

impl Palette {
    pub fn new(stops: Vec<RgbColor>) -> SceneResult<Self> {
        if stops.is_empty() {
            return Err(SceneError::InvalidConfig("Palette needs at least one colour".to_string()));
        }
        Ok(Palette { stops })
    }

    pub fn from_hex(colors: &[&str]) -> SceneResult<Self> {
        Palette::new(colors.iter().map(|c| RgbColor::from_hex(c)).collect::<SceneResult<Vec<_>>>()?)
    }

    pub fn grayscale() -> Self {
        Palette { stops: vec![RgbColor::new(0, 0, 0), RgbColor::new(255, 255, 255)] }
    }

    pub fn blue_cyan() -> Self {
        Palette { stops: vec![RgbColor::new(0, 0, 255), RgbColor::new(0, 255, 255)] }
    }

    /// Colour at `t` in `[0, 1]`, interpolated between neighbouring stops
    pub fn color_at(&self, t: f64) -> RgbColor {
        if self.stops.len() == 1 {
            return self.stops[0];
        }
        let position = t.clamp(0.0, 1.0) * (self.stops.len() - 1) as f64;
        let lower = (position.floor() as usize).min(self.stops.len() - 2);
        let frac = position - lower as f64;
        let (a, b) = (self.stops[lower], self.stops[lower + 1]);
        let mix = |x: u8, y: u8| (x as f64 * (1.0 - frac) + y as f64 * frac).round() as u8;
        RgbColor::new(mix(a.r, b.r), mix(a.g, b.g), mix(a.b, b.b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_parsing() {
        assert_eq!(RgbColor::from_hex("#00FFFF").unwrap(), RgbColor::new(0, 255, 255));
        assert_eq!(RgbColor::from_hex("ff8000").unwrap(), RgbColor::new(255, 128, 0));
        assert!(RgbColor::from_hex("#0FF").is_err());
        assert!(RgbColor::from_hex("#GG0000").is_err());
    }

    #[test]
    fn three_stop_ramp_interpolates() {
        let palette = Palette::from_hex(&["#000000", "#FF0000", "#FFFFFF"]).unwrap();
        assert_eq!(palette.color_at(0.25), RgbColor::new(128, 0, 0));
        assert_eq!(palette.color_at(0.5), RgbColor::new(255, 0, 0));
        assert_eq!(palette.color_at(2.0), RgbColor::new(255, 255, 255));
        assert!(Palette::from_hex(&[]).is_err());
    }
}
