//! Sample encodings of exported rasters

use std::fmt;

use crate::tiff::constants::sample_format;

/// How a band of `f64` values is stored on disk
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleEncoding {
    /// `round(value * multiplier)` clamped to ±32767; no-data is -32768
    Int16 { multiplier: f64 },
    /// No-data is NaN
    Float32,
    /// No-data is NaN
    Float64,
}

impl SampleEncoding {
    pub fn bits_per_sample(&self) -> u16 {
        match self {
            SampleEncoding::Int16 { .. } => 16,
            SampleEncoding::Float32 => 32,
            SampleEncoding::Float64 => 64,
        }
    }

    pub fn bytes_per_sample(&self) -> usize {
        self.bits_per_sample() as usize / 8
    }

    pub fn sample_format(&self) -> u16 {
        match self {
            SampleEncoding::Int16 { .. } => sample_format::SIGNED,
            SampleEncoding::Float32 | SampleEncoding::Float64 => sample_format::IEEEFP,
        }
    }

    /// Value written for no-data cells
    pub fn nodata(&self) -> f64 {
        match self {
            SampleEncoding::Int16 { .. } => i16::MIN as f64,
            SampleEncoding::Float32 | SampleEncoding::Float64 => f64::NAN,
        }
    }

    /// Appends one little-endian sample
    pub fn encode_into(&self, value: f64, out: &mut Vec<u8>) {
        match self {
            SampleEncoding::Int16 { multiplier } => out.extend_from_slice(&Self::to_i16(value, *multiplier).to_le_bytes()),
            SampleEncoding::Float32 => out.extend_from_slice(&(value as f32).to_le_bytes()),
            SampleEncoding::Float64 => out.extend_from_slice(&value.to_le_bytes()),
        }
    }

    fn to_i16(value: f64, multiplier: f64) -> i16 {
        let scaled = value * multiplier;
        if scaled.is_nan() {
            return i16::MIN;
        }
        scaled.round().clamp(-(i16::MAX as f64), i16::MAX as f64) as i16
    }
}

impl fmt::Display for SampleEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleEncoding::Int16 { multiplier } if *multiplier == 1.0 => write!(f, "int16"),
            SampleEncoding::Int16 { multiplier } => write!(f, "int16 x{}", multiplier),
            SampleEncoding::Float32 => write!(f, "float32"),
            SampleEncoding::Float64 => write!(f, "float64"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int16(value: f64, multiplier: f64) -> i16 {
        let mut out = Vec::new();
        SampleEncoding::Int16 { multiplier }.encode_into(value, &mut out);
        i16::from_le_bytes([out[0], out[1]])
    }

    #[test]
    fn int16_rounds_half_away_from_zero() {
        assert_eq!(int16(0.4375, 1000.0), 438);
        assert_eq!(int16(-0.0625, 1000.0), -63);
        assert_eq!(int16(0.4374, 1000.0), 437);
        assert_eq!(int16(301.5, 1.0), 302);
    }

    #[test]
    fn int16_clamps_and_marks_no_data() {
        assert_eq!(int16(40.0, 1000.0), 32767);
        assert_eq!(int16(-40.0, 1000.0), -32767);
        assert_eq!(int16(f64::NAN, 1000.0), -32768);
    }

    #[test]
    fn float_encodings_keep_nan() {
        let mut out = Vec::new();
        SampleEncoding::Float32.encode_into(f64::NAN, &mut out);
        assert!(f32::from_le_bytes([out[0], out[1], out[2], out[3]]).is_nan());
        out.clear();
        SampleEncoding::Float64.encode_into(20200517.0, &mut out);
        assert_eq!(out.len(), 8);
        assert_eq!(f64::from_le_bytes(out[..8].try_into().unwrap()), 20200517.0);
    }
}
