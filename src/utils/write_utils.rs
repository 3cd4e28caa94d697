//! Low-level layout helpers for the GeoTIFF writer

use std::io::Write;

use crate::errors::SceneResult;

/// Next multiple of `boundary` at or after `offset`
pub fn align_to(offset: u64, boundary: u64) -> u64 {
    let remainder = offset % boundary;
    if remainder == 0 {
        offset
    } else {
        offset + (boundary - remainder)
    }
}

/// Pads a block that started aligned so the next write is aligned again
pub fn write_padding(writer: &mut impl Write, data_len: usize, boundary: usize) -> SceneResult<()> {
    let padding = (boundary - (data_len % boundary)) % boundary;
    if padding > 0 {
        writer.write_all(&vec![0u8; padding])?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alignment() {
        assert_eq!(align_to(8, 4), 8);
        assert_eq!(align_to(9, 4), 12);
        assert_eq!(align_to(9, 8), 16);
    }

    #[test]
    fn padding_matches_alignment() {
        let mut out = Vec::new();
        write_padding(&mut out, 5, 4).unwrap();
        assert_eq!(out.len(), 3);
    }
}
