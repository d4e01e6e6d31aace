//! Packed color helpers.

/// Splits a packed `0xRRGGBB` color into normalized `[r, g, b]` channels.
#[inline]
#[must_use]
pub fn unpack_rgb(color: u32) -> [f32; 3] {
    [
        ((color >> 16) & 0xff) as f32 / 255.0,
        ((color >> 8) & 0xff) as f32 / 255.0,
        (color & 0xff) as f32 / 255.0,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unpack_rgb() {
        assert_eq!(unpack_rgb(0xff_00_00), [1.0, 0.0, 0.0]);
        assert_eq!(unpack_rgb(0x00_ff_00), [0.0, 1.0, 0.0]);
        assert_eq!(unpack_rgb(0x00_00_ff), [0.0, 0.0, 1.0]);
        // Bits above the low 24 are ignored
        assert_eq!(unpack_rgb(0xff_00_00_00), [0.0, 0.0, 0.0]);
    }
}
