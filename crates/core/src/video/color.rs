//! Pixel packing between the RGBA byte layout frames arrive in and the
//! packed `0x00RRGGBB` words most software window backends expect.

/// Pack one RGBA pixel into `0x00RRGGBB`. Alpha is dropped.
#[inline]
pub fn pack_0rgb(rgba: [u8; 4]) -> u32 {
    ((rgba[0] as u32) << 16) | ((rgba[1] as u32) << 8) | rgba[2] as u32
}

/// Convert a whole RGBA byte buffer into packed words, reusing `dst`'s
/// allocation.
pub fn rgba_to_0rgb(src: &[u8], dst: &mut Vec<u32>) {
    dst.clear();
    dst.extend(
        src.chunks_exact(4)
            .map(|px| pack_0rgb([px[0], px[1], px[2], px[3]])),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_drops_alpha() {
        assert_eq!(pack_0rgb([0x12, 0x34, 0x56, 0xFF]), 0x0012_3456);
        assert_eq!(pack_0rgb([0xFF, 0x00, 0x00, 0x00]), 0x00FF_0000);
    }

    #[test]
    fn buffer_conversion_reuses_vec() {
        let src = [1, 2, 3, 255, 4, 5, 6, 255];
        let mut dst = vec![0xDEAD_BEEF; 10];
        rgba_to_0rgb(&src, &mut dst);
        assert_eq!(dst, vec![0x0001_0203, 0x0004_0506]);
    }
}
