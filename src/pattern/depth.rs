//! 16-bit to 8-bit sample reduction
//!
//! Photoshop stores 16-bit channel samples in the range 0..=32768. Each
//! sample maps to `floor(v * 10 / 1285)`, which sends 32768 to exactly 255.

/// Largest 16-bit sample value Photoshop writes
pub const MAX_16BIT_SAMPLE: u16 = 32768;

const TABLE_LEN: usize = MAX_16BIT_SAMPLE as usize + 1;

static DEPTH_16_TO_8: [u8; TABLE_LEN] = build_table();

const fn build_table() -> [u8; TABLE_LEN] {
    let mut table = [0u8; TABLE_LEN];
    let mut v = 0;
    while v < TABLE_LEN {
        table[v] = (v * 10 / 1285) as u8;
        v += 1;
    }
    table
}

/// The shared conversion table, indexed by 16-bit sample value
pub fn depth_table() -> &'static [u8; TABLE_LEN] {
    &DEPTH_16_TO_8
}

/// Reduce one 16-bit sample; values above 32768 clamp to 255
#[inline]
pub fn sample_16_to_8(v: u16) -> u8 {
    DEPTH_16_TO_8[v.min(MAX_16BIT_SAMPLE) as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_endpoints() {
        let table = depth_table();
        assert_eq!(table.len(), 32769);
        assert_eq!(table[0], 0);
        assert_eq!(table[32768], 255);
    }

    #[test]
    fn test_table_matches_formula_and_is_monotonic() {
        let table = depth_table();
        for v in 0..table.len() {
            assert_eq!(table[v] as usize, v * 10 / 1285);
            if v > 0 {
                assert!(table[v] >= table[v - 1]);
            }
        }
    }

    #[test]
    fn test_clamps_out_of_domain() {
        assert_eq!(sample_16_to_8(40000), 255);
        assert_eq!(sample_16_to_8(u16::MAX), 255);
        assert_eq!(sample_16_to_8(128), 0);
        assert_eq!(sample_16_to_8(129), 1);
    }
}
