//! CRC-32 checksum utility for detecting edits to applied scripts.
//!
//! Uses the IEEE 802.3 polynomial in its reflected form, which is the value
//! `java.util.zip.CRC32`, zlib and gzip all produce. Not a tamper-proof hash.

const POLY: u32 = 0xEDB8_8320;

static TABLE: [u32; 256] = build_table();

const fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ POLY
            } else {
                crc >> 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Compute the CRC-32 checksum of `content`
pub fn compute_checksum(content: &[u8]) -> u32 {
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in content {
        let idx = ((crc ^ byte as u32) & 0xFF) as usize;
        crc = (crc >> 8) ^ TABLE[idx];
    }
    crc ^ 0xFFFF_FFFF
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_value() {
        assert_eq!(compute_checksum(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(compute_checksum(b""), 0);
    }

    #[test]
    fn test_deterministic() {
        let sql = b"CREATE TABLE users (id INTEGER, name VARCHAR);";
        assert_eq!(compute_checksum(sql), compute_checksum(sql));
    }

    #[test]
    fn test_single_byte_change() {
        let original = compute_checksum(b"CREATE TABLE users (id INTEGER);");
        let edited = compute_checksum(b"CREATE TABLE users (id BIGINT);");
        let trailing = compute_checksum(b"CREATE TABLE users (id INTEGER); ");
        assert_ne!(original, edited);
        assert_ne!(original, trailing);
    }

    #[test]
    fn test_known_sentence() {
        assert_eq!(
            compute_checksum(b"The quick brown fox jumps over the lazy dog"),
            0x414F_A339
        );
    }
}
