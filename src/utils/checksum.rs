// file: src/utils/checksum.rs
// description: content hashes used for fingerprints, generated ids and backups
// reference: https://docs.rs/sha2

use sha2::{Digest, Sha256};

/// 32-bit wrapping string hash over UTF-16 code units: `h = (h << 5) - h + unit`.
///
/// Not collision resistant. Stable across runs and platforms, which is all the
/// fingerprint and id generation need.
pub fn rolling_hash(input: &str) -> i32 {
    input.encode_utf16().fold(0i32, |h, unit| {
        h.wrapping_shl(5).wrapping_sub(h).wrapping_add(unit as i32)
    })
}

/// Lowercase base-36 rendering of an unsigned value.
pub fn to_base36(mut value: u32) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }

    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rolling_hash_known_values() {
        assert_eq!(rolling_hash(""), 0);
        assert_eq!(rolling_hash("a"), 97);
        // 97 * 31 + 98
        assert_eq!(rolling_hash("ab"), 3105);
    }

    #[test]
    fn test_rolling_hash_wraps() {
        let long = "书".repeat(64);
        // must not panic on overflow and stays deterministic
        assert_eq!(rolling_hash(&long), rolling_hash(&long));
    }

    #[test]
    fn test_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(3105), "2e9");
    }

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
