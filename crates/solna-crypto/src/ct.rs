#![forbid(unsafe_code)]

//! Constant-time comparison of digests, MACs and other secrets.

use subtle::ConstantTimeEq;

/// Compare two byte strings without short-circuiting on the first
/// differing byte. Inputs of different length compare unequal.
pub fn bytes_equal(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

/// [`bytes_equal`] over the UTF-8 encodings of two strings.
pub fn string_equals(a: &str, b: &str) -> bool {
    bytes_equal(a.as_bytes(), b.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_equal() {
        assert!(bytes_equal(b"abcdef", b"abcdef"));
        assert!(!bytes_equal(b"abcdef", b"abcdeg"));
        assert!(!bytes_equal(b"abcdef", b"abcde"));
        assert!(bytes_equal(b"", b""));
    }

    #[test]
    fn test_string_equals() {
        assert!(string_equals("digest", "digest"));
        assert!(!string_equals("digest", "Digest"));
        assert!(!string_equals("digest", "digests"));
    }
}
