#![forbid(unsafe_code)]

//! Secure random bytes from the operating system.

use rand::rngs::OsRng;
use rand::RngCore;
use solna_core::{Error, Result};

/// Fill `buf` from the OS random source.
pub fn fill(buf: &mut [u8]) -> Result<()> {
    OsRng
        .try_fill_bytes(buf)
        .map_err(|e| Error::Crypto(format!("secure random source unavailable: {e}")))
}

/// Return `len` fresh random bytes.
pub fn bytes(len: usize) -> Result<Vec<u8>> {
    let mut out = vec![0u8; len];
    fill(&mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_are_fresh() {
        let a = bytes(32).unwrap();
        let b = bytes(32).unwrap();
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }
}
