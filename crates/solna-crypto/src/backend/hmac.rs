#![forbid(unsafe_code)]

//! HMAC over SHA-1 and SHA-2.

use super::{symmetric_bytes, SigningBackend};
use crate::digest::HashKind;
use crate::key::Key;
use hmac::{Hmac, Mac};
use solna_core::{Error, Result};

#[derive(Debug, Clone)]
pub struct HmacBackend {
    hash: HashKind,
}

impl HmacBackend {
    pub fn new(digest_uri: &str) -> Result<Self> {
        Ok(Self {
            hash: HashKind::from_uri(digest_uri)?,
        })
    }

    fn mac(&self, key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
        macro_rules! compute {
            ($hash:ty) => {{
                let mut mac = Hmac::<$hash>::new_from_slice(key)
                    .map_err(|e| Error::Crypto(format!("HMAC init: {e}")))?;
                mac.update(data);
                Ok(mac.finalize().into_bytes().to_vec())
            }};
        }
        match self.hash {
            HashKind::Sha1 => compute!(sha1::Sha1),
            HashKind::Sha224 => compute!(sha2::Sha224),
            HashKind::Sha256 => compute!(sha2::Sha256),
            HashKind::Sha384 => compute!(sha2::Sha384),
            HashKind::Sha512 => compute!(sha2::Sha512),
        }
    }
}

impl SigningBackend for HmacBackend {
    fn set_digest_algorithm(&mut self, digest_uri: &str) -> Result<()> {
        self.hash = HashKind::from_uri(digest_uri)?;
        Ok(())
    }

    fn sign(&self, key: &Key, plaintext: &[u8]) -> Result<Vec<u8>> {
        self.mac(symmetric_bytes(key, "HMAC")?, plaintext)
    }

    fn verify(&self, key: &Key, plaintext: &[u8], signature: &[u8]) -> Result<bool> {
        let expected = self.mac(symmetric_bytes(key, "HMAC")?, plaintext)?;
        Ok(crate::ct::bytes_equal(&expected, signature))
    }
}
