#![forbid(unsafe_code)]

//! AES key wrap (RFC 3394).

use super::{symmetric_bytes, EncryptionBackend};
use crate::key::Key;
use aes_kw::Kek;
use solna_core::{algorithm, Error, Result};

#[derive(Debug, Clone)]
pub struct KeyWrapBackend {
    kek_len: usize,
}

impl KeyWrapBackend {
    pub fn new(algorithm_id: &str) -> Result<Self> {
        let mut backend = Self { kek_len: 16 };
        backend.set_cipher(algorithm_id)?;
        Ok(backend)
    }

    fn kek<'k>(&self, key: &'k Key) -> Result<&'k [u8]> {
        let bytes = symmetric_bytes(key, "AES key wrap")?;
        if bytes.len() != self.kek_len {
            return Err(Error::InvalidKey(format!(
                "expected {} byte KEK, got {}",
                self.kek_len,
                bytes.len()
            )));
        }
        Ok(bytes)
    }
}

impl EncryptionBackend for KeyWrapBackend {
    fn set_cipher(&mut self, algorithm_id: &str) -> Result<()> {
        if !algorithm::KEY_WRAP_ALGORITHMS.contains(&algorithm_id) {
            return Err(Error::InvalidArgument(format!("unknown key wrap algorithm: {algorithm_id}")));
        }
        self.kek_len = algorithm::required_key_length(algorithm_id).unwrap_or(16);
        Ok(())
    }

    fn encrypt(&self, key: &Key, plaintext: &[u8]) -> Result<Vec<u8>> {
        let kek_bytes = self.kek(key)?;
        macro_rules! do_wrap {
            ($aes:ty) => {
                Kek::<$aes>::new(kek_bytes.into())
                    .wrap_vec(plaintext)
                    .map_err(|e| Error::Crypto(format!("AES-KW wrap: {e}")))
            };
        }
        match self.kek_len {
            16 => do_wrap!(aes::Aes128),
            24 => do_wrap!(aes::Aes192),
            _ => do_wrap!(aes::Aes256),
        }
    }

    fn decrypt(&self, key: &Key, ciphertext: &[u8]) -> Result<Vec<u8>> {
        let kek_bytes = self.kek(key)?;
        macro_rules! do_unwrap {
            ($aes:ty) => {
                Kek::<$aes>::new(kek_bytes.into())
                    .unwrap_vec(ciphertext)
                    .map_err(|e| Error::Crypto(format!("AES-KW unwrap: {e}")))
            };
        }
        match self.kek_len {
            16 => do_unwrap!(aes::Aes128),
            24 => do_unwrap!(aes::Aes192),
            _ => do_unwrap!(aes::Aes256),
        }
    }

    fn clone_box(&self) -> Box<dyn EncryptionBackend> {
        Box::new(self.clone())
    }
}
