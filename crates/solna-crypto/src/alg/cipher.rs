#![forbid(unsafe_code)]

//! Block cipher algorithms.

use super::{static_id, EncryptionAlgorithm};
use crate::backend::{BlockCipherBackend, EncryptionBackend};
use crate::key::Key;
use solna_core::{algorithm, Error, Result};

const AES_IDS: &[&str] = &[
    algorithm::AES128_CBC,
    algorithm::AES192_CBC,
    algorithm::AES256_CBC,
    algorithm::AES128_GCM,
    algorithm::AES192_GCM,
    algorithm::AES256_GCM,
];

const TRIPLEDES_IDS: &[&str] = &[algorithm::TRIPLEDES_CBC];

/// Check that `key` is symmetric and exactly as long as `id` requires.
fn check_symmetric(id: &str, key: &Key) -> Result<()> {
    let Some(symmetric) = key.as_symmetric() else {
        return Err(Error::InvalidKey(format!("{id} cannot use a {}", key.kind_name())));
    };
    let expected = algorithm::required_key_length(id)
        .ok_or_else(|| Error::UnsupportedAlgorithm(format!("block cipher: {id}")))?;
    if symmetric.len() != expected {
        return Err(Error::InvalidKey(format!(
            "{id} needs a {expected} byte key, got {}",
            symmetric.len()
        )));
    }
    Ok(())
}

macro_rules! block_cipher_algorithm {
    ($name:ident, $ids:expr, $doc:literal) => {
        #[doc = $doc]
        pub struct $name {
            id: &'static str,
            key: Key,
            backend: Box<dyn EncryptionBackend>,
        }

        impl $name {
            /// Identifiers this algorithm implements.
            pub const IDENTIFIERS: &'static [&'static str] = $ids;

            pub fn new(key: Key, algorithm_id: &str) -> Result<Self> {
                let id = static_id(Self::IDENTIFIERS, algorithm_id).ok_or_else(|| {
                    Error::UnsupportedAlgorithm(format!("block cipher: {algorithm_id}"))
                })?;
                check_symmetric(id, &key)?;
                Ok(Self {
                    id,
                    key,
                    backend: Box::new(BlockCipherBackend::new(id)?),
                })
            }
        }

        impl EncryptionAlgorithm for $name {
            fn algorithm_id(&self) -> &str {
                self.id
            }

            fn key(&self) -> &Key {
                &self.key
            }

            fn set_backend(&mut self, mut backend: Box<dyn EncryptionBackend>) -> Result<()> {
                backend.set_cipher(self.id)?;
                self.backend = backend;
                Ok(())
            }

            fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
                self.backend.encrypt(&self.key, plaintext)
            }

            fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
                self.backend.decrypt(&self.key, ciphertext)
            }
        }
    };
}

block_cipher_algorithm!(Aes, AES_IDS, "AES in CBC or GCM mode.");
block_cipher_algorithm!(TripleDes, TRIPLEDES_IDS, "Triple DES (EDE3) in CBC mode.");

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::SymmetricKey;

    #[test]
    fn test_aes_round_trip() {
        for id in Aes::IDENTIFIERS {
            let len = algorithm::required_key_length(id).unwrap();
            let aes = Aes::new(SymmetricKey::generate(len).unwrap().into(), id).unwrap();
            assert_eq!(aes.algorithm_id(), *id);
            let ct = aes.encrypt(b"<Secret>42</Secret>").unwrap();
            assert_eq!(aes.decrypt(&ct).unwrap(), b"<Secret>42</Secret>");
        }
    }

    #[test]
    fn test_triple_des_round_trip() {
        let des = TripleDes::new(SymmetricKey::generate(24).unwrap().into(), algorithm::TRIPLEDES_CBC)
            .unwrap();
        let ct = des.encrypt(b"legacy").unwrap();
        assert_eq!(ct.len(), 16);
        assert_eq!(des.decrypt(&ct).unwrap(), b"legacy");
    }

    #[test]
    fn test_exact_key_length() {
        let short = SymmetricKey::generate(16).unwrap();
        assert!(matches!(
            Aes::new(short.into(), algorithm::AES256_CBC),
            Err(Error::InvalidKey(_))
        ));
        let key = SymmetricKey::generate(16).unwrap();
        assert!(matches!(
            Aes::new(key.into(), algorithm::TRIPLEDES_CBC),
            Err(Error::UnsupportedAlgorithm(_))
        ));
    }
}
