#![forbid(unsafe_code)]

//! Key transport algorithms: RSA (PKCS#1 v1.5, OAEP) and AES key wrap.

use super::{static_id, EncryptionAlgorithm, KeyTransportAlgorithm};
use crate::backend::{EncryptionBackend, KeyWrapBackend, OaepParams, RsaBackend};
use crate::key::Key;
use solna_core::{algorithm, Error, Result};

/// RSA key transport. A public key encrypts session keys, a private key
/// decrypts them.
pub struct RsaTransport {
    id: &'static str,
    key: Key,
    backend: Box<dyn EncryptionBackend>,
}

impl RsaTransport {
    pub const IDENTIFIERS: &'static [&'static str] = algorithm::KEY_TRANSPORT_ALGORITHMS;

    pub fn new(key: Key, algorithm_id: &str) -> Result<Self> {
        Self::with_oaep_params(key, algorithm_id, OaepParams::default())
    }

    /// Build with explicit OAEP digest, MGF and label.
    pub fn with_oaep_params(key: Key, algorithm_id: &str, params: OaepParams) -> Result<Self> {
        let id = static_id(Self::IDENTIFIERS, algorithm_id)
            .ok_or_else(|| Error::UnsupportedAlgorithm(format!("key transport: {algorithm_id}")))?;
        if key.is_symmetric() {
            return Err(Error::InvalidKey(format!("{id} cannot use a {}", key.kind_name())));
        }
        let mut backend = RsaBackend::for_cipher(id)?;
        backend.set_oaep_params(params)?;
        Ok(Self {
            id,
            key,
            backend: Box::new(backend),
        })
    }
}

/// AES key wrap (RFC 3394) under a symmetric key-encryption key.
pub struct AesKeyWrap {
    id: &'static str,
    key: Key,
    backend: Box<dyn EncryptionBackend>,
}

impl AesKeyWrap {
    pub const IDENTIFIERS: &'static [&'static str] = algorithm::KEY_WRAP_ALGORITHMS;

    pub fn new(key: Key, algorithm_id: &str) -> Result<Self> {
        let id = static_id(Self::IDENTIFIERS, algorithm_id)
            .ok_or_else(|| Error::UnsupportedAlgorithm(format!("key wrap: {algorithm_id}")))?;
        if !key.is_symmetric() {
            return Err(Error::InvalidKey(format!("{id} cannot use a {}", key.kind_name())));
        }
        Ok(Self {
            id,
            key,
            backend: Box::new(KeyWrapBackend::new(id)?),
        })
    }
}

macro_rules! impl_encryption_algorithm {
    ($name:ident) => {
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

        impl KeyTransportAlgorithm for $name {}
    };
}

impl_encryption_algorithm!(RsaTransport);
impl_encryption_algorithm!(AesKeyWrap);
