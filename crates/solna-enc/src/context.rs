#![forbid(unsafe_code)]

//! Encryption context: how block ciphers are built during decryption.

use solna_core::Result;
use solna_crypto::{EncryptionAlgorithm, EncryptionAlgorithmFactory, EncryptionBackend, Key};

/// Configuration for XML-Enc operations.
#[derive(Debug, Clone, Default)]
pub struct EncContext {
    /// Builds the block cipher for a transported session key. Its blacklist
    /// and registry apply.
    pub encryption_factory: EncryptionAlgorithmFactory,
    /// Backend installed on every block cipher this context builds.
    pub backend: Option<Box<dyn EncryptionBackend>>,
}

impl EncContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_encryption_factory(mut self, factory: EncryptionAlgorithmFactory) -> Self {
        self.encryption_factory = factory;
        self
    }

    pub fn with_backend(mut self, backend: Box<dyn EncryptionBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Build the block cipher for `algorithm_id` keyed with `key`.
    pub fn block_cipher(&self, algorithm_id: &str, key: Key) -> Result<Box<dyn EncryptionAlgorithm>> {
        let mut cipher = self.encryption_factory.get_algorithm(algorithm_id, key)?;
        if let Some(backend) = &self.backend {
            cipher.set_backend(backend.clone())?;
        }
        Ok(cipher)
    }
}
