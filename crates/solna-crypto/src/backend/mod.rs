#![forbid(unsafe_code)]

//! Primitive providers.
//!
//! A backend is configured once with an identifier and then performs the
//! raw operation for whatever [`Key`] it is handed. Unknown identifiers are
//! rejected at configuration time with `InvalidArgument`, never at use time.

mod block;
mod hmac;
mod keywrap;
mod rsa;

pub use self::block::BlockCipherBackend;
pub use self::hmac::HmacBackend;
pub use self::keywrap::KeyWrapBackend;
pub use self::rsa::{OaepParams, RsaBackend};

use crate::key::Key;
use solna_core::Result;

/// Keyed signature/MAC primitive.
pub trait SigningBackend: Send + Sync {
    /// Select the digest by URI.
    fn set_digest_algorithm(&mut self, digest_uri: &str) -> Result<()>;

    fn sign(&self, key: &Key, plaintext: &[u8]) -> Result<Vec<u8>>;

    fn verify(&self, key: &Key, plaintext: &[u8], signature: &[u8]) -> Result<bool>;
}

/// Encryption primitive.
pub trait EncryptionBackend: Send + Sync {
    /// Select the cipher by algorithm URI.
    fn set_cipher(&mut self, algorithm_id: &str) -> Result<()>;

    fn encrypt(&self, key: &Key, plaintext: &[u8]) -> Result<Vec<u8>>;

    fn decrypt(&self, key: &Key, ciphertext: &[u8]) -> Result<Vec<u8>>;

    /// Clone into a new box; lets contexts hand out copies of an override.
    fn clone_box(&self) -> Box<dyn EncryptionBackend>;
}

impl Clone for Box<dyn EncryptionBackend> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

impl std::fmt::Debug for dyn EncryptionBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EncryptionBackend")
    }
}

/// Borrow the bytes of a symmetric key or fail with `InvalidKey`.
fn symmetric_bytes<'k>(key: &'k Key, purpose: &str) -> Result<&'k [u8]> {
    key.as_symmetric()
        .map(|k| k.as_bytes())
        .ok_or_else(|| {
            solna_core::Error::InvalidKey(format!("{purpose} requires a symmetric key, got {}", key.kind_name()))
        })
}
