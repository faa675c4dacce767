#![forbid(unsafe_code)]

//! Algorithm objects.
//!
//! An algorithm binds one identifier to a key of the right family and to a
//! backend that performs the primitive. Construction validates the key, so
//! a built algorithm is always usable; `set_backend` swaps the primitive
//! provider and re-applies the identifier to it.

mod cipher;
mod signature;
mod transport;

pub use self::cipher::{Aes, TripleDes};
pub use self::signature::{signature_method, Hmac, Rsa, SignatureFamily, SignatureMethod};
pub use self::transport::{AesKeyWrap, RsaTransport};

use crate::backend::{EncryptionBackend, SigningBackend};
use crate::key::Key;
use solna_core::Result;

/// A signature or MAC algorithm bound to a key.
pub trait SignatureAlgorithm: Send + Sync {
    /// The SignatureMethod URI.
    fn algorithm_id(&self) -> &str;

    /// The digest URI used for References signed with this algorithm.
    fn digest(&self) -> &str;

    fn key(&self) -> &Key;

    fn set_backend(&mut self, backend: Box<dyn SigningBackend>) -> Result<()>;

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>>;

    fn verify(&self, data: &[u8], signature: &[u8]) -> Result<bool>;
}

/// A block cipher or key transport algorithm bound to a key.
pub trait EncryptionAlgorithm: Send + Sync {
    /// The EncryptionMethod URI.
    fn algorithm_id(&self) -> &str;

    fn key(&self) -> &Key;

    fn set_backend(&mut self, backend: Box<dyn EncryptionBackend>) -> Result<()>;

    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>>;

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>>;
}

/// Marker for algorithms that encrypt other keys (RSA transport, AES-KW).
pub trait KeyTransportAlgorithm: EncryptionAlgorithm {}

impl std::fmt::Debug for dyn SignatureAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SignatureAlgorithm({})", self.algorithm_id())
    }
}

impl std::fmt::Debug for dyn EncryptionAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EncryptionAlgorithm({})", self.algorithm_id())
    }
}

impl std::fmt::Debug for dyn KeyTransportAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyTransportAlgorithm({})", self.algorithm_id())
    }
}

/// Canonical `&'static` copy of an identifier from a fixed list.
fn static_id(ids: &[&'static str], id: &str) -> Option<&'static str> {
    ids.iter().copied().find(|known| *known == id)
}
