#![forbid(unsafe_code)]

//! Key types.
//!
//! [`Key`] is a closed sum over the three kinds of key material the
//! algorithms accept. Backends dispatch on the variant, so adding a kind
//! means touching every backend match.

use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePublicKey};
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};
use solna_core::{Error, Result};
use std::path::Path;
use zeroize::Zeroizing;

/// Key material for an algorithm.
#[derive(Debug, Clone)]
pub enum Key {
    Symmetric(SymmetricKey),
    Public(PublicKey),
    Private(PrivateKey),
}

impl Key {
    /// Human-readable name of the variant, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Symmetric(_) => "symmetric key",
            Self::Public(_) => "RSA public key",
            Self::Private(_) => "RSA private key",
        }
    }

    pub fn is_symmetric(&self) -> bool {
        matches!(self, Self::Symmetric(_))
    }

    pub fn as_symmetric(&self) -> Option<&SymmetricKey> {
        match self {
            Self::Symmetric(k) => Some(k),
            _ => None,
        }
    }

    /// RSA public key of an asymmetric key; the public half of a private key.
    pub fn rsa_public(&self) -> Option<RsaPublicKey> {
        match self {
            Self::Public(k) => Some(k.inner.clone()),
            Self::Private(k) => Some(k.inner.to_public_key()),
            Self::Symmetric(_) => None,
        }
    }
}

impl From<SymmetricKey> for Key {
    fn from(k: SymmetricKey) -> Self {
        Self::Symmetric(k)
    }
}

impl From<PublicKey> for Key {
    fn from(k: PublicKey) -> Self {
        Self::Public(k)
    }
}

impl From<PrivateKey> for Key {
    fn from(k: PrivateKey) -> Self {
        Self::Private(k)
    }
}

// ── Symmetric ────────────────────────────────────────────────────────

/// Raw secret bytes, wiped from memory on drop.
#[derive(Clone)]
pub struct SymmetricKey {
    bytes: Zeroizing<Vec<u8>>,
}

impl SymmetricKey {
    /// Wrap existing key bytes. Only an empty key is rejected.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(Error::InvalidArgument("symmetric key must not be empty".into()));
        }
        Ok(Self {
            bytes: Zeroizing::new(bytes),
        })
    }

    /// Generate a fresh key of `length` bytes from the OS random source.
    pub fn generate(length: usize) -> Result<Self> {
        if length == 0 {
            return Err(Error::InvalidArgument("symmetric key must not be empty".into()));
        }
        let mut bytes = Zeroizing::new(vec![0u8; length]);
        crate::random::fill(&mut bytes)?;
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SymmetricKey({} bytes)", self.bytes.len())
    }
}

// ── RSA public ───────────────────────────────────────────────────────

/// An RSA public key with its SubjectPublicKeyInfo encoding.
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey {
    inner: RsaPublicKey,
    der: Vec<u8>,
}

impl PublicKey {
    pub fn from_rsa(inner: RsaPublicKey) -> Result<Self> {
        let der = inner
            .to_public_key_der()
            .map_err(|e| Error::Crypto(format!("encode SubjectPublicKeyInfo: {e}")))?
            .as_bytes()
            .to_vec();
        Ok(Self { inner, der })
    }

    /// Parse a `PUBLIC KEY` (SPKI) or `RSA PUBLIC KEY` (PKCS#1) PEM block.
    pub fn from_pem(pem: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(pem)
            .map_err(|e| Error::InvalidArgument(format!("public key PEM is not UTF-8: {e}")))?;
        let inner = RsaPublicKey::from_public_key_pem(text)
            .or_else(|_| RsaPublicKey::from_pkcs1_pem(text))
            .map_err(|e| Error::InvalidArgument(format!("cannot parse RSA public key: {e}")))?;
        Self::from_rsa(inner)
    }

    /// Parse a DER SubjectPublicKeyInfo.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let inner = RsaPublicKey::from_public_key_der(der)
            .map_err(|e| Error::InvalidArgument(format!("cannot parse RSA public key: {e}")))?;
        Ok(Self {
            inner,
            der: der.to_vec(),
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_pem(&std::fs::read(path)?)
    }

    /// Build a key from its big-endian modulus and public exponent.
    ///
    /// The SubjectPublicKeyInfo is DER-encoded the same way OpenSSL does:
    /// minimal INTEGERs with a leading zero where the high bit is set, a
    /// NULL algorithm parameter and a BIT STRING with no unused bits.
    pub fn from_details(modulus: &[u8], exponent: &[u8]) -> Result<Self> {
        let inner = RsaPublicKey::new(
            BigUint::from_bytes_be(modulus),
            BigUint::from_bytes_be(exponent),
        )
        .map_err(|e| Error::InvalidArgument(format!("invalid RSA key components: {e}")))?;
        Self::from_rsa(inner)
    }

    pub fn rsa(&self) -> &RsaPublicKey {
        &self.inner
    }

    /// DER SubjectPublicKeyInfo.
    pub fn der(&self) -> &[u8] {
        &self.der
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PublicKey({} byte SPKI)", self.der.len())
    }
}

// ── RSA private ──────────────────────────────────────────────────────

/// An RSA private key.
#[derive(Clone)]
pub struct PrivateKey {
    inner: RsaPrivateKey,
}

impl PrivateKey {
    pub fn from_rsa(inner: RsaPrivateKey) -> Self {
        Self { inner }
    }

    /// Parse a PEM private key.
    ///
    /// Accepts PKCS#8 (`PRIVATE KEY`), PKCS#1 (`RSA PRIVATE KEY`) and, when
    /// a passphrase is given, encrypted PKCS#8 (`ENCRYPTED PRIVATE KEY`).
    pub fn from_pem(pem: &[u8], passphrase: Option<&str>) -> Result<Self> {
        let text = std::str::from_utf8(pem)
            .map_err(|e| Error::InvalidArgument(format!("private key PEM is not UTF-8: {e}")))?;

        if let Some(passphrase) = passphrase {
            if let Ok(inner) = RsaPrivateKey::from_pkcs8_encrypted_pem(text, passphrase) {
                return Ok(Self { inner });
            }
        }
        let inner = RsaPrivateKey::from_pkcs8_pem(text)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(text))
            .map_err(|e| {
                Error::InvalidArgument(format!("cannot parse or decrypt RSA private key: {e}"))
            })?;
        Ok(Self { inner })
    }

    pub fn from_file(path: impl AsRef<Path>, passphrase: Option<&str>) -> Result<Self> {
        Self::from_pem(&std::fs::read(path)?, passphrase)
    }

    pub fn rsa(&self) -> &RsaPrivateKey {
        &self.inner
    }

    pub fn public_key(&self) -> Result<PublicKey> {
        PublicKey::from_rsa(self.inner.to_public_key())
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PrivateKey(RSA)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSA_KEY: &str = include_str!("../../../test-data/keys/rsa-key.pem");
    const RSA_KEY_PKCS1: &str = include_str!("../../../test-data/keys/rsa-key-pkcs1.pem");
    const RSA_KEY_ENCRYPTED: &str = include_str!("../../../test-data/keys/rsa-key-encrypted.pem");
    const RSA_PUB: &str = include_str!("../../../test-data/keys/rsa-pub.pem");
    const RSA_MODULUS: &str = include_str!("../../../test-data/keys/rsa-modulus.hex");

    #[test]
    fn test_symmetric_key() {
        assert!(matches!(SymmetricKey::new(Vec::new()), Err(Error::InvalidArgument(_))));
        let key = SymmetricKey::new(b"secret".to_vec()).unwrap();
        assert_eq!(key.as_bytes(), b"secret");
        assert_eq!(format!("{key:?}"), "SymmetricKey(6 bytes)");

        let a = SymmetricKey::generate(16).unwrap();
        let b = SymmetricKey::generate(16).unwrap();
        assert_eq!(a.len(), 16);
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_private_key_formats() {
        let pkcs8 = PrivateKey::from_pem(RSA_KEY.as_bytes(), None).unwrap();
        let pkcs1 = PrivateKey::from_pem(RSA_KEY_PKCS1.as_bytes(), None).unwrap();
        let encrypted = PrivateKey::from_pem(RSA_KEY_ENCRYPTED.as_bytes(), Some("secret")).unwrap();
        assert_eq!(pkcs8.rsa(), pkcs1.rsa());
        assert_eq!(pkcs8.rsa(), encrypted.rsa());
    }

    #[test]
    fn test_private_key_errors() {
        let wrong = PrivateKey::from_pem(RSA_KEY_ENCRYPTED.as_bytes(), Some("wrong"));
        assert!(matches!(wrong, Err(Error::InvalidArgument(_))));
        let missing = PrivateKey::from_pem(RSA_KEY_ENCRYPTED.as_bytes(), None);
        assert!(matches!(missing, Err(Error::InvalidArgument(_))));
        let garbage = PrivateKey::from_pem(b"not a key", None);
        assert!(matches!(garbage, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_public_key_matches_private() {
        let private = PrivateKey::from_pem(RSA_KEY.as_bytes(), None).unwrap();
        let public = PublicKey::from_pem(RSA_PUB.as_bytes()).unwrap();
        assert_eq!(private.public_key().unwrap(), public);
    }

    #[test]
    fn test_from_details_matches_openssl_encoding() {
        let modulus = hex::decode(RSA_MODULUS.trim()).unwrap();
        let from_parts = PublicKey::from_details(&modulus, &[0x01, 0x00, 0x01]).unwrap();
        let from_pem = PublicKey::from_pem(RSA_PUB.as_bytes()).unwrap();
        assert_eq!(from_parts.der(), from_pem.der());
        // Two-byte lengths, and a zero before the high-bit modulus.
        assert_eq!(&from_parts.der()[..4], [0x30, 0x82, 0x01, 0x22]);
        assert_eq!(&from_parts.der()[19..29], [0x03, 0x82, 0x01, 0x0f, 0x00, 0x30, 0x82, 0x01, 0x0a, 0x02]);
        assert_eq!(&from_parts.der()[29..33], [0x82, 0x01, 0x01, 0x00]);
    }

    #[test]
    fn test_from_details_short_form_lengths() {
        const MODULUS: &str = "aaa7b0c676d5a80a2a332c05e74d7373bdee65370aec78ce9ca9a846290e13b7f76c7f436803784450167002934f01f67f697b22dca0c0056ce8d917891ab0c7";
        // openssl rsa -pubout -outform DER for the 512-bit key above.
        const SPKI: &str = "305c300d06092a864886f70d0101010500034b003048024100aaa7b0c676d5a80a2a332c05e74d7373bdee65370aec78ce9ca9a846290e13b7f76c7f436803784450167002934f01f67f697b22dca0c0056ce8d917891ab0c70203010001";
        let modulus = hex::decode(MODULUS).unwrap();
        let key = PublicKey::from_details(&modulus, &[0x01, 0x00, 0x01]).unwrap();
        assert_eq!(hex::encode(key.der()), SPKI);
        assert_eq!(PublicKey::from_der(key.der()).unwrap(), key);

        let high_bit_exponent = PublicKey::from_details(&modulus, &[0x80, 0x01]).unwrap();
        let expected = format!("{}0203008001", &SPKI[..SPKI.len() - 10]);
        assert_eq!(hex::encode(high_bit_exponent.der()), expected);
    }

    #[test]
    fn test_key_variants() {
        let sym: Key = SymmetricKey::new(vec![1, 2, 3]).unwrap().into();
        assert!(sym.is_symmetric());
        assert!(sym.rsa_public().is_none());

        let private: Key = PrivateKey::from_pem(RSA_KEY.as_bytes(), None).unwrap().into();
        let public: Key = PublicKey::from_pem(RSA_PUB.as_bytes()).unwrap().into();
        assert_eq!(private.rsa_public(), public.rsa_public());
        assert_eq!(private.kind_name(), "RSA private key");
    }
}
