#![forbid(unsafe_code)]

//! RSA PKCS#1 v1.5 and HMAC signature algorithms.

use super::SignatureAlgorithm;
use crate::backend::{HmacBackend, RsaBackend, SigningBackend};
use crate::key::Key;
use solna_core::{algorithm, Error, Result};

/// Key family a signature method needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureFamily {
    Rsa,
    Hmac,
}

impl SignatureFamily {
    /// Whether `key` belongs to this family.
    pub fn accepts(self, key: &Key) -> bool {
        match self {
            Self::Rsa => matches!(key, Key::Public(_) | Key::Private(_)),
            Self::Hmac => key.is_symmetric(),
        }
    }
}

/// One row of the signature method table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureMethod {
    pub id: &'static str,
    pub family: SignatureFamily,
    pub digest: &'static str,
}

const SIGNATURE_METHODS: &[SignatureMethod] = &[
    SignatureMethod { id: algorithm::RSA_SHA1, family: SignatureFamily::Rsa, digest: algorithm::SHA1 },
    SignatureMethod { id: algorithm::RSA_SHA224, family: SignatureFamily::Rsa, digest: algorithm::SHA224 },
    SignatureMethod { id: algorithm::RSA_SHA256, family: SignatureFamily::Rsa, digest: algorithm::SHA256 },
    SignatureMethod { id: algorithm::RSA_SHA384, family: SignatureFamily::Rsa, digest: algorithm::SHA384 },
    SignatureMethod { id: algorithm::RSA_SHA512, family: SignatureFamily::Rsa, digest: algorithm::SHA512 },
    SignatureMethod { id: algorithm::HMAC_SHA1, family: SignatureFamily::Hmac, digest: algorithm::SHA1 },
    SignatureMethod { id: algorithm::HMAC_SHA224, family: SignatureFamily::Hmac, digest: algorithm::SHA224 },
    SignatureMethod { id: algorithm::HMAC_SHA256, family: SignatureFamily::Hmac, digest: algorithm::SHA256 },
    SignatureMethod { id: algorithm::HMAC_SHA384, family: SignatureFamily::Hmac, digest: algorithm::SHA384 },
    SignatureMethod { id: algorithm::HMAC_SHA512, family: SignatureFamily::Hmac, digest: algorithm::SHA512 },
];

/// Look up a signature method by URI.
pub fn signature_method(id: &str) -> Option<&'static SignatureMethod> {
    SIGNATURE_METHODS.iter().find(|m| m.id == id)
}

fn resolve(id: &str, family: SignatureFamily, key: &Key) -> Result<&'static SignatureMethod> {
    let method = signature_method(id)
        .filter(|m| m.family == family)
        .ok_or_else(|| Error::UnsupportedAlgorithm(format!("signature algorithm: {id}")))?;
    if !family.accepts(key) {
        return Err(Error::InvalidKey(format!("{id} cannot use a {}", key.kind_name())));
    }
    Ok(method)
}

macro_rules! signature_algorithm {
    ($name:ident, $family:expr, $backend:expr, $doc:literal) => {
        #[doc = $doc]
        pub struct $name {
            method: &'static SignatureMethod,
            key: Key,
            backend: Box<dyn SigningBackend>,
        }

        impl $name {
            pub fn new(key: Key, algorithm_id: &str) -> Result<Self> {
                let method = resolve(algorithm_id, $family, &key)?;
                let backend: Box<dyn SigningBackend> = Box::new($backend(method.digest)?);
                Ok(Self {
                    method,
                    key,
                    backend,
                })
            }
        }

        impl SignatureAlgorithm for $name {
            fn algorithm_id(&self) -> &str {
                self.method.id
            }

            fn digest(&self) -> &str {
                self.method.digest
            }

            fn key(&self) -> &Key {
                &self.key
            }

            fn set_backend(&mut self, mut backend: Box<dyn SigningBackend>) -> Result<()> {
                backend.set_digest_algorithm(self.method.digest)?;
                self.backend = backend;
                Ok(())
            }

            fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
                self.backend.sign(&self.key, data)
            }

            fn verify(&self, data: &[u8], signature: &[u8]) -> Result<bool> {
                self.backend.verify(&self.key, data, signature)
            }
        }
    };
}

signature_algorithm!(
    Rsa,
    SignatureFamily::Rsa,
    RsaBackend::for_signing,
    "RSA PKCS#1 v1.5 signatures over SHA-1/SHA-2."
);
signature_algorithm!(
    Hmac,
    SignatureFamily::Hmac,
    HmacBackend::new,
    "HMAC over SHA-1/SHA-2."
);
