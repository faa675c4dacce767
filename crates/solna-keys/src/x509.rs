#![forbid(unsafe_code)]

//! X.509 certificates as public keys.
//!
//! A certificate keeps its DER encoding and a normalized PEM rendering.
//! Thumbprints are memoized per digest algorithm; the SHA-1 thumbprint is
//! computed when the certificate is loaded.

use crate::pem::PemFile;
use base64::Engine;
use der::{Decode, Encode};
use solna_core::{algorithm, Error, Result};
use solna_crypto::{Key, PublicKey};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::{Mutex, OnceLock};

const CERTIFICATE_LABEL: &str = "CERTIFICATE";

/// Digests whose thumbprint is taken straight from the DER bytes.
const DER_FAST_PATH: &[&str] = &[
    algorithm::SHA1,
    algorithm::SHA256,
    algorithm::SHA384,
    algorithm::SHA512,
];

/// Parsed certificate attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateDetails {
    /// RFC 4514 distinguished name.
    pub subject: String,
    pub issuer: String,
    /// Uppercase hex of the serial number's DER content bytes.
    pub serial_number: String,
    /// RFC 3339 UTC timestamps.
    pub not_before: String,
    pub not_after: String,
}

pub struct X509Certificate {
    cert: x509_cert::Certificate,
    der: Vec<u8>,
    pem: String,
    public_key: PublicKey,
    details: OnceLock<CertificateDetails>,
    thumbprints: Mutex<HashMap<String, String>>,
}

impl X509Certificate {
    pub fn from_pem(pem: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(pem)
            .map_err(|e| Error::Certificate(format!("certificate PEM is not UTF-8: {e}")))?;
        let block = PemFile::parse(text)?;
        if block.label() != CERTIFICATE_LABEL {
            return Err(Error::Certificate(format!(
                "expected {CERTIFICATE_LABEL} PEM label, got {}",
                block.label()
            )));
        }
        Self::from_der(&block.into_contents())
    }

    pub fn from_der(der: &[u8]) -> Result<Self> {
        let cert = x509_cert::Certificate::from_der(der)
            .map_err(|e| Error::Certificate(format!("cannot parse certificate: {e}")))?;
        let spki = cert
            .tbs_certificate
            .subject_public_key_info
            .to_der()
            .map_err(|e| Error::Certificate(format!("cannot encode public key: {e}")))?;
        let public_key = PublicKey::from_der(&spki)?;
        let pem = PemFile::new(CERTIFICATE_LABEL, der.to_vec()).to_string();

        let certificate = Self {
            cert,
            der: der.to_vec(),
            pem,
            public_key,
            details: OnceLock::new(),
            thumbprints: Mutex::new(HashMap::new()),
        };
        certificate.thumbprint(algorithm::SHA1)?;
        Ok(certificate)
    }

    /// Load from a PEM file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_pem(&std::fs::read(path)?)
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Normalized PEM (64-column body, LF line endings).
    pub fn pem(&self) -> &str {
        &self.pem
    }

    /// Base64 body without line breaks, as embedded in `<ds:X509Certificate>`.
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.der)
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn details(&self) -> &CertificateDetails {
        self.details.get_or_init(|| {
            let tbs = &self.cert.tbs_certificate;
            CertificateDetails {
                subject: tbs.subject.to_string(),
                issuer: tbs.issuer.to_string(),
                serial_number: hex::encode_upper(tbs.serial_number.as_bytes()),
                not_before: tbs.validity.not_before.to_date_time().to_string(),
                not_after: tbs.validity.not_after.to_date_time().to_string(),
            }
        })
    }

    /// Lowercase hex digest of the certificate, cached per digest URI.
    pub fn thumbprint(&self, digest_uri: &str) -> Result<String> {
        if let Some(cached) = self.cache().get(digest_uri) {
            return Ok(cached.clone());
        }
        let value = if DER_FAST_PATH.contains(&digest_uri) {
            hex::encode(solna_crypto::digest::digest(digest_uri, &self.der)?)
        } else {
            tracing::trace!(digest = digest_uri, "thumbprint via PEM body");
            self.thumbprint_from_pem(digest_uri)?
        };
        self.cache().insert(digest_uri.to_string(), value.clone());
        Ok(value)
    }

    /// Hash the base64 body between the PEM header and footer.
    fn thumbprint_from_pem(&self, digest_uri: &str) -> Result<String> {
        let header = format!("-----BEGIN {CERTIFICATE_LABEL}-----");
        let footer = format!("-----END {CERTIFICATE_LABEL}-----");
        let body_start = self
            .pem
            .find(&header)
            .map(|i| i + header.len())
            .ok_or_else(|| Error::Certificate("PEM header missing".into()))?;
        let body_end = self
            .pem
            .find(&footer)
            .ok_or_else(|| Error::Certificate("PEM footer missing".into()))?;
        let body: String = self.pem[body_start..body_end]
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        let der = base64::engine::general_purpose::STANDARD
            .decode(body)
            .map_err(|e| Error::Base64(e.to_string()))?;
        Ok(hex::encode(solna_crypto::digest::digest(digest_uri, &der)?))
    }

    fn cache(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.thumbprints.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Clone for X509Certificate {
    fn clone(&self) -> Self {
        Self {
            cert: self.cert.clone(),
            der: self.der.clone(),
            pem: self.pem.clone(),
            public_key: self.public_key.clone(),
            details: self.details.clone(),
            thumbprints: Mutex::new(self.cache().clone()),
        }
    }
}

impl PartialEq for X509Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for X509Certificate {}

impl fmt::Debug for X509Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("X509Certificate")
            .field("subject", &self.details().subject)
            .field("serial_number", &self.details().serial_number)
            .finish()
    }
}

impl From<X509Certificate> for Key {
    fn from(cert: X509Certificate) -> Self {
        Key::Public(cert.public_key)
    }
}

impl From<&X509Certificate> for Key {
    fn from(cert: &X509Certificate) -> Self {
        Key::Public(cert.public_key.clone())
    }
}
