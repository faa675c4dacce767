#![forbid(unsafe_code)]

//! RSA: PKCS#1 v1.5 signatures, PKCS#1 v1.5 and OAEP encryption.
//!
//! Encryption dispatches on the key variant. A public key encrypts and
//! "decrypts" (type-1 unpadding of a raw public operation, the inverse of
//! private-key encryption); a private key decrypts and encrypts with type-1
//! padding.

use super::{EncryptionBackend, SigningBackend};
use crate::digest::HashKind;
use crate::key::Key;
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, Oaep, Pkcs1v15Encrypt, Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use signature::{SignatureEncoding, Signer, Verifier};
use solna_core::{algorithm, Error, Result};

/// RSA-OAEP parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OaepParams {
    /// Digest URI; SHA-1 when absent.
    pub digest_uri: Option<String>,
    /// MGF1 URI. When absent, `rsa-oaep-mgf1p` uses MGF1-SHA1 and xmlenc11
    /// `rsa-oaep` uses the digest.
    pub mgf_uri: Option<String>,
    /// The OAEP label (`OAEPparams`), already base64-decoded.
    pub label: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Padding {
    Pkcs1v15,
    Oaep { digest: HashKind, mgf: HashKind },
}

/// RSA primitives for both signing and encryption.
#[derive(Debug, Clone)]
pub struct RsaBackend {
    hash: HashKind,
    cipher: &'static str,
    oaep: OaepParams,
    padding: Padding,
}

impl Default for RsaBackend {
    fn default() -> Self {
        Self {
            hash: HashKind::Sha256,
            cipher: algorithm::RSA_OAEP,
            oaep: OaepParams::default(),
            padding: Padding::Oaep {
                digest: HashKind::Sha1,
                mgf: HashKind::Sha1,
            },
        }
    }
}

impl RsaBackend {
    /// Backend for PKCS#1 v1.5 signatures with the given digest.
    pub fn for_signing(digest_uri: &str) -> Result<Self> {
        let mut backend = Self::default();
        backend.set_digest_algorithm(digest_uri)?;
        Ok(backend)
    }

    /// Backend for one of the RSA key transport identifiers.
    pub fn for_cipher(algorithm_id: &str) -> Result<Self> {
        let mut backend = Self::default();
        backend.set_cipher(algorithm_id)?;
        Ok(backend)
    }

    /// Replace the OAEP parameters. Unknown digest or MGF URIs are rejected
    /// and leave the current parameters in place.
    pub fn set_oaep_params(&mut self, params: OaepParams) -> Result<()> {
        let padding = resolve_padding(&params, self.cipher)?;
        self.oaep = params;
        self.padding = padding;
        Ok(())
    }

    fn label(&self) -> Result<Option<String>> {
        self.oaep
            .label
            .as_ref()
            .map(|l| {
                String::from_utf8(l.clone())
                    .map_err(|_| Error::InvalidArgument("OAEP label must be UTF-8".into()))
            })
            .transpose()
    }

    fn oaep(&self, digest: HashKind, mgf: HashKind) -> Result<Oaep> {
        macro_rules! with_mgf {
            ($d:ty) => {
                match mgf {
                    HashKind::Sha1 => Oaep::new_with_mgf_hash::<$d, sha1::Sha1>(),
                    HashKind::Sha224 => Oaep::new_with_mgf_hash::<$d, sha2::Sha224>(),
                    HashKind::Sha256 => Oaep::new_with_mgf_hash::<$d, sha2::Sha256>(),
                    HashKind::Sha384 => Oaep::new_with_mgf_hash::<$d, sha2::Sha384>(),
                    HashKind::Sha512 => Oaep::new_with_mgf_hash::<$d, sha2::Sha512>(),
                }
            };
        }
        let mut padding = match digest {
            HashKind::Sha1 => with_mgf!(sha1::Sha1),
            HashKind::Sha224 => with_mgf!(sha2::Sha224),
            HashKind::Sha256 => with_mgf!(sha2::Sha256),
            HashKind::Sha384 => with_mgf!(sha2::Sha384),
            HashKind::Sha512 => with_mgf!(sha2::Sha512),
        };
        padding.label = self.label()?;
        Ok(padding)
    }

    fn sign_with(&self, private_key: &RsaPrivateKey, data: &[u8]) -> Result<Vec<u8>> {
        macro_rules! do_sign {
            ($hasher:ty) => {{
                let sk = rsa::pkcs1v15::SigningKey::<$hasher>::new(private_key.clone());
                sk.try_sign(data)
                    .map(|sig| sig.to_vec())
                    .map_err(|e| Error::Crypto(format!("RSA sign: {e}")))
            }};
        }
        match self.hash {
            HashKind::Sha1 => do_sign!(sha1::Sha1),
            HashKind::Sha224 => do_sign!(sha2::Sha224),
            HashKind::Sha256 => do_sign!(sha2::Sha256),
            HashKind::Sha384 => do_sign!(sha2::Sha384),
            HashKind::Sha512 => do_sign!(sha2::Sha512),
        }
    }

    fn verify_with(&self, public_key: RsaPublicKey, data: &[u8], sig_bytes: &[u8]) -> Result<bool> {
        let Ok(sig) = rsa::pkcs1v15::Signature::try_from(sig_bytes) else {
            return Ok(false);
        };
        macro_rules! do_verify {
            ($hasher:ty) => {{
                let vk = rsa::pkcs1v15::VerifyingKey::<$hasher>::new(public_key);
                Ok(vk.verify(data, &sig).is_ok())
            }};
        }
        match self.hash {
            HashKind::Sha1 => do_verify!(sha1::Sha1),
            HashKind::Sha224 => do_verify!(sha2::Sha224),
            HashKind::Sha256 => do_verify!(sha2::Sha256),
            HashKind::Sha384 => do_verify!(sha2::Sha384),
            HashKind::Sha512 => do_verify!(sha2::Sha512),
        }
    }

    fn public_encrypt(&self, public_key: &RsaPublicKey, data: &[u8]) -> Result<Vec<u8>> {
        let mut rng = rand::thread_rng();
        match self.padding {
            Padding::Pkcs1v15 => public_key
                .encrypt(&mut rng, Pkcs1v15Encrypt, data)
                .map_err(|e| Error::Crypto(format!("RSA PKCS#1 encrypt: {e}"))),
            Padding::Oaep { digest, mgf } => public_key
                .encrypt(&mut rng, self.oaep(digest, mgf)?, data)
                .map_err(|e| Error::Crypto(format!("RSA-OAEP encrypt: {e}"))),
        }
    }

    fn private_decrypt(&self, private_key: &RsaPrivateKey, data: &[u8]) -> Result<Vec<u8>> {
        match self.padding {
            Padding::Pkcs1v15 => private_key
                .decrypt(Pkcs1v15Encrypt, data)
                .map_err(|e| Error::Crypto(format!("RSA PKCS#1 decrypt: {e}"))),
            Padding::Oaep { digest, mgf } => private_key
                .decrypt(self.oaep(digest, mgf)?, data)
                .map_err(|e| Error::Crypto(format!("RSA-OAEP decrypt: {e}"))),
        }
    }

    /// Type-1 padded private-key operation over the raw input.
    fn private_encrypt(&self, private_key: &RsaPrivateKey, data: &[u8]) -> Result<Vec<u8>> {
        if self.padding != Padding::Pkcs1v15 {
            return Err(Error::InvalidArgument(
                "private-key encryption requires PKCS#1 v1.5 padding".into(),
            ));
        }
        private_key
            .sign(Pkcs1v15Sign::new_unprefixed(), data)
            .map_err(|e| Error::Crypto(format!("RSA private encrypt: {e}")))
    }

    /// Raw public-key operation followed by type-1 unpadding.
    fn public_decrypt(&self, public_key: &RsaPublicKey, data: &[u8]) -> Result<Vec<u8>> {
        if self.padding != Padding::Pkcs1v15 {
            return Err(Error::InvalidArgument(
                "public-key decryption requires PKCS#1 v1.5 padding".into(),
            ));
        }
        let k = public_key.size();
        if data.len() != k {
            return Err(Error::Crypto(format!(
                "RSA public decrypt: expected {k} bytes, got {}",
                data.len()
            )));
        }
        let m = rsa::hazmat::rsa_encrypt(public_key, &BigUint::from_bytes_be(data))
            .map_err(|e| Error::Crypto(format!("RSA public decrypt: {e}")))?;
        let raw = m.to_bytes_be();
        if raw.len() > k {
            return Err(Error::Crypto("RSA public decrypt: value out of range".into()));
        }
        let mut em = vec![0u8; k - raw.len()];
        em.extend_from_slice(&raw);
        unpad_type1(&em)
    }
}

/// Strip `00 01 FF..FF 00` from an encoded block.
fn unpad_type1(em: &[u8]) -> Result<Vec<u8>> {
    let bad = || Error::Crypto("RSA public decrypt: invalid type-1 padding".into());
    if em.len() < 11 || em[0] != 0x00 || em[1] != 0x01 {
        return Err(bad());
    }
    let separator = em[2..].iter().position(|&b| b != 0xff).ok_or_else(bad)? + 2;
    if em[separator] != 0x00 || separator < 10 {
        return Err(bad());
    }
    Ok(em[separator + 1..].to_vec())
}

impl SigningBackend for RsaBackend {
    fn set_digest_algorithm(&mut self, digest_uri: &str) -> Result<()> {
        self.hash = HashKind::from_uri(digest_uri)?;
        Ok(())
    }

    fn sign(&self, key: &Key, plaintext: &[u8]) -> Result<Vec<u8>> {
        match key {
            Key::Private(k) => self.sign_with(k.rsa(), plaintext),
            other => Err(Error::InvalidKey(format!(
                "RSA signing requires a private key, got {}",
                other.kind_name()
            ))),
        }
    }

    fn verify(&self, key: &Key, plaintext: &[u8], signature: &[u8]) -> Result<bool> {
        let public_key = key.rsa_public().ok_or_else(|| {
            Error::InvalidKey(format!("RSA verification requires an RSA key, got {}", key.kind_name()))
        })?;
        self.verify_with(public_key, plaintext, signature)
    }
}

fn resolve_padding(params: &OaepParams, cipher: &str) -> Result<Padding> {
    let digest = match params.digest_uri.as_deref() {
        Some(uri) => HashKind::from_uri(uri)?,
        None => HashKind::Sha1,
    };
    let explicit_mgf = params
        .mgf_uri
        .as_deref()
        .map(HashKind::from_mgf_uri)
        .transpose()?;
    match cipher {
        algorithm::RSA_PKCS1 => Ok(Padding::Pkcs1v15),
        algorithm::RSA_OAEP => Ok(Padding::Oaep {
            digest,
            mgf: explicit_mgf.unwrap_or(HashKind::Sha1),
        }),
        algorithm::RSA_OAEP_ENC11 => Ok(Padding::Oaep {
            digest,
            mgf: explicit_mgf.unwrap_or(digest),
        }),
        other => Err(Error::InvalidArgument(format!("unknown RSA cipher: {other}"))),
    }
}

impl EncryptionBackend for RsaBackend {
    fn set_cipher(&mut self, algorithm_id: &str) -> Result<()> {
        let cipher = algorithm::KEY_TRANSPORT_ALGORITHMS
            .iter()
            .copied()
            .find(|id| *id == algorithm_id)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown RSA cipher: {algorithm_id}")))?;
        self.padding = resolve_padding(&self.oaep, cipher)?;
        self.cipher = cipher;
        Ok(())
    }

    fn encrypt(&self, key: &Key, plaintext: &[u8]) -> Result<Vec<u8>> {
        match key {
            Key::Public(k) => self.public_encrypt(k.rsa(), plaintext),
            Key::Private(k) => self.private_encrypt(k.rsa(), plaintext),
            Key::Symmetric(_) => Err(Error::InvalidKey("RSA encryption requires an RSA key".into())),
        }
    }

    fn decrypt(&self, key: &Key, ciphertext: &[u8]) -> Result<Vec<u8>> {
        match key {
            Key::Private(k) => self.private_decrypt(k.rsa(), ciphertext),
            Key::Public(k) => self.public_decrypt(k.rsa(), ciphertext),
            Key::Symmetric(_) => Err(Error::InvalidKey("RSA decryption requires an RSA key".into())),
        }
    }

    fn clone_box(&self) -> Box<dyn EncryptionBackend> {
        Box::new(self.clone())
    }
}
