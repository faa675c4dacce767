#![forbid(unsafe_code)]

//! Key derivation: ConcatKDF (NIST SP 800-56A) and PBKDF2 (RFC 8018).
//!
//! Both produce a [`SymmetricKey`] of the requested length.

use crate::key::SymmetricKey;
use digest::Digest;
use solna_core::{algorithm, Error, Result};

/// Inputs to the single-step ConcatKDF.
#[derive(Debug, Clone, Default)]
pub struct ConcatKdfParams {
    /// Digest URI; SHA-256 when absent.
    pub digest_uri: Option<String>,
    pub algorithm_id: Vec<u8>,
    pub party_u_info: Vec<u8>,
    pub party_v_info: Vec<u8>,
}

impl ConcatKdfParams {
    /// `AlgorithmID || PartyUInfo || PartyVInfo`. SuppPubInfo and
    /// SuppPrivInfo are not part of the XML Encryption 1.1 profile.
    fn other_info(&self) -> Vec<u8> {
        [&self.algorithm_id[..], &self.party_u_info, &self.party_v_info].concat()
    }
}

/// Inputs to PBKDF2.
#[derive(Debug, Clone)]
pub struct Pbkdf2Params {
    /// HMAC signature-method URI naming the PRF.
    pub prf_uri: String,
    pub salt: Vec<u8>,
    pub iteration_count: u32,
    pub key_length: usize,
}

/// Derive `key_len` bytes from a shared secret.
pub fn concat_kdf(shared_secret: &[u8], key_len: usize, params: &ConcatKdfParams) -> Result<SymmetricKey> {
    let digest_uri = params.digest_uri.as_deref().unwrap_or(algorithm::SHA256);
    let other_info = params.other_info();
    let derived = match digest_uri {
        algorithm::SHA1 => concat::<sha1::Sha1>(shared_secret, &other_info, key_len),
        algorithm::SHA224 => concat::<sha2::Sha224>(shared_secret, &other_info, key_len),
        algorithm::SHA256 => concat::<sha2::Sha256>(shared_secret, &other_info, key_len),
        algorithm::SHA384 => concat::<sha2::Sha384>(shared_secret, &other_info, key_len),
        algorithm::SHA512 => concat::<sha2::Sha512>(shared_secret, &other_info, key_len),
        algorithm::SHA3_256 => concat::<sha3::Sha3_256>(shared_secret, &other_info, key_len),
        algorithm::SHA3_512 => concat::<sha3::Sha3_512>(shared_secret, &other_info, key_len),
        _ => return Err(Error::UnsupportedAlgorithm(format!("ConcatKDF digest: {digest_uri}"))),
    };
    SymmetricKey::new(derived)
}

fn concat<H: Digest>(secret: &[u8], other_info: &[u8], key_len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(key_len + <H as Digest>::output_size());
    let mut counter: u32 = 1;
    while out.len() < key_len {
        let block = H::new()
            .chain_update(counter.to_be_bytes())
            .chain_update(secret)
            .chain_update(other_info)
            .finalize();
        out.extend_from_slice(&block);
        counter += 1;
    }
    out.truncate(key_len);
    out
}

/// Derive a key from a password.
pub fn pbkdf2(password: &[u8], params: &Pbkdf2Params) -> Result<SymmetricKey> {
    if params.iteration_count == 0 {
        return Err(Error::InvalidArgument("PBKDF2 iteration count must be positive".into()));
    }
    let mut out = vec![0u8; params.key_length];
    let (salt, rounds) = (&params.salt[..], params.iteration_count);
    match params.prf_uri.as_str() {
        algorithm::HMAC_SHA1 => pbkdf2::pbkdf2_hmac::<sha1::Sha1>(password, salt, rounds, &mut out),
        algorithm::HMAC_SHA224 => pbkdf2::pbkdf2_hmac::<sha2::Sha224>(password, salt, rounds, &mut out),
        algorithm::HMAC_SHA256 => pbkdf2::pbkdf2_hmac::<sha2::Sha256>(password, salt, rounds, &mut out),
        algorithm::HMAC_SHA384 => pbkdf2::pbkdf2_hmac::<sha2::Sha384>(password, salt, rounds, &mut out),
        algorithm::HMAC_SHA512 => pbkdf2::pbkdf2_hmac::<sha2::Sha512>(password, salt, rounds, &mut out),
        other => return Err(Error::UnsupportedAlgorithm(format!("PBKDF2 PRF: {other}"))),
    }
    SymmetricKey::new(out)
}
