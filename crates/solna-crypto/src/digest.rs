#![forbid(unsafe_code)]

//! Digest (hash) algorithms addressed by their XML-DSig URIs.

use digest::Digest;
use solna_core::{algorithm, Error, Result};

/// Compute a digest in one shot.
pub fn digest(uri: &str, data: &[u8]) -> Result<Vec<u8>> {
    match uri {
        algorithm::SHA1 => Ok(hash::<sha1::Sha1>(data)),
        algorithm::SHA224 => Ok(hash::<sha2::Sha224>(data)),
        algorithm::SHA256 => Ok(hash::<sha2::Sha256>(data)),
        algorithm::SHA384 => Ok(hash::<sha2::Sha384>(data)),
        algorithm::SHA512 => Ok(hash::<sha2::Sha512>(data)),
        algorithm::SHA3_224 => Ok(hash::<sha3::Sha3_224>(data)),
        algorithm::SHA3_256 => Ok(hash::<sha3::Sha3_256>(data)),
        algorithm::SHA3_384 => Ok(hash::<sha3::Sha3_384>(data)),
        algorithm::SHA3_512 => Ok(hash::<sha3::Sha3_512>(data)),
        _ => Err(Error::UnsupportedAlgorithm(format!("digest algorithm: {uri}"))),
    }
}

fn hash<D: Digest>(data: &[u8]) -> Vec<u8> {
    D::digest(data).to_vec()
}

/// The SHA-1/SHA-2 hashes usable with HMAC, RSA PKCS#1 v1.5 and OAEP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashKind {
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl HashKind {
    /// Resolve a digest URI.
    pub fn from_uri(uri: &str) -> Result<Self> {
        match uri {
            algorithm::SHA1 => Ok(Self::Sha1),
            algorithm::SHA224 => Ok(Self::Sha224),
            algorithm::SHA256 => Ok(Self::Sha256),
            algorithm::SHA384 => Ok(Self::Sha384),
            algorithm::SHA512 => Ok(Self::Sha512),
            _ => Err(Error::InvalidArgument(format!("unknown digest algorithm: {uri}"))),
        }
    }

    /// Resolve an MGF1 URI to the hash it is built on.
    pub fn from_mgf_uri(uri: &str) -> Result<Self> {
        match uri {
            algorithm::MGF1_SHA1 => Ok(Self::Sha1),
            algorithm::MGF1_SHA224 => Ok(Self::Sha224),
            algorithm::MGF1_SHA256 => Ok(Self::Sha256),
            algorithm::MGF1_SHA384 => Ok(Self::Sha384),
            algorithm::MGF1_SHA512 => Ok(Self::Sha512),
            _ => Err(Error::InvalidArgument(format!("unknown mask generation function: {uri}"))),
        }
    }

    pub fn uri(self) -> &'static str {
        match self {
            Self::Sha1 => algorithm::SHA1,
            Self::Sha224 => algorithm::SHA224,
            Self::Sha256 => algorithm::SHA256,
            Self::Sha384 => algorithm::SHA384,
            Self::Sha512 => algorithm::SHA512,
        }
    }
}
