#![forbid(unsafe_code)]

use crate::alg::{signature_method, Hmac, Rsa, SignatureAlgorithm, SignatureFamily};
use crate::key::Key;
use solna_core::{algorithm, Error, Result};
use std::collections::HashSet;

const DEFAULT_BLACKLIST: &[&str] = &[algorithm::RSA_SHA1, algorithm::HMAC_SHA1];

/// Builds signature algorithms from the fixed RSA and HMAC method table.
///
/// SHA-1 based methods are refused by default.
#[derive(Debug, Clone)]
pub struct SignatureAlgorithmFactory {
    blacklist: HashSet<String>,
}

impl SignatureAlgorithmFactory {
    pub fn new() -> Self {
        Self {
            blacklist: DEFAULT_BLACKLIST.iter().map(|id| id.to_string()).collect(),
        }
    }

    pub fn with_blacklist<I, S>(mut self, blacklist: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blacklist = blacklist.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_blacklisted(&self, algorithm_id: &str) -> bool {
        self.blacklist.contains(algorithm_id)
    }

    pub fn get_algorithm(&self, algorithm_id: &str, key: Key) -> Result<Box<dyn SignatureAlgorithm>> {
        if self.is_blacklisted(algorithm_id) {
            tracing::warn!(algorithm = algorithm_id, "refusing blacklisted signature algorithm");
            return Err(Error::BlacklistedAlgorithm(algorithm_id.to_string()));
        }
        let method = signature_method(algorithm_id)
            .ok_or_else(|| Error::UnsupportedAlgorithm(format!("signature algorithm: {algorithm_id}")))?;
        if !method.family.accepts(&key) {
            return Err(Error::InvalidKey(format!("{algorithm_id} cannot use a {}", key.kind_name())));
        }
        let signer: Box<dyn SignatureAlgorithm> = match method.family {
            SignatureFamily::Rsa => Box::new(Rsa::new(key, algorithm_id)?),
            SignatureFamily::Hmac => Box::new(Hmac::new(key, algorithm_id)?),
        };
        tracing::debug!(algorithm = algorithm_id, "constructed signature algorithm");
        Ok(signer)
    }
}

impl Default for SignatureAlgorithmFactory {
    fn default() -> Self {
        Self::new()
    }
}
