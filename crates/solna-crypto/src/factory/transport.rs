#![forbid(unsafe_code)]

use super::{shared, AlgorithmFactory, AlgorithmFamily, AlgorithmRegistry, RegisteredAlgorithm};
use crate::alg::{AesKeyWrap, KeyTransportAlgorithm, RsaTransport};
use crate::key::Key;
use solna_core::{algorithm, Result};
use std::sync::{Arc, OnceLock};

/// Algorithms that encrypt session keys into an EncryptedKey.
#[derive(Debug)]
pub enum KeyTransportFamily {}

/// Factory for key transport and key wrap algorithms. RSA PKCS#1 v1.5
/// transport is refused by default.
pub type KeyTransportAlgorithmFactory = AlgorithmFactory<KeyTransportFamily>;

static REGISTRY: OnceLock<Arc<AlgorithmRegistry<dyn KeyTransportAlgorithm>>> = OnceLock::new();

impl AlgorithmFamily for KeyTransportFamily {
    type Algorithm = dyn KeyTransportAlgorithm;

    const NAME: &'static str = "key transport";

    const DEFAULT_BLACKLIST: &'static [&'static str] = &[algorithm::RSA_PKCS1];

    fn register_defaults(registry: &mut AlgorithmRegistry<dyn KeyTransportAlgorithm>) {
        registry
            .register_default::<RsaTransport>()
            .register_default::<AesKeyWrap>();
    }

    fn shared_registry() -> Arc<AlgorithmRegistry<dyn KeyTransportAlgorithm>> {
        shared::<Self>(&REGISTRY)
    }
}

impl RegisteredAlgorithm<dyn KeyTransportAlgorithm> for RsaTransport {
    const IDENTIFIERS: &'static [&'static str] = RsaTransport::IDENTIFIERS;

    fn construct(key: Key, algorithm_id: &str) -> Result<Box<dyn KeyTransportAlgorithm>> {
        Ok(Box::new(RsaTransport::new(key, algorithm_id)?))
    }
}

impl RegisteredAlgorithm<dyn KeyTransportAlgorithm> for AesKeyWrap {
    const IDENTIFIERS: &'static [&'static str] = AesKeyWrap::IDENTIFIERS;

    fn construct(key: Key, algorithm_id: &str) -> Result<Box<dyn KeyTransportAlgorithm>> {
        Ok(Box::new(AesKeyWrap::new(key, algorithm_id)?))
    }
}
