#![forbid(unsafe_code)]

use super::{shared, AlgorithmFactory, AlgorithmFamily, AlgorithmRegistry, RegisteredAlgorithm};
use crate::alg::{Aes, EncryptionAlgorithm, TripleDes};
use crate::key::Key;
use solna_core::{algorithm, Result};
use std::sync::{Arc, OnceLock};

/// Block ciphers used for EncryptedData content.
#[derive(Debug)]
pub enum BlockCipherFamily {}

/// Factory for block cipher algorithms. Triple DES is refused by default.
pub type EncryptionAlgorithmFactory = AlgorithmFactory<BlockCipherFamily>;

static REGISTRY: OnceLock<Arc<AlgorithmRegistry<dyn EncryptionAlgorithm>>> = OnceLock::new();

impl AlgorithmFamily for BlockCipherFamily {
    type Algorithm = dyn EncryptionAlgorithm;

    const NAME: &'static str = "block cipher";

    const DEFAULT_BLACKLIST: &'static [&'static str] = &[algorithm::TRIPLEDES_CBC];

    fn register_defaults(registry: &mut AlgorithmRegistry<dyn EncryptionAlgorithm>) {
        registry.register_default::<Aes>().register_default::<TripleDes>();
    }

    fn shared_registry() -> Arc<AlgorithmRegistry<dyn EncryptionAlgorithm>> {
        shared::<Self>(&REGISTRY)
    }
}

impl RegisteredAlgorithm<dyn EncryptionAlgorithm> for Aes {
    const IDENTIFIERS: &'static [&'static str] = Aes::IDENTIFIERS;

    fn construct(key: Key, algorithm_id: &str) -> Result<Box<dyn EncryptionAlgorithm>> {
        Ok(Box::new(Aes::new(key, algorithm_id)?))
    }
}

impl RegisteredAlgorithm<dyn EncryptionAlgorithm> for TripleDes {
    const IDENTIFIERS: &'static [&'static str] = TripleDes::IDENTIFIERS;

    fn construct(key: Key, algorithm_id: &str) -> Result<Box<dyn EncryptionAlgorithm>> {
        Ok(Box::new(TripleDes::new(key, algorithm_id)?))
    }
}
