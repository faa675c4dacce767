#![forbid(unsafe_code)]

//! Cryptography for the Solna XML Security library.
//!
//! Layers, bottom-up:
//! - [`key`]: the closed `Key` model (symmetric, RSA public, RSA private)
//! - [`backend`]: primitive providers behind the `SigningBackend` and
//!   `EncryptionBackend` capabilities
//! - [`alg`]: algorithm objects that bind an identifier, a key and a backend
//! - [`factory`]: registries and blacklisting factories that build them
//!
//! plus digest, random, constant-time and key-derivation helpers.

pub mod alg;
pub mod backend;
pub mod ct;
pub mod digest;
pub mod factory;
pub mod kdf;
pub mod key;
pub mod random;

pub use alg::{EncryptionAlgorithm, KeyTransportAlgorithm, SignatureAlgorithm};
pub use backend::{EncryptionBackend, SigningBackend};
pub use factory::{
    AlgorithmFactory, AlgorithmRegistry, EncryptionAlgorithmFactory,
    KeyTransportAlgorithmFactory, SignatureAlgorithmFactory,
};
pub use key::{Key, PrivateKey, PublicKey, SymmetricKey};
