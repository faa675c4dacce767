#![forbid(unsafe_code)]

//! Algorithm registries and blacklisting factories.
//!
//! A family (block ciphers, key transport) owns one process-wide default
//! registry, built once on first use and shared read-only afterwards. A
//! factory pairs a registry handle with its own blacklist. Callers who need
//! different implementations build their own registry and pass it in with
//! [`AlgorithmFactory::with_registry`].

mod encryption;
mod signature;
mod transport;

pub use self::encryption::{BlockCipherFamily, EncryptionAlgorithmFactory};
pub use self::signature::SignatureAlgorithmFactory;
pub use self::transport::{KeyTransportAlgorithmFactory, KeyTransportFamily};

use crate::key::Key;
use solna_core::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, OnceLock};

/// Builds an algorithm from a key and one of its identifiers.
pub type Constructor<A> = fn(Key, &str) -> Result<Box<A>>;

/// An implementation that can be registered for a capability `A`.
pub trait RegisteredAlgorithm<A: ?Sized> {
    /// Every identifier this implementation serves.
    const IDENTIFIERS: &'static [&'static str];

    fn construct(key: Key, algorithm_id: &str) -> Result<Box<A>>;
}

/// A family of algorithms sharing one capability interface.
pub trait AlgorithmFamily: 'static {
    type Algorithm: ?Sized + 'static;

    const NAME: &'static str;

    /// Identifiers a fresh factory refuses.
    const DEFAULT_BLACKLIST: &'static [&'static str];

    /// Populate `registry` with the built-in implementations.
    fn register_defaults(registry: &mut AlgorithmRegistry<Self::Algorithm>);

    /// The process-wide default registry.
    fn shared_registry() -> Arc<AlgorithmRegistry<Self::Algorithm>>;
}

/// Identifier to constructor map for one capability.
pub struct AlgorithmRegistry<A: ?Sized + 'static> {
    constructors: HashMap<&'static str, Constructor<A>>,
    defaults_loaded: bool,
}

impl<A: ?Sized + 'static> AlgorithmRegistry<A> {
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
            defaults_loaded: false,
        }
    }

    /// Register `T` for every identifier it claims, replacing earlier entries.
    pub fn register<T: RegisteredAlgorithm<A>>(&mut self) -> &mut Self {
        for id in T::IDENTIFIERS {
            self.constructors.insert(*id, T::construct as Constructor<A>);
        }
        self
    }

    /// Register `T` only for identifiers nobody has claimed yet.
    pub fn register_default<T: RegisteredAlgorithm<A>>(&mut self) -> &mut Self {
        for id in T::IDENTIFIERS {
            self.constructors.entry(*id).or_insert(T::construct as Constructor<A>);
        }
        self
    }

    /// Add the family defaults once. Registrations made earlier win.
    pub fn load_defaults<F: AlgorithmFamily<Algorithm = A>>(&mut self) -> &mut Self {
        if !self.defaults_loaded {
            F::register_defaults(self);
            self.defaults_loaded = true;
        }
        self
    }

    pub fn get(&self, algorithm_id: &str) -> Option<Constructor<A>> {
        self.constructors.get(algorithm_id).copied()
    }

    pub fn contains(&self, algorithm_id: &str) -> bool {
        self.constructors.contains_key(algorithm_id)
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.constructors.keys().copied()
    }
}

impl<A: ?Sized + 'static> Default for AlgorithmRegistry<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: ?Sized + 'static> fmt::Debug for AlgorithmRegistry<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<_> = self.constructors.keys().collect();
        ids.sort();
        f.debug_struct("AlgorithmRegistry")
            .field("identifiers", &ids)
            .field("defaults_loaded", &self.defaults_loaded)
            .finish()
    }
}

/// Build (once) and hand out a family's shared registry.
fn shared<F: AlgorithmFamily>(
    cell: &'static OnceLock<Arc<AlgorithmRegistry<F::Algorithm>>>,
) -> Arc<AlgorithmRegistry<F::Algorithm>> {
    cell.get_or_init(|| {
        let mut registry = AlgorithmRegistry::new();
        registry.load_defaults::<F>();
        tracing::debug!(family = F::NAME, "default algorithm registry initialised");
        Arc::new(registry)
    })
    .clone()
}

/// Blacklist-enforcing constructor of algorithms from family `F`.
pub struct AlgorithmFactory<F: AlgorithmFamily> {
    registry: Arc<AlgorithmRegistry<F::Algorithm>>,
    blacklist: HashSet<String>,
    family: PhantomData<fn() -> F>,
}

impl<F: AlgorithmFamily> AlgorithmFactory<F> {
    /// Factory over the shared registry with the family's default blacklist.
    pub fn new() -> Self {
        Self {
            registry: F::shared_registry(),
            blacklist: F::DEFAULT_BLACKLIST.iter().map(|id| id.to_string()).collect(),
            family: PhantomData,
        }
    }

    /// Replace the blacklist. An empty list allows everything registered.
    pub fn with_blacklist<I, S>(mut self, blacklist: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blacklist = blacklist.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_registry(mut self, registry: Arc<AlgorithmRegistry<F::Algorithm>>) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry(&self) -> &Arc<AlgorithmRegistry<F::Algorithm>> {
        &self.registry
    }

    pub fn is_blacklisted(&self, algorithm_id: &str) -> bool {
        self.blacklist.contains(algorithm_id)
    }

    /// Construct the algorithm registered for `algorithm_id`.
    pub fn get_algorithm(&self, algorithm_id: &str, key: Key) -> Result<Box<F::Algorithm>> {
        if self.is_blacklisted(algorithm_id) {
            tracing::warn!(family = F::NAME, algorithm = algorithm_id, "refusing blacklisted algorithm");
            return Err(Error::BlacklistedAlgorithm(algorithm_id.to_string()));
        }
        let constructor = self
            .registry
            .get(algorithm_id)
            .ok_or_else(|| Error::UnsupportedAlgorithm(format!("{}: {algorithm_id}", F::NAME)))?;
        tracing::debug!(family = F::NAME, algorithm = algorithm_id, key = key.kind_name(), "constructing algorithm");
        constructor(key, algorithm_id)
    }
}

impl<F: AlgorithmFamily> Default for AlgorithmFactory<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: AlgorithmFamily> Clone for AlgorithmFactory<F> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            blacklist: self.blacklist.clone(),
            family: PhantomData,
        }
    }
}

impl<F: AlgorithmFamily> fmt::Debug for AlgorithmFactory<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut blacklist: Vec<_> = self.blacklist.iter().collect();
        blacklist.sort();
        f.debug_struct("AlgorithmFactory")
            .field("family", &F::NAME)
            .field("blacklist", &blacklist)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alg::{Aes, EncryptionAlgorithm};
    use crate::key::{PrivateKey, SymmetricKey};
    use solna_core::algorithm;

    fn aes_key(len: usize) -> Key {
        SymmetricKey::generate(len).unwrap().into()
    }

    fn rsa_key() -> Key {
        PrivateKey::from_pem(include_bytes!("../../../../test-data/keys/rsa-key.pem"), None)
            .unwrap()
            .into()
    }

    #[test]
    fn test_default_blacklists() {
        let block = EncryptionAlgorithmFactory::new();
        assert!(matches!(
            block.get_algorithm(algorithm::TRIPLEDES_CBC, aes_key(24)),
            Err(Error::BlacklistedAlgorithm(_))
        ));
        let transport = KeyTransportAlgorithmFactory::new();
        assert!(matches!(
            transport.get_algorithm(algorithm::RSA_PKCS1, rsa_key()),
            Err(Error::BlacklistedAlgorithm(_))
        ));
        let signature = SignatureAlgorithmFactory::new();
        assert!(matches!(
            signature.get_algorithm(algorithm::RSA_SHA1, rsa_key()),
            Err(Error::BlacklistedAlgorithm(_))
        ));
        assert!(matches!(
            signature.get_algorithm(algorithm::HMAC_SHA1, aes_key(16)),
            Err(Error::BlacklistedAlgorithm(_))
        ));
    }

    #[test]
    fn test_unknown_ids() {
        let unknown = "urn:example:cipher";
        assert!(matches!(
            EncryptionAlgorithmFactory::new().get_algorithm(unknown, aes_key(16)),
            Err(Error::UnsupportedAlgorithm(_))
        ));
        assert!(matches!(
            KeyTransportAlgorithmFactory::new().get_algorithm(algorithm::AES128_CBC, aes_key(16)),
            Err(Error::UnsupportedAlgorithm(_))
        ));
        assert!(matches!(
            SignatureAlgorithmFactory::new().get_algorithm(unknown, rsa_key()),
            Err(Error::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_blacklist_checked_before_registry() {
        let factory = EncryptionAlgorithmFactory::new().with_blacklist(["urn:example:cipher"]);
        assert!(matches!(
            factory.get_algorithm("urn:example:cipher", aes_key(16)),
            Err(Error::BlacklistedAlgorithm(_))
        ));
        let open = EncryptionAlgorithmFactory::new().with_blacklist(Vec::<String>::new());
        let des = open.get_algorithm(algorithm::TRIPLEDES_CBC, aes_key(24)).unwrap();
        assert_eq!(des.algorithm_id(), algorithm::TRIPLEDES_CBC);
    }

    #[test]
    fn test_constructs_registered_algorithm() {
        let factory = EncryptionAlgorithmFactory::default();
        let aes = factory.get_algorithm(algorithm::AES256_GCM, aes_key(32)).unwrap();
        let ct = aes.encrypt(b"payload").unwrap();
        assert_eq!(aes.decrypt(&ct).unwrap(), b"payload");
        assert!(matches!(
            factory.get_algorithm(algorithm::AES256_GCM, aes_key(16)),
            Err(Error::InvalidKey(_))
        ));
    }

    /// Serves aes128-cbc but always refuses to encrypt.
    struct Refusing;

    impl RegisteredAlgorithm<dyn EncryptionAlgorithm> for Refusing {
        const IDENTIFIERS: &'static [&'static str] = &[algorithm::AES128_CBC];

        fn construct(_key: Key, algorithm_id: &str) -> Result<Box<dyn EncryptionAlgorithm>> {
            Err(Error::UnsupportedAlgorithm(format!("refusing {algorithm_id}")))
        }
    }

    #[test]
    fn test_custom_registration_survives_defaults() {
        let mut registry: AlgorithmRegistry<dyn EncryptionAlgorithm> = AlgorithmRegistry::new();
        registry.register::<Refusing>();
        registry.load_defaults::<BlockCipherFamily>();
        assert!(registry.contains(algorithm::AES256_CBC));

        let factory = EncryptionAlgorithmFactory::new().with_registry(Arc::new(registry));
        let err = factory.get_algorithm(algorithm::AES128_CBC, aes_key(16)).unwrap_err();
        assert_eq!(err.to_string(), format!("unsupported algorithm: refusing {}", algorithm::AES128_CBC));
        assert!(factory.get_algorithm(algorithm::AES256_CBC, aes_key(32)).is_ok());
    }

    #[test]
    fn test_register_overwrites_default() {
        let mut registry: AlgorithmRegistry<dyn EncryptionAlgorithm> = AlgorithmRegistry::new();
        registry.load_defaults::<BlockCipherFamily>();
        registry.register::<Refusing>();
        assert!(registry.get(algorithm::AES128_CBC).unwrap()(aes_key(16), algorithm::AES128_CBC).is_err());
        registry.register::<Aes>();
        assert!(registry.get(algorithm::AES128_CBC).unwrap()(aes_key(16), algorithm::AES128_CBC).is_ok());
    }

    #[test]
    fn test_shared_registry_is_shared() {
        let a = EncryptionAlgorithmFactory::new();
        let b = EncryptionAlgorithmFactory::new();
        assert!(Arc::ptr_eq(a.registry(), b.registry()));
    }
}
