#![forbid(unsafe_code)]

//! DSig context: configuration shared by signing and verification.

use solna_crypto::SignatureAlgorithmFactory;
use solna_xml::InsertPosition;

/// Configuration for XML-DSig operations.
#[derive(Debug, Clone)]
pub struct DsigContext {
    /// ID attribute names recognized in addition to `Id`, `ID` and `id`.
    pub id_attrs: Vec<String>,
    /// Builds verifiers for certificates found in KeyInfo. Its blacklist
    /// applies to certificate-driven verification only.
    pub signature_factory: SignatureAlgorithmFactory,
    /// Where the Signature is inserted into the signed element.
    pub position: InsertPosition,
}

impl DsigContext {
    pub fn new() -> Self {
        Self {
            id_attrs: Vec::new(),
            signature_factory: SignatureAlgorithmFactory::new(),
            position: InsertPosition::FirstChild,
        }
    }

    pub fn add_id_attr(&mut self, name: &str) {
        self.id_attrs.push(name.to_owned());
    }

    pub fn with_signature_factory(mut self, factory: SignatureAlgorithmFactory) -> Self {
        self.signature_factory = factory;
        self
    }

    /// Insert the Signature right after the first child with this name
    /// (e.g. a SAML `Issuer`).
    pub fn insert_after(mut self, namespace: &str, local_name: &str) -> Self {
        self.position = InsertPosition::After {
            namespace: namespace.to_owned(),
            local_name: local_name.to_owned(),
        };
        self
    }
}

impl Default for DsigContext {
    fn default() -> Self {
        Self::new()
    }
}
