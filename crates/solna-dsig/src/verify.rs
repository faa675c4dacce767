#![forbid(unsafe_code)]

//! Enveloped signature verification.
//!
//! Processing order:
//! 1. Locate the single `<ds:Signature>` child and parse it
//! 2. Canonicalize SignedInfo and re-read the Reference from those bytes
//! 3. Check the Reference URI against the element, run the transforms and
//!    compare digests
//! 4. Verify SignatureValue, with the given verifier or with each
//!    certificate in KeyInfo
//!
//! The returned element is re-parsed from the digested bytes, never the
//! input text.

use crate::context::DsigContext;
use crate::signature::{Signature, SignedInfo};
use crate::transform;
use solna_core::{algorithm, ns, Error, Result};
use solna_crypto::{ct, Key, SignatureAlgorithm};
use solna_keys::{EmbeddedCertificate, X509Certificate};
use solna_xml::{find_child_elements, XmlElement};

/// A successfully verified value together with the key that verified it.
#[derive(Debug, Clone)]
pub struct Verified<T = XmlElement> {
    value: T,
    key: Key,
    certificate: Option<X509Certificate>,
}

impl<T> Verified<T> {
    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn into_inner(self) -> T {
        self.value
    }

    /// The key whose signature check succeeded.
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// The KeyInfo certificate that verified the signature, if one did.
    pub fn certificate(&self) -> Option<&X509Certificate> {
        self.certificate.as_ref()
    }

    /// Convert the verified value, keeping the key binding.
    pub fn try_map<U>(self, f: impl FnOnce(T) -> Result<U>) -> Result<Verified<U>> {
        Ok(Verified {
            value: f(self.value)?,
            key: self.key,
            certificate: self.certificate,
        })
    }
}

/// An element expected to carry an enveloped signature.
#[derive(Debug, Clone)]
pub struct SignedElement {
    element: XmlElement,
    context: DsigContext,
}

impl SignedElement {
    pub fn new(element: XmlElement) -> Self {
        Self::with_context(element, DsigContext::new())
    }

    pub fn with_context(element: XmlElement, context: DsigContext) -> Self {
        Self { element, context }
    }

    /// The element as received. Not trusted until verified.
    pub fn element(&self) -> &XmlElement {
        &self.element
    }

    /// Parse the enveloped Signature without checking it.
    pub fn signature(&self) -> Result<Signature> {
        let doc = self.element.document()?;
        Signature::parse(signature_child(doc.root_element())?)
    }

    /// Verify the signature.
    ///
    /// With `verifier`, its algorithm id must match SignatureMethod. Without
    /// one, each X509Certificate in KeyInfo is tried in order.
    pub fn verify(&self, verifier: Option<&dyn SignatureAlgorithm>) -> Result<Verified> {
        let doc = self.element.document()?;
        let signature_node = signature_child(doc.root_element())?;
        let signature = Signature::parse(signature_node)?;
        let certificates = signature
            .key_info
            .as_ref()
            .map_or(&[][..], |k| k.certificates.as_slice());

        match verifier {
            Some(v) if v.algorithm_id() != signature.signed_info.signature_method => {
                return Err(Error::InvalidArgument(format!(
                    "verifier algorithm {} does not match SignatureMethod {}",
                    v.algorithm_id(),
                    signature.signed_info.signature_method
                )))
            }
            None if certificates.is_empty() => {
                return Err(Error::InvalidArgument(
                    "no verifier given and KeyInfo carries no certificate".into(),
                ))
            }
            _ => {}
        }

        let canonical = transform::canonicalize_signed_info(&doc, signature_node, &signature.signed_info)?;
        let signed_info = {
            let text = std::str::from_utf8(&canonical)
                .map_err(|e| Error::Canonicalization(format!("SignedInfo is not UTF-8: {e}")))?;
            let canonical_doc = solna_xml::parse_document(text)?;
            SignedInfo::parse(canonical_doc.root_element())?
        };
        let value = self.validate_reference(&doc, signature_node, &signed_info)?;

        if let Some(verifier) = verifier {
            if !verifier.verify(&canonical, &signature.signature_value)? {
                tracing::warn!(method = %signed_info.signature_method, "signature value rejected");
                return Err(Error::SignatureVerificationFailed(
                    "signature value does not match".into(),
                ));
            }
            return Ok(Verified {
                value,
                key: verifier.key().clone(),
                certificate: None,
            });
        }

        for (index, embedded) in certificates.iter().enumerate() {
            match self.try_verify_with_certificate(
                embedded,
                &signed_info.signature_method,
                &canonical,
                &signature.signature_value,
            ) {
                Ok(Some(cert)) => {
                    tracing::debug!(index, "signature verified with KeyInfo certificate");
                    return Ok(Verified {
                        value,
                        key: (&cert).into(),
                        certificate: Some(cert),
                    });
                }
                Ok(None) => tracing::debug!(index, "certificate did not verify the signature"),
                Err(e @ (Error::BlacklistedAlgorithm(_) | Error::UnsupportedAlgorithm(_))) => {
                    return Err(e)
                }
                Err(e) => tracing::debug!(index, error = %e, "certificate unusable"),
            }
        }
        tracing::warn!(
            certificates = certificates.len(),
            "no KeyInfo certificate verified the signature"
        );
        Err(Error::SignatureVerificationFailed(format!(
            "none of {} KeyInfo certificates verified the signature",
            certificates.len()
        )))
    }

    /// Decode one KeyInfo certificate and check the signature with it.
    /// `Ok(None)` means the certificate decoded but its key did not verify.
    fn try_verify_with_certificate(
        &self,
        embedded: &EmbeddedCertificate,
        signature_method: &str,
        signed_info: &[u8],
        signature_value: &[u8],
    ) -> Result<Option<X509Certificate>> {
        let cert = embedded.decode()?;
        let verifier = self
            .context
            .signature_factory
            .get_algorithm(signature_method, (&cert).into())?;
        Ok(verifier.verify(signed_info, signature_value)?.then_some(cert))
    }

    fn validate_reference(
        &self,
        doc: &roxmltree::Document<'_>,
        signature_node: roxmltree::Node<'_, '_>,
        signed_info: &SignedInfo,
    ) -> Result<XmlElement> {
        let reference = &signed_info.reference;
        let uri = reference.uri.as_deref().unwrap_or("");

        if algorithm::c14n_keeps_comments(&signed_info.c14n_method) && !solna_xml::uri::is_xpointer(uri) {
            return Err(Error::ReferenceValidation(format!(
                "comments are only kept for xpointer references, got URI \"{uri}\""
            )));
        }

        if solna_xml::uri::is_document_ref(uri) {
            if !self.element.is_document_root() {
                return Err(Error::ReferenceValidation(
                    "same-document reference on an element that is not the document root".into(),
                ));
            }
        } else {
            let id = self.element.id(&self.context.id_attrs)?;
            let target = solna_xml::uri::referenced_id(uri);
            if id.is_none() || target != id.as_deref() {
                return Err(Error::ReferenceValidation(format!(
                    "reference URI \"{uri}\" does not point at the signed element"
                )));
            }
        }

        let node_set = transform::reference_node_set(doc, Some(uri));
        let octets = transform::apply(doc, node_set, Some(signature_node), &reference.transforms)?;
        let computed = solna_crypto::digest::digest(&reference.digest_method, &octets)?;
        if !ct::bytes_equal(&computed, &reference.digest_value) {
            tracing::warn!(uri, digest = %reference.digest_method, "reference digest mismatch");
            return Err(Error::DigestMismatch(format!("reference \"{uri}\"")));
        }
        XmlElement::parse_bytes(&octets)
    }
}

fn signature_child<'a, 'input>(
    root: roxmltree::Node<'a, 'input>,
) -> Result<roxmltree::Node<'a, 'input>> {
    match find_child_elements(root, ns::DSIG, ns::node::SIGNATURE).as_slice() {
        [] => Err(Error::NoSignatureFound),
        [one] => Ok(*one),
        many => Err(Error::TooManyElements(format!(
            "{} Signature elements",
            many.len()
        ))),
    }
}

/// A domain type parsed from a signed element.
pub trait Signed: Sized {
    fn signed_element(&self) -> &SignedElement;

    /// Rebuild the domain value from the verified element.
    fn from_verified(element: XmlElement) -> Result<Self>;

    fn verify(&self, verifier: Option<&dyn SignatureAlgorithm>) -> Result<Verified<Self>> {
        self.signed_element().verify(verifier)?.try_map(Self::from_verified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sign::SignableElement;
    use solna_core::ErrorKind;
    use solna_crypto::alg::{Hmac, Rsa};
    use solna_crypto::{PrivateKey, SignatureAlgorithmFactory, SymmetricKey};
    use solna_keys::KeyInfo;

    const DOC: &str = r#"<r:Doc xmlns:r="urn:r" ID="d1"><r:Issuer>me</r:Issuer><r:Body>text</r:Body></r:Doc>"#;

    fn hmac() -> Hmac {
        let key = SymmetricKey::new(b"secret key".to_vec()).unwrap();
        Hmac::new(key.into(), algorithm::HMAC_SHA256).unwrap()
    }

    fn certificate() -> X509Certificate {
        X509Certificate::from_pem(include_bytes!("../../../test-data/keys/rsa-cert.pem")).unwrap()
    }

    fn rsa_signer() -> Rsa {
        let key = PrivateKey::from_pem(include_bytes!("../../../test-data/keys/rsa-key.pem"), None).unwrap();
        Rsa::new(key.into(), algorithm::RSA_SHA256).unwrap()
    }

    fn signed_with(c14n: &str, key_info: Option<KeyInfo>, signer: Box<dyn SignatureAlgorithm>) -> String {
        let mut signable = SignableElement::new(XmlElement::parse(DOC).unwrap());
        signable.sign(signer, c14n, key_info).unwrap();
        signable.to_xml().unwrap()
    }

    fn received(xml: &str) -> SignedElement {
        SignedElement::new(XmlElement::parse(xml).unwrap())
    }

    #[test]
    fn test_hmac_round_trip() {
        let xml = signed_with(algorithm::EXC_C14N, None, Box::new(hmac()));
        let verifier = hmac();
        let verified = received(&xml).verify(Some(&verifier)).unwrap();
        assert_eq!(
            verified.value().as_str(),
            r#"<r:Doc xmlns:r="urn:r" ID="d1"><r:Issuer>me</r:Issuer><r:Body>text</r:Body></r:Doc>"#
        );
        assert!(verified.key().is_symmetric());
        assert!(verified.certificate().is_none());
    }

    #[test]
    fn test_certificate_round_trip() {
        let key_info = KeyInfo::with_certificate(certificate());
        let xml = signed_with(algorithm::C14N, Some(key_info), Box::new(rsa_signer()));
        let verified = received(&xml).verify(None).unwrap();
        assert_eq!(verified.certificate(), Some(&certificate()));
        assert_eq!(received(&xml).signature().unwrap().signed_info.signature_method, algorithm::RSA_SHA256);
    }

    #[test]
    fn test_second_certificate_verifies() {
        let other = X509Certificate::from_pem(include_bytes!("../../../test-data/keys/other-cert.pem")).unwrap();
        let key_info = KeyInfo {
            key_names: Vec::new(),
            certificates: vec![other.into(), certificate().into()],
        };
        let xml = signed_with(algorithm::EXC_C14N, Some(key_info), Box::new(rsa_signer()));
        let verified = received(&xml).verify(None).unwrap();
        assert_eq!(verified.certificate(), Some(&certificate()));
    }

    fn ec_certificate_base64() -> String {
        std::str::from_utf8(include_bytes!("../../../test-data/keys/ec-cert.pem"))
            .unwrap()
            .lines()
            .filter(|l| !l.starts_with("-----"))
            .collect()
    }

    #[test]
    fn test_unusable_certificates_are_skipped() {
        let xml = signed_with(algorithm::EXC_C14N, Some(KeyInfo::with_certificate(certificate())), Box::new(rsa_signer()));
        let crowded = xml.replacen(
            "<ds:X509Certificate>",
            &format!(
                "<ds:X509Certificate>MIIBAAAA</ds:X509Certificate><ds:X509Certificate>{}</ds:X509Certificate><ds:X509Certificate>",
                ec_certificate_base64()
            ),
            1,
        );
        assert_eq!(received(&crowded).signature().unwrap().key_info.unwrap().certificates.len(), 3);
        let verified = received(&crowded).verify(None).unwrap();
        assert_eq!(verified.certificate(), Some(&certificate()));

        let only_junk = xml.replacen(
            &format!("<ds:X509Certificate>{}</ds:X509Certificate>", certificate().to_base64()),
            "<ds:X509Certificate>MIIBAAAA</ds:X509Certificate><ds:X509Certificate>!!</ds:X509Certificate>",
            1,
        );
        assert!(matches!(received(&only_junk).verify(None), Err(Error::SignatureVerificationFailed(_))));
    }

    #[test]
    fn test_explicit_verifier_ignores_key_info() {
        let xml = signed_with(algorithm::EXC_C14N, None, Box::new(hmac()));
        let with_junk = xml.replacen(
            "</ds:SignatureValue>",
            "</ds:SignatureValue><ds:KeyInfo><ds:X509Data><ds:X509Certificate>MIIBAAAA</ds:X509Certificate></ds:X509Data></ds:KeyInfo>",
            1,
        );
        assert!(with_junk.contains("<ds:KeyInfo>"));
        assert!(received(&with_junk).verify(Some(&hmac())).is_ok());
    }

    #[test]
    fn test_no_certificate_verifies() {
        let other = X509Certificate::from_pem(include_bytes!("../../../test-data/keys/other-cert.pem")).unwrap();
        let xml = signed_with(algorithm::EXC_C14N, Some(KeyInfo::with_certificate(other)), Box::new(rsa_signer()));
        assert!(matches!(received(&xml).verify(None), Err(Error::SignatureVerificationFailed(_))));
    }

    #[test]
    fn test_blacklisted_method_propagates() {
        let key = PrivateKey::from_pem(include_bytes!("../../../test-data/keys/rsa-key.pem"), None).unwrap();
        let signer = Rsa::new(key.into(), algorithm::RSA_SHA1).unwrap();
        let xml = signed_with(algorithm::EXC_C14N, Some(KeyInfo::with_certificate(certificate())), Box::new(signer));
        assert!(matches!(received(&xml).verify(None), Err(Error::BlacklistedAlgorithm(_))));

        let context = DsigContext::new().with_signature_factory(SignatureAlgorithmFactory::new().with_blacklist(Vec::<String>::new()));
        let element = SignedElement::with_context(XmlElement::parse(xml).unwrap(), context);
        assert!(element.verify(None).is_ok());
    }

    #[test]
    fn test_tampered_payload() {
        let xml = signed_with(algorithm::EXC_C14N, None, Box::new(hmac()));
        let tampered = xml.replace("<r:Body>text</r:Body>", "<r:Body>other</r:Body>");
        let err = received(&tampered).verify(Some(&hmac())).unwrap_err();
        assert!(matches!(err, Error::DigestMismatch(_)));
        assert_eq!(err.kind(), ErrorKind::Integrity);
    }

    #[test]
    fn test_tampered_signature_value() {
        let xml = signed_with(algorithm::EXC_C14N, None, Box::new(hmac()));
        let start = xml.find("<ds:SignatureValue>").unwrap() + "<ds:SignatureValue>".len();
        let mut tampered = xml.clone();
        let replacement = if &xml[start..start + 1] == "A" { "B" } else { "A" };
        tampered.replace_range(start..start + 1, replacement);
        assert!(matches!(
            received(&tampered).verify(Some(&hmac())),
            Err(Error::SignatureVerificationFailed(_))
        ));
    }

    #[test]
    fn test_comments_need_xpointer() {
        let xml = signed_with(algorithm::EXC_C14N_WITH_COMMENTS, None, Box::new(hmac()));
        assert!(matches!(received(&xml).verify(Some(&hmac())), Err(Error::ReferenceValidation(_))));
    }

    #[test]
    fn test_verifier_must_match_method() {
        let xml = signed_with(algorithm::EXC_C14N, None, Box::new(hmac()));
        let key = SymmetricKey::new(b"secret key".to_vec()).unwrap();
        let sha512 = Hmac::new(key.into(), algorithm::HMAC_SHA512).unwrap();
        assert!(matches!(received(&xml).verify(Some(&sha512)), Err(Error::InvalidArgument(_))));
        assert!(matches!(received(&xml).verify(None), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_signature_count() {
        assert!(matches!(received(DOC).verify(Some(&hmac())), Err(Error::NoSignatureFound)));

        let xml = signed_with(algorithm::EXC_C14N, None, Box::new(hmac()));
        let start = xml.find("<ds:Signature ").unwrap();
        let end = xml.find("</ds:Signature>").unwrap() + "</ds:Signature>".len();
        let mut doubled = xml.clone();
        doubled.insert_str(end, &xml[start..end]);
        assert!(matches!(received(&doubled).verify(Some(&hmac())), Err(Error::TooManyElements(_))));
    }

    #[test]
    fn test_reference_must_point_at_element() {
        let xml = signed_with(algorithm::EXC_C14N, None, Box::new(hmac()));
        let moved = xml.replace(r#"ID="d1""#, r#"ID="d2""#);
        assert!(matches!(received(&moved).verify(Some(&hmac())), Err(Error::ReferenceValidation(_))));
    }

    #[test]
    fn test_document_reference() {
        let mut signable = SignableElement::new(XmlElement::parse("<doc><v>1</v></doc>").unwrap());
        signable.sign(Box::new(hmac()), algorithm::C14N, None).unwrap();
        let xml = signable.to_xml().unwrap();
        assert!(xml.contains("<ds:Reference>"));
        let verified = received(&xml).verify(Some(&hmac())).unwrap();
        assert_eq!(verified.value().as_str(), "<doc><v>1</v></doc>");

        let outer = format!("<outer>{xml}</outer>");
        let doc = roxmltree::Document::parse(&outer).unwrap();
        let inner = doc.root_element().first_element_child().unwrap();
        let nested = SignedElement::new(XmlElement::extract(&outer, inner).unwrap());
        assert!(matches!(nested.verify(Some(&hmac())), Err(Error::ReferenceValidation(_))));
    }

    #[test]
    fn test_signed_trait() {
        struct Assertion {
            signed: SignedElement,
        }

        impl Signed for Assertion {
            fn signed_element(&self) -> &SignedElement {
                &self.signed
            }

            fn from_verified(element: XmlElement) -> Result<Self> {
                Ok(Self {
                    signed: SignedElement::new(element),
                })
            }
        }

        let xml = signed_with(algorithm::EXC_C14N, None, Box::new(hmac()));
        let assertion = Assertion {
            signed: received(&xml),
        };
        let verified = Signed::verify(&assertion, Some(&hmac())).unwrap();
        assert!(!verified.value().signed.element().as_str().contains("Signature"));
    }
}
