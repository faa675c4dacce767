#![forbid(unsafe_code)]

//! Enveloped signature creation.
//!
//! [`SignableElement::sign`] only records the signer; the Signature is
//! computed when the element is serialized. The output is the canonical
//! form of the element with the Signature spliced in, so what the verifier
//! digests is byte-for-byte what was signed.

use crate::context::DsigContext;
use crate::signature::{Reference, Signature, SignedInfo};
use crate::transform;
use crate::verify::SignedElement;
use solna_c14n::C14nMode;
use solna_core::{algorithm, ns, Error, Result};
use solna_crypto::SignatureAlgorithm;
use solna_keys::KeyInfo;
use solna_xml::{find_child_element, XmlElement};

#[derive(Debug)]
struct PendingSignature {
    signer: Box<dyn SignatureAlgorithm>,
    c14n: C14nMode,
    key_info: Option<KeyInfo>,
}

/// An element that has not been signed yet.
#[derive(Debug)]
pub struct SignableElement {
    element: XmlElement,
    context: DsigContext,
    pending: Option<PendingSignature>,
}

impl SignableElement {
    pub fn new(element: XmlElement) -> Self {
        Self::with_context(element, DsigContext::new())
    }

    pub fn with_context(element: XmlElement, context: DsigContext) -> Self {
        Self {
            element,
            context,
            pending: None,
        }
    }

    pub fn element(&self) -> &XmlElement {
        &self.element
    }

    pub fn context(&self) -> &DsigContext {
        &self.context
    }

    /// Whether `sign` has been called.
    pub fn is_signed(&self) -> bool {
        self.pending.is_some()
    }

    /// Configure the signature. `c14n_algorithm` must be inclusive or
    /// exclusive Canonical XML 1.0, with or without comments.
    pub fn sign(
        &mut self,
        signer: Box<dyn SignatureAlgorithm>,
        c14n_algorithm: &str,
        key_info: Option<KeyInfo>,
    ) -> Result<()> {
        let c14n = algorithm::SIGNING_C14N_ALGORITHMS
            .contains(&c14n_algorithm)
            .then(|| C14nMode::from_uri(c14n_algorithm))
            .flatten()
            .ok_or_else(|| {
                Error::UnsupportedAlgorithm(format!("signing canonicalization: {c14n_algorithm}"))
            })?;
        self.pending = Some(PendingSignature {
            signer,
            c14n,
            key_info,
        });
        Ok(())
    }

    /// Serialize the element, computing the Signature if one is configured.
    pub fn to_xml(&self) -> Result<String> {
        match &self.pending {
            Some(pending) => Ok(self.do_sign(pending)?.0.into_string()),
            None => Ok(self.element.as_str().to_owned()),
        }
    }

    /// Compute the Signature and return the signed element.
    pub fn signed(&self) -> Result<SignedElement> {
        let pending = self
            .pending
            .as_ref()
            .ok_or_else(|| Error::InvalidArgument("element has no signer configured".into()))?;
        let (element, _) = self.do_sign(pending)?;
        Ok(SignedElement::with_context(element, self.context.clone()))
    }

    fn do_sign(&self, pending: &PendingSignature) -> Result<(XmlElement, Signature)> {
        let doc = self.element.document()?;
        if find_child_element(doc.root_element(), ns::DSIG, ns::node::SIGNATURE).is_some() {
            return Err(Error::InvalidArgument(format!(
                "{} already carries a Signature",
                self.element.local_name()
            )));
        }

        let uri = match self.element.id(&self.context.id_attrs)? {
            Some(id) => Some(format!("#{id}")),
            None if self.element.is_document_root() => None,
            None => {
                return Err(Error::InvalidArgument(format!(
                    "{} has no ID attribute and is not the document root",
                    self.element.local_name()
                )))
            }
        };
        tracing::debug!(uri = uri.as_deref().unwrap_or(""), "signing reference");

        let transforms = transform::signing_transforms(pending.c14n.uri());
        let node_set = transform::reference_node_set(&doc, uri.as_deref());
        let octets = transform::apply(&doc, node_set, None, &transforms)?;
        tracing::trace!(bytes = octets.len(), "canonical reference octets");
        let signer = pending.signer.as_ref();

        let mut signature = Signature {
            signed_info: SignedInfo {
                c14n_method: pending.c14n.uri().to_owned(),
                inclusive_prefixes: Vec::new(),
                signature_method: signer.algorithm_id().to_owned(),
                reference: Reference {
                    uri,
                    transforms,
                    digest_method: signer.digest().to_owned(),
                    digest_value: solna_crypto::digest::digest(signer.digest(), &octets)?,
                },
            },
            signature_value: Vec::new(),
            key_info: pending.key_info.clone(),
        };

        let canonical = solna_c14n::canonicalize_doc(&doc, pending.c14n, None, &[])?;
        let canonical = String::from_utf8(canonical)
            .map_err(|e| Error::Canonicalization(format!("canonical form is not UTF-8: {e}")))?;
        let base = self.element.with_text(canonical)?;

        // SignedInfo is canonicalized in its final document context; the
        // empty SignatureValue is outside its node set.
        let draft = base.insert_child(&signature.to_xml(), &self.context.position)?;
        let draft_doc = draft.document()?;
        let signature_node =
            find_child_element(draft_doc.root_element(), ns::DSIG, ns::node::SIGNATURE)
                .ok_or_else(|| Error::MissingElement(ns::node::SIGNATURE.into()))?;
        let signed_info =
            transform::canonicalize_signed_info(&draft_doc, signature_node, &signature.signed_info)?;
        signature.signature_value = signer.sign(&signed_info)?;

        let signed = base.insert_child(&signature.to_xml(), &self.context.position)?;
        Ok((signed, signature))
    }
}

/// A domain type that can be signed by delegating to a [`SignableElement`].
pub trait Signable {
    fn signable_element(&self) -> &SignableElement;

    fn signable_element_mut(&mut self) -> &mut SignableElement;

    fn sign(
        &mut self,
        signer: Box<dyn SignatureAlgorithm>,
        c14n_algorithm: &str,
        key_info: Option<KeyInfo>,
    ) -> Result<()> {
        self.signable_element_mut().sign(signer, c14n_algorithm, key_info)
    }

    fn to_xml(&self) -> Result<String> {
        self.signable_element().to_xml()
    }
}
