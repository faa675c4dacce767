#![forbid(unsafe_code)]

//! Reference transforms: enveloped-signature and canonicalization.

use crate::signature::{SignedInfo, Transform};
use solna_c14n::C14nMode;
use solna_core::{algorithm, ns, Error, Result};
use solna_xml::NodeSet;

/// The transform chain written on every Reference this crate produces.
pub fn signing_transforms(c14n_algorithm: &str) -> Vec<Transform> {
    vec![
        Transform::new(algorithm::ENVELOPED_SIGNATURE),
        Transform::new(c14n_algorithm),
    ]
}

/// Run `transforms` over `node_set` and return the octets to digest.
///
/// `signature` is the enveloping `<ds:Signature>`, removed by the
/// enveloped-signature transform. When the chain does not end in a
/// canonicalization, inclusive c14n 1.0 converts the node set to octets.
pub fn apply(
    doc: &roxmltree::Document<'_>,
    mut node_set: NodeSet,
    signature: Option<roxmltree::Node<'_, '_>>,
    transforms: &[Transform],
) -> Result<Vec<u8>> {
    let mut output = None;
    for transform in transforms {
        if output.is_some() {
            return Err(Error::UnsupportedAlgorithm(format!(
                "transform {} after canonicalization",
                transform.algorithm
            )));
        }
        if transform.algorithm == algorithm::ENVELOPED_SIGNATURE {
            if let Some(signature) = signature {
                node_set.subtract_tree(signature);
            }
            continue;
        }
        let mode = C14nMode::from_uri(&transform.algorithm)
            .ok_or_else(|| Error::UnsupportedAlgorithm(format!("transform: {}", transform.algorithm)))?;
        output = Some(solna_c14n::canonicalize_doc(
            doc,
            mode,
            Some(&node_set),
            &transform.inclusive_prefixes,
        )?);
    }
    match output {
        Some(bytes) => Ok(bytes),
        None => solna_c14n::canonicalize_doc(doc, C14nMode::Inclusive, Some(&node_set), &[]),
    }
}

/// The node set a Reference URI selects from `doc`: the whole document for
/// same-document references, otherwise the root element's subtree.
/// Comments survive only for XPointer references.
pub fn reference_node_set(doc: &roxmltree::Document<'_>, uri: Option<&str>) -> NodeSet {
    let uri = uri.unwrap_or("");
    let keep_comments = solna_xml::uri::is_xpointer(uri);
    if solna_xml::uri::is_document_ref(uri) {
        NodeSet::document(doc, keep_comments)
    } else {
        NodeSet::tree(doc.root_element(), keep_comments)
    }
}

/// Canonicalize the `<ds:SignedInfo>` child of `signature` in the context
/// of its document, with the method and PrefixList `signed_info` declares.
pub fn canonicalize_signed_info(
    doc: &roxmltree::Document<'_>,
    signature: roxmltree::Node<'_, '_>,
    signed_info: &SignedInfo,
) -> Result<Vec<u8>> {
    let mode = C14nMode::from_uri(&signed_info.c14n_method).ok_or_else(|| {
        Error::UnsupportedAlgorithm(format!("canonicalization: {}", signed_info.c14n_method))
    })?;
    let node = solna_xml::find_child_element(signature, ns::DSIG, ns::node::SIGNED_INFO)
        .ok_or_else(|| Error::MissingElement(ns::node::SIGNED_INFO.into()))?;
    let octets = solna_c14n::canonicalize_doc(
        doc,
        mode,
        Some(&NodeSet::tree(node, mode.with_comments())),
        &signed_info.inclusive_prefixes,
    )?;
    tracing::trace!(bytes = octets.len(), "canonical SignedInfo");
    Ok(octets)
}
