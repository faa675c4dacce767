#![forbid(unsafe_code)]

//! Canonical XML serialization.
//!
//! Three algorithm families are covered, each in a comment-stripping and a
//! comment-keeping variant: inclusive 1.0, inclusive 1.1 and exclusive 1.0.
//! Output is the exact octet stream that gets digested or signed.

pub mod escape;
pub mod exclusive;
pub mod inclusive;
pub mod render;

use solna_core::{algorithm, Result};
use solna_xml::NodeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum C14nMode {
    Inclusive,
    InclusiveWithComments,
    Inclusive11,
    Inclusive11WithComments,
    Exclusive,
    ExclusiveWithComments,
}

const MODE_URIS: [(C14nMode, &str); 6] = [
    (C14nMode::Inclusive, algorithm::C14N),
    (C14nMode::InclusiveWithComments, algorithm::C14N_WITH_COMMENTS),
    (C14nMode::Inclusive11, algorithm::C14N11),
    (C14nMode::Inclusive11WithComments, algorithm::C14N11_WITH_COMMENTS),
    (C14nMode::Exclusive, algorithm::EXC_C14N),
    (C14nMode::ExclusiveWithComments, algorithm::EXC_C14N_WITH_COMMENTS),
];

impl C14nMode {
    /// Algorithm identifier written into CanonicalizationMethod and Transform.
    pub fn uri(&self) -> &'static str {
        MODE_URIS
            .iter()
            .find(|(mode, _)| mode == self)
            .map_or(algorithm::C14N, |(_, uri)| *uri)
    }

    /// `None` for anything that is not a canonicalization identifier.
    pub fn from_uri(uri: &str) -> Option<Self> {
        MODE_URIS.iter().find(|(_, id)| *id == uri).map(|(mode, _)| *mode)
    }

    pub fn with_comments(&self) -> bool {
        algorithm::c14n_keeps_comments(self.uri())
    }

    pub fn is_exclusive(&self) -> bool {
        matches!(self, Self::Exclusive | Self::ExclusiveWithComments)
    }

    fn inheritance(&self) -> inclusive::XmlAttrInheritance {
        match self {
            Self::Inclusive11 | Self::Inclusive11WithComments => inclusive::XmlAttrInheritance::C14n11,
            _ => inclusive::XmlAttrInheritance::C14n10,
        }
    }
}

/// Parse `xml` and canonicalize it. A `node_set` restricts output to a
/// document subset; `inclusive_prefixes` is the exclusive-mode PrefixList
/// and is ignored by the inclusive modes.
pub fn canonicalize(
    xml: &str,
    mode: C14nMode,
    node_set: Option<&NodeSet>,
    inclusive_prefixes: &[String],
) -> Result<Vec<u8>> {
    let doc = solna_xml::parse_document(xml)?;
    canonicalize_doc(&doc, mode, node_set, inclusive_prefixes)
}

/// Same as [`canonicalize`], over an already parsed document.
pub fn canonicalize_doc(
    doc: &roxmltree::Document<'_>,
    mode: C14nMode,
    node_set: Option<&NodeSet>,
    inclusive_prefixes: &[String],
) -> Result<Vec<u8>> {
    if mode.is_exclusive() {
        exclusive::canonicalize(doc, mode.with_comments(), node_set, inclusive_prefixes)
    } else {
        inclusive::canonicalize(doc, mode.with_comments(), node_set, mode.inheritance())
    }
}
