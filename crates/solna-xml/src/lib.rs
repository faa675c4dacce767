#![forbid(unsafe_code)]

//! XML document abstraction for the Solna XML Security library.
//!
//! Provides an owned element type over `roxmltree`, plus the `NodeSet`
//! operations needed for canonicalization and signature transforms.

pub mod document;
pub mod nodeset;
pub mod tag;
pub mod uri;
pub mod writer;

pub use document::{InsertPosition, XmlElement};
pub use nodeset::NodeSet;
pub use writer::XmlWriter;

/// Return roxmltree parsing options that allow DTD.
///
/// roxmltree does not expand external entities, so an internal subset is
/// harmless and some producers still emit one.
pub fn parsing_options() -> roxmltree::ParsingOptions {
    roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    }
}

/// Parse XML text with [`parsing_options`].
pub fn parse_document(text: &str) -> Result<roxmltree::Document<'_>, solna_core::Error> {
    roxmltree::Document::parse_with_options(text, parsing_options())
        .map_err(|e| solna_core::Error::XmlParse(e.to_string()))
}

/// Whether the node is an element with the given namespace and local name.
pub fn is_element(node: &roxmltree::Node<'_, '_>, ns: &str, local_name: &str) -> bool {
    node.is_element()
        && node.tag_name().name() == local_name
        && node.tag_name().namespace().unwrap_or("") == ns
}

/// Find the first child element with the given namespace and local name.
pub fn find_child_element<'a, 'input>(
    node: roxmltree::Node<'a, 'input>,
    ns: &str,
    local_name: &str,
) -> Option<roxmltree::Node<'a, 'input>> {
    node.children().find(|c| is_element(c, ns, local_name))
}

/// Find all child elements with the given namespace and local name.
pub fn find_child_elements<'a, 'input>(
    node: roxmltree::Node<'a, 'input>,
    ns: &str,
    local_name: &str,
) -> Vec<roxmltree::Node<'a, 'input>> {
    node.children()
        .filter(|c| is_element(c, ns, local_name))
        .collect()
}

/// Text content of an element with all whitespace removed (for base64 payloads).
pub fn compact_text(node: roxmltree::Node<'_, '_>) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .flat_map(|t| t.chars())
        .filter(|c| !c.is_whitespace())
        .collect()
}
