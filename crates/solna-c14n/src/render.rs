#![forbid(unsafe_code)]

//! Shared rendering for the inclusive and exclusive walkers.

use crate::escape;
use solna_core::{ns, Error};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// A namespace declaration to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NsDecl {
    /// The prefix ("" for default namespace).
    pub prefix: String,
    /// The namespace URI ("" undeclares the default namespace).
    pub uri: String,
}

impl NsDecl {
    fn write(&self, out: &mut Vec<u8>) {
        if self.prefix.is_empty() {
            out.extend_from_slice(b" xmlns=\"");
        } else {
            out.extend_from_slice(b" xmlns:");
            out.extend_from_slice(self.prefix.as_bytes());
            out.extend_from_slice(b"=\"");
        }
        escape::push_attr(out, &self.uri);
        out.push(b'"');
    }
}

impl Ord for NsDecl {
    fn cmp(&self, other: &Self) -> Ordering {
        // Default namespace sorts first because "" < any prefix.
        self.prefix.cmp(&other.prefix)
    }
}

impl PartialOrd for NsDecl {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// An attribute to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    /// The namespace URI of the attribute ("" for no namespace).
    pub ns_uri: String,
    pub local_name: String,
    /// The qualified name as written (prefix:local or just local).
    pub qualified_name: String,
    pub value: String,
}

impl Attr {
    fn write(&self, out: &mut Vec<u8>) {
        out.push(b' ');
        out.extend_from_slice(self.qualified_name.as_bytes());
        out.extend_from_slice(b"=\"");
        escape::push_attr(out, &self.value);
        out.push(b'"');
    }

    /// Prefix of the qualified name, or "" when unprefixed.
    pub fn prefix(&self) -> &str {
        solna_xml::tag::prefix_of(&self.qualified_name)
    }
}

impl Ord for Attr {
    fn cmp(&self, other: &Self) -> Ordering {
        // Unqualified attributes first, then by (namespace URI, local name).
        match (self.ns_uri.is_empty(), other.ns_uri.is_empty()) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => self
                .ns_uri
                .cmp(&other.ns_uri)
                .then_with(|| self.local_name.cmp(&other.local_name)),
        }
    }
}

impl PartialOrd for Attr {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// An element's qualified name and attributes as they appear in the source.
pub struct ElementParts {
    pub name: String,
    pub prefix: String,
    pub attrs: Vec<Attr>,
}

/// Recover the element's qualified name and attribute names.
pub fn element_parts(node: &roxmltree::Node<'_, '_>) -> Result<ElementParts, Error> {
    let text = node.document().input_text();
    let tag = solna_xml::tag::element_start_tag(text, node)?;
    let written: Vec<&str> = tag.attributes.clone();
    if written.len() != node.attributes().len() {
        return Err(Error::Canonicalization(format!(
            "attribute list of <{}> does not match the parsed tree",
            tag.name
        )));
    }

    let attrs = node
        .attributes()
        .zip(written)
        .map(|(attr, qname)| Attr {
            ns_uri: attr.namespace().unwrap_or("").to_owned(),
            local_name: attr.name().to_owned(),
            qualified_name: qname.to_owned(),
            value: attr.value().to_owned(),
        })
        .collect();

    Ok(ElementParts {
        name: tag.name.to_owned(),
        prefix: tag.prefix().to_owned(),
        attrs,
    })
}

/// In-scope namespace bindings of an element, excluding the `xml` prefix.
pub fn inscope_namespaces(node: &roxmltree::Node<'_, '_>) -> BTreeMap<String, String> {
    node.namespaces()
        .filter(|n| n.uri() != ns::XML && n.name() != Some("xml"))
        .filter(|n| !n.uri().is_empty())
        .map(|n| (n.name().unwrap_or("").to_owned(), n.uri().to_owned()))
        .collect()
}

pub fn write_start_tag(out: &mut Vec<u8>, name: &str, ns_decls: &[NsDecl], attrs: &[Attr]) {
    out.push(b'<');
    out.extend_from_slice(name.as_bytes());
    for decl in ns_decls {
        decl.write(out);
    }
    for attr in attrs {
        attr.write(out);
    }
    out.push(b'>');
}

pub fn write_end_tag(out: &mut Vec<u8>, name: &str) {
    out.extend_from_slice(b"</");
    out.extend_from_slice(name.as_bytes());
    out.push(b'>');
}

/// Render a text, comment or processing-instruction node.
///
/// Comments and PIs that are children of the document node are separated
/// from the document element by a line feed.
pub fn write_leaf(out: &mut Vec<u8>, node: &roxmltree::Node<'_, '_>, with_comments: bool) {
    match node.node_type() {
        roxmltree::NodeType::Text => {
            escape::push_text(out, node.text().unwrap_or(""));
        }
        roxmltree::NodeType::Comment if with_comments => {
            with_document_spacing(out, node, |out| {
                out.extend_from_slice(b"<!--");
                out.extend_from_slice(node.text().unwrap_or("").as_bytes());
                out.extend_from_slice(b"-->");
            });
        }
        roxmltree::NodeType::PI => {
            if let Some(pi) = node.pi() {
                with_document_spacing(out, node, |out| {
                    out.extend_from_slice(b"<?");
                    out.extend_from_slice(pi.target.as_bytes());
                    if let Some(value) = pi.value.filter(|v| !v.is_empty()) {
                        out.push(b' ');
                        escape::push_pi(out, value);
                    }
                    out.extend_from_slice(b"?>");
                });
            }
        }
        _ => {}
    }
}

fn with_document_spacing(
    out: &mut Vec<u8>,
    node: &roxmltree::Node<'_, '_>,
    body: impl FnOnce(&mut Vec<u8>),
) {
    let at_document_level = node
        .parent()
        .is_some_and(|p| p.node_type() == roxmltree::NodeType::Root);
    if at_document_level && node.prev_siblings().any(|s| s.is_element()) {
        out.push(b'\n');
    }
    body(out);
    if at_document_level && node.next_siblings().any(|s| s.is_element()) {
        out.push(b'\n');
    }
}
