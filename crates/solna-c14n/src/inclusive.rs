#![forbid(unsafe_code)]

//! Inclusive Canonical XML 1.0 and 1.1.
//!
//! Every in-scope namespace that differs from what the nearest output
//! ancestor already rendered is emitted, so a subtree canonicalizes the same
//! whether or not it is detached.
//!
//! The two versions differ only in which `xml:*` attributes an element of a
//! document subset inherits from ancestors that were left out.

use crate::render::{self, Attr, NsDecl};
use solna_core::{ns, Error};
use solna_xml::NodeSet;
use std::collections::BTreeMap;

/// Which `xml:*` attributes are pulled down from omitted ancestors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlAttrInheritance {
    /// Canonical XML 1.0: every attribute in the xml namespace.
    C14n10,
    /// Canonical XML 1.1: `xml:lang` and `xml:space` only.
    C14n11,
}

impl XmlAttrInheritance {
    fn inherits(self, local_name: &str) -> bool {
        match self {
            Self::C14n10 => true,
            Self::C14n11 => matches!(local_name, "lang" | "space"),
        }
    }
}

/// Canonicalize a document using inclusive C14N.
pub fn canonicalize(
    doc: &roxmltree::Document<'_>,
    with_comments: bool,
    node_set: Option<&NodeSet>,
    inheritance: XmlAttrInheritance,
) -> Result<Vec<u8>, Error> {
    let mut output = Vec::new();
    let ctx = C14nContext {
        with_comments,
        node_set,
        inheritance,
    };
    ctx.process_node(doc.root(), &mut output, &BTreeMap::new())?;
    Ok(output)
}

struct C14nContext<'a> {
    with_comments: bool,
    node_set: Option<&'a NodeSet>,
    inheritance: XmlAttrInheritance,
}

impl C14nContext<'_> {
    fn is_visible(&self, node: &roxmltree::Node<'_, '_>) -> bool {
        self.node_set.map_or(true, |set| set.contains(node))
    }

    fn process_node(
        &self,
        node: roxmltree::Node<'_, '_>,
        output: &mut Vec<u8>,
        rendered_ns: &BTreeMap<String, String>,
    ) -> Result<(), Error> {
        match node.node_type() {
            roxmltree::NodeType::Root => {
                for child in node.children() {
                    self.process_node(child, output, rendered_ns)?;
                }
            }
            roxmltree::NodeType::Element => self.process_element(node, output, rendered_ns)?,
            _ => {
                if self.is_visible(&node) {
                    render::write_leaf(output, &node, self.with_comments);
                }
            }
        }
        Ok(())
    }

    fn process_element(
        &self,
        node: roxmltree::Node<'_, '_>,
        output: &mut Vec<u8>,
        rendered_ns: &BTreeMap<String, String>,
    ) -> Result<(), Error> {
        if !self.is_visible(&node) {
            for child in node.children() {
                self.process_node(child, output, rendered_ns)?;
            }
            return Ok(());
        }

        let inscope = render::inscope_namespaces(&node);
        let mut ns_decls: Vec<NsDecl> = inscope
            .iter()
            .filter(|(prefix, uri)| rendered_ns.get(*prefix) != Some(*uri))
            .map(|(prefix, uri)| NsDecl {
                prefix: prefix.clone(),
                uri: uri.clone(),
            })
            .collect();
        let default_dropped = rendered_ns.get("").is_some_and(|uri| !uri.is_empty())
            && !inscope.contains_key("");
        if default_dropped {
            ns_decls.push(NsDecl {
                prefix: String::new(),
                uri: String::new(),
            });
        }
        ns_decls.sort();

        let parts = render::element_parts(&node)?;
        let mut attrs = parts.attrs;
        if self.node_set.is_some() {
            self.inherit_xml_attrs(&node, &mut attrs);
        }
        attrs.sort();

        render::write_start_tag(output, &parts.name, &ns_decls, &attrs);
        for child in node.children() {
            self.process_node(child, output, &inscope)?;
        }
        render::write_end_tag(output, &parts.name);
        Ok(())
    }

    /// Add `xml:*` attributes from ancestors up to the nearest one in the
    /// node set. The nearest declaration wins and the element's own
    /// attributes are never overridden.
    fn inherit_xml_attrs(&self, node: &roxmltree::Node<'_, '_>, attrs: &mut Vec<Attr>) {
        let ancestors = std::iter::successors(node.parent_element(), |a| a.parent_element())
            .take_while(|a| !self.is_visible(a));
        for ancestor in ancestors {
            for attr in ancestor.attributes() {
                if attr.namespace() != Some(ns::XML) || !self.inheritance.inherits(attr.name()) {
                    continue;
                }
                let present = attrs
                    .iter()
                    .any(|a| a.ns_uri == ns::XML && a.local_name == attr.name());
                if !present {
                    attrs.push(Attr {
                        ns_uri: ns::XML.to_owned(),
                        local_name: attr.name().to_owned(),
                        qualified_name: format!("xml:{}", attr.name()),
                        value: attr.value().to_owned(),
                    });
                }
            }
        }
    }
}
