#![forbid(unsafe_code)]

//! Exclusive Canonical XML 1.0 (exc-C14N).
//!
//! Only "visibly utilized" namespace declarations are output. A namespace
//! is visibly utilized by an element if its prefix is used by the element's
//! tag name or one of its attributes, or it appears in the
//! InclusiveNamespaces PrefixList (`#default` names the default namespace).
//! A declaration is emitted unless an output ancestor already rendered the
//! same binding.

use crate::render;
use crate::render::NsDecl;
use solna_core::Error;
use solna_xml::NodeSet;
use std::collections::{BTreeMap, BTreeSet};

/// Canonicalize using Exclusive C14N 1.0.
pub fn canonicalize(
    doc: &roxmltree::Document<'_>,
    with_comments: bool,
    node_set: Option<&NodeSet>,
    inclusive_prefixes: &[String],
) -> Result<Vec<u8>, Error> {
    let inclusive_prefixes = inclusive_prefixes
        .iter()
        .map(|p| if p == "#default" { String::new() } else { p.clone() })
        .collect();
    let ctx = ExcC14nContext {
        with_comments,
        node_set,
        inclusive_prefixes,
    };
    let mut output = Vec::new();
    ctx.process_node(doc.root(), &mut output, &BTreeMap::new())?;
    Ok(output)
}

struct ExcC14nContext<'a> {
    with_comments: bool,
    node_set: Option<&'a NodeSet>,
    inclusive_prefixes: BTreeSet<String>,
}

impl ExcC14nContext<'_> {
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

        let parts = render::element_parts(&node)?;
        let inscope = render::inscope_namespaces(&node);

        let mut utilized: BTreeSet<&str> = BTreeSet::new();
        utilized.insert(parts.prefix.as_str());
        for attr in &parts.attrs {
            let prefix = attr.prefix();
            if !prefix.is_empty() && prefix != "xml" {
                utilized.insert(prefix);
            }
        }
        for prefix in &self.inclusive_prefixes {
            if prefix.is_empty() || inscope.contains_key(prefix) {
                utilized.insert(prefix.as_str());
            }
        }

        let mut rendered = rendered_ns.clone();
        let mut ns_decls = Vec::new();
        for prefix in utilized {
            let uri = inscope.get(prefix).map_or("", String::as_str);
            let already = rendered.get(prefix).map_or("", String::as_str);
            if uri == already {
                continue;
            }
            ns_decls.push(NsDecl {
                prefix: prefix.to_owned(),
                uri: uri.to_owned(),
            });
            rendered.insert(prefix.to_owned(), uri.to_owned());
        }
        ns_decls.sort();

        let mut attrs = parts.attrs;
        attrs.sort();

        render::write_start_tag(output, &parts.name, &ns_decls, &attrs);
        for child in node.children() {
            self.process_node(child, output, &rendered)?;
        }
        render::write_end_tag(output, &parts.name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{canonicalize as c14n, C14nMode};

    fn canon(xml: &str, prefixes: &[&str]) -> String {
        let prefixes: Vec<String> = prefixes.iter().map(|p| p.to_string()).collect();
        let out = c14n(xml, C14nMode::Exclusive, None, &prefixes).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_unused_namespaces_dropped() {
        let xml = r#"<p:a xmlns:p="urn:p" xmlns:q="urn:q" xmlns:u="urn:u"><q:b/></p:a>"#;
        assert_eq!(
            canon(xml, &[]),
            r#"<p:a xmlns:p="urn:p"><q:b xmlns:q="urn:q"></q:b></p:a>"#
        );
    }

    #[test]
    fn test_attribute_prefix_utilized() {
        let xml = r#"<a xmlns:q="urn:q"><b q:x="1"/></a>"#;
        assert_eq!(canon(xml, &[]), r#"<a><b xmlns:q="urn:q" q:x="1"></b></a>"#);
    }

    #[test]
    fn test_inclusive_prefix_list() {
        let xml = r#"<a xmlns:u="urn:u" xmlns="urn:d"><b/></a>"#;
        assert_eq!(
            canon(xml, &["u"]),
            r#"<a xmlns="urn:d" xmlns:u="urn:u"><b></b></a>"#
        );
    }

    #[test]
    fn test_subset_renders_ancestor_namespaces() {
        let xml = r#"<r xmlns:ds="urn:ds" xmlns:o="urn:o"><ds:Info Id="i"><ds:Ref o:a="1"/></ds:Info></r>"#;
        let doc = roxmltree::Document::parse(xml).unwrap();
        let info = doc
            .descendants()
            .find(|n| n.has_tag_name(("urn:ds", "Info")))
            .unwrap();
        let set = NodeSet::tree(info, false);
        let out = canonicalize(&doc, false, Some(&set), &[]).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            r#"<ds:Info xmlns:ds="urn:ds" Id="i"><ds:Ref xmlns:o="urn:o" o:a="1"></ds:Ref></ds:Info>"#
        );
    }

    #[test]
    fn test_default_namespace_reset() {
        let xml = r#"<a xmlns="urn:d"><b xmlns=""/></a>"#;
        assert_eq!(canon(xml, &[]), r#"<a xmlns="urn:d"><b xmlns=""></b></a>"#);
    }
}
