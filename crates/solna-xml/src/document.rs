#![forbid(unsafe_code)]

//! Owned XML element over roxmltree.
//!
//! `XmlElement` stores the serialized text of one element (optionally with
//! a prolog) and re-parses it on demand. roxmltree documents borrow their
//! input, so processing pipelines call [`XmlElement::document`] once and
//! pass the parsed tree down the call chain.

use crate::{find_child_element, parse_document, tag};
use solna_core::{ns, Error};
use std::collections::HashSet;

/// Where a new child is spliced into an element.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InsertPosition {
    /// Before all existing content.
    #[default]
    FirstChild,
    /// After all existing content.
    LastChild,
    /// Right after the first child element with this name, or first when
    /// no such child exists.
    After {
        namespace: String,
        local_name: String,
    },
}

/// An owned XML element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    text: String,
    namespace: Option<String>,
    local_name: String,
    is_document_root: bool,
}

impl XmlElement {
    /// Parse a complete document; its root element becomes this element.
    pub fn parse(text: impl Into<String>) -> Result<Self, Error> {
        Self::from_text(text.into(), true)
    }

    /// Parse a complete document from UTF-8 bytes.
    pub fn parse_bytes(data: &[u8]) -> Result<Self, Error> {
        let text = std::str::from_utf8(data)
            .map_err(|e| Error::XmlParse(format!("invalid UTF-8: {e}")))?;
        Self::parse(text)
    }

    /// Detach an element from a larger document.
    ///
    /// The subtree text is copied and every namespace in scope at `node`
    /// that is not declared on the element itself is added to its start
    /// tag, so the copy parses on its own. The copy is not a document
    /// root: same-document references do not apply to it.
    pub fn extract(text: &str, node: roxmltree::Node<'_, '_>) -> Result<Self, Error> {
        if !node.is_element() {
            return Err(Error::XmlParse("only elements can be extracted".into()));
        }
        let start = tag::element_start_tag(text, &node)?;
        let declared: HashSet<&str> = start.namespace_decls.iter().map(|(p, _)| *p).collect();

        let mut inherited = String::new();
        for namespace in node.namespaces() {
            let prefix = namespace.name().unwrap_or("");
            if prefix == "xml" || declared.contains(prefix) {
                continue;
            }
            inherited.push_str(" xmlns");
            if !prefix.is_empty() {
                inherited.push(':');
                inherited.push_str(prefix);
            }
            inherited.push_str("=\"");
            inherited.push_str(&escape_uri(namespace.uri()));
            inherited.push('"');
        }

        let range = node.range();
        let name_end = range.start + 1 + start.name.len();
        let mut out = String::with_capacity(range.len() + inherited.len());
        out.push_str(&text[range.start..name_end]);
        out.push_str(&inherited);
        out.push_str(&text[name_end..range.end]);
        Self::from_text(out, false)
    }

    fn from_text(text: String, is_document_root: bool) -> Result<Self, Error> {
        let (namespace, local_name) = {
            let doc = parse_document(&text)?;
            let root = doc.root_element();
            (
                root.tag_name().namespace().map(str::to_owned),
                root.tag_name().name().to_owned(),
            )
        };
        Ok(Self {
            text,
            namespace,
            local_name,
            is_document_root,
        })
    }

    /// Get the raw XML text.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }

    pub fn into_string(self) -> String {
        self.text
    }

    /// Whether this element is the root element of the document it was
    /// parsed from.
    pub fn is_document_root(&self) -> bool {
        self.is_document_root
    }

    /// Parse `text` as a new rendering of this element. The result keeps
    /// this element's document-root status.
    pub fn with_text(&self, text: impl Into<String>) -> Result<Self, Error> {
        Self::from_text(text.into(), self.is_document_root)
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    /// Parse the text and return a temporary `roxmltree::Document`.
    pub fn document(&self) -> Result<roxmltree::Document<'_>, Error> {
        parse_document(&self.text)
    }

    /// Value of an unqualified attribute on this element.
    pub fn attribute(&self, name: &str) -> Result<Option<String>, Error> {
        let doc = self.document()?;
        Ok(doc.root_element().attribute(name).map(str::to_owned))
    }

    /// The element's ID: the first of `Id`, `ID`, `id` or `extra_id_attrs`
    /// that is present.
    pub fn id(&self, extra_id_attrs: &[String]) -> Result<Option<String>, Error> {
        let doc = self.document()?;
        let root = doc.root_element();
        let found = ns::DEFAULT_ID_ATTRS
            .iter()
            .copied()
            .chain(extra_id_attrs.iter().map(String::as_str))
            .find_map(|name| root.attribute(name));
        Ok(found.map(str::to_owned))
    }

    /// Detached copy of the first child element with the given name.
    pub fn find_child(&self, ns: &str, local_name: &str) -> Result<Option<XmlElement>, Error> {
        let doc = self.document()?;
        find_child_element(doc.root_element(), ns, local_name)
            .map(|child| Self::extract(&self.text, child))
            .transpose()
    }

    /// Return a copy with `fragment` spliced in as a child element.
    ///
    /// The fragment must be well-formed and declare the namespaces it uses.
    pub fn insert_child(&self, fragment: &str, position: &InsertPosition) -> Result<Self, Error> {
        let doc = self.document()?;
        let root = doc.root_element();
        let start = tag::element_start_tag(&self.text, &root)?;

        let out = if start.self_closing {
            let slash = start.end - 2;
            format!(
                "{}>{}</{}>{}",
                &self.text[..slash],
                fragment,
                start.name,
                &self.text[start.end..]
            )
        } else {
            let offset = match position {
                InsertPosition::FirstChild => start.end,
                InsertPosition::LastChild => tag::end_tag_start(&self.text, &root)?
                    .ok_or_else(|| Error::XmlParse("element has no end tag".into()))?,
                InsertPosition::After {
                    namespace,
                    local_name,
                } => find_child_element(root, namespace, local_name)
                    .map_or(start.end, |child| child.range().end),
            };
            format!("{}{}{}", &self.text[..offset], fragment, &self.text[offset..])
        };
        Self::from_text(out, self.is_document_root)
    }
}

impl std::fmt::Display for XmlElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

fn escape_uri(uri: &str) -> String {
    uri.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_id() {
        let el = XmlElement::parse(r#"<a:Root xmlns:a="urn:a" ID="_42"><a:Child/></a:Root>"#)
            .unwrap();
        assert_eq!(el.local_name(), "Root");
        assert_eq!(el.namespace(), Some("urn:a"));
        assert!(el.is_document_root());
        assert_eq!(el.id(&[]).unwrap().as_deref(), Some("_42"));
    }

    #[test]
    fn test_custom_id_attribute() {
        let el = XmlElement::parse(r#"<r AssertionID="x1"/>"#).unwrap();
        assert_eq!(el.id(&[]).unwrap(), None);
        assert_eq!(
            el.id(&["AssertionID".to_owned()]).unwrap().as_deref(),
            Some("x1")
        );
    }

    #[test]
    fn test_extract_carries_namespaces() {
        let xml = r#"<p:Outer xmlns:p="urn:p" xmlns:q="urn:q"><p:Inner q:attr="1"><q:Leaf/></p:Inner></p:Outer>"#;
        let doc = roxmltree::Document::parse(xml).unwrap();
        let inner = doc
            .descendants()
            .find(|n| n.has_tag_name(("urn:p", "Inner")))
            .unwrap();
        let el = XmlElement::extract(xml, inner).unwrap();
        assert!(!el.is_document_root());
        assert!(el.as_str().starts_with("<p:Inner xmlns:p=\"urn:p\" xmlns:q=\"urn:q\""));
        assert_eq!(el.local_name(), "Inner");

        let rewritten = el.with_text(r#"<p:Inner xmlns:p="urn:p"/>"#).unwrap();
        assert!(!rewritten.is_document_root());
        assert!(XmlElement::parse("<a/>").unwrap().with_text("<b/>").unwrap().is_document_root());
    }

    #[test]
    fn test_insert_positions() {
        let el = XmlElement::parse(r#"<r><i/><x/></r>"#).unwrap();
        let first = el
            .insert_child("<s/>", &InsertPosition::FirstChild)
            .unwrap();
        assert_eq!(first.as_str(), "<r><s/><i/><x/></r>");
        let last = el.insert_child("<s/>", &InsertPosition::LastChild).unwrap();
        assert_eq!(last.as_str(), "<r><i/><x/><s/></r>");
        let after = el
            .insert_child(
                "<s/>",
                &InsertPosition::After {
                    namespace: String::new(),
                    local_name: "i".into(),
                },
            )
            .unwrap();
        assert_eq!(after.as_str(), "<r><i/><s/><x/></r>");
    }

    #[test]
    fn test_insert_into_empty_element() {
        let el = XmlElement::parse(r#"<r a="1"/>"#).unwrap();
        let out = el
            .insert_child("<s/>", &InsertPosition::LastChild)
            .unwrap();
        assert_eq!(out.as_str(), r#"<r a="1"><s/></r>"#);
    }

    #[test]
    fn test_find_child() {
        let el = XmlElement::parse(r#"<r xmlns="urn:d"><c Id="z"/></r>"#).unwrap();
        let child = el.find_child("urn:d", "c").unwrap().unwrap();
        assert_eq!(child.as_str(), r#"<c xmlns="urn:d" Id="z"/>"#);
        assert!(el.find_child("urn:d", "missing").unwrap().is_none());
    }
}
