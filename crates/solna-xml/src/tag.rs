#![forbid(unsafe_code)]

//! Lexical view of an element's start tag.
//!
//! roxmltree resolves names to (namespace, local-name) pairs and drops the
//! prefixes that were written in the source. Canonicalization has to
//! reproduce those prefixes, so they are recovered here by scanning the
//! start tag at the node's byte range. Only ASCII delimiters are matched,
//! which keeps every slice on a UTF-8 boundary.

use solna_core::Error;

/// Qualified names written in a start tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartTag<'a> {
    /// Element qualified name as written (`ds:Signature`).
    pub name: &'a str,
    /// Non-namespace attribute qualified names, in document order.
    pub attributes: Vec<&'a str>,
    /// Namespace declarations on this tag: (prefix, raw value). The default
    /// namespace uses an empty prefix.
    pub namespace_decls: Vec<(&'a str, &'a str)>,
    /// Byte offset just past the closing `>` of the start tag.
    pub end: usize,
    /// Whether the tag is an empty-element tag (`<a/>`).
    pub self_closing: bool,
}

impl<'a> StartTag<'a> {
    /// Prefix of the element name, or "" when unprefixed.
    pub fn prefix(&self) -> &'a str {
        prefix_of(self.name)
    }
}

/// Prefix part of a qualified name, or "" when unprefixed.
pub fn prefix_of(qname: &str) -> &str {
    qname.split_once(':').map_or("", |(p, _)| p)
}

/// Scan the start tag beginning at byte offset `start` (which must point at `<`).
pub fn scan_start_tag(text: &str, start: usize) -> Result<StartTag<'_>, Error> {
    let bytes = text.as_bytes();
    if bytes.get(start) != Some(&b'<') {
        return Err(Error::XmlParse(format!("no start tag at offset {start}")));
    }
    let mut pos = start + 1;
    let name_start = pos;
    while pos < bytes.len() && !is_delimiter(bytes[pos]) {
        pos += 1;
    }
    let name = &text[name_start..pos];
    if name.is_empty() {
        return Err(Error::XmlParse(format!("empty element name at offset {start}")));
    }

    let mut attributes = Vec::new();
    let mut namespace_decls = Vec::new();
    loop {
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        match bytes.get(pos) {
            Some(b'>') => {
                return Ok(StartTag {
                    name,
                    attributes,
                    namespace_decls,
                    end: pos + 1,
                    self_closing: false,
                });
            }
            Some(b'/') if bytes.get(pos + 1) == Some(&b'>') => {
                return Ok(StartTag {
                    name,
                    attributes,
                    namespace_decls,
                    end: pos + 2,
                    self_closing: true,
                });
            }
            Some(_) => {}
            None => return Err(Error::XmlParse(format!("unterminated start tag <{name}"))),
        }

        let attr_start = pos;
        while pos < bytes.len() && bytes[pos] != b'=' && !bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        let attr_name = &text[attr_start..pos];
        while pos < bytes.len() && (bytes[pos].is_ascii_whitespace() || bytes[pos] == b'=') {
            pos += 1;
        }
        let quote = match bytes.get(pos) {
            Some(q @ (b'"' | b'\'')) => *q,
            _ => {
                return Err(Error::XmlParse(format!(
                    "attribute {attr_name} on <{name}> has no quoted value"
                )))
            }
        };
        pos += 1;
        let value_start = pos;
        while pos < bytes.len() && bytes[pos] != quote {
            pos += 1;
        }
        if pos >= bytes.len() {
            return Err(Error::XmlParse(format!("unterminated value for {attr_name}")));
        }
        let value = &text[value_start..pos];
        pos += 1;

        if attr_name == "xmlns" {
            namespace_decls.push(("", value));
        } else if let Some(prefix) = attr_name.strip_prefix("xmlns:") {
            namespace_decls.push((prefix, value));
        } else {
            attributes.push(attr_name);
        }
    }
}

fn is_delimiter(b: u8) -> bool {
    b.is_ascii_whitespace() || b == b'>' || b == b'/'
}

/// Start tag of a roxmltree element node, scanned from the document text.
pub fn element_start_tag<'a>(
    text: &'a str,
    node: &roxmltree::Node<'_, '_>,
) -> Result<StartTag<'a>, Error> {
    scan_start_tag(text, node.range().start)
}

/// Byte offset of the `</name>` end tag of an element, or `None` when the
/// element is written as an empty-element tag.
pub fn end_tag_start(
    text: &str,
    node: &roxmltree::Node<'_, '_>,
) -> Result<Option<usize>, Error> {
    let tag = element_start_tag(text, node)?;
    if tag.self_closing {
        return Ok(None);
    }
    let range = node.range();
    let closing = format!("</{}", tag.name);
    text[..range.end]
        .rfind(&closing)
        .filter(|pos| *pos >= tag.end)
        .map(Some)
        .ok_or_else(|| Error::XmlParse(format!("missing end tag for <{}>", tag.name)))
}
