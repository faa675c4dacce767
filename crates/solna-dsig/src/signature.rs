#![forbid(unsafe_code)]

//! The `<ds:Signature>` model: SignedInfo, one Reference, SignatureValue
//! and an optional KeyInfo.

use base64::Engine;
use solna_core::{ns, Error, Result};
use solna_keys::KeyInfo;
use solna_xml::{compact_text, find_child_element, find_child_elements, is_element, XmlWriter};

/// One `<ds:Transform>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transform {
    pub algorithm: String,
    /// Exclusive c14n InclusiveNamespaces PrefixList.
    pub inclusive_prefixes: Vec<String>,
}

impl Transform {
    pub fn new(algorithm: impl Into<String>) -> Self {
        Self {
            algorithm: algorithm.into(),
            inclusive_prefixes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub uri: Option<String>,
    pub transforms: Vec<Transform>,
    pub digest_method: String,
    pub digest_value: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedInfo {
    pub c14n_method: String,
    pub inclusive_prefixes: Vec<String>,
    pub signature_method: String,
    pub reference: Reference,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub signed_info: SignedInfo,
    pub signature_value: Vec<u8>,
    pub key_info: Option<KeyInfo>,
}

fn qualified(local_name: &str) -> String {
    format!("{}:{local_name}", ns::DSIG_PREFIX)
}

fn required_child<'a, 'input>(
    node: roxmltree::Node<'a, 'input>,
    local_name: &str,
) -> Result<roxmltree::Node<'a, 'input>> {
    find_child_element(node, ns::DSIG, local_name)
        .ok_or_else(|| Error::MissingElement(local_name.to_string()))
}

fn algorithm_of(node: roxmltree::Node<'_, '_>) -> Result<String> {
    node.attribute(ns::attr::ALGORITHM)
        .map(str::to_owned)
        .ok_or_else(|| {
            Error::MissingAttribute(format!("Algorithm on {}", node.tag_name().name()))
        })
}

fn decode_base64(node: roxmltree::Node<'_, '_>) -> Result<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(compact_text(node))
        .map_err(|e| Error::Base64(format!("{}: {e}", node.tag_name().name())))
}

/// PrefixList of an `ec:InclusiveNamespaces` child, if any.
fn inclusive_prefixes(node: roxmltree::Node<'_, '_>) -> Vec<String> {
    find_child_element(node, ns::EXC_C14N, ns::node::INCLUSIVE_NAMESPACES)
        .and_then(|n| n.attribute(ns::attr::PREFIX_LIST))
        .map(|list| list.split_whitespace().map(str::to_owned).collect())
        .unwrap_or_default()
}

/// `<ds:{name} Algorithm="...">` with an optional InclusiveNamespaces child.
fn write_method(writer: &mut XmlWriter, local_name: &str, algorithm: &str, prefixes: &[String]) {
    let name = qualified(local_name);
    if prefixes.is_empty() {
        writer.empty_element(&name, &[(ns::attr::ALGORITHM, algorithm)]);
        return;
    }
    writer.start_element(&name, &[(ns::attr::ALGORITHM, algorithm)]);
    let xmlns = format!("xmlns:{}", ns::EXC_C14N_PREFIX);
    let list = prefixes.join(" ");
    writer.empty_element(
        &format!("{}:{}", ns::EXC_C14N_PREFIX, ns::node::INCLUSIVE_NAMESPACES),
        &[(xmlns.as_str(), ns::EXC_C14N), (ns::attr::PREFIX_LIST, list.as_str())],
    );
    writer.end_element(&name);
}

impl Reference {
    pub fn parse(node: roxmltree::Node<'_, '_>) -> Result<Self> {
        let transforms = match find_child_element(node, ns::DSIG, ns::node::TRANSFORMS) {
            Some(list) => find_child_elements(list, ns::DSIG, ns::node::TRANSFORM)
                .into_iter()
                .map(|t| {
                    Ok(Transform {
                        algorithm: algorithm_of(t)?,
                        inclusive_prefixes: inclusive_prefixes(t),
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };
        Ok(Self {
            uri: node.attribute(ns::attr::URI).map(str::to_owned),
            transforms,
            digest_method: algorithm_of(required_child(node, ns::node::DIGEST_METHOD)?)?,
            digest_value: decode_base64(required_child(node, ns::node::DIGEST_VALUE)?)?,
        })
    }

    fn write(&self, writer: &mut XmlWriter) {
        let name = qualified(ns::node::REFERENCE);
        match &self.uri {
            Some(uri) => writer.start_element(&name, &[(ns::attr::URI, uri.as_str())]),
            None => writer.start_element(&name, &[]),
        }
        if !self.transforms.is_empty() {
            let list = qualified(ns::node::TRANSFORMS);
            writer.start_element(&list, &[]);
            for t in &self.transforms {
                write_method(writer, ns::node::TRANSFORM, &t.algorithm, &t.inclusive_prefixes);
            }
            writer.end_element(&list);
        }
        write_method(writer, ns::node::DIGEST_METHOD, &self.digest_method, &[]);
        writer.text_element(
            &qualified(ns::node::DIGEST_VALUE),
            &[],
            &base64::engine::general_purpose::STANDARD.encode(&self.digest_value),
        );
        writer.end_element(&name);
    }
}

impl SignedInfo {
    /// Parse `<ds:SignedInfo>`. Exactly one Reference is accepted.
    pub fn parse(node: roxmltree::Node<'_, '_>) -> Result<Self> {
        if !is_element(&node, ns::DSIG, ns::node::SIGNED_INFO) {
            return Err(Error::MissingElement(ns::node::SIGNED_INFO.into()));
        }
        let c14n = required_child(node, ns::node::CANONICALIZATION_METHOD)?;
        let method = required_child(node, ns::node::SIGNATURE_METHOD)?;
        let references = find_child_elements(node, ns::DSIG, ns::node::REFERENCE);
        let reference = match references.as_slice() {
            [] => return Err(Error::MissingElement(ns::node::REFERENCE.into())),
            [one] => Reference::parse(*one)?,
            _ => {
                return Err(Error::TooManyElements(format!(
                    "{} References in SignedInfo",
                    references.len()
                )))
            }
        };
        Ok(Self {
            c14n_method: algorithm_of(c14n)?,
            inclusive_prefixes: inclusive_prefixes(c14n),
            signature_method: algorithm_of(method)?,
            reference,
        })
    }

    pub fn write(&self, writer: &mut XmlWriter) {
        let name = qualified(ns::node::SIGNED_INFO);
        writer.start_element(&name, &[]);
        write_method(
            writer,
            ns::node::CANONICALIZATION_METHOD,
            &self.c14n_method,
            &self.inclusive_prefixes,
        );
        write_method(writer, ns::node::SIGNATURE_METHOD, &self.signature_method, &[]);
        self.reference.write(writer);
        writer.end_element(&name);
    }
}

impl Signature {
    pub fn parse(node: roxmltree::Node<'_, '_>) -> Result<Self> {
        if !is_element(&node, ns::DSIG, ns::node::SIGNATURE) {
            return Err(Error::NoSignatureFound);
        }
        let key_info = find_child_element(node, ns::DSIG, ns::node::KEY_INFO)
            .map(KeyInfo::parse)
            .transpose()?;
        Ok(Self {
            signed_info: SignedInfo::parse(required_child(node, ns::node::SIGNED_INFO)?)?,
            signature_value: decode_base64(required_child(node, ns::node::SIGNATURE_VALUE)?)?,
            key_info,
        })
    }

    /// Serialize as a standalone fragment declaring the `ds` prefix.
    pub fn to_xml(&self) -> String {
        let mut writer = XmlWriter::new();
        let name = qualified(ns::node::SIGNATURE);
        let xmlns = format!("xmlns:{}", ns::DSIG_PREFIX);
        writer.start_element(&name, &[(xmlns.as_str(), ns::DSIG)]);
        self.signed_info.write(&mut writer);
        writer.text_element(
            &qualified(ns::node::SIGNATURE_VALUE),
            &[],
            &base64::engine::general_purpose::STANDARD.encode(&self.signature_value),
        );
        if let Some(key_info) = self.key_info.as_ref().filter(|k| !k.is_empty()) {
            key_info.write(&mut writer, false);
        }
        writer.end_element(&name);
        writer.into_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solna_core::algorithm;

    fn sample() -> Signature {
        Signature {
            signed_info: SignedInfo {
                c14n_method: algorithm::EXC_C14N.into(),
                inclusive_prefixes: vec!["xs".into(), "#default".into()],
                signature_method: algorithm::RSA_SHA256.into(),
                reference: Reference {
                    uri: Some("#abc".into()),
                    transforms: vec![
                        Transform::new(algorithm::ENVELOPED_SIGNATURE),
                        Transform::new(algorithm::EXC_C14N),
                    ],
                    digest_method: algorithm::SHA256.into(),
                    digest_value: vec![1, 2, 3],
                },
            },
            signature_value: vec![4, 5, 6],
            key_info: Some(KeyInfo::new().with_key_name("k")),
        }
    }

    #[test]
    fn test_write_and_parse() {
        let signature = sample();
        let xml = signature.to_xml();
        assert!(xml.starts_with("<ds:Signature xmlns:ds=\"http://www.w3.org/2000/09/xmldsig#\"><ds:SignedInfo>"));
        assert!(xml.contains("<ds:Reference URI=\"#abc\">"));
        assert!(xml.contains("PrefixList=\"xs #default\""));
        assert!(xml.contains("<ds:DigestValue>AQID</ds:DigestValue>"));

        let doc = roxmltree::Document::parse(&xml).unwrap();
        assert_eq!(Signature::parse(doc.root_element()).unwrap(), signature);
    }

    #[test]
    fn test_exactly_one_reference() {
        let mut xml = sample().to_xml();
        let start = xml.find("<ds:Reference").unwrap();
        let end = xml.find("</ds:Reference>").unwrap() + "</ds:Reference>".len();
        let reference = xml[start..end].to_string();
        xml.insert_str(end, &reference);
        let doc = roxmltree::Document::parse(&xml).unwrap();
        assert!(matches!(Signature::parse(doc.root_element()), Err(Error::TooManyElements(_))));

        let stripped = sample().to_xml().replace(&reference, "");
        let doc = roxmltree::Document::parse(&stripped).unwrap();
        assert!(matches!(Signature::parse(doc.root_element()), Err(Error::MissingElement(_))));
    }

    #[test]
    fn test_missing_algorithm() {
        let xml = sample()
            .to_xml()
            .replace(&format!("<ds:SignatureMethod Algorithm=\"{}\"/>", algorithm::RSA_SHA256), "<ds:SignatureMethod/>");
        let doc = roxmltree::Document::parse(&xml).unwrap();
        assert!(matches!(Signature::parse(doc.root_element()), Err(Error::MissingAttribute(_))));
    }
}
