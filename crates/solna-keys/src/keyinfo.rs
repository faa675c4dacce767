#![forbid(unsafe_code)]

//! `<ds:KeyInfo>`: key names and embedded X.509 certificates.

use crate::x509::X509Certificate;
use base64::Engine;
use solna_core::{ns, Error, Result};
use solna_xml::{compact_text, is_element, XmlWriter};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyInfo {
    pub key_names: Vec<String>,
    pub certificates: Vec<EmbeddedCertificate>,
}

/// The base64 content of one `<ds:X509Certificate>`.
///
/// KeyInfo sits outside SignedInfo, so anything in it may have been added
/// by a third party. Decoding is left to [`decode`](Self::decode) so that a
/// certificate which does not parse only affects itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedCertificate {
    base64: String,
}

impl EmbeddedCertificate {
    pub fn as_base64(&self) -> &str {
        &self.base64
    }

    pub fn decode(&self) -> Result<X509Certificate> {
        let der = base64::engine::general_purpose::STANDARD
            .decode(&self.base64)
            .map_err(|e| Error::Base64(format!("X509Certificate: {e}")))?;
        X509Certificate::from_der(&der)
    }
}

impl From<X509Certificate> for EmbeddedCertificate {
    fn from(certificate: X509Certificate) -> Self {
        Self::from(&certificate)
    }
}

impl From<&X509Certificate> for EmbeddedCertificate {
    fn from(certificate: &X509Certificate) -> Self {
        Self {
            base64: certificate.to_base64(),
        }
    }
}

impl KeyInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_certificate(certificate: X509Certificate) -> Self {
        Self {
            key_names: Vec::new(),
            certificates: vec![certificate.into()],
        }
    }

    pub fn with_key_name(mut self, name: impl Into<String>) -> Self {
        self.key_names.push(name.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.key_names.is_empty() && self.certificates.is_empty()
    }

    /// Read KeyName and X509Data/X509Certificate children. Other children
    /// are left to the caller, and certificates stay undecoded.
    pub fn parse(node: roxmltree::Node<'_, '_>) -> Result<Self> {
        if !is_element(&node, ns::DSIG, ns::node::KEY_INFO) {
            return Err(Error::MissingElement(ns::node::KEY_INFO.into()));
        }
        let mut info = Self::new();
        for child in node.children().filter(|c| c.is_element()) {
            if is_element(&child, ns::DSIG, ns::node::KEY_NAME) {
                let name = child.text().unwrap_or("").trim();
                if !name.is_empty() {
                    info.key_names.push(name.to_string());
                }
            } else if is_element(&child, ns::DSIG, ns::node::X509_DATA) {
                for cert_node in child
                    .children()
                    .filter(|c| is_element(c, ns::DSIG, ns::node::X509_CERTIFICATE))
                {
                    info.certificates.push(EmbeddedCertificate {
                        base64: compact_text(cert_node),
                    });
                }
            }
        }
        Ok(info)
    }

    /// Write `<ds:KeyInfo>`. `declare_namespace` adds `xmlns:ds` for use
    /// outside a Signature.
    pub fn write(&self, writer: &mut XmlWriter, declare_namespace: bool) {
        self.write_with(writer, declare_namespace, |_| {});
    }

    /// Like [`write`](Self::write), with extra children appended by `extra`.
    pub fn write_with(
        &self,
        writer: &mut XmlWriter,
        declare_namespace: bool,
        extra: impl FnOnce(&mut XmlWriter),
    ) {
        let name = qualified(ns::node::KEY_INFO);
        let xmlns = format!("xmlns:{}", ns::DSIG_PREFIX);
        let mut attrs: Vec<(&str, &str)> = Vec::new();
        if declare_namespace {
            attrs.push((xmlns.as_str(), ns::DSIG));
        }
        writer.start_element(&name, &attrs);
        for key_name in &self.key_names {
            writer.text_element(&qualified(ns::node::KEY_NAME), &[], key_name);
        }
        if !self.certificates.is_empty() {
            let data = qualified(ns::node::X509_DATA);
            writer.start_element(&data, &[]);
            for cert in &self.certificates {
                writer.text_element(&qualified(ns::node::X509_CERTIFICATE), &[], cert.as_base64());
            }
            writer.end_element(&data);
        }
        extra(writer);
        writer.end_element(&name);
    }
}

fn qualified(local_name: &str) -> String {
    format!("{}:{local_name}", ns::DSIG_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cert() -> X509Certificate {
        X509Certificate::from_pem(include_bytes!("../../../test-data/keys/rsa-cert.pem")).unwrap()
    }

    #[test]
    fn test_write_then_parse() {
        let info = KeyInfo::with_certificate(cert()).with_key_name("signer");
        let mut w = XmlWriter::new();
        info.write(&mut w, true);
        let xml = w.into_string();
        assert!(xml.starts_with("<ds:KeyInfo xmlns:ds=\"http://www.w3.org/2000/09/xmldsig#\"><ds:KeyName>signer</ds:KeyName><ds:X509Data><ds:X509Certificate>MII"));

        let doc = roxmltree::Document::parse(&xml).unwrap();
        assert_eq!(KeyInfo::parse(doc.root_element()).unwrap(), info);
    }

    #[test]
    fn test_parse_wrapped_base64() {
        let pem = cert().pem().to_string();
        let body: String = pem.lines().filter(|l| !l.starts_with("-----")).collect::<Vec<_>>().join("\n");
        let xml = format!(
            "<KeyInfo xmlns=\"{}\"><KeyName> a </KeyName><Other/><X509Data>\n<X509Certificate>\n{body}\n</X509Certificate></X509Data></KeyInfo>",
            ns::DSIG
        );
        let doc = roxmltree::Document::parse(&xml).unwrap();
        let info = KeyInfo::parse(doc.root_element()).unwrap();
        assert_eq!(info.key_names, vec!["a".to_string()]);
        assert_eq!(info.certificates, vec![cert().into()]);
        assert_eq!(info.certificates[0].decode().unwrap(), cert());
    }

    #[test]
    fn test_bad_certificates_parse_but_do_not_decode() {
        let ec = X509Certificate::from_pem(include_bytes!("../../../test-data/keys/ec-cert.pem"));
        assert!(matches!(ec, Err(Error::InvalidArgument(_))));
        let ec_body: String = std::str::from_utf8(include_bytes!("../../../test-data/keys/ec-cert.pem"))
            .unwrap()
            .lines()
            .filter(|l| !l.starts_with("-----"))
            .collect();
        let xml = format!(
            "<ds:KeyInfo xmlns:ds=\"{}\"><ds:X509Data><ds:X509Certificate>!!</ds:X509Certificate><ds:X509Certificate>MIIBAAAA</ds:X509Certificate><ds:X509Certificate>{ec_body}</ds:X509Certificate><ds:X509Certificate>{}</ds:X509Certificate></ds:X509Data></ds:KeyInfo>",
            ns::DSIG,
            cert().to_base64()
        );
        let doc = roxmltree::Document::parse(&xml).unwrap();
        let info = KeyInfo::parse(doc.root_element()).unwrap();
        assert_eq!(info.certificates.len(), 4);
        assert!(matches!(info.certificates[0].decode(), Err(Error::Base64(_))));
        assert!(matches!(info.certificates[1].decode(), Err(Error::Certificate(_))));
        assert!(matches!(info.certificates[2].decode(), Err(Error::InvalidArgument(_))));
        assert_eq!(info.certificates[3].decode().unwrap(), cert());
        let doc = roxmltree::Document::parse("<KeyInfo/>").unwrap();
        assert!(matches!(KeyInfo::parse(doc.root_element()), Err(Error::MissingElement(_))));
    }
}
