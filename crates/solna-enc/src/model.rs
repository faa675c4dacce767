#![forbid(unsafe_code)]

//! `<xenc:EncryptedData>` and `<xenc:EncryptedKey>`.
//!
//! Ciphertext is carried inline in CipherValue. CipherReference is not
//! supported. An EncryptedData holds at most one EncryptedKey, found in its
//! KeyInfo.

use base64::Engine;
use solna_core::{ns, Error, Result};
use solna_crypto::backend::OaepParams;
use solna_keys::KeyInfo;
use solna_xml::{compact_text, find_child_element, find_child_elements, is_element, XmlWriter};

/// `<xenc:EncryptionMethod>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncryptionMethod {
    pub algorithm: String,
    /// KeySize in bits.
    pub key_size: Option<u32>,
    /// Decoded OAEPparams.
    pub oaep_params: Option<Vec<u8>>,
    /// `ds:DigestMethod` for RSA-OAEP.
    pub digest_method: Option<String>,
    /// `xenc11:MGF` for xmlenc11 RSA-OAEP.
    pub mgf: Option<String>,
}

impl EncryptionMethod {
    pub fn new(algorithm: impl Into<String>) -> Self {
        Self {
            algorithm: algorithm.into(),
            ..Self::default()
        }
    }

    /// The RSA-OAEP parameters this method declares.
    pub fn oaep(&self) -> OaepParams {
        OaepParams {
            digest_uri: self.digest_method.clone(),
            mgf_uri: self.mgf.clone(),
            label: self.oaep_params.clone(),
        }
    }

    fn parse(node: roxmltree::Node<'_, '_>) -> Result<Self> {
        let algorithm = node
            .attribute(ns::attr::ALGORITHM)
            .ok_or_else(|| Error::MissingAttribute("Algorithm on EncryptionMethod".into()))?;
        let key_size = find_child_element(node, ns::ENC, ns::node::KEY_SIZE)
            .map(|n| {
                compact_text(n)
                    .parse::<u32>()
                    .map_err(|e| Error::InvalidArgument(format!("KeySize: {e}")))
            })
            .transpose()?;
        let oaep_params = find_child_element(node, ns::ENC, ns::node::OAEP_PARAMS)
            .map(decode_base64)
            .transpose()?;
        let algorithm_of = |namespace: &str, local_name: &str| {
            find_child_element(node, namespace, local_name)
                .and_then(|n| n.attribute(ns::attr::ALGORITHM))
                .map(str::to_owned)
        };
        Ok(Self {
            algorithm: algorithm.to_owned(),
            key_size,
            oaep_params,
            digest_method: algorithm_of(ns::DSIG, ns::node::DIGEST_METHOD),
            mgf: algorithm_of(ns::ENC11, ns::node::MGF),
        })
    }

    fn write(&self, writer: &mut XmlWriter) {
        let name = qualified(ns::node::ENCRYPTION_METHOD);
        let attrs = [(ns::attr::ALGORITHM, self.algorithm.as_str())];
        if self.key_size.is_none()
            && self.oaep_params.is_none()
            && self.digest_method.is_none()
            && self.mgf.is_none()
        {
            writer.empty_element(&name, &attrs);
            return;
        }
        writer.start_element(&name, &attrs);
        if let Some(bits) = self.key_size {
            writer.text_element(&qualified(ns::node::KEY_SIZE), &[], &bits.to_string());
        }
        if let Some(label) = &self.oaep_params {
            writer.text_element(
                &qualified(ns::node::OAEP_PARAMS),
                &[],
                &base64::engine::general_purpose::STANDARD.encode(label),
            );
        }
        if let Some(digest) = &self.digest_method {
            let xmlns = format!("xmlns:{}", ns::DSIG_PREFIX);
            writer.empty_element(
                &format!("{}:{}", ns::DSIG_PREFIX, ns::node::DIGEST_METHOD),
                &[(xmlns.as_str(), ns::DSIG), (ns::attr::ALGORITHM, digest.as_str())],
            );
        }
        if let Some(mgf) = &self.mgf {
            let xmlns = format!("xmlns:{}", ns::ENC11_PREFIX);
            writer.empty_element(
                &format!("{}:{}", ns::ENC11_PREFIX, ns::node::MGF),
                &[(xmlns.as_str(), ns::ENC11), (ns::attr::ALGORITHM, mgf.as_str())],
            );
        }
        writer.end_element(&name);
    }
}

/// `<xenc:EncryptedKey>`: a key encrypted for a recipient.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncryptedKey {
    pub id: Option<String>,
    pub type_uri: Option<String>,
    pub mime_type: Option<String>,
    pub recipient: Option<String>,
    pub encryption_method: Option<EncryptionMethod>,
    pub key_info: Option<KeyInfo>,
    pub cipher_value: Vec<u8>,
    pub carried_key_name: Option<String>,
}

impl EncryptedKey {
    pub fn parse(node: roxmltree::Node<'_, '_>) -> Result<Self> {
        if !is_element(&node, ns::ENC, ns::node::ENCRYPTED_KEY) {
            return Err(Error::MissingElement(ns::node::ENCRYPTED_KEY.into()));
        }
        let common = Common::parse(node)?;
        Ok(Self {
            id: common.id,
            type_uri: common.type_uri,
            mime_type: common.mime_type,
            recipient: node.attribute(ns::attr::RECIPIENT).map(str::to_owned),
            encryption_method: common.encryption_method,
            key_info: common.key_info,
            cipher_value: common.cipher_value,
            carried_key_name: find_child_element(node, ns::ENC, ns::node::CARRIED_KEY_NAME)
                .map(|n| n.text().unwrap_or("").trim().to_owned()),
        })
    }

    /// Write the element. `declare_namespace` adds `xmlns:xenc`.
    pub fn write(&self, writer: &mut XmlWriter, declare_namespace: bool) {
        let name = qualified(ns::node::ENCRYPTED_KEY);
        let xmlns = format!("xmlns:{}", ns::ENC_PREFIX);
        let mut attrs: Vec<(&str, &str)> = Vec::new();
        if declare_namespace {
            attrs.push((xmlns.as_str(), ns::ENC));
        }
        push_optional(&mut attrs, ns::attr::ID, &self.id);
        push_optional(&mut attrs, ns::attr::TYPE, &self.type_uri);
        push_optional(&mut attrs, ns::attr::MIME_TYPE, &self.mime_type);
        push_optional(&mut attrs, ns::attr::RECIPIENT, &self.recipient);
        writer.start_element(&name, &attrs);
        if let Some(method) = &self.encryption_method {
            method.write(writer);
        }
        if let Some(key_info) = &self.key_info {
            key_info.write(writer, true);
        }
        write_cipher_data(writer, &self.cipher_value);
        if let Some(carried) = &self.carried_key_name {
            writer.text_element(&qualified(ns::node::CARRIED_KEY_NAME), &[], carried);
        }
        writer.end_element(&name);
    }

    pub fn to_xml(&self) -> String {
        let mut writer = XmlWriter::new();
        self.write(&mut writer, true);
        writer.into_string()
    }
}

/// `<xenc:EncryptedData>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncryptedData {
    pub id: Option<String>,
    /// `Type`: [`ns::ENC_TYPE_ELEMENT`] or [`ns::ENC_TYPE_CONTENT`].
    pub type_uri: Option<String>,
    pub mime_type: Option<String>,
    pub encryption_method: Option<EncryptionMethod>,
    pub key_info: Option<KeyInfo>,
    /// The EncryptedKey inside KeyInfo that carries the session key.
    pub encrypted_key: Option<EncryptedKey>,
    pub cipher_value: Vec<u8>,
}

impl EncryptedData {
    /// Parse `<xenc:EncryptedData>`; any other element is `NoEncryptedData`.
    pub fn parse(node: roxmltree::Node<'_, '_>) -> Result<Self> {
        if !is_element(&node, ns::ENC, ns::node::ENCRYPTED_DATA) {
            return Err(Error::NoEncryptedData);
        }
        let common = Common::parse(node)?;
        let encrypted_key = match find_child_element(node, ns::DSIG, ns::node::KEY_INFO) {
            Some(key_info) => {
                match find_child_elements(key_info, ns::ENC, ns::node::ENCRYPTED_KEY).as_slice() {
                    [] => None,
                    [one] => Some(EncryptedKey::parse(*one)?),
                    many => {
                        return Err(Error::TooManyElements(format!(
                            "{} EncryptedKey elements in KeyInfo",
                            many.len()
                        )))
                    }
                }
            }
            None => None,
        };
        Ok(Self {
            id: common.id,
            type_uri: common.type_uri,
            mime_type: common.mime_type,
            encryption_method: common.encryption_method,
            key_info: common.key_info,
            encrypted_key,
            cipher_value: common.cipher_value,
        })
    }

    /// The algorithm declared by EncryptionMethod.
    pub fn algorithm(&self) -> Option<&str> {
        self.encryption_method.as_ref().map(|m| m.algorithm.as_str())
    }

    /// Write the element. `declare_namespace` adds `xmlns:xenc`; a nested
    /// EncryptedKey relies on it being in scope.
    pub fn write(&self, writer: &mut XmlWriter, declare_namespace: bool) {
        let name = qualified(ns::node::ENCRYPTED_DATA);
        let xmlns = format!("xmlns:{}", ns::ENC_PREFIX);
        let mut attrs: Vec<(&str, &str)> = Vec::new();
        if declare_namespace {
            attrs.push((xmlns.as_str(), ns::ENC));
        }
        push_optional(&mut attrs, ns::attr::ID, &self.id);
        push_optional(&mut attrs, ns::attr::TYPE, &self.type_uri);
        push_optional(&mut attrs, ns::attr::MIME_TYPE, &self.mime_type);
        writer.start_element(&name, &attrs);
        if let Some(method) = &self.encryption_method {
            method.write(writer);
        }
        match (&self.key_info, &self.encrypted_key) {
            (key_info, Some(encrypted_key)) => {
                let key_info = key_info.clone().unwrap_or_default();
                key_info.write_with(writer, true, |w| encrypted_key.write(w, false));
            }
            (Some(key_info), None) => key_info.write(writer, true),
            (None, None) => {}
        }
        write_cipher_data(writer, &self.cipher_value);
        writer.end_element(&name);
    }

    pub fn to_xml(&self) -> String {
        let mut writer = XmlWriter::new();
        self.write(&mut writer, true);
        writer.into_string()
    }
}

/// Parts shared by EncryptedData and EncryptedKey.
struct Common {
    id: Option<String>,
    type_uri: Option<String>,
    mime_type: Option<String>,
    encryption_method: Option<EncryptionMethod>,
    key_info: Option<KeyInfo>,
    cipher_value: Vec<u8>,
}

impl Common {
    fn parse(node: roxmltree::Node<'_, '_>) -> Result<Self> {
        let encryption_method = find_child_element(node, ns::ENC, ns::node::ENCRYPTION_METHOD)
            .map(EncryptionMethod::parse)
            .transpose()?;
        let key_info = find_child_element(node, ns::DSIG, ns::node::KEY_INFO)
            .map(KeyInfo::parse)
            .transpose()?;
        let cipher_data = find_child_element(node, ns::ENC, ns::node::CIPHER_DATA)
            .ok_or_else(|| Error::MissingElement(ns::node::CIPHER_DATA.into()))?;
        let cipher_value = find_child_element(cipher_data, ns::ENC, ns::node::CIPHER_VALUE)
            .ok_or_else(|| Error::MissingElement(ns::node::CIPHER_VALUE.into()))?;
        let attribute = |name: &str| node.attribute(name).map(str::to_owned);
        Ok(Self {
            id: attribute(ns::attr::ID),
            type_uri: attribute(ns::attr::TYPE),
            mime_type: attribute(ns::attr::MIME_TYPE),
            encryption_method,
            key_info,
            cipher_value: decode_base64(cipher_value)?,
        })
    }
}

fn qualified(local_name: &str) -> String {
    format!("{}:{local_name}", ns::ENC_PREFIX)
}

fn push_optional<'a>(attrs: &mut Vec<(&'a str, &'a str)>, name: &'a str, value: &'a Option<String>) {
    if let Some(value) = value {
        attrs.push((name, value.as_str()));
    }
}

fn write_cipher_data(writer: &mut XmlWriter, cipher_value: &[u8]) {
    let name = qualified(ns::node::CIPHER_DATA);
    writer.start_element(&name, &[]);
    writer.text_element(
        &qualified(ns::node::CIPHER_VALUE),
        &[],
        &base64::engine::general_purpose::STANDARD.encode(cipher_value),
    );
    writer.end_element(&name);
}

fn decode_base64(node: roxmltree::Node<'_, '_>) -> Result<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(compact_text(node))
        .map_err(|e| Error::Base64(format!("{}: {e}", node.tag_name().name())))
}
