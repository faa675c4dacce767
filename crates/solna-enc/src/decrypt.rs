#![forbid(unsafe_code)]

//! XML-Enc decryption.
//!
//! A block cipher decrypts CipherValue directly. A key transport algorithm
//! first recovers the session key from the EncryptedKey, and a block cipher
//! for the declared EncryptionMethod is built from it through the context.

use crate::context::EncContext;
use crate::model::EncryptedData;
use solna_core::{ns, Error, Result};
use solna_crypto::{EncryptionAlgorithm, KeyTransportAlgorithm, SymmetricKey};
use solna_xml::{find_child_elements, is_element, XmlElement};

/// The algorithm handed to [`decrypt_data`].
#[derive(Clone, Copy)]
pub enum Decryptor<'a> {
    /// Decrypts the CipherValue itself.
    BlockCipher(&'a dyn EncryptionAlgorithm),
    /// Decrypts the EncryptedKey that carries the session key.
    KeyTransport(&'a dyn KeyTransportAlgorithm),
}

impl Decryptor<'_> {
    pub fn algorithm_id(&self) -> &str {
        match self {
            Self::BlockCipher(cipher) => cipher.algorithm_id(),
            Self::KeyTransport(transport) => transport.algorithm_id(),
        }
    }
}

impl std::fmt::Debug for Decryptor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlockCipher(_) => write!(f, "BlockCipher({})", self.algorithm_id()),
            Self::KeyTransport(_) => write!(f, "KeyTransport({})", self.algorithm_id()),
        }
    }
}

/// Decrypt the CipherValue of `data`.
pub fn decrypt_data(data: &EncryptedData, decryptor: Decryptor<'_>, context: &EncContext) -> Result<Vec<u8>> {
    let declared = data.algorithm().unwrap_or_else(|| decryptor.algorithm_id());

    let session_cipher;
    let cipher: &dyn EncryptionAlgorithm = match decryptor {
        Decryptor::BlockCipher(cipher) => cipher,
        Decryptor::KeyTransport(transport) => {
            let encrypted_key = data.encrypted_key.as_ref().ok_or_else(|| {
                Error::MissingElement(format!(
                    "cannot use a key transport algorithm to decrypt an object without {}",
                    ns::node::ENCRYPTED_KEY
                ))
            })?;
            let method = data
                .encryption_method
                .as_ref()
                .ok_or_else(|| Error::MissingElement(ns::node::ENCRYPTION_METHOD.into()))?;
            let session_key = SymmetricKey::new(encrypted_key.decrypt(transport)?)?;
            tracing::debug!(
                transport = transport.algorithm_id(),
                cipher = %method.algorithm,
                "decrypted session key"
            );
            session_cipher = context.block_cipher(&method.algorithm, session_key.into())?;
            session_cipher.as_ref()
        }
    };

    if cipher.algorithm_id() != declared {
        return Err(Error::InvalidArgument(format!(
            "EncryptedData declares {declared}, decrypting with {}",
            cipher.algorithm_id()
        )));
    }
    cipher.decrypt(&data.cipher_value)
}

/// An EncryptedData, on its own or inside a container element such as
/// `saml:EncryptedAssertion`.
#[derive(Debug, Clone)]
pub struct EncryptedElement {
    element: XmlElement,
    data: EncryptedData,
    context: EncContext,
}

impl EncryptedElement {
    pub fn new(element: XmlElement) -> Result<Self> {
        Self::with_context(element, EncContext::new())
    }

    /// Locate the EncryptedData: the element itself or its single
    /// EncryptedData child.
    pub fn with_context(element: XmlElement, context: EncContext) -> Result<Self> {
        let data = {
            let doc = element.document()?;
            let root = doc.root_element();
            if is_element(&root, ns::ENC, ns::node::ENCRYPTED_DATA) {
                EncryptedData::parse(root)?
            } else {
                match find_child_elements(root, ns::ENC, ns::node::ENCRYPTED_DATA).as_slice() {
                    [] => return Err(Error::NoEncryptedData),
                    [one] => EncryptedData::parse(*one)?,
                    many => {
                        return Err(Error::TooManyElements(format!(
                            "{} EncryptedData elements",
                            many.len()
                        )))
                    }
                }
            }
        };
        Ok(Self {
            element,
            data,
            context,
        })
    }

    pub fn element(&self) -> &XmlElement {
        &self.element
    }

    pub fn encrypted_data(&self) -> &EncryptedData {
        &self.data
    }

    /// Whether an EncryptedKey is present, so a key transport algorithm
    /// can decrypt this element.
    pub fn has_decryption_key(&self) -> bool {
        self.data.encrypted_key.is_some()
    }

    /// Decrypt to raw bytes.
    pub fn decrypt(&self, decryptor: Decryptor<'_>) -> Result<Vec<u8>> {
        decrypt_data(&self.data, decryptor, &self.context)
    }

    /// Decrypt an `Element`-typed EncryptedData and parse the result.
    pub fn decrypt_element(&self, decryptor: Decryptor<'_>) -> Result<XmlElement> {
        if self.data.type_uri.as_deref() == Some(ns::ENC_TYPE_CONTENT) {
            return Err(Error::InvalidArgument(
                "EncryptedData holds element content, not an element".into(),
            ));
        }
        XmlElement::parse_bytes(&self.decrypt(decryptor)?)
    }

    pub fn to_xml(&self) -> String {
        self.element.as_str().to_owned()
    }
}

/// A domain type that carries encrypted content through an
/// [`EncryptedElement`].
pub trait Encrypted {
    fn encrypted_element(&self) -> &EncryptedElement;

    fn has_decryption_key(&self) -> bool {
        self.encrypted_element().has_decryption_key()
    }

    fn decrypt(&self, decryptor: Decryptor<'_>) -> Result<XmlElement> {
        self.encrypted_element().decrypt_element(decryptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encrypt::{encrypt_element, encrypt_with_session_key};
    use crate::model::EncryptedKey;
    use solna_core::algorithm;
    use solna_crypto::alg::{Aes, AesKeyWrap, RsaTransport};
    use solna_crypto::{KeyTransportAlgorithmFactory, PrivateKey};

    const PAYLOAD: &str = r#"<p:Secret xmlns:p="urn:p" Id="s1"><p:Value>42</p:Value></p:Secret>"#;

    fn rsa_key() -> PrivateKey {
        PrivateKey::from_pem(include_bytes!("../../../test-data/keys/rsa-key.pem"), None).unwrap()
    }

    fn wrapped(data: &EncryptedData) -> XmlElement {
        XmlElement::parse(format!(
            "<p:EncryptedSecret xmlns:p=\"urn:p\">{}</p:EncryptedSecret>",
            data.to_xml()
        ))
        .unwrap()
    }

    #[test]
    fn test_direct_block_cipher() {
        let key = SymmetricKey::generate(16).unwrap();
        let aes = Aes::new(key.into(), algorithm::AES128_CBC).unwrap();
        let data = encrypt_element(&XmlElement::parse(PAYLOAD).unwrap(), &aes).unwrap();

        let encrypted = EncryptedElement::new(wrapped(&data)).unwrap();
        assert!(!encrypted.has_decryption_key());
        let plain = encrypted.decrypt_element(Decryptor::BlockCipher(&aes)).unwrap();
        assert_eq!(plain.as_str(), PAYLOAD);
    }

    #[test]
    fn test_key_transport_chain() {
        let public = RsaTransport::new(rsa_key().public_key().unwrap().into(), algorithm::RSA_OAEP).unwrap();
        let element = XmlElement::parse(PAYLOAD).unwrap();
        let data = encrypt_with_session_key(&element, algorithm::AES256_CBC, &public, &EncContext::new()).unwrap();

        let encrypted = EncryptedElement::new(XmlElement::parse(data.to_xml()).unwrap()).unwrap();
        assert!(encrypted.has_decryption_key());
        let factory = KeyTransportAlgorithmFactory::new();
        let private = factory.get_algorithm(algorithm::RSA_OAEP, rsa_key().into()).unwrap();
        let plain = encrypted.decrypt_element(Decryptor::KeyTransport(private.as_ref())).unwrap();
        assert_eq!(plain.as_str(), PAYLOAD);
    }

    #[test]
    fn test_key_transport_requires_encrypted_key() {
        let key = SymmetricKey::generate(16).unwrap();
        let aes = Aes::new(key.into(), algorithm::AES128_GCM).unwrap();
        let data = encrypt_element(&XmlElement::parse(PAYLOAD).unwrap(), &aes).unwrap();
        let kek = AesKeyWrap::new(SymmetricKey::generate(16).unwrap().into(), algorithm::KW_AES128).unwrap();
        let err = decrypt_data(&data, Decryptor::KeyTransport(&kek), &EncContext::new()).unwrap_err();
        assert!(matches!(err, Error::MissingElement(ref m) if m.contains("key transport")));

        let no_method = EncryptedData {
            encryption_method: None,
            encrypted_key: Some(EncryptedKey::default()),
            ..data
        };
        assert!(matches!(
            decrypt_data(&no_method, Decryptor::KeyTransport(&kek), &EncContext::new()),
            Err(Error::MissingElement(_))
        ));
    }

    #[test]
    fn test_algorithm_confusion() {
        let key = SymmetricKey::generate(16).unwrap();
        let cbc = Aes::new(key.clone().into(), algorithm::AES128_CBC).unwrap();
        let gcm = Aes::new(key.into(), algorithm::AES128_GCM).unwrap();
        let data = encrypt_element(&XmlElement::parse(PAYLOAD).unwrap(), &cbc).unwrap();
        assert!(matches!(
            decrypt_data(&data, Decryptor::BlockCipher(&gcm), &EncContext::new()),
            Err(Error::InvalidArgument(_))
        ));

        // Without an EncryptionMethod the decryptor's own id is trusted.
        let undeclared = EncryptedData {
            encryption_method: None,
            ..data
        };
        let plain = decrypt_data(&undeclared, Decryptor::BlockCipher(&cbc), &EncContext::new()).unwrap();
        assert_eq!(plain, PAYLOAD.as_bytes());
    }

    #[test]
    fn test_session_cipher_blacklisted() {
        let kek = AesKeyWrap::new(SymmetricKey::generate(24).unwrap().into(), algorithm::KW_AES192).unwrap();
        let permissive = EncContext::new().with_encryption_factory(
            solna_crypto::EncryptionAlgorithmFactory::new().with_blacklist(Vec::<String>::new()),
        );
        let element = XmlElement::parse(PAYLOAD).unwrap();
        let data = encrypt_with_session_key(&element, algorithm::TRIPLEDES_CBC, &kek, &permissive).unwrap();

        assert!(matches!(
            decrypt_data(&data, Decryptor::KeyTransport(&kek), &EncContext::new()),
            Err(Error::BlacklistedAlgorithm(_))
        ));
        let plain = decrypt_data(&data, Decryptor::KeyTransport(&kek), &permissive).unwrap();
        assert_eq!(plain, PAYLOAD.as_bytes());
    }

    #[test]
    fn test_locating_encrypted_data() {
        let missing = XmlElement::parse("<p:EncryptedSecret xmlns:p=\"urn:p\"/>").unwrap();
        assert!(matches!(EncryptedElement::new(missing), Err(Error::NoEncryptedData)));

        let data = EncryptedData {
            cipher_value: vec![0; 16],
            ..EncryptedData::default()
        };
        let doubled = XmlElement::parse(format!("<c>{}{}</c>", data.to_xml(), data.to_xml())).unwrap();
        assert!(matches!(EncryptedElement::new(doubled), Err(Error::TooManyElements(_))));
    }

    #[test]
    fn test_content_is_not_an_element() {
        let key = SymmetricKey::generate(16).unwrap();
        let aes = Aes::new(key.into(), algorithm::AES128_CBC).unwrap();
        let data = EncryptedData {
            type_uri: Some(ns::ENC_TYPE_CONTENT.into()),
            ..encrypt_element(&XmlElement::parse(PAYLOAD).unwrap(), &aes).unwrap()
        };
        let encrypted = EncryptedElement::new(wrapped(&data)).unwrap();
        assert!(matches!(
            encrypted.decrypt_element(Decryptor::BlockCipher(&aes)),
            Err(Error::InvalidArgument(_))
        ));
        assert_eq!(encrypted.decrypt(Decryptor::BlockCipher(&aes)).unwrap(), PAYLOAD.as_bytes());
    }
}
