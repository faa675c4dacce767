#![forbid(unsafe_code)]

//! Building EncryptedData and EncryptedKey from plaintext.

use crate::context::EncContext;
use crate::model::{EncryptedData, EncryptedKey, EncryptionMethod};
use solna_core::{algorithm, ns, Error, Result};
use solna_crypto::{EncryptionAlgorithm, SymmetricKey};
use solna_xml::XmlElement;

impl EncryptedKey {
    /// Encrypt `key` with a key transport or key wrap algorithm.
    pub fn from_key<A>(transport: &A, key: &SymmetricKey) -> Result<Self>
    where
        A: EncryptionAlgorithm + ?Sized,
    {
        Ok(Self {
            encryption_method: Some(EncryptionMethod::new(transport.algorithm_id())),
            cipher_value: transport.encrypt(key.as_bytes())?,
            ..Self::default()
        })
    }

    /// Recover the key bytes. A declared EncryptionMethod must match the
    /// algorithm.
    pub fn decrypt<A>(&self, transport: &A) -> Result<Vec<u8>>
    where
        A: EncryptionAlgorithm + ?Sized,
    {
        if let Some(method) = &self.encryption_method {
            if method.algorithm != transport.algorithm_id() {
                return Err(Error::InvalidArgument(format!(
                    "EncryptedKey declares {}, decrypting with {}",
                    method.algorithm,
                    transport.algorithm_id()
                )));
            }
        }
        transport.decrypt(&self.cipher_value)
    }
}

/// Encrypt `element` with `cipher` as an `Element`-typed EncryptedData.
pub fn encrypt_element<A>(element: &XmlElement, cipher: &A) -> Result<EncryptedData>
where
    A: EncryptionAlgorithm + ?Sized,
{
    let doc = element.document()?;
    let plaintext = &element.as_str()[doc.root_element().range()];
    tracing::debug!(
        algorithm = cipher.algorithm_id(),
        element = element.local_name(),
        bytes = plaintext.len(),
        "encrypting element"
    );
    Ok(EncryptedData {
        type_uri: Some(ns::ENC_TYPE_ELEMENT.into()),
        encryption_method: Some(EncryptionMethod::new(cipher.algorithm_id())),
        cipher_value: cipher.encrypt(plaintext.as_bytes())?,
        ..EncryptedData::default()
    })
}

/// Encrypt `element` under a fresh session key for `block_cipher`, and
/// deliver that key in a nested EncryptedKey made with `transport`.
pub fn encrypt_with_session_key<A>(
    element: &XmlElement,
    block_cipher: &str,
    transport: &A,
    context: &EncContext,
) -> Result<EncryptedData>
where
    A: EncryptionAlgorithm + ?Sized,
{
    let length = algorithm::required_key_length(block_cipher)
        .ok_or_else(|| Error::UnsupportedAlgorithm(format!("block cipher: {block_cipher}")))?;
    let session_key = SymmetricKey::generate(length)?;
    let cipher = context.block_cipher(block_cipher, session_key.clone().into())?;
    let mut data = encrypt_element(element, cipher.as_ref())?;
    data.encrypted_key = Some(EncryptedKey::from_key(transport, &session_key)?);
    Ok(data)
}
