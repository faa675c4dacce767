#![forbid(unsafe_code)]

use solna::core::algorithm;
use solna::crypto::alg::RsaTransport;
use solna::crypto::backend::OaepParams;
use solna::crypto::kdf::{pbkdf2, Pbkdf2Params};
use solna::crypto::{
    EncryptionAlgorithm, EncryptionAlgorithmFactory, KeyTransportAlgorithmFactory, PrivateKey,
    SignatureAlgorithmFactory, SymmetricKey,
};
use solna::dsig::{SignableElement, SignedElement};
use solna::enc::{
    encrypt_element, encrypt_with_session_key, Decryptor, EncContext, Encrypted, EncryptedElement,
    EncryptionMethod,
};
use solna::keys::{KeyInfo, X509Certificate};
use solna::xml::XmlElement;
use solna::Error;

const ASSERTION: &str = r#"<saml:Assertion xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="_a7"><saml:Issuer>https://idp.example.org</saml:Issuer><saml:AttributeStatement><saml:Attribute Name="role"><saml:AttributeValue>admin</saml:AttributeValue></saml:Attribute></saml:AttributeStatement></saml:Assertion>"#;

fn private_key() -> PrivateKey {
    PrivateKey::from_pem(include_bytes!("../../../test-data/keys/rsa-key.pem"), None).unwrap()
}

fn certificate() -> X509Certificate {
    X509Certificate::from_pem(include_bytes!("../../../test-data/keys/rsa-cert.pem")).unwrap()
}

fn signed_assertion() -> XmlElement {
    let signer = SignatureAlgorithmFactory::new()
        .get_algorithm(algorithm::RSA_SHA256, private_key().into())
        .unwrap();
    let mut signable = SignableElement::new(XmlElement::parse(ASSERTION).unwrap());
    signable
        .sign(signer, algorithm::EXC_C14N, Some(KeyInfo::with_certificate(certificate())))
        .unwrap();
    XmlElement::parse(signable.to_xml().unwrap()).unwrap()
}

/// `saml:EncryptedAssertion` as a domain type.
struct EncryptedAssertion {
    encrypted: EncryptedElement,
}

impl Encrypted for EncryptedAssertion {
    fn encrypted_element(&self) -> &EncryptedElement {
        &self.encrypted
    }
}

fn container(encrypted_data: &str) -> XmlElement {
    XmlElement::parse(format!(
        "<saml:EncryptedAssertion xmlns:saml=\"urn:oasis:names:tc:SAML:2.0:assertion\">{encrypted_data}</saml:EncryptedAssertion>"
    ))
    .unwrap()
}

#[test]
fn signed_element_survives_aes128_encryption() {
    let signed = signed_assertion();
    let key = SymmetricKey::generate(16).unwrap();
    let aes = EncryptionAlgorithmFactory::new()
        .get_algorithm(algorithm::AES128_CBC, key.into())
        .unwrap();

    let data = encrypt_element(&signed, aes.as_ref()).unwrap();
    let received = EncryptedAssertion {
        encrypted: EncryptedElement::new(container(&data.to_xml())).unwrap(),
    };
    assert!(!received.has_decryption_key());

    let decrypted = received.decrypt(Decryptor::BlockCipher(aes.as_ref())).unwrap();
    assert_eq!(decrypted, signed);
    assert!(SignedElement::new(decrypted).verify(None).is_ok());
}

#[test]
fn session_key_transported_with_rsa_oaep() {
    let transport = KeyTransportAlgorithmFactory::new()
        .get_algorithm(algorithm::RSA_OAEP, certificate().into())
        .unwrap();
    let data = encrypt_with_session_key(&signed_assertion(), algorithm::AES256_GCM, transport.as_ref(), &EncContext::new())
        .unwrap();
    let received = EncryptedAssertion {
        encrypted: EncryptedElement::new(container(&data.to_xml())).unwrap(),
    };
    assert!(received.has_decryption_key());

    let private = KeyTransportAlgorithmFactory::new()
        .get_algorithm(algorithm::RSA_OAEP, private_key().into())
        .unwrap();
    let decrypted = received.decrypt(Decryptor::KeyTransport(private.as_ref())).unwrap();
    assert_eq!(decrypted, signed_assertion());
}

#[test]
fn rsa_pkcs1_transport_is_blacklisted_by_default() {
    assert!(matches!(
        KeyTransportAlgorithmFactory::new().get_algorithm(algorithm::RSA_PKCS1, private_key().into()),
        Err(Error::BlacklistedAlgorithm(_))
    ));

    let factory = KeyTransportAlgorithmFactory::new().with_blacklist(Vec::<String>::new());
    let public = factory.get_algorithm(algorithm::RSA_PKCS1, certificate().into()).unwrap();
    let private = factory.get_algorithm(algorithm::RSA_PKCS1, private_key().into()).unwrap();
    let data = encrypt_with_session_key(&signed_assertion(), algorithm::AES128_CBC, public.as_ref(), &EncContext::new())
        .unwrap();
    let received = EncryptedElement::new(XmlElement::parse(data.to_xml()).unwrap()).unwrap();
    assert_eq!(received.decrypt_element(Decryptor::KeyTransport(private.as_ref())).unwrap(), signed_assertion());
}

#[test]
fn xmlenc11_oaep_parameters_from_encryption_method() {
    let params = OaepParams {
        digest_uri: Some(algorithm::SHA256.into()),
        mgf_uri: Some(algorithm::MGF1_SHA256.into()),
        label: Some(b"solna".to_vec()),
    };
    let public = RsaTransport::with_oaep_params(certificate().into(), algorithm::RSA_OAEP_ENC11, params.clone()).unwrap();
    let mut data = encrypt_with_session_key(&signed_assertion(), algorithm::AES192_CBC, &public, &EncContext::new())
        .unwrap();
    if let Some(key) = data.encrypted_key.as_mut() {
        key.encryption_method = Some(EncryptionMethod {
            digest_method: params.digest_uri.clone(),
            mgf: params.mgf_uri.clone(),
            oaep_params: params.label.clone(),
            ..EncryptionMethod::new(algorithm::RSA_OAEP_ENC11)
        });
    }

    let received = EncryptedElement::new(container(&data.to_xml())).unwrap();
    let declared = received
        .encrypted_data()
        .encrypted_key
        .as_ref()
        .and_then(|k| k.encryption_method.as_ref())
        .unwrap()
        .oaep();
    assert_eq!(declared, params);

    let private = RsaTransport::with_oaep_params(private_key().into(), algorithm::RSA_OAEP_ENC11, declared).unwrap();
    assert_eq!(received.decrypt_element(Decryptor::KeyTransport(&private)).unwrap(), signed_assertion());

    let default_params = RsaTransport::new(private_key().into(), algorithm::RSA_OAEP_ENC11).unwrap();
    assert!(received.decrypt_element(Decryptor::KeyTransport(&default_params)).is_err());
}

#[test]
fn password_derived_key() {
    let params = Pbkdf2Params {
        prf_uri: algorithm::HMAC_SHA256.into(),
        salt: b"NaCl and pepper".to_vec(),
        iteration_count: 1000,
        key_length: 32,
    };
    let key = pbkdf2(b"correct horse battery staple", &params).unwrap();
    let aes = EncryptionAlgorithmFactory::new()
        .get_algorithm(algorithm::AES256_CBC, key.into())
        .unwrap();
    let data = encrypt_element(&XmlElement::parse(ASSERTION).unwrap(), aes.as_ref()).unwrap();

    let again = pbkdf2(b"correct horse battery staple", &params).unwrap();
    let aes: Box<dyn EncryptionAlgorithm> = EncryptionAlgorithmFactory::new()
        .get_algorithm(algorithm::AES256_CBC, again.into())
        .unwrap();
    assert_eq!(aes.decrypt(&data.cipher_value).unwrap(), ASSERTION.as_bytes());
}

#[test]
fn triple_des_is_blacklisted_by_default() {
    let key = SymmetricKey::generate(24).unwrap();
    assert!(matches!(
        EncryptionAlgorithmFactory::new().get_algorithm(algorithm::TRIPLEDES_CBC, key.into()),
        Err(Error::BlacklistedAlgorithm(_))
    ));
}
