#![forbid(unsafe_code)]

//! XML Encryption (XML-Enc).
//!
//! Provides the EncryptedData/EncryptedKey model, helpers that encrypt an
//! element directly or under a transported session key, and decryption
//! with either kind of algorithm.

pub mod context;
pub mod decrypt;
pub mod encrypt;
pub mod model;

pub use context::EncContext;
pub use decrypt::{decrypt_data, Decryptor, Encrypted, EncryptedElement};
pub use encrypt::{encrypt_element, encrypt_with_session_key};
pub use model::{EncryptedData, EncryptedKey, EncryptionMethod};
