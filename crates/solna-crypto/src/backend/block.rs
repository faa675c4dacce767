#![forbid(unsafe_code)]

//! Block ciphers: AES-CBC, 3DES-CBC and AES-GCM.
//!
//! CBC output is `IV || ciphertext` with a fresh random IV per call. The
//! plaintext is padded to a whole block with N bytes of value N; on the way
//! back only the final byte is trusted, so ISO 10126 random filler from
//! other producers decrypts too. GCM output is `nonce || ciphertext || tag`
//! with a 12-byte random nonce.

use super::{symmetric_bytes, EncryptionBackend};
use crate::key::Key;
use solna_core::{algorithm, Error, Result};

const GCM_NONCE_LEN: usize = 12;
const GCM_TAG_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    AesCbc,
    AesGcm,
    TripleDesCbc,
}

#[derive(Debug, Clone)]
pub struct BlockCipherBackend {
    mode: Mode,
    key_len: usize,
}

impl BlockCipherBackend {
    pub fn new(algorithm_id: &str) -> Result<Self> {
        let mut backend = Self {
            mode: Mode::AesCbc,
            key_len: 16,
        };
        backend.set_cipher(algorithm_id)?;
        Ok(backend)
    }

    fn block_size(&self) -> usize {
        match self.mode {
            Mode::TripleDesCbc => 8,
            Mode::AesCbc | Mode::AesGcm => 16,
        }
    }

    fn check_key<'k>(&self, key: &'k Key) -> Result<&'k [u8]> {
        let bytes = symmetric_bytes(key, "block cipher")?;
        if bytes.len() != self.key_len {
            return Err(Error::InvalidKey(format!(
                "expected {} byte key, got {}",
                self.key_len,
                bytes.len()
            )));
        }
        Ok(bytes)
    }

    fn cbc_encrypt(&self, key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
        use cbc::cipher::block_padding::NoPadding;
        use cbc::cipher::{BlockEncryptMut, KeyIvInit};

        let block = self.block_size();
        let iv = crate::random::bytes(block)?;
        let mut buf = pad(plaintext, block);
        let buf_len = buf.len();

        macro_rules! do_encrypt {
            ($cipher:ty) => {{
                let enc = cbc::Encryptor::<$cipher>::new_from_slices(key, &iv)
                    .map_err(|e| Error::Crypto(format!("CBC init: {e}")))?;
                enc.encrypt_padded_mut::<NoPadding>(&mut buf, buf_len)
                    .map_err(|e| Error::Crypto(format!("CBC encrypt: {e}")))?;
            }};
        }
        match (self.mode, self.key_len) {
            (Mode::TripleDesCbc, _) => do_encrypt!(des::TdesEde3),
            (_, 16) => do_encrypt!(aes::Aes128),
            (_, 24) => do_encrypt!(aes::Aes192),
            _ => do_encrypt!(aes::Aes256),
        }

        let mut out = iv;
        out.extend_from_slice(&buf);
        Ok(out)
    }

    fn cbc_decrypt(&self, key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
        use cbc::cipher::block_padding::NoPadding;
        use cbc::cipher::{BlockDecryptMut, KeyIvInit};

        let block = self.block_size();
        if data.len() < 2 * block || data.len() % block != 0 {
            return Err(Error::Crypto(format!(
                "CBC ciphertext length {} is not a positive multiple of {block}",
                data.len()
            )));
        }
        let (iv, ciphertext) = data.split_at(block);
        let mut buf = ciphertext.to_vec();

        macro_rules! do_decrypt {
            ($cipher:ty) => {{
                let dec = cbc::Decryptor::<$cipher>::new_from_slices(key, iv)
                    .map_err(|e| Error::Crypto(format!("CBC init: {e}")))?;
                dec.decrypt_padded_mut::<NoPadding>(&mut buf)
                    .map_err(|e| Error::Crypto(format!("CBC decrypt: {e}")))?;
            }};
        }
        match (self.mode, self.key_len) {
            (Mode::TripleDesCbc, _) => do_decrypt!(des::TdesEde3),
            (_, 16) => do_decrypt!(aes::Aes128),
            (_, 24) => do_decrypt!(aes::Aes192),
            _ => do_decrypt!(aes::Aes256),
        }

        unpad(buf, block)
    }

    fn gcm_encrypt(&self, key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
        use aes_gcm::aead::consts::U12;
        use aes_gcm::aead::Aead;
        use aes_gcm::{KeyInit, Nonce};

        let nonce_bytes = crate::random::bytes(GCM_NONCE_LEN)?;
        let nonce = Nonce::from_slice(&nonce_bytes);

        macro_rules! do_encrypt {
            ($aes:ty) => {{
                aes_gcm::AesGcm::<$aes, U12>::new_from_slice(key)
                    .map_err(|e| Error::Crypto(format!("AES-GCM init: {e}")))?
                    .encrypt(nonce, plaintext)
                    .map_err(|e| Error::Crypto(format!("AES-GCM encrypt: {e}")))?
            }};
        }
        let ct = match self.key_len {
            16 => do_encrypt!(aes::Aes128),
            24 => do_encrypt!(aes::Aes192),
            _ => do_encrypt!(aes::Aes256),
        };

        let mut out = nonce_bytes;
        out.extend_from_slice(&ct);
        Ok(out)
    }

    fn gcm_decrypt(&self, key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
        use aes_gcm::aead::consts::U12;
        use aes_gcm::aead::Aead;
        use aes_gcm::{KeyInit, Nonce};

        if data.len() < GCM_NONCE_LEN + GCM_TAG_LEN {
            return Err(Error::Crypto("AES-GCM data too short".into()));
        }
        let (nonce, ct_and_tag) = data.split_at(GCM_NONCE_LEN);
        let nonce = Nonce::from_slice(nonce);

        macro_rules! do_decrypt {
            ($aes:ty) => {{
                aes_gcm::AesGcm::<$aes, U12>::new_from_slice(key)
                    .map_err(|e| Error::Crypto(format!("AES-GCM init: {e}")))?
                    .decrypt(nonce, ct_and_tag)
                    .map_err(|e| Error::Crypto(format!("AES-GCM decrypt: {e}")))
            }};
        }
        match self.key_len {
            16 => do_decrypt!(aes::Aes128),
            24 => do_decrypt!(aes::Aes192),
            _ => do_decrypt!(aes::Aes256),
        }
    }
}

impl EncryptionBackend for BlockCipherBackend {
    fn set_cipher(&mut self, algorithm_id: &str) -> Result<()> {
        let mode = match algorithm_id {
            algorithm::AES128_CBC | algorithm::AES192_CBC | algorithm::AES256_CBC => Mode::AesCbc,
            algorithm::AES128_GCM | algorithm::AES192_GCM | algorithm::AES256_GCM => Mode::AesGcm,
            algorithm::TRIPLEDES_CBC => Mode::TripleDesCbc,
            _ => {
                return Err(Error::InvalidArgument(format!(
                    "unknown block cipher: {algorithm_id}"
                )))
            }
        };
        self.key_len = algorithm::required_key_length(algorithm_id).ok_or_else(|| {
            Error::InvalidArgument(format!("no key length for block cipher: {algorithm_id}"))
        })?;
        self.mode = mode;
        Ok(())
    }

    fn encrypt(&self, key: &Key, plaintext: &[u8]) -> Result<Vec<u8>> {
        let key = self.check_key(key)?;
        match self.mode {
            Mode::AesGcm => self.gcm_encrypt(key, plaintext),
            Mode::AesCbc | Mode::TripleDesCbc => self.cbc_encrypt(key, plaintext),
        }
    }

    fn decrypt(&self, key: &Key, ciphertext: &[u8]) -> Result<Vec<u8>> {
        let key = self.check_key(key)?;
        match self.mode {
            Mode::AesGcm => self.gcm_decrypt(key, ciphertext),
            Mode::AesCbc | Mode::TripleDesCbc => self.cbc_decrypt(key, ciphertext),
        }
    }

    fn clone_box(&self) -> Box<dyn EncryptionBackend> {
        Box::new(self.clone())
    }
}

/// Pad to a whole number of blocks; always adds 1..=block bytes.
fn pad(data: &[u8], block: usize) -> Vec<u8> {
    let pad_len = block - data.len() % block;
    let mut padded = Vec::with_capacity(data.len() + pad_len);
    padded.extend_from_slice(data);
    padded.resize(data.len() + pad_len, pad_len as u8);
    padded
}

/// Drop the padding announced by the final byte.
fn unpad(mut data: Vec<u8>, block: usize) -> Result<Vec<u8>> {
    let pad_len = data.last().copied().map_or(0, usize::from);
    if pad_len == 0 || pad_len > block || pad_len > data.len() {
        return Err(Error::Crypto("invalid block cipher padding".into()));
    }
    data.truncate(data.len() - pad_len);
    Ok(data)
}
