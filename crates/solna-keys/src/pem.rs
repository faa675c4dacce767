#![forbid(unsafe_code)]

//! RFC 7468 PEM blocks.

use solna_core::{Error, Result};
use std::fmt;
use std::path::Path;

const BEGIN: &str = "-----BEGIN ";
const END: &str = "-----END ";
const BOUNDARY_TAIL: &str = "-----";

/// One decoded PEM block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PemFile {
    label: String,
    contents: Vec<u8>,
}

impl PemFile {
    pub fn new(label: impl Into<String>, contents: Vec<u8>) -> Self {
        Self {
            label: label.into(),
            contents,
        }
    }

    /// Parse a single PEM block. Text around the block is ignored.
    pub fn parse(text: &str) -> Result<Self> {
        let (start, end) = next_block(text, 0)?
            .ok_or_else(|| Error::Pem("no PEM block found".into()))?;
        Self::decode_block(&text[start..end])
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::parse(&std::fs::read_to_string(path)?)
    }

    fn decode_block(block: &str) -> Result<Self> {
        let (label, contents) =
            pem_rfc7468::decode_vec(block.as_bytes()).map_err(|e| Error::Pem(e.to_string()))?;
        Ok(Self::new(label, contents))
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// The decoded DER bytes.
    pub fn contents(&self) -> &[u8] {
        &self.contents
    }

    pub fn into_contents(self) -> Vec<u8> {
        self.contents
    }
}

/// RFC 7468 output: 64-column base64 body, LF line endings.
impl fmt::Display for PemFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded =
            pem_rfc7468::encode_string(&self.label, pem_rfc7468::LineEnding::LF, &self.contents)
                .map_err(|_| fmt::Error)?;
        f.write_str(&encoded)
    }
}

/// Several PEM blocks read from one source, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PemBundle {
    blocks: Vec<PemFile>,
}

impl PemBundle {
    pub fn parse(text: &str) -> Result<Self> {
        let mut blocks = Vec::new();
        let mut offset = 0;
        while let Some((start, end)) = next_block(text, offset)? {
            blocks.push(PemFile::decode_block(&text[start..end])?);
            offset = end;
        }
        if blocks.is_empty() {
            return Err(Error::Pem("no PEM block found".into()));
        }
        Ok(Self { blocks })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::parse(&std::fs::read_to_string(path)?)
    }

    pub fn blocks(&self) -> &[PemFile] {
        &self.blocks
    }

    /// Blocks carrying `label`, e.g. `CERTIFICATE`.
    pub fn with_label<'a>(&'a self, label: &'a str) -> impl Iterator<Item = &'a PemFile> + 'a {
        self.blocks.iter().filter(move |b| b.label == label)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

impl IntoIterator for PemBundle {
    type Item = PemFile;
    type IntoIter = std::vec::IntoIter<PemFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.into_iter()
    }
}

/// Byte range of the next `BEGIN`..`END` block at or after `offset`.
fn next_block(text: &str, offset: usize) -> Result<Option<(usize, usize)>> {
    let Some(rel) = text[offset..].find(BEGIN) else {
        return Ok(None);
    };
    let start = offset + rel;
    let label_start = start + BEGIN.len();
    let label_len = text[label_start..]
        .find(BOUNDARY_TAIL)
        .ok_or_else(|| Error::Pem("unterminated BEGIN line".into()))?;
    let label = &text[label_start..label_start + label_len];

    let footer = format!("{END}{label}{BOUNDARY_TAIL}");
    let footer_rel = text[start..]
        .find(&footer)
        .ok_or_else(|| Error::Pem(format!("missing END line for {label}")))?;
    Ok(Some((start, start + footer_rel + footer.len())))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CERT: &str = include_str!("../../../test-data/keys/rsa-cert.pem");
    const OTHER: &str = include_str!("../../../test-data/keys/other-cert.pem");

    #[test]
    fn test_parse_and_reencode() {
        let pem = PemFile::parse(CERT).unwrap();
        assert_eq!(pem.label(), "CERTIFICATE");
        assert_eq!(pem.contents()[0], 0x30);
        let text = pem.to_string();
        assert!(text.starts_with("-----BEGIN CERTIFICATE-----\n"));
        assert!(text.lines().all(|l| l.len() <= 64));
        assert_eq!(PemFile::parse(&text).unwrap(), pem);
    }

    #[test]
    fn test_surrounding_text_ignored() {
        let wrapped = format!("subject=CN=signer\n\n{CERT}\ntrailer\n");
        assert_eq!(PemFile::parse(&wrapped).unwrap(), PemFile::parse(CERT).unwrap());
    }

    #[test]
    fn test_bundle() {
        let key = include_str!("../../../test-data/keys/rsa-key.pem");
        let bundle = PemBundle::parse(&format!("{CERT}{key}{OTHER}")).unwrap();
        assert_eq!(bundle.len(), 3);
        assert_eq!(bundle.with_label("CERTIFICATE").count(), 2);
        assert_eq!(bundle.blocks()[1].label(), "PRIVATE KEY");
    }

    #[test]
    fn test_errors() {
        assert!(matches!(PemFile::parse("nothing here"), Err(Error::Pem(_))));
        assert!(matches!(
            PemFile::parse("-----BEGIN CERTIFICATE-----\nAAAA\n"),
            Err(Error::Pem(_))
        ));
        assert!(matches!(PemBundle::parse(""), Err(Error::Pem(_))));
    }
}
