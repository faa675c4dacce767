#![forbid(unsafe_code)]

pub use solna_c14n as c14n;
pub use solna_core as core;
pub use solna_crypto as crypto;
pub use solna_dsig as dsig;
pub use solna_enc as enc;
pub use solna_keys as keys;
pub use solna_xml as xml;

pub use solna_core::{Error, ErrorKind, Result};
