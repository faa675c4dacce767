#![forbid(unsafe_code)]

//! Key material loading for the Solna XML Security library.
//!
//! PEM files and bundles, X.509 certificates with cached thumbprints and
//! details, and the `<ds:KeyInfo>` subset carried by signatures.

pub mod keyinfo;
pub mod pem;
pub mod x509;

pub use keyinfo::{EmbeddedCertificate, KeyInfo};
pub use pem::{PemBundle, PemFile};
pub use x509::{CertificateDetails, X509Certificate};
