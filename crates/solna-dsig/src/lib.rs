#![forbid(unsafe_code)]

//! Enveloped XML Digital Signature (XML-DSig).
//!
//! [`SignableElement`] signs an element with one same-document Reference;
//! [`SignedElement`] verifies one and hands back the canonical, verified
//! element.

pub mod context;
pub mod sign;
pub mod signature;
pub mod transform;
pub mod verify;

pub use context::DsigContext;
pub use sign::{Signable, SignableElement};
pub use signature::{Reference, Signature, SignedInfo, Transform};
pub use verify::{Signed, SignedElement, Verified};
