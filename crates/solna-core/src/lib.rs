#![forbid(unsafe_code)]

//! Core types for the Solna XML Security library.
//!
//! Holds the error type shared by every crate in the workspace, the
//! algorithm identifier registry and the XML namespace constants.

pub mod algorithm;
pub mod error;
pub mod ns;

pub use error::{Error, ErrorKind, Result};
