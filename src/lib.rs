// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::type_complexity)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::should_implement_trait)]
// Allow unused for tests
#![cfg_attr(test, allow(dead_code))]

//! # PDF In-Place Sign
//!
//! Sign PDF documents during a single write pass, without re-serializing.
//!
//! ## Core Features
//!
//! - **Fixed-width placeholders**: `/Contents` and `/ByteRange` are reserved
//!   at a width measured from a probe signature, so patching never shifts a byte
//! - **Position tracking**: placeholders report their exact offsets while the
//!   serializer writes them
//! - **Ranged views**: the signer reads the document minus the `/Contents`
//!   value as one contiguous stream, without copying
//! - **Pluggable signers**: any [`signatures::Signer`] works, including a
//!   CMS/PKCS#7 detached signer behind the `signatures` feature
//! - **Visible signatures**: optional widget appearance with a default
//!   "Digitally signed by" block or a custom drawing handler
//!
//! ## Quick Start
//!
//! ```
//! use pdf_inplace_sign::signatures::{FnSigner, SignOptions};
//! use pdf_inplace_sign::writer::{PdfWriter, SignatureField};
//!
//! # fn main() -> pdf_inplace_sign::Result<()> {
//! let signer = FnSigner::new(|data: &[u8]| Ok(vec![data.len() as u8; 4]));
//!
//! let mut writer = PdfWriter::new();
//! writer.add_letter_page().add_text("Hello", 72.0, 720.0, "Helvetica", 12.0);
//! writer.add_signature_field(SignatureField::new("Signature1"))?;
//!
//! let signed = writer.sign_to_vec(signer, SignOptions::default())?;
//! assert!(signed.starts_with(b"%PDF-1.7"));
//! # Ok(())
//! # }
//! ```
//!
//! ## License
//!
//! Licensed under either of:
//!
//! * Apache License, Version 2.0 ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
//! * MIT license ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)
//!
//! at your option.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Error handling
pub mod error;

// PDF object model
pub mod object;

// Widget placement
pub mod geometry;

// PDF writing with tracked placeholders
pub mod writer;

// In-place signing
pub mod signatures;

// Re-exports
pub use error::{Error, Result};

// Version info
/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
