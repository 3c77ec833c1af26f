//! PDF Digital Signatures module.
//!
//! Signs a document in place during its single write pass. The signature
//! dictionary's `/Contents` and `/ByteRange` values are reserved as
//! fixed-width placeholders, their offsets are tracked while the writer
//! emits them, and once the output is complete the signed byte ranges are
//! streamed to a [`Signer`] and both placeholders are overwritten at the
//! same width.
//!
//! ## Lifecycle
//!
//! ```text
//! Idle ──attach──▶ Sized ──on_before_save──▶ Reserved ──on_after_save──▶ Patched
//!                                               │                          │
//!                                               └──────── error ──▶ Failed ◀┘
//! ```
//!
//! ## Signature Types Supported
//!
//! - PKCS#7 detached signatures (adbe.pkcs7.detached), produced by
//!   `CmsSigner` with a SHA-256, SHA-384 or SHA-512 digest
//! - PAdES signatures (ETSI.CAdES.detached), declared by a [`Signer`] that
//!   builds its own CAdES blob
//!
//! ## Example
//!
//! ```ignore
//! use pdf_inplace_sign::signatures::{CmsSigner, SignOptions};
//! use pdf_inplace_sign::writer::{PdfWriter, SignatureField};
//!
//! let signer = CmsSigner::from_pem(&cert_pem, &key_pem)?;
//! let mut writer = PdfWriter::new();
//! writer.add_letter_page().finish();
//! writer.add_signature_field(SignatureField::new("Signature1"))?;
//! writer.sign_to_file("signed.pdf", signer, SignOptions::default())?;
//! ```
//!
//! ## PDF Specification Reference
//!
//! - ISO 32000-1:2008 Section 12.8 - Digital Signatures
//! - ETSI TS 102 778 - PAdES
//!
//! The CMS signer requires the `signatures` feature to be enabled.

mod byterange;
mod orchestrator;
mod ranged_view;
mod signer;
mod tracker;
mod types;

pub use byterange::{bytes_to_hex, contents_width, render_contents, ByteRangeDescriptor};
pub use orchestrator::SignatureOrchestrator;
pub use ranged_view::{ByteSpan, RangedByteView};
#[cfg(feature = "signatures")]
pub use signer::CmsSigner;
pub use signer::{signing_error, FnSigner, Signer};
pub use tracker::PositionTracker;
pub use types::{
    format_pdf_date, DigestAlgorithm, SignOptions, SignatureMetadata, SignatureSubFilter,
    SigningState,
};
