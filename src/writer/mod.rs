//! PDF writing module.
//!
//! Produces a complete document in a single forward pass and hands out
//! fixed-width placeholders whose offsets are reported while they are written.
//!
//! ## Architecture
//!
//! ```text
//! [PdfWriter] (pages, signature field, save lifecycle)
//!     ↓  SaveHook::on_before_save → PlaceholderFactory
//! [ContentStreamBuilder] (page and appearance content bytes)
//!     ↓
//! [ObjectSerializer] → CountingWriter (offsets, WriteObserver notifications)
//!     ↓  SaveHook::on_after_save → OutputHandle
//! PDF bytes, patched in place
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use pdf_inplace_sign::writer::{PdfWriter, SignatureField};
//!
//! let mut writer = PdfWriter::new();
//! writer.add_letter_page().add_text("Contract", 72.0, 720.0, "Helvetica", 12.0);
//! writer.add_signature_field(SignatureField::new("Signature1"))?;
//! let signed = writer.sign_to_vec(signer, SignOptions::default())?;
//! ```

mod appearance;
mod content_stream;
mod object_serializer;
mod output;
mod pdf_writer;
mod placeholder;

pub use appearance::{AppearanceHandler, DefaultAppearance, APPEARANCE_FONT};
pub use content_stream::{ContentStreamBuilder, ContentStreamOp};
pub use object_serializer::ObjectSerializer;
pub use output::{CountingWriter, PositionedWrite};
pub use pdf_writer::{
    OutputHandle, PageBuilder, PdfWriter, PdfWriterConfig, SaveHook, SignatureField,
};
pub use placeholder::{
    integer_array_width, PlaceholderFactory, PlaceholderField, PlaceholderKind, WriteObserver,
    WritePhase,
};
