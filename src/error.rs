//! Error types for the signing library.
//!
//! This module defines all error types that can occur while reserving,
//! tracking, signing and patching signature placeholders.

/// Result type alias for signing operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during PDF signing.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The size probe signature could not be produced when attaching a signer.
    #[error("Failed to size signature placeholder: {0}")]
    Sizing(#[source] Box<Error>),

    /// Two spans of a ranged view overlap or are out of order.
    #[error("Overlapping byte ranges: span at {next_offset} starts before previous span ends at {previous_end}")]
    OverlappingRanges {
        /// End offset (exclusive) of the earlier span
        previous_end: u64,
        /// Start offset of the offending span
        next_offset: u64,
    },

    /// A ranged view or byte range descriptor is inconsistent with its source.
    #[error("Malformed ranged view: {0}")]
    MalformedRangeView(String),

    /// A position tracker was read before it saw exactly one write of its item.
    #[error("Unresolved position for {item}: {reason}")]
    UnresolvedPosition {
        /// Name of the tracked item
        item: String,
        /// Why the recorded offsets cannot be trusted
        reason: String,
    },

    /// The signer failed to produce a signature.
    #[error("Signing failed: {0}")]
    Signing(String),

    /// A patched value does not fit in the bytes reserved for it.
    #[error("{field} needs {needed} bytes but only {reserved} were reserved")]
    PlaceholderOverflow {
        /// Placeholder that overflowed (`Contents` or `ByteRange`)
        field: &'static str,
        /// Bytes required by the final value
        needed: usize,
        /// Bytes reserved when the placeholder was created
        reserved: usize,
    },

    /// An orchestrator notification arrived out of order.
    #[error("Invalid signing state: expected {expected}, found {found}")]
    InvalidState {
        /// State(s) the operation requires
        expected: String,
        /// State the orchestrator was in
        found: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid PDF structure (generic)
    #[error("Invalid PDF: {0}")]
    InvalidPdf(String),

    /// Unsupported feature
    #[error("Unsupported feature: {0}")]
    Unsupported(String),
}
