//! Fixed-width placeholder fields.
//!
//! A placeholder is reserved with dummy content during serialization and
//! patched in place afterwards. Its width never changes: the serializer
//! writes exactly [`PlaceholderKind::width`] bytes and reports the output
//! position right before and right after doing so to every registered
//! [`WriteObserver`].

use crate::error::{Error, Result};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Phase of a placeholder write reported to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePhase {
    /// Fired immediately before the first byte of the placeholder is written
    BeforeWrite,
    /// Fired immediately after the last byte of the placeholder is written
    AfterWrite,
}

/// Receiver of placeholder write notifications.
///
/// Notifications are delivered synchronously, in document order, by the
/// thread running the serializer.
pub trait WriteObserver: Send + Sync {
    /// Called with the absolute output position at the given phase.
    fn on_write(&self, phase: WritePhase, position: u64);
}

/// Shape of a placeholder literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderKind {
    /// Hex string `<00...0>`; `width` counts both angle brackets
    Hex {
        /// Total width in bytes
        width: usize,
    },
    /// Integer array `[0 0 0 0    ]` padded so every entry can grow to `max_digits`
    IntegerArray {
        /// Number of integers
        count: usize,
        /// Maximum decimal digits per integer
        max_digits: usize,
    },
}

impl PlaceholderKind {
    /// Width of the literal in bytes.
    pub fn width(&self) -> usize {
        match *self {
            PlaceholderKind::Hex { width } => width,
            PlaceholderKind::IntegerArray { count, max_digits } => {
                integer_array_width(count, max_digits)
            },
        }
    }

    /// Render the dummy content written during serialization.
    pub fn render(&self) -> Vec<u8> {
        match *self {
            PlaceholderKind::Hex { width } => {
                let mut out = Vec::with_capacity(width);
                out.push(b'<');
                out.resize(width - 1, b'0');
                out.push(b'>');
                out
            },
            PlaceholderKind::IntegerArray { count, .. } => {
                let width = self.width();
                let mut out = Vec::with_capacity(width);
                out.push(b'[');
                for i in 0..count {
                    if i > 0 {
                        out.push(b' ');
                    }
                    out.push(b'0');
                }
                out.resize(width - 1, b' ');
                out.push(b']');
                out
            },
        }
    }
}

/// Width of an integer array literal: brackets, separators and digits.
pub fn integer_array_width(count: usize, max_digits: usize) -> usize {
    2 + count * max_digits + count.saturating_sub(1)
}

/// Handle to a placeholder placed in the object graph.
///
/// Clones share the same observer list, so a handle kept by the caller sees
/// the notifications fired for the copy stored inside a dictionary.
#[derive(Clone)]
pub struct PlaceholderField {
    kind: PlaceholderKind,
    observers: Arc<Mutex<Vec<Arc<dyn WriteObserver>>>>,
}

impl PlaceholderField {
    /// Create a placeholder of the given kind.
    pub fn new(kind: PlaceholderKind) -> Result<Self> {
        match kind {
            PlaceholderKind::Hex { width } => {
                if width < 2 || (width - 2) % 2 != 0 {
                    return Err(Error::InvalidPdf(format!(
                        "Hex placeholder width must be 2 plus an even digit count, got {}",
                        width
                    )));
                }
            },
            PlaceholderKind::IntegerArray { count, max_digits } => {
                if count == 0 || max_digits == 0 {
                    return Err(Error::InvalidPdf(format!(
                        "Integer array placeholder needs at least one entry and one digit, got {} x {}",
                        count, max_digits
                    )));
                }
            },
        }
        Ok(Self {
            kind,
            observers: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// Create a hex string placeholder `width` bytes wide (brackets included).
    pub fn hex(width: usize) -> Result<Self> {
        Self::new(PlaceholderKind::Hex { width })
    }

    /// Create an integer array placeholder.
    pub fn integer_array(count: usize, max_digits: usize) -> Result<Self> {
        Self::new(PlaceholderKind::IntegerArray { count, max_digits })
    }

    /// Shape of this placeholder.
    pub fn kind(&self) -> PlaceholderKind {
        self.kind
    }

    /// Width in bytes.
    pub fn width(&self) -> usize {
        self.kind.width()
    }

    /// Register an observer for write notifications.
    pub fn register(&self, observer: Arc<dyn WriteObserver>) {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Deliver a notification to every observer.
    pub(crate) fn notify(&self, phase: WritePhase, position: u64) {
        let observers = self
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for observer in observers {
            observer.on_write(phase, position);
        }
    }
}

impl fmt::Debug for PlaceholderField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaceholderField")
            .field("kind", &self.kind)
            .field("observers", &self.observer_count())
            .finish()
    }
}

impl PartialEq for PlaceholderField {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && Arc::ptr_eq(&self.observers, &other.observers)
    }
}

/// Creation of placeholder fields by the document being signed.
///
/// Implemented by the document collaborator; the returned handles are the
/// same placeholders the document will serialize, so observers registered on
/// them see the real write positions.
pub trait PlaceholderFactory {
    /// Create the signature value placeholder, a hex string `width` bytes wide.
    fn create_hex_placeholder(&mut self, width: usize) -> Result<PlaceholderField>;

    /// Create the byte range placeholder: `count` integers of up to `max_digits` digits.
    fn create_integer_array_placeholder(
        &mut self,
        count: usize,
        max_digits: usize,
    ) -> Result<PlaceholderField>;
}
