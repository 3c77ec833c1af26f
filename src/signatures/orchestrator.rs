//! Signature placeholder lifecycle.
//!
//! [`SignatureOrchestrator`] sizes the signature once, reserves the
//! `/Contents` and `/ByteRange` placeholders before the document is
//! serialized, and after the single serialization pass signs everything but
//! the Contents value and patches both placeholders in place.
//!
//! ```text
//! Idle -> Sized -> Reserved -> Tracking -> Patched
//!                                      \-> Failed
//! ```
//!
//! A patched orchestrator can start another save cycle with the cached size.

use super::byterange::{contents_width, render_contents, ByteRangeDescriptor};
use super::signer::Signer;
use super::tracker::PositionTracker;
use super::types::{SignOptions, SigningState};
use crate::error::{Error, Result};
use crate::writer::{OutputHandle, PlaceholderFactory, SaveHook};
use std::io::{self, Read, Seek, SeekFrom, Write};

/// Number of integers in a ByteRange array.
const BYTE_RANGE_ENTRIES: usize = 4;

/// Coordinates sizing, reservation, signing and patching for one signer.
#[derive(Debug)]
pub struct SignatureOrchestrator<S> {
    signer: S,
    options: SignOptions,
    state: SigningState,
    contents_width: Option<usize>,
    contents: Option<PositionTracker>,
    byte_range: Option<PositionTracker>,
    last_byte_range: Option<ByteRangeDescriptor>,
}

impl<S: Signer> SignatureOrchestrator<S> {
    /// Create an orchestrator in the `Idle` state.
    pub fn new(signer: S, options: SignOptions) -> Self {
        Self {
            signer,
            options,
            state: SigningState::Idle,
            contents_width: None,
            contents: None,
            byte_range: None,
            last_byte_range: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SigningState {
        self.state
    }

    /// Reserved Contents width in bytes, once sized.
    pub fn contents_width(&self) -> Option<usize> {
        self.contents_width
    }

    /// Reserved ByteRange width in bytes.
    pub fn byte_range_width(&self) -> usize {
        crate::writer::integer_array_width(BYTE_RANGE_ENTRIES, self.options.byte_range_digits)
    }

    /// Descriptor written by the last successful save.
    pub fn last_byte_range(&self) -> Option<ByteRangeDescriptor> {
        self.last_byte_range
    }

    /// Options in use.
    pub fn options(&self) -> &SignOptions {
        &self.options
    }

    /// The wrapped signer.
    pub fn signer(&self) -> &S {
        &self.signer
    }

    /// Size the Contents placeholder by signing the probe payload once.
    ///
    /// The width is cached; later calls return it without signing again.
    pub fn attach(&mut self) -> Result<usize> {
        if self.state == SigningState::Failed {
            return Err(Error::InvalidState {
                expected: "any state but Failed".to_string(),
                found: self.state.to_string(),
            });
        }
        if let Some(width) = self.contents_width {
            return Ok(width);
        }
        self.expect_state(&[SigningState::Idle], "Idle")?;

        if let Err(e) = self.options.validate() {
            self.fail();
            return Err(Error::Sizing(Box::new(e)));
        }

        let mut probe = self.options.probe_payload.as_slice();
        let probe_len = match self.signer.sign(&mut probe) {
            Ok(sig) if sig.is_empty() => {
                self.fail();
                return Err(Error::Sizing(Box::new(Error::Signing(
                    "probe signature is empty".to_string(),
                ))));
            },
            Ok(sig) => sig.len(),
            Err(e) => {
                self.fail();
                return Err(Error::Sizing(Box::new(e)));
            },
        };

        let sized = probe_len
            .checked_add(self.options.extra_reserve)
            .ok_or_else(|| {
                Error::Unsupported(format!(
                    "Probe signature of {} bytes plus {} reserved bytes overflows",
                    probe_len, self.options.extra_reserve
                ))
            })
            .and_then(contents_width);
        let width = match sized {
            Ok(width) => width,
            Err(e) => {
                self.fail();
                return Err(Error::Sizing(Box::new(e)));
            },
        };
        log::info!(
            "Probe signature is {} bytes, reserving {} bytes for /Contents",
            probe_len,
            width
        );
        self.contents_width = Some(width);
        self.transition(SigningState::Sized);
        Ok(width)
    }

    /// Reserve both placeholders in the document and start tracking them.
    pub fn on_before_save(&mut self, document: &mut dyn PlaceholderFactory) -> Result<()> {
        if self.state == SigningState::Idle {
            self.attach()?;
        }
        self.expect_state(&[SigningState::Sized, SigningState::Patched], "Sized or Patched")?;

        let width = self.contents_width.ok_or_else(|| Error::InvalidState {
            expected: "sized Contents width".to_string(),
            found: self.state.to_string(),
        })?;

        let fields = document.create_hex_placeholder(width).and_then(|contents| {
            document
                .create_integer_array_placeholder(BYTE_RANGE_ENTRIES, self.options.byte_range_digits)
                .map(|byte_range| (contents, byte_range))
        });
        let (contents, byte_range) = match fields {
            Ok(fields) => fields,
            Err(e) => {
                self.fail();
                return Err(e);
            },
        };

        self.contents = Some(PositionTracker::attach("Contents", &contents));
        self.byte_range = Some(PositionTracker::attach("ByteRange", &byte_range));
        self.last_byte_range = None;
        self.transition(SigningState::Reserved);
        Ok(())
    }

    /// Sign the serialized output and patch both placeholders in place.
    ///
    /// On any error nothing has been written to `output`; the orchestrator
    /// is left `Failed` and the output must be discarded.
    pub fn on_after_save<O>(&mut self, output: &mut O) -> Result<ByteRangeDescriptor>
    where
        O: Read + Write + Seek + ?Sized,
    {
        self.expect_state(&[SigningState::Reserved], "Reserved")?;
        self.transition(SigningState::Tracking);

        match self.patch(output) {
            Ok(descriptor) => {
                self.last_byte_range = Some(descriptor);
                self.transition(SigningState::Patched);
                Ok(descriptor)
            },
            Err(e) => {
                log::warn!("Signing aborted: {}", e);
                self.fail();
                Err(e)
            },
        }
    }

    fn patch<O>(&mut self, output: &mut O) -> Result<ByteRangeDescriptor>
    where
        O: Read + Write + Seek + ?Sized,
    {
        let contents = self.contents.take().ok_or_else(|| Error::UnresolvedPosition {
            item: "Contents".to_string(),
            reason: "no tracker attached".to_string(),
        })?;
        let byte_range = self.byte_range.take().ok_or_else(|| Error::UnresolvedPosition {
            item: "ByteRange".to_string(),
            reason: "no tracker attached".to_string(),
        })?;

        let (contents_start, contents_end) = contents.span()?;
        let (range_start, range_end) = byte_range.span()?;
        if range_start < contents_end && contents_start < range_end {
            return Err(Error::MalformedRangeView(format!(
                "ByteRange at {}..{} overlaps Contents at {}..{}",
                range_start, range_end, contents_start, contents_end
            )));
        }

        let total_length = output.seek(SeekFrom::End(0))?;
        let descriptor = ByteRangeDescriptor::new(contents_start, contents_end, total_length)?;
        let range_bytes = descriptor.render(byte_range.width())?;
        log::debug!("ByteRange {:?} over {} bytes", descriptor.to_array(), total_length);

        // The ByteRange value is itself signed, so the signer reads it as it
        // will be written.
        let signature = {
            let pending = PendingPatch::new(&mut *output, range_start, &range_bytes);
            let mut view = descriptor.signed_view(pending)?;
            self.signer.sign(&mut view)?
        };
        let contents_bytes = render_contents(&signature, contents.width())?;
        log::debug!(
            "Signature is {} bytes, {} of {} Contents bytes used",
            signature.len(),
            signature.len() * 2 + 2,
            contents.width()
        );

        output.seek(SeekFrom::Start(range_start))?;
        output.write_all(&range_bytes)?;
        output.seek(SeekFrom::Start(contents_start))?;
        output.write_all(&contents_bytes)?;
        output.flush()?;

        let patched_length = output.seek(SeekFrom::End(0))?;
        if patched_length != total_length {
            return Err(Error::InvalidPdf(format!(
                "Output length changed from {} to {} while patching",
                total_length, patched_length
            )));
        }

        log::info!("Patched signature at {}..{}", contents_start, contents_end);
        Ok(descriptor)
    }

    fn expect_state(&self, allowed: &[SigningState], expected: &str) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(Error::InvalidState {
                expected: expected.to_string(),
                found: self.state.to_string(),
            })
        }
    }

    fn transition(&mut self, next: SigningState) {
        log::debug!("Signature state {} -> {}", self.state, next);
        self.state = next;
    }

    fn fail(&mut self) {
        self.contents = None;
        self.byte_range = None;
        self.transition(SigningState::Failed);
    }
}

impl<S: Signer> SaveHook for SignatureOrchestrator<S> {
    fn on_before_save(&mut self, document: &mut dyn PlaceholderFactory) -> Result<()> {
        SignatureOrchestrator::on_before_save(self, document)
    }

    fn on_after_save(&mut self, output: &mut dyn OutputHandle) -> Result<()> {
        SignatureOrchestrator::on_after_save(self, output).map(|_| ())
    }
}

/// Read-only overlay showing `bytes` at `offset` over an unpatched source.
struct PendingPatch<'a, R: ?Sized> {
    inner: &'a mut R,
    offset: u64,
    bytes: &'a [u8],
    position: u64,
}

impl<'a, R: Read + Seek + ?Sized> PendingPatch<'a, R> {
    fn new(inner: &'a mut R, offset: u64, bytes: &'a [u8]) -> Self {
        Self {
            inner,
            offset,
            bytes,
            position: 0,
        }
    }
}

impl<R: Read + Seek + ?Sized> Read for PendingPatch<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let patch_end = self.offset + self.bytes.len() as u64;

        if self.position >= self.offset && self.position < patch_end {
            let from = (self.position - self.offset) as usize;
            let n = buf.len().min(self.bytes.len() - from);
            buf[..n].copy_from_slice(&self.bytes[from..from + n]);
            self.position += n as u64;
            return Ok(n);
        }

        let limit = if self.position < self.offset {
            buf.len().min((self.offset - self.position) as usize)
        } else {
            buf.len()
        };
        self.inner.seek(SeekFrom::Start(self.position))?;
        let n = self.inner.read(&mut buf[..limit])?;
        self.position += n as u64;
        Ok(n)
    }
}

impl<R: Read + Seek + ?Sized> Seek for PendingPatch<'_, R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(delta) => self.inner.seek(SeekFrom::End(0))?.checked_add_signed(delta),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
        };
        self.position = target.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "seek to a negative position")
        })?;
        Ok(self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Object;
    use crate::signatures::FnSigner;
    use crate::writer::{ObjectSerializer, PlaceholderField};
    use std::cell::{Cell, RefCell};
    use std::io::Cursor;
    use std::rc::Rc;

    /// Minimal document: one dictionary holding whatever placeholders were requested.
    #[derive(Default)]
    struct StubDocument {
        contents: Option<PlaceholderField>,
        byte_range: Option<PlaceholderField>,
    }

    impl PlaceholderFactory for StubDocument {
        fn create_hex_placeholder(&mut self, width: usize) -> Result<PlaceholderField> {
            let field = PlaceholderField::hex(width)?;
            self.contents = Some(field.clone());
            Ok(field)
        }

        fn create_integer_array_placeholder(
            &mut self,
            count: usize,
            max_digits: usize,
        ) -> Result<PlaceholderField> {
            let field = PlaceholderField::integer_array(count, max_digits)?;
            self.byte_range = Some(field.clone());
            Ok(field)
        }
    }

    impl StubDocument {
        fn serialize(&self) -> Cursor<Vec<u8>> {
            let mut entries = vec![("Type", ObjectSerializer::name("Sig"))];
            if let Some(field) = &self.byte_range {
                entries.push(("ByteRange", Object::Placeholder(field.clone())));
            }
            if let Some(field) = &self.contents {
                entries.push(("Contents", Object::Placeholder(field.clone())));
            }
            let mut out = b"%PDF-1.7\n1 0 obj\n".to_vec();
            ObjectSerializer::compact()
                .write_object(&mut out, &ObjectSerializer::dict(entries))
                .unwrap();
            out.extend_from_slice(b"\nendobj\n%%EOF\n");
            Cursor::new(out)
        }
    }

    fn fixed_signer(sig: Vec<u8>) -> FnSigner<impl Fn(&[u8]) -> Result<Vec<u8>>> {
        FnSigner::new(move |_: &[u8]| Ok(sig.clone()))
    }

    #[test]
    fn test_full_cycle_states() {
        let mut orch = SignatureOrchestrator::new(
            fixed_signer(vec![0xDE, 0xAD, 0xBE, 0xEF]),
            SignOptions::default(),
        );
        assert_eq!(orch.state(), SigningState::Idle);

        assert_eq!(orch.attach().unwrap(), 10);
        assert_eq!(orch.state(), SigningState::Sized);

        let mut doc = StubDocument::default();
        orch.on_before_save(&mut doc).unwrap();
        assert_eq!(orch.state(), SigningState::Reserved);

        let mut output = doc.serialize();
        let before_len = output.get_ref().len();
        let desc = orch.on_after_save(&mut output).unwrap();
        assert_eq!(orch.state(), SigningState::Patched);
        assert_eq!(orch.last_byte_range(), Some(desc));

        let bytes = output.into_inner();
        assert_eq!(bytes.len(), before_len);
        assert_eq!(desc.contents_width(), 10);
        assert_eq!(
            &bytes[desc.contents_start as usize..desc.contents_end as usize],
            b"<DEADBEEF>"
        );
        assert_eq!(ByteRangeDescriptor::locate(&bytes).unwrap(), desc);
    }

    #[test]
    fn test_signer_sees_final_byte_range_and_not_contents() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let record = seen.clone();
        let signer = FnSigner::new(move |data: &[u8]| {
            *record.borrow_mut() = data.to_vec();
            Ok(vec![0x11; 8])
        });
        let mut orch = SignatureOrchestrator::new(signer, SignOptions::default());

        let mut doc = StubDocument::default();
        orch.on_before_save(&mut doc).unwrap();
        let mut output = doc.serialize();
        let desc = orch.on_after_save(&mut output).unwrap();

        let bytes = output.into_inner();
        let mut expected = bytes[..desc.contents_start as usize].to_vec();
        expected.extend_from_slice(&bytes[desc.contents_end as usize..]);
        assert_eq!(*seen.borrow(), expected);
        assert!(!seen.borrow().windows(3).any(|w| w == b"<11"));
    }

    #[test]
    fn test_sizing_failure() {
        let signer = FnSigner::new(|_: &[u8]| Err(Error::Signing("no key".to_string())));
        let mut orch = SignatureOrchestrator::new(signer, SignOptions::default());

        let err = orch.attach().unwrap_err();
        assert!(matches!(err, Error::Sizing(ref inner) if matches!(**inner, Error::Signing(_))));
        assert_eq!(orch.state(), SigningState::Failed);
        assert!(orch.contents_width().is_none());
    }

    #[test]
    fn test_sizing_rejects_bad_options() {
        let options = SignOptions::default().with_byte_range_digits(0);
        let mut orch = SignatureOrchestrator::new(fixed_signer(vec![1]), options);
        assert!(matches!(orch.attach(), Err(Error::Sizing(_))));
    }

    #[test]
    fn test_after_save_without_reservation() {
        let mut orch = SignatureOrchestrator::new(fixed_signer(vec![1]), SignOptions::default());
        let mut output = Cursor::new(Vec::new());
        let err = orch.on_after_save(&mut output).unwrap_err();
        assert!(matches!(err, Error::InvalidState { .. }));
    }

    #[test]
    fn test_reserving_twice_rejected() {
        let mut orch = SignatureOrchestrator::new(fixed_signer(vec![1]), SignOptions::default());
        let mut doc = StubDocument::default();
        orch.on_before_save(&mut doc).unwrap();
        assert!(matches!(
            orch.on_before_save(&mut doc),
            Err(Error::InvalidState { .. })
        ));
    }

    #[test]
    fn test_unwritten_placeholders_are_unresolved() {
        let mut orch = SignatureOrchestrator::new(fixed_signer(vec![1]), SignOptions::default());
        let mut doc = StubDocument::default();
        orch.on_before_save(&mut doc).unwrap();

        let mut output = Cursor::new(b"%PDF-1.7\n%%EOF\n".to_vec());
        let err = orch.on_after_save(&mut output).unwrap_err();
        assert!(matches!(err, Error::UnresolvedPosition { .. }));
        assert_eq!(orch.state(), SigningState::Failed);
        assert_eq!(output.into_inner(), b"%PDF-1.7\n%%EOF\n");
    }

    #[test]
    fn test_overflow_leaves_output_untouched() {
        let calls = Cell::new(0);
        let signer = FnSigner::new(move |_: &[u8]| {
            calls.set(calls.get() + 1);
            Ok(vec![0xAA; if calls.get() == 1 { 4 } else { 5 }])
        });
        let mut orch = SignatureOrchestrator::new(signer, SignOptions::default());
        let mut doc = StubDocument::default();
        orch.on_before_save(&mut doc).unwrap();

        let mut output = doc.serialize();
        let unpatched = output.get_ref().clone();
        let err = orch.on_after_save(&mut output).unwrap_err();

        assert!(matches!(
            err,
            Error::PlaceholderOverflow {
                field: "Contents",
                needed: 12,
                reserved: 10
            }
        ));
        assert_eq!(orch.state(), SigningState::Failed);
        assert_eq!(output.into_inner(), unpatched);
    }

    #[test]
    fn test_signing_failure_preserves_error() {
        let calls = Cell::new(0);
        let signer = FnSigner::new(move |_: &[u8]| {
            calls.set(calls.get() + 1);
            if calls.get() == 1 {
                Ok(vec![0; 4])
            } else {
                Err(Error::Signing("certificate revoked".to_string()))
            }
        });
        let mut orch = SignatureOrchestrator::new(signer, SignOptions::default());
        let mut doc = StubDocument::default();
        orch.on_before_save(&mut doc).unwrap();

        let mut output = doc.serialize();
        let unpatched = output.get_ref().clone();
        let err = orch.on_after_save(&mut output).unwrap_err();
        assert_eq!(err.to_string(), "Signing failed: certificate revoked");
        assert_eq!(output.into_inner(), unpatched);
    }

    #[test]
    fn test_size_probed_once_across_saves() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let signer = FnSigner::new(move |_: &[u8]| {
            counter.set(counter.get() + 1);
            Ok(vec![0x55; 6])
        });
        let mut orch = SignatureOrchestrator::new(signer, SignOptions::default());

        let mut widths = Vec::new();
        for _ in 0..2 {
            let mut doc = StubDocument::default();
            orch.on_before_save(&mut doc).unwrap();
            widths.push(doc.contents.as_ref().unwrap().width());
            let mut output = doc.serialize();
            orch.on_after_save(&mut output).unwrap();
        }

        assert_eq!(widths, vec![14, 14]);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_extra_reserve() {
        let options = SignOptions::default().with_extra_reserve(16);
        let mut orch = SignatureOrchestrator::new(fixed_signer(vec![1; 4]), options);
        assert_eq!(orch.attach().unwrap(), 2 * (4 + 16) + 2);
    }

    #[test]
    fn test_huge_extra_reserve_is_a_sizing_error() {
        let options = SignOptions::default().with_extra_reserve(usize::MAX);
        let mut orch = SignatureOrchestrator::new(fixed_signer(vec![1; 4]), options);
        let err = orch.attach().unwrap_err();
        assert!(matches!(err, Error::Sizing(ref inner) if matches!(**inner, Error::Unsupported(_))));
        assert_eq!(orch.state(), SigningState::Failed);

        let options = SignOptions::default().with_extra_reserve(usize::MAX / 2);
        let mut orch = SignatureOrchestrator::new(fixed_signer(vec![1; 4]), options);
        assert!(matches!(orch.attach(), Err(Error::Sizing(_))));
    }

    #[test]
    fn test_failed_orchestrator_does_not_report_cached_width() {
        let mut orch = SignatureOrchestrator::new(fixed_signer(vec![1; 4]), SignOptions::default());
        let mut doc = StubDocument::default();
        orch.on_before_save(&mut doc).unwrap();
        assert_eq!(orch.contents_width(), Some(10));

        let mut output = Cursor::new(Vec::new());
        assert!(orch.on_after_save(&mut output).is_err());
        assert_eq!(orch.state(), SigningState::Failed);
        assert!(matches!(orch.attach(), Err(Error::InvalidState { .. })));
    }

    #[test]
    fn test_byte_range_too_narrow() {
        let options = SignOptions::default().with_byte_range_digits(1);
        let mut orch = SignatureOrchestrator::new(fixed_signer(vec![1; 4]), options);
        let mut doc = StubDocument::default();
        orch.on_before_save(&mut doc).unwrap();

        let mut output = doc.serialize();
        let unpatched = output.get_ref().clone();
        let err = orch.on_after_save(&mut output).unwrap_err();
        assert!(matches!(err, Error::PlaceholderOverflow { field: "ByteRange", .. }));
        assert_eq!(output.into_inner(), unpatched);
    }

    #[test]
    fn test_pending_patch_overlay() {
        let mut source = Cursor::new(b"0123456789".to_vec());
        let mut overlay = PendingPatch::new(&mut source, 3, b"abc");
        let mut out = Vec::new();
        overlay.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"012abc6789");
        assert_eq!(source.into_inner(), b"0123456789");
    }
}
