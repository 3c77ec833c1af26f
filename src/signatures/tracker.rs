//! Byte offset tracking for serialized placeholders.
//!
//! A [`PositionTracker`] observes one placeholder during one serialization
//! pass. It expects exactly one `BeforeWrite` followed by exactly one
//! `AfterWrite`; anything else leaves it unresolved.

use crate::error::{Error, Result};
use crate::writer::{PlaceholderField, WriteObserver, WritePhase};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Default)]
struct TrackerState {
    start: Option<u64>,
    end: Option<u64>,
    before_writes: u32,
    after_writes: u32,
}

impl WriteObserver for Mutex<TrackerState> {
    fn on_write(&self, phase: WritePhase, position: u64) {
        let mut state = self.lock().unwrap_or_else(PoisonError::into_inner);
        match phase {
            WritePhase::BeforeWrite => {
                state.before_writes += 1;
                state.start = Some(position);
            },
            WritePhase::AfterWrite => {
                state.after_writes += 1;
                state.end = Some(position);
            },
        }
    }
}

/// Records where one placeholder landed in the output.
#[derive(Debug, Clone)]
pub struct PositionTracker {
    item: String,
    width: usize,
    state: Arc<Mutex<TrackerState>>,
}

impl PositionTracker {
    /// Attach a tracker to `field`; `item` names it in error messages.
    pub fn attach(item: impl Into<String>, field: &PlaceholderField) -> Self {
        let state = Arc::new(Mutex::new(TrackerState::default()));
        field.register(state.clone());
        Self {
            item: item.into(),
            width: field.width(),
            state,
        }
    }

    /// Name of the tracked item.
    pub fn item(&self) -> &str {
        &self.item
    }

    /// Width reserved for the tracked placeholder.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Whether both notifications fired exactly once.
    pub fn is_resolved(&self) -> bool {
        self.span().is_ok()
    }

    /// The `(start, end)` offsets of the placeholder.
    ///
    /// `start` is the offset of its first byte, `end` the offset right after
    /// its last byte. For a hex string that first byte is the opening `<`,
    /// not the first hex digit, so `start..end` is exactly the gap a
    /// ByteRange leaves out (ISO 32000-1, 12.8.1).
    pub fn span(&self) -> Result<(u64, u64)> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if state.before_writes != 1 || state.after_writes != 1 {
            return Err(self.unresolved(format!(
                "expected one write, saw {} start and {} end notifications",
                state.before_writes, state.after_writes
            )));
        }

        match (state.start, state.end) {
            (Some(start), Some(end)) if end >= start => {
                let written = (end - start) as usize;
                if written != self.width {
                    return Err(self.unresolved(format!(
                        "{} bytes written where {} were reserved",
                        written, self.width
                    )));
                }
                Ok((start, end))
            },
            (start, end) => {
                Err(self.unresolved(format!("inconsistent offsets {:?}..{:?}", start, end)))
            },
        }
    }

    /// Offset of the first placeholder byte.
    pub fn start(&self) -> Result<u64> {
        self.span().map(|(start, _)| start)
    }

    /// Offset right after the last placeholder byte.
    pub fn end(&self) -> Result<u64> {
        self.span().map(|(_, end)| end)
    }

    fn unresolved(&self, reason: String) -> Error {
        Error::UnresolvedPosition {
            item: self.item.clone(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Object;
    use crate::writer::{CountingWriter, ObjectSerializer};

    fn write_twice_in_array(field: &PlaceholderField) {
        let arr = Object::Array(vec![
            Object::Placeholder(field.clone()),
            Object::Placeholder(field.clone()),
        ]);
        let mut out = CountingWriter::new(Vec::new());
        ObjectSerializer::compact().write_object(&mut out, &arr).unwrap();
    }

    #[test]
    fn test_tracker_records_span() {
        let field = PlaceholderField::hex(10).unwrap();
        let tracker = PositionTracker::attach("Contents", &field);

        let dict = ObjectSerializer::dict(vec![("Contents", Object::Placeholder(field))]);
        let mut out = CountingWriter::with_offset(Vec::new(), 50);
        ObjectSerializer::compact().write_object(&mut out, &dict).unwrap();

        // "<</Contents " is 12 bytes
        assert_eq!(tracker.span().unwrap(), (62, 72));
        assert_eq!(tracker.start().unwrap(), 62);
        assert_eq!(tracker.end().unwrap(), 72);
        assert!(tracker.is_resolved());
    }

    #[test]
    fn test_tracker_read_before_write() {
        let field = PlaceholderField::hex(10).unwrap();
        let tracker = PositionTracker::attach("Contents", &field);

        let err = tracker.span().unwrap_err();
        assert!(matches!(err, Error::UnresolvedPosition { ref item, .. } if item == "Contents"));
        assert!(!tracker.is_resolved());
    }

    #[test]
    fn test_tracker_only_start_fired() {
        let field = PlaceholderField::hex(4).unwrap();
        let tracker = PositionTracker::attach("ByteRange", &field);
        field.notify(WritePhase::BeforeWrite, 10);

        assert!(matches!(tracker.span(), Err(Error::UnresolvedPosition { .. })));
    }

    #[test]
    fn test_tracker_written_twice() {
        let field = PlaceholderField::hex(4).unwrap();
        let tracker = PositionTracker::attach("Contents", &field);
        write_twice_in_array(&field);

        let err = tracker.span().unwrap_err();
        assert!(err.to_string().contains("saw 2 start and 2 end"));
    }

    #[test]
    fn test_tracker_width_mismatch() {
        let field = PlaceholderField::hex(4).unwrap();
        let tracker = PositionTracker::attach("Contents", &field);
        field.notify(WritePhase::BeforeWrite, 10);
        field.notify(WritePhase::AfterWrite, 12);

        assert!(matches!(tracker.span(), Err(Error::UnresolvedPosition { .. })));
    }

    #[test]
    fn test_tracker_end_before_start() {
        let field = PlaceholderField::hex(4).unwrap();
        let tracker = PositionTracker::attach("Contents", &field);
        field.notify(WritePhase::AfterWrite, 10);
        field.notify(WritePhase::BeforeWrite, 14);

        assert!(tracker.span().is_err());
    }
}
