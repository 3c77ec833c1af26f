//! Read-only view over disjoint byte spans of a seekable source.
//!
//! The signer hashes a [`RangedByteView`] built over the finished output with
//! the Contents placeholder cut out, so it never sees its own placeholder.
//! Logical offset 0 is the first byte of the first span; spans follow each
//! other with no gap in the logical sequence.

use crate::error::{Error, Result};
use std::io::{self, Read, Seek, SeekFrom};

/// One `(offset, length)` span of the underlying source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteSpan {
    /// Offset of the first byte in the source
    pub offset: u64,
    /// Number of bytes
    pub length: u64,
}

impl ByteSpan {
    /// Create a span.
    pub fn new(offset: u64, length: u64) -> Self {
        Self { offset, length }
    }

    /// Offset right after the last byte.
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.length)
    }

    /// Whether `offset` falls inside this span.
    pub fn contains(&self, offset: u64) -> bool {
        offset >= self.offset && offset < self.end()
    }
}

/// Concatenation of ascending, non-overlapping spans of `R`.
#[derive(Debug)]
pub struct RangedByteView<R> {
    source: R,
    spans: Vec<ByteSpan>,
    /// Logical end (exclusive) of each span, i.e. running length totals
    ends: Vec<u64>,
    position: u64,
    /// Index of the span holding `position`; `spans.len()` at end of view
    cursor: usize,
    /// The source is not positioned at `position` yet
    needs_seek: bool,
}

impl<R: Read + Seek> RangedByteView<R> {
    /// Build a view over `spans` of `source`.
    ///
    /// Spans must be sorted by offset, must not overlap, and must lie inside
    /// the source.
    pub fn new(mut source: R, spans: Vec<ByteSpan>) -> Result<Self> {
        for pair in spans.windows(2) {
            if pair[1].offset < pair[0].end() {
                return Err(Error::OverlappingRanges {
                    previous_end: pair[0].end(),
                    next_offset: pair[1].offset,
                });
            }
        }

        let source_len = source.seek(SeekFrom::End(0))?;
        let mut ends = Vec::with_capacity(spans.len());
        let mut total: u64 = 0;
        for span in &spans {
            if span.offset.checked_add(span.length).is_none() || span.end() > source_len {
                return Err(Error::MalformedRangeView(format!(
                    "span {}+{} exceeds source length {}",
                    span.offset, span.length, source_len
                )));
            }
            total += span.length;
            ends.push(total);
        }

        log::debug!("Ranged view over {} spans, {} bytes", spans.len(), total);

        let mut view = Self {
            source,
            spans,
            ends,
            position: 0,
            cursor: 0,
            needs_seek: true,
        };
        view.cursor = view.span_index(0);
        Ok(view)
    }
}

impl<R> RangedByteView<R> {
    /// Total number of bytes in the view.
    pub fn len(&self) -> u64 {
        self.ends.last().copied().unwrap_or(0)
    }

    /// Whether the view holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current logical position.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// The spans this view stitches together.
    pub fn spans(&self) -> &[ByteSpan] {
        &self.spans
    }

    /// Move to logical `position`.
    ///
    /// A position exactly at the end of a span belongs to the next span;
    /// `position == len()` is end of view.
    pub fn set_position(&mut self, position: u64) -> Result<()> {
        if position > self.len() {
            return Err(Error::MalformedRangeView(format!(
                "position {} is past the end of a {} byte view",
                position,
                self.len()
            )));
        }
        self.position = position;
        self.cursor = self.span_index(position);
        self.needs_seek = true;
        Ok(())
    }

    /// Go back to logical position 0 so the view can be replayed.
    pub fn reset(&mut self) {
        self.position = 0;
        self.cursor = self.span_index(0);
        self.needs_seek = true;
    }

    /// Source offset backing logical `position`, if it is inside the view.
    pub fn source_offset(&self, position: u64) -> Option<u64> {
        let index = self.span_index(position);
        let span = self.spans.get(index)?;
        Some(span.offset + (position - self.logical_start(index)))
    }

    /// Release the underlying source.
    pub fn into_inner(self) -> R {
        self.source
    }

    fn span_index(&self, position: u64) -> usize {
        self.ends.partition_point(|&end| end <= position)
    }

    fn logical_start(&self, index: usize) -> u64 {
        if index == 0 {
            0
        } else {
            self.ends[index - 1]
        }
    }
}

impl<R: Read + Seek> Read for RangedByteView<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;

        while filled < buf.len() && self.cursor < self.spans.len() {
            let span = self.spans[self.cursor];
            let intra = self.position - self.logical_start(self.cursor);
            let remaining = span.length - intra;

            if self.needs_seek {
                self.source.seek(SeekFrom::Start(span.offset + intra))?;
                self.needs_seek = false;
            }

            let want = remaining.min((buf.len() - filled) as u64) as usize;
            let n = self.source.read(&mut buf[filled..filled + want])?;
            if n == 0 {
                if filled > 0 {
                    break;
                }
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("source ended inside span at offset {}", span.offset),
                ));
            }

            filled += n;
            self.position += n as u64;
            if n as u64 == remaining {
                self.cursor = self.span_index(self.position);
                self.needs_seek = true;
            }
        }

        Ok(filled)
    }
}

impl<R: Read + Seek> Seek for RangedByteView<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(delta) => self.len().checked_add_signed(delta),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
        };
        let target = target.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "seek to a negative position")
        })?;
        self.set_position(target)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
        Ok(self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn source(len: u8) -> Cursor<Vec<u8>> {
        Cursor::new((0..len).collect())
    }

    #[test]
    fn test_reads_across_spans() {
        let mut view =
            RangedByteView::new(source(30), vec![ByteSpan::new(0, 3), ByteSpan::new(10, 2)])
                .unwrap();
        assert_eq!(view.len(), 5);

        let mut out = Vec::new();
        view.read_to_end(&mut out).unwrap();
        assert_eq!(out, vec![0, 1, 2, 10, 11]);
    }

    #[test]
    fn test_position_at_span_end_belongs_to_next_span() {
        let mut view =
            RangedByteView::new(source(30), vec![ByteSpan::new(0, 10), ByteSpan::new(20, 5)])
                .unwrap();
        view.set_position(10).unwrap();
        assert_eq!(view.source_offset(10), Some(20));

        let mut buf = [0u8; 5];
        view.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [20, 21, 22, 23, 24]);
    }

    #[test]
    fn test_position_at_view_end() {
        let mut view = RangedByteView::new(source(30), vec![ByteSpan::new(5, 5)]).unwrap();
        view.set_position(5).unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(view.read(&mut buf).unwrap(), 0);
        assert_eq!(view.source_offset(5), None);
    }

    #[test]
    fn test_position_past_end_rejected() {
        let mut view = RangedByteView::new(source(30), vec![ByteSpan::new(5, 5)]).unwrap();
        assert!(matches!(view.set_position(6), Err(Error::MalformedRangeView(_))));
        assert_eq!(view.position(), 0);
    }

    #[test]
    fn test_short_read_at_end() {
        let mut view = RangedByteView::new(source(30), vec![ByteSpan::new(0, 4)]).unwrap();
        view.set_position(2).unwrap();
        let mut buf = [0u8; 10];
        assert_eq!(view.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], &[2, 3]);
    }

    #[test]
    fn test_overlapping_spans_rejected() {
        let err = RangedByteView::new(source(30), vec![ByteSpan::new(0, 10), ByteSpan::new(5, 5)])
            .unwrap_err();
        assert!(matches!(
            err,
            Error::OverlappingRanges {
                previous_end: 10,
                next_offset: 5
            }
        ));
    }

    #[test]
    fn test_unsorted_spans_rejected() {
        let err = RangedByteView::new(source(30), vec![ByteSpan::new(20, 2), ByteSpan::new(0, 2)])
            .unwrap_err();
        assert!(matches!(err, Error::OverlappingRanges { .. }));
    }

    #[test]
    fn test_span_past_source_rejected() {
        let err = RangedByteView::new(source(10), vec![ByteSpan::new(8, 5)]).unwrap_err();
        assert!(matches!(err, Error::MalformedRangeView(_)));
    }

    #[test]
    fn test_adjacent_and_empty_spans() {
        let spans = vec![ByteSpan::new(0, 2), ByteSpan::new(2, 0), ByteSpan::new(2, 2)];
        let mut view = RangedByteView::new(source(10), spans).unwrap();
        let mut out = Vec::new();
        view.read_to_end(&mut out).unwrap();
        assert_eq!(out, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_reset_replays() {
        let mut view =
            RangedByteView::new(source(30), vec![ByteSpan::new(1, 2), ByteSpan::new(7, 2)])
                .unwrap();
        let mut first = Vec::new();
        view.read_to_end(&mut first).unwrap();
        view.reset();
        let mut second = Vec::new();
        view.read_to_end(&mut second).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, vec![1, 2, 7, 8]);
    }

    #[test]
    fn test_seek_whence() {
        let mut view =
            RangedByteView::new(source(30), vec![ByteSpan::new(0, 4), ByteSpan::new(10, 4)])
                .unwrap();
        assert_eq!(view.seek(SeekFrom::End(-1)).unwrap(), 7);
        let mut buf = [0u8; 1];
        view.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [13]);

        assert_eq!(view.seek(SeekFrom::Current(-5)).unwrap(), 3);
        view.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [3]);

        assert!(view.seek(SeekFrom::Current(-10)).is_err());
    }

    #[test]
    fn test_empty_view() {
        let mut view = RangedByteView::new(source(4), Vec::new()).unwrap();
        assert!(view.is_empty());
        let mut out = Vec::new();
        assert_eq!(view.read_to_end(&mut out).unwrap(), 0);
    }
}
