//! ByteRange handling for PDF signatures.
//!
//! PDF digital signatures use a ByteRange array to specify which portions
//! of the document are covered by the signature. The signature itself is
//! stored in a placeholder that is excluded from the signed bytes.
//!
//! ## ByteRange Format
//!
//! The ByteRange is an array of four integers:
//! `[offset1, length1, offset2, length2]`
//!
//! Where:
//! - `offset1` = 0 (start of file)
//! - `length1` = byte offset of the `<` opening the signature value
//! - `offset2` = byte offset right after the closing `>`
//! - `length2` = remaining bytes to end of file
//!
//! Both the array and the hex value are written at a fixed width, so
//! patching them never moves another byte of the file.

use super::ranged_view::{ByteSpan, RangedByteView};
use crate::error::{Error, Result};
use lazy_static::lazy_static;
use regex::bytes::Regex;
use serde::Serialize;
use std::io::{Read, Seek};

lazy_static! {
    /// A bare ByteRange array
    static ref RE_ARRAY: Regex =
        Regex::new(r"^\[\s*(\d+)\s+(\d+)\s+(\d+)\s+(\d+)\s*\]").unwrap();

    /// A /ByteRange entry inside a signature dictionary
    static ref RE_BYTE_RANGE: Regex =
        Regex::new(r"/ByteRange\s*\[\s*(\d+)\s+(\d+)\s+(\d+)\s+(\d+)\s*\]").unwrap();
}

/// The two signed spans of a document: everything except the Contents value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ByteRangeDescriptor {
    /// Offset of the `<` opening the Contents value
    pub contents_start: u64,
    /// Offset right after the `>` closing the Contents value
    pub contents_end: u64,
    /// Length of the whole output
    pub total_length: u64,
}

impl ByteRangeDescriptor {
    /// Create a descriptor, checking `contents_start <= contents_end <= total_length`.
    pub fn new(contents_start: u64, contents_end: u64, total_length: u64) -> Result<Self> {
        if contents_start > contents_end || contents_end > total_length {
            return Err(Error::MalformedRangeView(format!(
                "Contents span {}..{} does not fit in {} bytes",
                contents_start, contents_end, total_length
            )));
        }
        Ok(Self {
            contents_start,
            contents_end,
            total_length,
        })
    }

    /// Build a descriptor from a `[offset1 length1 offset2 length2]` array.
    pub fn from_array(values: [u64; 4]) -> Result<Self> {
        let [offset1, length1, offset2, length2] = values;
        if offset1 != 0 {
            return Err(Error::InvalidPdf(format!("ByteRange must start at 0, got {}", offset1)));
        }
        let total = offset2.checked_add(length2).ok_or_else(|| {
            Error::InvalidPdf(format!("ByteRange end overflows: {} + {}", offset2, length2))
        })?;
        if length1 > offset2 {
            return Err(Error::InvalidPdf(format!(
                "ByteRange first range ({}) overlaps with second range start ({})",
                length1, offset2
            )));
        }
        Self::new(length1, offset2, total)
    }

    /// The four ByteRange integers.
    pub fn to_array(&self) -> [u64; 4] {
        [
            0,
            self.contents_start,
            self.contents_end,
            self.total_length - self.contents_end,
        ]
    }

    /// Width of the excluded Contents value.
    pub fn contents_width(&self) -> u64 {
        self.contents_end - self.contents_start
    }

    /// Number of signed bytes.
    pub fn signed_length(&self) -> u64 {
        self.total_length - self.contents_width()
    }

    /// The spans covered by the signature.
    pub fn signed_spans(&self) -> Vec<ByteSpan> {
        vec![
            ByteSpan::new(0, self.contents_start),
            ByteSpan::new(self.contents_end, self.total_length - self.contents_end),
        ]
    }

    /// A view over exactly the bytes a signer must hash.
    pub fn signed_view<R: Read + Seek>(&self, source: R) -> Result<RangedByteView<R>> {
        RangedByteView::new(source, self.signed_spans())
    }

    /// Render the array literal padded with spaces to `width` bytes.
    pub fn render(&self, width: usize) -> Result<Vec<u8>> {
        let [a, b, c, d] = self.to_array();
        let literal = format!("[{} {} {} {}", a, b, c, d);
        let needed = literal.len() + 1;
        if needed > width {
            return Err(Error::PlaceholderOverflow {
                field: "ByteRange",
                needed,
                reserved: width,
            });
        }

        let mut out = Vec::with_capacity(width);
        out.extend_from_slice(literal.as_bytes());
        out.resize(width - 1, b' ');
        out.push(b']');
        Ok(out)
    }

    /// Parse an array literal such as `[0 120 8322 400   ]`.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let caps = RE_ARRAY
            .captures(data)
            .ok_or_else(|| Error::InvalidPdf("Not a ByteRange array".to_string()))?;
        Self::from_array(capture_values(&caps)?)
    }

    /// Find the /ByteRange entry in a saved document.
    ///
    /// Only an array that spans the whole file and whose gap is exactly one
    /// hex string counts, so `/ByteRange` text inside strings or content
    /// streams is ignored.
    pub fn locate(pdf_data: &[u8]) -> Result<Self> {
        let file_size = pdf_data.len() as u64;
        let mut found = RE_BYTE_RANGE
            .captures_iter(pdf_data)
            .filter_map(|caps| Self::from_array(capture_values(&caps).ok()?).ok())
            .filter(|desc| desc.validate(file_size).is_ok() && desc.gap_is_hex_string(pdf_data));

        let descriptor = found
            .next()
            .ok_or_else(|| Error::InvalidPdf("No /ByteRange entry found".to_string()))?;
        if found.next().is_some() {
            return Err(Error::Unsupported("Documents with more than one signature".to_string()));
        }
        Ok(descriptor)
    }

    /// The gap starts with `<`, ends with `>`, and holds nothing but hex digits.
    fn gap_is_hex_string(&self, pdf_data: &[u8]) -> bool {
        let gap = &pdf_data[self.contents_start as usize..self.contents_end as usize];
        match gap {
            [b'<', digits @ .., b'>'] => digits.iter().all(u8::is_ascii_hexdigit),
            _ => false,
        }
    }

    /// Check that the descriptor covers a file of `file_size` bytes.
    ///
    /// A valid ByteRange starts at 0, ends at the file size and leaves only
    /// the signature value uncovered.
    pub fn validate(&self, file_size: u64) -> Result<()> {
        if self.total_length != file_size {
            return Err(Error::InvalidPdf(format!(
                "ByteRange must end at file size {}, got {}",
                file_size, self.total_length
            )));
        }
        if self.contents_width() < 2 {
            return Err(Error::InvalidPdf(format!(
                "ByteRange gap of {} bytes cannot hold a signature value",
                self.contents_width()
            )));
        }
        Ok(())
    }

    /// Decode the hex signature value out of a saved document.
    ///
    /// Returns the full reserved value, including zero padding.
    pub fn extract_contents(&self, pdf_data: &[u8]) -> Result<Vec<u8>> {
        self.validate(pdf_data.len() as u64)?;
        let value = &pdf_data[self.contents_start as usize..self.contents_end as usize];
        if value.first() != Some(&b'<') || value.last() != Some(&b'>') {
            return Err(Error::InvalidPdf("Contents value is not a hex string".to_string()));
        }
        hex_to_bytes(&value[1..value.len() - 1])
    }
}

fn capture_values(caps: &regex::bytes::Captures<'_>) -> Result<[u64; 4]> {
    let mut values = [0u64; 4];
    for (i, slot) in values.iter_mut().enumerate() {
        let text = caps
            .get(i + 1)
            .map(|m| String::from_utf8_lossy(m.as_bytes()))
            .unwrap_or_default();
        *slot = text
            .parse()
            .map_err(|_| Error::InvalidPdf(format!("Bad ByteRange integer: {}", text)))?;
    }
    Ok(values)
}

/// Width of a Contents placeholder for a signature of `signature_len` bytes.
///
/// Each byte becomes 2 hex characters, plus 2 for `<` and `>`.
pub fn contents_width(signature_len: usize) -> Result<usize> {
    signature_len
        .checked_mul(2)
        .and_then(|hex| hex.checked_add(2))
        .ok_or_else(|| {
            Error::Unsupported(format!(
                "Signature of {} bytes does not fit in a hex string",
                signature_len
            ))
        })
}

/// Render a signature as a hex string literal exactly `width` bytes wide.
///
/// The hex digits are right-filled with `0` up to the closing `>`.
pub fn render_contents(signature: &[u8], width: usize) -> Result<Vec<u8>> {
    let needed = contents_width(signature.len())?;
    if needed > width {
        return Err(Error::PlaceholderOverflow {
            field: "Contents",
            needed,
            reserved: width,
        });
    }

    let mut out = Vec::with_capacity(width);
    out.push(b'<');
    out.extend_from_slice(bytes_to_hex(signature).as_bytes());
    out.resize(width - 1, b'0');
    out.push(b'>');
    Ok(out)
}

/// Convert bytes to uppercase hex string.
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    const HEX_CHARS: &[u8] = b"0123456789ABCDEF";
    let mut hex = String::with_capacity(bytes.len() * 2);
    for &byte in bytes {
        hex.push(HEX_CHARS[(byte >> 4) as usize] as char);
        hex.push(HEX_CHARS[(byte & 0x0F) as usize] as char);
    }
    hex
}

fn hex_to_bytes(hex: &[u8]) -> Result<Vec<u8>> {
    fn nibble(c: u8) -> Result<u8> {
        match c {
            b'0'..=b'9' => Ok(c - b'0'),
            b'a'..=b'f' => Ok(c - b'a' + 10),
            b'A'..=b'F' => Ok(c - b'A' + 10),
            _ => Err(Error::InvalidPdf(format!("Invalid hex digit {:?}", c as char))),
        }
    }

    if hex.len() % 2 != 0 {
        return Err(Error::InvalidPdf("Odd number of hex digits".to_string()));
    }
    hex.chunks(2)
        .map(|pair| Ok((nibble(pair[0])? << 4) | nibble(pair[1])?))
        .collect()
}
