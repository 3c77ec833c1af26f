//! Digital signature types and data structures.
//!
//! This module defines the options, metadata and state types shared by the
//! signing core.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use std::fmt;
use std::io::{ErrorKind, Read};

use sha2::{Digest, Sha256, Sha384, Sha512};

/// Digest algorithm used for signing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DigestAlgorithm {
    /// SHA-256 (recommended)
    #[default]
    Sha256,
    /// SHA-384
    Sha384,
    /// SHA-512
    Sha512,
}

impl DigestAlgorithm {
    /// Get the name of this algorithm.
    pub fn name(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha256 => "SHA-256",
            DigestAlgorithm::Sha384 => "SHA-384",
            DigestAlgorithm::Sha512 => "SHA-512",
        }
    }

    /// Dotted OID of this algorithm (RFC 5754).
    pub fn oid(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha256 => "2.16.840.1.101.3.4.2.1",
            DigestAlgorithm::Sha384 => "2.16.840.1.101.3.4.2.2",
            DigestAlgorithm::Sha512 => "2.16.840.1.101.3.4.2.3",
        }
    }

    /// Hash everything a reader yields, without buffering it whole.
    pub fn digest_reader(&self, reader: &mut dyn Read) -> Result<Vec<u8>> {
        match self {
            DigestAlgorithm::Sha256 => hash_reader::<Sha256>(reader),
            DigestAlgorithm::Sha384 => hash_reader::<Sha384>(reader),
            DigestAlgorithm::Sha512 => hash_reader::<Sha512>(reader),
        }
    }

    /// Hash an in-memory buffer.
    pub fn digest(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut cursor = data;
        self.digest_reader(&mut cursor)
    }
}

fn hash_reader<D: Digest>(reader: &mut dyn Read) -> Result<Vec<u8>> {
    let mut hasher = D::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_vec())
}

/// Signature sub-filter type (signature format).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignatureSubFilter {
    /// adbe.pkcs7.detached - PKCS#7 detached signature
    #[default]
    Pkcs7Detached,
    /// ETSI.CAdES.detached - PAdES CAdES signature
    CadesDetached,
}

impl SignatureSubFilter {
    /// Get the PDF name for this sub-filter.
    pub fn as_pdf_name(&self) -> &'static str {
        match self {
            SignatureSubFilter::Pkcs7Detached => "adbe.pkcs7.detached",
            SignatureSubFilter::CadesDetached => "ETSI.CAdES.detached",
        }
    }
}

/// Descriptive entries of the signature dictionary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignatureMetadata {
    /// Name of the signer (if different from certificate CN)
    pub name: Option<String>,
    /// Reason for signing
    pub reason: Option<String>,
    /// Location where the document was signed
    pub location: Option<String>,
    /// Contact information
    pub contact_info: Option<String>,
    /// Signing time; the time of serialization when unset
    pub signing_time: Option<DateTime<Utc>>,
}

impl SignatureMetadata {
    /// Set the signer name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the reason for signing.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Set the signing location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Set the contact information.
    pub fn with_contact_info(mut self, contact: impl Into<String>) -> Self {
        self.contact_info = Some(contact.into());
        self
    }

    /// Pin the signing time.
    pub fn with_signing_time(mut self, time: DateTime<Utc>) -> Self {
        self.signing_time = Some(time);
        self
    }
}

/// Format a timestamp as a PDF date string (`D:YYYYMMDDHHmmSS+00'00'`).
pub fn format_pdf_date(time: &DateTime<Utc>) -> String {
    time.format("D:%Y%m%d%H%M%S+00'00'").to_string()
}

/// Options for sizing and patching a signature.
#[derive(Debug, Clone)]
pub struct SignOptions {
    /// Extra bytes reserved on top of the probed signature size
    pub extra_reserve: usize,
    /// Maximum decimal digits per ByteRange integer
    pub byte_range_digits: usize,
    /// Payload signed once to learn the signature size
    pub probe_payload: Vec<u8>,
}

impl Default for SignOptions {
    fn default() -> Self {
        Self {
            extra_reserve: 0,
            byte_range_digits: 10,
            probe_payload: vec![0],
        }
    }
}

impl SignOptions {
    /// Reserve `bytes` more than the probe signature needs.
    pub fn with_extra_reserve(mut self, bytes: usize) -> Self {
        self.extra_reserve = bytes;
        self
    }

    /// Set the maximum digits per ByteRange entry.
    pub fn with_byte_range_digits(mut self, digits: usize) -> Self {
        self.byte_range_digits = digits;
        self
    }

    /// Set the size probe payload.
    pub fn with_probe_payload(mut self, payload: Vec<u8>) -> Self {
        self.probe_payload = payload;
        self
    }

    /// Check option consistency.
    pub fn validate(&self) -> Result<()> {
        if self.byte_range_digits == 0 || self.byte_range_digits > 20 {
            return Err(Error::InvalidPdf(format!(
                "ByteRange digits must be between 1 and 20, got {}",
                self.byte_range_digits
            )));
        }
        Ok(())
    }
}

/// Lifecycle state of a signature orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningState {
    /// No signature size known yet
    Idle,
    /// Placeholder width known and cached
    Sized,
    /// Placeholders created and trackers attached
    Reserved,
    /// Serialization finished, offsets being read
    Tracking,
    /// Signature and byte range written in place
    Patched,
    /// A step failed; the output must be discarded
    Failed,
}

impl fmt::Display for SigningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SigningState::Idle => "Idle",
            SigningState::Sized => "Sized",
            SigningState::Reserved => "Reserved",
            SigningState::Tracking => "Tracking",
            SigningState::Patched => "Patched",
            SigningState::Failed => "Failed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_digest_algorithm_names() {
        assert_eq!(DigestAlgorithm::Sha256.name(), "SHA-256");
        assert_eq!(DigestAlgorithm::Sha512.oid(), "2.16.840.1.101.3.4.2.3");
        assert_eq!(DigestAlgorithm::default(), DigestAlgorithm::Sha256);
    }

    #[test]
    fn test_digest_known_vector() {
        let digest = DigestAlgorithm::Sha256.digest(b"abc").unwrap();
        assert_eq!(digest.len(), 32);
        assert_eq!(&digest[..4], &[0xba, 0x78, 0x16, 0xbf]);
    }

    #[test]
    fn test_digest_reader_matches_buffer() {
        let data = vec![7u8; 200_000];
        let mut reader = std::io::Cursor::new(data.clone());
        let streamed = DigestAlgorithm::Sha512.digest_reader(&mut reader).unwrap();
        assert_eq!(streamed, DigestAlgorithm::Sha512.digest(&data).unwrap());
        assert_eq!(streamed.len(), 64);
    }

    #[test]
    fn test_sub_filter_names() {
        assert_eq!(SignatureSubFilter::Pkcs7Detached.as_pdf_name(), "adbe.pkcs7.detached");
        assert_eq!(SignatureSubFilter::CadesDetached.as_pdf_name(), "ETSI.CAdES.detached");
    }

    #[test]
    fn test_sign_options_default() {
        let opts = SignOptions::default();
        assert_eq!(opts.extra_reserve, 0);
        assert_eq!(opts.byte_range_digits, 10);
        assert_eq!(opts.probe_payload, vec![0]);
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn test_sign_options_validation() {
        assert!(SignOptions::default()
            .with_byte_range_digits(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_metadata_builder() {
        let meta = SignatureMetadata::default()
            .with_reason("Approval")
            .with_location("Berlin");
        assert_eq!(meta.reason.as_deref(), Some("Approval"));
        assert_eq!(meta.location.as_deref(), Some("Berlin"));
        assert!(meta.name.is_none());
    }

    #[test]
    fn test_format_pdf_date() {
        let time = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(format_pdf_date(&time), "D:20240309140507+00'00'");
    }

    #[test]
    fn test_state_display() {
        assert_eq!(SigningState::Patched.to_string(), "Patched");
        assert_eq!(format!("{}", SigningState::Idle), "Idle");
    }
}
