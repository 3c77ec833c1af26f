//! Signature producers.
//!
//! A [`Signer`] turns the signed byte ranges of a document into an opaque
//! detached signature blob. The orchestrator calls it twice per save cycle
//! at most: once with a small probe payload to size the placeholder, once
//! with the real content.

use super::types::SignatureSubFilter;
use crate::error::{Error, Result};
use std::io::Read;

#[cfg(feature = "signatures")]
pub use cms_signer::CmsSigner;

/// Produces a detached signature over a byte stream.
pub trait Signer {
    /// Sign everything `content` yields.
    fn sign(&self, content: &mut dyn Read) -> Result<Vec<u8>>;

    /// Signature format written as the dictionary's `/SubFilter`.
    fn sub_filter(&self) -> SignatureSubFilter {
        SignatureSubFilter::Pkcs7Detached
    }

    /// Name of the signer, used for `/Name` when the caller sets none.
    fn signer_name(&self) -> Option<String> {
        None
    }
}

impl<S: Signer + ?Sized> Signer for &S {
    fn sign(&self, content: &mut dyn Read) -> Result<Vec<u8>> {
        (**self).sign(content)
    }

    fn sub_filter(&self) -> SignatureSubFilter {
        (**self).sub_filter()
    }

    fn signer_name(&self) -> Option<String> {
        (**self).signer_name()
    }
}

impl<S: Signer + ?Sized> Signer for Box<S> {
    fn sign(&self, content: &mut dyn Read) -> Result<Vec<u8>> {
        (**self).sign(content)
    }

    fn sub_filter(&self) -> SignatureSubFilter {
        (**self).sub_filter()
    }

    fn signer_name(&self) -> Option<String> {
        (**self).signer_name()
    }
}

/// Signer backed by a closure over the complete signed content.
///
/// Useful for external key stores and for tests. The content is buffered
/// in memory before the closure runs.
pub struct FnSigner<F> {
    sign_fn: F,
    sub_filter: SignatureSubFilter,
    name: Option<String>,
}

impl<F> FnSigner<F>
where
    F: Fn(&[u8]) -> Result<Vec<u8>>,
{
    /// Wrap `sign_fn`.
    pub fn new(sign_fn: F) -> Self {
        Self {
            sign_fn,
            sub_filter: SignatureSubFilter::default(),
            name: None,
        }
    }

    /// Report a different sub-filter.
    pub fn with_sub_filter(mut self, sub_filter: SignatureSubFilter) -> Self {
        self.sub_filter = sub_filter;
        self
    }

    /// Report a signer name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl<F> Signer for FnSigner<F>
where
    F: Fn(&[u8]) -> Result<Vec<u8>>,
{
    fn sign(&self, content: &mut dyn Read) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        content.read_to_end(&mut buf)?;
        (self.sign_fn)(&buf)
    }

    fn sub_filter(&self) -> SignatureSubFilter {
        self.sub_filter
    }

    fn signer_name(&self) -> Option<String> {
        self.name.clone()
    }
}

impl<F> std::fmt::Debug for FnSigner<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnSigner")
            .field("sub_filter", &self.sub_filter)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Wrap a failure from a signing backend.
pub fn signing_error(err: impl std::fmt::Display) -> Error {
    Error::Signing(err.to_string())
}

#[cfg(feature = "signatures")]
mod cms_signer {
    use super::{signing_error, Signer};
    use crate::error::{Error, Result};
    use crate::signatures::types::{DigestAlgorithm, SignatureSubFilter};
    use cms::builder::{SignedDataBuilder, SignerInfoBuilder};
    use cms::cert::{CertificateChoices, IssuerAndSerialNumber};
    use cms::signed_data::{EncapsulatedContentInfo, SignerIdentifier};
    use der::asn1::ObjectIdentifier;
    use der::{DecodePem, Encode};
    use rsa::pkcs1v15::SigningKey;
    use rsa::RsaPrivateKey;
    use sha2::{Sha256, Sha384, Sha512};
    use spki::AlgorithmIdentifierOwned;
    use std::io::Read;
    use x509_cert::Certificate;

    /// id-data (RFC 5652)
    const ID_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.1");

    /// SignerInfo plus SignedData for one concrete hash type.
    ///
    /// The hash type parameterizes the RSA key, so each digest gets its own
    /// expansion instead of a generic helper.
    macro_rules! build_signed_data {
        ($signer:expr, $hash:ty, $message_digest:expr) => {{
            let signer: &CmsSigner = $signer;
            let signing_key = SigningKey::<$hash>::new(signer.key.clone());
            let digest_algorithm = signer.digest_algorithm_identifier()?;
            let econtent_info = EncapsulatedContentInfo {
                econtent_type: ID_DATA,
                econtent: None,
            };

            let signer_info = SignerInfoBuilder::new(
                &signing_key,
                signer.signer_identifier(),
                digest_algorithm.clone(),
                &econtent_info,
                Some($message_digest),
            )
            .map_err(signing_error)?;

            let mut builder = SignedDataBuilder::new(&econtent_info);
            builder
                .add_digest_algorithm(digest_algorithm)
                .map_err(signing_error)?;
            builder
                .add_certificate(CertificateChoices::Certificate(signer.certificate.clone()))
                .map_err(signing_error)?;
            for cert in &signer.chain {
                builder
                    .add_certificate(CertificateChoices::Certificate(cert.clone()))
                    .map_err(signing_error)?;
            }
            builder
                .add_signer_info::<SigningKey<$hash>, rsa::pkcs1v15::Signature>(signer_info)
                .map_err(signing_error)?;

            let content_info = builder.build().map_err(signing_error)?;
            content_info.to_der().map_err(signing_error)
        }};
    }

    /// Detached CMS SignedData signer (`adbe.pkcs7.detached`).
    ///
    /// Signs with RSA PKCS#1 v1.5 over a SHA-2 digest (SHA-256 unless set
    /// with [`CmsSigner::with_digest`]) and embeds the signer certificate
    /// plus any chain certificates.
    #[derive(Debug, Clone)]
    pub struct CmsSigner {
        key: RsaPrivateKey,
        certificate: Certificate,
        chain: Vec<Certificate>,
        digest: DigestAlgorithm,
        name: Option<String>,
    }

    impl CmsSigner {
        /// Create a signer from a key and its certificate.
        pub fn new(key: RsaPrivateKey, certificate: Certificate) -> Result<Self> {
            let der = certificate.to_der().map_err(signing_error)?;
            let name = common_name(&der);
            log::debug!("Loaded signing certificate for {:?}", name);
            Ok(Self {
                key,
                certificate,
                chain: Vec::new(),
                digest: DigestAlgorithm::default(),
                name,
            })
        }

        /// Load a PEM certificate and a PEM private key (PKCS#8 or PKCS#1).
        pub fn from_pem(cert_pem: &str, key_pem: &str) -> Result<Self> {
            let certificate = Certificate::from_pem(cert_pem.as_bytes()).map_err(|e| {
                Error::Signing(format!("Failed to parse certificate: {}", e))
            })?;
            Self::new(parse_private_key(key_pem)?, certificate)
        }

        /// Embed intermediate certificates after the signer certificate.
        pub fn with_chain(mut self, chain: Vec<Certificate>) -> Self {
            self.chain = chain;
            self
        }

        /// Embed every certificate of a PEM bundle.
        pub fn with_chain_pem(self, chain_pem: &str) -> Result<Self> {
            let chain = Certificate::load_pem_chain(chain_pem.as_bytes())
                .map_err(|e| Error::Signing(format!("Failed to parse chain: {}", e)))?;
            Ok(self.with_chain(chain))
        }

        /// Hash the content and the signed attributes with `digest`.
        pub fn with_digest(mut self, digest: DigestAlgorithm) -> Self {
            self.digest = digest;
            self
        }

        /// The digest algorithm in use.
        pub fn digest(&self) -> DigestAlgorithm {
            self.digest
        }

        /// The signer certificate.
        pub fn certificate(&self) -> &Certificate {
            &self.certificate
        }

        fn digest_algorithm_identifier(&self) -> Result<AlgorithmIdentifierOwned> {
            let oid = ObjectIdentifier::new(self.digest.oid()).map_err(signing_error)?;
            Ok(AlgorithmIdentifierOwned {
                oid,
                parameters: None,
            })
        }

        fn signer_identifier(&self) -> SignerIdentifier {
            let tbs = &self.certificate.tbs_certificate;
            SignerIdentifier::IssuerAndSerialNumber(IssuerAndSerialNumber {
                issuer: tbs.issuer.clone(),
                serial_number: tbs.serial_number.clone(),
            })
        }
    }

    impl Signer for CmsSigner {
        fn sign(&self, content: &mut dyn Read) -> Result<Vec<u8>> {
            let message_digest = self.digest.digest_reader(content)?;
            log::trace!("{} message digest computed", self.digest.name());

            match self.digest {
                DigestAlgorithm::Sha256 => {
                    build_signed_data!(self, Sha256, message_digest.as_slice())
                },
                DigestAlgorithm::Sha384 => {
                    build_signed_data!(self, Sha384, message_digest.as_slice())
                },
                DigestAlgorithm::Sha512 => {
                    build_signed_data!(self, Sha512, message_digest.as_slice())
                },
            }
        }

        fn sub_filter(&self) -> SignatureSubFilter {
            SignatureSubFilter::Pkcs7Detached
        }

        fn signer_name(&self) -> Option<String> {
            self.name.clone()
        }
    }

    fn parse_private_key(key_pem: &str) -> Result<RsaPrivateKey> {
        use pkcs1::DecodeRsaPrivateKey;
        use pkcs8::DecodePrivateKey;

        RsaPrivateKey::from_pkcs8_pem(key_pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(key_pem))
            .map_err(|e| Error::Signing(format!("Failed to parse private key: {}", e)))
    }

    fn common_name(cert_der: &[u8]) -> Option<String> {
        let (_, cert) = x509_parser::parse_x509_certificate(cert_der).ok()?;
        let cn = cert.subject().iter_common_name().next()?;
        cn.as_str().ok().map(str::to_string)
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use cms::content_info::ContentInfo;
        use cms::signed_data::SignedData;
        use der::Decode;

        const CERT_PEM: &str = include_str!("../../tests/fixtures/signer_cert.pem");
        const KEY_PEM: &str = include_str!("../../tests/fixtures/signer_key.pem");

        #[test]
        fn test_from_pem_reads_common_name() {
            let signer = CmsSigner::from_pem(CERT_PEM, KEY_PEM).unwrap();
            assert_eq!(signer.signer_name().as_deref(), Some("Test Signer"));
        }

        #[test]
        fn test_bad_key_is_signing_error() {
            let err = CmsSigner::from_pem(CERT_PEM, "not a key").unwrap_err();
            assert!(matches!(err, Error::Signing(_)));
        }

        #[test]
        fn test_signature_is_detached_signed_data() {
            let signer = CmsSigner::from_pem(CERT_PEM, KEY_PEM).unwrap();
            let mut content: &[u8] = b"hello";
            let der = signer.sign(&mut content).unwrap();

            let content_info = ContentInfo::from_der(&der).unwrap();
            let signed_data: SignedData = content_info.content.decode_as().unwrap();
            assert!(signed_data.encap_content_info.econtent.is_none());
            assert_eq!(signed_data.signer_infos.0.len(), 1);
        }

        #[test]
        fn test_digest_drives_algorithm_identifiers() {
            let signer = CmsSigner::from_pem(CERT_PEM, KEY_PEM)
                .unwrap()
                .with_digest(DigestAlgorithm::Sha384);
            assert_eq!(signer.digest(), DigestAlgorithm::Sha384);
            let mut content: &[u8] = b"hello";
            let der = signer.sign(&mut content).unwrap();

            let content_info = ContentInfo::from_der(&der).unwrap();
            let signed_data: SignedData = content_info.content.decode_as().unwrap();
            let sha384 = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.2");
            assert_eq!(signed_data.digest_algorithms.get(0).unwrap().oid, sha384);
            assert_eq!(signed_data.signer_infos.0.get(0).unwrap().digest_alg.oid, sha384);
        }

        #[test]
        fn test_rsa_signature_length_is_stable() {
            let signer = CmsSigner::from_pem(CERT_PEM, KEY_PEM).unwrap();
            let mut probe: &[u8] = &[0];
            let mut content: &[u8] = &[0x42; 4096];
            let a = signer.sign(&mut probe).unwrap();
            let b = signer.sign(&mut content).unwrap();
            assert_eq!(a.len(), b.len());
        }
    }
}
