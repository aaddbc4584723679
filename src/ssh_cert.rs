//! SSH certificate decoding

use crate::error::{Error, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ssh_encoding::{Decode, Reader};
use ssh_key::public::KeyData;
use ssh_key::{Certificate, PublicKey};
use std::fmt;
use tracing::{debug, trace};

/// SSH certificate formats accepted by the decoder
///
/// The decoder never guesses the format from the blob; a certificate whose
/// key type is not listed here fails to decode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CertificateType {
    /// `ssh-rsa-cert-v01@openssh.com`
    #[default]
    RsaV01,
}

impl CertificateType {
    /// Key-type token that prefixes the certificate in authorized-key syntax
    pub const fn key_type(&self) -> &'static str {
        match self {
            CertificateType::RsaV01 => "ssh-rsa-cert-v01@openssh.com",
        }
    }

    /// Length-prefixed fields making up the subject key in the wire format
    const fn public_key_fields(&self) -> usize {
        match self {
            // e, n
            CertificateType::RsaV01 => 2,
        }
    }
}

impl fmt::Display for CertificateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key_type())
    }
}

/// A decoded SSH certificate
#[derive(Clone, Debug)]
pub struct SshCertificate {
    certificate_type: CertificateType,
    inner: Certificate,
}

impl SshCertificate {
    /// Format the certificate was decoded as
    pub fn certificate_type(&self) -> CertificateType {
        self.certificate_type
    }

    /// Iterate over the certificate extensions as (name, value) pairs
    pub fn extensions(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner
            .extensions()
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Look up a single extension value
    pub fn extension(&self, name: &str) -> Option<&str> {
        self.extensions()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
    }

    /// CA-assigned key identifier
    pub fn key_id(&self) -> &str {
        self.inner.key_id()
    }

    /// Public key the certificate was issued for
    pub fn public_key(&self) -> &KeyData {
        self.inner.public_key()
    }

    /// Underlying `ssh-key` certificate
    ///
    /// Validity bounds past `MAX_VALIDITY_SECS` have been lowered, so the
    /// certificate's SSH signature no longer covers these bytes.
    pub fn as_certificate(&self) -> &Certificate {
        &self.inner
    }
}

/// Latest validity bound the decoder keeps, 9999-12-31T23:59:59Z
///
/// OpenSSH writes `u64::MAX` for a certificate that never expires. Larger
/// bounds are lowered to this value before the certificate is parsed.
pub const MAX_VALIDITY_SECS: u64 = 253_402_300_799;

/// Decode the base64 body of an SSH certificate line
///
/// `blob` is the certificate without its leading key-type token; anything
/// after the first whitespace is treated as a comment. The SSH signature and
/// validity window are not checked here.
pub fn decode_certificate(blob: &str, certificate_type: CertificateType) -> Result<SshCertificate> {
    let body = blob
        .split_whitespace()
        .next()
        .ok_or_else(|| Error::decode("certificate body is empty"))?;

    let mut raw = STANDARD
        .decode(body)
        .map_err(|e| Error::decode(format!("invalid base64: {}", e)))?;

    if let Ok(Some(offset)) = validity_offset(&raw, certificate_type) {
        clamp_validity(&mut raw[offset..]);
    }

    let inner = match Certificate::from_bytes(&raw) {
        Ok(inner) => inner,
        Err(e) => {
            return match PublicKey::from_bytes(&raw) {
                Ok(key) => Err(Error::TypeMismatchError(key.algorithm().to_string())),
                Err(_) => Err(Error::decode(e.to_string())),
            }
        }
    };

    let found = inner.algorithm().to_certificate_type();
    if found != certificate_type.key_type() {
        return Err(Error::decode(format!(
            "expected {} but found {}",
            certificate_type, found
        )));
    }

    debug!(
        "Decoded {} certificate with key id '{}'",
        certificate_type,
        inner.key_id()
    );

    Ok(SshCertificate {
        certificate_type,
        inner,
    })
}

/// Offset of `valid_after` in a raw certificate of `certificate_type`
///
/// `None` when the blob is some other key or certificate type.
fn validity_offset(
    raw: &[u8],
    certificate_type: CertificateType,
) -> ssh_encoding::Result<Option<usize>> {
    let mut reader = raw;
    if String::decode(&mut reader)? != certificate_type.key_type() {
        return Ok(None);
    }

    // nonce, then the subject key
    for _ in 0..=certificate_type.public_key_fields() {
        reader.drain_prefixed()?;
    }
    u64::decode(&mut reader)?; // serial
    u32::decode(&mut reader)?; // user or host
    reader.drain_prefixed()?; // key id
    reader.drain_prefixed()?; // principals

    Ok(Some(raw.len() - reader.remaining_len()))
}

/// Lower `valid_after` and `valid_before` to `MAX_VALIDITY_SECS`
fn clamp_validity(window: &mut [u8]) {
    for bound in window.chunks_exact_mut(8).take(2) {
        let mut secs = [0u8; 8];
        secs.copy_from_slice(bound);
        if u64::from_be_bytes(secs) > MAX_VALIDITY_SECS {
            trace!("Clamping certificate validity bound {:#x}", u64::from_be_bytes(secs));
            bound.copy_from_slice(&MAX_VALIDITY_SECS.to_be_bytes());
        }
    }
}
