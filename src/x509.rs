//! Embedded X.509 identity extraction

use crate::error::{Error, Result};
use crate::ssh_cert::SshCertificate;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::debug;
use x509_parser::prelude::*;

/// SSH certificate extension that carries the X.509 certificate
pub const X509_EXTENSION: &str = "x509";

/// Base64 transport encoding of the embedded X.509 certificate
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmbeddedX509Payload(String);

impl EmbeddedX509Payload {
    /// Take the payload out of the certificate's extension map
    pub fn from_certificate(cert: &SshCertificate) -> Result<Self> {
        cert.extension(X509_EXTENSION)
            .map(|value| EmbeddedX509Payload(value.to_string()))
            .ok_or_else(|| Error::MissingExtensionError(X509_EXTENSION.to_string()))
    }

    /// Raw transport string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode the padded standard base64 into DER bytes
    pub fn decode(&self) -> Result<Vec<u8>> {
        Ok(STANDARD.decode(&self.0)?)
    }
}

/// Parsed X.509 certificate carried inside an SSH certificate
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct X509Identity {
    der: Vec<u8>,
    subject: String,
    issuer: String,
    common_name: Option<String>,
    serial: String,
    not_before: i64,
    not_after: i64,
    spki: Vec<u8>,
}

impl X509Identity {
    /// Parse a DER encoded certificate
    ///
    /// Trailing bytes after the certificate are rejected.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let (rest, cert) = parse_x509_certificate(der)
            .map_err(|e| Error::x509_parse(e.to_string()))?;

        if !rest.is_empty() {
            return Err(Error::x509_parse(format!(
                "{} trailing bytes after certificate",
                rest.len()
            )));
        }

        // The last CN attribute wins when the subject repeats it
        let common_name = cert
            .subject()
            .iter_common_name()
            .filter_map(|cn| cn.as_str().ok())
            .last()
            .map(str::to_string);

        Ok(X509Identity {
            der: der.to_vec(),
            subject: cert.subject().to_string(),
            issuer: cert.issuer().to_string(),
            common_name,
            serial: cert.raw_serial_as_string(),
            not_before: cert.validity().not_before.timestamp(),
            not_after: cert.validity().not_after.timestamp(),
            spki: cert.public_key().raw.to_vec(),
        })
    }

    /// DER encoding of the certificate
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Subject distinguished name
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Issuer distinguished name
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Subject common name, if present
    pub fn common_name(&self) -> Option<&str> {
        self.common_name.as_deref()
    }

    /// Serial number as colon separated hex
    pub fn serial(&self) -> &str {
        &self.serial
    }

    /// Start of the validity period (Unix seconds)
    pub fn not_before(&self) -> i64 {
        self.not_before
    }

    /// End of the validity period (Unix seconds)
    pub fn not_after(&self) -> i64 {
        self.not_after
    }

    /// DER encoded SubjectPublicKeyInfo
    pub fn subject_public_key_info(&self) -> &[u8] {
        &self.spki
    }
}

/// Pull the X.509 certificate out of a decoded SSH certificate
pub fn extract_identity(cert: &SshCertificate) -> Result<X509Identity> {
    let payload = EmbeddedX509Payload::from_certificate(cert)?;
    let der = payload.decode()?;
    let identity = X509Identity::from_der(&der)?;

    debug!(
        "Extracted X.509 certificate subject='{}' issuer='{}' serial={}",
        identity.subject(),
        identity.issuer(),
        identity.serial()
    );

    Ok(identity)
}
