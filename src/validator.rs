//! End-to-end certificate validation pipeline

use crate::authorized_key::{rederive_key, AuthorizedKeyLine};
use crate::error::Result;
use crate::identity::{match_identity, RequestedIdentity};
use crate::ssh_cert::{decode_certificate, CertificateType};
use crate::trust_root::{verify_chain, VerificationMode};
use crate::x509::extract_identity;
use tracing::{debug, info, warn};

/// Validates SSH certificates carrying an embedded X.509 identity
///
/// The validator holds configuration only. Each call to [`validate`]
/// decodes, extracts, verifies, matches and converts one certificate, and
/// stops at the first failing stage.
///
/// [`validate`]: CertificateValidator::validate
#[derive(Clone, Debug)]
pub struct CertificateValidator {
    certificate_type: CertificateType,
    mode: VerificationMode,
}

impl CertificateValidator {
    /// Create a validator with the given trust decision
    pub fn new(mode: VerificationMode) -> Self {
        if !mode.is_verified() {
            warn!("Certificate validator created without a trust root; X.509 chains will not be verified");
        }

        CertificateValidator {
            certificate_type: CertificateType::default(),
            mode,
        }
    }

    /// Accept certificates of a different SSH certificate format
    pub fn with_certificate_type(mut self, certificate_type: CertificateType) -> Self {
        self.certificate_type = certificate_type;
        self
    }

    /// SSH certificate format expected by this validator
    pub fn certificate_type(&self) -> CertificateType {
        self.certificate_type
    }

    /// Trust decision applied to the embedded X.509 certificate
    pub fn mode(&self) -> &VerificationMode {
        &self.mode
    }

    /// Validate `blob` for `requested` and produce the cert-authority line
    pub fn validate(
        &self,
        blob: &str,
        requested: impl Into<RequestedIdentity>,
    ) -> Result<AuthorizedKeyLine> {
        run_pipeline(blob, &requested.into(), self.certificate_type, &self.mode)
    }
}

/// Validate with the default certificate format
pub fn validate_certificate(
    blob: &str,
    requested: &str,
    mode: &VerificationMode,
) -> Result<AuthorizedKeyLine> {
    run_pipeline(
        blob,
        &RequestedIdentity::new(requested),
        CertificateType::default(),
        mode,
    )
}

fn run_pipeline(
    blob: &str,
    requested: &RequestedIdentity,
    certificate_type: CertificateType,
    mode: &VerificationMode,
) -> Result<AuthorizedKeyLine> {
    let certificate = decode_certificate(blob, certificate_type)?;
    let identity = extract_identity(&certificate)?;

    verify_chain(&identity, mode)?;
    debug!(
        "X.509 certificate '{}' accepted (chain verified: {})",
        identity.subject(),
        mode.is_verified()
    );

    match_identity(&identity, requested)?;
    let line = rederive_key(&identity)?;

    info!(
        "Issued cert-authority {} key for '{}'",
        line.key_type(),
        requested
    );

    Ok(line)
}
