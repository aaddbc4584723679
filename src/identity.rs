//! Requested login identity and subject matching

use crate::error::{Error, Result};
use crate::x509::X509Identity;
use std::fmt;
use tracing::debug;

/// Login name requested by the caller
///
/// Compared byte for byte; no case folding or trimming is applied.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RequestedIdentity(String);

impl RequestedIdentity {
    /// Wrap a login name
    pub fn new(name: impl Into<String>) -> Self {
        RequestedIdentity(name.into())
    }

    /// The login name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestedIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestedIdentity {
    fn from(name: &str) -> Self {
        RequestedIdentity::new(name)
    }
}

impl From<String> for RequestedIdentity {
    fn from(name: String) -> Self {
        RequestedIdentity(name)
    }
}

/// Check that the certificate subject's common name is the requested identity
pub fn match_identity(identity: &X509Identity, requested: &RequestedIdentity) -> Result<()> {
    match_common_name(identity.common_name(), requested)
}

fn match_common_name(common_name: Option<&str>, requested: &RequestedIdentity) -> Result<()> {
    match common_name {
        Some(cn) if cn == requested.as_str() => {
            debug!("Certificate common name matches '{}'", requested);
            Ok(())
        }
        // A subject without a CN never matches, not even an empty request
        observed => Err(Error::IdentityMismatchError {
            common_name: observed.unwrap_or_default().to_string(),
            requested: requested.to_string(),
        }),
    }
}
