//! Conversion of X.509 public keys into SSH cert-authority lines

use crate::error::{Error, Result};
use crate::x509::X509Identity;
use ssh_key::public::{DsaPublicKey, EcdsaPublicKey, Ed25519PublicKey, KeyData, RsaPublicKey};
use ssh_key::{EcdsaCurve, Mpint, PublicKey};
use std::fmt;
use tracing::debug;
use x509_parser::der_parser::asn1_rs::Tag;
use x509_parser::der_parser::der::parse_der_integer;
use x509_parser::prelude::*;

/// Marker option that makes sshd treat the key as a certificate authority
pub const CERT_AUTHORITY: &str = "cert-authority";

const OID_RSA_ENCRYPTION: &str = "1.2.840.113549.1.1.1";
const OID_DSA: &str = "1.2.840.10040.4.1";
const OID_EC_PUBLIC_KEY: &str = "1.2.840.10045.2.1";
const OID_ED25519: &str = "1.3.101.112";

const OID_CURVE_P256: &str = "1.2.840.10045.3.1.7";
const OID_CURVE_P384: &str = "1.3.132.0.34";
const OID_CURVE_P521: &str = "1.3.132.0.35";

/// `cert-authority <type> <base64>` line for an authorized-keys file
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthorizedKeyLine {
    public_key: PublicKey,
    encoded: String,
}

impl AuthorizedKeyLine {
    /// Build the line for `key_data`
    pub fn new(key_data: KeyData) -> Result<Self> {
        let public_key = PublicKey::new(key_data, "");
        let encoded = public_key
            .to_openssh()
            .map_err(|e| Error::key_conversion(e.to_string()))?;

        Ok(AuthorizedKeyLine {
            public_key,
            encoded,
        })
    }

    /// The SSH public key
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// SSH key type, e.g. `ssh-rsa`
    pub fn key_type(&self) -> String {
        self.public_key.algorithm().to_string()
    }

    /// OpenSSH encoding of the key without the cert-authority marker
    pub fn openssh_key(&self) -> &str {
        &self.encoded
    }
}

impl fmt::Display for AuthorizedKeyLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", CERT_AUTHORITY, self.encoded)
    }
}

/// Re-derive the certificate's public key as a cert-authority line
pub fn rederive_key(identity: &X509Identity) -> Result<AuthorizedKeyLine> {
    let key_data = ssh_key_data_from_spki(identity.subject_public_key_info())?;
    let line = AuthorizedKeyLine::new(key_data)?;

    debug!(
        "Converted X.509 public key of '{}' to {}",
        identity.subject(),
        line.key_type()
    );

    Ok(line)
}

/// Convert a DER SubjectPublicKeyInfo into SSH key data
pub fn ssh_key_data_from_spki(spki_der: &[u8]) -> Result<KeyData> {
    let (_, spki) = SubjectPublicKeyInfo::from_der(spki_der)
        .map_err(|e| Error::key_conversion(format!("malformed subject public key info: {}", e)))?;

    let algorithm = spki.algorithm.algorithm.to_id_string();
    match algorithm.as_str() {
        OID_RSA_ENCRYPTION => rsa_key_data(&spki),
        OID_DSA => dsa_key_data(&spki),
        OID_EC_PUBLIC_KEY => ecdsa_key_data(&spki),
        OID_ED25519 => ed25519_key_data(&spki),
        other => Err(Error::key_conversion(format!(
            "unsupported public key algorithm {}",
            other
        ))),
    }
}

fn rsa_key_data(spki: &SubjectPublicKeyInfo<'_>) -> Result<KeyData> {
    let rsa = match spki.parsed() {
        Ok(x509_parser::public_key::PublicKey::RSA(rsa)) => rsa,
        Ok(_) => return Err(Error::key_conversion("RSA key has unexpected structure")),
        Err(e) => return Err(Error::key_conversion(format!("malformed RSA key: {}", e))),
    };

    let e = Mpint::from_positive_bytes(rsa.exponent)
        .map_err(|e| Error::key_conversion(format!("invalid RSA exponent: {}", e)))?;
    let n = Mpint::from_positive_bytes(rsa.modulus)
        .map_err(|e| Error::key_conversion(format!("invalid RSA modulus: {}", e)))?;

    Ok(KeyData::Rsa(RsaPublicKey { e, n }))
}

fn dsa_key_data(spki: &SubjectPublicKeyInfo<'_>) -> Result<KeyData> {
    let y = match spki.parsed() {
        Ok(x509_parser::public_key::PublicKey::DSA(y)) => y,
        Ok(_) => return Err(Error::key_conversion("DSA key has unexpected structure")),
        Err(e) => return Err(Error::key_conversion(format!("malformed DSA key: {}", e))),
    };

    // Dss-Parms ::= SEQUENCE { p INTEGER, q INTEGER, g INTEGER }
    let params = spki
        .algorithm
        .parameters
        .as_ref()
        .filter(|params| params.tag() == Tag::Sequence)
        .ok_or_else(|| Error::key_conversion("DSA key without domain parameters"))?;

    let (rest, p) = dsa_parameter(params.data, "p")?;
    let (rest, q) = dsa_parameter(rest, "q")?;
    let (rest, g) = dsa_parameter(rest, "g")?;
    if !rest.is_empty() {
        return Err(Error::key_conversion("trailing data in DSA parameters"));
    }

    let y = Mpint::from_positive_bytes(y)
        .map_err(|e| Error::key_conversion(format!("invalid DSA public value: {}", e)))?;

    Ok(KeyData::Dsa(DsaPublicKey { p, q, g, y }))
}

fn dsa_parameter<'a>(input: &'a [u8], name: &str) -> Result<(&'a [u8], Mpint)> {
    let (rest, obj) = parse_der_integer(input)
        .map_err(|e| Error::key_conversion(format!("invalid DSA parameter {}: {}", name, e)))?;
    let value = obj
        .as_slice()
        .map_err(|e| Error::key_conversion(format!("invalid DSA parameter {}: {}", name, e)))
        .and_then(|bytes| {
            Mpint::from_positive_bytes(bytes).map_err(|e| {
                Error::key_conversion(format!("invalid DSA parameter {}: {}", name, e))
            })
        })?;

    Ok((rest, value))
}

fn ecdsa_key_data(spki: &SubjectPublicKeyInfo<'_>) -> Result<KeyData> {
    let curve_oid = spki
        .algorithm
        .parameters
        .as_ref()
        .and_then(|params| params.as_oid().ok())
        .map(|oid| oid.to_id_string())
        .ok_or_else(|| Error::key_conversion("EC key without a named curve"))?;

    let curve = match curve_oid.as_str() {
        OID_CURVE_P256 => EcdsaCurve::NistP256,
        OID_CURVE_P384 => EcdsaCurve::NistP384,
        OID_CURVE_P521 => EcdsaCurve::NistP521,
        other => {
            return Err(Error::key_conversion(format!(
                "unsupported elliptic curve {}",
                other
            )))
        }
    };

    let key = EcdsaPublicKey::from_sec1_bytes(spki.subject_public_key.data.as_ref())
        .map_err(|e| Error::key_conversion(format!("invalid EC point: {}", e)))?;

    if key.curve() != curve {
        return Err(Error::key_conversion(format!(
            "EC point does not belong to {}",
            curve.as_str()
        )));
    }

    Ok(KeyData::Ecdsa(key))
}

fn ed25519_key_data(spki: &SubjectPublicKeyInfo<'_>) -> Result<KeyData> {
    let key = Ed25519PublicKey::try_from(spki.subject_public_key.data.as_ref())
        .map_err(|e| Error::key_conversion(format!("invalid Ed25519 key: {}", e)))?;

    Ok(KeyData::Ed25519(key))
}
