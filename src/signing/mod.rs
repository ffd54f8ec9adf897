//! HTTP request signing.
//!
//! # Responsibilities
//! - Build the canonical signing string for a request (see [`canonical`])
//! - Sign and verify with the supported algorithm families
//! - Render and parse the `Signature` authorization header
//!
//! The scheme follows draft-cavage HTTP signatures: the signature covers a
//! canonical string derived from the request target and a fixed header set,
//! and is carried in the `authorization` header together with the key id,
//! algorithm and the ordered list of signed header names.

mod canonical;
mod keys;

pub use canonical::{build_canonical_string, CanonicalString, IGNORED_HEADERS};
pub use keys::{certificate_fingerprint, sign, verify, RequestSigner, SigningKey, VerifyingKey};

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use sha2::{Digest, Sha256};

use crate::error::{ClientError, Result};

/// Header names signed by default, in addition to the `(created)` and
/// `(request-target)` pseudo-headers the canonicalizer always prepends.
pub const DEFAULT_SIGNED_HEADERS: [&str; 2] = ["digest", "content-length"];

/// Supported signature algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    /// HMAC with SHA-256 over a shared symmetric key. Used when no
    /// asymmetric key material is configured.
    HmacSha256,
    /// RSA PKCS#1 v1.5 with SHA-1.
    RsaSha1,
    /// RSA PKCS#1 v1.5 with SHA-256.
    RsaSha256,
    /// RSA PKCS#1 v1.5 with SHA-512.
    RsaSha512,
    /// ECDSA over P-256 with SHA-256.
    EcdsaSha256,
}

impl SignatureAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureAlgorithm::HmacSha256 => "hmac-sha256",
            SignatureAlgorithm::RsaSha1 => "rsa-sha1",
            SignatureAlgorithm::RsaSha256 => "rsa-sha256",
            SignatureAlgorithm::RsaSha512 => "rsa-sha512",
            SignatureAlgorithm::EcdsaSha256 => "ecdsa-sha256",
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "hmac-sha256" => Ok(SignatureAlgorithm::HmacSha256),
            "rsa-sha1" => Ok(SignatureAlgorithm::RsaSha1),
            "rsa-sha256" => Ok(SignatureAlgorithm::RsaSha256),
            "rsa-sha512" => Ok(SignatureAlgorithm::RsaSha512),
            "ecdsa-sha256" => Ok(SignatureAlgorithm::EcdsaSha256),
            other => Err(ClientError::Precondition(format!(
                "unknown signature algorithm '{other}'"
            ))),
        }
    }
}

/// `digest` header value for a request body.
///
/// A body-less request still gets the digest of the empty byte string; the
/// header is never omitted just because the body is empty.
pub fn body_digest(body: &[u8]) -> String {
    format!("SHA-256={}", BASE64.encode(Sha256::digest(body)))
}

/// Contents of a `Signature` authorization header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureParams {
    pub key_id: String,
    pub algorithm: SignatureAlgorithm,
    /// Header names covered by the signature, in canonical order.
    pub headers: Vec<String>,
    /// Raw signature bytes (base64-encoded on the wire).
    pub signature: Vec<u8>,
    /// Signing timestamp, seconds since epoch.
    pub created: u64,
    /// Expiry timestamp, seconds since epoch.
    pub expires: Option<u64>,
}

impl SignatureParams {
    /// Render as an `authorization` header value.
    pub fn to_header_value(&self) -> String {
        let mut value = format!(
            "Signature keyId=\"{}\", algorithm=\"{}\", headers=\"{}\", signature=\"{}\", created={}",
            self.key_id,
            self.algorithm,
            self.headers.join(" "),
            BASE64.encode(&self.signature),
            self.created,
        );
        if let Some(expires) = self.expires {
            value.push_str(&format!(", expires={expires}"));
        }
        value
    }

    /// Parse an `authorization` header value carrying the `Signature` scheme.
    pub fn parse(header: &str) -> Result<Self> {
        let params = header.strip_prefix("Signature ").ok_or_else(|| {
            ClientError::Precondition(
                "authorization header does not carry the Signature scheme".to_string(),
            )
        })?;

        let mut key_id = None;
        let mut algorithm = None;
        let mut headers = None;
        let mut signature = None;
        let mut created = None;
        let mut expires = None;

        for part in params.split(',') {
            let part = part.trim();
            let (name, value) = part.split_once('=').ok_or_else(|| {
                ClientError::Precondition(format!("malformed signature parameter '{part}'"))
            })?;
            let value = value.trim_matches('"');
            match name {
                "keyId" => key_id = Some(value.to_string()),
                "algorithm" => algorithm = Some(value.parse()?),
                "headers" => {
                    headers = Some(value.split(' ').map(str::to_string).collect::<Vec<_>>())
                }
                "signature" => {
                    signature = Some(BASE64.decode(value).map_err(|e| {
                        ClientError::Precondition(format!("signature is not valid base64: {e}"))
                    })?)
                }
                "created" => {
                    created = Some(value.parse().map_err(|_| {
                        ClientError::Precondition(format!("invalid created timestamp '{value}'"))
                    })?)
                }
                "expires" => {
                    expires = Some(value.parse().map_err(|_| {
                        ClientError::Precondition(format!("invalid expires timestamp '{value}'"))
                    })?)
                }
                _ => {}
            }
        }

        let missing =
            |field: &str| ClientError::Precondition(format!("missing signature parameter {field}"));
        Ok(SignatureParams {
            key_id: key_id.ok_or_else(|| missing("keyId"))?,
            algorithm: algorithm.ok_or_else(|| missing("algorithm"))?,
            headers: headers.ok_or_else(|| missing("headers"))?,
            signature: signature.ok_or_else(|| missing("signature"))?,
            created: created.ok_or_else(|| missing("created"))?,
            expires,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_body_digest_matches_empty_string() {
        // SHA-256 of the empty byte string, base64-encoded.
        assert_eq!(
            body_digest(b""),
            "SHA-256=47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU="
        );
        assert_eq!(body_digest(b""), body_digest(&[]));
    }

    #[test]
    fn test_digest_differs_for_distinct_bodies() {
        assert_ne!(body_digest(b"a"), body_digest(b"b"));
    }

    #[test]
    fn test_header_value_round_trip() {
        let params = SignatureParams {
            key_id: "ab12".to_string(),
            algorithm: SignatureAlgorithm::EcdsaSha256,
            headers: vec![
                "(created)".to_string(),
                "(request-target)".to_string(),
                "digest".to_string(),
                "content-length".to_string(),
            ],
            signature: vec![1, 2, 3, 4],
            created: 1234,
            expires: Some(2234),
        };
        let rendered = params.to_header_value();
        assert!(rendered.starts_with("Signature keyId=\"ab12\""));
        assert!(rendered.contains("algorithm=\"ecdsa-sha256\""));
        assert!(rendered.contains("headers=\"(created) (request-target) digest content-length\""));
        assert!(rendered.contains("created=1234"));
        assert!(rendered.ends_with("expires=2234"));
        assert_eq!(SignatureParams::parse(&rendered).unwrap(), params);
    }

    #[test]
    fn test_parse_rejects_other_schemes() {
        assert!(SignatureParams::parse("Bearer abc").is_err());
    }

    #[test]
    fn test_parse_rejects_missing_fields() {
        let err = SignatureParams::parse("Signature keyId=\"a\", created=1").unwrap_err();
        assert!(err.to_string().contains("algorithm"));
    }

    #[test]
    fn test_algorithm_tags() {
        for algorithm in [
            SignatureAlgorithm::HmacSha256,
            SignatureAlgorithm::RsaSha1,
            SignatureAlgorithm::RsaSha256,
            SignatureAlgorithm::RsaSha512,
            SignatureAlgorithm::EcdsaSha256,
        ] {
            assert_eq!(
                algorithm.as_str().parse::<SignatureAlgorithm>().unwrap(),
                algorithm
            );
        }
        assert!("md5".parse::<SignatureAlgorithm>().is_err());
    }
}
