//! Key material loading and signature computation.
//!
//! # Security
//! - Private keys are loaded from PEM files once at construction
//! - HMAC verification uses constant-time comparison
//! - Key bytes are never logged

use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use reqwest::Method;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};

use crate::error::{ClientError, Result};
use crate::http::header_value;
use crate::signing::{
    build_canonical_string, SignatureAlgorithm, SignatureParams, DEFAULT_SIGNED_HEADERS,
};
use crate::transport::Identity;

type HmacSha256 = Hmac<Sha256>;

/// Private key material for request signing.
pub enum SigningKey {
    /// Shared symmetric secret.
    Hmac(Vec<u8>),
    Rsa(rsa::RsaPrivateKey),
    Ec(p256::ecdsa::SigningKey),
}

impl SigningKey {
    /// Load a private key from PEM text. PKCS#8, PKCS#1 and SEC1 encodings
    /// are accepted; `passphrase` decrypts an encrypted PKCS#8 key.
    pub fn from_pem(pem: &str, passphrase: Option<&str>) -> Result<Self> {
        if let Some(passphrase) = passphrase {
            if let Ok(key) = rsa::RsaPrivateKey::from_pkcs8_encrypted_pem(pem, passphrase) {
                return Ok(SigningKey::Rsa(key));
            }
            let key = p256::SecretKey::from_pkcs8_encrypted_pem(pem, passphrase)
                .map_err(|e| ClientError::Signing(format!("cannot decrypt private key: {e}")))?;
            return Ok(SigningKey::Ec(p256::ecdsa::SigningKey::from(key)));
        }
        if let Ok(key) = p256::SecretKey::from_pkcs8_pem(pem) {
            return Ok(SigningKey::Ec(p256::ecdsa::SigningKey::from(key)));
        }
        if let Ok(key) = p256::SecretKey::from_sec1_pem(pem) {
            return Ok(SigningKey::Ec(p256::ecdsa::SigningKey::from(key)));
        }
        if let Ok(key) = rsa::RsaPrivateKey::from_pkcs8_pem(pem) {
            return Ok(SigningKey::Rsa(key));
        }
        if let Ok(key) = rsa::RsaPrivateKey::from_pkcs1_pem(pem) {
            return Ok(SigningKey::Rsa(key));
        }
        Err(ClientError::Signing(
            "private key is not a supported PEM encoding".to_string(),
        ))
    }

    /// Default signature algorithm for this key type.
    pub fn default_algorithm(&self) -> SignatureAlgorithm {
        match self {
            SigningKey::Hmac(_) => SignatureAlgorithm::HmacSha256,
            SigningKey::Rsa(_) => SignatureAlgorithm::RsaSha256,
            SigningKey::Ec(_) => SignatureAlgorithm::EcdsaSha256,
        }
    }

    /// Derive the matching verification key.
    pub fn verifying_key(&self) -> VerifyingKey {
        match self {
            SigningKey::Hmac(secret) => VerifyingKey::Hmac(secret.clone()),
            SigningKey::Rsa(key) => VerifyingKey::Rsa(key.to_public_key()),
            SigningKey::Ec(key) => VerifyingKey::Ec(*key.verifying_key()),
        }
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material is deliberately not printed.
        let kind = match self {
            SigningKey::Hmac(_) => "Hmac",
            SigningKey::Rsa(_) => "Rsa",
            SigningKey::Ec(_) => "Ec",
        };
        f.debug_struct("SigningKey").field("kind", &kind).finish()
    }
}

/// Public key material for signature verification.
pub enum VerifyingKey {
    /// The shared symmetric secret; HMAC has no separate public half.
    Hmac(Vec<u8>),
    Rsa(rsa::RsaPublicKey),
    Ec(p256::ecdsa::VerifyingKey),
}

impl VerifyingKey {
    /// Load a public key from PEM text (SPKI or PKCS#1).
    pub fn from_pem(pem: &str) -> Result<Self> {
        if let Ok(key) = p256::PublicKey::from_public_key_pem(pem) {
            return Ok(VerifyingKey::Ec(p256::ecdsa::VerifyingKey::from(key)));
        }
        if let Ok(key) = rsa::RsaPublicKey::from_public_key_pem(pem) {
            return Ok(VerifyingKey::Rsa(key));
        }
        if let Ok(key) = rsa::RsaPublicKey::from_pkcs1_pem(pem) {
            return Ok(VerifyingKey::Rsa(key));
        }
        Err(ClientError::Signing(
            "public key is not a supported PEM encoding".to_string(),
        ))
    }
}

/// Sign `data` with `algorithm` using `key`.
pub fn sign(data: &[u8], algorithm: SignatureAlgorithm, key: &SigningKey) -> Result<Vec<u8>> {
    let signing_failed = |e: rsa::signature::Error| ClientError::Signing(e.to_string());
    match (algorithm, key) {
        (SignatureAlgorithm::HmacSha256, SigningKey::Hmac(secret)) => {
            let mut mac = HmacSha256::new_from_slice(secret)
                .map_err(|e| ClientError::Signing(e.to_string()))?;
            mac.update(data);
            Ok(mac.finalize().into_bytes().to_vec())
        }
        (SignatureAlgorithm::RsaSha1, SigningKey::Rsa(key)) => Ok(
            rsa::pkcs1v15::SigningKey::<Sha1>::new(key.clone())
                .try_sign(data)
                .map_err(signing_failed)?
                .to_vec(),
        ),
        (SignatureAlgorithm::RsaSha256, SigningKey::Rsa(key)) => Ok(
            rsa::pkcs1v15::SigningKey::<Sha256>::new(key.clone())
                .try_sign(data)
                .map_err(signing_failed)?
                .to_vec(),
        ),
        (SignatureAlgorithm::RsaSha512, SigningKey::Rsa(key)) => Ok(
            rsa::pkcs1v15::SigningKey::<Sha512>::new(key.clone())
                .try_sign(data)
                .map_err(signing_failed)?
                .to_vec(),
        ),
        (SignatureAlgorithm::EcdsaSha256, SigningKey::Ec(key)) => {
            let signature: p256::ecdsa::Signature =
                key.try_sign(data).map_err(signing_failed)?;
            Ok(signature.to_der().to_vec())
        }
        _ => Err(ClientError::Signing(format!(
            "key type does not match algorithm {algorithm}"
        ))),
    }
}

/// Verify `signature` over `data`.
///
/// HMAC comparison is constant time. A mismatch under any algorithm
/// reports [`ClientError::BadSignature`] rather than a generic error.
pub fn verify(
    signature: &[u8],
    data: &[u8],
    algorithm: SignatureAlgorithm,
    key: &VerifyingKey,
) -> Result<()> {
    match (algorithm, key) {
        (SignatureAlgorithm::HmacSha256, VerifyingKey::Hmac(secret)) => {
            let mut mac = HmacSha256::new_from_slice(secret)
                .map_err(|e| ClientError::Signing(e.to_string()))?;
            mac.update(data);
            mac.verify_slice(signature)
                .map_err(|_| ClientError::BadSignature)
        }
        (SignatureAlgorithm::RsaSha1, VerifyingKey::Rsa(key)) => {
            let signature = rsa::pkcs1v15::Signature::try_from(signature)
                .map_err(|_| ClientError::BadSignature)?;
            rsa::pkcs1v15::VerifyingKey::<Sha1>::new(key.clone())
                .verify(data, &signature)
                .map_err(|_| ClientError::BadSignature)
        }
        (SignatureAlgorithm::RsaSha256, VerifyingKey::Rsa(key)) => {
            let signature = rsa::pkcs1v15::Signature::try_from(signature)
                .map_err(|_| ClientError::BadSignature)?;
            rsa::pkcs1v15::VerifyingKey::<Sha256>::new(key.clone())
                .verify(data, &signature)
                .map_err(|_| ClientError::BadSignature)
        }
        (SignatureAlgorithm::RsaSha512, VerifyingKey::Rsa(key)) => {
            let signature = rsa::pkcs1v15::Signature::try_from(signature)
                .map_err(|_| ClientError::BadSignature)?;
            rsa::pkcs1v15::VerifyingKey::<Sha512>::new(key.clone())
                .verify(data, &signature)
                .map_err(|_| ClientError::BadSignature)
        }
        (SignatureAlgorithm::EcdsaSha256, VerifyingKey::Ec(key)) => {
            let signature = p256::ecdsa::Signature::from_der(signature)
                .map_err(|_| ClientError::BadSignature)?;
            key.verify(data, &signature)
                .map_err(|_| ClientError::BadSignature)
        }
        _ => Err(ClientError::Signing(format!(
            "key type does not match algorithm {algorithm}"
        ))),
    }
}

/// Hex SHA-256 fingerprint of the first certificate in a PEM file.
///
/// Used as the signature key id, so the node can resolve which endorsed
/// certificate to verify against.
pub fn certificate_fingerprint(path: &Path) -> Result<String> {
    let pem = std::fs::read(path).map_err(|e| {
        ClientError::Signing(format!("cannot read certificate {}: {e}", path.display()))
    })?;
    let mut reader = pem.as_slice();
    let cert = rustls_pemfile::certs(&mut reader)
        .next()
        .ok_or_else(|| {
            ClientError::Signing(format!("no certificate found in {}", path.display()))
        })?
        .map_err(|e| {
            ClientError::Signing(format!("cannot parse certificate {}: {e}", path.display()))
        })?;
    Ok(hex::encode(Sha256::digest(cert.as_ref())))
}

/// Signs outgoing requests on behalf of a signing identity.
#[derive(Debug)]
pub struct RequestSigner {
    key: SigningKey,
    algorithm: SignatureAlgorithm,
    key_id: String,
}

impl RequestSigner {
    pub fn new(key: SigningKey, algorithm: SignatureAlgorithm, key_id: impl Into<String>) -> Self {
        Self {
            key,
            algorithm,
            key_id: key_id.into(),
        }
    }

    /// Load key material from a signing identity. The algorithm follows the
    /// key type and the key id is the certificate's SHA-256 fingerprint.
    pub fn from_identity(identity: &Identity) -> Result<Self> {
        let pem = std::fs::read_to_string(&identity.key).map_err(|e| {
            ClientError::Signing(format!(
                "cannot read signing key {}: {e}",
                identity.key.display()
            ))
        })?;
        let key = SigningKey::from_pem(&pem, None)?;
        let algorithm = key.default_algorithm();
        let key_id = certificate_fingerprint(&identity.cert)?;
        Ok(Self::new(key, algorithm, key_id))
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }

    /// Compute the `authorization` header value for a request.
    ///
    /// `headers` must already contain every name in
    /// [`DEFAULT_SIGNED_HEADERS`]; the transports guarantee this by setting
    /// `digest` and `content-length` before signing.
    pub fn authorization_header(
        &self,
        method: &Method,
        path: &str,
        headers: &[(String, String)],
        expires_in: Option<Duration>,
    ) -> Result<String> {
        let mut to_sign = Vec::with_capacity(DEFAULT_SIGNED_HEADERS.len());
        for name in DEFAULT_SIGNED_HEADERS {
            let value = header_value(headers, name).ok_or_else(|| {
                ClientError::Signing(format!("header '{name}' is required for signing"))
            })?;
            to_sign.push((name.to_string(), value.to_string()));
        }

        let created = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| ClientError::Signing(format!("system clock before epoch: {e}")))?
            .as_secs();
        let canonical = build_canonical_string(method, path, &to_sign, created);
        let signature = sign(&canonical.bytes, self.algorithm, &self.key)?;

        let params = SignatureParams {
            key_id: self.key_id.clone(),
            algorithm: self.algorithm,
            headers: canonical.signed_headers,
            signature,
            created,
            expires: expires_in.map(|d| created + d.as_secs()),
        };
        Ok(params.to_header_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;
    use std::sync::OnceLock;

    // RSA key generation is slow in debug builds; share one key across tests.
    fn rsa_test_key() -> &'static rsa::RsaPrivateKey {
        static KEY: OnceLock<rsa::RsaPrivateKey> = OnceLock::new();
        KEY.get_or_init(|| rsa::RsaPrivateKey::new(&mut OsRng, 2048).unwrap())
    }

    fn keys_for(algorithm: SignatureAlgorithm) -> SigningKey {
        match algorithm {
            SignatureAlgorithm::HmacSha256 => SigningKey::Hmac(b"a shared secret".to_vec()),
            SignatureAlgorithm::RsaSha1
            | SignatureAlgorithm::RsaSha256
            | SignatureAlgorithm::RsaSha512 => SigningKey::Rsa(rsa_test_key().clone()),
            SignatureAlgorithm::EcdsaSha256 => {
                SigningKey::Ec(p256::ecdsa::SigningKey::random(&mut OsRng))
            }
        }
    }

    const ALL_ALGORITHMS: [SignatureAlgorithm; 5] = [
        SignatureAlgorithm::HmacSha256,
        SignatureAlgorithm::RsaSha1,
        SignatureAlgorithm::RsaSha256,
        SignatureAlgorithm::RsaSha512,
        SignatureAlgorithm::EcdsaSha256,
    ];

    #[test]
    fn test_sign_verify_round_trip_all_algorithms() {
        let data = b"(created): 1000\n(request-target): post /app/log";
        for algorithm in ALL_ALGORITHMS {
            let key = keys_for(algorithm);
            let signature = sign(data, algorithm, &key).unwrap();
            verify(&signature, data, algorithm, &key.verifying_key())
                .unwrap_or_else(|e| panic!("{algorithm}: {e}"));
        }
    }

    #[test]
    fn test_tampered_input_fails_all_algorithms() {
        let data = b"some signing input";
        for algorithm in ALL_ALGORITHMS {
            let key = keys_for(algorithm);
            let signature = sign(data, algorithm, &key).unwrap();
            let err = verify(
                &signature,
                b"some signing inpuT",
                algorithm,
                &key.verifying_key(),
            )
            .unwrap_err();
            assert!(
                matches!(err, ClientError::BadSignature),
                "{algorithm}: {err}"
            );
        }
    }

    #[test]
    fn test_tampered_signature_fails_all_algorithms() {
        let data = b"some signing input";
        for algorithm in ALL_ALGORITHMS {
            let key = keys_for(algorithm);
            let mut signature = sign(data, algorithm, &key).unwrap();
            let last = signature.len() - 1;
            signature[last] ^= 0x01;
            assert!(
                verify(&signature, data, algorithm, &key.verifying_key()).is_err(),
                "{algorithm}"
            );
        }
    }

    #[test]
    fn test_mismatched_key_and_algorithm() {
        let key = SigningKey::Hmac(b"secret".to_vec());
        let err = sign(b"data", SignatureAlgorithm::EcdsaSha256, &key).unwrap_err();
        assert!(matches!(err, ClientError::Signing(_)));
    }

    #[test]
    fn test_authorization_header_verifies() {
        let key = SigningKey::Ec(p256::ecdsa::SigningKey::random(&mut OsRng));
        let verifying_key = key.verifying_key();
        let signer = RequestSigner::new(key, SignatureAlgorithm::EcdsaSha256, "test-key");

        let headers = vec![
            ("digest".to_string(), body_digest_of(b"hello")),
            ("content-length".to_string(), "5".to_string()),
        ];
        let header = signer
            .authorization_header(&Method::POST, "/app/log", &headers, None)
            .unwrap();

        let params = SignatureParams::parse(&header).unwrap();
        assert_eq!(params.key_id, "test-key");
        assert_eq!(
            params.headers,
            vec!["(created)", "(request-target)", "digest", "content-length"]
        );

        let canonical =
            build_canonical_string(&Method::POST, "/app/log", &headers, params.created);
        assert_eq!(params.headers, canonical.signed_headers);
        verify(
            &params.signature,
            &canonical.bytes,
            params.algorithm,
            &verifying_key,
        )
        .unwrap();
    }

    #[test]
    fn test_authorization_header_requires_digest() {
        let signer = RequestSigner::new(
            SigningKey::Hmac(b"secret".to_vec()),
            SignatureAlgorithm::HmacSha256,
            "k",
        );
        let err = signer
            .authorization_header(&Method::GET, "/node/tx", &[], None)
            .unwrap_err();
        assert!(err.to_string().contains("digest"));
    }

    #[test]
    fn test_ec_key_pem_round_trip() {
        use p256::pkcs8::EncodePrivateKey as _;
        let secret = p256::SecretKey::random(&mut OsRng);
        let pem = secret.to_pkcs8_pem(p256::pkcs8::LineEnding::LF).unwrap();
        let key = SigningKey::from_pem(&pem, None).unwrap();
        assert_eq!(key.default_algorithm(), SignatureAlgorithm::EcdsaSha256);
    }

    fn body_digest_of(body: &[u8]) -> String {
        crate::signing::body_digest(body)
    }
}
