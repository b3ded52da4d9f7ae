//! PEM, base64 blob and password-protected PKCS#8 encodings of RSA keys
//!
//! Stateless helpers: every function takes a key or an encoding and
//! returns the other. File access is the caller's business.
//!
//! Supported PEM labels:
//! - `PUBLIC KEY` (SubjectPublicKeyInfo) and `PRIVATE KEY` (PKCS#8), written on export
//! - `RSA PUBLIC KEY` / `RSA PRIVATE KEY` (PKCS#1), accepted on import
//! - `ENCRYPTED PRIVATE KEY` (PKCS#8 PBES2: PBKDF2-HMAC-SHA256 + AES-256-CBC)

use base64::{engine::general_purpose::STANDARD, Engine as _};
use pkcs5::pbes2;
use pkcs8::der::{Decode, Document};
use pkcs8::spki::SubjectPublicKeyInfoRef;
use pkcs8::{EncryptedPrivateKeyInfo, LineEnding, PrivateKeyInfo};
use rand::rngs::OsRng;
use rand::RngCore;
use rsa::pkcs1::{self, DecodeRsaPrivateKey, EncodeRsaPrivateKey, EncodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey};
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};
use zeroize::Zeroizing;

use super::MAX_KEY_SIZE;
use crate::error::{HybridError, Result};

pub const PUBLIC_KEY_LABEL: &str = "PUBLIC KEY";
pub const PRIVATE_KEY_LABEL: &str = "PRIVATE KEY";
pub const RSA_PUBLIC_KEY_LABEL: &str = "RSA PUBLIC KEY";
pub const RSA_PRIVATE_KEY_LABEL: &str = "RSA PRIVATE KEY";
pub const ENCRYPTED_PRIVATE_KEY_LABEL: &str = "ENCRYPTED PRIVATE KEY";

/// PBKDF2 salt length for password-protected exports
pub const PBKDF2_SALT_LEN: usize = 16;

/// Default PBKDF2-HMAC-SHA256 iteration count (OWASP 2023 recommendation)
pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 600_000;

const AES_IV_LEN: usize = 16;

/// Decoded key parameters, before they are wrapped into a [`super::KeyPair`]
pub enum KeyMaterial {
    Public(RsaPublicKey),
    Private(RsaPrivateKey),
}

fn invalid_format(context: &str, err: impl std::fmt::Display) -> HybridError {
    HybridError::InvalidFormat(format!("{}: {}", context, err))
}

/// Label of the first PEM block in `pem`, if any
fn pem_label(pem: &str) -> Option<&str> {
    const BEGIN: &str = "-----BEGIN ";
    let start = pem.find(BEGIN)? + BEGIN.len();
    let rest = &pem[start..];
    let end = rest.find("-----")?;
    Some(&rest[..end])
}

/// DER body of a PEM block
fn pem_der(pem: &str, context: &str) -> Result<Document> {
    Document::from_pem(pem)
        .map(|(_, document)| document)
        .map_err(|e| invalid_format(context, e))
}

/// Public key from PKCS#1 `RSAPublicKey` DER
///
/// The decoders in `rsa` cap the modulus at 4096 bits; this accepts every
/// size [`super::KeyPair::generate`] can produce.
fn public_key_from_pkcs1_der(der: &[u8]) -> Result<RsaPublicKey> {
    let key = pkcs1::RsaPublicKey::from_der(der)
        .map_err(|e| invalid_format("parsing PKCS#1 public key", e))?;
    let n = BigUint::from_bytes_be(key.modulus.as_bytes());
    let e = BigUint::from_bytes_be(key.public_exponent.as_bytes());
    RsaPublicKey::new_with_max_size(n, e, MAX_KEY_SIZE)
        .map_err(|err| invalid_format("invalid RSA public key", err))
}

/// Public key from SubjectPublicKeyInfo DER
fn public_key_from_spki_der(der: &[u8]) -> Result<RsaPublicKey> {
    let spki = SubjectPublicKeyInfoRef::from_der(der)
        .map_err(|e| invalid_format("parsing public key", e))?;
    if spki.algorithm.oid != pkcs1::ALGORITHM_OID {
        return Err(HybridError::InvalidFormat(format!(
            "public key algorithm {} is not RSA",
            spki.algorithm.oid
        )));
    }
    let key = spki
        .subject_public_key
        .as_bytes()
        .ok_or_else(|| HybridError::InvalidFormat("public key bit string is not byte-aligned".into()))?;
    public_key_from_pkcs1_der(key)
}

/// True if `pem` holds a password-protected private key
pub fn is_encrypted_pem(pem: &str) -> bool {
    pem_label(pem) == Some(ENCRYPTED_PRIVATE_KEY_LABEL)
}

pub fn encode_public_pem(key: &RsaPublicKey) -> Result<String> {
    key.to_public_key_pem(LineEnding::LF)
        .map_err(|e| invalid_format("encoding public key", e))
}

pub fn encode_private_pem(key: &RsaPrivateKey) -> Result<Zeroizing<String>> {
    key.to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| invalid_format("encoding private key", e))
}

/// Parse any supported unencrypted PEM block into key material
pub fn decode_pem(pem: &str) -> Result<KeyMaterial> {
    let pem = pem.trim();
    let label = pem_label(pem)
        .ok_or_else(|| HybridError::InvalidFormat("no PEM armor found".into()))?;

    match label {
        PUBLIC_KEY_LABEL => {
            let der = pem_der(pem, "parsing public key")?;
            public_key_from_spki_der(der.as_bytes()).map(KeyMaterial::Public)
        }
        PRIVATE_KEY_LABEL => RsaPrivateKey::from_pkcs8_pem(pem)
            .map(KeyMaterial::Private)
            .map_err(|e| invalid_format("parsing private key", e)),
        RSA_PUBLIC_KEY_LABEL => {
            let der = pem_der(pem, "parsing PKCS#1 public key")?;
            public_key_from_pkcs1_der(der.as_bytes()).map(KeyMaterial::Public)
        }
        RSA_PRIVATE_KEY_LABEL => RsaPrivateKey::from_pkcs1_pem(pem)
            .map(KeyMaterial::Private)
            .map_err(|e| invalid_format("parsing PKCS#1 private key", e)),
        ENCRYPTED_PRIVATE_KEY_LABEL => Err(HybridError::InvalidFormat(
            "key is password-protected; import it with a password".into(),
        )),
        other => Err(HybridError::InvalidFormat(format!(
            "unsupported PEM label '{}'",
            other
        ))),
    }
}

/// Base64 of the PKCS#1 `RSAPublicKey` DER
pub fn encode_public_blob(key: &RsaPublicKey) -> Result<String> {
    let der = key
        .to_pkcs1_der()
        .map_err(|e| invalid_format("encoding public key", e))?;
    Ok(STANDARD.encode(der.as_bytes()))
}

/// Base64 of the PKCS#1 `RSAPrivateKey` DER
pub fn encode_private_blob(key: &RsaPrivateKey) -> Result<Zeroizing<String>> {
    let der = key
        .to_pkcs1_der()
        .map_err(|e| invalid_format("encoding private key", e))?;
    Ok(Zeroizing::new(STANDARD.encode(der.as_bytes())))
}

/// Parse a blob produced by [`encode_public_blob`] or [`encode_private_blob`]
pub fn decode_blob(blob: &str) -> Result<KeyMaterial> {
    let der = Zeroizing::new(
        STANDARD
            .decode(blob.trim())
            .map_err(|e| invalid_format("decoding base64 blob", e))?,
    );

    if let Ok(private) = RsaPrivateKey::from_pkcs1_der(&der) {
        return Ok(KeyMaterial::Private(private));
    }

    public_key_from_pkcs1_der(&der)
        .map(KeyMaterial::Public)
        .map_err(|_| HybridError::InvalidFormat("blob is not an RSA key".into()))
}

/// Encrypt a private key as `ENCRYPTED PRIVATE KEY` PEM
///
/// Salt and IV are fresh for every call, so two exports of the same key
/// under the same password differ.
pub fn encrypt_private_pem(
    key: &RsaPrivateKey,
    password: &[u8],
    iterations: u32,
) -> Result<Zeroizing<String>> {
    if password.is_empty() {
        return Err(HybridError::InvalidParameter("password must not be empty".into()));
    }
    if iterations == 0 {
        return Err(HybridError::InvalidParameter(
            "PBKDF2 iteration count must be positive".into(),
        ));
    }

    let der = key
        .to_pkcs8_der()
        .map_err(|e| invalid_format("encoding private key", e))?;
    let info = PrivateKeyInfo::try_from(der.as_bytes())
        .map_err(|e| invalid_format("encoding private key", e))?;

    let mut salt = [0u8; PBKDF2_SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let mut iv = [0u8; AES_IV_LEN];
    OsRng.fill_bytes(&mut iv);

    let params = pbes2::Parameters::pbkdf2_sha256_aes256cbc(iterations, &salt, &iv)
        .map_err(|e| HybridError::InvalidParameter(format!("PBES2 parameters: {}", e)))?;

    let encrypted = info
        .encrypt_with_params(params, password)
        .map_err(|e| invalid_format("encrypting private key", e))?;

    encrypted
        .to_pem(ENCRYPTED_PRIVATE_KEY_LABEL, LineEnding::LF)
        .map_err(|e| invalid_format("encoding encrypted key", e))
}

/// Decrypt an `ENCRYPTED PRIVATE KEY` PEM block
///
/// Structural problems are `InvalidFormat`. A failed decryption, or a
/// decrypted payload that is not a key, is `WrongPassword`.
pub fn decrypt_private_pem(pem: &str, password: &[u8]) -> Result<RsaPrivateKey> {
    if password.is_empty() {
        return Err(HybridError::InvalidParameter("password must not be empty".into()));
    }

    let (label, document) =
        Document::from_pem(pem.trim()).map_err(|e| invalid_format("parsing PEM", e))?;
    if label != ENCRYPTED_PRIVATE_KEY_LABEL {
        return Err(HybridError::InvalidFormat(format!(
            "expected '{}' PEM block, found '{}'",
            ENCRYPTED_PRIVATE_KEY_LABEL, label
        )));
    }

    let info = EncryptedPrivateKeyInfo::try_from(document.as_bytes())
        .map_err(|e| invalid_format("parsing encrypted key", e))?;

    let decrypted = info
        .decrypt(password)
        .map_err(|_| HybridError::WrongPassword)?;

    RsaPrivateKey::from_pkcs8_der(decrypted.as_bytes()).map_err(|_| HybridError::WrongPassword)
}
