//! RSA PKCS#1 v1.5 signatures over SHA-2 digests

use std::fmt;
use std::str::FromStr;

use rand::rngs::OsRng;
use rsa::Pkcs1v15Sign;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha384, Sha512};

use super::KeyPair;
use crate::error::{HybridError, Result};

/// Hash algorithms a signature can be computed over
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    pub const ALL: [HashAlgorithm; 3] = [Self::Sha256, Self::Sha384, Self::Sha512];

    pub fn name(self) -> &'static str {
        match self {
            Self::Sha256 => "SHA256",
            Self::Sha384 => "SHA384",
            Self::Sha512 => "SHA512",
        }
    }

    fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha256 => Sha256::digest(data).to_vec(),
            Self::Sha384 => Sha384::digest(data).to_vec(),
            Self::Sha512 => Sha512::digest(data).to_vec(),
        }
    }

    /// PKCS#1 v1.5 scheme carrying this hash's DigestInfo prefix
    fn scheme(self) -> Pkcs1v15Sign {
        match self {
            Self::Sha256 => Pkcs1v15Sign::new::<Sha256>(),
            Self::Sha384 => Pkcs1v15Sign::new::<Sha384>(),
            Self::Sha512 => Pkcs1v15Sign::new::<Sha512>(),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = HybridError;

    /// Accepts `SHA256` and `SHA-256` style names, case-insensitively
    fn from_str(name: &str) -> Result<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "SHA256" | "SHA-256" => Ok(Self::Sha256),
            "SHA384" | "SHA-384" => Ok(Self::Sha384),
            "SHA512" | "SHA-512" => Ok(Self::Sha512),
            _ => Err(HybridError::InvalidParameter(format!(
                "unsupported hash algorithm '{}' (expected SHA256, SHA384 or SHA512)",
                name
            ))),
        }
    }
}

impl TryFrom<String> for HashAlgorithm {
    type Error = HybridError;

    fn try_from(name: String) -> Result<Self> {
        name.parse()
    }
}

impl From<HashAlgorithm> for String {
    fn from(algorithm: HashAlgorithm) -> Self {
        algorithm.name().to_string()
    }
}

/// Sign `data` with the private key, hashing it with the algorithm named `hash_name`
pub fn sign(keypair: &KeyPair, data: &[u8], hash_name: &str) -> Result<Vec<u8>> {
    let algorithm: HashAlgorithm = hash_name.parse()?;
    sign_with(keypair, data, algorithm)
}

pub fn sign_with(keypair: &KeyPair, data: &[u8], algorithm: HashAlgorithm) -> Result<Vec<u8>> {
    let private = keypair.private_key("Signing")?;
    let digest = algorithm.digest(data);

    private
        .sign_with_rng(&mut OsRng, algorithm.scheme(), &digest)
        .map_err(|e| {
            HybridError::InvalidParameter(format!(
                "cannot sign a {} digest with a {}-bit key: {}",
                algorithm,
                keypair.key_size(),
                e
            ))
        })
}

/// Check `signature` over `data` with the public key
///
/// A mismatch is `Ok(false)`; only an unknown `hash_name` is an error.
pub fn verify(keypair: &KeyPair, data: &[u8], signature: &[u8], hash_name: &str) -> Result<bool> {
    let algorithm: HashAlgorithm = hash_name.parse()?;
    Ok(verify_with(keypair, data, signature, algorithm))
}

pub fn verify_with(
    keypair: &KeyPair,
    data: &[u8],
    signature: &[u8],
    algorithm: HashAlgorithm,
) -> bool {
    let digest = algorithm.digest(data);
    keypair
        .public_key()
        .verify(algorithm.scheme(), &digest, signature)
        .is_ok()
}
