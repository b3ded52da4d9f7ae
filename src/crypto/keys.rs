//! RSA key pairs
//!
//! A [`KeyPair`] always holds the public half and optionally the private
//! half. Once built it never changes; encryption, decryption, signing and
//! verification borrow it for the duration of one call.

use std::path::{Path, PathBuf};

use rand::rngs::OsRng;
use rsa::pkcs8::EncodePublicKey;
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use super::codec::{self, KeyMaterial, DEFAULT_PBKDF2_ITERATIONS};
use crate::config::storage::{self, FileAttributes, KeyFileKind};
use crate::error::{HybridError, Result};

/// Default modulus size in bits
pub const DEFAULT_KEY_SIZE: usize = 2048;
/// Smallest modulus size accepted by [`KeyPair::generate`]
pub const MIN_KEY_SIZE: usize = 384;
/// Largest modulus size accepted by [`KeyPair::generate`]
pub const MAX_KEY_SIZE: usize = 16384;
/// Modulus sizes must be a multiple of this many bits
pub const KEY_SIZE_STEP: usize = 8;

/// An RSA key: public-only, or a full key pair
#[derive(Clone)]
pub struct KeyPair {
    public: RsaPublicKey,
    /// `None` for public-only keys. `RsaPrivateKey` zeroizes itself on drop.
    private: Option<RsaPrivateKey>,
}

/// Check a requested modulus size against the supported range
pub fn validate_key_size(key_size: usize) -> Result<()> {
    if !(MIN_KEY_SIZE..=MAX_KEY_SIZE).contains(&key_size) || key_size % KEY_SIZE_STEP != 0 {
        return Err(HybridError::InvalidParameter(format!(
            "key size must be between {} and {} bits in steps of {}, got {}",
            MIN_KEY_SIZE, MAX_KEY_SIZE, KEY_SIZE_STEP, key_size
        )));
    }
    Ok(())
}

impl KeyPair {
    /// Generate a fresh key pair from the OS random source
    pub fn generate(key_size: usize) -> Result<Self> {
        validate_key_size(key_size)?;

        let private = RsaPrivateKey::new(&mut OsRng, key_size).map_err(|e| {
            HybridError::InvalidParameter(format!(
                "cannot generate a {}-bit key: {}",
                key_size, e
            ))
        })?;

        Ok(Self::from_private_key(private))
    }

    pub fn from_private_key(private: RsaPrivateKey) -> Self {
        Self {
            public: RsaPublicKey::from(&private),
            private: Some(private),
        }
    }

    pub fn from_public_key(public: RsaPublicKey) -> Self {
        Self {
            public,
            private: None,
        }
    }

    fn from_material(material: KeyMaterial) -> Self {
        match material {
            KeyMaterial::Public(public) => Self::from_public_key(public),
            KeyMaterial::Private(private) => Self::from_private_key(private),
        }
    }

    /// Modulus length in bits
    pub fn key_size(&self) -> usize {
        self.public.n().bits()
    }

    pub fn is_public_only(&self) -> bool {
        self.private.is_none()
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public
    }

    /// The private half, or `InvalidOperation` naming the `operation` that needed it
    pub fn private_key(&self, operation: &str) -> Result<&RsaPrivateKey> {
        self.private
            .as_ref()
            .ok_or_else(|| HybridError::public_only(operation))
    }

    /// A public-only copy of this key
    pub fn to_public(&self) -> KeyPair {
        Self::from_public_key(self.public.clone())
    }

    /// Length in bytes of every signature this key produces
    pub fn signature_len(&self) -> usize {
        self.public.size()
    }

    /// Lowercase hex SHA-256 of the SubjectPublicKeyInfo DER
    pub fn fingerprint(&self) -> Result<String> {
        let der = self
            .public
            .to_public_key_der()
            .map_err(|e| HybridError::InvalidFormat(format!("encoding public key: {}", e)))?;
        Ok(hex::encode(Sha256::digest(der.as_bytes())))
    }

    /// PEM text of the public key, or of the private key when `include_private`
    pub fn to_pem(&self, include_private: bool) -> Result<Zeroizing<String>> {
        if include_private {
            let private = self.private_key("Exporting the private key")?;
            codec::encode_private_pem(private)
        } else {
            codec::encode_public_pem(&self.public).map(Zeroizing::new)
        }
    }

    /// Write the key as PEM
    ///
    /// The file name is prefixed `pub.` or `priv.` and private files are made
    /// read-only. Returns the path actually written.
    pub fn export_pem(&self, path: impl AsRef<Path>, include_private: bool) -> Result<PathBuf> {
        let pem = self.to_pem(include_private)?;

        let (kind, attributes) = if include_private {
            (KeyFileKind::Private, FileAttributes::ReadOnly)
        } else {
            (KeyFileKind::Public, FileAttributes::Normal)
        };

        let target = storage::key_file_path(path.as_ref(), kind);
        storage::write_bytes(&target, pem.as_bytes(), attributes)?;
        Ok(target)
    }

    /// Base64 PKCS#1 DER of the public key, or of the private key when `include_private`
    pub fn export_blob(&self, include_private: bool) -> Result<Zeroizing<String>> {
        if include_private {
            let private = self.private_key("Exporting the private key")?;
            codec::encode_private_blob(private)
        } else {
            codec::encode_public_blob(&self.public).map(Zeroizing::new)
        }
    }

    /// Password-protected PKCS#8 PEM text of the private key
    pub fn to_encrypted_pem(
        &self,
        password: &SecretString,
        iterations: u32,
    ) -> Result<Zeroizing<String>> {
        let password = password.expose_secret();
        if password.is_empty() {
            return Err(HybridError::InvalidParameter("password must not be empty".into()));
        }
        let private = self.private_key("Exporting the private key")?;
        codec::encrypt_private_pem(private, password.as_bytes(), iterations)
    }

    /// Write the private key password-protected, under an `enc.`-prefixed name
    pub fn export_encrypted_private(
        &self,
        password: &SecretString,
        path: impl AsRef<Path>,
    ) -> Result<PathBuf> {
        self.export_encrypted_private_with(password, path, DEFAULT_PBKDF2_ITERATIONS)
    }

    /// [`Self::export_encrypted_private`] with an explicit PBKDF2 iteration count
    pub fn export_encrypted_private_with(
        &self,
        password: &SecretString,
        path: impl AsRef<Path>,
        iterations: u32,
    ) -> Result<PathBuf> {
        let pem = self.to_encrypted_pem(password, iterations)?;

        let target = storage::key_file_path(path.as_ref(), KeyFileKind::Encrypted);
        storage::write_bytes(&target, pem.as_bytes(), FileAttributes::ReadOnly)?;
        Ok(target)
    }

    /// Parse unencrypted PEM text
    pub fn from_pem(pem: &str) -> Result<Self> {
        codec::decode_pem(pem).map(Self::from_material)
    }

    /// Read and parse an unencrypted PEM file
    pub fn import_pem(path: impl AsRef<Path>) -> Result<Self> {
        let pem = storage::read_to_string(path.as_ref())?;
        Self::from_pem(&pem)
    }

    /// Parse a blob produced by [`Self::export_blob`]
    pub fn import_blob(blob: &str) -> Result<Self> {
        codec::decode_blob(blob).map(Self::from_material)
    }

    /// Parse password-protected PEM text
    pub fn from_encrypted_pem(pem: &str, password: &SecretString) -> Result<Self> {
        let private = codec::decrypt_private_pem(pem, password.expose_secret().as_bytes())?;
        Ok(Self::from_private_key(private))
    }

    /// Read and decrypt a password-protected PEM file
    pub fn import_encrypted_private(
        password: &SecretString,
        path: impl AsRef<Path>,
    ) -> Result<Self> {
        let path = path.as_ref();
        if password.expose_secret().is_empty() {
            return Err(HybridError::InvalidParameter("password must not be empty".into()));
        }
        if path.as_os_str().is_empty() {
            return Err(HybridError::InvalidParameter("key file path must not be empty".into()));
        }

        let pem = storage::read_to_string(path)?;
        Self::from_encrypted_pem(&pem, password)
    }
}

// Never print key material
impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("key_size", &self.key_size())
            .field("public_only", &self.is_public_only())
            .finish()
    }
}
