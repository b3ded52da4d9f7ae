//! Cryptographic core of hybridcrypt
//!
//! This module provides:
//! - RSA key pairs with PEM, base64 blob and password-protected PKCS#8 forms
//! - Hybrid encryption: RSA-wrapped AES-256 keys, AES-256-CBC payloads
//! - RSA PKCS#1 v1.5 signatures over SHA-2
//! - Secure memory handling with automatic zeroing
//!
//! Nothing in here logs, prints or keeps state between calls.

pub mod codec;
pub mod hybrid;
mod keys;
mod secure_bytes;
pub mod signature;

pub use codec::{KeyMaterial, DEFAULT_PBKDF2_ITERATIONS};
pub use hybrid::{decrypt, encrypt, Packet, PacketHeader};
pub use keys::{validate_key_size, KeyPair, DEFAULT_KEY_SIZE, MAX_KEY_SIZE, MIN_KEY_SIZE};
pub use secure_bytes::SecureBytes;
pub use signature::{sign, sign_with, verify, verify_with, HashAlgorithm};
