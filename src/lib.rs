//! hybridcrypt - hybrid RSA + AES-256-CBC encryption, signing and key management
//!
//! This crate provides:
//! - RSA key pairs: generation, PEM/PKCS#8 export and import, base64 blobs,
//!   password-protected private keys
//! - Hybrid packets: a fresh AES-256 key per message, wrapped with RSA,
//!   payload encrypted with AES-256-CBC
//! - RSA signatures over SHA-256/384/512
//!
//! ```no_run
//! use hybridcrypt::crypto::{self, KeyPair};
//!
//! let keypair = KeyPair::generate(2048)?;
//! let packet = crypto::encrypt(&keypair.to_public(), b"attack at dawn")?;
//! let plaintext = crypto::decrypt(&keypair, &packet)?;
//! assert_eq!(&*plaintext, b"attack at dawn");
//! # Ok::<(), hybridcrypt::HybridError>(())
//! ```

pub mod cli;
pub mod config;
pub mod crypto;
pub mod error;

pub use error::{ErrorKind, HybridError, Result};
