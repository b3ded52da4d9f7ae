//! Sign files and verify signatures
//!
//! Signatures are either detached (`INPUT.sig`) or merged: the data
//! followed directly by its signature (`INPUT.signed`). A merged file is
//! split using the key's fixed signature length.

use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::config::{self, FileAttributes};
use crate::crypto::{self, HashAlgorithm};
use crate::error::{HybridError, Result};

use super::load_key;

/// Where `verify` finds the signature
pub enum SignatureSource {
    /// A separate signature file
    Detached(PathBuf),
    /// The trailing bytes of the input itself
    Merged,
}

fn with_suffix(input: &Path, suffix: &str) -> PathBuf {
    let mut name = input.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// Split a merged file into (data, signature)
pub fn split_merged(merged: &[u8], signature_len: usize) -> Result<(&[u8], &[u8])> {
    if merged.len() < signature_len {
        return Err(HybridError::InvalidFormat(format!(
            "merged file is {} bytes, shorter than a {}-byte signature",
            merged.len(),
            signature_len
        )));
    }
    Ok(merged.split_at(merged.len() - signature_len))
}

pub fn sign(
    key_path: &Path,
    input: &Path,
    hash: HashAlgorithm,
    merge: bool,
    output: Option<PathBuf>,
) -> Result<PathBuf> {
    let keypair = load_key(key_path)?;
    let data = config::read_bytes(input)?;

    let signature = crypto::sign_with(&keypair, &data, hash)?;

    let (output, contents) = if merge {
        let output = output.unwrap_or_else(|| with_suffix(input, ".signed"));
        let mut merged = data;
        merged.extend_from_slice(&signature);
        (output, merged)
    } else {
        (output.unwrap_or_else(|| with_suffix(input, ".sig")), signature)
    };
    config::write_bytes(&output, &contents, FileAttributes::Normal)?;

    tracing::debug!(
        input = %input.display(),
        output = %output.display(),
        %hash,
        merge,
        "signed file"
    );
    println!(
        "{} {} ({}) -> {}",
        "Signed".green().bold(),
        input.display(),
        hash,
        output.display().to_string().cyan()
    );

    Ok(output)
}

/// Returns whether the signature matches; a mismatch is not an error
pub fn verify(
    key_path: &Path,
    input: &Path,
    hash: HashAlgorithm,
    source: &SignatureSource,
) -> Result<bool> {
    let keypair = load_key(key_path)?;
    let contents = config::read_bytes(input)?;

    let valid = match source {
        SignatureSource::Detached(signature_path) => {
            let signature = config::read_bytes(signature_path)?;
            crypto::verify_with(&keypair, &contents, &signature, hash)
        }
        SignatureSource::Merged => {
            let (data, signature) = split_merged(&contents, keypair.signature_len())?;
            crypto::verify_with(&keypair, data, signature, hash)
        }
    };

    tracing::debug!(input = %input.display(), %hash, valid, "verified signature");
    if valid {
        println!("{} {}", "Signature OK:".green().bold(), input.display());
    } else {
        println!("{} {}", "Signature MISMATCH:".red().bold(), input.display());
    }

    Ok(valid)
}
