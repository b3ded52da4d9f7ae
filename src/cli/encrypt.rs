//! Encrypt and decrypt files with hybrid packets

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::config::{self, FileAttributes};
use crate::crypto::{self, SecureBytes};
use crate::error::Result;

use super::load_key;

/// Extension given to encrypted files
pub const ENCRYPTED_EXTENSION: &str = "hyb";

/// `INPUT.hyb`
pub fn default_encrypted_path(input: &Path) -> PathBuf {
    let mut name = input.as_os_str().to_os_string();
    name.push(".");
    name.push(ENCRYPTED_EXTENSION);
    PathBuf::from(name)
}

/// `INPUT` without `.hyb`, or `INPUT.dec` when it has another extension
pub fn default_decrypted_path(input: &Path) -> PathBuf {
    if input.extension().map_or(false, |ext| ext == ENCRYPTED_EXTENSION) {
        input.with_extension("")
    } else {
        let mut name: OsString = input.as_os_str().to_os_string();
        name.push(".dec");
        PathBuf::from(name)
    }
}

pub fn encrypt(key_path: &Path, input: &Path, output: Option<PathBuf>) -> Result<PathBuf> {
    let keypair = load_key(key_path)?;
    let plaintext = SecureBytes::new(config::read_bytes(input)?);

    let packet = crypto::encrypt(&keypair, &plaintext)?;

    let output = output.unwrap_or_else(|| default_encrypted_path(input));
    config::write_bytes(&output, &packet, FileAttributes::Normal)?;

    tracing::debug!(
        input = %input.display(),
        output = %output.display(),
        plaintext_len = plaintext.len(),
        packet_len = packet.len(),
        "encrypted file"
    );
    println!(
        "{} {} -> {}",
        "Encrypted".green().bold(),
        input.display(),
        output.display().to_string().cyan()
    );

    Ok(output)
}

pub fn decrypt(key_path: &Path, input: &Path, output: Option<PathBuf>) -> Result<PathBuf> {
    let keypair = load_key(key_path)?;
    let packet = config::read_bytes(input)?;

    let plaintext = crypto::decrypt(&keypair, &packet)?;

    let output = output.unwrap_or_else(|| default_decrypted_path(input));
    config::write_bytes(&output, &plaintext, FileAttributes::Normal)?;

    tracing::debug!(
        input = %input.display(),
        output = %output.display(),
        packet_len = packet.len(),
        plaintext_len = plaintext.len(),
        "decrypted file"
    );
    println!(
        "{} {} -> {}",
        "Decrypted".green().bold(),
        input.display(),
        output.display().to_string().cyan()
    );

    Ok(output)
}
