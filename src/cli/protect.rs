//! Add or remove password protection on a private key file

use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::crypto::KeyPair;
use crate::error::Result;

use super::{done, key_base_name, prompt_new_password, prompt_password, step};

/// `<dir>/<base name>` for the key written next to (or instead of) `key_path`
fn target_base(key_path: &Path, output_dir: Option<&Path>) -> PathBuf {
    let dir = output_dir
        .map(Path::to_path_buf)
        .or_else(|| key_path.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    dir.join(key_base_name(key_path))
}

/// Read a plain `priv.` key and write it password-protected as `enc.`
pub fn protect(key_path: &Path, output_dir: Option<&Path>, iterations: u32) -> Result<PathBuf> {
    let keypair = KeyPair::import_pem(key_path)?;
    // Fail before prompting if there is nothing to protect
    keypair.private_key("Password protection")?;

    let password = prompt_new_password()?;

    step("Encrypting private key")?;
    let output =
        keypair.export_encrypted_private_with(&password, target_base(key_path, output_dir), iterations)?;
    done();

    tracing::info!(input = %key_path.display(), output = %output.display(), "protected private key");
    println!(
        "{} {}",
        "Protected key written to".green().bold(),
        output.display().to_string().cyan()
    );
    Ok(output)
}

/// Read an `enc.` key and write it as a plain `priv.` key
pub fn unprotect(key_path: &Path, output_dir: Option<&Path>) -> Result<PathBuf> {
    let password = prompt_password(&format!("Password for {}: ", key_path.display()))?;
    let keypair = KeyPair::import_encrypted_private(&password, key_path)?;

    let output = keypair.export_pem(target_base(key_path, output_dir), true)?;

    tracing::info!(input = %key_path.display(), output = %output.display(), "removed key protection");
    println!(
        "{} {}",
        "Plain private key written to".yellow().bold(),
        output.display().to_string().cyan()
    );
    Ok(output)
}
