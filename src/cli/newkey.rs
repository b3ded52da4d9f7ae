//! Generate a key pair and write its key files

use std::path::PathBuf;

use colored::Colorize;

use crate::crypto::KeyPair;
use crate::error::Result;

use super::{done, prompt_new_password, step};

pub struct NewKeyOptions {
    pub key_size: usize,
    pub key_name: String,
    pub output_dir: PathBuf,
    /// Write the private key password-protected (`enc.`) instead of plain (`priv.`)
    pub protect: bool,
    pub pbkdf2_iterations: u32,
}

pub fn run(options: &NewKeyOptions) -> Result<()> {
    // Ask before the slow part so a typo doesn't cost a key generation
    let password = if options.protect {
        Some(prompt_new_password()?)
    } else {
        None
    };

    step(&format!("Generating {}-bit RSA key pair", options.key_size))?;
    let keypair = KeyPair::generate(options.key_size)?;
    done();

    let fingerprint = keypair.fingerprint()?;
    tracing::debug!(key_size = options.key_size, %fingerprint, "generated key pair");

    let base = options.output_dir.join(&options.key_name);

    let public_path = keypair.export_pem(&base, false)?;
    tracing::info!(path = %public_path.display(), "wrote public key");

    let private_path = match &password {
        Some(password) => {
            step("Encrypting private key")?;
            let path =
                keypair.export_encrypted_private_with(password, &base, options.pbkdf2_iterations)?;
            done();
            path
        }
        None => keypair.export_pem(&base, true)?,
    };
    tracing::info!(path = %private_path.display(), "wrote private key");

    println!();
    println!("{}", "Key pair created".green().bold());
    println!("  Public key:  {}", public_path.display().to_string().cyan());
    println!("  Private key: {}", private_path.display().to_string().cyan());
    println!("  Fingerprint: {}", fingerprint.dimmed());

    Ok(())
}
