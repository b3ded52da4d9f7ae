//! Command implementations for the `hybridcrypt` binary

pub mod encrypt;
pub mod newkey;
pub mod protect;
pub mod pubkey;
pub mod sign;

use std::path::Path;

use colored::Colorize;
use secrecy::{ExposeSecret, SecretString};

use crate::config;
use crate::crypto::{codec, KeyPair};
use crate::error::Result;

/// Minimum length of a newly chosen password
pub const MIN_PASSWORD_LEN: usize = 8;

/// Environment variable that supplies the password non-interactively
pub const PASSWORD_ENV: &str = "HYBRIDCRYPT_PASSWORD";

fn env_password() -> Option<SecretString> {
    std::env::var(PASSWORD_ENV)
        .ok()
        .filter(|p| !p.is_empty())
        .map(SecretString::new)
}

/// Ask for a new password with confirmation
pub fn prompt_new_password() -> Result<SecretString> {
    if let Some(password) = env_password() {
        return Ok(password);
    }

    println!("Choose a password to protect the private key.");
    println!("Minimum length: {} characters\n", MIN_PASSWORD_LEN);

    loop {
        let password = SecretString::new(rpassword::prompt_password("Password: ")?);

        if password.expose_secret().len() < MIN_PASSWORD_LEN {
            println!(
                "{} Password must be at least {} characters",
                "Error:".red(),
                MIN_PASSWORD_LEN
            );
            continue;
        }

        let confirm = SecretString::new(rpassword::prompt_password("Confirm password: ")?);
        if password.expose_secret() != confirm.expose_secret() {
            println!("{} Passwords do not match", "Error:".red());
            continue;
        }

        return Ok(password);
    }
}

/// Ask for an existing password
pub fn prompt_password(prompt: &str) -> Result<SecretString> {
    if let Some(password) = env_password() {
        return Ok(password);
    }
    Ok(SecretString::new(rpassword::prompt_password(prompt)?))
}

/// Load a key file, prompting for the password if it is protected
pub fn load_key(path: &Path) -> Result<KeyPair> {
    let pem = config::read_to_string(path)?;

    let keypair = if codec::is_encrypted_pem(&pem) {
        let password = prompt_password(&format!("Password for {}: ", path.display()))?;
        KeyPair::from_encrypted_pem(&pem, &password)?
    } else {
        KeyPair::from_pem(&pem)?
    };

    tracing::debug!(
        path = %path.display(),
        key_size = keypair.key_size(),
        public_only = keypair.is_public_only(),
        "loaded key"
    );
    Ok(keypair)
}

/// Print a progress label; pair with [`done`]
pub(crate) fn step(label: &str) -> Result<()> {
    print!("{}", format!("{}... ", label).cyan());
    std::io::Write::flush(&mut std::io::stdout())?;
    Ok(())
}

pub(crate) fn done() {
    println!("{}", "done".green());
}

/// Base name of a key file with its `pub.`/`priv.`/`enc.` prefix and `.pem` extension removed
pub fn key_base_name(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let name = [
        config::KeyFileKind::Public,
        config::KeyFileKind::Private,
        config::KeyFileKind::Encrypted,
    ]
    .iter()
    .find_map(|kind| name.strip_prefix(kind.prefix()))
    .unwrap_or(&name);

    let name = name.strip_suffix(".pem").unwrap_or(name);
    if name.is_empty() {
        "key".to_string()
    } else {
        name.to_string()
    }
}
