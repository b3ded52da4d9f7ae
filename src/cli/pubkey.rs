//! Show the public half of a key file

use std::path::Path;

use colored::Colorize;

use crate::error::Result;

use super::load_key;

pub fn run(key_path: &Path) -> Result<()> {
    let keypair = load_key(key_path)?;
    let pem = keypair.to_pem(false)?;
    let blob = keypair.export_blob(false)?;

    println!();
    println!(
        "{} ({} bits)",
        "Public key:".cyan().bold(),
        keypair.key_size()
    );
    println!();
    println!("{}", "─".repeat(64).dimmed());
    print!("{}", pem.as_str());
    println!("{}", "─".repeat(64).dimmed());
    println!();
    println!("{} {}", "Blob:".cyan(), blob.as_str());
    println!("{} {}", "Fingerprint (SHA-256):".cyan(), keypair.fingerprint()?);
    println!();

    Ok(())
}
