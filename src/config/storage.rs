//! Byte-buffer file I/O and key-file naming
//!
//! Key files follow a naming convention that tells their contents apart:
//! `pub.<name>.pem`, `priv.<name>.pem` and `enc.<name>.pem` for public,
//! plain private and password-protected private keys.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use zeroize::Zeroizing;

use crate::error::{HybridError, Result};

const PEM_EXTENSION: &str = "pem";

/// Attributes applied to a file after it is written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAttributes {
    Normal,
    /// Owner read-only (`0o400` on unix)
    ReadOnly,
}

/// What a key file contains, which decides its name prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFileKind {
    Public,
    Private,
    Encrypted,
}

impl KeyFileKind {
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Public => "pub.",
            Self::Private => "priv.",
            Self::Encrypted => "enc.",
        }
    }
}

/// Apply the naming convention for `kind` to `path`
///
/// The prefix is added to the file name unless already present, and `.pem`
/// is appended when the name has no extension.
pub fn key_file_path(path: &Path, kind: KeyFileKind) -> PathBuf {
    let prefix = kind.prefix();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "key".to_string());

    let mut name = if name.starts_with(prefix) {
        name
    } else {
        format!("{}{}", prefix, name)
    };
    if Path::new(&name[prefix.len()..]).extension().is_none() {
        name.push('.');
        name.push_str(PEM_EXTENSION);
    }

    path.with_file_name(name)
}

/// Read a whole file
pub fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => HybridError::NotFound(path.to_path_buf()),
        _ => HybridError::Io(e),
    })
}

/// Read a whole file as UTF-8 text, wiped from memory on drop
pub fn read_to_string(path: &Path) -> Result<Zeroizing<String>> {
    let bytes = read_bytes(path)?;
    String::from_utf8(bytes)
        .map(Zeroizing::new)
        .map_err(|e| {
            let mut bytes = e.into_bytes();
            zeroize::Zeroize::zeroize(&mut bytes);
            HybridError::InvalidFormat(format!("{} is not a text file", path.display()))
        })
}

/// Create or overwrite `path` with `data`, then apply `attributes`
pub fn write_bytes(path: &Path, data: &[u8], attributes: FileAttributes) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    // A previous export may have left a read-only file behind
    if let Ok(metadata) = fs::metadata(path) {
        let mut permissions = metadata.permissions();
        if permissions.readonly() {
            set_writable(&mut permissions);
            fs::set_permissions(path, permissions)?;
        }
    }

    let mut file = File::create(path)?;
    file.write_all(data)?;
    file.sync_all()?;

    if attributes == FileAttributes::ReadOnly {
        set_read_only(path)?;
    }

    Ok(())
}

#[cfg(unix)]
fn set_writable(permissions: &mut fs::Permissions) {
    use std::os::unix::fs::PermissionsExt;
    permissions.set_mode(permissions.mode() | 0o200);
}

#[cfg(not(unix))]
fn set_writable(permissions: &mut fs::Permissions) {
    permissions.set_readonly(false);
}

#[cfg(unix)]
fn set_read_only(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o400))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_read_only(path: &Path) -> Result<()> {
    let mut permissions = fs::metadata(path)?.permissions();
    permissions.set_readonly(true);
    fs::set_permissions(path, permissions)?;
    Ok(())
}
