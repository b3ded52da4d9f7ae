//! Configuration and file handling for the command-line front-end
//!
//! - Settings file with defaults for key generation and signing
//! - Byte-buffer file I/O and the `pub.`/`priv.`/`enc.` key-file naming

mod settings;
pub mod storage;

pub use settings::Settings;
pub use storage::{key_file_path, read_bytes, read_to_string, write_bytes, FileAttributes, KeyFileKind};
