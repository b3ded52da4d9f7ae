//! Zero-on-drop byte container for symmetric keys and recovered plaintext
//!
//! Everything the hybrid scheme derives per call (AES keys, decrypted
//! payloads) lives in a `SecureBytes`, so each exit path, including early
//! error returns, wipes it.

use std::ops::Deref;

use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroize;

/// A secure container for sensitive bytes that automatically zeroes on drop
pub struct SecureBytes {
    data: Vec<u8>,
    /// Whether `mlock` succeeded and the pages must be unlocked on drop
    locked: bool,
}

impl SecureBytes {
    /// Take ownership of `data`; its memory is wiped when the container drops
    pub fn new(data: Vec<u8>) -> Self {
        let locked = lock_memory(&data);
        Self { data, locked }
    }

    /// `len` bytes from the operating system CSPRNG
    pub fn random(len: usize) -> Self {
        let mut data = vec![0u8; len];
        OsRng.fill_bytes(&mut data);
        Self::new(data)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether the buffer is pinned in RAM
    pub fn is_locked(&self) -> bool {
        self.locked
    }
}

/// Lock memory to prevent swapping (best effort, may fail without privileges)
#[cfg(unix)]
fn lock_memory(data: &[u8]) -> bool {
    if data.is_empty() {
        return false;
    }
    unsafe { libc::mlock(data.as_ptr() as *const libc::c_void, data.len()) == 0 }
}

#[cfg(not(unix))]
fn lock_memory(_data: &[u8]) -> bool {
    false
}

#[cfg(unix)]
fn unlock_memory(ptr: *const u8, len: usize) {
    unsafe {
        libc::munlock(ptr as *const libc::c_void, len);
    }
}

#[cfg(not(unix))]
fn unlock_memory(_ptr: *const u8, _len: usize) {}

impl Drop for SecureBytes {
    fn drop(&mut self) {
        // Zeroizing clears the length but keeps the allocation, so unlock the original range after
        let (ptr, len) = (self.data.as_ptr(), self.data.len());
        self.data.zeroize();
        if self.locked {
            unlock_memory(ptr, len);
        }
    }
}

impl Deref for SecureBytes {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

// Prevent accidental debug printing of secrets
impl std::fmt::Debug for SecureBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureBytes")
            .field("len", &self.data.len())
            .field("data", &"[REDACTED]")
            .finish()
    }
}
