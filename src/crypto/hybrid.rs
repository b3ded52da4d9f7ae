//! Hybrid RSA + AES-256-CBC packets
//!
//! Every call draws a fresh AES-256 key and IV, wraps the key with the
//! recipient's RSA public key and encrypts the payload in CBC mode.
//!
//! Packet layout (lengths are little-endian u32):
//! ```text
//! [4 bytes: lenK][4 bytes: lenIV][lenK bytes: wrapped key][lenIV bytes: IV][ciphertext]
//! ```
//! The ciphertext is PKCS#7 padded, so it is always a non-empty multiple of
//! the 16-byte block size.
//!
//! The key wrap uses PKCS#1 v1.5 encryption padding rather than OAEP so that
//! packets stay byte-compatible with existing producers and consumers.
//! There is no MAC: tampering is detected only as far as RSA unwrapping and
//! padding checks catch it.

use aes::{Aes256, Block};
use cbc::cipher::block_padding::{Padding, Pkcs7};
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::rngs::OsRng;
use rand::RngCore;
use rsa::Pkcs1v15Encrypt;
use zeroize::{Zeroize, Zeroizing};

use super::{KeyPair, SecureBytes};
use crate::error::{HybridError, Result};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Size of the two length fields at the start of every packet
pub const HEADER_LEN: usize = 8;

/// AES-256 key length
pub const AES_KEY_LEN: usize = 32;

/// AES block size, which is also the IV length
pub const BLOCK_LEN: usize = 16;

/// IV length
pub const IV_LEN: usize = BLOCK_LEN;

/// Length of the PKCS#7-padded ciphertext for a plaintext of `plaintext_len` bytes
pub fn ciphertext_len(plaintext_len: usize) -> usize {
    (plaintext_len / BLOCK_LEN + 1) * BLOCK_LEN
}

/// The two length fields at the start of a packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    /// Length of the RSA-wrapped AES key
    pub len_key: u32,
    /// Length of the IV
    pub len_iv: u32,
}

impl PacketHeader {
    fn new(len_key: usize, len_iv: usize) -> Result<Self> {
        let field = |len: usize, name: &str| {
            u32::try_from(len).map_err(|_| {
                HybridError::InvalidParameter(format!("{} length {} does not fit in 32 bits", name, len))
            })
        };
        Ok(Self {
            len_key: field(len_key, "wrapped key")?,
            len_iv: field(len_iv, "IV")?,
        })
    }

    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[..4].copy_from_slice(&self.len_key.to_le_bytes());
        out[4..].copy_from_slice(&self.len_iv.to_le_bytes());
        out
    }

    /// Read the length fields; only checks that 8 bytes are present
    pub fn parse(packet: &[u8]) -> Result<Self> {
        if packet.len() < HEADER_LEN {
            return Err(HybridError::InvalidFormat(format!(
                "packet is {} bytes, shorter than its {}-byte header",
                packet.len(),
                HEADER_LEN
            )));
        }
        Ok(Self {
            len_key: u32::from_le_bytes([packet[0], packet[1], packet[2], packet[3]]),
            len_iv: u32::from_le_bytes([packet[4], packet[5], packet[6], packet[7]]),
        })
    }

    /// Offset of the ciphertext, `None` on overflow
    pub fn body_offset(&self) -> Option<usize> {
        HEADER_LEN
            .checked_add(usize::try_from(self.len_key).ok()?)?
            .checked_add(usize::try_from(self.len_iv).ok()?)
    }
}

/// A packet split into its segments, borrowing the packet buffer
#[derive(Debug, Clone, Copy)]
pub struct Packet<'a> {
    pub header: PacketHeader,
    pub wrapped_key: &'a [u8],
    pub iv: &'a [u8],
    pub ciphertext: &'a [u8],
}

impl<'a> Packet<'a> {
    /// Split `packet` into segments, rejecting headers that disagree with its length
    pub fn parse(packet: &'a [u8]) -> Result<Self> {
        let header = PacketHeader::parse(packet)?;

        if header.len_key == 0 {
            return Err(HybridError::InvalidFormat("wrapped key is empty".into()));
        }
        if header.len_iv as usize != IV_LEN {
            return Err(HybridError::InvalidFormat(format!(
                "IV must be {} bytes, header says {}",
                IV_LEN, header.len_iv
            )));
        }

        let body = header
            .body_offset()
            .filter(|&offset| offset <= packet.len())
            .ok_or_else(|| {
                HybridError::InvalidFormat(format!(
                    "header declares {} + {} bytes but packet has only {} after the header",
                    header.len_key,
                    header.len_iv,
                    packet.len() - HEADER_LEN
                ))
            })?;

        let key_end = HEADER_LEN + header.len_key as usize;
        Ok(Self {
            header,
            wrapped_key: &packet[HEADER_LEN..key_end],
            iv: &packet[key_end..body],
            ciphertext: &packet[body..],
        })
    }
}

/// Encrypt `plaintext` for the holder of `keypair`'s private key
///
/// Only the public half is used, so public-only keys work.
pub fn encrypt(keypair: &KeyPair, plaintext: &[u8]) -> Result<Vec<u8>> {
    let key = SecureBytes::random(AES_KEY_LEN);
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);

    encrypt_with_key(keypair, plaintext, &key, &iv)
}

/// [`encrypt`] with a caller-chosen AES key and IV
pub(crate) fn encrypt_with_key(
    keypair: &KeyPair,
    plaintext: &[u8],
    key: &[u8],
    iv: &[u8],
) -> Result<Vec<u8>> {
    let wrapped_key = keypair
        .public_key()
        .encrypt(&mut OsRng, Pkcs1v15Encrypt, key)
        .map_err(|e| {
            HybridError::InvalidParameter(format!(
                "cannot wrap the symmetric key with a {}-bit key: {}",
                keypair.key_size(),
                e
            ))
        })?;

    let header = PacketHeader::new(wrapped_key.len(), iv.len())?;

    let mut packet = Vec::with_capacity(
        HEADER_LEN + wrapped_key.len() + iv.len() + ciphertext_len(plaintext.len()),
    );
    packet.extend_from_slice(&header.encode());
    packet.extend_from_slice(&wrapped_key);
    packet.extend_from_slice(iv);
    cbc_encrypt(key, iv, plaintext, &mut packet)?;

    Ok(packet)
}

/// Decrypt a packet produced by [`encrypt`]
///
/// # Errors
/// - `InvalidOperation` if `keypair` is public-only
/// - `InvalidFormat` if the header disagrees with the packet length
/// - `DecryptionFailed` on a wrong key, a corrupted wrapped key or bad padding
pub fn decrypt(keypair: &KeyPair, packet: &[u8]) -> Result<SecureBytes> {
    let private = keypair.private_key("Decryption")?;
    let packet = Packet::parse(packet)?;

    let key = SecureBytes::new(
        private
            .decrypt_blinded(&mut OsRng, Pkcs1v15Encrypt, packet.wrapped_key)
            .map_err(|_| HybridError::DecryptionFailed)?,
    );
    if key.len() != AES_KEY_LEN {
        return Err(HybridError::DecryptionFailed);
    }

    cbc_decrypt(&key, packet.iv, packet.ciphertext)
}

fn cbc_encrypt(key: &[u8], iv: &[u8], plaintext: &[u8], out: &mut Vec<u8>) -> Result<()> {
    let mut cipher = Aes256CbcEnc::new_from_slices(key, iv).map_err(|_| {
        HybridError::InvalidParameter(format!(
            "AES-256-CBC needs a {}-byte key and a {}-byte IV",
            AES_KEY_LEN, IV_LEN
        ))
    })?;

    let mut block = Block::default();
    let mut chunks = plaintext.chunks_exact(BLOCK_LEN);
    for chunk in &mut chunks {
        block.copy_from_slice(chunk);
        cipher.encrypt_block_mut(&mut block);
        out.extend_from_slice(&block);
    }

    // Final block always carries padding, a whole block of it for aligned input
    let remainder = chunks.remainder();
    block = Block::default();
    block[..remainder.len()].copy_from_slice(remainder);
    Pkcs7::pad(&mut block, remainder.len());
    cipher.encrypt_block_mut(&mut block);
    out.extend_from_slice(&block);

    Ok(())
}

fn cbc_decrypt(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<SecureBytes> {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
        return Err(HybridError::DecryptionFailed);
    }

    let mut cipher =
        Aes256CbcDec::new_from_slices(key, iv).map_err(|_| HybridError::DecryptionFailed)?;

    let (body, last) = ciphertext.split_at(ciphertext.len() - BLOCK_LEN);
    let mut plaintext = Zeroizing::new(Vec::with_capacity(ciphertext.len()));
    let mut block = Block::default();

    for chunk in body.chunks_exact(BLOCK_LEN) {
        block.copy_from_slice(chunk);
        cipher.decrypt_block_mut(&mut block);
        plaintext.extend_from_slice(&block);
    }

    block.copy_from_slice(last);
    cipher.decrypt_block_mut(&mut block);
    let unpadded = Pkcs7::unpad(&block).map(|tail| plaintext.extend_from_slice(tail));
    block.as_mut_slice().zeroize();
    unpadded.map_err(|_| HybridError::DecryptionFailed)?;

    Ok(SecureBytes::new(std::mem::take(&mut *plaintext)))
}
