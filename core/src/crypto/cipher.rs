//! Symmetric payload encryption using AES-256 in CFB mode
//!
//! Peers never exchange keys or IVs. Both are derived from material every
//! peer already has: the key from the shared secret, the IV from a fixed
//! seed. A consequence is that identical plaintexts under the same secret
//! always encrypt to identical ciphertexts; this is a known weakening kept so
//! that independently started peers interoperate without a handshake.

use std::path::{Path, PathBuf};

use aes::Aes256;
use cfb_mode::cipher::{AsyncStreamCipher, KeyIvInit};
use cfb_mode::{Decryptor, Encryptor};
use sha2::{Digest, Sha256};

use crate::protocol::constants::{IV_SEED, KEY_SALT};
use crate::{Error, Result};

pub const KEY_SIZE: usize = 32;
pub const IV_SIZE: usize = 16;

/// Shared secret the key is derived from
#[derive(Clone, PartialEq, Eq)]
pub enum Secret {
    Passphrase(String),
    /// Raw bytes of a file every peer holds a copy of
    KeyFile(PathBuf),
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Secret::Passphrase(_) => f.write_str("Passphrase(..)"),
            Secret::KeyFile(path) => f.debug_tuple("KeyFile").field(path).finish(),
        }
    }
}

impl Secret {
    /// Bytes that get hashed (after the salt) into the key
    fn material(&self) -> Result<Vec<u8>> {
        match self {
            Secret::Passphrase(passphrase) => Ok(passphrase.as_bytes().to_vec()),
            Secret::KeyFile(path) => read_key_file(path),
        }
    }
}

fn read_key_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path)
        .map_err(|e| Error::Crypto(format!("cannot read key file {}: {}", path.display(), e)))
}

/// Hash `salt || secret` into a 256-bit key.
pub fn derive_key(secret: &[u8], salt: &[u8]) -> [u8; KEY_SIZE] {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(secret);
    hasher.finalize().into()
}

/// The IV every peer uses.
///
/// Each byte is bits 16..24 of successive outputs of the minimal standard
/// generator (`x = x * 48271 mod 2^31 - 1`) seeded with [`IV_SEED`].
///
/// The IV never changes, so two clips under the same key share a keystream.
pub fn derive_iv() -> [u8; IV_SIZE] {
    const MODULUS: u64 = 2_147_483_647;
    const MULTIPLIER: u64 = 48_271;

    let mut state = u64::from(IV_SEED) % MODULUS;
    if state == 0 {
        state = 1;
    }

    let mut iv = [0u8; IV_SIZE];
    for byte in iv.iter_mut() {
        state = state * MULTIPLIER % MODULUS;
        *byte = (state >> 16) as u8;
    }
    iv
}

/// Key and IV for one joined session.
///
/// Immutable once built; changing the secret means building a new context.
#[derive(Clone)]
pub struct CipherContext {
    key: [u8; KEY_SIZE],
    iv: [u8; IV_SIZE],
}

impl std::fmt::Debug for CipherContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipherContext").finish_non_exhaustive()
    }
}

impl CipherContext {
    /// Build a context from a shared secret.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Crypto`] when a key file cannot be read.
    pub fn from_secret(secret: &Secret) -> Result<Self> {
        let material = secret.material()?;
        Ok(Self::from_key(derive_key(&material, KEY_SALT)))
    }

    pub fn from_passphrase(passphrase: &str) -> Self {
        Self::from_key(derive_key(passphrase.as_bytes(), KEY_SALT))
    }

    pub fn from_key(key: [u8; KEY_SIZE]) -> Self {
        Self { key, iv: derive_iv() }
    }

    /// Encrypt; ciphertext is exactly as long as the plaintext.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let cipher = Encryptor::<Aes256>::new_from_slices(&self.key, &self.iv)
            .map_err(|e| Error::Crypto(format!("cipher setup failed: {}", e)))?;

        let mut buf = plaintext.to_vec();
        cipher.encrypt(&mut buf);
        Ok(buf)
    }

    /// Decrypt.
    ///
    /// Input that was not produced under the same key yields garbage rather
    /// than an error; the caller validates the structure of the result.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        let cipher = Decryptor::<Aes256>::new_from_slices(&self.key, &self.iv)
            .map_err(|e| Error::Crypto(format!("cipher setup failed: {}", e)))?;

        let mut buf = ciphertext.to_vec();
        cipher.decrypt(&mut buf);
        Ok(buf)
    }
}
