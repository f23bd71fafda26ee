//! Cryptographic primitives for ClipNet
//!
//! - SHA-256 to stretch a passphrase or key file into a key
//! - AES-256-CFB for payload encryption

mod cipher;

pub use cipher::{derive_iv, derive_key, CipherContext, Secret, IV_SIZE, KEY_SIZE};
