//! AES-256-GCM encryption and Argon2id PIN hashing (spec.md §4.1).
//!
//! These four operations are the only thing this crate exposes. Callers
//! (`fincore-cardvault`) never see key material or Argon2 internals beyond
//! this boundary.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng as AesOsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use argon2::password_hash::{rand_core::OsRng as PwOsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

use fincore_config::Argon2Params;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const PIN_HASH_OUTPUT_LEN: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("AES key must be exactly 32 bytes")]
    Init,
    #[error("failed to source randomness from the OS RNG")]
    Random,
    #[error("ciphertext failed GCM authentication")]
    Auth,
    #[error("ciphertext blob is shorter than nonce+tag")]
    Malformed,
    #[error("Argon2 parameters are invalid: {0}")]
    BadParams(String),
}

impl From<CryptoError> for fincore_error::Error {
    fn from(e: CryptoError) -> Self {
        fincore_error::Error::crypto_fail().with_detail(e.to_string())
    }
}

/// AES-256-GCM encrypt with a fresh random 12-byte nonce.
///
/// Returns `nonce ‖ ciphertext ‖ tag`. The blob's internal framing is
/// opaque to every caller outside this module (spec.md §9).
pub fn encrypt(plaintext: &[u8], key: &[u8; 32]) -> Result<Vec<u8>, CryptoError> {
    let cipher_key = Key::<Aes256Gcm>::from_slice(key);
    let cipher = Aes256Gcm::new(cipher_key);
    let nonce = Aes256Gcm::generate_nonce(&mut AesOsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|_| CryptoError::Random)?;

    let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    blob.extend_from_slice(nonce.as_slice());
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// AES-256-GCM decrypt; authenticates the tag before returning plaintext.
pub fn decrypt(blob: &[u8], key: &[u8; 32]) -> Result<Vec<u8>, CryptoError> {
    if blob.len() < NONCE_LEN + TAG_LEN {
        return Err(CryptoError::Malformed);
    }
    let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);
    let nonce = Nonce::from_slice(nonce_bytes);
    let cipher_key = Key::<Aes256Gcm>::from_slice(key);
    let cipher = Aes256Gcm::new(cipher_key);
    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| CryptoError::Auth)
}

/// Argon2id-hash a PIN with the process-wide cost parameters, encoding
/// salt and hash as the standard PHC string.
pub fn hash_pin(pin: &str, params: Argon2Params) -> Result<String, CryptoError> {
    let argon2_params = Params::new(
        params.memory_kib,
        params.time_cost,
        params.parallelism,
        Some(PIN_HASH_OUTPUT_LEN),
    )
    .map_err(|e| CryptoError::BadParams(e.to_string()))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);
    let salt = SaltString::generate(&mut PwOsRng);
    let hash = argon2
        .hash_password(pin.as_bytes(), &salt)
        .map_err(|e| CryptoError::BadParams(e.to_string()))?;
    Ok(hash.to_string())
}

/// Verify a PIN against its encoded Argon2id hash in constant time.
/// Returns `false` on mismatch; only fails if `encoded` cannot be parsed.
pub fn verify_pin(pin: &str, encoded: &str) -> Result<bool, CryptoError> {
    let parsed = PasswordHash::new(encoded).map_err(|_| CryptoError::Malformed)?;
    let argon2 = Argon2::default();
    Ok(argon2.verify_password(pin.as_bytes(), &parsed).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> [u8; 32] {
        [0x42u8; 32]
    }

    #[test]
    fn round_trip() {
        let k = key();
        let plaintext = b"4111111111111111";
        let ct = encrypt(plaintext, &k).unwrap();
        let pt = decrypt(&ct, &k).unwrap();
        assert_eq!(pt, plaintext);
    }

    #[test]
    fn nonces_are_fresh_each_call() {
        let k = key();
        let a = encrypt(b"hello", &k).unwrap();
        let b = encrypt(b"hello", &k).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn tamper_fails_authentication() {
        let k = key();
        let mut ct = encrypt(b"secret cvv", &k).unwrap();
        let last = ct.len() - 1;
        ct[last] ^= 0xff;
        assert!(matches!(decrypt(&ct, &k), Err(CryptoError::Auth)));
    }

    #[test]
    fn short_blob_is_malformed() {
        let k = key();
        assert!(matches!(decrypt(&[1, 2, 3], &k), Err(CryptoError::Malformed)));
    }

    #[test]
    fn pin_round_trip() {
        let params = Argon2Params::default();
        let encoded = hash_pin("1357", params).unwrap();
        assert!(encoded.starts_with("$argon2id$v=19$"));
        assert!(verify_pin("1357", &encoded).unwrap());
        assert!(!verify_pin("7531", &encoded).unwrap());
    }

    #[test]
    fn verify_pin_rejects_garbage_encoding() {
        assert!(verify_pin("1234", "not-a-phc-string").is_err());
    }
}
