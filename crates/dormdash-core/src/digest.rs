//! # Password Digest
//!
//! One-way, salted transform of a password. The store only ever sees the
//! digest; verification re-derives it from the candidate password and the
//! stored salt and compares in constant time.
//!
//! ## Format
//!
//! `sha256:<salt>:<hash>` where `salt` is 16 random bytes and `hash` is
//! `SHA-256(salt || password)`, both lowercase hex. The string form is
//! stable: 7 + 32 + 1 + 64 characters.
//!
//! [`PasswordDigest::derive`] is deterministic for a fixed salt, which is
//! what equality-only comparison needs. [`PasswordDigest::new`] draws a
//! fresh salt, so two users with the same password do not share a digest.

use std::fmt;
use std::str::FromStr;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::ValidationError;

const SCHEME: &str = "sha256";
const SALT_LEN: usize = 16;

/// A salted SHA-256 password digest.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PasswordDigest {
    salt: [u8; SALT_LEN],
    hash: [u8; 32],
}

impl PasswordDigest {
    /// Digest a password under a freshly drawn random salt.
    pub fn new(password: &str) -> Self {
        let mut salt = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        Self::derive(password, salt)
    }

    /// Digest a password under the given salt.
    pub fn derive(password: &str, salt: [u8; SALT_LEN]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(salt);
        hasher.update(password.as_bytes());
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&hasher.finalize());
        Self { salt, hash }
    }

    /// Whether `password` produces this digest.
    pub fn verify(&self, password: &str) -> bool {
        let candidate = Self::derive(password, self.salt);
        candidate.hash.ct_eq(&self.hash).into()
    }

    /// The salt this digest was derived under.
    pub fn salt(&self) -> [u8; SALT_LEN] {
        self.salt
    }
}

// The hash stays out of Debug output so digests never end up in logs.
impl fmt::Debug for PasswordDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordDigest")
            .field("scheme", &SCHEME)
            .field("hash", &"[REDACTED]")
            .finish()
    }
}

impl fmt::Display for PasswordDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SCHEME}:{}:{}", to_hex(&self.salt), to_hex(&self.hash))
    }
}

impl FromStr for PasswordDigest {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        let (Some(SCHEME), Some(salt_hex), Some(hash_hex), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(ValidationError::MalformedDigest);
        };
        let mut salt = [0u8; SALT_LEN];
        let mut hash = [0u8; 32];
        from_hex(salt_hex, &mut salt)?;
        from_hex(hash_hex, &mut hash)?;
        Ok(Self { salt, hash })
    }
}

impl TryFrom<String> for PasswordDigest {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PasswordDigest> for String {
    fn from(value: PasswordDigest) -> Self {
        value.to_string()
    }
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn from_hex(s: &str, out: &mut [u8]) -> Result<(), ValidationError> {
    if s.len() != out.len() * 2 || !s.is_ascii() {
        return Err(ValidationError::MalformedDigest);
    }
    for (i, byte) in out.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16)
            .map_err(|_| ValidationError::MalformedDigest)?;
    }
    Ok(())
}
