//! Key material for the simulated pipeline
//!
//! Two 256-bit random byte strings are drawn per simulator. They never
//! transform data; they only decide who may call the obfuscate and
//! de-obfuscate stages, so a real FHE backend could later take their place
//! without changing the call shape.

use rand::rngs::OsRng;
use rand::RngCore;
use secrecy::{ExposeSecret, Secret};

/// Key length in bytes
pub const KEY_BYTES: usize = 32;

/// Public half of the key pair
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey([u8; KEY_BYTES]);

impl PublicKey {
    pub fn as_bytes(&self) -> &[u8; KEY_BYTES] {
        &self.0
    }

    /// Short hex prefix for logs and traces
    pub fn fingerprint(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PublicKey({})", self.fingerprint())
    }
}

/// Secret half of the key pair; the bytes are zeroized on drop
pub struct SecretKey(Secret<[u8; KEY_BYTES]>);

impl SecretKey {
    pub(crate) fn matches(&self, other: &SecretKey) -> bool {
        self.0.expose_secret() == other.0.expose_secret()
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretKey([REDACTED])")
    }
}

/// Process-scoped key pair held by one simulator
#[derive(Debug)]
pub struct KeyPair {
    pub public_key: PublicKey,
    pub secret_key: SecretKey,
}

impl KeyPair {
    /// Draw both keys from the operating system RNG
    pub fn generate() -> Self {
        let mut public = [0u8; KEY_BYTES];
        let mut secret = [0u8; KEY_BYTES];
        OsRng.fill_bytes(&mut public);
        OsRng.fill_bytes(&mut secret);
        Self {
            public_key: PublicKey(public),
            secret_key: SecretKey(Secret::new(secret)),
        }
    }
}
