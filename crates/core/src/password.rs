//! Salted PBKDF2-HMAC-SHA256 password hashing.
//!
//! Encoded form: `pbkdf2-sha256$<iterations>$<salt hex>$<digest hex>`. The
//! iteration count is stored alongside the digest so it can be raised later
//! without invalidating existing credentials.

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const SCHEME: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;
const KEY_LEN: usize = 32;
pub const DEFAULT_ITERATIONS: u32 = 100_000;

#[derive(Clone, Copy, Debug)]
pub struct PasswordHasher {
    iterations: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self { iterations: DEFAULT_ITERATIONS }
    }
}

impl PasswordHasher {
    /// Iteration counts below 1 are clamped; tests may use small values.
    pub fn new(iterations: u32) -> Self {
        Self { iterations: iterations.max(1) }
    }

    pub fn hash(&self, password: &str) -> String {
        let mut salt = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        let digest = derive_key(password.as_bytes(), &salt, self.iterations);
        format!("{SCHEME}${}${}${}", self.iterations, encode_hex(&salt), encode_hex(&digest))
    }

    /// Verification honors the iteration count embedded in `encoded`, not
    /// the hasher's own, so old hashes stay verifiable after a bump.
    pub fn verify(&self, password: &str, encoded: &str) -> bool {
        let mut parts = encoded.split('$');
        let (Some(scheme), Some(iterations), Some(salt), Some(expected), None) =
            (parts.next(), parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return false;
        };
        if scheme != SCHEME {
            return false;
        }
        let Ok(iterations) = iterations.parse::<u32>() else {
            return false;
        };
        let (Some(salt), Some(expected)) = (decode_hex(salt), decode_hex(expected)) else {
            return false;
        };

        let digest = derive_key(password.as_bytes(), &salt, iterations.max(1));
        constant_time_eq(&digest, &expected)
    }
}

/// PBKDF2 with a single 32-byte output block (RFC 2898 §5.2).
fn derive_key(password: &[u8], salt: &[u8], iterations: u32) -> [u8; KEY_LEN] {
    let mut block_input = Vec::with_capacity(salt.len() + 4);
    block_input.extend_from_slice(salt);
    block_input.extend_from_slice(&1u32.to_be_bytes());

    let mut round = prf(password, &block_input);
    let mut output = round;
    for _ in 1..iterations {
        round = prf(password, &round);
        for (acc, byte) in output.iter_mut().zip(round.iter()) {
            *acc ^= byte;
        }
    }
    output
}

fn prf(key: &[u8], message: &[u8]) -> [u8; KEY_LEN] {
    let mut out = [0u8; KEY_LEN];
    // HMAC-SHA256 accepts keys of any length.
    if let Ok(mut mac) = HmacSha256::new_from_slice(key) {
        mac.update(message);
        out.copy_from_slice(&mac.finalize().into_bytes());
    }
    out
}

fn constant_time_eq(left: &[u8], right: &[u8]) -> bool {
    if left.len() != right.len() {
        return false;
    }
    left.iter().zip(right.iter()).fold(0u8, |acc, (a, b)| acc | (a ^ b)) == 0
}

fn encode_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}

fn decode_hex(input: &str) -> Option<Vec<u8>> {
    if input.len() % 2 != 0 {
        return None;
    }
    (0..input.len())
        .step_by(2)
        .map(|index| u8::from_str_radix(&input[index..index + 2], 16).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::PasswordHasher;

    #[test]
    fn round_trips_a_password() {
        let hasher = PasswordHasher::new(1_000);
        let encoded = hasher.hash("s3cure-pass");

        assert!(hasher.verify("s3cure-pass", &encoded));
        assert!(!hasher.verify("wrong-pass", &encoded));
    }

    #[test]
    fn same_password_hashes_differently_per_salt() {
        let hasher = PasswordHasher::new(1_000);
        assert_ne!(hasher.hash("s3cure-pass"), hasher.hash("s3cure-pass"));
    }

    #[test]
    fn verify_honors_embedded_iteration_count() {
        let old = PasswordHasher::new(500).hash("s3cure-pass");
        // A hasher configured with a higher count still verifies old hashes.
        assert!(PasswordHasher::new(2_000).verify("s3cure-pass", &old));
    }

    #[test]
    fn rejects_malformed_encodings() {
        let hasher = PasswordHasher::new(1_000);
        for bad in ["", "plain", "pbkdf2-sha256$x$00$00", "md5$1000$00$00"] {
            assert!(!hasher.verify("anything", bad), "{bad} should be rejected");
        }
    }
}
