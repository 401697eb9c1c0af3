use super::transaction::{MASKED_PAN, NONCE_MAX_LEN, NONCE_MIN_LEN, Nonce};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, MutexGuard};

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Process-scoped source for every random identifier the gateway and the
/// terminal emit.
///
/// All draws are uniform: nonce length over `[8, 16]` and each nonce
/// character over the uppercase hex alphabet, auth codes over
/// `100000..=999999`, RRNs over all twelve-digit strings (leading zeros
/// included).
pub struct IdentifierGenerator {
    rng: Mutex<StdRng>,
}

impl IdentifierGenerator {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic generator for tests.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn rng(&self) -> MutexGuard<'_, StdRng> {
        // A panic mid-draw leaves the RNG state valid.
        self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn nonce(&self) -> Nonce {
        let mut rng = self.rng();
        let len = rng.gen_range(NONCE_MIN_LEN..=NONCE_MAX_LEN);
        let raw: String = (0..len)
            .map(|_| HEX_DIGITS[rng.gen_range(0..HEX_DIGITS.len())] as char)
            .collect();
        Nonce::from_generated(raw)
    }

    pub fn auth_code(&self) -> String {
        let code: u32 = self.rng().gen_range(100_000..=999_999);
        code.to_string()
    }

    pub fn rrn(&self) -> String {
        let rrn: u64 = self.rng().gen_range(0..1_000_000_000_000);
        format!("{rrn:012}")
    }

    pub fn masked_pan(&self) -> String {
        MASKED_PAN.to_string()
    }
}

impl Default for IdentifierGenerator {
    fn default() -> Self {
        Self::new()
    }
}
