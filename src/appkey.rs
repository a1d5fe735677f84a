//! Application key generation.
//!
//! The key authenticates local API calls between the vanity client and the
//! yagna agent. It is generated exactly once per provisioning run and the
//! same value is threaded into every file that needs it.

use std::fmt;

use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};

/// Fixed length of a generated application key.
pub const APP_KEY_LEN: usize = 12;

/// A freshly generated application key.
///
/// Not persisted anywhere by this tool; re-running produces a new key, so
/// existing clients must be re-provisioned (deliberate rotation semantics).
#[derive(Clone, PartialEq, Eq)]
pub struct AppKey(String);

impl AppKey {
    /// Generate a key of [`APP_KEY_LEN`] characters drawn uniformly from
    /// `[A-Za-z0-9]`. `thread_rng` is OS-seeded and cryptographically
    /// secure; if the OS entropy source is unavailable it panics, which is
    /// the required fatal behavior.
    #[must_use]
    pub fn generate() -> Self {
        let key = thread_rng()
            .sample_iter(&Alphanumeric)
            .take(APP_KEY_LEN)
            .map(char::from)
            .collect();
        Self(key)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Keep the secret out of debug output and error chains.
impl fmt::Debug for AppKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AppKey(****)")
    }
}
