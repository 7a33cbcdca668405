//! Exponential backoff with jitter for rate-limited classifier calls.
//!
//! Kept as pure functions so retry pacing stays a single, testable
//! parameter instead of being buried in call sites.

use rand::Rng;
use std::time::Duration;

/// Upper bound (exclusive) on the random jitter added to each wait.
pub const MAX_JITTER: Duration = Duration::from_secs(1);

/// Exponent cap so pathological attempt counters cannot overflow the
/// shift. 2^16 seconds is already far beyond any sane retry budget.
const MAX_EXPONENT: u32 = 16;

/// Base wait before retry `attempt` (zero-indexed): `2^attempt` seconds.
pub fn base_delay(attempt: u32) -> Duration {
    Duration::from_secs(1u64 << attempt.min(MAX_EXPONENT))
}

/// Base wait plus uniform jitter in `[0, MAX_JITTER)`.
pub fn jittered_delay<R: Rng + ?Sized>(attempt: u32, rng: &mut R) -> Duration {
    let jitter_ms = rng.random_range(0..MAX_JITTER.as_millis() as u64);
    base_delay(attempt) + Duration::from_millis(jitter_ms)
}
