//! Unique identifier generation.

use std::hash::{BuildHasher, Hasher, RandomState};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

fn scramble(seed: u64) -> u64 {
    let mut hasher = RandomState::new().build_hasher();
    hasher.write_u64(seed);
    hasher.finish()
}

/// Generate a 50-character unique id.
///
/// Layout: 15 decimal digits of milliseconds since the epoch, 32 hex digits
/// of per-process entropy, and a constant "000" tail. Ids generated on one
/// process sort roughly by creation time.
pub fn next_id() -> String {
    let millis: u64 = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|d| u64::try_from(d.as_millis()).ok())
        .unwrap_or(0);
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let a = scramble(seq);
    let b = scramble(seq ^ millis);
    format!("{millis:015}{a:016x}{b:016x}000")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_fifty_chars_and_unique() {
        let first = next_id();
        let second = next_id();

        assert_eq!(first.len(), 50);
        assert_eq!(second.len(), 50);
        assert_ne!(first, second);
        assert!(first.ends_with("000"));
    }
}
