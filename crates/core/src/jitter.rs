//! Randomised start conditions: delay jitter plus locale and User-Agent rotation

use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;

/// Uniform delay in `[0, max_ms)`; zero when `max_ms` is zero
pub fn jitter_delay(max_ms: u64) -> Duration {
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..max_ms))
}

/// Uniform pick from a rotation list; `None` when the list is empty
pub fn pick_one(options: &[String]) -> Option<&str> {
    options.choose(&mut rand::thread_rng()).map(String::as_str)
}
