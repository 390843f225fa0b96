//! Randomized response delay for account endpoints that reveal whether an
//! account exists.

use rand::Rng;
use std::time::Duration;

use crate::config::SecurityConfig;

/// Pick a uniformly random duration in `[delay_min_ms, delay_max_ms]`.
pub fn pick_delay(config: &SecurityConfig) -> Duration {
    if config.delay_max_ms <= config.delay_min_ms {
        return Duration::from_millis(config.delay_min_ms);
    }
    let ms = rand::thread_rng().gen_range(config.delay_min_ms..=config.delay_max_ms);
    Duration::from_millis(ms)
}

/// Sleep for a random duration from the configured window.
pub async fn random_delay(config: &SecurityConfig) {
    let delay = pick_delay(config);
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
