use crate::config::{BatchLimit, DelayRange};
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

/// Source of every random decision the bot makes: batch sizes and the
/// humanized pauses between page mutations.
///
/// Seeding it makes a run's batch sizes reproducible.
pub struct Pacer {
    rng: StdRng,
    step: DelayRange,
}

impl Pacer {
    pub fn new(step: DelayRange, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng, step }
    }

    /// Draws a batch size in `[min, max]`.
    pub fn draw(&mut self, limit: BatchLimit) -> u32 {
        if limit.max <= limit.min {
            return limit.min;
        }
        self.rng.gen_range(limit.min..=limit.max)
    }

    pub fn delay_in(&mut self, range: DelayRange) -> Duration {
        if range.max_ms <= range.min_ms {
            return Duration::from_millis(range.min_ms);
        }
        Duration::from_millis(self.rng.gen_range(range.min_ms..=range.max_ms))
    }

    pub fn step_delay(&mut self) -> Duration {
        self.delay_in(self.step)
    }

    /// Sleeps a humanized step delay. Nothing else runs meanwhile.
    pub async fn humanize(&mut self) {
        let delay = self.step_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    /// Sleeps a random duration in `range`.
    pub async fn wait_in(&mut self, range: DelayRange) {
        let delay = self.delay_in(range);
        debug!("Waiting {:.1}s", delay.as_secs_f64());
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}
