//! Loot spawn-count policy

use std::time::Duration;

/// Decides how many loot items to add on a tick.
///
/// The chance of spawning grows with the time elapsed relative to the base
/// interval, compounding `probability` once per elapsed interval. The count
/// never exceeds the shortage of loot relative to the number of looters.
#[derive(Debug, Clone, Copy)]
pub struct LootGenerator {
    base_interval: Duration,
    probability: f64,
}

impl LootGenerator {
    pub fn new(base_interval: Duration, probability: f64) -> Self {
        Self {
            base_interval,
            probability: probability.clamp(0.0, 1.0),
        }
    }

    /// Number of loot items to add after `time_delta` without spawning.
    pub fn generate(&self, time_delta: Duration, loot_count: u32, looter_count: u32) -> u32 {
        self.generate_with(time_delta, loot_count, looter_count, 1.0)
    }

    /// Same as [`generate`](Self::generate) with the spawn chance scaled by `random` in `[0, 1]`.
    pub fn generate_with(
        &self,
        time_delta: Duration,
        loot_count: u32,
        looter_count: u32,
        random: f64,
    ) -> u32 {
        let shortage = looter_count.saturating_sub(loot_count);
        if shortage == 0 || time_delta.is_zero() {
            return 0;
        }

        let ratio = if self.base_interval.is_zero() {
            f64::INFINITY
        } else {
            time_delta.as_secs_f64() / self.base_interval.as_secs_f64()
        };

        let chance = ((1.0 - (1.0 - self.probability).powf(ratio)) * random).clamp(0.0, 1.0);
        let generated = (f64::from(shortage) * chance).round() as u32;
        generated.min(shortage)
    }
}
