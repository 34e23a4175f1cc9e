//! Probabilistic loot spawner.
//!
//! The generator keeps loot supply tracking the number of gatherers: over a
//! long run each gatherer sees roughly `probability` new loots per `period`.
//! It accumulates elapsed time across calls and converts it into a spawn
//! probability, so short ticks still add up to the configured rate.

/// Stateful spawn-count generator driven by the tick loop.
#[derive(Debug)]
pub struct LootGenerator {
    period_ms: u64,
    probability: f64,
    time_without_loot_ms: u64,
}

impl LootGenerator {
    /// `period_ms` must be non-zero; `probability` is clamped to [0, 1].
    pub fn new(period_ms: u64, probability: f64) -> Self {
        Self {
            period_ms: period_ms.max(1),
            probability: probability.clamp(0.0, 1.0),
            time_without_loot_ms: 0,
        }
    }

    /// Number of loots to spawn after `delta_ms` with `loot_count` items on
    /// the ground and `looter_count` gatherers in the session.
    ///
    /// Returns 0 whenever there is no shortage, in particular when
    /// `looter_count` is 0. The internal clock resets every time loot is
    /// actually produced.
    pub fn generate(&mut self, delta_ms: u64, loot_count: usize, looter_count: usize) -> usize {
        self.time_without_loot_ms += delta_ms;

        let shortage = looter_count.saturating_sub(loot_count);
        let ratio = self.time_without_loot_ms as f64 / self.period_ms as f64;
        let probability = (1.0 - (1.0 - self.probability).powf(ratio)).clamp(0.0, 1.0);
        let generated = (shortage as f64 * probability).round() as usize;

        if generated > 0 {
            self.time_without_loot_ms = 0;
        }
        generated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_gatherers_means_no_loot() {
        let mut gen = LootGenerator::new(5000, 1.0);
        assert_eq!(gen.generate(10_000, 0, 0), 0);
        assert_eq!(gen.generate(10_000, 3, 0), 0);
    }

    #[test]
    fn certain_probability_fills_the_shortage_after_one_period() {
        let mut gen = LootGenerator::new(1000, 1.0);
        assert_eq!(gen.generate(1000, 0, 4), 4);
    }

    #[test]
    fn no_shortage_spawns_nothing() {
        let mut gen = LootGenerator::new(1000, 1.0);
        assert_eq!(gen.generate(1000, 5, 5), 0);
        assert_eq!(gen.generate(1000, 7, 5), 0);
    }

    #[test]
    fn elapsed_time_accumulates_across_calls() {
        // With p = 0.5 per second, 250 ms slices eventually push the
        // cumulative probability over the rounding threshold.
        let mut gen = LootGenerator::new(1000, 0.5);
        let mut spawned = 0;
        for _ in 0..8 {
            spawned += gen.generate(250, 0, 1);
        }
        assert!(spawned >= 1);
    }

    #[test]
    fn clock_resets_after_spawning() {
        let mut gen = LootGenerator::new(1000, 1.0);
        assert_eq!(gen.generate(1000, 0, 1), 1);
        // Immediately after a spawn the accumulated interval is gone, so a
        // zero-length tick produces nothing.
        assert_eq!(gen.generate(0, 0, 1), 0);
    }

    #[test]
    fn long_run_rate_approaches_the_configured_probability() {
        let mut gen = LootGenerator::new(1000, 0.25);
        let mut spawned = 0usize;
        // 100 seconds of one gatherer picking everything up immediately.
        for _ in 0..1000 {
            spawned += gen.generate(100, 0, 1);
        }
        // Expected about 25 spawns; allow generous slack for rounding.
        assert!(spawned >= 10 && spawned <= 60, "spawned {}", spawned);
    }
}
