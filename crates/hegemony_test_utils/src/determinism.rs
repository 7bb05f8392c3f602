//! Determinism testing utilities.
//!
//! Provides a harness for verifying that engagement resolution
//! produces identical results given identical inputs.
//!
//! # Testing Strategy
//!
//! Replays and records depend on resolution being 100% reproducible.
//! Sources of non-determinism include:
//!
//! - **Global randomness**: every roll must come from the injected
//!   [`Dice`](hegemony_core::dice::Dice); a stray `thread_rng` breaks replay.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Units are always visited in sorted id order and bundles use `BTreeMap`.
//!
//! - **Shared state between engagements**: the engine holds none, so runs on
//!   separate threads must agree with sequential runs.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: individual phase determinism with scripted dice
//! 2. **Property tests**: random forces must still resolve deterministically
//! 3. **Integration tests**: full engagements are reproducible from a seed
//! 4. **Parallel tests**: running N engagements in parallel all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use hegemony_core::battle::{Battle, BattleEngine, BattleState, EngagementResult, EngagementSetup};
use hegemony_core::dice::SeededDice;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Seed every run used.
    pub seed: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic engine).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that resolution was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Engagement is non-deterministic!\n\
                 Runs: {}\n\
                 Seed: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.seed,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Result of parallel engagement runs.
#[derive(Debug, Clone)]
pub struct ParallelRunResult {
    /// Result digest from each run.
    pub hashes: Vec<u64>,
    /// Seed every run used.
    pub seed: u64,
    /// Number of runs.
    pub num_runs: usize,
}

impl ParallelRunResult {
    /// Check if all runs produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Assert all runs matched.
    ///
    /// # Panics
    ///
    /// Panics if runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic() {
            let mut unique: Vec<u64> = self.hashes.clone();
            unique.sort_unstable();
            unique.dedup();
            panic!(
                "Parallel engagements diverged!\n\
                 Runs: {}\n\
                 Seed: {}\n\
                 Unique hashes: {}\n\
                 All hashes: {:?}",
                self.num_runs,
                self.seed,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a computation multiple times and verify its hash never changes.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `seed` - Seed reported back in the result
/// * `run` - Produces the value to compare
/// * `hash` - Hashes that value
///
/// # Example
///
/// ```ignore
/// use hegemony_test_utils::determinism::verify_determinism;
///
/// let result = verify_determinism(
///     5,
///     seed,
///     || engine.resolve_seeded(&setup, seed).unwrap(),
///     EngagementResult::digest,
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<T, Run, HashFn>(
    runs: usize,
    seed: u64,
    run: Run,
    hash: HashFn,
) -> DeterminismResult
where
    Run: Fn() -> T,
    HashFn: Fn(&T) -> u64,
{
    let hashes: Vec<u64> = (0..runs).map(|_| hash(&run())).collect();
    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        seed,
    }
}

/// Resolve one engagement `runs` times with the same seed.
///
/// # Panics
///
/// Panics if the engine rejects the setup.
#[must_use]
pub fn verify_engagement_determinism(
    engine: &BattleEngine,
    setup: &EngagementSetup,
    seed: u64,
    runs: usize,
) -> DeterminismResult {
    verify_determinism(
        runs,
        seed,
        || resolve(engine, setup, seed),
        EngagementResult::digest,
    )
}

/// Resolve the same engagement on `num_runs` scoped threads.
///
/// Catches any hidden state shared between engagements.
///
/// # Panics
///
/// Panics if the engine rejects the setup or a worker thread panics.
#[must_use]
pub fn run_parallel_engagements(
    engine: &BattleEngine,
    setup: &EngagementSetup,
    seed: u64,
    num_runs: usize,
) -> ParallelRunResult {
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_runs)
            .map(|_| s.spawn(|| resolve(engine, setup, seed).digest()))
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("engagement thread panicked"))
            .collect()
    });

    ParallelRunResult {
        hashes,
        seed,
        num_runs,
    }
}

/// Step two engagements side by side, finding the first divergent step.
///
/// Useful for debugging non-determinism by finding exactly which phase
/// starts to differ. Step 0 compares the freshly validated state.
///
/// # Returns
///
/// `None` if both runs agree throughout, `Some(step)` otherwise.
///
/// # Panics
///
/// Panics if the engine rejects the setup or a step fails.
#[must_use]
pub fn find_first_divergence(
    engine: &BattleEngine,
    setup: &EngagementSetup,
    seed: u64,
) -> Option<usize> {
    let mut first = engine.begin(setup).expect("setup rejected");
    let mut second = engine.begin(setup).expect("setup rejected");
    let mut dice_first = SeededDice::new(seed);
    let mut dice_second = SeededDice::new(seed);

    let snapshot = |battle: &Battle<'_>| {
        compute_hash(&(
            battle.state(),
            battle.field().forces(),
            battle.field().log().events(),
        ))
    };

    let mut step = 0;
    loop {
        if snapshot(&first) != snapshot(&second) {
            return Some(step);
        }
        if first.state() == BattleState::Done {
            return None;
        }
        first.step(&mut dice_first).expect("step failed");
        second.step(&mut dice_second).expect("step failed");
        step += 1;
    }
}

/// Verify that a RON round-trip preserves the result exactly.
///
/// Results are handed to callers as data, so a serialized result must
/// carry the same digest.
#[must_use]
pub fn verify_serialization_determinism(
    engine: &BattleEngine,
    setup: &EngagementSetup,
    seed: u64,
) -> bool {
    let Ok(result) = engine.resolve_seeded(setup, seed) else {
        return false;
    };

    let Ok(text) = ron::to_string(&result) else {
        return false;
    };

    let Ok(restored) = ron::from_str::<EngagementResult>(&text) else {
        return false;
    };

    restored.digest() == result.digest()
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

fn resolve(engine: &BattleEngine, setup: &EngagementSetup, seed: u64) -> EngagementResult {
    engine
        .resolve_seeded(setup, seed)
        .unwrap_or_else(|e| panic!("engagement failed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use hegemony_core::config::EngineConfig;
    use hegemony_core::data::Ruleset;
    use hegemony_core::dice::ScriptedDice;
    use hegemony_core::roster::{EngagementContext, Side, UnitStatus};

    // =========================================================================
    // Basic determinism tests
    // =========================================================================

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(3, 0, || 100u64, |n| *n);

        assert!(result.is_deterministic);
        assert_eq!(result.hashes, vec![100, 100, 100]);
    }

    #[test]
    fn test_verify_determinism_detects_drift() {
        let counter = std::cell::Cell::new(0u64);
        let result = verify_determinism(
            3,
            0,
            || {
                counter.set(counter.get() + 1);
                counter.get()
            },
            |n| *n,
        );

        assert!(!result.is_deterministic);
        assert_eq!(result.unique_hashes().len(), 3);
    }

    #[test]
    fn test_duel_determinism() {
        let engine = BattleEngine::default();
        verify_engagement_determinism(&engine, &fixtures::heavy_duel(), 42, 5)
            .assert_deterministic();
    }

    #[test]
    fn test_combined_arms_determinism() {
        let engine = BattleEngine::default();
        for seed in [1, 2, 3, 500, u64::MAX] {
            verify_engagement_determinism(&engine, &fixtures::combined_arms(), seed, 3)
                .assert_deterministic();
        }
    }

    #[test]
    fn test_find_divergence_on_deterministic_engagement() {
        let engine = BattleEngine::default();
        let divergence = find_first_divergence(&engine, &fixtures::combined_arms(), 99);
        assert!(divergence.is_none(), "Expected no divergence");
    }

    // =========================================================================
    // Serialization round-trip tests
    // =========================================================================

    #[test]
    fn test_serialization_preserves_duel() {
        let engine = BattleEngine::default();
        assert!(verify_serialization_determinism(
            &engine,
            &fixtures::heavy_duel(),
            7
        ));
    }

    #[test]
    fn test_serialization_preserves_complex_result() {
        let engine = BattleEngine::default();
        let setup = fixtures::combined_arms().with_context(EngagementContext { holy_war: true });
        assert!(verify_serialization_determinism(&engine, &setup, 31_337));
    }

    // =========================================================================
    // Seed sensitivity tests
    // =========================================================================

    #[test]
    fn test_different_seeds_explore_different_outcomes() {
        let engine = BattleEngine::default();
        let setup = fixtures::combined_arms();
        let digests: std::collections::BTreeSet<u64> = (0..32)
            .map(|seed| resolve(&engine, &setup, seed).digest())
            .collect();
        assert!(digests.len() > 1, "every seed produced the same engagement");
    }

    #[test]
    fn test_scripted_dice_reproduce_exact_result() {
        let engine = BattleEngine::default();
        let setup = fixtures::cavalry_vs_heavy();
        let script = [5, 2, 4, 4, 3, 3, 6, 1, 2, 2, 5, 5, 1, 6, 4];
        let first = engine
            .resolve(&setup, &mut ScriptedDice::new(script))
            .unwrap();
        let second = engine
            .resolve(&setup, &mut ScriptedDice::new(script))
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_tuned_config_still_deterministic() {
        let config = EngineConfig {
            decisive_ends_engagement: true,
            decisive_threshold: 6,
            max_pitch_rally_loops: 2,
            ..EngineConfig::default()
        };
        let engine = BattleEngine::new(config, Ruleset::standard()).unwrap();
        verify_engagement_determinism(&engine, &fixtures::combined_arms(), 8, 4)
            .assert_deterministic();
    }

    // =========================================================================
    // Outcome sanity tests
    // =========================================================================

    #[test]
    fn test_every_unit_reported_once() {
        let engine = BattleEngine::default();
        let setup = fixtures::combined_arms();
        let result = resolve(&engine, &setup, 12);
        assert_eq!(
            result.units.len(),
            setup.force_a.units.len() + setup.force_b.units.len()
        );
        let reported: usize = Side::BOTH
            .iter()
            .flat_map(|&side| {
                [UnitStatus::Active, UnitStatus::Routed, UnitStatus::Destroyed]
                    .map(|status| result.count(side, status))
            })
            .sum();
        assert_eq!(reported, result.units.len());
    }

    // =========================================================================
    // Parallel execution tests
    // =========================================================================

    #[test]
    fn test_parallel_duels() {
        let engine = BattleEngine::default();
        run_parallel_engagements(&engine, &fixtures::heavy_duel(), 3, 4).assert_deterministic();
    }

    #[test]
    fn test_parallel_combined_arms() {
        let engine = BattleEngine::default();
        let result = run_parallel_engagements(&engine, &fixtures::combined_arms(), 2024, 8);
        result.assert_deterministic();
        assert_eq!(
            result.hashes[0],
            resolve(&engine, &fixtures::combined_arms(), 2024).digest()
        );
    }
}
