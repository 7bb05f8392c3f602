//! Balance testing utilities for headless engagement runs.
//!
//! This module provides tools for resolving thousands of seeded engagements
//! to check unit types, upgrades and traits against each other.

use std::ops::Range;

use serde::Serialize;

use hegemony_core::battle::{BattleEngine, EngagementResult, EngagementSetup};
use hegemony_core::events::ConclusionReason;
use hegemony_core::roster::{Side, UnitStatus, UnitType};

use crate::fixtures::uniform_force;

/// Statistics for a set of engagements.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BattleStats {
    /// Total engagements run.
    pub total_battles: u32,
    /// Wins for side A.
    pub wins_a: u32,
    /// Wins for side B.
    pub wins_b: u32,
    /// Draws.
    pub draws: u32,
    /// Engagements that hit the loop cap.
    pub loop_caps: u32,
    /// Engagements ended by a decisive pitch.
    pub decisive_pitches: u32,
    /// Pitch/rally iterations summed over every engagement.
    pub total_loops: u64,
    /// Units destroyed on side A, summed.
    pub destroyed_a: u64,
    /// Units destroyed on side B, summed.
    pub destroyed_b: u64,
}

impl BattleStats {
    /// Fold one result into the totals.
    pub fn record(&mut self, result: &EngagementResult) {
        self.total_battles += 1;
        match result.winning_side {
            Some(Side::A) => self.wins_a += 1,
            Some(Side::B) => self.wins_b += 1,
            None => self.draws += 1,
        }
        match result.reason {
            ConclusionReason::LoopCap => self.loop_caps += 1,
            ConclusionReason::DecisivePitch => self.decisive_pitches += 1,
            ConclusionReason::Rout | ConclusionReason::MutualRout => {}
        }
        self.total_loops += u64::from(result.pitch_loops);
        self.destroyed_a += result.count(Side::A, UnitStatus::Destroyed) as u64;
        self.destroyed_b += result.count(Side::B, UnitStatus::Destroyed) as u64;
    }

    /// Combine two sets of totals.
    #[must_use]
    pub fn merged(mut self, other: &BattleStats) -> Self {
        self.total_battles += other.total_battles;
        self.wins_a += other.wins_a;
        self.wins_b += other.wins_b;
        self.draws += other.draws;
        self.loop_caps += other.loop_caps;
        self.decisive_pitches += other.decisive_pitches;
        self.total_loops += other.total_loops;
        self.destroyed_a += other.destroyed_a;
        self.destroyed_b += other.destroyed_b;
        self
    }

    /// Calculate win rate for side A (0.0 to 1.0).
    #[must_use]
    pub fn win_rate_a(&self) -> f64 {
        self.rate(self.wins_a)
    }

    /// Calculate win rate for side B (0.0 to 1.0).
    #[must_use]
    pub fn win_rate_b(&self) -> f64 {
        self.rate(self.wins_b)
    }

    /// Average pitch/rally iterations per engagement.
    #[must_use]
    pub fn avg_loops(&self) -> f64 {
        if self.total_battles == 0 {
            return 0.0;
        }
        self.total_loops as f64 / f64::from(self.total_battles)
    }

    /// Check if the matchup is balanced (side A's rate within range).
    #[must_use]
    pub fn is_balanced(&self, min_rate: f64, max_rate: f64) -> bool {
        let rate = self.win_rate_a();
        rate >= min_rate && rate <= max_rate
    }

    fn rate(&self, wins: u32) -> f64 {
        if self.total_battles == 0 {
            return 0.5;
        }
        f64::from(wins) / f64::from(self.total_battles)
    }
}

/// Resolve `setup` once per seed and collect the totals.
///
/// # Panics
///
/// Panics if the engine rejects the setup.
#[must_use]
pub fn run_matchup(engine: &BattleEngine, setup: &EngagementSetup, seeds: Range<u64>) -> BattleStats {
    let mut stats = BattleStats::default();
    for seed in seeds {
        let result = engine
            .resolve_seeded(setup, seed)
            .unwrap_or_else(|e| panic!("matchup rejected: {e}"));
        stats.record(&result);
    }
    stats
}

/// Side A's win rate for every pairing of uniform forces of `size` units.
#[must_use]
pub fn generate_matchup_matrix(
    engine: &BattleEngine,
    size: usize,
    seeds: Range<u64>,
) -> Vec<(UnitType, UnitType, f64)> {
    let mut results = Vec::new();

    for attacker in UnitType::ALL {
        for defender in UnitType::ALL {
            let setup = EngagementSetup::new(
                uniform_force(1, 1, attacker, size),
                uniform_force(2, 1000, defender, size),
            );
            let stats = run_matchup(engine, &setup, seeds.clone());
            results.push((attacker, defender, stats.win_rate_a()));
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn test_battle_stats_win_rate() {
        let stats = BattleStats {
            total_battles: 100,
            wins_a: 55,
            wins_b: 40,
            draws: 5,
            total_loops: 250,
            ..BattleStats::default()
        };

        assert!((stats.win_rate_a() - 0.55).abs() < 0.001);
        assert!((stats.win_rate_b() - 0.40).abs() < 0.001);
        assert!((stats.avg_loops() - 2.5).abs() < 0.001);
        assert!(stats.is_balanced(0.45, 0.56));
    }

    #[test]
    fn test_empty_stats_are_neutral() {
        let stats = BattleStats::default();
        assert!((stats.win_rate_a() - 0.5).abs() < f64::EPSILON);
        assert!(stats.avg_loops().abs() < f64::EPSILON);
    }

    #[test]
    fn test_run_matchup_counts_every_seed() {
        let engine = BattleEngine::default();
        let stats = run_matchup(&engine, &fixtures::combined_arms(), 0..40);
        assert_eq!(stats.total_battles, 40);
        assert_eq!(stats.wins_a + stats.wins_b + stats.draws, 40);
        assert!(stats.total_loops <= 40 * u64::from(engine.config().max_pitch_rally_loops));
    }

    #[test]
    fn test_merged_adds_totals() {
        let engine = BattleEngine::default();
        let setup = fixtures::heavy_duel();
        let first = run_matchup(&engine, &setup, 0..10);
        let second = run_matchup(&engine, &setup, 10..20);
        assert_eq!(first.merged(&second), run_matchup(&engine, &setup, 0..20));
    }

    #[test]
    fn test_mirror_matchup_is_roughly_even() {
        let engine = BattleEngine::default();
        let setup = EngagementSetup::new(
            uniform_force(1, 1, UnitType::Heavy, 3),
            uniform_force(2, 10, UnitType::Heavy, 3),
        );
        let stats = run_matchup(&engine, &setup, 0..400);
        assert!(
            (stats.win_rate_a() - stats.win_rate_b()).abs() < 0.15,
            "mirror matchup lopsided: {:.2} vs {:.2}",
            stats.win_rate_a(),
            stats.win_rate_b()
        );
    }

    #[test]
    fn test_matrix_covers_every_pairing() {
        let engine = BattleEngine::default();
        let matrix = generate_matchup_matrix(&engine, 2, 0..5);
        assert_eq!(matrix.len(), UnitType::ALL.len() * UnitType::ALL.len());
        assert!(matrix.iter().all(|(_, _, rate)| (0.0..=1.0).contains(rate)));
    }
}
