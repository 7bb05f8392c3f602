//! Engagement metrics collection for balance analysis.
//!
//! One [`EngagementMetrics`] per resolved engagement, folded into a
//! [`BatchSummary`] across a batch.

use serde::{Deserialize, Serialize};

use hegemony_core::battle::EngagementResult;
use hegemony_core::events::{CommanderOutcome, ConclusionReason};
use hegemony_core::roster::{ForceId, Side, UnitStatus};

/// Metrics for a single engagement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementMetrics {
    /// Seed used.
    pub seed: u64,
    /// Winning side (None = draw).
    pub winner: Option<Side>,
    /// Winning force.
    pub winner_force: Option<ForceId>,
    /// How the engagement ended.
    pub reason: ConclusionReason,
    /// Pitch/rally iterations fought.
    pub pitch_loops: u32,
    /// Units destroyed, per side.
    pub destroyed: [usize; 2],
    /// Units ending routed, per side.
    pub routed: [usize; 2],
    /// Units still active, per side.
    pub survivors: [usize; 2],
    /// Commander outcome, per side.
    pub commanders: [Option<CommanderOutcome>; 2],
    /// Events logged.
    pub event_count: usize,
    /// Result digest (for determinism validation).
    pub digest: u64,
}

impl EngagementMetrics {
    /// Extract metrics from a result.
    #[must_use]
    pub fn from_result(seed: u64, result: &EngagementResult) -> Self {
        let per_side = |status| Side::BOTH.map(|side| result.count(side, status));
        Self {
            seed,
            winner: result.winning_side,
            winner_force: result.winner,
            reason: result.reason,
            pitch_loops: result.pitch_loops,
            destroyed: per_side(UnitStatus::Destroyed),
            routed: per_side(UnitStatus::Routed),
            survivors: per_side(UnitStatus::Active),
            commanders: Side::BOTH.map(|side| result.commander(side).map(|c| c.outcome)),
            event_count: result.events.len(),
            digest: result.digest(),
        }
    }
}

/// Summary statistics across multiple engagements.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Total engagements resolved.
    pub total_engagements: u32,
    /// Wins for side A.
    pub wins_a: u32,
    /// Wins for side B.
    pub wins_b: u32,
    /// Draws count.
    pub draws: u32,
    /// Side A win rate.
    pub win_rate_a: f64,
    /// Side B win rate.
    pub win_rate_b: f64,
    /// Average pitch/rally iterations.
    pub avg_loops: f64,
    /// Fewest iterations in one engagement.
    pub min_loops: u32,
    /// Most iterations in one engagement.
    pub max_loops: u32,
    /// Average units destroyed per engagement, per side.
    pub avg_destroyed: [f64; 2],
    /// Engagements ended by each reason: rout, mutual rout, decisive pitch, loop cap.
    pub reasons: [u32; 4],
    /// Commanders captured, per side.
    pub captured: [u32; 2],
    /// Commanders promoted, per side.
    pub promoted: [u32; 2],
}

impl BatchSummary {
    /// Calculate summary from a list of engagement metrics.
    #[must_use]
    pub fn from_engagements(engagements: &[EngagementMetrics]) -> Self {
        if engagements.is_empty() {
            return Self::default();
        }

        let mut summary = Self {
            total_engagements: engagements.len() as u32,
            min_loops: u32::MAX,
            ..Default::default()
        };

        let mut loop_sum = 0u64;
        let mut destroyed_sum = [0usize; 2];

        for game in engagements {
            match game.winner {
                Some(Side::A) => summary.wins_a += 1,
                Some(Side::B) => summary.wins_b += 1,
                None => summary.draws += 1,
            }
            summary.reasons[reason_index(game.reason)] += 1;

            loop_sum += u64::from(game.pitch_loops);
            summary.min_loops = summary.min_loops.min(game.pitch_loops);
            summary.max_loops = summary.max_loops.max(game.pitch_loops);

            for side in Side::BOTH {
                let i = side.index();
                destroyed_sum[i] += game.destroyed[i];
                match game.commanders[i] {
                    Some(CommanderOutcome::Captured) => summary.captured[i] += 1,
                    Some(CommanderOutcome::Promoted { .. }) => summary.promoted[i] += 1,
                    _ => {}
                }
            }
        }

        let total = f64::from(summary.total_engagements);
        summary.win_rate_a = f64::from(summary.wins_a) / total;
        summary.win_rate_b = f64::from(summary.wins_b) / total;
        summary.avg_loops = loop_sum as f64 / total;
        summary.avg_destroyed = destroyed_sum.map(|d| d as f64 / total);
        summary
    }

    /// Check if neither side's win rate exceeds `threshold`.
    #[must_use]
    pub fn is_balanced(&self, threshold: f64) -> bool {
        self.win_rate_a <= threshold && self.win_rate_b <= threshold
    }

    /// The side winning more than `threshold` of engagements, if any.
    #[must_use]
    pub fn dominant_side(&self, threshold: f64) -> Option<Side> {
        if self.win_rate_a > threshold {
            Some(Side::A)
        } else if self.win_rate_b > threshold {
            Some(Side::B)
        } else {
            None
        }
    }
}

fn reason_index(reason: ConclusionReason) -> usize {
    match reason {
        ConclusionReason::Rout => 0,
        ConclusionReason::MutualRout => 1,
        ConclusionReason::DecisivePitch => 2,
        ConclusionReason::LoopCap => 3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hegemony_core::battle::BattleEngine;
    use hegemony_test_utils::fixtures;

    fn metrics(winner: Option<Side>, loops: u32, reason: ConclusionReason) -> EngagementMetrics {
        EngagementMetrics {
            seed: 0,
            winner,
            winner_force: None,
            reason,
            pitch_loops: loops,
            destroyed: [1, 2],
            routed: [0, 0],
            survivors: [1, 0],
            commanders: [Some(CommanderOutcome::Promoted { from: 2, to: 3 }), None],
            event_count: 10,
            digest: 0,
        }
    }

    #[test]
    fn test_metrics_from_result() {
        let engine = BattleEngine::default();
        let setup = fixtures::combined_arms();
        let result = engine.resolve_seeded(&setup, 4).unwrap();
        let m = EngagementMetrics::from_result(4, &result);

        let units = setup.force_a.units.len() + setup.force_b.units.len();
        let counted: usize = (0..2)
            .map(|i| m.destroyed[i] + m.routed[i] + m.survivors[i])
            .sum();
        assert_eq!(counted, units);
        assert_eq!(m.digest, result.digest());
        assert!(m.commanders.iter().all(Option::is_some));
    }

    #[test]
    fn test_batch_summary() {
        let games = vec![
            metrics(Some(Side::A), 1, ConclusionReason::Rout),
            metrics(Some(Side::A), 3, ConclusionReason::Rout),
            metrics(Some(Side::B), 2, ConclusionReason::MutualRout),
            metrics(None, 10, ConclusionReason::LoopCap),
        ];
        let summary = BatchSummary::from_engagements(&games);

        assert_eq!(summary.total_engagements, 4);
        assert_eq!(summary.wins_a, 2);
        assert_eq!(summary.draws, 1);
        assert!((summary.win_rate_a - 0.5).abs() < 0.001);
        assert!((summary.avg_loops - 4.0).abs() < 0.001);
        assert_eq!((summary.min_loops, summary.max_loops), (1, 10));
        assert_eq!(summary.reasons, [2, 1, 0, 1]);
        assert_eq!(summary.promoted, [4, 0]);
        assert!((summary.avg_destroyed[1] - 2.0).abs() < 0.001);
    }

    #[test]
    fn test_balance_check() {
        let games = vec![
            metrics(Some(Side::A), 1, ConclusionReason::Rout),
            metrics(Some(Side::A), 1, ConclusionReason::Rout),
            metrics(Some(Side::A), 1, ConclusionReason::Rout),
            metrics(Some(Side::B), 1, ConclusionReason::Rout),
        ];
        let summary = BatchSummary::from_engagements(&games);
        assert!(!summary.is_balanced(0.6));
        assert_eq!(summary.dominant_side(0.6), Some(Side::A));
        assert!(summary.is_balanced(0.8));
    }

    #[test]
    fn test_empty_summary() {
        assert_eq!(BatchSummary::from_engagements(&[]), BatchSummary::default());
    }
}
