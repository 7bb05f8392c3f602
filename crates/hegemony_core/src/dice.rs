//! Injectable dice for every probabilistic step.
//!
//! The engine never touches a global random source. Each engagement is given
//! its own [`Dice`] implementation, so independent engagements can run on
//! separate threads and replay identically from the same seed.

use std::collections::VecDeque;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Source of uniform integer draws.
pub trait Dice {
    /// Roll a die with `sides` faces, returning a value in `1..=sides`.
    fn roll(&mut self, sides: u32) -> u32;

    /// Pick an index uniformly in `0..len`.
    ///
    /// Callers only pick from non-empty lists.
    fn pick(&mut self, len: usize) -> usize;
}

impl<D: Dice + ?Sized> Dice for &mut D {
    fn roll(&mut self, sides: u32) -> u32 {
        (**self).roll(sides)
    }

    fn pick(&mut self, len: usize) -> usize {
        (**self).pick(len)
    }
}

/// Seeded dice backed by ChaCha8.
#[derive(Debug, Clone)]
pub struct SeededDice {
    seed: u64,
    rng: ChaCha8Rng,
}

impl SeededDice {
    /// Create dice from a seed. Identical seeds give identical sequences.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// The seed these dice were created with.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }
}

impl Dice for SeededDice {
    fn roll(&mut self, sides: u32) -> u32 {
        self.rng.gen_range(1..=sides.max(1))
    }

    fn pick(&mut self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        self.rng.gen_range(0..len)
    }
}

/// Dice that replay a fixed script.
///
/// Rolls are clamped into `1..=sides`. Once the roll script runs out the
/// final value repeats; an empty script always rolls 1. Picks come from a
/// separate script and default to index 0.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDice {
    rolls: VecDeque<u32>,
    picks: VecDeque<usize>,
    last_roll: u32,
    consumed: usize,
}

impl ScriptedDice {
    /// Dice that return `rolls` in order.
    #[must_use]
    pub fn new(rolls: impl IntoIterator<Item = u32>) -> Self {
        Self {
            rolls: rolls.into_iter().collect(),
            picks: VecDeque::new(),
            last_roll: 1,
            consumed: 0,
        }
    }

    /// Script the target picks as well.
    #[must_use]
    pub fn with_picks(mut self, picks: impl IntoIterator<Item = usize>) -> Self {
        self.picks = picks.into_iter().collect();
        self
    }

    /// Number of rolls drawn so far.
    #[must_use]
    pub const fn rolls_consumed(&self) -> usize {
        self.consumed
    }

    /// Number of scripted rolls not yet drawn.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.rolls.len()
    }
}

impl Dice for ScriptedDice {
    fn roll(&mut self, sides: u32) -> u32 {
        if let Some(next) = self.rolls.pop_front() {
            self.last_roll = next;
        }
        self.consumed += 1;
        self.last_roll.clamp(1, sides.max(1))
    }

    fn pick(&mut self, len: usize) -> usize {
        let index = self.picks.pop_front().unwrap_or(0);
        index.min(len.saturating_sub(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_dice_repeat_for_same_seed() {
        let mut a = SeededDice::new(42);
        let mut b = SeededDice::new(42);
        let rolls_a: Vec<u32> = (0..64).map(|_| a.roll(6)).collect();
        let rolls_b: Vec<u32> = (0..64).map(|_| b.roll(6)).collect();
        assert_eq!(rolls_a, rolls_b);
    }

    #[test]
    fn test_seeded_dice_stay_in_range() {
        let mut dice = SeededDice::new(7);
        for _ in 0..1000 {
            let roll = dice.roll(6);
            assert!((1..=6).contains(&roll));
            assert!(dice.pick(3) < 3);
        }
        assert_eq!(dice.pick(1), 0);
        assert_eq!(dice.pick(0), 0);
    }

    #[test]
    fn test_different_seeds_diverge() {
        let mut a = SeededDice::new(1);
        let mut b = SeededDice::new(2);
        let rolls_a: Vec<u32> = (0..32).map(|_| a.roll(20)).collect();
        let rolls_b: Vec<u32> = (0..32).map(|_| b.roll(20)).collect();
        assert_ne!(rolls_a, rolls_b);
    }

    #[test]
    fn test_scripted_dice_replay_then_repeat_last() {
        let mut dice = ScriptedDice::new([4, 3, 9]);
        assert_eq!(dice.roll(6), 4);
        assert_eq!(dice.roll(6), 3);
        // Clamped to the die size.
        assert_eq!(dice.roll(6), 6);
        assert_eq!(dice.roll(20), 9);
        assert_eq!(dice.rolls_consumed(), 4);
        assert_eq!(dice.remaining(), 0);
    }

    #[test]
    fn test_scripted_picks_clamp_to_len() {
        let mut dice = ScriptedDice::new([]).with_picks([1, 5]);
        assert_eq!(dice.pick(2), 1);
        assert_eq!(dice.pick(2), 1);
        assert_eq!(dice.pick(2), 0);
        assert_eq!(dice.roll(6), 1);
    }
}
