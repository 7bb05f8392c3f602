//! Engagement records for replay and verification.
//!
//! A record stores the inputs of a seeded engagement together with the
//! digest of its result. Resolving the stored setup again with the stored
//! seed must reproduce the digest exactly.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::battle::{BattleEngine, EngagementResult, EngagementSetup};
use crate::config::EngineConfig;
use crate::data::Ruleset;
use crate::error::EngineError;

/// Record file format version for compatibility.
pub const RECORD_VERSION: u32 = 1;

/// Errors from saving, loading or verifying a record.
#[derive(Debug, Error)]
pub enum RecordError {
    /// Filesystem failure.
    #[error("Record IO failed: {0}")]
    Io(#[from] std::io::Error),

    /// Binary encoding failure.
    #[error("Record encoding failed: {0}")]
    Encoding(#[from] bincode::Error),

    /// The file was written by an incompatible version.
    #[error("Record version mismatch: expected {expected}, got {found}")]
    VersionMismatch {
        /// Version this build reads.
        expected: u32,
        /// Version in the file.
        found: u32,
    },

    /// Re-resolving produced a different result.
    #[error("Digest mismatch: recorded {recorded:#018x}, replayed {replayed:#018x}")]
    DigestMismatch {
        /// Digest stored in the record.
        recorded: u64,
        /// Digest of the replayed result.
        replayed: u64,
    },

    /// The engine rejected the stored inputs.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// A seeded engagement and the digest of its result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementRecord {
    /// Format version.
    pub version: u32,
    /// Seed for [`crate::dice::SeededDice`].
    pub seed: u64,
    /// Engine settings used.
    pub config: EngineConfig,
    /// Rules used.
    pub ruleset: Ruleset,
    /// Inputs.
    pub setup: EngagementSetup,
    /// [`EngagementResult::digest`] of the original run.
    pub digest: u64,
}

impl EngagementRecord {
    /// Resolve `setup` once and record it.
    ///
    /// # Errors
    ///
    /// Returns the engine's error for invalid input.
    pub fn capture(
        engine: &BattleEngine,
        setup: &EngagementSetup,
        seed: u64,
    ) -> Result<(Self, EngagementResult), RecordError> {
        let result = engine.resolve_seeded(setup, seed)?;
        let record = Self {
            version: RECORD_VERSION,
            seed,
            config: engine.config().clone(),
            ruleset: engine.ruleset().clone(),
            setup: setup.clone(),
            digest: result.digest(),
        };
        Ok((record, result))
    }

    /// Resolve the stored engagement again and compare digests.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::DigestMismatch`] if the replay diverges, or the
    /// engine's error if the stored inputs are rejected.
    pub fn verify(&self) -> Result<EngagementResult, RecordError> {
        let engine = BattleEngine::new(self.config.clone(), self.ruleset.clone())?;
        let result = engine.resolve_seeded(&self.setup, self.seed)?;
        let replayed = result.digest();
        if replayed != self.digest {
            return Err(RecordError::DigestMismatch {
                recorded: self.digest,
                replayed,
            });
        }
        Ok(result)
    }

    /// Save the record to a file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), RecordError> {
        let bytes = bincode::serialize(self)?;
        std::fs::write(path.as_ref(), bytes)?;
        Ok(())
    }

    /// Load a record from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or decoding fails, or the version differs.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, RecordError> {
        let bytes = std::fs::read(path.as_ref())?;
        let record: Self = bincode::deserialize(&bytes)?;

        if record.version != RECORD_VERSION {
            return Err(RecordError::VersionMismatch {
                expected: RECORD_VERSION,
                found: record.version,
            });
        }

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::{Commander, Force, Unit, UnitType};

    fn setup() -> EngagementSetup {
        EngagementSetup::new(
            Force::new(1)
                .with_unit(Unit::new(1, UnitType::Cavalry).with_upgrade("Lancers"))
                .with_unit(Unit::new(2, UnitType::Light))
                .with_commander(Commander::new(1, "Murat", 4, "Bold")),
            Force::new(2)
                .with_unit(Unit::new(3, UnitType::Heavy).with_upgrade("Sentry Team"))
                .with_unit(Unit::new(4, UnitType::Ranged).with_upgrade("Sharpshooters")),
        )
    }

    #[test]
    fn test_capture_then_verify() {
        let engine = BattleEngine::default();
        let (record, result) = EngagementRecord::capture(&engine, &setup(), 2024).unwrap();
        assert_eq!(record.digest, result.digest());
        let replayed = record.verify().unwrap();
        assert_eq!(replayed, result);
    }

    #[test]
    fn test_tampered_digest_detected() {
        let engine = BattleEngine::default();
        let (mut record, _) = EngagementRecord::capture(&engine, &setup(), 5).unwrap();
        record.digest ^= 1;
        assert!(matches!(
            record.verify(),
            Err(RecordError::DigestMismatch { .. })
        ));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engagement.rec");
        let engine = BattleEngine::default();
        let (record, _) = EngagementRecord::capture(&engine, &setup(), 77).unwrap();
        record.save(&path).unwrap();
        let loaded = EngagementRecord::load(&path).unwrap();
        assert_eq!(loaded, record);
        assert!(loaded.verify().is_ok());
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.rec");
        let engine = BattleEngine::default();
        let (mut record, _) = EngagementRecord::capture(&engine, &setup(), 1).unwrap();
        record.version = RECORD_VERSION + 1;
        record.save(&path).unwrap();
        assert!(matches!(
            EngagementRecord::load(&path),
            Err(RecordError::VersionMismatch { found, .. }) if found == RECORD_VERSION + 1
        ));
    }
}
