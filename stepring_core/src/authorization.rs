//! Authorization ledger persistence with file locking.
//!
//! The file-backed store records which scopes the user has granted so a
//! later handshake for the same scopes succeeds without asking again.

use crate::{AuthorizationOutcome, AuthorizationScopes, Error, HealthDataType, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Scopes granted so far, persisted as JSON
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationLedger {
    #[serde(default)]
    pub share: BTreeSet<HealthDataType>,
    #[serde(default)]
    pub read: BTreeSet<HealthDataType>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl AuthorizationLedger {
    /// Whether every requested scope is already granted
    pub fn covers(&self, scopes: &AuthorizationScopes) -> bool {
        scopes.share.is_subset(&self.share) && scopes.read.is_subset(&self.read)
    }

    pub fn can_read(&self, data_type: HealthDataType) -> bool {
        self.read.contains(&data_type)
    }

    /// Answer a request, recording new grants when `auto_grant` is set
    ///
    /// Returns the outcome and whether the ledger changed.
    pub fn resolve(
        &mut self,
        scopes: &AuthorizationScopes,
        auto_grant: bool,
        now: DateTime<Utc>,
    ) -> (AuthorizationOutcome, bool) {
        if self.covers(scopes) {
            return (AuthorizationOutcome::Granted, false);
        }
        if !auto_grant {
            return (AuthorizationOutcome::Denied, false);
        }
        self.share.extend(scopes.share.iter().copied());
        self.read.extend(scopes.read.iter().copied());
        self.updated_at = Some(now);
        (AuthorizationOutcome::Granted, true)
    }

    /// Load the ledger from a file with shared locking
    ///
    /// Returns an empty ledger if the file doesn't exist.
    /// If the file is corrupted, logs a warning and returns an empty ledger.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No authorization ledger at {:?}, nothing granted yet", path);
            return Ok(Self::default());
        }

        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(
                    "Unable to open authorization ledger {:?}: {}. Treating as empty.",
                    path,
                    e
                );
                return Ok(Self::default());
            }
        };

        if let Err(e) = file.lock_shared() {
            tracing::warn!(
                "Unable to lock authorization ledger {:?}: {}. Treating as empty.",
                path,
                e
            );
            return Ok(Self::default());
        }

        let mut contents = String::new();
        let mut reader = std::io::BufReader::new(&file);
        if let Err(e) = reader.read_to_string(&mut contents) {
            let _ = file.unlock();
            tracing::warn!(
                "Failed to read authorization ledger {:?}: {}. Treating as empty.",
                path,
                e
            );
            return Ok(Self::default());
        }

        file.unlock()?;

        match serde_json::from_str::<AuthorizationLedger>(&contents) {
            Ok(ledger) => Ok(ledger),
            Err(e) => {
                tracing::warn!(
                    "Failed to parse authorization ledger {:?}: {}. Treating as empty.",
                    path,
                    e
                );
                Ok(Self::default())
            }
        }
    }

    /// Save the ledger atomically: temp file, fsync, rename
    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| Error::Store(format!("ledger path {:?} has no parent", path)))?;
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string(self)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved authorization ledger to {:?}", path);
        Ok(())
    }
}
