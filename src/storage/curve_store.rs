//! Saved Decline Curves
//!
//! Sled-backed store for persisted curve records.
//! Key format: `curve/{id}` where `id` is the derived `name+well+fluid`
//! composite. Saves are upserts by id; a save whose `(name, well, fluid)`
//! triple collides with a record stored under a different id is rejected as
//! a conflict rather than silently merged.

use crate::error::StorageError;
use crate::types::{CurveRecord, FluidType};
use sled::Db;
use std::path::Path;
use tracing::debug;

const CURVE_PREFIX: &str = "curve/";

/// Persistent store of saved decline curves.
pub struct CurveStore {
    db: Db,
}

impl CurveStore {
    /// Open or create the curve database.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Open an in-memory database (for testing).
    pub fn open_temp() -> Result<Self, StorageError> {
        let config = sled::Config::new().temporary(true);
        let db = config.open()?;
        Ok(Self { db })
    }

    fn build_key(id: &str) -> String {
        format!("{}{}", CURVE_PREFIX, id)
    }

    /// Save a curve, overwriting any record with the same id.
    ///
    /// Fails with [`StorageError::DuplicateCurveKey`] when another id
    /// already owns the same `(name, well, fluid_type)` triple.
    pub fn upsert(&self, record: &CurveRecord) -> Result<(), StorageError> {
        for result in self.db.scan_prefix(CURVE_PREFIX.as_bytes()) {
            let (_, value) = result?;
            let existing: CurveRecord = serde_json::from_slice(&value)?;
            if existing.key_triple() == record.key_triple() && existing.id != record.id {
                return Err(StorageError::DuplicateCurveKey {
                    existing_id: existing.id,
                });
            }
        }

        let key = Self::build_key(&record.id);
        let value = serde_json::to_vec(record)?;
        self.db.insert(key.as_bytes(), value)?;

        debug!(
            key = %key,
            well = %record.well,
            fluid = %record.fluid_type,
            "Stored decline curve"
        );

        Ok(())
    }

    /// Fetch a curve by id.
    pub fn get(&self, id: &str) -> Result<Option<CurveRecord>, StorageError> {
        match self.db.get(Self::build_key(id).as_bytes())? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    /// Most recently saved curve for a well/fluid pair.
    pub fn latest_for(
        &self,
        well: &str,
        fluid: FluidType,
    ) -> Result<Option<CurveRecord>, StorageError> {
        let mut latest: Option<CurveRecord> = None;

        // Scan all curves (inefficient but simple for now)
        for result in self.db.scan_prefix(CURVE_PREFIX.as_bytes()) {
            let (_, value) = result?;
            let record: CurveRecord = serde_json::from_slice(&value)?;
            if record.well != well || record.fluid_type != fluid {
                continue;
            }
            if latest
                .as_ref()
                .map_or(true, |best| record.created_at > best.created_at)
            {
                latest = Some(record);
            }
        }

        Ok(latest)
    }

    /// All curves saved for a well, newest first.
    pub fn curves_for_well(&self, well: &str) -> Result<Vec<CurveRecord>, StorageError> {
        let mut records: Vec<CurveRecord> = Vec::new();

        for result in self.db.scan_prefix(CURVE_PREFIX.as_bytes()) {
            let (_, value) = result?;
            let record: CurveRecord = serde_json::from_slice(&value)?;
            if record.well == well {
                records.push(record);
            }
        }

        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    /// Delete a curve by id, returning the removed record.
    pub fn delete(&self, id: &str) -> Result<CurveRecord, StorageError> {
        match self.db.remove(Self::build_key(id).as_bytes())? {
            Some(value) => {
                debug!(id = %id, "Deleted decline curve");
                Ok(serde_json::from_slice(&value)?)
            }
            None => Err(StorageError::CurveNotFound { id: id.to_string() }),
        }
    }

    /// Count of stored curves.
    pub fn count(&self) -> usize {
        self.db.scan_prefix(CURVE_PREFIX.as_bytes()).count()
    }

    /// Flush any pending writes to disk.
    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        Ok(())
    }
}
