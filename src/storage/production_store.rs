//! Production Series Source
//!
//! Read access to monthly production histories, abstracted behind
//! [`ProductionSource`] so aggregate jobs can run against the sled backend
//! or an in-memory fixture. Series are grouped by project because every
//! aggregate operation (project analysis, fleet projection, migration)
//! walks one project's wells.
//!
//! Key format: `series/{project}/{well}`.

use crate::error::StorageError;
use crate::types::ProductionSeries;
use sled::Db;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

const SERIES_PREFIX: &str = "series/";

/// Read side of production data.
///
/// Implementations must be thread-safe (Send + Sync) so batch jobs can
/// share one source across worker threads.
pub trait ProductionSource: Send + Sync {
    /// Well names in a project, in stable order.
    fn wells_in_project(&self, project: &str) -> Result<Vec<String>, StorageError>;

    /// Full monthly series for a well, if the well is known.
    fn series_for_well(&self, well: &str) -> Result<Option<ProductionSeries>, StorageError>;
}

// ============================================================================
// Sled Backend
// ============================================================================

/// Persistent store of production series.
pub struct ProductionStore {
    db: Db,
}

impl ProductionStore {
    /// Open or create the production database.
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

    fn build_key(project: &str, well: &str) -> String {
        format!("{}{}/{}", SERIES_PREFIX, project, well)
    }

    /// Store one well's series under a project, replacing any prior copy.
    pub fn put_series(
        &self,
        project: &str,
        series: &ProductionSeries,
    ) -> Result<(), StorageError> {
        let key = Self::build_key(project, &series.well);
        let value = serde_json::to_vec(series)?;
        self.db.insert(key.as_bytes(), value)?;
        debug!(key = %key, samples = series.len(), "Stored production series");
        Ok(())
    }

    /// Count of stored series across all projects.
    pub fn count(&self) -> usize {
        self.db.scan_prefix(SERIES_PREFIX.as_bytes()).count()
    }

    /// Flush any pending writes to disk.
    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        Ok(())
    }
}

impl ProductionSource for ProductionStore {
    fn wells_in_project(&self, project: &str) -> Result<Vec<String>, StorageError> {
        let prefix = format!("{}{}/", SERIES_PREFIX, project);
        let mut wells = Vec::new();

        for result in self.db.scan_prefix(prefix.as_bytes()) {
            let (key, _) = result?;
            if let Ok(key_str) = std::str::from_utf8(&key) {
                wells.push(key_str[prefix.len()..].to_string());
            }
        }

        Ok(wells)
    }

    fn series_for_well(&self, well: &str) -> Result<Option<ProductionSeries>, StorageError> {
        // Scan all projects (inefficient but simple for now)
        for result in self.db.scan_prefix(SERIES_PREFIX.as_bytes()) {
            let (_, value) = result?;
            let series: ProductionSeries = serde_json::from_slice(&value)?;
            if series.well == well {
                return Ok(Some(series));
            }
        }
        Ok(None)
    }
}

// ============================================================================
// In-Memory Backend
// ============================================================================

/// In-memory production source for testing and one-shot batch runs.
///
/// Built once, then shared read-only; the trait side never mutates, so no
/// locking is needed.
#[derive(Debug, Clone, Default)]
pub struct MemoryProductionSource {
    projects: HashMap<String, Vec<ProductionSeries>>,
}

impl MemoryProductionSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one well's series to a project, replacing any prior copy.
    pub fn insert(&mut self, project: &str, series: ProductionSeries) {
        let wells = self.projects.entry(project.to_string()).or_default();
        wells.retain(|s| s.well != series.well);
        wells.push(series);
    }
}

impl ProductionSource for MemoryProductionSource {
    fn wells_in_project(&self, project: &str) -> Result<Vec<String>, StorageError> {
        Ok(self
            .projects
            .get(project)
            .map(|wells| wells.iter().map(|s| s.well.clone()).collect())
            .unwrap_or_default())
    }

    fn series_for_well(&self, well: &str) -> Result<Option<ProductionSeries>, StorageError> {
        for wells in self.projects.values() {
            if let Some(series) = wells.iter().find(|s| s.well == well) {
                return Ok(Some(series.clone()));
            }
        }
        Ok(None)
    }
}
