//! Persistence Layer
//!
//! Embedded sled databases for the two durable collections:
//!
//! - [`CurveStore`]: saved decline curves, keyed by the derived curve id,
//!   with the `(name, well, fluid_type)` uniqueness triple enforced on save
//! - [`ProductionStore`]: monthly production series grouped by project
//!
//! [`ProductionSource`] abstracts the read side of production data so batch
//! jobs and tests can run against either the sled backend or the in-memory
//! [`MemoryProductionSource`].

pub mod curve_store;
pub mod production_store;

pub use curve_store::CurveStore;
pub use production_store::{MemoryProductionSource, ProductionSource, ProductionStore};
