//! In-memory registry and durability pipeline for signed ledger validations.
//!
//! This crate keeps the validations published by consensus nodes, decides
//! which of them are current and trusted, indexes them by ledger and by
//! signer, ages them out, and archives stale ones through a background
//! writer.
//!
//! Core pieces:
//! - `Validation`: a signed "node N closed ledger L at time T" statement
//! - `ValidationPair`: the per-signer newest/oldest generation slot
//! - `ValidationCollection`: both indexes, the ingest path, the query
//!   surface, the aging pass, and the coalescing writer pipeline
//! - `UnlMembership` / `UnlRegistry`: the trusted-node oracle
//! - `CloseTimeSource` / `ManualCloseTime`: the network close-time oracle
//! - `CollectionMetrics`: atomic counters over ingest and writer outcomes
//! - `ValidationConfig`: currency window and ring sizing

pub mod clock;
pub mod collection;
pub mod config;
pub mod dead_ledgers;
pub mod metrics;
pub mod unl;
pub mod validation;

pub use clock::{CloseTimeSource, ManualCloseTime};
pub use collection::ValidationCollection;
pub use config::{ValidationConfig, CLOSE_TIME_TOLERANCE, DEAD_LEDGER_CAPACITY};
pub use dead_ledgers::DeadLedgerRing;
pub use metrics::CollectionMetrics;
pub use unl::{UnlMembership, UnlRegistry};
pub use validation::{Validation, ValidationPair};
