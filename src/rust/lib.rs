//! Transfer of curated residue-level and domain-level annotations from seed
//! sequences onto novel protein sequences sharing a domain, using the
//! domain alignment as the coordinate system.

pub mod alignment;
pub mod aminoacid;
pub mod config;
pub mod conservation;
pub mod engine;
pub mod errors;
pub mod go_terms;
pub mod io;
pub mod iterators;
pub mod mapper;
pub mod metrics;
pub mod registry;
pub mod report;
pub mod transfer;
pub mod types;

#[cfg(test)]
mod tests;

pub use alignment::Alignment;
pub use config::{EngineConfig, EngineConfigBuilder};
pub use engine::{BatchReport, DomainUnit, TransferEngine};
pub use errors::{TransferError, TransferResult};
pub use registry::AnnotationRegistry;
pub use report::Report;
