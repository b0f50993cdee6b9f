// Allow dead code for public API functions that may not be used internally
// but are part of the library's exposed interface
#![allow(dead_code)]

pub mod aggregate;
pub mod batch;
pub mod cli;
pub mod config;
pub mod export;
pub mod extract;
pub mod fetch;
pub mod identity;
pub mod llm;
pub mod pipeline;
pub mod ranker;
pub mod registry;
pub mod text;

pub use extract::{extract, ExtractionCandidate, ExtractionResult};
pub use identity::{identity_key, DomainIdentity};
pub use pipeline::{DomainReport, Pipeline};
pub use ranker::{rank, BiasReport, RankOutcome, RegistryCandidate};
