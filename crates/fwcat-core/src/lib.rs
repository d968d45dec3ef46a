//! # fwcat-core
//!
//! The deterministic catalog engine for fwcat - THE LOGIC.
//!
//! This crate turns declarative framework definitions into concrete,
//! installable specifications and records what was installed:
//!
//! ```text
//! DefinitionStore ──▶ Resolver ──▶ ResolvedCatalog ──▶ classify() ──▶ InstallStrategy
//!   (formats)        (graph)                                              │
//!                                                                         ▼
//!                                              Ledger ◀── installer (apps/fwcat)
//! ```
//!
//! ## Architectural Constraints
//!
//! - Resolution and classification are pure: no I/O, safe to share across threads
//! - `BTreeMap` everywhere, so output never depends on input order
//! - NO async, NO process execution; installers live in the binary crate
//! - The ledger is the only component that writes to disk

// =============================================================================
// MODULES
// =============================================================================

pub mod formats;
pub mod graph;
pub mod ledger;
pub mod primitives;
pub mod resolver;
pub mod store;
pub mod strategy;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    CatalogError, Ecosystem, ErrorKind, FrameworkDefinition, ImageSpec, Params,
    ResolvedFrameworkDefinition, ResolvedImage,
};

// =============================================================================
// RE-EXPORTS: Catalog Engine
// =============================================================================

pub use graph::ExtendsGraph;
pub use ledger::{InstallationRecord, Ledger, strip_build_metadata};
pub use resolver::{ResolvedCatalog, Resolver, canonical_module};
pub use store::DefinitionStore;
pub use strategy::{InstallStrategy, classify};

// =============================================================================
// RE-EXPORTS: Formats (from formats module)
// =============================================================================

pub use formats::{
    DefinitionFormat, flatten_catalog, load_layered, load_store, store_from_str, store_to_string,
};
