//! # Formats Module
//!
//! Declarative document formats. File I/O for definitions lives here; the
//! resolver only ever sees a [`crate::DefinitionStore`].

pub mod definitions;

pub use definitions::*;
