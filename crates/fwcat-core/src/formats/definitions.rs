//! # Definition Documents
//!
//! Parsing and writing of declarative definition documents.
//!
//! A document is a single top-level mapping from definition name to fields:
//!
//! ```toml
//! [flaml]
//! version = "stable"
//! project = "https://github.com/microsoft/FLAML"
//!
//! [flaml_benchmark]
//! extends = "flaml"
//! params = { _n_jobs = 4 }
//! ```
//!
//! TOML, JSON and YAML carry the same shape. A YAML entry with an empty
//! body (`RandomForest:`) is an empty definition.
//!
//! Size is validated BEFORE parsing, and repeated names are rejected even
//! for formats whose parsers would silently keep the last one.

use crate::primitives::MAX_DEFINITION_DOCUMENT_SIZE;
use crate::{CatalogError, DefinitionStore, FrameworkDefinition, ResolvedCatalog};
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

// =============================================================================
// FORMAT SELECTION
// =============================================================================

/// Supported document encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionFormat {
    Toml,
    Json,
    Yaml,
}

impl DefinitionFormat {
    /// Pick the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("toml") => Ok(Self::Toml),
            Some("json") => Ok(Self::Json),
            Some("yaml" | "yml") => Ok(Self::Yaml),
            _ => Err(CatalogError::InvalidDefinition(format!(
                "Cannot infer document format of '{}' (expected .toml, .json, .yaml or .yml)",
                path.display()
            ))),
        }
    }
}

// =============================================================================
// PARSING
// =============================================================================

/// Document entries in source order, duplicates preserved for detection.
struct DocumentEntries(Vec<(String, FrameworkDefinition)>);

impl<'de> Deserialize<'de> for DocumentEntries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = DocumentEntries;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a mapping from definition name to definition fields")
            }

            fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
                Ok(DocumentEntries(Vec::new()))
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::new();
                while let Some((name, body)) =
                    map.next_entry::<String, Option<FrameworkDefinition>>()?
                {
                    let mut definition = body.unwrap_or_default();
                    definition.name = name.clone();
                    entries.push((name, definition));
                }
                Ok(DocumentEntries(entries))
            }
        }

        deserializer.deserialize_any(EntriesVisitor)
    }
}

/// Parse a document from text. Pure transformation, no file I/O.
pub fn store_from_str(
    text: &str,
    format: DefinitionFormat,
) -> Result<DefinitionStore, CatalogError> {
    if text.len() as u64 > MAX_DEFINITION_DOCUMENT_SIZE {
        return Err(CatalogError::InvalidDefinition(format!(
            "Document size {} bytes exceeds maximum allowed {} bytes",
            text.len(),
            MAX_DEFINITION_DOCUMENT_SIZE
        )));
    }
    if text.trim().is_empty() {
        return Ok(DefinitionStore::new());
    }

    let entries = match format {
        DefinitionFormat::Toml => toml::from_str::<DocumentEntries>(text)
            .map_err(|e| CatalogError::InvalidDefinition(e.to_string()))?,
        DefinitionFormat::Json => serde_json::from_str::<DocumentEntries>(text)
            .map_err(|e| CatalogError::InvalidDefinition(e.to_string()))?,
        DefinitionFormat::Yaml => serde_yaml::from_str::<DocumentEntries>(text)
            .map_err(|e| CatalogError::InvalidDefinition(e.to_string()))?,
    };

    DefinitionStore::from_definitions(entries.0.into_iter().map(|(_, definition)| definition))
}

/// Load a document from disk, choosing the format by extension.
pub fn load_store(path: &Path) -> Result<DefinitionStore, CatalogError> {
    let format = DefinitionFormat::from_path(path)?;

    let metadata = std::fs::metadata(path).map_err(|e| {
        CatalogError::IoError(format!("Cannot read '{}': {}", path.display(), e))
    })?;
    if metadata.len() > MAX_DEFINITION_DOCUMENT_SIZE {
        return Err(CatalogError::InvalidDefinition(format!(
            "File '{}' is {} bytes, maximum allowed is {} bytes",
            path.display(),
            metadata.len(),
            MAX_DEFINITION_DOCUMENT_SIZE
        )));
    }

    let text = std::fs::read_to_string(path).map_err(|e| {
        CatalogError::IoError(format!("Cannot read '{}': {}", path.display(), e))
    })?;
    store_from_str(&text, format).map_err(|e| match e {
        CatalogError::InvalidDefinition(msg) => {
            CatalogError::InvalidDefinition(format!("{}: {}", path.display(), msg))
        }
        other => other,
    })
}

/// Load several documents; later documents override earlier ones by name.
pub fn load_layered<P: AsRef<Path>>(paths: &[P]) -> Result<DefinitionStore, CatalogError> {
    let mut store = DefinitionStore::new();
    for path in paths {
        store.merge(load_store(path.as_ref())?);
    }
    Ok(store)
}

// =============================================================================
// WRITING
// =============================================================================

/// Write a store as a document.
pub fn store_to_string(
    store: &DefinitionStore,
    format: DefinitionFormat,
) -> Result<String, CatalogError> {
    let document: BTreeMap<&str, &FrameworkDefinition> =
        store.iter().map(|d| (d.name.as_str(), d)).collect();

    match format {
        DefinitionFormat::Toml => toml::to_string(&document)
            .map_err(|e| CatalogError::SerializationError(e.to_string())),
        DefinitionFormat::Json => serde_json::to_string_pretty(&document)
            .map_err(|e| CatalogError::SerializationError(e.to_string())),
        DefinitionFormat::Yaml => serde_yaml::to_string(&document)
            .map_err(|e| CatalogError::SerializationError(e.to_string())),
    }
}

/// Flatten a resolved catalog into a document where every field is explicit
/// and no definition extends another.
pub fn flatten_catalog(catalog: &ResolvedCatalog) -> Result<DefinitionStore, CatalogError> {
    DefinitionStore::from_definitions(catalog.iter().map(|r| r.to_definition()))
}

// =============================================================================
// TESTS
// =============================================================================
