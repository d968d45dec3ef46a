//! # Definition Store
//!
//! Holds raw framework definitions exactly as loaded. No resolution logic
//! lives here: the store only enforces that names are usable catalog keys.

use crate::primitives::MAX_NAME_LENGTH;
use crate::{CatalogError, FrameworkDefinition};
use std::collections::BTreeMap;

/// Name-keyed container of authored definitions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DefinitionStore {
    entries: BTreeMap<String, FrameworkDefinition>,
}

impl DefinitionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from definitions; a repeated name is an error.
    pub fn from_definitions(
        definitions: impl IntoIterator<Item = FrameworkDefinition>,
    ) -> Result<Self, CatalogError> {
        let mut store = Self::new();
        for definition in definitions {
            if store.contains(&definition.name) {
                return Err(CatalogError::DuplicateName(definition.name));
            }
            store.insert(definition)?;
        }
        Ok(store)
    }

    /// Insert or replace a definition, keyed by its name.
    pub fn insert(&mut self, definition: FrameworkDefinition) -> Result<(), CatalogError> {
        validate_name(&definition.name)?;
        self.entries.insert(definition.name.clone(), definition);
        Ok(())
    }

    /// Layer `other` on top of `self`. Same-named entries are replaced wholesale.
    pub fn merge(&mut self, other: Self) {
        self.entries.extend(other.entries);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FrameworkDefinition> {
        self.entries.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Find a definition by exact name, falling back to a unique
    /// case-insensitive match.
    pub fn lookup(&self, name: &str) -> Result<&FrameworkDefinition, CatalogError> {
        if let Some(definition) = self.entries.get(name) {
            return Ok(definition);
        }
        lookup_ignore_case(&self.entries, name)
    }

    /// All definitions in name order.
    pub fn iter(&self) -> impl Iterator<Item = &FrameworkDefinition> {
        self.entries.values()
    }

    /// All names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Case-insensitive lookup shared by the store and the resolved catalog.
pub(crate) fn lookup_ignore_case<'a, T>(
    entries: &'a BTreeMap<String, T>,
    name: &str,
) -> Result<&'a T, CatalogError> {
    let mut matches = entries
        .iter()
        .filter(|(key, _)| key.eq_ignore_ascii_case(name));

    match (matches.next(), matches.next()) {
        (Some((_, value)), None) => Ok(value),
        _ => Err(CatalogError::UnknownFramework(name.to_string())),
    }
}

/// Check that a name can serve as a catalog key and a directory name.
pub fn validate_name(name: &str) -> Result<(), CatalogError> {
    let invalid = |reason: &str| {
        Err(CatalogError::InvalidName {
            name: name.to_string(),
            reason: reason.to_string(),
        })
    };

    if name.is_empty() {
        return invalid("name is empty");
    }
    if name.len() > MAX_NAME_LENGTH {
        return invalid("name is too long");
    }
    if name == "." || name == ".." {
        return invalid("name is a relative path component");
    }
    if name.contains(['/', '\\']) {
        return invalid("name contains a path separator");
    }
    if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return invalid("name contains whitespace or control characters");
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get() {
        let mut store = DefinitionStore::new();
        store
            .insert(FrameworkDefinition::new("flaml"))
            .expect("insert");

        assert!(store.contains("flaml"));
        assert_eq!(store.len(), 1);
        assert!(store.get("FLAML").is_none());
    }

    #[test]
    fn invalid_names_rejected() {
        for name in ["", ".", "..", "a/b", "a\\b", "has space", "tab\tname"] {
            let result = validate_name(name);
            assert!(
                matches!(result, Err(CatalogError::InvalidName { .. })),
                "{name:?} should be rejected"
            );
        }
        assert!(validate_name("AutoGluon_bestquality").is_ok());
        assert!(validate_name(&"x".repeat(MAX_NAME_LENGTH + 1)).is_err());
    }

    #[test]
    fn duplicate_names_rejected() {
        let result = DefinitionStore::from_definitions([
            FrameworkDefinition::new("a"),
            FrameworkDefinition::new("a"),
        ]);
        assert!(matches!(result, Err(CatalogError::DuplicateName(n)) if n == "a"));
    }

    #[test]
    fn merge_replaces_wholesale() {
        let mut base = DefinitionStore::from_definitions([
            FrameworkDefinition::new("a").with_param("k", serde_json::json!(1)),
            FrameworkDefinition::new("b"),
        ])
        .expect("base");
        let overlay =
            DefinitionStore::from_definitions([FrameworkDefinition::new("a").with_version("1.0")])
                .expect("overlay");

        base.merge(overlay);

        let a = base.get("a").expect("a");
        assert_eq!(a.version.as_deref(), Some("1.0"));
        assert!(a.params.is_empty());
        assert!(base.contains("b"));
    }

    #[test]
    fn lookup_is_case_insensitive_when_unique() {
        let store = DefinitionStore::from_definitions([FrameworkDefinition::new("FLAML")])
            .expect("store");
        assert_eq!(store.lookup("flaml").expect("lookup").name, "FLAML");
        assert!(matches!(
            store.lookup("nope"),
            Err(CatalogError::UnknownFramework(_))
        ));
    }

    #[test]
    fn lookup_ambiguous_case_fails() {
        let store = DefinitionStore::from_definitions([
            FrameworkDefinition::new("Tpot"),
            FrameworkDefinition::new("TPOT"),
        ])
        .expect("store");
        assert!(store.lookup("tpot").is_err());
        assert_eq!(store.lookup("TPOT").expect("exact").name, "TPOT");
    }
}
