//! # Inheritance Resolver
//!
//! Expands `extends` chains into fully merged, defaulted definitions.
//!
//! - Walk the [`ExtendsGraph`] in topological order (parents first)
//! - Merge each node against its already-resolved parent (roots against
//!   the all-defaults base)
//! - Memoize every node, so fan-out reuse costs one lookup
//!
//! Resolution is a pure function of the store: no I/O, no interior state,
//! safe to call repeatedly and from several threads.

use crate::graph::ExtendsGraph;
use crate::primitives::DEFAULT_IMAGE_AUTHOR;
use crate::store::lookup_ignore_case;
use crate::{
    CatalogError, DefinitionStore, FrameworkDefinition, ImageSpec, ResolvedFrameworkDefinition,
    ResolvedImage,
};
use std::collections::BTreeMap;

// =============================================================================
// RESOLVED CATALOG
// =============================================================================

/// The output of resolution: one resolved definition per store entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedCatalog {
    entries: BTreeMap<String, ResolvedFrameworkDefinition>,
    order: Vec<String>,
}

impl ResolvedCatalog {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ResolvedFrameworkDefinition> {
        self.entries.get(name)
    }

    /// Exact name first, then a unique case-insensitive match.
    pub fn lookup(&self, name: &str) -> Result<&ResolvedFrameworkDefinition, CatalogError> {
        if let Some(resolved) = self.entries.get(name) {
            return Ok(resolved);
        }
        lookup_ignore_case(&self.entries, name)
    }

    /// Look up an install target. Abstract definitions are rejected here,
    /// before anything touches the outside world.
    pub fn installable(&self, name: &str) -> Result<&ResolvedFrameworkDefinition, CatalogError> {
        let resolved = self.lookup(name)?;
        if resolved.is_abstract {
            return Err(CatalogError::AbstractInstall(resolved.name.clone()));
        }
        Ok(resolved)
    }

    /// All resolved definitions in name order.
    pub fn iter(&self) -> impl Iterator<Item = &ResolvedFrameworkDefinition> {
        self.entries.values()
    }

    /// Non-abstract definitions in name order.
    pub fn concrete(&self) -> impl Iterator<Item = &ResolvedFrameworkDefinition> {
        self.entries.values().filter(|r| !r.is_abstract)
    }

    /// Names with parents strictly before children.
    #[must_use]
    pub fn topological_order(&self) -> &[String] {
        &self.order
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

// =============================================================================
// RESOLVER
// =============================================================================

/// One memoized node: the resolved record plus the image fields that were
/// actually authored along its chain. Image defaults depend on the node's
/// own name and version, so only authored image fields are inherited.
struct Resolution {
    resolved: ResolvedFrameworkDefinition,
    authored_image: ImageSpec,
}

/// The Resolver turns a [`DefinitionStore`] into a [`ResolvedCatalog`].
pub struct Resolver;

impl Resolver {
    /// Resolve every entry of the store, or fail for the whole store.
    ///
    /// # Errors
    /// - `MissingParent` when an `extends` names an unknown entry
    /// - `CyclicExtends` when the extends graph has a cycle
    pub fn resolve(store: &DefinitionStore) -> Result<ResolvedCatalog, CatalogError> {
        let graph = ExtendsGraph::from_store(store)?;
        let order = graph.topological_order()?;

        let mut memo: BTreeMap<&str, Resolution> = BTreeMap::new();
        for name in &order {
            let Some(definition) = store.get(name) else {
                return Err(CatalogError::UnknownFramework(name.clone()));
            };
            let parent = definition
                .extends
                .as_deref()
                .and_then(|p| memo.get(p));
            let resolution = merge(definition, parent);
            memo.insert(name.as_str(), resolution);
        }

        let entries = memo
            .into_iter()
            .map(|(name, r)| (name.to_string(), r.resolved))
            .collect();

        Ok(ResolvedCatalog { entries, order })
    }
}

/// Apply the merge rule for one node against its resolved parent.
fn merge(definition: &FrameworkDefinition, parent: Option<&Resolution>) -> Resolution {
    let inherited = parent.map(|p| &p.resolved);
    let name = definition.name.clone();

    let version = pick(&definition.version, inherited.map(|p| &p.version))
        .unwrap_or_default();
    let module = pick(&definition.module, inherited.map(|p| &p.module))
        .unwrap_or_else(|| canonical_module(&name));
    let setup_args = pick(&definition.setup_args, inherited.map(|p| &p.setup_args))
        .unwrap_or_default();
    let project = definition
        .project
        .clone()
        .or_else(|| inherited.and_then(|p| p.project.clone()));
    let description = definition
        .description
        .clone()
        .or_else(|| inherited.and_then(|p| p.description.clone()));
    let refs = if definition.refs.is_empty() {
        inherited.map(|p| p.refs.clone()).unwrap_or_default()
    } else {
        definition.refs.clone()
    };
    let ecosystem = definition
        .ecosystem
        .or_else(|| inherited.map(|p| p.ecosystem))
        .unwrap_or_default();

    let mut params = inherited.map(|p| p.params.clone()).unwrap_or_default();
    params.extend(
        definition
            .params
            .iter()
            .map(|(k, v)| (k.clone(), v.clone())),
    );

    let authored_image = match (&definition.image, parent) {
        (Some(own), Some(p)) => own.over(&p.authored_image),
        (Some(own), None) => own.clone(),
        (None, Some(p)) => p.authored_image.clone(),
        (None, None) => ImageSpec::default(),
    };
    let image = default_image(&authored_image, &name, &version);

    let ancestors = match (parent, &definition.extends) {
        (Some(p), Some(parent_name)) => {
            let mut chain = p.resolved.ancestors.clone();
            chain.push(parent_name.clone());
            chain
        }
        _ => Vec::new(),
    };

    Resolution {
        resolved: ResolvedFrameworkDefinition {
            name,
            version,
            module,
            setup_args,
            params,
            project,
            refs,
            description,
            image,
            ecosystem,
            is_abstract: definition.is_abstract,
            ancestors,
        },
        authored_image,
    }
}

/// Child's explicit value, else the inherited one.
fn pick(own: &Option<String>, inherited: Option<&String>) -> Option<String> {
    own.clone().or_else(|| inherited.cloned())
}

fn default_image(authored: &ImageSpec, name: &str, version: &str) -> ResolvedImage {
    ResolvedImage {
        author: authored
            .author
            .clone()
            .unwrap_or_else(|| DEFAULT_IMAGE_AUTHOR.to_string()),
        image: authored
            .image
            .clone()
            .unwrap_or_else(|| name.to_lowercase()),
        tag: authored.tag.clone().unwrap_or_else(|| version.to_string()),
    }
}

/// Canonical module name: lower-cased, anything outside `[a-z0-9_]` becomes `_`.
#[must_use]
pub fn canonical_module(name: &str) -> String {
    name.chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================
