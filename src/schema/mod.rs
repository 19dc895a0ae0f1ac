//! Block schema lookup.
//!
//! The validator only needs one capability from its environment: resolve a block-type id to
//! its schema. Catalog discovery and loading live outside this crate; callers hand in anything
//! implementing [`SchemaRegistry`].

pub mod types;

pub use types::*;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Deserialize;

use crate::error::EngineError;

/// Synchronous schema lookup.
///
/// `Ok(None)` means the type is unknown, which the validator reports as a finding.
/// `Err` means the lookup itself broke, which aborts validation.
pub trait SchemaRegistry {
    fn block_schema(&self, type_id: &str) -> Result<Option<Arc<BlockSchema>>, EngineError>;
}

impl<R: SchemaRegistry + ?Sized> SchemaRegistry for &R {
    fn block_schema(&self, type_id: &str) -> Result<Option<Arc<BlockSchema>>, EngineError> {
        (**self).block_schema(type_id)
    }
}

impl<R: SchemaRegistry + ?Sized> SchemaRegistry for Arc<R> {
    fn block_schema(&self, type_id: &str) -> Result<Option<Arc<BlockSchema>>, EngineError> {
        (**self).block_schema(type_id)
    }
}

// =============================================================================
// IN-MEMORY CATALOG
// =============================================================================

/// A fixed set of schemas keyed by block-type id.
#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    schemas: HashMap<String, Arc<BlockSchema>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogRepr {
    List(Vec<BlockSchema>),
    Wrapped { blocks: Vec<BlockSchema> },
}

impl SchemaCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a catalog from either a bare JSON array of schemas or `{"blocks": [...]}`.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let repr: CatalogRepr = serde_json::from_str(json).map_err(EngineError::InvalidCatalog)?;
        let schemas = match repr {
            CatalogRepr::List(s) | CatalogRepr::Wrapped { blocks: s } => s,
        };
        Ok(schemas.into_iter().collect())
    }

    /// Later registrations under the same id replace earlier ones.
    pub fn insert(&mut self, schema: BlockSchema) {
        self.schemas.insert(schema.id.clone(), Arc::new(schema));
    }

    pub fn with(mut self, schema: BlockSchema) -> Self {
        self.insert(schema);
        self
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

impl FromIterator<BlockSchema> for SchemaCatalog {
    fn from_iter<I: IntoIterator<Item = BlockSchema>>(iter: I) -> Self {
        let mut catalog = SchemaCatalog::new();
        for schema in iter {
            catalog.insert(schema);
        }
        catalog
    }
}

impl SchemaRegistry for SchemaCatalog {
    fn block_schema(&self, type_id: &str) -> Result<Option<Arc<BlockSchema>>, EngineError> {
        Ok(self.schemas.get(type_id).cloned())
    }
}

// =============================================================================
// MEMOIZING WRAPPER
// =============================================================================

/// Memoizes lookups against a slower registry. The cache is append-only, so one instance can
/// be shared by concurrent validations.
#[derive(Debug, Default)]
pub struct CachedRegistry<R> {
    inner: R,
    cache: RwLock<HashMap<String, Option<Arc<BlockSchema>>>>,
}

impl<R: SchemaRegistry> CachedRegistry<R> {
    pub fn new(inner: R) -> Self {
        CachedRegistry {
            inner,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn cached_len(&self) -> usize {
        self.cache.read().len()
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

impl<R: SchemaRegistry> SchemaRegistry for CachedRegistry<R> {
    fn block_schema(&self, type_id: &str) -> Result<Option<Arc<BlockSchema>>, EngineError> {
        if let Some(hit) = self.cache.read().get(type_id) {
            return Ok(hit.clone());
        }
        // Failed lookups are not cached so a transient failure can recover.
        let resolved = self.inner.block_schema(type_id)?;
        self.cache
            .write()
            .entry(type_id.to_string())
            .or_insert_with(|| resolved.clone());
        Ok(resolved)
    }
}
