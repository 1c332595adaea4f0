//! Content type and taxonomy registry.
//!
//! Configuration-time mapping consulted by the deriver. Content types and
//! taxonomies are registered once at startup; the deriver never derives
//! listing keys for a type it does not know, and skips taxonomies that were
//! never registered.

use std::collections::HashMap;

use uuid::Uuid;

/// Listing behavior of one content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeConfig {
    /// REST route segment for the type's collection (e.g. `posts`).
    pub rest_base: String,
    /// Whether items of this type appear in the main homepage query.
    pub public: bool,
    /// Whether the type has its own archive listing.
    pub has_archive: bool,
    /// Whether items of this type appear in author archives.
    pub author_archives: bool,
}

/// Behavior of one taxonomy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxonomyConfig {
    /// REST route segment for the taxonomy's collection (e.g. `categories`).
    pub rest_base: String,
    pub hierarchical: bool,
    /// Term implicitly assigned when an item has none explicit.
    pub default_term: Option<Uuid>,
}

/// Registry of content types and taxonomies known to the engine.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: HashMap<String, TypeConfig>,
    taxonomies: HashMap<String, TaxonomyConfig>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_type(&mut self, name: impl Into<String>, config: TypeConfig) {
        self.types.insert(name.into(), config);
    }

    pub fn register_taxonomy(&mut self, name: impl Into<String>, config: TaxonomyConfig) {
        self.taxonomies.insert(name.into(), config);
    }

    pub fn content_type(&self, name: &str) -> Option<&TypeConfig> {
        self.types.get(name)
    }

    pub fn taxonomy(&self, name: &str) -> Option<&TaxonomyConfig> {
        self.taxonomies.get(name)
    }

    /// Whether items of `name` are eligible for the main homepage query.
    pub fn is_public_type(&self, name: &str) -> bool {
        self.types.get(name).is_some_and(|t| t.public)
    }

    /// Whether items of `name` are listed in author archives.
    pub fn supports_author_archives(&self, name: &str) -> bool {
        self.types.get(name).is_some_and(|t| t.author_archives)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_lookup_type() {
        let mut registry = TypeRegistry::new();
        registry.register_type(
            "post",
            TypeConfig {
                rest_base: "posts".to_string(),
                public: true,
                has_archive: false,
                author_archives: true,
            },
        );

        assert!(registry.is_public_type("post"));
        assert!(registry.supports_author_archives("post"));
        assert_eq!(
            registry.content_type("post").map(|t| t.rest_base.as_str()),
            Some("posts")
        );
    }

    #[test]
    fn unregistered_type_is_not_public() {
        let registry = TypeRegistry::new();
        assert!(!registry.is_public_type("product"));
        assert!(!registry.supports_author_archives("product"));
    }

    #[test]
    fn taxonomy_default_term() {
        let default = Uuid::new_v4();
        let mut registry = TypeRegistry::new();
        registry.register_taxonomy(
            "category",
            TaxonomyConfig {
                rest_base: "categories".to_string(),
                hierarchical: true,
                default_term: Some(default),
            },
        );

        assert_eq!(
            registry.taxonomy("category").and_then(|t| t.default_term),
            Some(default)
        );
        assert!(registry.taxonomy("post_tag").is_none());
    }
}
