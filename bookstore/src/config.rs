//! Catalog configuration.
//!
//! Defaults cover local use with the in-memory backend. `BOOKSTORE_*` environment
//! variables override them:
//!
//! | Variable | Meaning | Default |
//! |---|---|---|
//! | `BOOKSTORE_BACKEND` | `memory` or `mongodb` | `memory` |
//! | `BOOKSTORE_MONGODB_URI` | MongoDB connection string | `mongodb://localhost:27017` |
//! | `BOOKSTORE_DATABASE` | MongoDB database name | `plp_bookstore` |
//! | `BOOKSTORE_COLLECTION` | Collection holding the books | `books` |
//! | `BOOKSTORE_PAGE_SIZE` | Page size used by `BookCatalog::paginate` | `5` |

use serde::{Deserialize, Serialize};
use tracing::debug;

use bookstore_core::{backend::StoreBackendBuilder, store::DocumentStore};
use bookstore_memory::InMemoryStore;

use crate::{
    catalog::BookCatalog,
    error::{CatalogError, CatalogResult},
};

pub const DEFAULT_COLLECTION: &str = "books";
pub const DEFAULT_DATABASE: &str = "plp_bookstore";
pub const DEFAULT_MONGODB_URI: &str = "mongodb://localhost:27017";
pub const DEFAULT_PAGE_SIZE: usize = 5;

fn default_database() -> String {
    DEFAULT_DATABASE.to_string()
}

/// Which document store backs the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
    #[default]
    Memory,
    #[serde(rename = "mongodb")]
    MongoDb {
        uri: String,
        #[serde(default = "default_database")]
        database: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    pub collection: String,
    pub page_size: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::Memory,
            collection: DEFAULT_COLLECTION.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl CatalogConfig {
    /// Defaults with `BOOKSTORE_*` environment overrides applied.
    pub fn from_env() -> CatalogResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults with overrides read through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> CatalogResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(backend) = lookup("BOOKSTORE_BACKEND") {
            config.backend = match backend.trim().to_ascii_lowercase().as_str() {
                "" | "memory" => BackendConfig::Memory,
                "mongodb" | "mongo" => BackendConfig::MongoDb {
                    uri: lookup("BOOKSTORE_MONGODB_URI").unwrap_or_else(|| DEFAULT_MONGODB_URI.to_string()),
                    database: lookup("BOOKSTORE_DATABASE").unwrap_or_else(default_database),
                },
                other => {
                    return Err(CatalogError::InvalidArgument(format!(
                        "unknown BOOKSTORE_BACKEND {other:?}, expected memory or mongodb"
                    )));
                }
            };
        }

        if let Some(collection) = lookup("BOOKSTORE_COLLECTION")
            && !collection.is_empty()
        {
            config.collection = collection;
        }

        if let Some(page_size) = lookup("BOOKSTORE_PAGE_SIZE") {
            config.page_size = match page_size.trim().parse::<usize>() {
                Ok(size) if size > 0 => size,
                _ => {
                    return Err(CatalogError::InvalidArgument(format!(
                        "BOOKSTORE_PAGE_SIZE must be a positive integer, got {page_size:?}"
                    )));
                }
            };
        }

        Ok(config)
    }

    /// Builds the configured backend and returns a catalog over it.
    pub async fn connect(&self) -> CatalogResult<BookCatalog> {
        let store = match &self.backend {
            BackendConfig::Memory => DocumentStore::new(InMemoryStore::builder().build().await?).into_dyn(),
            #[cfg(feature = "mongodb")]
            BackendConfig::MongoDb { uri, database } => {
                DocumentStore::new(bookstore_mongodb::MongoDbStore::builder(uri, database).build().await?).into_dyn()
            }
            #[cfg(not(feature = "mongodb"))]
            BackendConfig::MongoDb { .. } => {
                return Err(CatalogError::InvalidArgument(
                    "the mongodb backend requires the `mongodb` feature".into(),
                ));
            }
        };

        debug!(backend = self.backend_kind(), collection = %self.collection, "connected catalog");

        Ok(BookCatalog::new(store)
            .with_collection(&self.collection)
            .with_page_size(self.page_size))
    }

    fn backend_kind(&self) -> &'static str {
        match self.backend {
            BackendConfig::Memory => "memory",
            BackendConfig::MongoDb { .. } => "mongodb",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn defaults_without_overrides() {
        let config = CatalogConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config, CatalogConfig::default());
        assert_eq!(config.collection, "books");
        assert_eq!(config.page_size, 5);
        assert_eq!(config.backend, BackendConfig::Memory);
    }

    #[test]
    fn mongodb_backend_with_defaults() {
        let config = CatalogConfig::from_lookup(lookup(&[("BOOKSTORE_BACKEND", "mongodb")])).unwrap();

        assert_eq!(
            config.backend,
            BackendConfig::MongoDb {
                uri: "mongodb://localhost:27017".into(),
                database: "plp_bookstore".into(),
            }
        );
    }

    #[test]
    fn overrides_apply() {
        let config = CatalogConfig::from_lookup(lookup(&[
            ("BOOKSTORE_BACKEND", "MongoDB"),
            ("BOOKSTORE_MONGODB_URI", "mongodb://db:27017"),
            ("BOOKSTORE_DATABASE", "shop"),
            ("BOOKSTORE_COLLECTION", "catalog"),
            ("BOOKSTORE_PAGE_SIZE", "10"),
        ]))
        .unwrap();

        assert_eq!(config.collection, "catalog");
        assert_eq!(config.page_size, 10);
        assert_eq!(
            config.backend,
            BackendConfig::MongoDb { uri: "mongodb://db:27017".into(), database: "shop".into() }
        );
    }

    #[test]
    fn invalid_values_are_rejected() {
        for vars in [
            [("BOOKSTORE_BACKEND", "postgres")],
            [("BOOKSTORE_PAGE_SIZE", "0")],
            [("BOOKSTORE_PAGE_SIZE", "five")],
        ] {
            assert!(matches!(
                CatalogConfig::from_lookup(lookup(&vars)),
                Err(CatalogError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn deserializes_from_json() {
        let config: CatalogConfig = serde_json::from_value(serde_json::json!({
            "backend": { "kind": "mongodb", "uri": "mongodb://db:27017" },
            "collection": "books",
            "page_size": 5,
        }))
        .unwrap();

        assert_eq!(
            config.backend,
            BackendConfig::MongoDb { uri: "mongodb://db:27017".into(), database: "plp_bookstore".into() }
        );
    }

    #[tokio::test]
    async fn connects_to_memory() {
        let catalog = CatalogConfig::default().connect().await.unwrap();

        assert_eq!(catalog.count().await.unwrap(), 0);
    }
}
