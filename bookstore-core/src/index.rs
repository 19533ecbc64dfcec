//! Index declarations and query plan diagnostics.
//!
//! Indexes are administrative hints to the store, not part of the data model.
//! [`IndexSpec`] declares one; [`ExplainReport`] describes how a store satisfied a
//! query and whether it used one.

use serde::{Deserialize, Serialize};

use crate::{
    error::{DocumentStoreError, DocumentStoreResult},
    query::SortDirection,
};

/// One field of an index key pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexKey {
    pub field: String,
    pub direction: SortDirection,
}

/// Declaration of a secondary index over one or more fields.
///
/// Two specs describe the same index when their key patterns are equal; the name is
/// derived from the key pattern unless set explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub keys: Vec<IndexKey>,
    pub name: Option<String>,
    pub unique: bool,
}

impl IndexSpec {
    pub fn builder() -> IndexSpecBuilder {
        IndexSpecBuilder::default()
    }

    /// Single ascending field index.
    pub fn ascending(field: impl Into<String>) -> Self {
        Self::builder().key(field, SortDirection::Asc).build()
    }

    /// The explicit name, or the conventional `field_dir` name (e.g. `author_1_published_year_1`).
    pub fn name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self
                .keys
                .iter()
                .map(|key| format!("{}_{}", key.field, key.direction.as_i32()))
                .collect::<Vec<_>>()
                .join("_"),
        }
    }

    /// Field names in key order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(|key| key.field.as_str())
    }

    /// True when both specs index the same fields in the same order and directions.
    pub fn same_keys(&self, other: &IndexSpec) -> bool {
        self.keys == other.keys
    }

    pub fn validate(&self) -> DocumentStoreResult<()> {
        if self.keys.is_empty() {
            return Err(DocumentStoreError::InvalidQuery("index declares no keys".into()));
        }

        for (i, key) in self.keys.iter().enumerate() {
            if key.field.is_empty() {
                return Err(DocumentStoreError::InvalidQuery("index key with empty field name".into()));
            }
            if self.keys[..i].iter().any(|earlier| earlier.field == key.field) {
                return Err(DocumentStoreError::InvalidQuery(format!(
                    "field {} appears twice in index key",
                    key.field
                )));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct IndexSpecBuilder {
    keys: Vec<IndexKey>,
    name: Option<String>,
    unique: bool,
}

impl IndexSpecBuilder {
    /// Appends a key field; call order is key order.
    pub fn key(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.keys.push(IndexKey { field: field.into(), direction });
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    pub fn build(self) -> IndexSpec {
        IndexSpec {
            keys: self.keys,
            name: self.name,
            unique: self.unique,
        }
    }
}

/// The access path a store chose for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanStage {
    /// Every document in the collection was examined.
    CollectionScan,
    /// Candidates came from an index.
    IndexScan,
}

/// Diagnostic description of how a query was executed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplainReport {
    /// Whether an index scan satisfied the query.
    pub index_used: bool,
    /// Name of the index used, if any.
    pub index_name: Option<String>,
    pub stage: PlanStage,
    pub keys_examined: u64,
    pub documents_examined: u64,
    pub returned: u64,
}

impl ExplainReport {
    pub fn collection_scan(documents_examined: u64, returned: u64) -> Self {
        Self {
            index_used: false,
            index_name: None,
            stage: PlanStage::CollectionScan,
            keys_examined: 0,
            documents_examined,
            returned,
        }
    }

    pub fn index_scan(index_name: impl Into<String>, keys_examined: u64, documents_examined: u64, returned: u64) -> Self {
        Self {
            index_used: true,
            index_name: Some(index_name.into()),
            stage: PlanStage::IndexScan,
            keys_examined,
            documents_examined,
            returned,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn derived_names_follow_key_pattern() {
        let compound = IndexSpec::builder()
            .key("author", SortDirection::Asc)
            .key("published_year", SortDirection::Asc)
            .build();

        assert_eq!(IndexSpec::ascending("title").name(), "title_1");
        assert_eq!(compound.name(), "author_1_published_year_1");
        assert_eq!(
            IndexSpec::builder().key("price", SortDirection::Desc).build().name(),
            "price_-1"
        );
    }

    #[test]
    fn explicit_name_wins() {
        let spec = IndexSpec::builder()
            .key("title", SortDirection::Asc)
            .name("by_title")
            .build();

        assert_eq!(spec.name(), "by_title");
        assert!(spec.same_keys(&IndexSpec::ascending("title")));
    }

    #[test]
    fn validation_rejects_empty_and_repeated_keys() {
        assert!(IndexSpec::builder().build().validate().is_err());
        assert!(
            IndexSpec::builder()
                .key("title", SortDirection::Asc)
                .key("title", SortDirection::Desc)
                .build()
                .validate()
                .is_err()
        );
        assert!(IndexSpec::ascending("title").validate().is_ok());
    }
}
