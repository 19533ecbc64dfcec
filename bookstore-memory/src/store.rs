//! In-memory storage implementation for document stores.
//!
//! Documents live in per-collection ordered maps keyed by an insertion sequence
//! number, behind an async-aware read-write lock. Natural order is insertion order.

use std::{collections::{BTreeMap, HashMap}, sync::Arc};
use async_trait::async_trait;
use mea::rwlock::RwLock;
use bson::{Bson, Document, Uuid};
use tracing::{debug, trace};

use bookstore_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::{DocumentStoreError, DocumentStoreResult},
    index::{ExplainReport, IndexSpec},
    pipeline::Pipeline,
    query::{Expr, Projection, Query},
    update::{DeleteOutcome, Update, UpdateOutcome},
};

use crate::{
    aggregator,
    evaluator::DocumentEvaluator,
    index::{MemoryIndex, choose_index},
};


/// One collection: documents in natural order plus their secondary indexes.
#[derive(Debug, Default)]
struct MemoryCollection {
    next_seq: u64,
    documents: BTreeMap<u64, (Uuid, Document)>,
    ids: HashMap<Uuid, u64>,
    indexes: Vec<MemoryIndex>,
}

/// Documents a filter selected, with the work it took to find them.
struct Scan {
    matches: Vec<u64>,
    index_name: Option<String>,
    keys_examined: u64,
    documents_examined: u64,
}

impl MemoryCollection {
    /// Finds matching sequence numbers in natural order, seeking an index when one applies.
    fn scan(&self, filter: Option<&Expr>) -> DocumentStoreResult<Scan> {
        let mut matches = Vec::new();

        match choose_index(&self.indexes, filter) {
            Some(choice) => {
                let index = &self.indexes[choice.position];
                let candidates = index.seek(&choice.prefix);
                trace!(index = %index.name(), candidates = candidates.len(), "index scan");

                for seq in &candidates {
                    if let Some((_, document)) = self.documents.get(seq) {
                        if DocumentEvaluator::matches(document, filter)? {
                            matches.push(*seq);
                        }
                    }
                }

                Ok(Scan {
                    matches,
                    index_name: Some(index.name()),
                    keys_examined: candidates.len() as u64,
                    documents_examined: candidates.len() as u64,
                })
            }
            None => {
                for (seq, (_, document)) in &self.documents {
                    if DocumentEvaluator::matches(document, filter)? {
                        matches.push(*seq);
                    }
                }

                Ok(Scan {
                    matches,
                    index_name: None,
                    keys_examined: 0,
                    documents_examined: self.documents.len() as u64,
                })
            }
        }
    }

    fn first_match(&self, filter: &Expr) -> DocumentStoreResult<Option<u64>> {
        Ok(self.scan(Some(filter))?.matches.into_iter().next())
    }

    fn check_unique(&self, document: &Document, except: Option<u64>, collection: &str) -> DocumentStoreResult<()> {
        for index in &self.indexes {
            if index.conflicts(&index.key_of(document), except) {
                return Err(DocumentStoreError::DuplicateKey(index.name(), collection.to_string()));
            }
        }

        Ok(())
    }

    fn push(&mut self, id: Uuid, document: Document) {
        let seq = self.next_seq;
        self.next_seq += 1;

        for index in &mut self.indexes {
            index.insert(seq, &document);
        }
        self.ids.insert(id, seq);
        self.documents.insert(seq, (id, document));
    }
}

fn project(document: &Document, projection: Option<&Projection>) -> Document {
    match projection {
        Some(projection) => projection
            .fields
            .iter()
            .filter_map(|field| {
                document
                    .get(field)
                    .map(|value| (field.clone(), value.clone()))
            })
            .collect(),
        None => document.clone(),
    }
}

fn into_document(value: Bson) -> DocumentStoreResult<Document> {
    match value {
        Bson::Document(document) => Ok(document),
        other => Err(DocumentStoreError::InvalidDocument(format!(
            "expected a document, got {:?}",
            other.element_type()
        ))),
    }
}


/// Thread-safe in-memory document storage backend.
///
/// `InMemoryStore` is cloneable; clones share the same underlying data.
///
/// # Natural order and tie-breaks
///
/// Documents keep insertion order. Sorts are stable, so documents with equal sort
/// keys stay in insertion order, and "first match" for update/delete means the
/// earliest inserted matching document.
///
/// # Indexes
///
/// Declared indexes are maintained on every write. Queries whose filter constrains
/// an index's leading fields with top-level equality read only that index's
/// candidates; everything else scans the collection.
///
/// # Example
///
/// ```ignore
/// use bookstore_memory::InMemoryStore;
/// use bookstore_core::{backend::StoreBackend, query::{Filter, Query}};
/// use bson::{Uuid, Bson, doc};
///
/// let store = InMemoryStore::new();
/// let doc = Bson::Document(doc! { "title": "1984", "author": "George Orwell" });
/// store.insert_documents(vec![(Uuid::new(), doc)], "books").await?;
///
/// let found = store.query_documents(Query::filtered(Filter::eq("title", "1984")), "books").await?;
/// assert_eq!(found.len(), 1);
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    collections: Arc<RwLock<HashMap<String, MemoryCollection>>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder for constructing an `InMemoryStore`.
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }
}


#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn insert_documents(&self, documents: Vec<(Uuid, Bson)>, collection: &str) -> DocumentStoreResult<()> {
        let documents = documents
            .into_iter()
            .map(|(id, value)| into_document(value).map(|document| (id, document)))
            .collect::<DocumentStoreResult<Vec<_>>>()?;

        let mut collections = self.collections.write().await;
        let target = collections
            .entry(collection.to_string())
            .or_default();

        // Validate the whole batch before writing any of it.
        let mut staged = MemoryCollection {
            indexes: target
                .indexes
                .iter()
                .map(|index| MemoryIndex::new(index.spec.clone()))
                .collect(),
            ..MemoryCollection::default()
        };

        for (id, document) in &documents {
            if target.ids.contains_key(id) || staged.ids.contains_key(id) {
                return Err(DocumentStoreError::DocumentAlreadyExists(id.to_string(), collection.to_string()));
            }

            target.check_unique(document, None, collection)?;
            staged.check_unique(document, None, collection)?;
            staged.push(id.clone(), document.clone());
        }

        let inserted = documents.len();
        for (id, document) in documents {
            target.push(id, document);
        }

        debug!(collection, inserted, "inserted documents");

        Ok(())
    }

    async fn query_documents(&self, query: Query, collection: &str) -> DocumentStoreResult<Vec<Bson>> {
        let collections = self.collections.read().await;
        let Some(source) = collections.get(collection) else {
            return Ok(vec![]);
        };

        let scan = source.scan(query.filter.as_ref())?;
        let mut documents: Vec<Document> = scan
            .matches
            .iter()
            .filter_map(|seq| source.documents.get(seq))
            .map(|(_, document)| document.clone())
            .collect();

        if let Some(sort) = &query.sort {
            aggregator::sort(&mut documents, std::slice::from_ref(sort));
        }

        Ok(
            documents
                .iter()
                .skip(query.offset.unwrap_or(0))
                .take(query.limit.unwrap_or(usize::MAX))
                .map(|document| Bson::Document(project(document, query.projection.as_ref())))
                .collect()
        )
    }

    async fn count_documents(&self, filter: Option<Expr>, collection: &str) -> DocumentStoreResult<u64> {
        let collections = self.collections.read().await;

        match collections.get(collection) {
            Some(source) => Ok(source.scan(filter.as_ref())?.matches.len() as u64),
            None => Ok(0),
        }
    }

    async fn update_one(&self, filter: Expr, update: Update, collection: &str) -> DocumentStoreResult<UpdateOutcome> {
        if update.is_empty() {
            return Err(DocumentStoreError::InvalidQuery("update assigns no fields".into()));
        }
        if let Some((field, _)) = update.set.iter().find(|(field, _)| field.is_empty() || field == "_id") {
            return Err(DocumentStoreError::InvalidQuery(format!("cannot assign field {field:?}")));
        }

        let mut collections = self.collections.write().await;
        let Some(target) = collections.get_mut(collection) else {
            return Ok(UpdateOutcome::none());
        };
        let Some(seq) = target.first_match(&filter)? else {
            return Ok(UpdateOutcome::none());
        };
        let Some((_, current)) = target.documents.get(&seq) else {
            return Ok(UpdateOutcome::none());
        };

        let mut updated = current.clone();
        for (field, value) in update.set {
            updated.insert(field, value);
        }

        if &updated == current {
            return Ok(UpdateOutcome { matched: 1, modified: 0 });
        }

        target.check_unique(&updated, Some(seq), collection)?;

        let previous = current.clone();
        for index in &mut target.indexes {
            index.remove(seq, &previous);
            index.insert(seq, &updated);
        }
        if let Some(entry) = target.documents.get_mut(&seq) {
            entry.1 = updated;
        }

        Ok(UpdateOutcome { matched: 1, modified: 1 })
    }

    async fn delete_one(&self, filter: Expr, collection: &str) -> DocumentStoreResult<DeleteOutcome> {
        let mut collections = self.collections.write().await;
        let Some(target) = collections.get_mut(collection) else {
            return Ok(DeleteOutcome::default());
        };
        let Some(seq) = target.first_match(&filter)? else {
            return Ok(DeleteOutcome::default());
        };
        let Some((id, document)) = target.documents.remove(&seq) else {
            return Ok(DeleteOutcome::default());
        };

        target.ids.remove(&id);
        for index in &mut target.indexes {
            index.remove(seq, &document);
        }

        Ok(DeleteOutcome { deleted: 1 })
    }

    async fn aggregate(&self, pipeline: Pipeline, collection: &str) -> DocumentStoreResult<Vec<Bson>> {
        let documents = {
            let collections = self.collections.read().await;
            match collections.get(collection) {
                Some(source) => source
                    .documents
                    .values()
                    .map(|(_, document)| document.clone())
                    .collect(),
                None => vec![],
            }
        };

        trace!(collection, stages = pipeline.stages.len(), input = documents.len(), "running pipeline");

        Ok(
            aggregator::run(&pipeline, documents)?
                .into_iter()
                .map(Bson::Document)
                .collect()
        )
    }

    async fn create_index(&self, index: IndexSpec, collection: &str) -> DocumentStoreResult<String> {
        index.validate()?;
        let name = index.name();

        let mut collections = self.collections.write().await;
        let target = collections
            .entry(collection.to_string())
            .or_default();

        if let Some(existing) = target.indexes.iter().find(|existing| existing.spec.same_keys(&index)) {
            if existing.spec.unique != index.unique {
                return Err(DocumentStoreError::InvalidQuery(format!(
                    "index {} already exists with different options",
                    existing.name()
                )));
            }
            return Ok(existing.name());
        }
        if target.indexes.iter().any(|existing| existing.name() == name) {
            return Err(DocumentStoreError::InvalidQuery(format!(
                "index name {name} is already used by a different key pattern"
            )));
        }

        let mut built = MemoryIndex::new(index);
        for (seq, (_, document)) in &target.documents {
            if built.conflicts(&built.key_of(document), None) {
                return Err(DocumentStoreError::DuplicateKey(name, collection.to_string()));
            }
            built.insert(*seq, document);
        }

        debug!(collection, index = %name, entries = target.documents.len(), "built index");
        target.indexes.push(built);

        Ok(name)
    }

    async fn list_indexes(&self, collection: &str) -> DocumentStoreResult<Vec<IndexSpec>> {
        let collections = self.collections.read().await;

        Ok(match collections.get(collection) {
            Some(source) => source
                .indexes
                .iter()
                .map(|index| IndexSpec { name: Some(index.name()), ..index.spec.clone() })
                .collect(),
            None => vec![],
        })
    }

    async fn explain(&self, query: Query, collection: &str) -> DocumentStoreResult<ExplainReport> {
        let collections = self.collections.read().await;
        let Some(source) = collections.get(collection) else {
            return Ok(ExplainReport::collection_scan(0, 0));
        };

        let scan = source.scan(query.filter.as_ref())?;
        let returned = scan
            .matches
            .len()
            .saturating_sub(query.offset.unwrap_or(0))
            .min(query.limit.unwrap_or(usize::MAX)) as u64;

        Ok(match scan.index_name {
            Some(name) => ExplainReport::index_scan(name, scan.keys_examined, scan.documents_examined, returned),
            None => ExplainReport::collection_scan(scan.documents_examined, returned),
        })
    }
}


/// Builder for constructing [`InMemoryStore`] instances.
///
/// ```ignore
/// use bookstore_memory::InMemoryStore;
/// use bookstore_core::backend::StoreBackendBuilder;
///
/// let store = InMemoryStore::builder().build().await?;
/// ```
#[derive(Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    /// Builds and returns a new, empty [`InMemoryStore`].
    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(InMemoryStore::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookstore_core::{
        index::PlanStage,
        pipeline::{Accumulator, GroupKey},
        query::{Filter, SortDirection},
    };
    use bson::doc;
    use pretty_assertions::assert_eq;

    async fn seeded() -> InMemoryStore {
        let store = InMemoryStore::new();
        let docs = vec![
            doc! { "title": "1984", "author": "George Orwell", "published_year": 1949, "price": 15.0 },
            doc! { "title": "Animal Farm", "author": "George Orwell", "published_year": 1945, "price": 8.5 },
            doc! { "title": "Dune", "author": "Frank Herbert", "published_year": 1965, "price": 15.0 },
            doc! { "title": "1984", "author": "Someone Else", "published_year": 2001, "price": 3.0 },
        ];

        store
            .insert_documents(
                docs.into_iter().map(|d| (Uuid::new(), Bson::Document(d))).collect(),
                "books",
            )
            .await
            .unwrap();

        store
    }

    fn titles(docs: &[Bson]) -> Vec<String> {
        docs.iter()
            .map(|d| d.as_document().unwrap().get_str("title").unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn queries_keep_natural_order_and_stable_sort() {
        let store = seeded().await;

        let all = store.query_documents(Query::new(), "books").await.unwrap();
        assert_eq!(titles(&all), vec!["1984", "Animal Farm", "Dune", "1984"]);

        let by_price = store
            .query_documents(Query::builder().sort("price", SortDirection::Desc).build(), "books")
            .await
            .unwrap();
        // 1984 and Dune tie at 15.0 and keep insertion order
        assert_eq!(titles(&by_price), vec!["1984", "Dune", "Animal Farm", "1984"]);
    }

    #[tokio::test]
    async fn offset_limit_and_projection() {
        let store = seeded().await;

        let page = store
            .query_documents(
                Query::builder()
                    .offset(1)
                    .limit(2)
                    .projection(Projection::include(["title", "price"]))
                    .build(),
                "books",
            )
            .await
            .unwrap();

        assert_eq!(
            page,
            vec![
                Bson::Document(doc! { "title": "Animal Farm", "price": 8.5 }),
                Bson::Document(doc! { "title": "Dune", "price": 15.0 }),
            ]
        );
    }

    #[tokio::test]
    async fn update_one_touches_only_the_first_match() {
        let store = seeded().await;

        let outcome = store
            .update_one(Filter::eq("title", "1984"), Update::set("price", 19.99), "books")
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome { matched: 1, modified: 1 });

        let copies = store
            .query_documents(Query::filtered(Filter::eq("title", "1984")), "books")
            .await
            .unwrap();
        let prices: Vec<f64> = copies.iter().map(|d| d.as_document().unwrap().get_f64("price").unwrap()).collect();
        assert_eq!(prices, vec![19.99, 3.0]);

        let again = store
            .update_one(Filter::eq("title", "1984"), Update::set("price", 19.99), "books")
            .await
            .unwrap();
        assert_eq!(again, UpdateOutcome { matched: 1, modified: 0 });
    }

    #[tokio::test]
    async fn update_creates_missing_fields_and_reports_no_match() {
        let store = seeded().await;

        store
            .update_one(
                Filter::eq("title", "Dune"),
                Update::set("isbn", "978-0441013593").and_set("in_stock", false),
                "books",
            )
            .await
            .unwrap();
        assert_eq!(store.count_documents(Some(Filter::exists("isbn")), "books").await.unwrap(), 1);
        let filter = Filter::eq("title", "Dune").and(Filter::eq("in_stock", false));
        assert_eq!(store.count_documents(Some(filter), "books").await.unwrap(), 1);

        let missing = store
            .update_one(Filter::eq("title", "Moby Dick"), Update::set("price", 1.0), "books")
            .await
            .unwrap();
        assert_eq!(missing, UpdateOutcome::none());

        let nowhere = store
            .update_one(Filter::eq("title", "Dune"), Update::set("price", 1.0), "magazines")
            .await
            .unwrap();
        assert_eq!(nowhere, UpdateOutcome::none());
    }

    #[tokio::test]
    async fn delete_one_removes_at_most_one() {
        let store = seeded().await;

        let deleted = store.delete_one(Filter::eq("title", "1984"), "books").await.unwrap();
        assert_eq!(deleted.deleted, 1);
        assert_eq!(store.count_documents(None, "books").await.unwrap(), 3);

        let remaining = store.query_documents(Query::filtered(Filter::eq("title", "1984")), "books").await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].as_document().unwrap().get_str("author").unwrap(), "Someone Else");

        let absent = store.delete_one(Filter::eq("title", "Moby Dick"), "books").await.unwrap();
        assert_eq!(absent.deleted, 0);
        assert_eq!(store.count_documents(None, "books").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn duplicate_ids_reject_the_whole_batch() {
        let store = InMemoryStore::new();
        let id = Uuid::new();

        let result = store
            .insert_documents(
                vec![
                    (id.clone(), Bson::Document(doc! { "title": "a" })),
                    (id, Bson::Document(doc! { "title": "b" })),
                ],
                "books",
            )
            .await;

        assert!(matches!(result, Err(DocumentStoreError::DocumentAlreadyExists(..))));
        assert_eq!(store.count_documents(None, "books").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn non_documents_are_rejected() {
        let store = InMemoryStore::new();
        let result = store.insert_documents(vec![(Uuid::new(), Bson::Int32(4))], "books").await;

        assert!(matches!(result, Err(DocumentStoreError::InvalidDocument(_))));
    }

    #[tokio::test]
    async fn index_creation_is_idempotent_and_changes_the_plan() {
        let store = seeded().await;
        let lookup = Query::filtered(Filter::eq("title", "1984"));

        let before = store.explain(lookup.clone(), "books").await.unwrap();
        assert!(!before.index_used);
        assert_eq!(before.stage, PlanStage::CollectionScan);
        assert_eq!(before.documents_examined, 4);
        assert_eq!(before.returned, 2);

        let first = store.create_index(IndexSpec::ascending("title"), "books").await.unwrap();
        let second = store.create_index(IndexSpec::ascending("title"), "books").await.unwrap();
        assert_eq!(first, "title_1");
        assert_eq!(first, second);
        assert_eq!(store.list_indexes("books").await.unwrap().len(), 1);

        let after = store.explain(lookup, "books").await.unwrap();
        assert!(after.index_used);
        assert_eq!(after.index_name.as_deref(), Some("title_1"));
        assert_eq!(after.documents_examined, 2);
        assert_eq!(after.returned, 2);
    }

    #[tokio::test]
    async fn indexes_follow_updates_and_deletes() {
        let store = seeded().await;
        store.create_index(IndexSpec::ascending("title"), "books").await.unwrap();

        store
            .update_one(Filter::eq("title", "Dune"), Update::set("title", "Dune Messiah"), "books")
            .await
            .unwrap();
        assert!(store.query_documents(Query::filtered(Filter::eq("title", "Dune")), "books").await.unwrap().is_empty());
        assert_eq!(
            store.query_documents(Query::filtered(Filter::eq("title", "Dune Messiah")), "books").await.unwrap().len(),
            1
        );

        store.delete_one(Filter::eq("title", "Dune Messiah"), "books").await.unwrap();
        let report = store.explain(Query::filtered(Filter::eq("title", "Dune Messiah")), "books").await.unwrap();
        assert!(report.index_used);
        assert_eq!(report.keys_examined, 0);
        assert_eq!(report.returned, 0);
    }

    #[tokio::test]
    async fn unique_indexes_reject_duplicates() {
        let store = seeded().await;

        let conflict = store
            .create_index(IndexSpec::builder().key("title", SortDirection::Asc).unique(true).build(), "books")
            .await;
        assert!(matches!(conflict, Err(DocumentStoreError::DuplicateKey(..))));
        assert!(store.list_indexes("books").await.unwrap().is_empty());

        store
            .create_index(IndexSpec::builder().key("author", SortDirection::Asc).key("title", SortDirection::Asc).unique(true).build(), "books")
            .await
            .unwrap();

        let duplicate = store
            .insert_documents(
                vec![(Uuid::new(), Bson::Document(doc! { "title": "Dune", "author": "Frank Herbert" }))],
                "books",
            )
            .await;
        assert!(matches!(duplicate, Err(DocumentStoreError::DuplicateKey(..))));
        assert_eq!(store.count_documents(None, "books").await.unwrap(), 4);
    }

    #[tokio::test]
    async fn aggregate_runs_over_natural_order() {
        let store = seeded().await;

        let out = store
            .aggregate(
                Pipeline::new().group(GroupKey::field("price"), [("n", Accumulator::Count)]),
                "books",
            )
            .await
            .unwrap();

        assert_eq!(
            out,
            vec![
                Bson::Document(doc! { "_id": 15.0, "n": 2i64 }),
                Bson::Document(doc! { "_id": 8.5, "n": 1i64 }),
                Bson::Document(doc! { "_id": 3.0, "n": 1i64 }),
            ]
        );
    }

    #[tokio::test]
    async fn missing_collections_are_empty() {
        let store = InMemoryStore::new();

        assert!(store.query_documents(Query::new(), "books").await.unwrap().is_empty());
        assert_eq!(store.count_documents(None, "books").await.unwrap(), 0);
        assert!(store.aggregate(Pipeline::new(), "books").await.unwrap().is_empty());
        assert!(store.list_indexes("books").await.unwrap().is_empty());
        assert_eq!(store.delete_one(Filter::eq("title", "x"), "books").await.unwrap().deleted, 0);
    }
}
