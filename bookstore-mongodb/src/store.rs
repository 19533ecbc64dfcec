use async_trait::async_trait;
use futures::TryStreamExt;
use bson::{Bson, Document, Uuid, doc};
use mongodb::{
    Client, Collection as MongoCollection, IndexModel,
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::{ClientOptions, FindOptions, IndexOptions},
};
use tracing::{debug, warn};

use bookstore_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::{DocumentStoreError, DocumentStoreResult},
    index::{ExplainReport, IndexSpec, IndexSpecBuilder},
    pipeline::Pipeline,
    query::{Expr, Query, SortDirection},
    update::{DeleteOutcome, Update, UpdateOutcome},
};

use crate::query::{
    MongoPipelineTranslator, MongoQueryTranslator, index_keys, projection_document, sort_document,
};

const DUPLICATE_KEY: i32 = 11000;
const NAMESPACE_NOT_FOUND: i32 = 26;


/// MongoDB backend. Each document is stored with its identifier as `_id`; the `_id`
/// field is stripped again on the way out.
#[derive(Debug)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn builder(dsn: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(dsn, database)
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(collection_name)
    }

    fn prepare_document(&self, id: Uuid, document: Bson) -> DocumentStoreResult<Document> {
        let Bson::Document(mut document) = document else {
            return Err(DocumentStoreError::InvalidDocument("Expected document".into()));
        };

        document.insert("_id", Bson::from(id));
        Ok(document)
    }

    fn restore_document(&self, mut document: Document) -> Bson {
        document.remove("_id");
        Bson::Document(document)
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        self.client.shutdown().await;

        Ok(())
    }
}

/// Maps driver errors onto store errors; connection failures become `Unavailable`.
fn map_error(error: MongoError, collection: &str) -> DocumentStoreError {
    match error.kind.as_ref() {
        ErrorKind::ServerSelection { .. }
        | ErrorKind::Io(_)
        | ErrorKind::ConnectionPoolCleared { .. } => {
            warn!(collection, %error, "mongodb unavailable");
            DocumentStoreError::Unavailable(error.to_string())
        }
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY => {
            DocumentStoreError::DuplicateKey(duplicate_index(&write.message), collection.to_string())
        }
        ErrorKind::InsertMany(failure) => match failure
            .write_errors
            .as_ref()
            .and_then(|errors| errors.iter().find(|e| e.code == DUPLICATE_KEY))
        {
            Some(write) => DocumentStoreError::DuplicateKey(duplicate_index(&write.message), collection.to_string()),
            None => DocumentStoreError::Backend(error.to_string()),
        },
        ErrorKind::Command(command) if command.code == DUPLICATE_KEY => {
            DocumentStoreError::DuplicateKey(duplicate_index(&command.message), collection.to_string())
        }
        _ => DocumentStoreError::Backend(error.to_string()),
    }
}

/// Index name out of an `E11000 ... index: <name> dup key: ...` message.
fn duplicate_index(message: &str) -> String {
    message
        .split_once("index: ")
        .and_then(|(_, rest)| rest.split_whitespace().next())
        .unwrap_or("unknown")
        .to_string()
}

fn is_namespace_missing(error: &MongoError) -> bool {
    matches!(error.kind.as_ref(), ErrorKind::Command(command) if command.code == NAMESPACE_NOT_FOUND)
}

fn as_u64(value: Option<&Bson>) -> u64 {
    match value {
        Some(Bson::Int32(n)) => (*n).max(0) as u64,
        Some(Bson::Int64(n)) => (*n).max(0) as u64,
        Some(Bson::Double(n)) if *n > 0.0 => *n as u64,
        _ => 0,
    }
}

/// Finds the first `IXSCAN` stage anywhere in a plan tree.
fn find_index_scan(plan: &Document) -> Option<&Document> {
    if plan.get_str("stage").is_ok_and(|stage| stage == "IXSCAN") {
        return Some(plan);
    }

    plan.values().find_map(|value| match value {
        Bson::Document(child) => find_index_scan(child),
        Bson::Array(children) => children.iter().find_map(|child| match child {
            Bson::Document(child) => find_index_scan(child),
            _ => None,
        }),
        _ => None,
    })
}

/// Reads an `explain` command reply with `executionStats` verbosity.
fn parse_explain(reply: &Document) -> ExplainReport {
    let stats = reply.get_document("executionStats").ok();
    let stat = |name: &str| as_u64(stats.and_then(|stats| stats.get(name)));

    let keys_examined = stat("totalKeysExamined");
    let documents_examined = stat("totalDocsExamined");
    let returned = stat("nReturned");

    let winning = reply
        .get_document("queryPlanner")
        .and_then(|planner| planner.get_document("winningPlan"))
        .ok();

    match winning.and_then(find_index_scan) {
        Some(scan) => ExplainReport::index_scan(
            scan.get_str("indexName").unwrap_or_default(),
            keys_examined,
            documents_examined,
            returned,
        ),
        None => ExplainReport::collection_scan(documents_examined, returned),
    }
}

fn index_from_model(model: IndexModel) -> Option<IndexSpec> {
    let options = model.options.unwrap_or_default();
    let name = options.name.unwrap_or_default();

    if name == "_id_" {
        return None;
    }

    let mut builder = IndexSpecBuilder::default();
    for (field, direction) in model.keys {
        let direction = match direction {
            Bson::Int32(n) => SortDirection::from_i32(n),
            Bson::Int64(n) => SortDirection::from_i32(n as i32),
            Bson::Double(n) => SortDirection::from_i32(n as i32),
            _ => None,
        };
        // text, hashed and geo keys have no direction and no counterpart here
        builder = builder.key(field, direction?);
    }

    Some(builder.name(name).unique(options.unique.unwrap_or(false)).build())
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn insert_documents(&self, documents: Vec<(Uuid, Bson)>, collection: &str) -> DocumentStoreResult<()> {
        if documents.is_empty() {
            return Ok(());
        }

        let documents = documents
            .into_iter()
            .map(|(id, doc)| self.prepare_document(id, doc))
            .collect::<DocumentStoreResult<Vec<Document>>>()?;

        self.get_collection(collection)
            .insert_many(documents)
            .await
            .map_err(|e| map_error(e, collection))?;

        Ok(())
    }

    async fn query_documents(&self, query: Query, collection: &str) -> DocumentStoreResult<Vec<Bson>> {
        let mut options = FindOptions::default();

        if let Some(limit) = query.limit {
            options.limit = Some(limit as i64);
        }
        if let Some(skip) = query.offset {
            options.skip = Some(skip as u64);
        }
        if let Some(sort) = &query.sort {
            options.sort = Some(sort_document(std::slice::from_ref(sort)));
        }
        if let Some(projection) = &query.projection {
            options.projection = Some(projection_document(projection));
        }

        let filter = MongoQueryTranslator::filter(query.filter.as_ref())?;
        debug!(collection, %filter, "find");

        Ok(
            self.get_collection(collection)
                .find(filter)
                .with_options(options)
                .await
                .map_err(|e| map_error(e, collection))?
                .try_collect::<Vec<Document>>()
                .await
                .map_err(|e| map_error(e, collection))?
                .into_iter()
                .map(|doc| self.restore_document(doc))
                .collect()
        )
    }

    async fn count_documents(&self, filter: Option<Expr>, collection: &str) -> DocumentStoreResult<u64> {
        self.get_collection(collection)
            .count_documents(MongoQueryTranslator::filter(filter.as_ref())?)
            .await
            .map_err(|e| map_error(e, collection))
    }

    async fn update_one(&self, filter: Expr, update: Update, collection: &str) -> DocumentStoreResult<UpdateOutcome> {
        if update.is_empty() {
            return Err(DocumentStoreError::InvalidQuery("update assigns no fields".into()));
        }

        let set: Document = update.set.into_iter().collect();
        let result = self.get_collection(collection)
            .update_one(MongoQueryTranslator::filter(Some(&filter))?, doc! { "$set": set })
            .await
            .map_err(|e| map_error(e, collection))?;

        Ok(UpdateOutcome {
            matched: result.matched_count,
            modified: result.modified_count,
        })
    }

    async fn delete_one(&self, filter: Expr, collection: &str) -> DocumentStoreResult<DeleteOutcome> {
        let result = self.get_collection(collection)
            .delete_one(MongoQueryTranslator::filter(Some(&filter))?)
            .await
            .map_err(|e| map_error(e, collection))?;

        Ok(DeleteOutcome { deleted: result.deleted_count })
    }

    async fn aggregate(&self, pipeline: Pipeline, collection: &str) -> DocumentStoreResult<Vec<Bson>> {
        let stages = MongoPipelineTranslator::translate(&pipeline)?;
        debug!(collection, stages = stages.len(), "aggregate");

        Ok(
            self.get_collection(collection)
                .aggregate(stages)
                .await
                .map_err(|e| map_error(e, collection))?
                .try_collect::<Vec<Document>>()
                .await
                .map_err(|e| map_error(e, collection))?
                .into_iter()
                .map(Bson::Document)
                .collect()
        )
    }

    async fn create_index(&self, index: IndexSpec, collection: &str) -> DocumentStoreResult<String> {
        index.validate()?;

        let result = self.get_collection(collection)
            .create_index(
                IndexModel::builder()
                .keys(index_keys(&index))
                .options(
                    IndexOptions::builder()
                    .name(index.name())
                    .unique(index.unique)
                    .build()
                )
                .build()
            )
            .await
            .map_err(|e| map_error(e, collection))?;

        Ok(result.index_name)
    }

    async fn list_indexes(&self, collection: &str) -> DocumentStoreResult<Vec<IndexSpec>> {
        let cursor = match self.get_collection(collection).list_indexes().await {
            Ok(cursor) => cursor,
            Err(error) if is_namespace_missing(&error) => return Ok(vec![]),
            Err(error) => return Err(map_error(error, collection)),
        };

        Ok(
            cursor
                .try_collect::<Vec<IndexModel>>()
                .await
                .map_err(|e| map_error(e, collection))?
                .into_iter()
                .filter_map(index_from_model)
                .collect()
        )
    }

    async fn explain(&self, query: Query, collection: &str) -> DocumentStoreResult<ExplainReport> {
        let mut find = doc! {
            "find": collection,
            "filter": MongoQueryTranslator::filter(query.filter.as_ref())?,
        };
        if let Some(sort) = &query.sort {
            find.insert("sort", sort_document(std::slice::from_ref(sort)));
        }
        if let Some(skip) = query.offset {
            find.insert("skip", skip as i64);
        }
        if let Some(limit) = query.limit {
            find.insert("limit", limit as i64);
        }

        let reply = self.client
            .database(&self.database)
            .run_command(doc! { "explain": find, "verbosity": "executionStats" })
            .await
            .map_err(|e| map_error(e, collection))?;

        Ok(parse_explain(&reply))
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        self.shutdown().await
    }
}

pub struct MongoDbStoreBuilder {
    dsn: String,
    database: String,
}

impl MongoDbStoreBuilder {
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
        }
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    /// Parses the connection string and creates the client. The driver connects lazily,
    /// so an unreachable server surfaces as `Unavailable` on the first operation.
    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(MongoDbStore::new(
            Client::with_options(
                ClientOptions::parse(&self.dsn)
                    .await
                    .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?,
            )
            .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?,
            self.database,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn explain_reads_index_scans_from_nested_plans() {
        let reply = doc! {
            "queryPlanner": {
                "winningPlan": {
                    "stage": "FETCH",
                    "inputStage": { "stage": "IXSCAN", "indexName": "title_1", "keyPattern": { "title": 1 } },
                }
            },
            "executionStats": { "nReturned": 1, "totalKeysExamined": 1, "totalDocsExamined": 1 },
        };

        assert_eq!(parse_explain(&reply), ExplainReport::index_scan("title_1", 1, 1, 1));
    }

    #[test]
    fn explain_without_index_is_a_collection_scan() {
        let reply = doc! {
            "queryPlanner": { "winningPlan": { "stage": "COLLSCAN", "direction": "forward" } },
            "executionStats": { "nReturned": 2, "totalKeysExamined": 0, "totalDocsExamined": 12i64 },
        };

        let report = parse_explain(&reply);
        assert!(!report.index_used);
        assert_eq!(report.documents_examined, 12);
        assert_eq!(report.returned, 2);
    }

    #[test]
    fn duplicate_key_messages_name_the_index() {
        let message = "E11000 duplicate key error collection: plp_bookstore.books index: title_1 dup key: { title: \"1984\" }";

        assert_eq!(duplicate_index(message), "title_1");
        assert_eq!(duplicate_index("something else"), "unknown");
    }

    #[test]
    fn listed_indexes_skip_the_id_index() {
        let id = IndexModel::builder()
            .keys(doc! { "_id": 1 })
            .options(IndexOptions::builder().name("_id_".to_string()).build())
            .build();
        let compound = IndexModel::builder()
            .keys(doc! { "author": 1, "published_year": 1 })
            .options(IndexOptions::builder().name("author_1_published_year_1".to_string()).build())
            .build();

        assert_eq!(index_from_model(id), None);

        let spec = index_from_model(compound).unwrap();
        assert_eq!(spec.name(), "author_1_published_year_1");
        assert_eq!(spec.fields().collect::<Vec<_>>(), vec!["author", "published_year"]);
        assert!(!spec.unique);
    }
}
