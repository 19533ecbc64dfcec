//! Core traits for document representation and serialization.
//!
//! Every stored type implements [`Document`]; [`DocumentExt`] converts documents
//! between the typed form, BSON (what backends store) and JSON (what fixtures and
//! exports use).

use bson::{Bson, Uuid, de::deserialize_from_bson, ser::serialize_to_bson};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, from_value, to_value};

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// Core trait that all documents stored in a document store must implement.
///
/// Every document has a unique identifier and names the collection it lives in by default.
///
/// # Example
///
/// ```ignore
/// use bookstore_core::document::Document;
/// use bson::Uuid;
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// pub struct Shelf {
///     pub id: Uuid,
///     pub label: String,
/// }
///
/// impl Document for Shelf {
///     fn id(&self) -> &Uuid {
///         &self.id
///     }
///
///     fn collection_name() -> &'static str {
///         "shelves"
///     }
/// }
/// ```
pub trait Document: Serialize + for<'de> Deserialize<'de> + Send + Sync + Clone + 'static {
    /// Returns a reference to this document's unique identifier.
    fn id(&self) -> &Uuid;

    /// Returns the default collection name for this document type.
    fn collection_name() -> &'static str;
}

/// Extension trait providing serialization utilities for documents.
///
/// Automatically implemented for every [`Document`].
pub trait DocumentExt: Document {
    /// Converts this document to a BSON value for storage.
    fn to_bson(&self) -> DocumentStoreResult<Bson>;

    /// Creates a document from a BSON value.
    fn from_bson(bson: Bson) -> DocumentStoreResult<Self>;

    /// Converts this document to a JSON value.
    fn to_json(&self) -> DocumentStoreResult<Value>;

    /// Creates a document from a JSON value.
    fn from_json(value: Value) -> DocumentStoreResult<Self>;
}

impl<D: Document> DocumentExt for D {
    fn to_bson(&self) -> DocumentStoreResult<Bson> {
        match serialize_to_bson(self)? {
            doc @ Bson::Document(_) => Ok(doc),
            other => Err(DocumentStoreError::InvalidDocument(format!(
                "expected a document, serialized to {:?}",
                other.element_type()
            ))),
        }
    }

    fn from_bson(bson: Bson) -> DocumentStoreResult<Self> {
        Ok(deserialize_from_bson(bson)?)
    }

    fn to_json(&self) -> DocumentStoreResult<Value> {
        Ok(to_value(self)?)
    }

    fn from_json(value: Value) -> DocumentStoreResult<Self> {
        Ok(from_value(value)?)
    }
}

/// Deserializes a raw BSON value returned by a backend into any serde type.
///
/// Used for shapes that are not full documents, such as projections and pipeline output.
pub fn decode_bson<T: DeserializeOwned>(bson: Bson) -> DocumentStoreResult<T> {
    Ok(deserialize_from_bson(bson)?)
}
