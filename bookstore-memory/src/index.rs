//! Secondary indexes and plan selection for the in-memory store.
//!
//! Each [`MemoryIndex`] maps the key tuple of every document to the sequence numbers
//! of the documents holding it. Sequence numbers are insertion positions, so walking
//! a candidate set in ascending order preserves natural order.

use std::{
    cmp::Ordering,
    collections::{BTreeMap, BTreeSet, HashMap},
};
use bson::{Bson, Document};

use bookstore_core::{index::IndexSpec, query::Expr};

/// Totally ordered projection of a scalar BSON value used as an index key part.
///
/// Numbers collapse to one variant so an `Int32` key matches a `Double` lookup value
/// the same way filter equality does.
#[derive(Debug, Clone)]
pub(crate) enum IndexValue {
    Null,
    Number(f64),
    String(String),
    Bool(bool),
    DateTime(i64),
    /// Arrays, documents and exotic types; only equal to an identical rendering.
    Other(String),
}

impl IndexValue {
    /// Key part for a stored field value; a missing field indexes as `null`.
    pub(crate) fn from_field(value: Option<&Bson>) -> Self {
        match value {
            None | Some(Bson::Null) => IndexValue::Null,
            Some(Bson::Int32(value)) => IndexValue::number(*value as f64),
            Some(Bson::Int64(value)) => IndexValue::number(*value as f64),
            Some(Bson::Double(value)) => IndexValue::number(*value),
            Some(Bson::String(value)) => IndexValue::String(value.clone()),
            Some(Bson::Boolean(value)) => IndexValue::Bool(*value),
            Some(Bson::DateTime(value)) => IndexValue::DateTime(value.timestamp_millis()),
            Some(other) => IndexValue::Other(other.to_string()),
        }
    }

    /// Key part for a lookup value. Only scalars can seek an index.
    pub(crate) fn from_lookup(value: &Bson) -> Option<Self> {
        match value {
            Bson::Null
            | Bson::Int32(_)
            | Bson::Int64(_)
            | Bson::Double(_)
            | Bson::String(_)
            | Bson::Boolean(_)
            | Bson::DateTime(_) => Some(Self::from_field(Some(value))),
            _ => None,
        }
    }

    fn number(value: f64) -> Self {
        // -0.0 and 0.0 are equal under filter equality
        IndexValue::Number(if value == 0.0 { 0.0 } else { value })
    }

    fn rank(&self) -> u8 {
        match self {
            IndexValue::Null => 0,
            IndexValue::Number(_) => 1,
            IndexValue::String(_) => 2,
            IndexValue::Bool(_) => 3,
            IndexValue::DateTime(_) => 4,
            IndexValue::Other(_) => 5,
        }
    }
}

impl Ord for IndexValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (IndexValue::Null, IndexValue::Null) => Ordering::Equal,
            (IndexValue::Number(a), IndexValue::Number(b)) => a.total_cmp(b),
            (IndexValue::String(a), IndexValue::String(b)) => a.cmp(b),
            (IndexValue::Bool(a), IndexValue::Bool(b)) => a.cmp(b),
            (IndexValue::DateTime(a), IndexValue::DateTime(b)) => a.cmp(b),
            (IndexValue::Other(a), IndexValue::Other(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for IndexValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for IndexValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for IndexValue {}

/// A declared index and its entries.
#[derive(Debug, Clone)]
pub(crate) struct MemoryIndex {
    pub(crate) spec: IndexSpec,
    entries: BTreeMap<Vec<IndexValue>, BTreeSet<u64>>,
}

impl MemoryIndex {
    pub(crate) fn new(spec: IndexSpec) -> Self {
        Self { spec, entries: BTreeMap::new() }
    }

    pub(crate) fn name(&self) -> String {
        self.spec.name()
    }

    pub(crate) fn key_of(&self, document: &Document) -> Vec<IndexValue> {
        self.spec
            .fields()
            .map(|field| IndexValue::from_field(document.get(field)))
            .collect()
    }

    pub(crate) fn insert(&mut self, seq: u64, document: &Document) {
        self.entries
            .entry(self.key_of(document))
            .or_default()
            .insert(seq);
    }

    pub(crate) fn remove(&mut self, seq: u64, document: &Document) {
        let key = self.key_of(document);

        if let Some(seqs) = self.entries.get_mut(&key) {
            seqs.remove(&seq);
            if seqs.is_empty() {
                self.entries.remove(&key);
            }
        }
    }

    /// True when a unique index already holds `key` for a document other than `except`.
    pub(crate) fn conflicts(&self, key: &[IndexValue], except: Option<u64>) -> bool {
        self.spec.unique
            && self
                .entries
                .get(key)
                .is_some_and(|seqs| seqs.iter().any(|seq| Some(*seq) != except))
    }

    /// Sequence numbers of every entry whose key starts with `prefix`, in natural order.
    pub(crate) fn seek(&self, prefix: &[IndexValue]) -> BTreeSet<u64> {
        self.entries
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .flat_map(|(_, seqs)| seqs.iter().copied())
            .collect()
    }
}

/// The index a query will seek, with the key prefix to seek for.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct IndexChoice {
    pub(crate) position: usize,
    pub(crate) prefix: Vec<IndexValue>,
}

/// Picks the index covering the longest key prefix with top-level equality predicates.
///
/// Ties go to the index declared first. Returns `None` when no index's leading field
/// is constrained by equality, which means a collection scan.
pub(crate) fn choose_index(indexes: &[MemoryIndex], filter: Option<&Expr>) -> Option<IndexChoice> {
    let filter = filter?;
    let mut equalities: HashMap<&str, IndexValue> = HashMap::new();

    for (field, value) in filter.equality_predicates() {
        if let Some(key) = IndexValue::from_lookup(value) {
            equalities.entry(field).or_insert(key);
        }
    }

    let mut best: Option<IndexChoice> = None;

    for (position, index) in indexes.iter().enumerate() {
        let prefix: Vec<IndexValue> = index
            .spec
            .fields()
            .map_while(|field| equalities.get(field).cloned())
            .collect();

        if prefix.is_empty() {
            continue;
        }
        if best.as_ref().is_none_or(|choice| prefix.len() > choice.prefix.len()) {
            best = Some(IndexChoice { position, prefix });
        }
    }

    best
}
