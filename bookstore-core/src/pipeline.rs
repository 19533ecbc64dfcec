//! Aggregation pipeline AST.
//!
//! A [`Pipeline`] is an ordered list of [`Stage`]s applied to a collection. Group
//! stages emit one document per distinct key, shaped as
//! `{ "_id": <key>, <output>: <accumulated value>, ... }`, so later sort stages can
//! refer to `_id` and to the accumulator output names.
//!
//! ```ignore
//! use bookstore_core::pipeline::{Accumulator, GroupKey, Pipeline};
//! use bookstore_core::query::Sort;
//!
//! let pipeline = Pipeline::new()
//!     .group(GroupKey::field("author"), [("bookCount", Accumulator::Count)])
//!     .sort([Sort::desc("bookCount"), Sort::asc("_id")])
//!     .limit(1);
//! ```

use crate::query::{Expr, Sort};

/// Key a group stage partitions documents by.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupKey {
    /// The value of a field. Documents missing the field share a `null` key.
    Field(String),
    /// A numeric field rounded down to a multiple of `width`:
    /// `floor(value / width) * width`.
    Bucket {
        field: String,
        width: i64,
    },
}

impl GroupKey {
    pub fn field(field: impl Into<String>) -> Self {
        GroupKey::Field(field.into())
    }

    pub fn bucket(field: impl Into<String>, width: i64) -> Self {
        GroupKey::Bucket { field: field.into(), width }
    }
}

/// Per-group aggregate.
#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    /// Arithmetic mean of a numeric field; non-numeric values are skipped.
    Avg(String),
    /// Sum of a numeric field; non-numeric values are skipped.
    Sum(String),
    /// Number of documents in the group.
    Count,
}

/// One group stage output column.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupOutput {
    pub name: String,
    pub accumulator: Accumulator,
}

/// A single pipeline stage.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// Keep only documents matching the filter.
    Match(Expr),
    /// Partition documents by key and compute accumulators per partition.
    Group {
        key: GroupKey,
        outputs: Vec<GroupOutput>,
    },
    /// Order documents by several keys, the first key being most significant.
    Sort(Vec<Sort>),
    /// Drop the first `n` documents.
    Skip(usize),
    /// Keep at most `n` documents.
    Limit(usize),
}

/// An ordered sequence of stages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    pub stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn matching(self, filter: Expr) -> Self {
        self.stage(Stage::Match(filter))
    }

    pub fn group<I, S>(self, key: GroupKey, outputs: I) -> Self
    where
        I: IntoIterator<Item = (S, Accumulator)>,
        S: Into<String>,
    {
        self.stage(Stage::Group {
            key,
            outputs: outputs
                .into_iter()
                .map(|(name, accumulator)| GroupOutput { name: name.into(), accumulator })
                .collect(),
        })
    }

    pub fn sort(self, keys: impl IntoIterator<Item = Sort>) -> Self {
        self.stage(Stage::Sort(keys.into_iter().collect()))
    }

    pub fn skip(self, n: usize) -> Self {
        self.stage(Stage::Skip(n))
    }

    pub fn limit(self, n: usize) -> Self {
        self.stage(Stage::Limit(n))
    }
}
