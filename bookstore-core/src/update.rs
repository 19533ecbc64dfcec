//! Single-document mutations and their outcomes.
//!
//! Updates and deletes always target the first document a filter matches in
//! natural order, and report how many documents were touched instead of failing
//! on zero matches.

use bson::Bson;
use serde::{Deserialize, Serialize};

/// A set of field assignments applied to one document.
///
/// Assigning a field the document does not have creates it.
///
/// ```ignore
/// use bookstore_core::update::Update;
///
/// let update = Update::set("price", 19.99).and_set("in_stock", false);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    /// Field assignments, applied in order.
    pub set: Vec<(String, Bson)>,
}

impl Update {
    /// Creates an update assigning a single field.
    pub fn set(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self { set: vec![(field.into(), value.into())] }
    }

    /// Adds another assignment to this update.
    pub fn and_set(mut self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.set.push((field.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}

/// Result of an update-one request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateOutcome {
    /// Documents matched by the filter (0 or 1).
    pub matched: u64,
    /// Documents whose content actually changed (0 or 1).
    pub modified: u64,
}

impl UpdateOutcome {
    pub fn none() -> Self {
        Self::default()
    }
}

/// Result of a delete-one request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOutcome {
    /// Documents removed (0 or 1).
    pub deleted: u64,
}
