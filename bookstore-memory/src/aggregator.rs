//! Aggregation pipeline execution for the in-memory store.
//!
//! Stages run in order over owned documents. Group stages emit groups in the order
//! their keys first appear, which keeps results deterministic without a sort stage.

use bson::{Bson, Document};

use bookstore_core::{
    error::{DocumentStoreError, DocumentStoreResult},
    pipeline::{Accumulator, GroupKey, GroupOutput, Pipeline, Stage},
    query::{Sort, SortDirection},
};

use crate::evaluator::{Comparable, DocumentEvaluator, as_number, compare_fields};

pub(crate) fn run(pipeline: &Pipeline, mut documents: Vec<Document>) -> DocumentStoreResult<Vec<Document>> {
    for stage in &pipeline.stages {
        documents = match stage {
            Stage::Match(expr) => {
                let mut kept = Vec::with_capacity(documents.len());
                for document in documents {
                    if DocumentEvaluator::new(&document).evaluate(expr)? {
                        kept.push(document);
                    }
                }
                kept
            }
            Stage::Group { key, outputs } => group(documents, key, outputs)?,
            Stage::Sort(keys) => {
                sort(&mut documents, keys);
                documents
            }
            Stage::Skip(n) => documents.into_iter().skip(*n).collect(),
            Stage::Limit(n) => documents.into_iter().take(*n).collect(),
        };
    }

    Ok(documents)
}

/// Stable multi-key sort; documents equal on every key keep their relative order.
pub(crate) fn sort(documents: &mut [Document], keys: &[Sort]) {
    documents.sort_by(|a, b| {
        keys.iter()
            .map(|key| {
                let ordering = compare_fields(a.get(&key.field), b.get(&key.field));
                match key.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

fn group_key(document: &Document, key: &GroupKey) -> DocumentStoreResult<Bson> {
    match key {
        GroupKey::Field(field) => Ok(document.get(field).cloned().unwrap_or(Bson::Null)),
        GroupKey::Bucket { field, width } => {
            if *width <= 0 {
                return Err(DocumentStoreError::InvalidQuery(format!(
                    "bucket width must be positive, got {width}"
                )));
            }

            let floor = |value: i64| {
                value
                    .div_euclid(*width)
                    .checked_mul(*width)
                    .map_or(Bson::Null, Bson::Int64)
            };

            // buckets that fall outside the i64 range group under null
            Ok(match document.get(field) {
                Some(Bson::Int32(value)) => floor(*value as i64),
                Some(Bson::Int64(value)) => floor(*value),
                Some(Bson::Double(value)) if value.is_finite() => {
                    let width = *width as f64;
                    let bucket = (value / width).floor() * width;
                    if bucket.fract() == 0.0 && bucket.abs() < i64::MAX as f64 {
                        Bson::Int64(bucket as i64)
                    } else {
                        Bson::Double(bucket)
                    }
                }
                _ => Bson::Null,
            })
        }
    }
}

#[derive(Debug)]
enum AccumulatorState {
    Avg { total: f64, n: u64 },
    Sum { total: f64, integral: Option<i64> },
    Count(i64),
}

impl AccumulatorState {
    fn new(accumulator: &Accumulator) -> Self {
        match accumulator {
            Accumulator::Avg(_) => AccumulatorState::Avg { total: 0.0, n: 0 },
            Accumulator::Sum(_) => AccumulatorState::Sum { total: 0.0, integral: Some(0) },
            Accumulator::Count => AccumulatorState::Count(0),
        }
    }

    fn add(&mut self, accumulator: &Accumulator, document: &Document) {
        match (self, accumulator) {
            (AccumulatorState::Avg { total, n }, Accumulator::Avg(field)) => {
                if let Some(value) = document.get(field).and_then(as_number) {
                    *total += value;
                    *n += 1;
                }
            }
            (AccumulatorState::Sum { total, integral }, Accumulator::Sum(field)) => {
                match document.get(field) {
                    Some(Bson::Int32(value)) => {
                        *total += *value as f64;
                        *integral = integral.and_then(|sum| sum.checked_add(*value as i64));
                    }
                    Some(Bson::Int64(value)) => {
                        *total += *value as f64;
                        *integral = integral.and_then(|sum| sum.checked_add(*value));
                    }
                    Some(Bson::Double(value)) => {
                        *total += value;
                        *integral = None;
                    }
                    _ => {}
                }
            }
            (AccumulatorState::Count(count), Accumulator::Count) => *count += 1,
            _ => {}
        }
    }

    fn finish(self) -> Bson {
        match self {
            AccumulatorState::Avg { n: 0, .. } => Bson::Null,
            AccumulatorState::Avg { total, n } => Bson::Double(total / n as f64),
            AccumulatorState::Sum { integral: Some(sum), .. } => Bson::Int64(sum),
            AccumulatorState::Sum { total, .. } => Bson::Double(total),
            AccumulatorState::Count(count) => Bson::Int64(count),
        }
    }
}

fn group(documents: Vec<Document>, key: &GroupKey, outputs: &[GroupOutput]) -> DocumentStoreResult<Vec<Document>> {
    let mut groups: Vec<(Bson, Vec<AccumulatorState>)> = Vec::new();

    for document in &documents {
        let value = group_key(document, key)?;
        let position = match groups
            .iter()
            .position(|(existing, _)| Comparable::from(existing).total_cmp(&Comparable::from(&value)).is_eq())
        {
            Some(position) => position,
            None => {
                groups.push((
                    value,
                    outputs
                        .iter()
                        .map(|output| AccumulatorState::new(&output.accumulator))
                        .collect(),
                ));
                groups.len() - 1
            }
        };

        for (state, output) in groups[position].1.iter_mut().zip(outputs) {
            state.add(&output.accumulator, document);
        }
    }

    Ok(groups
        .into_iter()
        .map(|(value, states)| {
            let mut out = Document::new();
            out.insert("_id", value);
            for (state, output) in states.into_iter().zip(outputs) {
                out.insert(output.name.clone(), state.finish());
            }
            out
        })
        .collect())
}
