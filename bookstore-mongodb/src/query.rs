//! Translation from bookstore query and pipeline types to MongoDB syntax.
//!
//! Filters become MongoDB query documents and pipelines become aggregation stage
//! lists, for execution by the MongoDB query engine.

use bson::{Bson, Document, doc};

use bookstore_core::{
    error::{DocumentStoreError, DocumentStoreResult},
    index::IndexSpec,
    pipeline::{Accumulator, GroupKey, GroupOutput, Pipeline, Stage},
    query::{Expr, FieldOp, Projection, QueryVisitor, Sort},
};


/// Translates filter expressions into MongoDB query documents.
///
/// This struct implements the [`QueryVisitor`] trait to convert abstract
/// query expressions into MongoDB's native BSON query syntax.
pub(crate) struct MongoQueryTranslator;

impl MongoQueryTranslator {
    /// Query document for an optional filter; no filter matches everything.
    pub(crate) fn filter(expr: Option<&Expr>) -> DocumentStoreResult<Document> {
        match expr {
            Some(expr) => MongoQueryTranslator.visit_expr(expr),
            None => Ok(doc! {}),
        }
    }
}

impl QueryVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$and": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$or": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        // $not only applies to operator expressions, so negate whole clauses with $nor
        Ok(doc! {
            "$nor": [self.visit_expr(expr)?],
        })
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            field: { "$exists": should_exist },
        })
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        if field.is_empty() {
            return Err(DocumentStoreError::InvalidQuery("filter on an empty field name".into()));
        }

        Ok(doc! {
            field: match op {
                FieldOp::Eq => doc! { "$eq": value },
                FieldOp::Ne => doc! { "$ne": value },
                FieldOp::Gt => doc! { "$gt": value },
                FieldOp::Gte => doc! { "$gte": value },
                FieldOp::Lt => doc! { "$lt": value },
                FieldOp::Lte => doc! { "$lte": value },
            }
        })
    }
}

/// `{ field: 1 | -1, ... }` in key order.
pub(crate) fn sort_document(keys: &[Sort]) -> Document {
    keys.iter()
        .map(|key| (key.field.clone(), Bson::Int32(key.direction.as_i32())))
        .collect()
}

pub(crate) fn index_keys(spec: &IndexSpec) -> Document {
    spec.keys
        .iter()
        .map(|key| (key.field.clone(), Bson::Int32(key.direction.as_i32())))
        .collect()
}

/// Projection that keeps the listed fields and hides the internal `_id`.
pub(crate) fn projection_document(projection: &Projection) -> Document {
    let mut document = doc! { "_id": 0 };
    for field in &projection.fields {
        document.insert(field.clone(), 1);
    }
    document
}

/// Translates pipelines into MongoDB aggregation stages.
pub(crate) struct MongoPipelineTranslator;

impl MongoPipelineTranslator {
    pub(crate) fn translate(pipeline: &Pipeline) -> DocumentStoreResult<Vec<Document>> {
        pipeline
            .stages
            .iter()
            .map(Self::stage)
            .collect()
    }

    fn stage(stage: &Stage) -> DocumentStoreResult<Document> {
        Ok(match stage {
            Stage::Match(expr) => doc! { "$match": MongoQueryTranslator.visit_expr(expr)? },
            Stage::Group { key, outputs } => doc! { "$group": Self::group(key, outputs)? },
            Stage::Sort(keys) => doc! { "$sort": sort_document(keys) },
            Stage::Skip(n) => doc! { "$skip": *n as i64 },
            Stage::Limit(n) => doc! { "$limit": *n as i64 },
        })
    }

    fn group(key: &GroupKey, outputs: &[GroupOutput]) -> DocumentStoreResult<Document> {
        let mut group = doc! { "_id": Self::group_key(key)? };

        for output in outputs {
            if output.name.is_empty() || output.name == "_id" || output.name.starts_with('$') {
                return Err(DocumentStoreError::InvalidQuery(format!(
                    "invalid group output name {:?}",
                    output.name
                )));
            }

            group.insert(
                output.name.clone(),
                match &output.accumulator {
                    Accumulator::Avg(field) => doc! { "$avg": format!("${field}") },
                    Accumulator::Sum(field) => doc! { "$sum": format!("${field}") },
                    Accumulator::Count => doc! { "$sum": 1 },
                },
            );
        }

        Ok(group)
    }

    fn group_key(key: &GroupKey) -> DocumentStoreResult<Bson> {
        Ok(match key {
            GroupKey::Field(field) => Bson::String(format!("${field}")),
            GroupKey::Bucket { field, width } => {
                if *width <= 0 {
                    return Err(DocumentStoreError::InvalidQuery(format!(
                        "bucket width must be positive, got {width}"
                    )));
                }

                // floor(value / width) * width, as a 64-bit integer
                Bson::Document(doc! {
                    "$toLong": {
                        "$multiply": [
                            { "$floor": { "$divide": [format!("${field}"), *width] } },
                            *width,
                        ]
                    }
                })
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookstore_core::{
        index::IndexSpec,
        query::{Filter, SortDirection},
    };
    use pretty_assertions::assert_eq;

    #[test]
    fn translates_comparisons_and_logic() {
        let filter = Filter::eq("in_stock", true).and(Filter::gt("published_year", 2010));

        assert_eq!(
            MongoQueryTranslator::filter(Some(&filter)).unwrap(),
            doc! {
                "$and": [
                    { "in_stock": { "$eq": true } },
                    { "published_year": { "$gt": 2010 } },
                ]
            }
        );
        assert_eq!(MongoQueryTranslator::filter(None).unwrap(), doc! {});
    }

    #[test]
    fn negation_uses_nor() {
        let filter = Filter::eq("genre", "Fantasy").not();

        assert_eq!(
            MongoQueryTranslator::filter(Some(&filter)).unwrap(),
            doc! { "$nor": [{ "genre": { "$eq": "Fantasy" } }] }
        );
    }

    #[test]
    fn projection_hides_internal_id() {
        let projection = Projection::include(["title", "author", "price"]);

        assert_eq!(
            projection_document(&projection),
            doc! { "_id": 0, "title": 1, "author": 1, "price": 1 }
        );
    }

    #[test]
    fn index_keys_keep_order_and_direction() {
        let spec = IndexSpec::builder()
            .key("author", SortDirection::Asc)
            .key("published_year", SortDirection::Desc)
            .build();

        assert_eq!(index_keys(&spec), doc! { "author": 1, "published_year": -1 });
    }

    #[test]
    fn translates_grouping_pipelines() {
        let pipeline = Pipeline::new()
            .matching(Filter::eq("in_stock", true))
            .group(GroupKey::field("author"), [("bookCount", Accumulator::Count)])
            .sort([Sort::desc("bookCount"), Sort::asc("_id")])
            .limit(1);

        assert_eq!(
            MongoPipelineTranslator::translate(&pipeline).unwrap(),
            vec![
                doc! { "$match": { "in_stock": { "$eq": true } } },
                doc! { "$group": { "_id": "$author", "bookCount": { "$sum": 1 } } },
                doc! { "$sort": { "bookCount": -1, "_id": 1 } },
                doc! { "$limit": 1i64 },
            ]
        );
    }

    #[test]
    fn bucket_keys_floor_to_width() {
        let pipeline = Pipeline::new()
            .group(GroupKey::bucket("published_year", 10), [("count", Accumulator::Count)]);

        assert_eq!(
            MongoPipelineTranslator::translate(&pipeline).unwrap(),
            vec![doc! {
                "$group": {
                    "_id": {
                        "$toLong": {
                            "$multiply": [
                                { "$floor": { "$divide": ["$published_year", 10i64] } },
                                10i64,
                            ]
                        }
                    },
                    "count": { "$sum": 1 },
                }
            }]
        );
    }

    #[test]
    fn rejects_bad_groups() {
        let zero = Pipeline::new().group(GroupKey::bucket("published_year", 0), [("n", Accumulator::Count)]);
        let shadowed = Pipeline::new().group(GroupKey::field("genre"), [("_id", Accumulator::Count)]);

        assert!(MongoPipelineTranslator::translate(&zero).is_err());
        assert!(MongoPipelineTranslator::translate(&shadowed).is_err());
    }
}
