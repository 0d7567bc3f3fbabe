use crate::{
    options::MatchStrategy,
    query::{BinaryExpr, BinaryOperator, Expression, UnaryOperator},
    translator::{PipelineTranslator, Result},
};
use bson::{doc, Bson, Document};

/// Outcome of a query-language try-translation. A predicate that the
/// query language cannot express is not an error; the caller falls back
/// to an `{"$expr": …}` payload.
pub(crate) enum MatchTranslation {
    Matched(Document),
    NoMatch,
}

use MatchTranslation::*;

impl PipelineTranslator {
    /// Builds a complete `{"$match": …}` stage document. Predicates run
    /// against the root document, so no scope prefixing applies; the
    /// payload is rendered in the server's query language wherever
    /// expressible and as `$expr` otherwise.
    pub(crate) fn translate_match_stage(&mut self, predicate: Expression) -> Result<Document> {
        if self.options.match_strategy == MatchStrategy::PreferMatchLanguage {
            if let Matched(body) = self.try_match_language(&predicate)? {
                return Ok(doc! { "$match": body });
            }
        }
        let expr = self.translate_expression(predicate)?;
        Ok(doc! { "$match": { "$expr": expr } })
    }

    fn try_match_language(&mut self, predicate: &Expression) -> Result<MatchTranslation> {
        match predicate {
            Expression::Binary(b) => match b.op {
                BinaryOperator::And => self.try_match_and(b),
                BinaryOperator::Or => self.try_match_or(b),
                BinaryOperator::Eq
                | BinaryOperator::Ne
                | BinaryOperator::Lt
                | BinaryOperator::Lte
                | BinaryOperator::Gt
                | BinaryOperator::Gte => self.try_match_comparison(b),
                _ => Ok(NoMatch),
            },
            Expression::Unary(u) if u.op == UnaryOperator::Not => {
                match self.try_match_language(&u.operand)? {
                    Matched(inner) => Ok(Matched(doc! { "$nor": [inner] })),
                    NoMatch => Ok(NoMatch),
                }
            }
            // A bare boolean field used as a predicate.
            Expression::Field(field) if !field.path.starts_with('$') => {
                let path = self.resolve_field_path(&field.path);
                Ok(Matched(doc! { path: true }))
            }
            _ => Ok(NoMatch),
        }
    }

    fn try_match_comparison(&mut self, b: &BinaryExpr) -> Result<MatchTranslation> {
        let (path, value, op) = match (self.match_field_path(&b.left)?, constant_value(&b.right)) {
            (Some(path), Some(value)) => (path, value, b.op),
            _ => match (self.match_field_path(&b.right)?, constant_value(&b.left)) {
                (Some(path), Some(value)) => (path, value, flip_comparison(b.op)),
                _ => return Ok(NoMatch),
            },
        };
        // A document constant with operator-like keys would be misread as
        // a query-operator document.
        if matches!(&value, Bson::Document(d) if d.keys().any(|k| k.starts_with('$'))) {
            return Ok(NoMatch);
        }
        let body = match op {
            BinaryOperator::Eq => doc! { path: value },
            BinaryOperator::Ne => doc! { path: { "$ne": value } },
            BinaryOperator::Lt => doc! { path: { "$lt": value } },
            BinaryOperator::Lte => doc! { path: { "$lte": value } },
            BinaryOperator::Gt => doc! { path: { "$gt": value } },
            BinaryOperator::Gte => doc! { path: { "$gte": value } },
            _ => return Ok(NoMatch),
        };
        Ok(Matched(body))
    }

    fn try_match_and(&mut self, b: &BinaryExpr) -> Result<MatchTranslation> {
        let (left, right) = match (
            self.try_match_language(&b.left)?,
            self.try_match_language(&b.right)?,
        ) {
            (Matched(l), Matched(r)) => (l, r),
            _ => return Ok(NoMatch),
        };
        // Disjoint conjuncts merge into a single document; colliding
        // keys need an explicit $and.
        if right.keys().all(|k| !left.contains_key(k)) {
            let mut merged = left;
            merged.extend(right);
            return Ok(Matched(merged));
        }
        let mut args = vec![];
        push_logical_operands(&mut args, "$and", left);
        push_logical_operands(&mut args, "$and", right);
        Ok(Matched(doc! { "$and": args }))
    }

    fn try_match_or(&mut self, b: &BinaryExpr) -> Result<MatchTranslation> {
        let (left, right) = match (
            self.try_match_language(&b.left)?,
            self.try_match_language(&b.right)?,
        ) {
            (Matched(l), Matched(r)) => (l, r),
            _ => return Ok(NoMatch),
        };
        let mut args = vec![];
        push_logical_operands(&mut args, "$or", left);
        push_logical_operands(&mut args, "$or", right);
        Ok(Matched(doc! { "$or": args }))
    }

    /// Resolves an expression to a query-language field path: a bare
    /// field, a hoisted accumulator slot, or the grouping key.
    pub(crate) fn match_field_path(&mut self, expr: &Expression) -> Result<Option<String>> {
        match expr {
            Expression::Field(field) if !field.path.starts_with('$') => {
                Ok(Some(self.resolve_field_path(&field.path)))
            }
            Expression::Accumulator(acc) if self.group.is_some() => {
                Ok(Some(self.accumulator_slot(acc.clone())?))
            }
            Expression::GroupingKey(_) if self.group.is_some() => Ok(Some("_id".to_string())),
            _ => Ok(None),
        }
    }
}

fn constant_value(expr: &Expression) -> Option<Bson> {
    match expr {
        Expression::Constant(c) => Some(c.value.clone()),
        _ => None,
    }
}

fn flip_comparison(op: BinaryOperator) -> BinaryOperator {
    use BinaryOperator::*;
    match op {
        Lt => Gt,
        Lte => Gte,
        Gt => Lt,
        Gte => Lte,
        other => other,
    }
}

/// Flattens nested same-operator documents when collecting `$and`/`$or`
/// operands.
fn push_logical_operands(args: &mut Vec<Document>, op: &str, doc: Document) {
    if doc.len() == 1 {
        if let Ok(nested) = doc.get_array(op) {
            args.extend(nested.iter().filter_map(|item| match item {
                Bson::Document(d) => Some(d.clone()),
                _ => None,
            }));
            return;
        }
    }
    args.push(doc);
}
