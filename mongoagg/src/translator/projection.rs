use crate::{
    query::{Expression, NewDocumentExpr},
    translator::{Error, PipelineTranslator, Result},
};
use bson::{doc, Bson, Document};

impl PipelineTranslator {
    /// Collapses a constructor/member-init into an ordered document with
    /// every member translated. `_id` handling belongs to the call
    /// sites: `$project` stages append `_id: 0`, group stages route the
    /// grouping-key member through [`group_stage_document`].
    pub(crate) fn projection_document(&mut self, new_doc: NewDocumentExpr) -> Result<Document> {
        let mut doc = Document::new();
        for (name, expr) in new_doc.members {
            validate_member_name(&name)?;
            let value = self.translate_expression(expr)?;
            doc.insert(name, value);
        }
        Ok(doc)
    }

    /// Builds the body of a `$group` stage from a grouping key and a
    /// result selector. The member wrapping the grouping key is renamed
    /// `_id` and emitted first; every other member must be an
    /// accumulator.
    pub(crate) fn group_stage_document(
        &mut self,
        key: Expression,
        selector: Expression,
    ) -> Result<Document> {
        let members = match selector {
            Expression::NewDocument(n) => n.members,
            other => {
                return Err(Error::InternalInvariantViolation(format!(
                    "projection mapper received a non-constructor node: {other}"
                )))
            }
        };
        let mut id_value: Option<Bson> = None;
        let mut accumulators: Vec<(String, Bson)> = vec![];
        for (name, expr) in members {
            validate_member_name(&name)?;
            match expr {
                Expression::GroupingKey(g) => {
                    if id_value.is_some() {
                        return Err(Error::InternalInvariantViolation(
                            "more than one grouping key in a group projection".to_string(),
                        ));
                    }
                    id_value = Some(self.translate_expression(*g.key)?);
                }
                Expression::Accumulator(acc) => {
                    accumulators.push((name, self.accumulator_document(acc)?));
                }
                other => return Err(Error::unsupported(&other)),
            }
        }
        let id_value = match id_value {
            Some(value) => value,
            None => self.translate_expression(key)?,
        };
        let mut doc = doc! { "_id": id_value };
        for (name, value) in accumulators {
            doc.insert(name, value);
        }
        Ok(doc)
    }
}

fn validate_member_name(name: &str) -> Result<()> {
    if name.is_empty() || name.starts_with('$') || name.contains('.') {
        return Err(Error::InternalInvariantViolation(format!(
            "invalid projection member name '{name}'"
        )));
    }
    Ok(())
}
