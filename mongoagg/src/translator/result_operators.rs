use crate::{
    query::{Expression, ResultOperator, ResultOperatorExpr, TerminalOperator},
    translator::{prefixer, Error, PipelineTranslator, Result, ResultHandling},
};
use bson::{bson, doc, Bson};

impl PipelineTranslator {
    /// Lowers the pipeline's terminal result operator into final stages
    /// and reports how the driver should read the reply.
    pub(crate) fn translate_terminal(
        &mut self,
        terminal: TerminalOperator,
    ) -> Result<ResultHandling> {
        match (terminal.op, terminal.argument) {
            (ResultOperator::Count, None) => {
                self.pipeline
                    .push(doc! { "$group": { "_id": Bson::Null, "__result": { "$sum": 1 } } });
                Ok(ResultHandling::Count)
            }
            // An unfiltered existence check only needs the first
            // document; the driver tests whether one came back.
            (ResultOperator::Any, None) => {
                self.pipeline.push(doc! { "$limit": 1 });
                Ok(ResultHandling::Exists)
            }
            (ResultOperator::Any, Some(predicate)) => {
                let stage = self
                    .translate_match_stage(*predicate)
                    .map_err(|e| Error::in_stage("$match", e))?;
                self.pipeline.push(stage);
                self.pipeline.push(doc! { "$limit": 1 });
                Ok(ResultHandling::Exists)
            }
            (op, _) => Err(Error::UnsupportedExpression(format!(
                "{op:?}() result operator at pipeline level"
            ))),
        }
    }

    /// Lowers a result operator applied to an array-valued source inside
    /// an expression.
    pub(crate) fn translate_result_operator(&mut self, r: ResultOperatorExpr) -> Result<Bson> {
        let has_argument = r.argument.is_some();
        match (r.op, has_argument) {
            (ResultOperator::Count, false) => {
                let source = self.translate_expression(*r.source)?;
                Ok(bson!({ "$size": source }))
            }
            (ResultOperator::Any, false) => {
                let source = self.translate_expression(*r.source)?;
                Ok(bson!({ "$gt": [{ "$size": source }, 0] }))
            }
            (ResultOperator::Any, true) => {
                let map = self.predicate_map(r)?;
                Ok(bson!({ "$anyElementTrue": map }))
            }
            (ResultOperator::All, true) => {
                let map = self.predicate_map(r)?;
                Ok(bson!({ "$allElementsTrue": map }))
            }
            (ResultOperator::Contains, true) => {
                let source = self.translate_expression(*r.source)?;
                let value = match r.argument {
                    Some(argument) => self.translate_expression(*argument)?,
                    None => {
                        return Err(Error::InternalInvariantViolation(
                            "contains operator without a value argument".to_string(),
                        ))
                    }
                };
                Ok(bson!({
                    "$anyElementTrue": {
                        "$map": { "input": source, "as": "x", "in": { "$eq": ["$$x", value] } }
                    }
                }))
            }
            _ => Err(Error::unsupported(&Expression::ResultOperator(r))),
        }
    }

    /// Wraps the operator's source in a `$map` producing one boolean per
    /// element from the predicate.
    fn predicate_map(&mut self, r: ResultOperatorExpr) -> Result<Bson> {
        let variable = match r.variable.clone() {
            Some(variable) => variable,
            None => {
                return Err(Error::InternalInvariantViolation(format!(
                    "predicate result operator without a scope variable: {}",
                    Expression::ResultOperator(r)
                )))
            }
        };
        let predicate = match r.argument {
            Some(argument) => *argument,
            None => {
                return Err(Error::InternalInvariantViolation(
                    "predicate result operator without a predicate".to_string(),
                ))
            }
        };
        let input = self.translate_expression(*r.source)?;
        let body = prefixer::prefix_scope_fields(predicate, &variable);
        let body = self.translate_expression(body)?;
        Ok(bson!({ "$map": { "input": input, "as": variable, "in": body } }))
    }
}
