use crate::{
    query::{
        DistinctStage, Expression, GroupByStage, MatchStage, QueryStage, SelectStage,
        SortDirection, SortStage, UnwindStage,
    },
    translator::{utils, Error, GroupContext, PipelineTranslator, Result},
};
use bson::{doc, Document};

impl PipelineTranslator {
    /// Appends the stage documents for one pipeline-level stage,
    /// attaching the stage name to any error for user-facing reports.
    pub(crate) fn translate_stage(&mut self, stage: QueryStage) -> Result<()> {
        let stage_name = stage.stage_name();
        self.stage_dispatch(stage)
            .map_err(|e| Error::in_stage(stage_name, e))
    }

    fn stage_dispatch(&mut self, stage: QueryStage) -> Result<()> {
        // Any stage but a sort closes the open sort specification.
        if !matches!(stage, QueryStage::Sort(_)) {
            self.open_sort = None;
        }
        match stage {
            QueryStage::Match(m) => self.translate_match(m),
            QueryStage::Select(s) => self.translate_select(s),
            QueryStage::GroupBy(g) => self.translate_group_by(g),
            QueryStage::Sort(s) => self.translate_sort(s),
            QueryStage::Skip(n) => {
                self.pipeline.push(doc! { "$skip": n });
                Ok(())
            }
            QueryStage::Limit(n) => {
                self.pipeline.push(doc! { "$limit": n });
                Ok(())
            }
            QueryStage::OfType(o) => {
                let field = o.field;
                self.pipeline.push(doc! { "$match": { field: o.type_name } });
                Ok(())
            }
            QueryStage::Unwind(u) => self.translate_unwind(u),
            QueryStage::Distinct(d) => self.translate_distinct(d),
        }
    }

    fn translate_match(&mut self, m: MatchStage) -> Result<()> {
        let stage = self.translate_match_stage(m.predicate)?;
        self.pipeline.push(stage);
        Ok(())
    }

    fn translate_select(&mut self, s: SelectStage) -> Result<()> {
        let body = self.project_stage_document(s.selector)?;
        self.pipeline.push(doc! { "$project": body });
        self.close_reshaped();
        Ok(())
    }

    /// Builds a `$project` body from a stage-level selector: a projection
    /// document, a bare-field inclusion, or a computed placeholder field.
    /// `_id: 0` is appended unless the projection writes `_id` itself.
    fn project_stage_document(&mut self, selector: Expression) -> Result<Document> {
        let mut body = match selector {
            Expression::NewDocument(n) => self.projection_document(n)?,
            Expression::Field(field) if !field.path.starts_with('$') => {
                let path = self.resolve_field_path(&field.path);
                doc! { path: 1 }
            }
            computation => {
                let name = self.fresh_field_name();
                let value = self.translate_expression(computation)?;
                doc! { name: value }
            }
        };
        if !body.contains_key("_id") {
            body.insert("_id", 0);
        }
        Ok(body)
    }

    fn translate_group_by(&mut self, g: GroupByStage) -> Result<()> {
        match g.selector {
            // The one-shot form carries its own projection: key and
            // accumulators land in a single $group.
            Some(selector) => {
                let body = self.group_stage_document(g.key, selector)?;
                self.pipeline.push(doc! { "$group": body });
                self.close_reshaped();
            }
            // The open form starts with only a key; accumulator slots
            // are hoisted in as downstream stages reference them.
            None => {
                let key = self.translate_expression(g.key)?;
                self.pipeline.push(doc! { "$group": { "_id": key } });
                self.group = Some(GroupContext {
                    stage_index: self.pipeline.len() - 1,
                    slots: vec![],
                });
            }
        }
        Ok(())
    }

    fn translate_sort(&mut self, sort: SortStage) -> Result<()> {
        let path = match self.match_field_path(&sort.key)? {
            Some(path) => path,
            None => return Err(Error::unsupported(&sort.key)),
        };
        let direction = match sort.direction {
            SortDirection::Ascending => 1,
            SortDirection::Descending => -1,
        };
        if sort.continuation {
            let index = self.open_sort.ok_or_else(|| {
                Error::InternalInvariantViolation(
                    "sort continuation with no open sort specification".to_string(),
                )
            })?;
            let spec = self.pipeline[index].get_document_mut("$sort").map_err(|_| {
                Error::InternalInvariantViolation(
                    "open sort context does not point at a $sort stage".to_string(),
                )
            })?;
            if spec.contains_key(&path) {
                return Err(Error::AmbiguousOrdering(path));
            }
            spec.insert(path, direction);
        } else {
            self.pipeline.push(doc! { "$sort": { path: direction } });
            self.open_sort = Some(self.pipeline.len() - 1);
        }
        Ok(())
    }

    fn translate_unwind(&mut self, unwind: UnwindStage) -> Result<()> {
        let path = self.field_reference(&unwind.path);
        self.pipeline.push(doc! { "$unwind": path });
        if let Some(selector) = unwind.selector {
            let body = self.project_stage_document(selector)?;
            self.pipeline.push(doc! { "$project": body });
            self.close_reshaped();
        }
        Ok(())
    }

    fn translate_distinct(&mut self, distinct: DistinctStage) -> Result<()> {
        let key = match distinct.key {
            None => utils::ROOT.clone(),
            Some(expr) => self.translate_expression(expr)?,
        };
        self.pipeline.push(doc! { "$group": { "_id": key } });
        self.group = None;
        // The surviving document is the grouping key itself, so every
        // later bare field path lives under _id.
        self.fields_under_id = true;
        Ok(())
    }

    /// A stage that replaces the document shape ends both the open group
    /// context and any _id-rooted field resolution.
    fn close_reshaped(&mut self) {
        self.group = None;
        self.fields_under_id = false;
    }
}
