use crate::{
    query::{
        self, AccumulatorExpr, BinaryExpr, ConditionalExpr, Expression, FieldAsDocumentExpr,
        GroupingKeyExpr, MemberAccessExpr, MethodCallExpr, SelectExpr, SetOperationExpr,
        SetOperator, UnaryExpr, UnaryOperator, ValueType, WhereExpr,
    },
    translator::{prefixer, utils, Error, PipelineTranslator, Result},
};
use bson::{bson, Bson};

impl PipelineTranslator {
    /// Lowers a single expression to a BSON value: a scalar literal, a
    /// field reference string, or an operator document. Total over the
    /// recognized subset; anything else fails with the offending
    /// subtree's printable form.
    pub(crate) fn translate_expression(&mut self, expr: Expression) -> Result<Bson> {
        match expr {
            Expression::Binary(b) => self.translate_binary(b),
            Expression::Unary(u) => self.translate_unary(u),
            Expression::Conditional(c) => self.translate_conditional(c),
            Expression::Constant(c) => Ok(utils::escape_literal(c.value)),
            Expression::MemberAccess(m) => self.translate_member_access(m),
            Expression::MethodCall(m) => self.translate_method_call(m),
            Expression::NewDocument(n) => self.projection_document(n).map(Bson::Document),
            Expression::Field(field) => Ok(Bson::String(self.field_reference(&field.path))),
            Expression::FieldAsDocument(fd) => self.translate_field_as_document(fd),
            Expression::Select(s) => self.translate_array_select(s),
            Expression::Where(w) => self.translate_array_where(w),
            Expression::Accumulator(acc) => self.translate_accumulator_reference(acc),
            Expression::GroupingKey(g) => self.translate_grouping_key(g),
            Expression::SetOperation(s) => self.translate_set_operation(s),
            Expression::ResultOperator(r) => self.translate_result_operator(r),
            Expression::Pipeline(p) => Err(Error::unsupported(&Expression::Pipeline(p))),
        }
    }

    /// Emits a `"$path"` field reference, resolving the path against the
    /// current pipeline shape. Paths already rewritten for a scope
    /// variable (leading `$`) pass through untouched.
    pub(crate) fn field_reference(&self, path: &str) -> String {
        format!("${}", self.resolve_field_path(path))
    }

    pub(crate) fn resolve_field_path(&self, path: &str) -> String {
        if path.starts_with('$') {
            return path.to_string();
        }
        if self.fields_under_id {
            if path.is_empty() {
                return "_id".to_string();
            }
            return format!("_id.{path}");
        }
        path.to_string()
    }

    fn translate_binary(&mut self, b: BinaryExpr) -> Result<Bson> {
        use query::BinaryOperator::*;
        let left = self.translate_expression(*b.left)?;
        let right = self.translate_expression(*b.right)?;
        Ok(match b.op {
            Add if b.ty == ValueType::String => utils::flatten_operator("$concat", left, right),
            Add => utils::flatten_operator("$add", left, right),
            Subtract => bson!({ "$subtract": [left, right] }),
            Multiply => utils::flatten_operator("$multiply", left, right),
            Divide => bson!({ "$divide": [left, right] }),
            Modulo => bson!({ "$mod": [left, right] }),
            And => utils::flatten_operator("$and", left, right),
            Or => utils::flatten_operator("$or", left, right),
            Eq => bson!({ "$eq": [left, right] }),
            Ne => bson!({ "$ne": [left, right] }),
            Lt => bson!({ "$lt": [left, right] }),
            Lte => bson!({ "$lte": [left, right] }),
            Gt => bson!({ "$gt": [left, right] }),
            Gte => bson!({ "$gte": [left, right] }),
            Coalesce => bson!({ "$ifNull": [left, right] }),
        })
    }

    fn translate_unary(&mut self, u: UnaryExpr) -> Result<Bson> {
        match u.op {
            UnaryOperator::Not => {
                let operand = self.translate_expression(*u.operand)?;
                // $not takes an argument list; a lone operand is wrapped.
                let args = match operand {
                    array @ Bson::Array(_) => array,
                    other => Bson::Array(vec![other]),
                };
                Ok(bson!({ "$not": args }))
            }
            UnaryOperator::ArrayLength => {
                let operand = self.translate_expression(*u.operand)?;
                Ok(bson!({ "$size": operand }))
            }
            // The front-end's type coercions carry no runtime meaning
            // here; the server is dynamically typed.
            UnaryOperator::Convert => self.translate_expression(*u.operand),
            UnaryOperator::Negate => Err(Error::unsupported(&Expression::Unary(u))),
        }
    }

    fn translate_conditional(&mut self, c: ConditionalExpr) -> Result<Bson> {
        let condition = self.translate_expression(*c.condition)?;
        let then = self.translate_expression(*c.then)?;
        let otherwise = self.translate_expression(*c.otherwise)?;
        Ok(bson!({ "$cond": [condition, then, otherwise] }))
    }

    fn translate_member_access(&mut self, m: MemberAccessExpr) -> Result<Bson> {
        enum MemberOp {
            Date(&'static str),
            DayOfWeek,
            Size,
        }
        let member = m.member.clone();
        let op = match (m.declaring, member.as_str()) {
            (ValueType::DateTime, "DayOfWeek") => MemberOp::DayOfWeek,
            (ValueType::DateTime, member) => match utils::datetime_member_op(member) {
                Some(op) => MemberOp::Date(op),
                None => return Err(Error::unsupported(&Expression::MemberAccess(m))),
            },
            (ValueType::Array, "Count") => MemberOp::Size,
            _ => return Err(Error::unsupported(&Expression::MemberAccess(m))),
        };
        let target = self.translate_expression(*m.target)?;
        Ok(match op {
            MemberOp::Date(op) => bson!({ op: target }),
            // The server numbers Sunday as 1, the object model as 0.
            MemberOp::DayOfWeek => bson!({ "$subtract": [{ "$dayOfWeek": target }, 1] }),
            MemberOp::Size => bson!({ "$size": target }),
        })
    }

    fn translate_method_call(&mut self, call: MethodCallExpr) -> Result<Bson> {
        let method = call.method.clone();
        match (call.declaring, method.as_str(), call.args.len()) {
            (ValueType::String, "IsNullOrEmpty", 1) if call.receiver.is_none() => {
                let s = self.translate_expression(call.args[0].clone())?;
                Ok(bson!({ "$or": [{ "$eq": [s.clone(), Bson::Null] }, { "$eq": [s, ""] }] }))
            }
            (ValueType::String, "Equals", 1) => {
                let lhs = self.translate_expression(self.method_receiver(&call)?)?;
                let rhs = self.translate_expression(call.args[0].clone())?;
                Ok(bson!({ "$eq": [lhs, rhs] }))
            }
            (ValueType::String, "Equals", 2) => {
                let comparison = string_comparison(&call.args[1]);
                let comparison = match comparison {
                    Some(c) => c,
                    None => return Err(Error::unsupported(&Expression::MethodCall(call))),
                };
                match comparison.as_str() {
                    "Ordinal" => {
                        let lhs = self.translate_expression(self.method_receiver(&call)?)?;
                        let rhs = self.translate_expression(call.args[0].clone())?;
                        Ok(bson!({ "$eq": [lhs, rhs] }))
                    }
                    "OrdinalIgnoreCase" => {
                        let lhs = self.translate_expression(self.method_receiver(&call)?)?;
                        let rhs = self.translate_expression(call.args[0].clone())?;
                        Ok(bson!({ "$eq": [{ "$strcasecmp": [lhs, rhs] }, 0] }))
                    }
                    _ => Err(Error::unsupported(&Expression::MethodCall(call))),
                }
            }
            (ValueType::String, "Substring", 2) => {
                let s = self.translate_expression(self.method_receiver(&call)?)?;
                let index = self.translate_expression(call.args[0].clone())?;
                let length = self.translate_expression(call.args[1].clone())?;
                Ok(bson!({ "$substr": [s, index, length] }))
            }
            (ValueType::String, "ToLower" | "ToLowerInvariant", 0) => {
                let s = self.translate_expression(self.method_receiver(&call)?)?;
                Ok(bson!({ "$toLower": s }))
            }
            (ValueType::String, "ToUpper" | "ToUpperInvariant", 0) => {
                let s = self.translate_expression(self.method_receiver(&call)?)?;
                Ok(bson!({ "$toUpper": s }))
            }
            (ValueType::Set, "IsSubsetOf", 1) => {
                let set = self.translate_expression(self.method_receiver(&call)?)?;
                let other = self.translate_expression(call.args[0].clone())?;
                Ok(bson!({ "$setIsSubset": [set, other] }))
            }
            (ValueType::Set, "SetEquals", 1) => {
                let set = self.translate_expression(self.method_receiver(&call)?)?;
                let other = self.translate_expression(call.args[0].clone())?;
                Ok(bson!({ "$setEquals": [set, other] }))
            }
            (_, "CompareTo", 1) if call.receiver.is_some() => {
                let lhs = self.translate_expression(self.method_receiver(&call)?)?;
                let rhs = self.translate_expression(call.args[0].clone())?;
                Ok(bson!({ "$cmp": [lhs, rhs] }))
            }
            _ => Err(Error::unsupported(&Expression::MethodCall(call))),
        }
    }

    fn method_receiver(&self, call: &MethodCallExpr) -> Result<Expression> {
        call.receiver
            .as_deref()
            .cloned()
            .ok_or_else(|| Error::unsupported(&Expression::MethodCall(call.clone())))
    }

    fn translate_field_as_document(&mut self, fd: FieldAsDocumentExpr) -> Result<Bson> {
        let value = self.translate_expression(*fd.expr)?;
        let name = fd.name;
        Ok(bson!({ name: value }))
    }

    fn translate_array_select(&mut self, s: SelectExpr) -> Result<Bson> {
        // Field-path fusion: projecting a sub-field of a field source
        // needs no $map at all, just the concatenated path.
        if let (Expression::Field(source), Expression::Field(sub)) =
            (s.source.as_ref(), s.selector.as_ref())
        {
            if !sub.path.starts_with('$') {
                let fused = format!("{}.{}", source.path, sub.path);
                return Ok(Bson::String(self.field_reference(&fused)));
            }
        }
        let input = self.translate_expression(*s.source)?;
        let body = prefixer::prefix_scope_fields(*s.selector, &s.variable);
        let body = self.translate_expression(body)?;
        Ok(bson!({ "$map": { "input": input, "as": s.variable, "in": body } }))
    }

    fn translate_array_where(&mut self, w: WhereExpr) -> Result<Bson> {
        let input = self.translate_expression(*w.source)?;
        let cond = prefixer::prefix_scope_fields(*w.predicate, &w.variable);
        let cond = self.translate_expression(cond)?;
        Ok(bson!({ "$filter": { "input": input, "as": w.variable, "cond": cond } }))
    }

    /// An accumulator met outside a group selector refers to a slot in
    /// the open `$group` stage, allocating it on first sight.
    fn translate_accumulator_reference(&mut self, acc: AccumulatorExpr) -> Result<Bson> {
        if self.in_accumulator_arg {
            return Err(Error::InternalInvariantViolation(format!(
                "accumulator nested inside an accumulator argument: {}",
                Expression::Accumulator(acc)
            )));
        }
        if self.group.is_none() {
            return Err(Error::InternalInvariantViolation(format!(
                "accumulator outside a group stage: {}",
                Expression::Accumulator(acc)
            )));
        }
        let slot = self.accumulator_slot(acc)?;
        Ok(Bson::String(format!("${slot}")))
    }

    /// Finds or allocates the `__aggN` slot for an accumulator
    /// expression in the open group stage. Structurally equal
    /// accumulators share one slot.
    pub(crate) fn accumulator_slot(&mut self, acc: AccumulatorExpr) -> Result<String> {
        if let Some(group) = &self.group {
            if let Some((_, name)) = group.slots.iter().find(|(existing, _)| *existing == acc) {
                return Ok(name.clone());
            }
        }
        let name = {
            let group = self.open_group()?;
            format!("__agg{}", group.slots.len())
        };
        let value = self.accumulator_document(acc.clone())?;
        let stage_index = {
            let group = self.open_group_mut()?;
            group.slots.push((acc, name.clone()));
            group.stage_index
        };
        let group_doc = self.pipeline[stage_index]
            .get_document_mut("$group")
            .map_err(|_| {
                Error::InternalInvariantViolation(
                    "open group context does not point at a $group stage".to_string(),
                )
            })?;
        group_doc.insert(name.clone(), value);
        Ok(name)
    }

    /// Emits `{op: T(arg)}` with the argument translated against the
    /// group's input documents.
    pub(crate) fn accumulator_document(&mut self, acc: AccumulatorExpr) -> Result<Bson> {
        let op = utils::accumulator_op(acc.function);
        let was_in_arg = self.in_accumulator_arg;
        self.in_accumulator_arg = true;
        let arg = self.translate_expression(*acc.arg);
        self.in_accumulator_arg = was_in_arg;
        let arg = arg?;
        Ok(bson!({ op: arg }))
    }

    fn open_group(&self) -> Result<&super::GroupContext> {
        self.group.as_ref().ok_or_else(|| {
            Error::InternalInvariantViolation("no open group stage".to_string())
        })
    }

    fn open_group_mut(&mut self) -> Result<&mut super::GroupContext> {
        self.group.as_mut().ok_or_else(|| {
            Error::InternalInvariantViolation("no open group stage".to_string())
        })
    }

    fn translate_grouping_key(&mut self, g: GroupingKeyExpr) -> Result<Bson> {
        if self.group.is_none() {
            return Err(Error::InternalInvariantViolation(format!(
                "grouping key reference outside a group stage: {}",
                Expression::GroupingKey(g)
            )));
        }
        Ok(Bson::String("$_id".to_string()))
    }

    fn translate_set_operation(&mut self, s: SetOperationExpr) -> Result<Bson> {
        let op = match s.op {
            SetOperator::Union => "$setUnion",
            SetOperator::Intersect => "$setIntersection",
            SetOperator::Except => "$setDifference",
        };
        let source = self.translate_expression(*s.source)?;
        let other = self.translate_expression(*s.other)?;
        Ok(bson!({ op: [source, other] }))
    }
}

fn string_comparison(arg: &Expression) -> Option<String> {
    match arg {
        Expression::Constant(c) => match &c.value {
            Bson::String(s) => Some(s.clone()),
            _ => None,
        },
        _ => None,
    }
}
