use super::definitions::*;

/// An owned-tree transformation visitor. Implementations override the
/// `visit_*` methods they care about and delegate to `walk` for the rest;
/// the default visitor is the identity transformation.
pub trait Visitor: Sized {
    fn visit_expression(&mut self, node: Expression) -> Expression {
        node.walk(self)
    }

    fn visit_stage(&mut self, node: QueryStage) -> QueryStage {
        node.walk(self)
    }
}

impl Expression {
    /// Rebuilds this node with every child expression passed through the
    /// visitor. Leaf nodes are returned unchanged.
    pub fn walk<V: Visitor>(self, visitor: &mut V) -> Expression {
        use Expression::*;
        match self {
            Binary(b) => Binary(BinaryExpr {
                op: b.op,
                ty: b.ty,
                left: Box::new(visitor.visit_expression(*b.left)),
                right: Box::new(visitor.visit_expression(*b.right)),
            }),
            Unary(u) => Unary(UnaryExpr {
                op: u.op,
                operand: Box::new(visitor.visit_expression(*u.operand)),
            }),
            Conditional(c) => Conditional(ConditionalExpr {
                condition: Box::new(visitor.visit_expression(*c.condition)),
                then: Box::new(visitor.visit_expression(*c.then)),
                otherwise: Box::new(visitor.visit_expression(*c.otherwise)),
            }),
            Constant(c) => Constant(c),
            MemberAccess(m) => MemberAccess(MemberAccessExpr {
                target: Box::new(visitor.visit_expression(*m.target)),
                member: m.member,
                declaring: m.declaring,
            }),
            MethodCall(m) => MethodCall(MethodCallExpr {
                receiver: m
                    .receiver
                    .map(|r| Box::new(visitor.visit_expression(*r))),
                method: m.method,
                declaring: m.declaring,
                args: m
                    .args
                    .into_iter()
                    .map(|a| visitor.visit_expression(a))
                    .collect(),
            }),
            NewDocument(n) => NewDocument(NewDocumentExpr {
                members: n.members.map_values(|e| visitor.visit_expression(e)),
            }),
            Field(field) => Field(field),
            FieldAsDocument(fd) => FieldAsDocument(FieldAsDocumentExpr {
                name: fd.name,
                expr: Box::new(visitor.visit_expression(*fd.expr)),
            }),
            Select(s) => Select(SelectExpr {
                source: Box::new(visitor.visit_expression(*s.source)),
                variable: s.variable,
                selector: Box::new(visitor.visit_expression(*s.selector)),
            }),
            Where(w) => Where(WhereExpr {
                source: Box::new(visitor.visit_expression(*w.source)),
                variable: w.variable,
                predicate: Box::new(visitor.visit_expression(*w.predicate)),
            }),
            Accumulator(a) => Accumulator(AccumulatorExpr {
                function: a.function,
                arg: Box::new(visitor.visit_expression(*a.arg)),
            }),
            GroupingKey(g) => GroupingKey(GroupingKeyExpr {
                key: Box::new(visitor.visit_expression(*g.key)),
            }),
            SetOperation(s) => SetOperation(SetOperationExpr {
                op: s.op,
                source: Box::new(visitor.visit_expression(*s.source)),
                other: Box::new(visitor.visit_expression(*s.other)),
            }),
            ResultOperator(r) => ResultOperator(ResultOperatorExpr {
                op: r.op,
                source: Box::new(visitor.visit_expression(*r.source)),
                variable: r.variable,
                argument: r
                    .argument
                    .map(|a| Box::new(visitor.visit_expression(*a))),
            }),
            Pipeline(p) => Pipeline(PipelineExpr {
                stages: p
                    .stages
                    .into_iter()
                    .map(|s| visitor.visit_stage(s))
                    .collect(),
                terminal: p.terminal.map(|t| TerminalOperator {
                    op: t.op,
                    argument: t
                        .argument
                        .map(|a| Box::new(visitor.visit_expression(*a))),
                }),
            }),
        }
    }
}

impl QueryStage {
    pub fn walk<V: Visitor>(self, visitor: &mut V) -> QueryStage {
        use QueryStage::*;
        match self {
            Match(m) => Match(MatchStage {
                predicate: visitor.visit_expression(m.predicate),
            }),
            Select(s) => Select(SelectStage {
                selector: visitor.visit_expression(s.selector),
            }),
            GroupBy(g) => GroupBy(GroupByStage {
                key: visitor.visit_expression(g.key),
                selector: g.selector.map(|s| visitor.visit_expression(s)),
            }),
            Sort(s) => Sort(SortStage {
                key: visitor.visit_expression(s.key),
                direction: s.direction,
                continuation: s.continuation,
            }),
            Skip(n) => Skip(n),
            Limit(n) => Limit(n),
            OfType(o) => OfType(o),
            Unwind(u) => Unwind(UnwindStage {
                path: u.path,
                selector: u.selector.map(|s| visitor.visit_expression(s)),
            }),
            Distinct(d) => Distinct(DistinctStage {
                key: d.key.map(|k| visitor.visit_expression(k)),
            }),
        }
    }
}
