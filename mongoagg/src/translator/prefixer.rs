use crate::query::{
    visitor::Visitor, Expression, FieldExpr, ResultOperatorExpr, SelectExpr, WhereExpr,
};

/// Rewrites bare field references in a scope body so they resolve against
/// the scope variable: `Field("a.b")` becomes `Field("$v.a.b")`, which
/// the value translator then emits as `"$$v.a.b"`.
///
/// Nested scope introducers rebind their own variable, so their
/// selector/predicate subtrees are left untouched; their sources were
/// resolved against this scope and are rewritten. Paths that already
/// carry a `$` prefix belong to an enclosing scope and pass through.
pub(crate) fn prefix_scope_fields(body: Expression, variable: &str) -> Expression {
    let mut prefixer = ScopePrefixer { variable };
    prefixer.visit_expression(body)
}

struct ScopePrefixer<'a> {
    variable: &'a str,
}

impl Visitor for ScopePrefixer<'_> {
    fn visit_expression(&mut self, node: Expression) -> Expression {
        match node {
            Expression::Field(field) => {
                if field.path.starts_with('$') {
                    Expression::Field(field)
                } else {
                    Expression::Field(FieldExpr {
                        path: format!("${}.{}", self.variable, field.path),
                    })
                }
            }
            Expression::Select(s) => Expression::Select(SelectExpr {
                source: Box::new(self.visit_expression(*s.source)),
                variable: s.variable,
                selector: s.selector,
            }),
            Expression::Where(w) => Expression::Where(WhereExpr {
                source: Box::new(self.visit_expression(*w.source)),
                variable: w.variable,
                predicate: w.predicate,
            }),
            Expression::ResultOperator(r) => {
                // A predicate argument is bound to the operator's own
                // variable; a plain value argument (Contains) is not.
                let argument = match r.variable {
                    Some(_) => r.argument,
                    None => r.argument.map(|a| Box::new(self.visit_expression(*a))),
                };
                Expression::ResultOperator(ResultOperatorExpr {
                    op: r.op,
                    source: Box::new(self.visit_expression(*r.source)),
                    variable: r.variable,
                    argument,
                })
            }
            other => other.walk(self),
        }
    }
}
