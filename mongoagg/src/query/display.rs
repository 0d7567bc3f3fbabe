use super::definitions::*;
use itertools::Itertools;
use std::fmt;

/// Renders expressions in a compact fluent notation for error messages.
/// The rendering is stable so callers can match on reported subtrees.
impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Expression::*;
        match self {
            Binary(b) => write!(f, "({} {} {})", b.left, binary_symbol(b.op), b.right),
            Unary(u) => match u.op {
                UnaryOperator::Not => write!(f, "!{}", u.operand),
                UnaryOperator::Negate => write!(f, "-{}", u.operand),
                UnaryOperator::Convert => write!(f, "Convert({})", u.operand),
                UnaryOperator::ArrayLength => write!(f, "{}.Length", u.operand),
            },
            Conditional(c) => write!(f, "({} ? {} : {})", c.condition, c.then, c.otherwise),
            Constant(c) => write!(f, "{}", c.value),
            MemberAccess(m) => write!(f, "{}.{}", m.target, m.member),
            MethodCall(m) => {
                if let Some(receiver) = &m.receiver {
                    write!(f, "{}.", receiver)?;
                }
                write!(f, "{}({})", m.method, m.args.iter().join(", "))
            }
            NewDocument(n) => {
                let members = n
                    .members
                    .iter()
                    .map(|(name, expr)| format!("{name} = {expr}"))
                    .join(", ");
                write!(f, "new {{{members}}}")
            }
            Field(field) => write!(f, "{}", field.path),
            FieldAsDocument(fd) => write!(f, "{{{}: {}}}", fd.name, fd.expr),
            Select(s) => write!(f, "{}.Select({} => {})", s.source, s.variable, s.selector),
            Where(w) => write!(f, "{}.Where({} => {})", w.source, w.variable, w.predicate),
            Accumulator(a) => write!(f, "{:?}({})", a.function, a.arg),
            GroupingKey(g) => write!(f, "Key({})", g.key),
            SetOperation(s) => {
                let name = match s.op {
                    SetOperator::Union => "Union",
                    SetOperator::Intersect => "Intersect",
                    SetOperator::Except => "Except",
                };
                write!(f, "{}.{}({})", s.source, name, s.other)
            }
            ResultOperator(r) => {
                write!(f, "{}.{:?}(", r.source, r.op)?;
                match (&r.variable, &r.argument) {
                    (Some(v), Some(arg)) => write!(f, "{} => {}", v, arg)?,
                    (None, Some(arg)) => write!(f, "{}", arg)?,
                    _ => {}
                }
                write!(f, ")")
            }
            Pipeline(p) => {
                write!(f, "pipeline[")?;
                for (i, stage) in p.stages.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", stage.stage_name())?;
                }
                write!(f, "]")
            }
        }
    }
}

fn binary_symbol(op: BinaryOperator) -> &'static str {
    use BinaryOperator::*;
    match op {
        Add => "+",
        Subtract => "-",
        Multiply => "*",
        Divide => "/",
        Modulo => "%",
        And => "&&",
        Or => "||",
        Eq => "==",
        Ne => "!=",
        Lt => "<",
        Lte => "<=",
        Gt => ">",
        Gte => ">=",
        Coalesce => "??",
    }
}
