use crate::query::AccumulatorFunction;
use bson::{bson, Bson};
use lazy_static::lazy_static;

lazy_static! {
    /// The whole-document variable, used as the grouping key when
    /// distinguishing entire documents.
    pub(crate) static ref ROOT: Bson = Bson::String("$$ROOT".to_string());
}

pub(crate) fn accumulator_op(function: AccumulatorFunction) -> &'static str {
    use AccumulatorFunction::*;
    match function {
        AddToSet => "$addToSet",
        Avg => "$avg",
        First => "$first",
        Last => "$last",
        Max => "$max",
        Min => "$min",
        Push => "$push",
        Sum => "$sum",
    }
}

/// DateTime members with a direct operator counterpart. `DayOfWeek` is
/// absent: it needs a `-1` adjustment because the server numbers Sunday
/// as 1 while the object model numbers it 0.
pub(crate) fn datetime_member_op(member: &str) -> Option<&'static str> {
    Some(match member {
        "Day" => "$dayOfMonth",
        "DayOfYear" => "$dayOfYear",
        "Hour" => "$hour",
        "Millisecond" => "$millisecond",
        "Minute" => "$minute",
        "Month" => "$month",
        "Second" => "$second",
        "Year" => "$year",
        _ => return None,
    })
}

/// Combines two translated operands under an associative operator,
/// appending to an existing `{op: [...]}` document instead of nesting
/// another level. Left-associative chains thus stay a single operator
/// invocation.
pub(crate) fn flatten_operator(op: &'static str, left: Bson, right: Bson) -> Bson {
    if let Bson::Document(mut doc) = left {
        let extendable = doc.len() == 1 && matches!(doc.get(op), Some(Bson::Array(_)));
        if extendable {
            if let Some(Bson::Array(args)) = doc.get_mut(op) {
                args.push(right);
            }
            return Bson::Document(doc);
        }
        return bson!({ op: [doc, right] });
    }
    bson!({ op: [left, right] })
}

/// Wraps a constant in `$literal` when any string inside it begins with
/// `$`, or any nested document key does, so the server cannot mistake the
/// user-provided value for a field reference or an operator.
pub(crate) fn escape_literal(value: Bson) -> Bson {
    if needs_literal_escape(&value) {
        bson!({ "$literal": value })
    } else {
        value
    }
}

fn needs_literal_escape(value: &Bson) -> bool {
    match value {
        Bson::String(s) => s.starts_with('$'),
        Bson::Array(items) => items.iter().any(needs_literal_escape),
        Bson::Document(doc) => doc
            .iter()
            .any(|(k, v)| k.starts_with('$') || needs_literal_escape(v)),
        _ => false,
    }
}
