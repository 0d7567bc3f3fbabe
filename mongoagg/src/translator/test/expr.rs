macro_rules! test_translate_expr {
    ($func_name:ident, expected = $expected:expr, input = $input:expr) => {
        #[test]
        fn $func_name() {
            use crate::{options::TranslateOptions, translator::PipelineTranslator};
            let expected = $expected;
            let input = $input;

            let mut translator = PipelineTranslator::new(TranslateOptions::default());
            assert_eq!(expected, translator.translate_expression(input));
        }
    };
}

mod binary {
    use crate::{
        query::{BinaryOperator::*, ValueType},
        translator::test::helpers::*,
    };
    use bson::bson;

    test_translate_expr!(
        numeric_add,
        expected = Ok(bson!({ "$add": ["$A", "$B"] })),
        input = binary(Add, ValueType::Int32, field("A"), field("B"))
    );

    test_translate_expr!(
        string_add_becomes_concat,
        expected = Ok(bson!({ "$concat": ["$A", "$B"] })),
        input = binary(Add, ValueType::String, field("A"), field("B"))
    );

    // A left-associative chain stays one operator invocation.
    test_translate_expr!(
        concat_chain_flattens,
        expected = Ok(bson!({ "$concat": ["$A", " ", "$B"] })),
        input = binary(
            Add,
            ValueType::String,
            binary(Add, ValueType::String, field("A"), constant(" ")),
            field("B")
        )
    );

    test_translate_expr!(
        add_chain_flattens,
        expected = Ok(bson!({ "$add": ["$A", "$B", "$C"] })),
        input = binary(
            Add,
            ValueType::Int64,
            binary(Add, ValueType::Int64, field("A"), field("B")),
            field("C")
        )
    );

    // Flattening only folds the same operator.
    test_translate_expr!(
        mixed_operators_do_not_flatten,
        expected = Ok(bson!({ "$add": [{ "$multiply": ["$A", "$B"] }, "$C"] })),
        input = binary(
            Add,
            ValueType::Double,
            binary(Multiply, ValueType::Double, field("A"), field("B")),
            field("C")
        )
    );

    test_translate_expr!(
        subtract,
        expected = Ok(bson!({ "$subtract": ["$A", 1] })),
        input = binary(Subtract, ValueType::Int32, field("A"), constant(1))
    );

    test_translate_expr!(
        divide,
        expected = Ok(bson!({ "$divide": ["$A", "$B"] })),
        input = binary(Divide, ValueType::Double, field("A"), field("B"))
    );

    test_translate_expr!(
        modulo,
        expected = Ok(bson!({ "$mod": ["$A", 2] })),
        input = binary(Modulo, ValueType::Int32, field("A"), constant(2))
    );

    test_translate_expr!(
        and_flattens,
        expected = Ok(bson!({ "$and": ["$A", "$B", "$C"] })),
        input = binary(
            And,
            ValueType::Boolean,
            binary(And, ValueType::Boolean, field("A"), field("B")),
            field("C")
        )
    );

    test_translate_expr!(
        or_flattens,
        expected = Ok(bson!({ "$or": ["$A", "$B", "$C"] })),
        input = binary(
            Or,
            ValueType::Boolean,
            binary(Or, ValueType::Boolean, field("A"), field("B")),
            field("C")
        )
    );

    // Comparisons never flatten.
    test_translate_expr!(
        eq_keeps_two_operands,
        expected = Ok(bson!({ "$eq": ["$A", "$B"] })),
        input = eq(field("A"), field("B"))
    );

    test_translate_expr!(
        lte,
        expected = Ok(bson!({ "$lte": ["$A", 10] })),
        input = binary(Lte, ValueType::Int32, field("A"), constant(10))
    );

    test_translate_expr!(
        coalesce_becomes_if_null,
        expected = Ok(bson!({ "$ifNull": ["$A", "fallback"] })),
        input = binary(
            Coalesce,
            ValueType::String,
            field("A"),
            constant("fallback")
        )
    );
}

mod unary {
    use crate::{
        query::{Expression, UnaryOperator::*},
        translator::{test::helpers::*, Error},
    };
    use bson::bson;

    test_translate_expr!(
        not_wraps_operand_in_array,
        expected = Ok(bson!({ "$not": ["$A"] })),
        input = unary(Not, field("A"))
    );

    test_translate_expr!(
        array_length_becomes_size,
        expected = Ok(bson!({ "$size": "$Tags" })),
        input = unary(ArrayLength, field("Tags"))
    );

    test_translate_expr!(
        convert_is_erased,
        expected = Ok(bson!("$A")),
        input = unary(Convert, field("A"))
    );

    test_translate_expr!(
        negate_is_not_in_the_core_subset,
        expected = Err(Error::UnsupportedExpression("-A".to_string())),
        input = unary(Negate, field("A"))
    );

    test_translate_expr!(
        conditional,
        expected = Ok(bson!({ "$cond": [{ "$eq": ["$A", 1] }, "yes", "no"] })),
        input = Expression::Conditional(crate::query::ConditionalExpr {
            condition: Box::new(eq(field("A"), constant(1))),
            then: Box::new(constant("yes")),
            otherwise: Box::new(constant("no")),
        })
    );
}

mod constant {
    use crate::translator::test::helpers::*;
    use bson::{bson, Bson};

    test_translate_expr!(
        plain_string,
        expected = Ok(bson!("Awesome")),
        input = constant("Awesome")
    );

    test_translate_expr!(
        integer,
        expected = Ok(bson!(42)),
        input = constant(42)
    );

    test_translate_expr!(
        null,
        expected = Ok(Bson::Null),
        input = constant(Bson::Null)
    );

    // A user string that happens to start with $ must not read as a
    // field reference.
    test_translate_expr!(
        dollar_string_is_escaped,
        expected = Ok(bson!({ "$literal": "$price" })),
        input = constant("$price")
    );

    test_translate_expr!(
        array_with_dollar_string_is_escaped_whole,
        expected = Ok(bson!({ "$literal": ["a", "$b"] })),
        input = constant(vec!["a".to_string(), "$b".to_string()])
    );

    test_translate_expr!(
        plain_array_passes_through,
        expected = Ok(bson!(["a", "b"])),
        input = constant(vec!["a".to_string(), "b".to_string()])
    );
}

mod field {
    use crate::{
        query::{Expression, FieldAsDocumentExpr},
        translator::test::helpers::*,
    };
    use bson::bson;

    test_translate_expr!(
        top_level,
        expected = Ok(bson!("$A")),
        input = field("A")
    );

    test_translate_expr!(
        dotted_path,
        expected = Ok(bson!("$a.b.c")),
        input = field("a.b.c")
    );

    test_translate_expr!(
        field_as_document,
        expected = Ok(bson!({ "total": { "$add": ["$A", "$B"] } })),
        input = Expression::FieldAsDocument(FieldAsDocumentExpr {
            name: "total".to_string(),
            expr: Box::new(binary(
                crate::query::BinaryOperator::Add,
                crate::query::ValueType::Int32,
                field("A"),
                field("B")
            )),
        })
    );
}

mod member_access {
    use crate::{
        query::ValueType,
        translator::{test::helpers::*, Error},
    };
    use bson::bson;

    test_translate_expr!(
        year,
        expected = Ok(bson!({ "$year": "$D" })),
        input = member_access(field("D"), "Year", ValueType::DateTime)
    );

    test_translate_expr!(
        day_becomes_day_of_month,
        expected = Ok(bson!({ "$dayOfMonth": "$D" })),
        input = member_access(field("D"), "Day", ValueType::DateTime)
    );

    test_translate_expr!(
        millisecond,
        expected = Ok(bson!({ "$millisecond": "$D" })),
        input = member_access(field("D"), "Millisecond", ValueType::DateTime)
    );

    // The server numbers Sunday as 1, the object model as 0.
    test_translate_expr!(
        day_of_week_is_adjusted,
        expected = Ok(bson!({ "$subtract": [{ "$dayOfWeek": "$D" }, 1] })),
        input = member_access(field("D"), "DayOfWeek", ValueType::DateTime)
    );

    test_translate_expr!(
        collection_count_becomes_size,
        expected = Ok(bson!({ "$size": "$Items" })),
        input = member_access(field("Items"), "Count", ValueType::Array)
    );

    test_translate_expr!(
        unknown_member_is_rejected,
        expected = Err(Error::UnsupportedExpression("D.Ticks".to_string())),
        input = member_access(field("D"), "Ticks", ValueType::DateTime)
    );
}

mod method_call {
    use crate::{
        query::ValueType,
        translator::{test::helpers::*, Error},
    };
    use bson::{bson, Bson};

    test_translate_expr!(
        is_null_or_empty,
        expected = Ok(bson!({ "$or": [{ "$eq": ["$A", Bson::Null] }, { "$eq": ["$A", ""] }] })),
        input = method_call(None, "IsNullOrEmpty", ValueType::String, vec![field("A")])
    );

    test_translate_expr!(
        equals_single_argument,
        expected = Ok(bson!({ "$eq": ["$A", "$B"] })),
        input = method_call(Some(field("A")), "Equals", ValueType::String, vec![field("B")])
    );

    test_translate_expr!(
        equals_ordinal,
        expected = Ok(bson!({ "$eq": ["$A", "$B"] })),
        input = method_call(
            Some(field("A")),
            "Equals",
            ValueType::String,
            vec![field("B"), constant("Ordinal")]
        )
    );

    test_translate_expr!(
        equals_ordinal_ignore_case,
        expected = Ok(bson!({ "$eq": [{ "$strcasecmp": ["$A", "$B"] }, 0] })),
        input = method_call(
            Some(field("A")),
            "Equals",
            ValueType::String,
            vec![field("B"), constant("OrdinalIgnoreCase")]
        )
    );

    test_translate_expr!(
        equals_culture_sensitive_is_rejected,
        expected = Err(Error::UnsupportedExpression(
            "A.Equals(B, \"CurrentCulture\")".to_string()
        )),
        input = method_call(
            Some(field("A")),
            "Equals",
            ValueType::String,
            vec![field("B"), constant("CurrentCulture")]
        )
    );

    test_translate_expr!(
        substring,
        expected = Ok(bson!({ "$substr": ["$A", 1, 3] })),
        input = method_call(
            Some(field("A")),
            "Substring",
            ValueType::String,
            vec![constant(1), constant(3)]
        )
    );

    test_translate_expr!(
        to_lower,
        expected = Ok(bson!({ "$toLower": "$A" })),
        input = method_call(Some(field("A")), "ToLower", ValueType::String, vec![])
    );

    test_translate_expr!(
        to_lower_invariant,
        expected = Ok(bson!({ "$toLower": "$A" })),
        input = method_call(Some(field("A")), "ToLowerInvariant", ValueType::String, vec![])
    );

    test_translate_expr!(
        to_upper,
        expected = Ok(bson!({ "$toUpper": "$A" })),
        input = method_call(Some(field("A")), "ToUpper", ValueType::String, vec![])
    );

    test_translate_expr!(
        is_subset_of,
        expected = Ok(bson!({ "$setIsSubset": ["$S", "$T"] })),
        input = method_call(Some(field("S")), "IsSubsetOf", ValueType::Set, vec![field("T")])
    );

    test_translate_expr!(
        set_equals,
        expected = Ok(bson!({ "$setEquals": ["$S", "$T"] })),
        input = method_call(Some(field("S")), "SetEquals", ValueType::Set, vec![field("T")])
    );

    test_translate_expr!(
        compare_to,
        expected = Ok(bson!({ "$cmp": ["$A", "$B"] })),
        input = method_call(Some(field("A")), "CompareTo", ValueType::Int32, vec![field("B")])
    );

    test_translate_expr!(
        unknown_method_is_rejected,
        expected = Err(Error::UnsupportedExpression("A.Trim()".to_string())),
        input = method_call(Some(field("A")), "Trim", ValueType::String, vec![])
    );

    test_translate_expr!(
        wrong_arity_is_rejected,
        expected = Err(Error::UnsupportedExpression("A.Substring(1)".to_string())),
        input = method_call(
            Some(field("A")),
            "Substring",
            ValueType::String,
            vec![constant(1)]
        )
    );
}

mod set_operation {
    use crate::{
        query::{Expression, SetOperationExpr, SetOperator},
        translator::test::helpers::*,
    };
    use bson::bson;

    fn set_op(op: SetOperator) -> Expression {
        Expression::SetOperation(SetOperationExpr {
            op,
            source: Box::new(field("S")),
            other: Box::new(field("T")),
        })
    }

    test_translate_expr!(
        union,
        expected = Ok(bson!({ "$setUnion": ["$S", "$T"] })),
        input = set_op(SetOperator::Union)
    );

    test_translate_expr!(
        intersect,
        expected = Ok(bson!({ "$setIntersection": ["$S", "$T"] })),
        input = set_op(SetOperator::Intersect)
    );

    test_translate_expr!(
        except,
        expected = Ok(bson!({ "$setDifference": ["$S", "$T"] })),
        input = set_op(SetOperator::Except)
    );
}

mod array_scope {
    use crate::{
        query::{BinaryOperator, ValueType},
        translator::test::helpers::*,
    };
    use bson::bson;

    // Bound-variable fields pick up the $$v prefix; the map input does
    // not.
    test_translate_expr!(
        select_becomes_map,
        expected = Ok(bson!({
            "$map": {
                "input": "$Items",
                "as": "i",
                "in": { "$add": ["$$i.Price", 1] }
            }
        })),
        input = array_select(
            field("Items"),
            "i",
            binary(
                BinaryOperator::Add,
                ValueType::Int32,
                field("Price"),
                constant(1)
            )
        )
    );

    // Projecting a bare sub-field of a field source fuses the paths
    // instead of emitting a $map.
    test_translate_expr!(
        select_fuses_field_paths,
        expected = Ok(bson!("$Items.Price")),
        input = array_select(field("Items"), "i", field("Price"))
    );

    test_translate_expr!(
        where_becomes_filter,
        expected = Ok(bson!({
            "$filter": {
                "input": "$Items",
                "as": "i",
                "cond": { "$eq": ["$$i.Color", "red"] }
            }
        })),
        input = array_where(field("Items"), "i", eq(field("Color"), constant("red")))
    );

    // The outer prefix applies to the nested source but not to the
    // nested selector, which rebinds its own variable.
    test_translate_expr!(
        nested_select_keeps_inner_scope,
        expected = Ok(bson!({
            "$map": {
                "input": "$Items",
                "as": "i",
                "in": {
                    "$map": {
                        "input": "$$i.Tags",
                        "as": "t",
                        "in": { "$add": ["$$t.Weight", 1] }
                    }
                }
            }
        })),
        input = array_select(
            field("Items"),
            "i",
            array_select(
                field("Tags"),
                "t",
                binary(
                    BinaryOperator::Add,
                    ValueType::Int32,
                    field("Weight"),
                    constant(1)
                )
            )
        )
    );
}

mod result_operator {
    use crate::{
        query::ResultOperator,
        translator::test::helpers::*,
    };
    use bson::bson;

    test_translate_expr!(
        count_becomes_size,
        expected = Ok(bson!({ "$size": "$Items" })),
        input = result_op(ResultOperator::Count, field("Items"), None, None)
    );

    test_translate_expr!(
        any_without_predicate,
        expected = Ok(bson!({ "$gt": [{ "$size": "$Items" }, 0] })),
        input = result_op(ResultOperator::Any, field("Items"), None, None)
    );

    test_translate_expr!(
        any_with_predicate,
        expected = Ok(bson!({
            "$anyElementTrue": {
                "$map": {
                    "input": "$Items",
                    "as": "i",
                    "in": { "$eq": ["$$i.Color", "red"] }
                }
            }
        })),
        input = result_op(
            ResultOperator::Any,
            field("Items"),
            Some("i"),
            Some(eq(field("Color"), constant("red")))
        )
    );

    test_translate_expr!(
        all_with_predicate,
        expected = Ok(bson!({
            "$allElementsTrue": {
                "$map": {
                    "input": "$Items",
                    "as": "i",
                    "in": { "$gt": ["$$i.Qty", 0] }
                }
            }
        })),
        input = result_op(
            ResultOperator::All,
            field("Items"),
            Some("i"),
            Some(binary(
                crate::query::BinaryOperator::Gt,
                crate::query::ValueType::Int32,
                field("Qty"),
                constant(0)
            ))
        )
    );

    test_translate_expr!(
        contains,
        expected = Ok(bson!({
            "$anyElementTrue": {
                "$map": { "input": "$Tags", "as": "x", "in": { "$eq": ["$$x", "sale"] } }
            }
        })),
        input = result_op(
            ResultOperator::Contains,
            field("Tags"),
            None,
            Some(constant("sale"))
        )
    );
}

mod invariants {
    use crate::{
        query::AccumulatorFunction,
        translator::{test::helpers::*, Error},
    };

    test_translate_expr!(
        accumulator_outside_group_is_an_internal_error,
        expected = Err(Error::InternalInvariantViolation(
            "accumulator outside a group stage: First(B)".to_string()
        )),
        input = accumulator(AccumulatorFunction::First, field("B"))
    );

    test_translate_expr!(
        grouping_key_outside_group_is_an_internal_error,
        expected = Err(Error::InternalInvariantViolation(
            "grouping key reference outside a group stage: Key(A)".to_string()
        )),
        input = grouping_key(field("A"))
    );
}
