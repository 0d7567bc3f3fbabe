use bson::Bson;
use mongoagg_datastructures::UniqueLinkedHashMap;

/// The expression tree handed over by the fluent query front-end. Field
/// paths are already resolved against the collection schema and scope
/// variables are uniquely named; the translator consumes the tree read-only.
#[derive(PartialEq, Debug, Clone)]
pub enum Expression {
    Binary(BinaryExpr),
    Unary(UnaryExpr),
    Conditional(ConditionalExpr),
    Constant(ConstantExpr),
    MemberAccess(MemberAccessExpr),
    MethodCall(MethodCallExpr),
    NewDocument(NewDocumentExpr),
    Field(FieldExpr),
    FieldAsDocument(FieldAsDocumentExpr),
    Select(SelectExpr),
    Where(WhereExpr),
    Accumulator(AccumulatorExpr),
    GroupingKey(GroupingKeyExpr),
    SetOperation(SetOperationExpr),
    ResultOperator(ResultOperatorExpr),
    Pipeline(PipelineExpr),
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum BinaryOperator {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,

    // Boolean
    And,
    Or,

    // Comparison
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,

    // Null handling
    Coalesce,
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum UnaryOperator {
    Not,
    Negate,
    Convert,
    ArrayLength,
}

/// The front-end's coarse static-type annotation. Only the distinctions the
/// dispatch tables need are kept: string-typed `Add` becomes `$concat`, and
/// member/method dispatch keys on the declaring type.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum ValueType {
    Boolean,
    DateTime,
    Double,
    Int32,
    Int64,
    String,
    Array,
    Document,
    Set,
    Unknown,
}

#[derive(PartialEq, Debug, Clone)]
pub struct BinaryExpr {
    pub op: BinaryOperator,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
    /// Static type of the operands as annotated by the front-end.
    pub ty: ValueType,
}

#[derive(PartialEq, Debug, Clone)]
pub struct UnaryExpr {
    pub op: UnaryOperator,
    pub operand: Box<Expression>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct ConditionalExpr {
    pub condition: Box<Expression>,
    pub then: Box<Expression>,
    pub otherwise: Box<Expression>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct ConstantExpr {
    pub value: Bson,
}

#[derive(PartialEq, Debug, Clone)]
pub struct MemberAccessExpr {
    pub target: Box<Expression>,
    pub member: String,
    pub declaring: ValueType,
}

#[derive(PartialEq, Debug, Clone)]
pub struct MethodCallExpr {
    /// None for static methods such as `IsNullOrEmpty`.
    pub receiver: Option<Box<Expression>>,
    pub method: String,
    pub declaring: ValueType,
    pub args: Vec<Expression>,
}

/// A constructor or member-init expression binding named members to
/// subexpressions in source order. At most one member may be a
/// `GroupingKey`; when present it becomes the `_id` slot of a group stage.
#[derive(PartialEq, Debug, Clone)]
pub struct NewDocumentExpr {
    pub members: UniqueLinkedHashMap<Expression>,
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct FieldExpr {
    /// Resolved dotted path, emitted as `"$" + path`.
    pub path: String,
}

impl From<&str> for FieldExpr {
    fn from(path: &str) -> Self {
        FieldExpr {
            path: path.to_string(),
        }
    }
}

impl From<String> for FieldExpr {
    fn from(path: String) -> Self {
        FieldExpr { path }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct FieldAsDocumentExpr {
    pub name: String,
    pub expr: Box<Expression>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct SelectExpr {
    pub source: Box<Expression>,
    pub variable: String,
    pub selector: Box<Expression>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct WhereExpr {
    pub source: Box<Expression>,
    pub variable: String,
    pub predicate: Box<Expression>,
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum AccumulatorFunction {
    AddToSet,
    Avg,
    First,
    Last,
    Max,
    Min,
    Push,
    Sum,
}

#[derive(PartialEq, Debug, Clone)]
pub struct AccumulatorExpr {
    pub function: AccumulatorFunction,
    pub arg: Box<Expression>,
}

/// Wraps the key expression of a group stage. Inside a group result
/// selector this marks the member that becomes `_id`; downstream of a
/// group stage it reads back as `"$_id"`.
#[derive(PartialEq, Debug, Clone)]
pub struct GroupingKeyExpr {
    pub key: Box<Expression>,
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum SetOperator {
    Union,
    Intersect,
    Except,
}

#[derive(PartialEq, Debug, Clone)]
pub struct SetOperationExpr {
    pub op: SetOperator,
    pub source: Box<Expression>,
    pub other: Box<Expression>,
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum ResultOperator {
    All,
    Any,
    Contains,
    Count,
    First,
    Single,
}

/// A result operator applied to an array-valued source inside an
/// expression. `variable` binds the predicate scope for `Any`/`All` with
/// a predicate argument.
#[derive(PartialEq, Debug, Clone)]
pub struct ResultOperatorExpr {
    pub op: ResultOperator,
    pub source: Box<Expression>,
    pub variable: Option<String>,
    pub argument: Option<Box<Expression>>,
}

/// An ordered list of pipeline stages plus an optional terminal result
/// operator. `stages` is non-empty; the first stage reads the source
/// collection.
#[derive(PartialEq, Debug, Clone)]
pub struct PipelineExpr {
    pub stages: Vec<QueryStage>,
    pub terminal: Option<TerminalOperator>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct TerminalOperator {
    pub op: ResultOperator,
    pub argument: Option<Box<Expression>>,
}

#[derive(PartialEq, Debug, Clone)]
pub enum QueryStage {
    Match(MatchStage),
    Select(SelectStage),
    GroupBy(GroupByStage),
    Sort(SortStage),
    Skip(i64),
    Limit(i64),
    OfType(OfTypeStage),
    Unwind(UnwindStage),
    Distinct(DistinctStage),
}

impl QueryStage {
    /// The aggregation stage operator this stage emits, used for error
    /// context.
    pub fn stage_name(&self) -> &'static str {
        use QueryStage::*;
        match self {
            Match(_) | OfType(_) => "$match",
            Select(_) => "$project",
            GroupBy(_) | Distinct(_) => "$group",
            Sort(_) => "$sort",
            Skip(_) => "$skip",
            Limit(_) => "$limit",
            Unwind(_) => "$unwind",
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct MatchStage {
    pub predicate: Expression,
}

#[derive(PartialEq, Debug, Clone)]
pub struct SelectStage {
    pub selector: Expression,
}

#[derive(PartialEq, Debug, Clone)]
pub struct GroupByStage {
    pub key: Expression,
    /// Present for the `GroupBy(key, resultSelector)` form, where the
    /// group stage itself carries the projection.
    pub selector: Option<Expression>,
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(PartialEq, Debug, Clone)]
pub struct SortStage {
    pub key: Expression,
    pub direction: SortDirection,
    /// True for `ThenBy`/`ThenByDescending`: the key extends the sort
    /// specification opened by the preceding sort stage.
    pub continuation: bool,
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct OfTypeStage {
    /// Discriminator field recorded on the front-end type.
    pub field: String,
    pub type_name: String,
}

#[derive(PartialEq, Debug, Clone)]
pub struct UnwindStage {
    /// Resolved path of the array field being flattened.
    pub path: String,
    pub selector: Option<Expression>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct DistinctStage {
    /// None distinguishes whole documents (`_id: "$$ROOT"`).
    pub key: Option<Expression>,
}
