use crate::{options::TranslateOptions, query};
use bson::Document;
use mongoagg_datastructures::DuplicateKeyError;
use thiserror::Error;

mod expressions;
mod match_query;
mod prefixer;
mod projection;
mod result_operators;
mod stages;
mod utils;


pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("cannot translate expression: {0}")]
    UnsupportedExpression(String),
    #[error("in {stage} stage: {error}")]
    Stage {
        stage: &'static str,
        error: Box<Error>,
    },
    #[error("internal invariant violated: {0}")]
    InternalInvariantViolation(String),
    #[error("sort key '{0}' appears more than once in a single sort specification")]
    AmbiguousOrdering(String),
    #[error("duplicate key found: {0}")]
    DuplicateKey(#[from] DuplicateKeyError),
}

impl Error {
    pub(crate) fn unsupported(expr: &query::Expression) -> Error {
        Error::UnsupportedExpression(expr.to_string())
    }

    /// Attaches the containing stage name so user-facing reports can say
    /// where a rejected subtree came from. The innermost stage wins.
    pub(crate) fn in_stage(stage: &'static str, error: Error) -> Error {
        match error {
            Error::Stage { .. } => error,
            other => Error::Stage {
                stage,
                error: Box::new(other),
            },
        }
    }
}

/// How the driver should read the server's reply for a translated
/// pipeline.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum ResultHandling {
    /// The pipeline yields a document stream.
    Documents,
    /// The pipeline ends in a count group; the caller reads `__result`
    /// from the single reply document.
    Count,
    /// Existence check: any reply document at all means `true`.
    Exists,
}

#[derive(PartialEq, Debug)]
pub struct PipelineTranslation {
    pub pipeline: Vec<Document>,
    pub result: ResultHandling,
}

/// Builds one aggregation pipeline from one pipeline expression. All
/// fresh-name allocation (`__fldN`, `__aggN`) is local to a single
/// builder; sharing a builder between pipelines would alias slot names.
#[derive(Debug)]
pub struct PipelineTranslator {
    options: TranslateOptions,
    pipeline: Vec<Document>,
    fresh_field_counter: usize,
    /// Open `$group` stage accepting hoisted accumulator slots.
    group: Option<GroupContext>,
    /// Set after a Distinct: later bare field paths live under `_id`.
    fields_under_id: bool,
    /// Index of the `$sort` document accepting continuation keys.
    open_sort: Option<usize>,
    /// Accumulator arguments run against the group's input documents, so
    /// they must not themselves hoist.
    in_accumulator_arg: bool,
}

#[derive(Debug)]
struct GroupContext {
    stage_index: usize,
    /// One slot per distinct accumulator expression, in allocation order.
    slots: Vec<(query::AccumulatorExpr, String)>,
}

impl PipelineTranslator {
    pub fn new(options: TranslateOptions) -> Self {
        Self {
            options,
            pipeline: vec![],
            fresh_field_counter: 0,
            group: None,
            fields_under_id: false,
            open_sort: None,
            in_accumulator_arg: false,
        }
    }

    /// Translates a whole pipeline expression into stage documents,
    /// consuming the builder. Either the full pipeline is produced or an
    /// error is returned; no partial pipeline escapes.
    pub fn translate_pipeline(
        mut self,
        pipeline: query::PipelineExpr,
    ) -> Result<PipelineTranslation> {
        if pipeline.stages.is_empty() {
            return Err(Error::InternalInvariantViolation(
                "pipeline expression has no stages".to_string(),
            ));
        }
        for stage in pipeline.stages {
            self.translate_stage(stage)?;
        }
        let result = match pipeline.terminal {
            Some(terminal) => self.translate_terminal(terminal)?,
            None => ResultHandling::Documents,
        };
        Ok(PipelineTranslation {
            pipeline: self.pipeline,
            result,
        })
    }

    fn fresh_field_name(&mut self) -> String {
        let name = format!("__fld{}", self.fresh_field_counter);
        self.fresh_field_counter += 1;
        name
    }
}
