pub mod options;
pub mod query;
pub mod result;
pub mod translator;
mod util;


pub use translator::{PipelineTranslation, PipelineTranslator, ResultHandling};

use crate::options::TranslateOptions;
use bson::Bson;

/// The outcome of a translation: result operators lowered over array
/// values yield a single BSON value, everything else yields an ordered
/// list of aggregation stage documents.
#[derive(PartialEq, Debug)]
pub enum Translation {
    Value(Bson),
    Pipeline(PipelineTranslation),
}

impl Translation {
    /// Canonical relaxed-JSON rendering of the emitted value, the form
    /// tests compare against and callers log.
    pub fn to_relaxed_json(&self) -> serde_json::Value {
        match self {
            Translation::Value(value) => value.clone().into_relaxed_extjson(),
            Translation::Pipeline(translation) => serde_json::Value::Array(
                translation
                    .pipeline
                    .iter()
                    .map(|stage| Bson::Document(stage.clone()).into_relaxed_extjson())
                    .collect(),
            ),
        }
    }
}

/// Translates one expression tree produced by the query front-end. A
/// pipeline expression becomes a list of stage documents; any other
/// recognized expression becomes a single BSON value. The translation
/// either completes fully or fails; no partial pipeline is returned.
pub fn translate(
    expr: query::Expression,
    options: TranslateOptions,
) -> result::Result<Translation> {
    match expr {
        query::Expression::Pipeline(pipeline) => {
            let translation = PipelineTranslator::new(options).translate_pipeline(pipeline)?;
            Ok(Translation::Pipeline(translation))
        }
        other => {
            let mut translator = PipelineTranslator::new(options);
            Ok(Translation::Value(translator.translate_expression(other)?))
        }
    }
}
