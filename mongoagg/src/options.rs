/// Options passed in for translation, threaded through the builder by the
/// caller rather than held in process-wide state.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct TranslateOptions {
    pub match_strategy: MatchStrategy,
}

impl TranslateOptions {
    pub fn new(match_strategy: MatchStrategy) -> Self {
        TranslateOptions { match_strategy }
    }
}

/// Controls how `$match` payloads are rendered.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum MatchStrategy {
    /// Render predicates in the server's query language where
    /// expressible, falling back to `{"$expr": …}` otherwise.
    #[default]
    PreferMatchLanguage,
    /// Always render predicates as `{"$expr": …}` aggregation
    /// expressions.
    ExprOnly,
}
