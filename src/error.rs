/// Hard failures that propagate to the caller.
///
/// Everything that can go wrong inside a trial (compile failure, timeout,
/// runtime fault) is recovered locally by the pipeline and reported through
/// `TrialResult`; these variants are reserved for conditions under which no
/// measurement can be attempted at all.
#[derive(Debug, thiserror::Error)]
pub enum MeasureError {
    #[error("empty input: {0}")]
    EmptyInput(&'static str),

    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("model backend unavailable: {0}")]
    UpstreamUnavailable(String),
}
