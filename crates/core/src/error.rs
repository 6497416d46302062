use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed, empty or degenerate sales input. Fatal.
    DataValidation,
    /// Research enrichment failed as a whole. Recovered by the pipeline.
    ResearchUnavailable,
    /// Model output could not be mapped onto the report schema. Fatal.
    SynthesisParse,
    /// Model output parsed but is incomplete. Fatal.
    SynthesisValidation,
    /// Model could not be reached (after the bounded retry). Fatal.
    SynthesisUnavailable,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::DataValidation => "data_validation",
            ErrorKind::ResearchUnavailable => "research_unavailable",
            ErrorKind::SynthesisParse => "synthesis_parse",
            ErrorKind::SynthesisValidation => "synthesis_validation",
            ErrorKind::SynthesisUnavailable => "synthesis_unavailable",
        }
    }

    pub fn is_fatal(self) -> bool {
        !matches!(self, ErrorKind::ResearchUnavailable)
    }
}

/// Error raised by one of the pipeline stages. Travels inside `anyhow::Error`; recover it with
/// `err.downcast_ref::<PipelineError>()`.
#[derive(Debug, Clone)]
pub struct PipelineError {
    pub kind: ErrorKind,
    pub stage: &'static str,
    pub detail: String,
}

impl PipelineError {
    pub fn new(kind: ErrorKind, stage: &'static str, detail: impl Into<String>) -> Self {
        Self {
            kind,
            stage,
            detail: detail.into(),
        }
    }

    pub fn data_validation(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::DataValidation, "aggregate", detail)
    }

    pub fn research_unavailable(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::ResearchUnavailable, "research", detail)
    }

    pub fn synthesis_parse(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::SynthesisParse, "synthesis", detail)
    }

    pub fn synthesis_validation(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::SynthesisValidation, "synthesis", detail)
    }

    pub fn synthesis_unavailable(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::SynthesisUnavailable, "synthesis", detail)
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} error (stage={}): {}",
            self.kind.as_str(),
            self.stage,
            self.detail
        )
    }
}

impl std::error::Error for PipelineError {}

/// Taxonomy kind of an `anyhow` error chain, if any link is a `PipelineError`.
pub fn kind_of(err: &anyhow::Error) -> Option<ErrorKind> {
    err.downcast_ref::<PipelineError>()
        .or_else(|| err.chain().find_map(|e| e.downcast_ref::<PipelineError>()))
        .map(|e| e.kind)
}
