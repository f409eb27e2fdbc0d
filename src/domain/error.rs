//! Domain error types.

/// A parse error with position information for rule parsing.
#[derive(Debug, Clone, thiserror::Error)]
#[error("parse error at position {position}: {message}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    /// Format the error with a caret pointing at the error position in the input.
    pub fn display_with_context(&self, input: &str) -> String {
        let caret = " ".repeat(self.position) + "^";
        format!(
            "{input}\n{caret}\n{err}",
            input = input,
            caret = caret,
            err = self
        )
    }
}

/// Coarse classification of a [`QtraderError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Data,
    Parameter,
    Computation,
    Config,
    Io,
}

/// A strategy dropped from a comparison, with the reason it failed.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ExcludedStrategy {
    pub id: String,
    pub kind: ErrorKind,
    pub reason: String,
}

/// Top-level error type for qtrader.
#[derive(Debug, thiserror::Error)]
pub enum QtraderError {
    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("insufficient data: have {bars} bars, need {minimum}")]
    InsufficientData { bars: usize, minimum: usize },

    #[error("invalid parameter {name}: {reason}")]
    Parameter { name: String, reason: String },

    #[error("unknown strategy '{id}'")]
    UnknownStrategy { id: String },

    #[error(transparent)]
    RuleParse(#[from] ParseError),

    #[error("invalid rule: {reason}")]
    RuleInvalid { reason: String },

    #[error("computation error: {reason}")]
    Computation { reason: String },

    #[error("no valid strategies were processed ({} excluded)", .excluded.len())]
    NoValidStrategies { excluded: Vec<ExcludedStrategy> },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl QtraderError {
    pub fn data(reason: impl Into<String>) -> Self {
        QtraderError::Data {
            reason: reason.into(),
        }
    }

    pub fn parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        QtraderError::Parameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn computation(reason: impl Into<String>) -> Self {
        QtraderError::Computation {
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            QtraderError::Data { .. } | QtraderError::InsufficientData { .. } => ErrorKind::Data,
            QtraderError::Parameter { .. }
            | QtraderError::UnknownStrategy { .. }
            | QtraderError::RuleParse(_)
            | QtraderError::RuleInvalid { .. } => ErrorKind::Parameter,
            QtraderError::Computation { .. } | QtraderError::NoValidStrategies { .. } => {
                ErrorKind::Computation
            }
            QtraderError::ConfigParse { .. }
            | QtraderError::ConfigMissing { .. }
            | QtraderError::ConfigInvalid { .. } => ErrorKind::Config,
            QtraderError::Io(_) | QtraderError::Json(_) => ErrorKind::Io,
        }
    }
}

impl From<&QtraderError> for std::process::ExitCode {
    fn from(err: &QtraderError) -> Self {
        let code: u8 = match err.kind() {
            ErrorKind::Io => 1,
            ErrorKind::Config => 2,
            ErrorKind::Data => 3,
            ErrorKind::Parameter => 4,
            ErrorKind::Computation => 5,
        };
        std::process::ExitCode::from(code)
    }
}
