use thiserror::Error;

use crate::config::Method;

/// Native error type returned by fitting engines.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while turning a training request into a fitted model record.
#[derive(Error, Debug)]
pub enum TrainError {
    /// A feature column holds a value that cannot be read as a number.
    #[error("column '{column}' cannot be coerced to numeric: '{value}' at row {row}")]
    TypeConversion {
        column: String,
        row: usize,
        value: String,
    },

    #[error("missing tuning value '{name}' for method '{method}'")]
    MissingTuningValue { method: Method, name: String },

    #[error("invalid tuning value {name} = {value}: {reason}")]
    InvalidTuningValue {
        name: String,
        value: f64,
        reason: &'static str,
    },

    #[error("unsupported method '{0}', expected one of plsda, gbm, rf, svm, pam, glmnet")]
    UnsupportedMethod(String),

    #[error("no backend registered for method '{0}'")]
    BackendUnavailable(Method),

    /// The glmnet response family cannot be inferred from the observed labels.
    #[error("cannot infer response family from {levels} observed class level(s)")]
    UnresolvableFamily { levels: usize },

    #[error("invalid value for option '{key}': {reason}")]
    InvalidOption { key: String, reason: String },

    #[error("invalid feature table: {0}")]
    InvalidTable(String),

    #[error("invalid obs_levels: {0}")]
    InvalidObsLevels(String),

    /// The engine failed. `source` is the engine's own error, untouched.
    #[error("{method} backend failed to fit: {source}")]
    BackendFit {
        method: Method,
        #[source]
        source: BoxError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_type_conversion_message() {
        let error = TrainError::TypeConversion {
            column: "f2".to_string(),
            row: 3,
            value: "abc".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "column 'f2' cannot be coerced to numeric: 'abc' at row 3"
        );
    }

    #[test]
    fn test_backend_fit_keeps_native_source() {
        let native: BoxError = "did not converge".into();
        let error = TrainError::BackendFit {
            method: Method::Glmnet,
            source: native,
        };
        assert_eq!(error.to_string(), "glmnet backend failed to fit: did not converge");
        assert_eq!(error.source().unwrap().to_string(), "did not converge");
    }
}
