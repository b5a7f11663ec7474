//! Run-level errors.
//!
//! [`GridError`] covers failures that concern a whole simulation run rather
//! than one element: unreadable input, a network that cannot be solved, a
//! load-flow engine that gave up. Each variant knows which `errors` bucket of
//! the response it belongs to, so the pipeline can report it without
//! matching on strings. Failures of a single element creation are
//! [`ModelError`](crate::model::ModelError)s and end up in that element's
//! creation status instead.
//!
//! ```
//! use gridsim_core::GridError;
//!
//! let err = GridError::Solver("singular Jacobian at iteration 3".into());
//! assert_eq!(err.bucket(), "powerflow");
//! assert_eq!(err.to_entry().message, "singular Jacobian at iteration 3");
//! ```

use crate::schema::ValidationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GridError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Request document could not be decoded.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Diagram failed a network-wide check.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Model error: {0}")]
    Model(#[from] crate::model::ModelError),

    /// Load-flow settings or engine failure.
    #[error("Solver error: {0}")]
    Solver(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Assembled network cannot be simulated, or assembly itself broke.
    #[error("Network error: {0}")]
    Network(String),

    #[error("{0}")]
    Other(String),
}

pub type GridResult<T> = Result<T, GridError>;

impl GridError {
    /// Key of the response `errors` map this error is reported under.
    pub fn bucket(&self) -> &'static str {
        match self {
            GridError::Validation(_) | GridError::Parse(_) => "validation",
            GridError::Solver(_) | GridError::Config(_) => "powerflow",
            _ => "network",
        }
    }

    /// Message without the category prefix of `Display`.
    pub fn detail(&self) -> String {
        match self {
            GridError::Io(e) => e.to_string(),
            GridError::Model(e) => e.to_string(),
            GridError::Parse(s)
            | GridError::Validation(s)
            | GridError::Solver(s)
            | GridError::Config(s)
            | GridError::Network(s)
            | GridError::Other(s) => s.clone(),
        }
    }

    /// Run-level entry for the response, not tied to any element.
    pub fn to_entry(&self) -> ValidationError {
        let element_type = match self.bucket() {
            "validation" => "network",
            bucket => bucket,
        };
        ValidationError::new("", element_type, None, self.detail())
    }
}

impl From<anyhow::Error> for GridError {
    fn from(err: anyhow::Error) -> Self {
        GridError::Other(format!("{err:#}"))
    }
}

impl From<String> for GridError {
    fn from(s: String) -> Self {
        GridError::Other(s)
    }
}

impl From<&str> for GridError {
    fn from(s: &str) -> Self {
        GridError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for GridError {
    fn from(err: serde_json::Error) -> Self {
        GridError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelError;

    #[test]
    fn buckets_follow_the_failing_stage() {
        assert_eq!(GridError::Validation("x".into()).bucket(), "validation");
        assert_eq!(GridError::Solver("x".into()).bucket(), "powerflow");
        assert_eq!(GridError::Network("x".into()).bucket(), "network");
        assert_eq!(GridError::from("boom").bucket(), "network");
    }

    #[test]
    fn entry_carries_detail_only() {
        let err = GridError::Network("No ext_grid found.".into());
        assert_eq!(err.to_string(), "Network error: No ext_grid found.");
        let entry = err.to_entry();
        assert_eq!(entry.element_id, "");
        assert_eq!(entry.element_type, "network");
        assert_eq!(entry.message, "No ext_grid found.");
        assert!(entry.field.is_none());
    }

    #[test]
    fn conversions_pick_the_right_variant() {
        let io: GridError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(io, GridError::Io(_)));

        let model: GridError = ModelError::UnknownStdType {
            kind: "line",
            name: "nope".into(),
        }
        .into();
        assert!(matches!(model, GridError::Model(_)));
        assert_eq!(model.detail(), "unknown line standard type 'nope'");

        let json: GridError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(json, GridError::Parse(_)));
        assert_eq!(json.to_entry().element_type, "network");
    }
}
