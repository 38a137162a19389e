//! Error types for schema extraction, registration and dispatch.
//!
//! Load-time problems ([`SchemaError`], [`RegistrationError`]) are returned
//! from `extract` / `RouterBuilder::build` and are meant to abort start-up.
//! Call-time problems ([`CallError`]) never leave the router as errors: they
//! are rendered into text and handed back to the conversation loop. The only
//! call-time error that is raised is [`ContractError`].

use std::fmt;

use thiserror::Error;

use crate::models::CallStatus;

/// A method could not be turned into a valid function descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("function '{function}' has no description; document the method so the model knows when to call it")]
    MissingDescription { function: String },

    #[error("function '{function}': field '{field}' has unsupported type `{type_name}`")]
    UnsupportedType {
        function: String,
        field: String,
        type_name: &'static str,
    },

    #[error("function name '{function}' is invalid; names must match [A-Za-z0-9_-] and be 1-64 characters long")]
    InvalidName { function: String },

    #[error("function '{function}': field '{field}' nests deeper than {limit} levels")]
    RecursionLimit {
        function: String,
        field: String,
        limit: usize,
    },
}

/// Two exposed methods resolve to the same function name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("function '{name}' is exposed by both '{first}' and '{second}'")]
    DuplicateFunction {
        name: String,
        first: String,
        second: String,
    },
}

/// Anything that prevents a router from being built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Registration(#[from] RegistrationError),
}

/// An exposed method produced something other than a string.
///
/// This is a defect in the service, not a recoverable runtime condition, so
/// it is the one call-time failure the router propagates to its caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("function '{function}' must return a string but produced {found}")]
pub struct ContractError {
    pub function: String,
    pub found: &'static str,
}

/// One argument that failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    /// Dotted path of the field, e.g. `filters.max_results` or `labels[2]`.
    pub path: String,
    pub message: String,
}

impl FieldIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Failure reported by a method handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MethodError {
    #[error("invalid arguments: {}", join_issues(.0))]
    InvalidArguments(Vec<FieldIssue>),

    #[error("{0}")]
    Failed(String),
}

impl MethodError {
    pub fn failed(message: impl fmt::Display) -> Self {
        Self::Failed(message.to_string())
    }
}

impl From<serde_json::Error> for MethodError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidArguments(vec![FieldIssue::new("", err.to_string())])
    }
}

/// A call-time failure, rendered as text for the model.
///
/// The `Display` output is the exact string placed in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    #[error("Error: function '{name}' not found.")]
    NotFound { name: String },

    #[error("Error: invalid arguments for function '{name}': {}", join_issues(.issues))]
    InvalidArguments {
        name: String,
        issues: Vec<FieldIssue>,
    },

    #[error("Error: function '{name}' failed: {message}")]
    Failed { name: String, message: String },
}

impl CallError {
    pub fn from_method(name: impl Into<String>, err: MethodError) -> Self {
        let name = name.into();
        match err {
            MethodError::InvalidArguments(issues) => Self::InvalidArguments { name, issues },
            MethodError::Failed(message) => Self::Failed { name, message },
        }
    }

    pub fn status(&self) -> CallStatus {
        match self {
            Self::NotFound { .. } => CallStatus::NotFound,
            Self::InvalidArguments { .. } => CallStatus::InvalidArguments,
            Self::Failed { .. } => CallStatus::Failed,
        }
    }

    pub fn function_name(&self) -> &str {
        match self {
            Self::NotFound { name }
            | Self::InvalidArguments { name, .. }
            | Self::Failed { name, .. } => name,
        }
    }
}

fn join_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
