use crate::marshal::MarshalError;
use std::fmt;
use thiserror::Error;

/// Failure reported by a registered callable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct FunctionError {
    message: String,
}

impl FunctionError {
    pub fn new(message: impl fmt::Display) -> Self {
        Self {
            message: message.to_string(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for FunctionError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for FunctionError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

pub type FunctionResult<T> = Result<T, FunctionError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    #[error("function not found")]
    FunctionNotFound(String),

    #[error("wrong number of arguments: expected {expected}, got {got}")]
    ArityMismatch { expected: usize, got: usize },

    #[error("error converting input {parameter}: {source}")]
    Input {
        parameter: String,
        #[source]
        source: MarshalError,
    },

    #[error("error converting output {parameter}: {source}")]
    Output {
        parameter: String,
        #[source]
        source: MarshalError,
    },

    #[error("unsupported option '{value}' for input {parameter}")]
    UnsupportedOption {
        function: String,
        parameter: String,
        value: String,
    },

    #[error("function execution failed: {0}")]
    FunctionExecution(#[source] FunctionError),

    #[error("function has no streaming output")]
    NoStreamingOutput,
}

impl DispatchError {
    /// The marshaling failure behind an input or output error.
    pub fn marshal_error(&self) -> Option<&MarshalError> {
        match self {
            DispatchError::Input { source, .. } | DispatchError::Output { source, .. } => {
                Some(source)
            }
            _ => None,
        }
    }
}

pub type CallResult<T> = Result<T, DispatchError>;
