//! Error types for llm-chat.
//!
//! A single error enum covers every failure the chat front-end can report:
//! engine startup, the engine's output stream closing early, missing
//! sessions or prompts, rejected names, interrupted turns, and the I/O and
//! serialization errors underneath persistence.

use std::error;
use std::fmt;
use std::io;
use std::sync::Arc;

/// The main error type for llm-chat.
#[derive(Clone, Debug)]
pub enum Error {
    /// The inference engine could not be started.
    ///
    /// This is the only fatal error; it is reported before the interactive
    /// loop begins.
    Startup {
        /// Human-readable error message.
        message: String,
        /// The underlying error, if the spawn itself failed.
        source: Option<Arc<io::Error>>,
    },

    /// The engine closed its output before the end-of-turn sentinel appeared.
    StreamTerminated {
        /// Human-readable error message.
        message: String,
    },

    /// A named resource (saved session or prompt file) does not exist.
    NotFound {
        /// Human-readable error message.
        message: String,
        /// Resource type.
        resource_type: Option<String>,
        /// Resource name.
        resource_id: Option<String>,
    },

    /// A caller-supplied value was rejected.
    Validation {
        /// Human-readable error message.
        message: String,
        /// Parameter that failed validation.
        param: Option<String>,
    },

    /// The turn was interrupted by the user.
    Abort {
        /// Human-readable error message.
        message: String,
    },

    /// I/O error.
    Io {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Arc<io::Error>,
    },

    /// Error during JSON serialization or deserialization.
    Serialization {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Creates a new startup error.
    pub fn startup(message: impl Into<String>, source: Option<io::Error>) -> Self {
        Error::Startup {
            message: message.into(),
            source: source.map(Arc::new),
        }
    }

    /// Creates a new stream termination error.
    pub fn stream_terminated(message: impl Into<String>) -> Self {
        Error::StreamTerminated {
            message: message.into(),
        }
    }

    /// Creates a new not found error.
    pub fn not_found(
        message: impl Into<String>,
        resource_type: Option<String>,
        resource_id: Option<String>,
    ) -> Self {
        Error::NotFound {
            message: message.into(),
            resource_type,
            resource_id,
        }
    }

    /// Creates a new validation error.
    pub fn validation(message: impl Into<String>, param: Option<String>) -> Self {
        Error::Validation {
            message: message.into(),
            param,
        }
    }

    /// Creates a new abort error.
    pub fn abort(message: impl Into<String>) -> Self {
        Error::Abort {
            message: message.into(),
        }
    }

    /// Creates a new I/O error.
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Error::Io {
            message: message.into(),
            source: Arc::new(source),
        }
    }

    /// Creates a new serialization error.
    pub fn serialization(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Serialization {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Returns true if this is a startup error.
    pub fn is_startup(&self) -> bool {
        matches!(self, Error::Startup { .. })
    }

    /// Returns true if the engine's stream ended before the sentinel.
    pub fn is_stream_terminated(&self) -> bool {
        matches!(self, Error::StreamTerminated { .. })
    }

    /// Returns true if this is a not found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Returns true if this is a validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }

    /// Returns true if the turn was interrupted.
    pub fn is_abort(&self) -> bool {
        matches!(self, Error::Abort { .. })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Startup { message, source } => {
                if let Some(source) = source {
                    write!(f, "Startup failure: {message} ({source})")
                } else {
                    write!(f, "Startup failure: {message}")
                }
            }
            Error::StreamTerminated { message } => {
                write!(f, "Engine stream terminated: {message}")
            }
            Error::NotFound {
                message,
                resource_type,
                resource_id,
            } => {
                let prefix = if let Some(resource_type) = resource_type {
                    format!("Not found ({resource_type})")
                } else {
                    "Not found".to_string()
                };

                let suffix = if let Some(resource_id) = resource_id {
                    format!(" [name: {resource_id}]")
                } else {
                    "".to_string()
                };

                write!(f, "{prefix}: {message}{suffix}")
            }
            Error::Validation { message, param } => {
                if let Some(param) = param {
                    write!(f, "Validation error: {message} (parameter: {param})")
                } else {
                    write!(f, "Validation error: {message}")
                }
            }
            Error::Abort { message } => {
                write!(f, "Interrupted: {message}")
            }
            Error::Io { message, source } => {
                write!(f, "I/O error: {message}: {source}")
            }
            Error::Serialization { message, .. } => {
                write!(f, "Serialization error: {message}")
            }
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Startup { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Serialization { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Io { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::io(err.kind().to_string(), err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::serialization(format!("JSON error: {err}"), Some(Box::new(err)))
    }
}

/// A specialized Result type for llm-chat operations.
pub type Result<T> = std::result::Result<T, Error>;
