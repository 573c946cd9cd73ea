//! Unified error handling for the geofencing crate
//!
//! Each subsystem owns a focused error type; [`Error`] wraps them all so
//! callers crossing module boundaries can use a single type.
//!
//! # Architecture
//!
//! - [`GeofenceErrorTrait`] - Common interface implemented by the unified error
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors
//!
//! # Usage
//!
//! ```rust,ignore
//! use geofencing::error::{Error, GeofenceErrorTrait};
//!
//! fn handle_error(err: Error) {
//!     if err.is_recoverable() {
//!         tracing::warn!(category = ?err.category(), "Retrying: {err}");
//!     } else {
//!         tracing::error!("Fatal error: {err}");
//!     }
//! }
//! ```

use std::io;
use thiserror::Error;

pub use crate::channel::ChannelError;
pub use crate::coordinator::FailureKind;
pub use crate::models::SpecError;
pub use crate::provider::ProviderError;
pub use crate::storage::StorageError;

/// Common trait for geofencing error types
pub trait GeofenceErrorTrait: std::error::Error {
    /// Check if retrying the same request could succeed
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Location permission missing
    Permission,
    /// Provider refused, failed or timed out
    Provider,
    /// Persistent cache errors
    Storage,
    /// Malformed arguments or stored data
    Parsing,
    /// Configuration and validation errors
    Config,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    pub fn description(&self) -> &'static str {
        match self {
            Self::Permission => "permission error",
            Self::Provider => "provider error",
            Self::Storage => "storage error",
            Self::Parsing => "parsing error",
            Self::Config => "configuration error",
            Self::Other => "other error",
        }
    }
}

/// Unified error type for the geofencing crate
#[derive(Error, Debug)]
pub enum Error {
    /// Terminal coordinator failure
    #[error("Registration error: {0}")]
    Registration(#[from] FailureKind),

    /// Single provider failure
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Storage errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Spec decoding errors
    #[error("Spec error: {0}")]
    Spec(#[from] SpecError),

    /// Inbound call decoding errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl GeofenceErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Registration(kind) => matches!(
                kind,
                FailureKind::ProviderRejected { .. } | FailureKind::Timeout { .. }
            ),
            Self::Provider(_) => true,
            Self::Storage(StorageError::Unavailable(_)) => true,
            Self::Storage(_) => false,
            Self::Spec(_) | Self::Channel(_) => false,
            Self::Io(_) => true,
            Self::Config(_) => false,
            Self::Other { .. } => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Registration(kind) => match kind {
                FailureKind::PermissionDenied { .. } => ErrorCategory::Permission,
                FailureKind::ProviderRejected { .. } | FailureKind::Timeout { .. } => {
                    ErrorCategory::Provider
                }
                FailureKind::NoProviders => ErrorCategory::Config,
                FailureKind::Storage(_) => ErrorCategory::Storage,
            },
            Self::Provider(_) => ErrorCategory::Provider,
            Self::Storage(_) | Self::Io(_) => ErrorCategory::Storage,
            Self::Spec(_) | Self::Channel(_) => ErrorCategory::Parsing,
            Self::Config(_) => ErrorCategory::Config,
            Self::Other { .. } => ErrorCategory::Other,
        }
    }
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other {
            context: context.into(),
            source: None,
        }
    }

    /// Create a generic error with context and source
    pub fn with_source(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Other {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other {
            context: err.to_string(),
            source: None,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
