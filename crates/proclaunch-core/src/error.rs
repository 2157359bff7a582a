//! Error taxonomy for launch operations.

use thiserror::Error;

use crate::located::LocatedError;
use crate::params::LaunchParam;

/// Result type alias for launch operations.
pub type Result<T> = std::result::Result<T, LaunchError>;

/// Every way a launch attempt can fail.
///
/// Capability-negotiation and conversion failures are resolved before any
/// native side effect occurs; native failures always arrive with partial
/// native state already unwound.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// A native call failed; carries the exact origin and platform code.
    #[error(transparent)]
    Native(#[from] LocatedError),

    /// No registered strategy covers the requested parameter combination.
    /// Carries no platform code: nothing native was attempted.
    #[error("no registered strategy supports the requested parameter set {requested:?}")]
    UnsupportedParameterSet { requested: Vec<LaunchParam> },

    /// Malformed input detected in this process, before the OS was asked.
    #[error("conversion failed for {what}: {message}")]
    Conversion { what: &'static str, message: String },

    /// The request supplies no usable application path.
    #[error("launch request does not supply an application path")]
    MissingApplicationPath,

    /// A portable spawn failed.
    #[error("process spawn failed: {0}")]
    Spawn(#[from] std::io::Error),

    /// Other error.
    #[error("other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl LaunchError {
    /// Check if this error is a caller configuration problem, reported
    /// before any native call was attempted.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            LaunchError::UnsupportedParameterSet { .. }
                | LaunchError::Conversion { .. }
                | LaunchError::MissingApplicationPath
        )
    }

    /// Check if this error came back from a native call.
    pub fn is_native(&self) -> bool {
        matches!(self, LaunchError::Native(_))
    }

    /// The located error inside, if this is a native failure.
    pub fn located(&self) -> Option<&LocatedError> {
        match self {
            LaunchError::Native(error) => Some(error),
            _ => None,
        }
    }
}
