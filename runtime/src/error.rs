// Copyright 2026 Newsparse Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error taxonomy for the extraction engine.
//!
//! Pipelines retry internally and surface exactly one of these once their
//! attempts are spent. Missing article fields are never errors.

/// All errors that can leave an extraction pipeline.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// Domain is pre-classified as unparsable. Terminal, not a fault.
    #[error("domain blocked: {reason}")]
    PolicyBlock {
        reason: String,
        suggestion: Option<String>,
    },

    /// Network, HTTP status, or TLS failure after all static attempts.
    #[error("{message}")]
    Fetch { message: String, attempts: u32 },

    /// Browser launch, navigation, or timeout failure after all render attempts.
    #[error("{message}")]
    Render { message: String, attempts: u32 },

    /// Webhook delivery failed. Logged only, never returned to the caller.
    #[error("callback delivery failed: {0}")]
    Callback(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ExtractError {
    /// Attempts consumed before the error surfaced (at least 1).
    pub fn attempts(&self) -> u32 {
        match self {
            ExtractError::Fetch { attempts, .. } | ExtractError::Render { attempts, .. } => {
                (*attempts).max(1)
            }
            _ => 1,
        }
    }

    /// Stable code for API consumers.
    pub fn code(&self) -> &'static str {
        match self {
            ExtractError::PolicyBlock { .. } => "E_POLICY_BLOCK",
            ExtractError::Fetch { .. } => "E_FETCH",
            ExtractError::Render { .. } => "E_RENDER",
            ExtractError::Callback(_) => "E_CALLBACK",
            ExtractError::InvalidRequest(_) => "E_INVALID_REQUEST",
        }
    }
}

pub type ExtractResult<T> = Result<T, ExtractError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempts_never_zero() {
        let e = ExtractError::Fetch {
            message: "boom".into(),
            attempts: 0,
        };
        assert_eq!(e.attempts(), 1);
        let e = ExtractError::Render {
            message: "boom".into(),
            attempts: 2,
        };
        assert_eq!(e.attempts(), 2);
        assert_eq!(e.code(), "E_RENDER");
    }
}
