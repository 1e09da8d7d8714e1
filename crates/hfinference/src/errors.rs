use thiserror::Error;

/// Failures on the way to (or back from) the inference endpoint.
///
/// The `Display` text is what ends up in front of the user, so every variant
/// reads as a complete sentence.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InferenceError {
    #[error("The request timed out. Please try again.")]
    Timeout,

    /// Connection failures and non-2xx statuses.
    #[error("Error contacting the API: {0}")]
    Transport(String),

    /// A 2xx reply whose body could not be read as JSON.
    #[error("Unexpected error: {0}")]
    UnexpectedBody(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            InferenceError::Timeout.to_string(),
            "The request timed out. Please try again."
        );
        assert_eq!(
            InferenceError::Transport("connection refused".to_string()).to_string(),
            "Error contacting the API: connection refused"
        );
        assert_eq!(
            InferenceError::UnexpectedBody("expected value at line 1 column 1".to_string())
                .to_string(),
            "Unexpected error: expected value at line 1 column 1"
        );
    }
}
