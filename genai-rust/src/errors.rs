use thiserror::Error;

#[derive(Error, Debug)]
pub enum LanguageModelError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// The request could not be sent or its body could not be read. The
    /// request URL is stripped so credentials never reach a message.
    #[error("Transport error: {0}")]
    Transport(reqwest::Error),
    #[error("Status error: {1} (Status {0})")]
    StatusCode(reqwest::StatusCode, String),
    /// The provider answered with something unusable, such as a reply
    /// without candidates.
    #[error("Invariant from {0}: {1}")]
    Invariant(&'static str, String),
    #[error("Refusal: {0}")]
    Refusal(String),
}

impl From<reqwest::Error> for LanguageModelError {
    fn from(error: reqwest::Error) -> Self {
        Self::Transport(error.without_url())
    }
}

impl LanguageModelError {
    /// Whether the provider rejected the request because of its credentials.
    #[must_use]
    pub fn is_auth_error(&self) -> bool {
        match self {
            Self::StatusCode(status, body) => {
                status.as_u16() == 401
                    || status.as_u16() == 403
                    || (status.as_u16() == 400 && body.contains("API_KEY_INVALID"))
            }
            _ => false,
        }
    }
}

pub type LanguageModelResult<T> = Result<T, LanguageModelError>;

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn credential_rejections_are_auth_errors() {
        let invalid_key = LanguageModelError::StatusCode(
            StatusCode::BAD_REQUEST,
            r#"{"error":{"details":[{"reason":"API_KEY_INVALID"}]}}"#.to_string(),
        );
        let forbidden = LanguageModelError::StatusCode(StatusCode::FORBIDDEN, String::new());
        let bad_request =
            LanguageModelError::StatusCode(StatusCode::BAD_REQUEST, "bad schema".to_string());

        assert!(invalid_key.is_auth_error());
        assert!(forbidden.is_auth_error());
        assert!(!bad_request.is_auth_error());
        assert!(!LanguageModelError::Refusal("SAFETY".to_string()).is_auth_error());
    }
}
