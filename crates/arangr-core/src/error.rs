use thiserror::Error;

/// Errors raised by the assistant service and its completion client
#[derive(Error, Debug)]
pub enum AssistantError {
    /// Config file exists but could not be read or parsed
    #[error("Could not load AI config: {0}")]
    ConfigLoad(String),

    /// Config file could not be written
    #[error("Could not save AI config: {0}")]
    ConfigSave(String),

    /// Credential does not look like an OpenAI key
    #[error("OpenAI API keys should start with '{prefix}'", prefix = crate::config::CREDENTIAL_PREFIX)]
    InvalidCredentialFormat,

    /// Completion client could not be constructed
    #[error("Failed to initialize OpenAI client: {0}")]
    ClientInit(String),

    /// Network or API failure while requesting a completion
    #[error("Completion request failed: {0}")]
    CompletionRequest(String),

    /// Provider rejected the key
    #[error("Invalid or expired API key: {0}")]
    AuthFailed(String),

    /// HTTP 429 from the provider
    #[error("API rate limit exceeded, please try again later")]
    RateLimited,

    /// Response body was not a usable completion
    #[error("Malformed completion response: {0}")]
    MalformedResponse(String),
}

impl AssistantError {
    /// Corrective message shown to the user in the dialog
    pub fn user_message(&self) -> String {
        match self {
            AssistantError::InvalidCredentialFormat => format!(
                "Invalid API key. OpenAI API keys should start with '{}'.\nPlease check your key and try again.",
                crate::config::CREDENTIAL_PREFIX
            ),
            AssistantError::ClientInit(reason) => format!(
                "Failed to initialize OpenAI client ({reason}).\nPlease check your API key and try again."
            ),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for AssistantError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AssistantError::MalformedResponse(err.to_string())
        } else {
            AssistantError::CompletionRequest(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AssistantError {
    fn from(err: serde_json::Error) -> Self {
        AssistantError::MalformedResponse(err.to_string())
    }
}

/// Result type for assistant operations
pub type AssistantResult<T> = Result<T, AssistantError>;

/// Failure to pull text out of a file. Never surfaced to the user; the
/// extractor table degrades every variant to a filename stub.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// Reader for this format was not compiled in
    #[error("no reader available for {format} files")]
    ReaderUnavailable { format: &'static str },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Reader is present but the file could not be parsed
    #[error("could not parse document: {0}")]
    Malformed(String),
}
