use thiserror::Error;

/// Failures surfaced by the API gateway.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("No access token available")]
    MissingToken,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Resource not found")]
    NotFound,

    #[error("Server responded with {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid response payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid request url: {0}")]
    InvalidUrl(String),

    #[error("Credential store error: {0}")]
    Credentials(#[from] CredentialError),
}

impl ApiError {
    /// 401-class failures are the universal trigger for a forced logout.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized => Some(401),
            ApiError::NotFound => Some(404),
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Local rejections raised by poll list transitions. None of these reach the network.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PollsError {
    #[error("No poll at position {0}")]
    PollNotFound(usize),

    #[error("Invalid poll option")]
    InvalidPollOption,

    #[error("User has already voted on this poll")]
    AlreadyVoted,

    #[error("Poll has already ended")]
    PollEnded,

    #[error("No choice selected")]
    NoChoiceSelected,

    #[error("A vote for this poll is already in flight")]
    VoteInFlight,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("A poll can have at most {0} choices")]
    TooManyChoices(usize),

    #[error("The first two choices cannot be removed")]
    RequiredChoice,

    #[error("No choice at index {0}")]
    ChoiceNotFound(usize),

    #[error("Invalid poll length: {0}")]
    InvalidPollLength(String),

    #[error("Form has invalid fields")]
    Invalid,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {reason}")]
    InvalidVar { name: &'static str, reason: String },
}

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Credential file error: {0}")]
    Io(#[from] std::io::Error),
}
