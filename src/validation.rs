//! Field validation for the poll creation, signup and login forms.
//!
//! Every validator is a pure function from the raw field text to a [`Validation`].
//! Lengths are counted in characters, not bytes.

use std::sync::LazyLock;

use regex::Regex;

pub const POLL_QUESTION_MAX_LENGTH: usize = 140;
pub const POLL_CHOICE_MAX_LENGTH: usize = 40;
pub const MAX_CHOICES: usize = 6;

pub const NAME_MIN_LENGTH: usize = 4;
pub const NAME_MAX_LENGTH: usize = 40;
pub const USERNAME_MIN_LENGTH: usize = 3;
pub const USERNAME_MAX_LENGTH: usize = 15;
pub const EMAIL_MAX_LENGTH: usize = 40;
pub const PASSWORD_MIN_LENGTH: usize = 6;
pub const PASSWORD_MAX_LENGTH: usize = 20;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^@ ]+@[^@ ]+\.[^@ ]+").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldStatus {
    /// Nothing decided yet, e.g. an email that passed the local checks but
    /// has not been checked for availability.
    #[default]
    Unvalidated,
    Validating,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub status: FieldStatus,
    pub message: Option<String>,
}

impl Validation {
    pub fn success() -> Self {
        Validation {
            status: FieldStatus::Success,
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Validation {
            status: FieldStatus::Error,
            message: Some(message.into()),
        }
    }

    pub fn unvalidated() -> Self {
        Validation {
            status: FieldStatus::Unvalidated,
            message: None,
        }
    }

    pub fn validating() -> Self {
        Validation {
            status: FieldStatus::Validating,
            message: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == FieldStatus::Error
    }
}

/// Raw input text plus its latest validation result.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormField {
    pub value: String,
    pub status: FieldStatus,
    pub message: Option<String>,
}

impl FormField {
    pub fn new(value: impl Into<String>, validation: Validation) -> Self {
        FormField {
            value: value.into(),
            status: validation.status,
            message: validation.message,
        }
    }

    pub fn apply(&mut self, validation: Validation) {
        self.status = validation.status;
        self.message = validation.message;
    }

    pub fn is_success(&self) -> bool {
        self.status == FieldStatus::Success
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

pub fn validate_question(text: &str) -> Validation {
    let len = char_len(text);
    if len == 0 {
        Validation::error("Please enter your question!")
    } else if len > POLL_QUESTION_MAX_LENGTH {
        Validation::error(format!(
            "Question is too long (Maximum {POLL_QUESTION_MAX_LENGTH} characters allowed)"
        ))
    } else {
        Validation::success()
    }
}

pub fn validate_choice(text: &str) -> Validation {
    let len = char_len(text);
    if len == 0 {
        Validation::error("Please enter a choice!")
    } else if len > POLL_CHOICE_MAX_LENGTH {
        Validation::error(format!(
            "Choice is too long (Maximum {POLL_CHOICE_MAX_LENGTH} characters allowed)"
        ))
    } else {
        Validation::success()
    }
}

fn validate_length(label: &str, text: &str, min: usize, max: usize) -> Option<Validation> {
    let len = char_len(text);
    if len < min {
        Some(Validation::error(format!(
            "{label} is too short (Minimum {min} characters needed.)"
        )))
    } else if len > max {
        Some(Validation::error(format!(
            "{label} is too long (Maximum {max} characters allowed.)"
        )))
    } else {
        None
    }
}

pub fn validate_name(name: &str) -> Validation {
    validate_length("Name", name, NAME_MIN_LENGTH, NAME_MAX_LENGTH).unwrap_or_else(Validation::success)
}

pub fn validate_password(password: &str) -> Validation {
    validate_length("Password", password, PASSWORD_MIN_LENGTH, PASSWORD_MAX_LENGTH)
        .unwrap_or_else(Validation::success)
}

/// Length check only. A passing username stays unvalidated until its
/// availability check completes.
pub fn validate_username(username: &str) -> Validation {
    validate_length("Username", username, USERNAME_MIN_LENGTH, USERNAME_MAX_LENGTH)
        .unwrap_or_else(Validation::unvalidated)
}

/// Format and length check only. A passing email stays unvalidated until its
/// availability check completes.
pub fn validate_email(email: &str) -> Validation {
    if email.is_empty() {
        return Validation::error("Email may not be empty");
    }
    if !EMAIL_REGEX.is_match(email) {
        return Validation::error("Email not valid");
    }
    if char_len(email) > EMAIL_MAX_LENGTH {
        return Validation::error(format!(
            "Email is too long (Maximum {EMAIL_MAX_LENGTH} characters allowed)"
        ));
    }
    Validation::unvalidated()
}

/// Non-empty check used by the login form.
pub fn validate_required(text: &str, message: &str) -> Validation {
    if text.is_empty() {
        Validation::error(message)
    } else {
        Validation::success()
    }
}
