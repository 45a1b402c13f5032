use tracing::{info, warn};

use super::{session::Session, SubmitOutcome};
use crate::{
    dtos::{ChoiceRequest, CreatePollRequest, PollLength},
    effects::{Notice, Route, GENERIC_ERROR},
    error::FormError,
    gateway::ApiGateway,
    validation::{validate_choice, validate_question, FormField, MAX_CHOICES},
};

pub const MAX_POLL_DAYS: u32 = 7;
pub const MAX_POLL_HOURS: u32 = 23;
const REQUIRED_CHOICES: usize = 2;

/// Poll creation form: a question, 2 to 6 choices and a poll length.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPollForm {
    question: FormField,
    choices: Vec<FormField>,
    poll_length: PollLength,
}

impl Default for NewPollForm {
    fn default() -> Self {
        NewPollForm {
            question: FormField::default(),
            choices: vec![FormField::default(); REQUIRED_CHOICES],
            poll_length: PollLength::default(),
        }
    }
}

impl NewPollForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn question(&self) -> &FormField {
        &self.question
    }

    pub fn choices(&self) -> &[FormField] {
        &self.choices
    }

    pub fn poll_length(&self) -> PollLength {
        self.poll_length
    }

    pub fn set_question(&mut self, text: impl Into<String>) {
        let text = text.into();
        let validation = validate_question(&text);
        self.question = FormField::new(text, validation);
    }

    pub fn set_choice(&mut self, index: usize, text: impl Into<String>) -> Result<(), FormError> {
        let slot = self
            .choices
            .get_mut(index)
            .ok_or(FormError::ChoiceNotFound(index))?;
        let text = text.into();
        let validation = validate_choice(&text);
        *slot = FormField::new(text, validation);
        Ok(())
    }

    pub fn can_add_choice(&self) -> bool {
        self.choices.len() < MAX_CHOICES
    }

    pub fn add_choice(&mut self) -> Result<(), FormError> {
        if !self.can_add_choice() {
            return Err(FormError::TooManyChoices(MAX_CHOICES));
        }
        self.choices.push(FormField::default());
        Ok(())
    }

    /// Only the optional choices past the first two can be removed.
    pub fn remove_choice(&mut self, index: usize) -> Result<(), FormError> {
        if index < REQUIRED_CHOICES {
            return Err(FormError::RequiredChoice);
        }
        if index >= self.choices.len() {
            return Err(FormError::ChoiceNotFound(index));
        }
        self.choices.remove(index);
        Ok(())
    }

    pub fn set_poll_days(&mut self, days: u32) -> Result<(), FormError> {
        if days > MAX_POLL_DAYS {
            return Err(FormError::InvalidPollLength(format!(
                "{days} days (maximum {MAX_POLL_DAYS})"
            )));
        }
        self.poll_length.days = days;
        Ok(())
    }

    pub fn set_poll_hours(&mut self, hours: u32) -> Result<(), FormError> {
        if hours > MAX_POLL_HOURS {
            return Err(FormError::InvalidPollLength(format!(
                "{hours} hours (maximum {MAX_POLL_HOURS})"
            )));
        }
        self.poll_length.hours = hours;
        Ok(())
    }

    pub fn is_invalid(&self) -> bool {
        !self.question.is_success() || self.choices.iter().any(|c| !c.is_success())
    }

    pub fn to_request(&self) -> Result<CreatePollRequest, FormError> {
        if self.is_invalid() {
            return Err(FormError::Invalid);
        }
        Ok(CreatePollRequest {
            question: self.question.value.clone(),
            choices: self
                .choices
                .iter()
                .map(|c| ChoiceRequest {
                    text: c.value.clone(),
                })
                .collect(),
            poll_length: self.poll_length,
        })
    }
}

/// Owns a [`NewPollForm`] and submits it on behalf of the logged-in user.
pub struct NewPoll<G: ApiGateway> {
    pub form: NewPollForm,
    session: Session<G>,
}

impl<G: ApiGateway> NewPoll<G> {
    pub fn new(session: Session<G>) -> Self {
        NewPoll {
            form: NewPollForm::new(),
            session,
        }
    }

    pub async fn submit(&mut self) -> SubmitOutcome {
        let request = match self.form.to_request() {
            Ok(request) => request,
            Err(_) => return SubmitOutcome::Invalid,
        };

        match self.session.gateway().create_poll(&request).await {
            Ok(_) => {
                info!("Poll created: {}", request.question);
                self.form = NewPollForm::new();
                self.session.navigator().navigate(Route::Landing);
                SubmitOutcome::Submitted
            }
            Err(e) if e.is_unauthorized() => {
                warn!("Poll creation unauthorized, logging out");
                self.session.logout();
                SubmitOutcome::LoggedOut
            }
            Err(e) => {
                warn!("Poll creation failed: {}", e);
                self.session.notifier().notify(Notice::error(GENERIC_ERROR));
                SubmitOutcome::Failed
            }
        }
    }
}
