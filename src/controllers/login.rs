use tracing::warn;

use super::{session::Session, SubmitOutcome};
use crate::{
    dtos::LoginRequest,
    effects::{Notice, GENERIC_ERROR},
    error::ApiError,
    gateway::ApiGateway,
    validation::{validate_required, FormField},
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoginForm {
    pub username_or_email: FormField,
    pub password: FormField,
}

impl LoginForm {
    pub fn set_username_or_email(&mut self, value: impl Into<String>) {
        let value = value.into();
        let validation = validate_required(&value, "Please input your username or email!");
        self.username_or_email = FormField::new(value, validation);
    }

    pub fn set_password(&mut self, value: impl Into<String>) {
        let value = value.into();
        let validation = validate_required(&value, "Please input your Password!");
        self.password = FormField::new(value, validation);
    }

    /// Re-validates both fields, so untouched fields surface their error too.
    pub fn validate(&mut self) -> Option<LoginRequest> {
        self.set_username_or_email(self.username_or_email.value.clone());
        self.set_password(self.password.value.clone());
        if self.username_or_email.is_success() && self.password.is_success() {
            Some(LoginRequest {
                username_or_email: self.username_or_email.value.clone(),
                password: self.password.value.clone(),
            })
        } else {
            None
        }
    }
}

pub struct Login<G: ApiGateway> {
    pub form: LoginForm,
    session: Session<G>,
}

impl<G: ApiGateway> Login<G> {
    pub fn new(session: Session<G>) -> Self {
        Login {
            form: LoginForm::default(),
            session,
        }
    }

    pub async fn submit(&mut self) -> SubmitOutcome {
        let Some(request) = self.form.validate() else {
            return SubmitOutcome::Invalid;
        };

        match self.session.sign_in(&request).await {
            Ok(()) => SubmitOutcome::Submitted,
            Err(ApiError::Unauthorized) => {
                self.session.notifier().notify(Notice::error(
                    "Your Username or Password is incorrect. Please try again!",
                ));
                SubmitOutcome::Failed
            }
            Err(e) => {
                warn!("Sign in failed: {}", e);
                self.session.notifier().notify(Notice::error(GENERIC_ERROR));
                SubmitOutcome::Failed
            }
        }
    }
}
