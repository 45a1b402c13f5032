use std::{
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
};

use tracing::{debug, info, warn};

use super::SubmitOutcome;
use crate::{
    dtos::SignupRequest,
    effects::{Navigator, Notice, Notifier, Route, GENERIC_ERROR},
    error::ApiError,
    gateway::ApiGateway,
    validation::{
        validate_email, validate_name, validate_password, validate_username, FormField, Validation,
    },
};

/// One keystroke-level update to a signup field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignupInput {
    Name(String),
    Username(String),
    Email(String),
    Password(String),
}

/// Fields whose final status depends on a server-side availability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvailabilityField {
    Username,
    Email,
}

/// An availability check issued for a field value under a field generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityCheck {
    pub field: AvailabilityField,
    pub value: String,
    generation: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignupForm {
    pub name: FormField,
    pub username: FormField,
    pub email: FormField,
    pub password: FormField,
    username_generation: u64,
    email_generation: u64,
}

impl SignupForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the new text and re-runs the local checks. For username and email
    /// this also supersedes any outstanding availability check.
    pub fn input(&mut self, input: SignupInput) {
        match input {
            SignupInput::Name(value) => {
                let validation = validate_name(&value);
                self.name = FormField::new(value, validation);
            }
            SignupInput::Password(value) => {
                let validation = validate_password(&value);
                self.password = FormField::new(value, validation);
            }
            SignupInput::Username(value) => {
                self.username_generation += 1;
                let validation = validate_username(&value);
                self.username = FormField::new(value, validation);
            }
            SignupInput::Email(value) => {
                self.email_generation += 1;
                let validation = validate_email(&value);
                self.email = FormField::new(value, validation);
            }
        }
    }

    fn field_mut(&mut self, field: AvailabilityField) -> (&mut FormField, &mut u64) {
        match field {
            AvailabilityField::Username => (&mut self.username, &mut self.username_generation),
            AvailabilityField::Email => (&mut self.email, &mut self.email_generation),
        }
    }

    /// Starts an availability check for the current value of `field`.
    ///
    /// If the local checks fail the field goes straight to error and `None` is
    /// returned. Otherwise the field moves to validating.
    pub fn begin_availability_check(&mut self, field: AvailabilityField) -> Option<AvailabilityCheck> {
        let (form_field, generation) = self.field_mut(field);
        let local = match field {
            AvailabilityField::Username => validate_username(&form_field.value),
            AvailabilityField::Email => validate_email(&form_field.value),
        };
        if local.is_error() {
            form_field.apply(local);
            return None;
        }

        *generation += 1;
        form_field.apply(Validation::validating());
        Some(AvailabilityCheck {
            field,
            value: form_field.value.clone(),
            generation: *generation,
        })
    }

    /// Applies a check result if the check is still the latest for its field.
    /// A transport failure counts as available.
    pub fn complete_availability_check(
        &mut self,
        check: &AvailabilityCheck,
        result: Result<bool, &ApiError>,
    ) -> bool {
        let (form_field, generation) = self.field_mut(check.field);
        if *generation != check.generation {
            return false;
        }

        let validation = match result {
            Ok(true) => Validation::success(),
            Ok(false) => Validation::error(match check.field {
                AvailabilityField::Username => "This username is already taken",
                AvailabilityField::Email => "This email is already registered",
            }),
            Err(e) => {
                warn!("Availability check for {:?} failed, assuming available: {}", check.field, e);
                Validation::success()
            }
        };
        form_field.apply(validation);
        true
    }

    /// Submission stays blocked until every field reports success.
    pub fn is_submittable(&self) -> bool {
        self.name.is_success()
            && self.username.is_success()
            && self.email.is_success()
            && self.password.is_success()
    }

    pub fn to_request(&self) -> SignupRequest {
        SignupRequest {
            name: self.name.value.clone(),
            email: self.email.value.clone(),
            username: self.username.value.clone(),
            password: self.password.value.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    Applied,
    /// The local checks failed, no request was made.
    LocallyInvalid,
    /// A newer check or keystroke superseded this one, or the form is gone.
    Stale,
}

/// Drives a [`SignupForm`] against the gateway.
pub struct SignupController<G: ApiGateway> {
    form: Arc<Mutex<SignupForm>>,
    gateway: Arc<G>,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
}

fn lock(form: &Mutex<SignupForm>) -> MutexGuard<'_, SignupForm> {
    form.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<G: ApiGateway> SignupController<G> {
    pub fn new(gateway: Arc<G>, navigator: Arc<dyn Navigator>, notifier: Arc<dyn Notifier>) -> Self {
        SignupController {
            form: Arc::new(Mutex::new(SignupForm::new())),
            gateway,
            navigator,
            notifier,
        }
    }

    pub fn snapshot(&self) -> SignupForm {
        lock(&self.form).clone()
    }

    pub fn input(&self, input: SignupInput) {
        lock(&self.form).input(input);
    }

    /// Runs on blur of the username or email field.
    pub fn check_availability(
        &self,
        field: AvailabilityField,
    ) -> impl Future<Output = CheckOutcome> + Send + 'static {
        let check = lock(&self.form).begin_availability_check(field);
        let form = Arc::downgrade(&self.form);
        let gateway = Arc::clone(&self.gateway);
        async move {
            let Some(check) = check else {
                return CheckOutcome::LocallyInvalid;
            };
            let result = match check.field {
                AvailabilityField::Username => gateway.check_username_availability(&check.value).await,
                AvailabilityField::Email => gateway.check_email_availability(&check.value).await,
            };
            settle_check(form, &check, result)
        }
    }

    pub async fn submit(&self) -> SubmitOutcome {
        let request = {
            let form = lock(&self.form);
            if !form.is_submittable() {
                return SubmitOutcome::Invalid;
            }
            form.to_request()
        };

        match self.gateway.sign_up(&request).await {
            Ok(_) => {
                info!("Registered {}", request.username);
                self.notifier.notify(Notice::success(
                    "Thank you! You're successfully registered. Please Login to continue!",
                ));
                self.navigator.navigate(Route::Login);
                SubmitOutcome::Submitted
            }
            Err(e) => {
                warn!("Signup failed: {}", e);
                self.notifier.notify(Notice::error(GENERIC_ERROR));
                SubmitOutcome::Failed
            }
        }
    }
}

fn settle_check(
    form: Weak<Mutex<SignupForm>>,
    check: &AvailabilityCheck,
    result: Result<crate::dtos::Availability, ApiError>,
) -> CheckOutcome {
    let Some(form) = form.upgrade() else {
        return CheckOutcome::Stale;
    };
    let applied = lock(&form).complete_availability_check(
        check,
        result.as_ref().map(|a| a.available),
    );
    if applied {
        CheckOutcome::Applied
    } else {
        debug!("Discarded stale availability result for {:?}", check.field);
        CheckOutcome::Stale
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::FieldStatus;

    fn filled_form() -> SignupForm {
        let mut form = SignupForm::new();
        form.input(SignupInput::Name("Ferris Crab".into()));
        form.input(SignupInput::Username("ferris".into()));
        form.input(SignupInput::Email("ferris@rust-lang.org".into()));
        form.input(SignupInput::Password("hunter22".into()));
        form
    }

    #[test]
    fn keystrokes_run_local_checks_only() {
        let form = filled_form();
        assert_eq!(form.name.status, FieldStatus::Success);
        assert_eq!(form.password.status, FieldStatus::Success);
        assert_eq!(form.username.status, FieldStatus::Unvalidated);
        assert_eq!(form.email.status, FieldStatus::Unvalidated);
        assert!(!form.is_submittable());
    }

    #[test]
    fn invalid_value_short_circuits_without_check() {
        let mut form = SignupForm::new();
        form.input(SignupInput::Username("ab".into()));
        assert!(form.begin_availability_check(AvailabilityField::Username).is_none());
        assert_eq!(form.username.status, FieldStatus::Error);
    }

    #[test]
    fn check_transitions_validating_then_success() {
        let mut form = filled_form();
        let username = form.begin_availability_check(AvailabilityField::Username).unwrap();
        assert_eq!(form.username.status, FieldStatus::Validating);
        assert!(form.complete_availability_check(&username, Ok(true)));
        assert_eq!(form.username.status, FieldStatus::Success);

        let email = form.begin_availability_check(AvailabilityField::Email).unwrap();
        assert!(form.complete_availability_check(&email, Ok(true)));
        assert!(form.is_submittable());
        assert_eq!(form.to_request().email, "ferris@rust-lang.org");
    }

    #[test]
    fn taken_value_is_an_error() {
        let mut form = filled_form();
        let check = form.begin_availability_check(AvailabilityField::Email).unwrap();
        form.complete_availability_check(&check, Ok(false));
        assert_eq!(form.email.status, FieldStatus::Error);
        assert_eq!(
            form.email.message.as_deref(),
            Some("This email is already registered")
        );
    }

    #[test]
    fn transport_failure_assumes_available() {
        let mut form = filled_form();
        let check = form.begin_availability_check(AvailabilityField::Username).unwrap();
        let err = ApiError::Status {
            status: 503,
            message: "unavailable".into(),
        };
        assert!(form.complete_availability_check(&check, Err(&err)));
        assert_eq!(form.username.status, FieldStatus::Success);
    }

    #[test]
    fn only_latest_check_may_settle_the_field() {
        let mut form = filled_form();
        let first = form.begin_availability_check(AvailabilityField::Username).unwrap();
        form.input(SignupInput::Username("ferris2".into()));
        let second = form.begin_availability_check(AvailabilityField::Username).unwrap();

        // the newer request answers first
        assert!(form.complete_availability_check(&second, Ok(true)));
        // the slower, older one must not overwrite it
        assert!(!form.complete_availability_check(&first, Ok(false)));
        assert_eq!(form.username.status, FieldStatus::Success);
        assert_eq!(form.username.value, "ferris2");
    }

    #[test]
    fn keystroke_supersedes_outstanding_check() {
        let mut form = filled_form();
        let check = form.begin_availability_check(AvailabilityField::Email).unwrap();
        form.input(SignupInput::Email("crab@rust-lang.org".into()));
        assert!(!form.complete_availability_check(&check, Ok(true)));
        assert_eq!(form.email.status, FieldStatus::Unvalidated);
    }

    #[test]
    fn fields_have_independent_generations() {
        let mut form = filled_form();
        let username = form.begin_availability_check(AvailabilityField::Username).unwrap();
        let email = form.begin_availability_check(AvailabilityField::Email).unwrap();
        assert!(form.complete_availability_check(&email, Ok(true)));
        assert!(form.complete_availability_check(&username, Ok(true)));
        assert!(form.is_submittable());
    }
}
