use std::sync::Arc;

use chrono::{TimeZone, Utc};
use serde_json::json;

use crate::{
    controllers::{
        AvailabilityField, CheckOutcome, NewPoll, ProfileController, ProfileView,
        SignupController, SignupInput, SubmitOutcome,
    },
    dtos::{ApiMessage, Availability, PollLength},
    effects::{Navigator, Notifier, Route, GENERIC_ERROR},
    error::ApiError,
    gateway::{CredentialStore, PollScope},
    models::UserProfile,
    validation::FieldStatus,
};

use super::test_utils::{server_error, Call, Harness};

fn signup(harness: &Harness) -> SignupController<super::test_utils::FakeGateway> {
    SignupController::new(
        Arc::clone(&harness.gateway),
        harness.navigator.clone() as Arc<dyn Navigator>,
        harness.notifier.clone() as Arc<dyn Notifier>,
    )
}

fn fill(controller: &SignupController<super::test_utils::FakeGateway>) {
    controller.input(SignupInput::Name("Ferris Crab".into()));
    controller.input(SignupInput::Username("crab".into()));
    controller.input(SignupInput::Email("crab@rust-lang.org".into()));
    controller.input(SignupInput::Password("hunter22".into()));
}

fn available(available: bool) -> Result<Availability, ApiError> {
    Ok(Availability { available })
}

fn ferris_profile() -> UserProfile {
    UserProfile {
        id: 1,
        username: "ferris".to_string(),
        name: "Ferris".to_string(),
        joined_at: Utc.with_ymd_and_hms(2023, 5, 1, 9, 30, 0).unwrap(),
        poll_count: 3,
        vote_count: 12,
    }
}

#[tokio::test]
async fn signup_submits_after_both_checks_pass() {
    let harness = Harness::new();
    let controller = signup(&harness);
    fill(&controller);

    assert_eq!(controller.submit().await, SubmitOutcome::Invalid);

    harness.gateway.username_availability.push(available(true));
    harness.gateway.email_availability.push(available(true));
    assert_eq!(
        controller.check_availability(AvailabilityField::Username).await,
        CheckOutcome::Applied
    );
    assert_eq!(
        controller.check_availability(AvailabilityField::Email).await,
        CheckOutcome::Applied
    );

    harness.gateway.sign_up.push(Ok(ApiMessage {
        success: true,
        message: "User registered successfully".to_string(),
    }));
    assert_eq!(controller.submit().await, SubmitOutcome::Submitted);
    assert_eq!(harness.navigator.routes(), vec![Route::Login]);
    assert_eq!(
        harness.notifier.descriptions(),
        vec!["Thank you! You're successfully registered. Please Login to continue!"]
    );
    assert!(harness
        .gateway
        .calls()
        .iter()
        .any(|c| matches!(c, Call::SignUp(r) if r.username == "crab")));
}

#[tokio::test]
async fn signup_check_skips_network_for_local_errors() {
    let harness = Harness::new();
    let controller = signup(&harness);
    controller.input(SignupInput::Email("not-an-email".into()));

    assert_eq!(
        controller.check_availability(AvailabilityField::Email).await,
        CheckOutcome::LocallyInvalid
    );
    assert!(harness.gateway.calls().is_empty());
    assert_eq!(controller.snapshot().email.status, FieldStatus::Error);
}

#[tokio::test]
async fn signup_slow_check_cannot_overwrite_newer_value() {
    let harness = Harness::new();
    let controller = signup(&harness);
    fill(&controller);

    // "crab" is reported taken, but only after "crab2" was already settled
    let release_slow = harness.gateway.username_availability.push_gated(available(false));
    let slow = tokio::spawn(controller.check_availability(AvailabilityField::Username));
    tokio::task::yield_now().await;

    controller.input(SignupInput::Username("crab2".into()));
    harness.gateway.username_availability.push(available(true));
    assert_eq!(
        controller.check_availability(AvailabilityField::Username).await,
        CheckOutcome::Applied
    );

    release_slow.send(()).unwrap();
    assert_eq!(slow.await.unwrap(), CheckOutcome::Stale);

    let form = controller.snapshot();
    assert_eq!(form.username.value, "crab2");
    assert_eq!(form.username.status, FieldStatus::Success);
}

#[tokio::test]
async fn signup_failure_notifies_generically() {
    let harness = Harness::new();
    let controller = signup(&harness);
    fill(&controller);
    harness.gateway.username_availability.push(available(true));
    harness.gateway.email_availability.push(Err(server_error()));
    controller.check_availability(AvailabilityField::Username).await;
    // availability failures do not block registration
    controller.check_availability(AvailabilityField::Email).await;
    assert!(controller.snapshot().is_submittable());

    harness.gateway.sign_up.push(Err(ApiError::Status {
        status: 400,
        message: "Username is already taken!".to_string(),
    }));
    assert_eq!(controller.submit().await, SubmitOutcome::Failed);
    assert_eq!(harness.notifier.descriptions(), vec![GENERIC_ERROR]);
    assert!(harness.navigator.routes().is_empty());
}

fn filled_poll(harness: &Harness) -> NewPoll<super::test_utils::FakeGateway> {
    let mut new_poll = NewPoll::new(harness.session.clone());
    new_poll.form.set_question("Tabs or spaces?");
    new_poll.form.set_choice(0, "Tabs").unwrap();
    new_poll.form.set_choice(1, "Spaces").unwrap();
    new_poll.form.set_poll_days(2).unwrap();
    new_poll.form.set_poll_hours(6).unwrap();
    new_poll
}

#[tokio::test]
async fn new_poll_submits_and_returns_to_landing() {
    let harness = Harness::logged_in().await;
    let mut new_poll = filled_poll(&harness);
    harness
        .gateway
        .create_poll
        .push(Ok(json!({"success": true, "message": "Poll Created Successfully"})));

    assert_eq!(new_poll.submit().await, SubmitOutcome::Submitted);
    assert_eq!(harness.navigator.routes(), vec![Route::Landing]);
    assert!(new_poll.form.question().value.is_empty(), "form is reset");

    let Some(Call::CreatePoll(request)) = harness.gateway.calls().pop() else {
        panic!("expected a create poll call");
    };
    assert_eq!(request.question, "Tabs or spaces?");
    assert_eq!(request.choices.len(), 2);
    assert_eq!(request.poll_length, PollLength { days: 2, hours: 6 });
}

#[tokio::test]
async fn new_poll_blocks_invalid_form() {
    let harness = Harness::logged_in().await;
    let mut new_poll = NewPoll::new(harness.session.clone());
    new_poll.form.set_question("Only a question?");

    assert_eq!(new_poll.submit().await, SubmitOutcome::Invalid);
    assert!(harness.gateway.calls().is_empty());
}

#[tokio::test]
async fn new_poll_unauthorized_logs_out() {
    let harness = Harness::logged_in().await;
    let mut new_poll = filled_poll(&harness);
    harness.gateway.create_poll.push(Err(ApiError::Unauthorized));

    assert_eq!(new_poll.submit().await, SubmitOutcome::LoggedOut);
    assert!(!harness.session.is_authenticated());
    assert_eq!(harness.credentials.token(), None);
    assert_eq!(
        harness.notifier.descriptions(),
        vec!["You're successfully logged out."]
    );
}

#[tokio::test]
async fn new_poll_other_failure_keeps_form() {
    let harness = Harness::logged_in().await;
    let mut new_poll = filled_poll(&harness);
    harness.gateway.create_poll.push(Err(server_error()));

    assert_eq!(new_poll.submit().await, SubmitOutcome::Failed);
    assert!(harness.session.is_authenticated());
    assert_eq!(new_poll.form.question().value, "Tabs or spaces?");
    assert_eq!(harness.notifier.descriptions(), vec![GENERIC_ERROR]);
}

#[tokio::test]
async fn profile_loads_and_maps_errors() {
    let harness = Harness::new();
    let profile = ProfileController::new(harness.session.clone());
    assert_eq!(profile.view(), ProfileView::Idle);

    harness.gateway.profiles.push(Ok(ferris_profile()));
    assert_eq!(
        profile.load("ferris").await,
        ProfileView::Loaded(ferris_profile())
    );
    assert_eq!(profile.view(), ProfileView::Loaded(ferris_profile()));
    let card = profile.card(&chrono_tz::Tz::UTC).unwrap();
    assert_eq!(card.joined_label, "Joined May 1, 2023");
    assert_eq!(card.vote_count, 12);

    harness.gateway.profiles.push(Err(ApiError::NotFound));
    assert_eq!(profile.load("nobody").await, ProfileView::NotFound);

    harness.gateway.profiles.push(Err(server_error()));
    assert_eq!(profile.load("ferris").await, ProfileView::ServerError);
    assert_eq!(profile.view(), ProfileView::ServerError);
    assert!(profile.card(&chrono_tz::Tz::UTC).is_none());
}

#[tokio::test]
async fn profile_username_change_drops_stale_result() {
    let harness = Harness::new();
    let profile = ProfileController::new(harness.session.clone());

    let release_old = harness.gateway.profiles.push_gated(Ok(ferris_profile()));
    let old = tokio::spawn(profile.load("ferris"));
    tokio::task::yield_now().await;

    let mut crab = ferris_profile();
    crab.username = "crab".to_string();
    harness.gateway.profiles.push(Ok(crab.clone()));
    let newer = profile.change_username("crab").expect("username changed");
    assert_eq!(newer.await, ProfileView::Loaded(crab.clone()));

    release_old.send(()).unwrap();
    old.await.unwrap();

    assert_eq!(profile.view(), ProfileView::Loaded(crab));
    assert_eq!(profile.username().as_deref(), Some("crab"));
    assert!(profile.change_username("crab").is_none());
}

#[tokio::test]
async fn profile_tabs_are_scoped_to_the_user() {
    let harness = Harness::new();
    let profile = ProfileController::new(harness.session.clone());
    let (created, voted) = profile.poll_lists("ferris", 5);

    assert_eq!(
        created.with_state(|s| s.scope().clone()),
        PollScope::CreatedBy("ferris".into())
    );
    assert_eq!(
        voted.with_state(|s| s.scope().clone()),
        PollScope::VotedBy("ferris".into())
    );
    assert_eq!(created.with_state(|s| s.size()), 5);
}
