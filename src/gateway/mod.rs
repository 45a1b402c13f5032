use std::future::Future;

use crate::{
    dtos::{AccessToken, ApiMessage, Availability, CreatePollRequest, LoginRequest, SignupRequest, VoteRequest},
    error::ApiError,
    models::{CurrentUser, Poll, PollPage, UserProfile},
};

pub mod credentials;
pub mod http;

pub use credentials::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use http::HttpGateway;

/// Which polls a list instance fetches.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PollScope {
    All,
    CreatedBy(String),
    VotedBy(String),
}

impl PollScope {
    /// Path segments below the API base. Usernames stay a single segment.
    pub fn segments(&self) -> Vec<&str> {
        match self {
            PollScope::All => vec!["polls"],
            PollScope::CreatedBy(username) => vec!["users", username, "polls"],
            PollScope::VotedBy(username) => vec!["users", username, "votes"],
        }
    }
}

/// The REST backend as seen by the controllers.
///
/// Implementations attach the bearer token when one is persisted and map a 401
/// to [`ApiError::Unauthorized`] and a 404 to [`ApiError::NotFound`].
pub trait ApiGateway: Send + Sync + 'static {
    //?POST:: /auth/signin
    fn sign_in(
        &self,
        request: &LoginRequest,
    ) -> impl Future<Output = Result<AccessToken, ApiError>> + Send;

    //*GET:: /user/me
    /// Fails fast with [`ApiError::MissingToken`] when no token is persisted.
    fn current_user(&self) -> impl Future<Output = Result<CurrentUser, ApiError>> + Send;

    //?POST:: /auth/signup
    fn sign_up(
        &self,
        request: &SignupRequest,
    ) -> impl Future<Output = Result<ApiMessage, ApiError>> + Send;

    //*GET:: /user/checkUsernameAvailability?username=
    fn check_username_availability(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<Availability, ApiError>> + Send;

    //*GET:: /user/checkEmailAvailability?email=
    fn check_email_availability(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Availability, ApiError>> + Send;

    //*GET:: /users/{username}
    fn user_profile(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<UserProfile, ApiError>> + Send;

    //?POST:: /polls
    fn create_poll(
        &self,
        request: &CreatePollRequest,
    ) -> impl Future<Output = Result<serde_json::Value, ApiError>> + Send;

    //*GET:: /polls | /users/{username}/polls | /users/{username}/votes
    fn list_polls(
        &self,
        scope: &PollScope,
        page: u32,
        size: u32,
    ) -> impl Future<Output = Result<PollPage, ApiError>> + Send;

    //?POST:: /polls/{id}/votes
    fn cast_vote(
        &self,
        request: &VoteRequest,
    ) -> impl Future<Output = Result<Poll, ApiError>> + Send;
}
