use std::sync::Arc;

use reqwest::{
    header::{HeaderValue, AUTHORIZATION},
    Client, Method, RequestBuilder, StatusCode, Url,
};
use serde::de::DeserializeOwned;
use tracing::{debug, warn, Instrument};
use uuid::Uuid;

use super::{ApiGateway, CredentialStore, PollScope};
use crate::{
    dtos::{
        AccessToken, ApiMessage, Availability, CreatePollRequest, LoginRequest, SignupRequest,
        VoteRequest,
    },
    error::ApiError,
    models::{CurrentUser, Poll, PollPage, UserProfile},
};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// [`ApiGateway`] over plain REST + JSON.
#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: Url,
    credentials: Arc<dyn CredentialStore>,
}

impl HttpGateway {
    pub fn new(
        base_url: impl Into<String>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self, ApiError> {
        let raw = base_url.into();
        let base_url = Url::parse(raw.trim_end_matches('/'))
            .map_err(|e| ApiError::InvalidUrl(format!("{raw}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(format!("{raw}: not a base url")));
        }

        let client = Client::builder().build()?;
        Ok(HttpGateway {
            client,
            base_url,
            credentials,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Appends `segments` to the base url, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url, request_id: &Uuid) -> RequestBuilder {
        let mut builder = self
            .client
            .request(method, url)
            .header(REQUEST_ID_HEADER, request_id.to_string());

        if let Some(token) = self.credentials.token() {
            match HeaderValue::from_str(&format!("Bearer {token}")) {
                Ok(value) => builder = builder.header(AUTHORIZATION, value),
                Err(e) => warn!("Stored token is not a valid header value: {}", e),
            }
        }
        builder
    }

    async fn execute<T, F>(&self, method: Method, segments: &[&str], configure: F) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        F: FnOnce(RequestBuilder) -> RequestBuilder,
    {
        let url = self.endpoint(segments)?;
        let request_id = Uuid::new_v4();
        let span = tracing::debug_span!("api_request", %method, path = url.path(), %request_id);
        let builder = configure(self.request(method, url, &request_id));

        async move {
            let response = builder.send().await?;
            let status = response.status();
            debug!(status = status.as_u16(), "Response received");

            match status {
                StatusCode::UNAUTHORIZED => return Err(ApiError::Unauthorized),
                StatusCode::NOT_FOUND => return Err(ApiError::NotFound),
                s if !s.is_success() => {
                    let body = response.text().await.unwrap_or_default();
                    let message = serde_json::from_str::<ApiMessage>(&body)
                        .map(|m| m.message)
                        .unwrap_or(body);
                    return Err(ApiError::Status {
                        status: s.as_u16(),
                        message,
                    });
                }
                _ => {}
            }

            let bytes = response.bytes().await?;
            Ok(serde_json::from_slice(&bytes)?)
        }
        .instrument(span)
        .await
    }
}

impl ApiGateway for HttpGateway {
    async fn sign_in(&self, request: &LoginRequest) -> Result<AccessToken, ApiError> {
        self.execute(Method::POST, &["auth", "signin"], |b| b.json(request))
            .await
    }

    async fn current_user(&self) -> Result<CurrentUser, ApiError> {
        if self.credentials.token().is_none() {
            return Err(ApiError::MissingToken);
        }
        self.execute(Method::GET, &["user", "me"], |b| b).await
    }

    async fn sign_up(&self, request: &SignupRequest) -> Result<ApiMessage, ApiError> {
        self.execute(Method::POST, &["auth", "signup"], |b| b.json(request))
            .await
    }

    async fn check_username_availability(&self, username: &str) -> Result<Availability, ApiError> {
        self.execute(Method::GET, &["user", "checkUsernameAvailability"], |b| {
            b.query(&[("username", username)])
        })
        .await
    }

    async fn check_email_availability(&self, email: &str) -> Result<Availability, ApiError> {
        self.execute(Method::GET, &["user", "checkEmailAvailability"], |b| {
            b.query(&[("email", email)])
        })
        .await
    }

    async fn user_profile(&self, username: &str) -> Result<UserProfile, ApiError> {
        self.execute(Method::GET, &["users", username], |b| b)
            .await
    }

    async fn create_poll(&self, request: &CreatePollRequest) -> Result<serde_json::Value, ApiError> {
        self.execute(Method::POST, &["polls"], |b| b.json(request)).await
    }

    async fn list_polls(
        &self,
        scope: &PollScope,
        page: u32,
        size: u32,
    ) -> Result<PollPage, ApiError> {
        self.execute(Method::GET, &scope.segments(), |b| {
            b.query(&[("page", page), ("size", size)])
        })
        .await
    }

    async fn cast_vote(&self, request: &VoteRequest) -> Result<Poll, ApiError> {
        let poll_id = request.poll_id.to_string();
        self.execute(Method::POST, &["polls", &poll_id, "votes"], |b| {
            b.json(request)
        })
        .await
    }
}
