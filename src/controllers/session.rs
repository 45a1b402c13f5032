use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{info, warn};

use crate::{
    dtos::LoginRequest,
    effects::{Navigator, Notice, Notifier, Route},
    error::ApiError,
    gateway::{ApiGateway, CredentialStore},
    models::CurrentUser,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub current_user: Option<CurrentUser>,
    pub is_authenticated: bool,
    pub is_loading: bool,
}

/// Authentication state for the whole application.
///
/// Cheap to clone; every clone shares the same state, so child controllers can
/// hold one and force a logout from anywhere.
pub struct Session<G: ApiGateway> {
    state: Arc<Mutex<SessionState>>,
    gateway: Arc<G>,
    credentials: Arc<dyn CredentialStore>,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
}

impl<G: ApiGateway> Clone for Session<G> {
    fn clone(&self) -> Self {
        Session {
            state: Arc::clone(&self.state),
            gateway: Arc::clone(&self.gateway),
            credentials: Arc::clone(&self.credentials),
            navigator: Arc::clone(&self.navigator),
            notifier: Arc::clone(&self.notifier),
        }
    }
}

impl<G: ApiGateway> Session<G> {
    pub fn new(
        gateway: Arc<G>,
        credentials: Arc<dyn CredentialStore>,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Session {
            state: Arc::new(Mutex::new(SessionState::default())),
            gateway,
            credentials,
            navigator,
            notifier,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> SessionState {
        self.lock().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.lock().is_authenticated
    }

    pub fn current_user(&self) -> Option<CurrentUser> {
        self.lock().current_user.clone()
    }

    pub fn gateway(&self) -> &Arc<G> {
        &self.gateway
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.navigator
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    /// Resolves the persisted session at startup. Never fails: every error
    /// downgrades to the logged-out state.
    pub async fn bootstrap(&self) {
        self.load_current_user().await;
    }

    async fn load_current_user(&self) {
        if self.credentials.token().is_none() {
            info!("No persisted access token, starting logged out");
            let mut state = self.lock();
            state.current_user = None;
            state.is_authenticated = false;
            state.is_loading = false;
            return;
        }

        self.lock().is_loading = true;
        let result = self.gateway.current_user().await;

        match result {
            Ok(user) => {
                info!("Session resolved for {}", user.username);
                let mut state = self.lock();
                state.current_user = Some(user);
                state.is_authenticated = true;
                state.is_loading = false;
            }
            Err(e) => {
                warn!("Unable to resolve current user: {}", e);
                if e.is_unauthorized() {
                    // the token is dead; keep it from being sent again
                    if let Err(e) = self.credentials.clear() {
                        warn!("Failed to clear rejected access token: {}", e);
                    }
                }
                let mut state = self.lock();
                state.current_user = None;
                state.is_authenticated = false;
                state.is_loading = false;
            }
        }
    }

    /// Exchanges credentials for an access token, persists it and runs [`Session::login`].
    pub async fn sign_in(&self, request: &LoginRequest) -> Result<(), ApiError> {
        let token = self.gateway.sign_in(request).await?;
        self.credentials.store(&token.access_token)?;
        self.login().await;
        Ok(())
    }

    /// Marks the session authenticated, re-resolves the current user and returns to the landing view.
    pub async fn login(&self) {
        self.lock().is_authenticated = true;
        self.notifier
            .notify(Notice::success("You're successfully logged in."));
        self.load_current_user().await;
        self.navigator.navigate(Route::Landing);
    }

    /// Drops the token and the current user. Safe to call repeatedly and from
    /// any controller that saw a 401.
    pub fn logout(&self) {
        if let Err(e) = self.credentials.clear() {
            warn!("Failed to clear access token: {}", e);
        }
        {
            let mut state = self.lock();
            state.current_user = None;
            state.is_authenticated = false;
            state.is_loading = false;
        }
        info!("Session logged out");
        self.navigator.navigate(Route::Landing);
        self.notifier
            .notify(Notice::success("You're successfully logged out."));
    }
}
