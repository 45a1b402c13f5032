use std::{
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use chrono_tz::Tz;
use tracing::{debug, warn};

use super::{poll_list::PollListController, session::Session};
use crate::{
    error::ApiError,
    gateway::{ApiGateway, PollScope},
    models::UserProfile,
    render::{render_profile, ProfileCard},
};

#[derive(Debug, Clone, PartialEq)]
pub enum ProfileView {
    Idle,
    Loading,
    Loaded(UserProfile),
    NotFound,
    ServerError,
}

#[derive(Debug, Clone)]
struct ProfileState {
    username: Option<String>,
    view: ProfileView,
    generation: u64,
}

/// Loads the profile page for one username at a time.
pub struct ProfileController<G: ApiGateway> {
    state: Arc<Mutex<ProfileState>>,
    session: Session<G>,
}

fn lock(state: &Mutex<ProfileState>) -> MutexGuard<'_, ProfileState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<G: ApiGateway> ProfileController<G> {
    pub fn new(session: Session<G>) -> Self {
        ProfileController {
            state: Arc::new(Mutex::new(ProfileState {
                username: None,
                view: ProfileView::Idle,
                generation: 0,
            })),
            session,
        }
    }

    pub fn view(&self) -> ProfileView {
        lock(&self.state).view.clone()
    }

    pub fn username(&self) -> Option<String> {
        lock(&self.state).username.clone()
    }

    /// The page header, once a profile is loaded.
    pub fn card(&self, zone: &Tz) -> Option<ProfileCard> {
        match &lock(&self.state).view {
            ProfileView::Loaded(profile) => Some(render_profile(profile, zone)),
            _ => None,
        }
    }

    /// Loads `username`'s profile. Results for a previously requested username are dropped.
    pub fn load(&self, username: &str) -> impl Future<Output = ProfileView> + Send + 'static {
        let generation = {
            let mut state = lock(&self.state);
            state.generation += 1;
            state.username = Some(username.to_string());
            state.view = ProfileView::Loading;
            state.generation
        };

        let state = Arc::downgrade(&self.state);
        let gateway = Arc::clone(self.session.gateway());
        let username = username.to_string();
        async move {
            let result = gateway.user_profile(&username).await;
            let view = match result {
                Ok(profile) => ProfileView::Loaded(profile),
                Err(ApiError::NotFound) => ProfileView::NotFound,
                Err(e) => {
                    warn!("Failed to load profile of {}: {}", username, e);
                    ProfileView::ServerError
                }
            };

            if let Some(state) = state.upgrade() {
                let mut state = lock(&state);
                if state.generation == generation {
                    state.view = view.clone();
                } else {
                    debug!("Dropping stale profile result for {}", username);
                }
            }
            view
        }
    }

    /// Reloads only when the username actually changed.
    pub fn change_username(
        &self,
        username: &str,
    ) -> Option<impl Future<Output = ProfileView> + Send + 'static> {
        if self.username().as_deref() == Some(username) {
            return None;
        }
        Some(self.load(username))
    }

    /// The two tabs of the profile page: polls the user created and polls the user voted on.
    pub fn poll_lists(&self, username: &str, page_size: u32) -> (PollListController<G>, PollListController<G>) {
        (
            PollListController::new(
                self.session.clone(),
                PollScope::CreatedBy(username.to_string()),
                page_size,
            ),
            PollListController::new(
                self.session.clone(),
                PollScope::VotedBy(username.to_string()),
                page_size,
            ),
        )
    }
}
