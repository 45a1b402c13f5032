//! Side effects the controllers ask the surrounding UI to perform.

use std::fmt;

use tracing::{info, warn};

pub const APP_TITLE: &str = "Polling App";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Landing,
    Login,
    Signup,
    NewPoll,
    Profile(String),
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::Landing => "/".to_string(),
            Route::Login => "/login".to_string(),
            Route::Signup => "/signup".to_string(),
            Route::NewPoll => "/poll/new".to_string(),
            Route::Profile(username) => format!("/users/{username}"),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: &'static str,
    pub description: String,
}

impl Notice {
    pub fn info(description: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, description)
    }

    pub fn success(description: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, description)
    }

    pub fn error(description: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, description)
    }

    fn new(level: NoticeLevel, description: impl Into<String>) -> Self {
        Notice {
            level,
            title: APP_TITLE,
            description: description.into(),
        }
    }
}

pub const GENERIC_ERROR: &str = "Sorry! Something went wrong. Please try again!";

pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Navigator for headless runs: records the requested route in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, route: Route) {
        info!(route = %route, "Navigation requested");
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info | NoticeLevel::Success => {
                info!("[{}] {}", notice.title, notice.description)
            }
            NoticeLevel::Error => warn!("[{}] {}", notice.title, notice.description),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.description)
    }
}

