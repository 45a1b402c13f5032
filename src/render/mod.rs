//! Turns a poll snapshot into what a viewer sees: percentages, the winner of an
//! expired poll, ballot or results mode, and the footer labels.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::models::{Choice, ChoiceId, Poll, UserProfile};

pub mod format;

pub use format::{avatar_initial, format_date, format_date_time, percent_label, votes_label};

pub const FINAL_RESULTS: &str = "Final results";

/// Share of the total vote, unrounded. Exactly 0 when nobody has voted.
pub fn calculate_percentage(choice: &Choice, total_votes: i64) -> f64 {
    if total_votes == 0 {
        return 0.0;
    }
    (choice.vote_count as f64) * 100.0 / (total_votes as f64)
}

/// The choice with the strictly highest vote count. Ties go to the first
/// maximal choice in stored order.
pub fn winning_choice(choices: &[Choice]) -> Option<&Choice> {
    choices.iter().fold(None, |best: Option<&Choice>, current| match best {
        Some(prev) if current.vote_count <= prev.vote_count => Some(prev),
        _ => Some(current),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    /// Selectable choices; submit stays disabled until something is picked.
    Ballot { can_submit: bool },
    Results,
}

pub fn display_mode(poll: &Poll, current_vote: Option<ChoiceId>) -> DisplayMode {
    if poll.has_voted() || poll.expired {
        DisplayMode::Results
    } else {
        DisplayMode::Ballot {
            can_submit: current_vote.is_some(),
        }
    }
}

/// Largest nonzero unit of `expiration - now`. Anything under a second,
/// including time already past, reads "less than a second left".
pub fn time_remaining(expiration: &DateTime<Utc>, now: &DateTime<Utc>) -> String {
    let diff_ms = (*expiration - *now).num_milliseconds();
    if diff_ms <= 0 {
        return "less than a second left".to_string();
    }

    let total_seconds = diff_ms / 1000;
    let seconds = total_seconds % 60;
    let minutes = (total_seconds / 60) % 60;
    let hours = (total_seconds / 3600) % 24;
    let days = total_seconds / 86_400;

    if days > 0 {
        format!("{days} days left")
    } else if hours > 0 {
        format!("{hours} hours left")
    } else if minutes > 0 {
        format!("{minutes} minutes left")
    } else if seconds > 0 {
        format!("{seconds} seconds left")
    } else {
        "less than a second left".to_string()
    }
}

pub fn time_label(poll: &Poll, now: &DateTime<Utc>) -> String {
    if poll.expired {
        FINAL_RESULTS.to_string()
    } else {
        time_remaining(&poll.expiration_date_time, now)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChoiceView {
    Ballot {
        id: ChoiceId,
        text: String,
        checked: bool,
    },
    Result {
        id: ChoiceId,
        text: String,
        percent: f64,
        percent_label: String,
        is_winner: bool,
        is_selected: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PollView {
    pub id: i64,
    pub question: String,
    pub creator_name: String,
    pub creator_username: String,
    pub creator_initial: Option<String>,
    pub created_at: String,
    pub mode: DisplayMode,
    pub choices: Vec<ChoiceView>,
    pub votes_label: String,
    pub time_label: String,
}

pub fn render_poll(
    poll: &Poll,
    current_vote: Option<ChoiceId>,
    now: &DateTime<Utc>,
    zone: &Tz,
) -> PollView {
    let mode = display_mode(poll, current_vote);
    let choices = match mode {
        DisplayMode::Results => {
            let winner = if poll.expired {
                winning_choice(&poll.choices).map(|c| c.id)
            } else {
                None
            };
            poll.choices
                .iter()
                .map(|choice| {
                    let percent = calculate_percentage(choice, poll.total_votes);
                    ChoiceView::Result {
                        id: choice.id,
                        text: choice.text.clone(),
                        percent,
                        percent_label: percent_label(percent),
                        is_winner: winner == Some(choice.id),
                        is_selected: poll.selected_choice == Some(choice.id),
                    }
                })
                .collect()
        }
        DisplayMode::Ballot { .. } => poll
            .choices
            .iter()
            .map(|choice| ChoiceView::Ballot {
                id: choice.id,
                text: choice.text.clone(),
                checked: current_vote == Some(choice.id),
            })
            .collect(),
    };

    PollView {
        id: poll.id,
        question: poll.question.clone(),
        creator_name: poll.created_by.name.clone(),
        creator_username: poll.created_by.username.clone(),
        creator_initial: avatar_initial(&poll.created_by.name),
        created_at: format_date_time(&poll.creation_date_time, zone),
        mode,
        choices,
        votes_label: votes_label(poll.total_votes),
        time_label: time_label(poll, now),
    }
}

/// Header of the profile page.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileCard {
    pub name: String,
    pub username: String,
    pub initial: Option<String>,
    pub joined_label: String,
    pub poll_count: u64,
    pub vote_count: u64,
}

pub fn render_profile(profile: &UserProfile, zone: &Tz) -> ProfileCard {
    ProfileCard {
        name: profile.name.clone(),
        username: format!("@{}", profile.username),
        initial: avatar_initial(&profile.name),
        joined_label: format!("Joined {}", format_date(&profile.joined_at, zone)),
        poll_count: profile.poll_count,
        vote_count: profile.vote_count,
    }
}
