pub mod poll;
pub mod user;

pub use poll::{Choice, ChoiceId, Poll, PollId, PollPage, UserSummary};
pub use user::{CurrentUser, UserProfile};
