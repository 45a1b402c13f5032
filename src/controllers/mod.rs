pub mod login;
pub mod new_poll;
pub mod poll_list;
pub mod profile;
pub mod session;
pub mod signup;

pub use login::{Login, LoginForm};
pub use new_poll::{NewPoll, NewPollForm};
pub use poll_list::{FetchOutcome, ListPhase, PollListController, PollListState, VoteOutcome};
pub use profile::{ProfileController, ProfileView};
pub use session::{Session, SessionState};
pub use signup::{AvailabilityField, CheckOutcome, SignupController, SignupForm, SignupInput};

/// Result of submitting one of the forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Submitted,
    /// Blocked locally because a field is not valid.
    Invalid,
    LoggedOut,
    Failed,
}
