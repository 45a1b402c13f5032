pub mod requests;
pub mod responses;

pub use requests::{ChoiceRequest, CreatePollRequest, LoginRequest, PollLength, SignupRequest, VoteRequest};
pub use responses::{AccessToken, ApiMessage, Availability};
