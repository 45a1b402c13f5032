use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type PollId = i64;
pub type ChoiceId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    pub id: PollId,
    pub question: String,
    pub choices: Vec<Choice>,
    pub created_by: UserSummary,
    pub creation_date_time: DateTime<Utc>,
    pub expiration_date_time: DateTime<Utc>,
    pub total_votes: i64,
    /// Authoritative from the server, never recomputed locally.
    pub expired: bool,
    /// Set once the viewer has voted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_choice: Option<ChoiceId>,
}

impl Poll {
    pub fn has_voted(&self) -> bool {
        self.selected_choice.is_some()
    }

    pub fn choice(&self, choice_id: ChoiceId) -> Option<&Choice> {
        self.choices.iter().find(|c| c.id == choice_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Choice {
    pub id: ChoiceId,
    pub text: String,
    pub vote_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub name: String,
}

/// The server's page envelope around a sequence of polls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollPage {
    pub content: Vec<Poll>,
    pub page: u32,
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u32,
    pub last: bool,
}
