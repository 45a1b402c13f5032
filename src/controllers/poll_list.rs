use std::{
    collections::HashSet,
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
};

use tracing::{debug, info, warn};

use super::session::Session;
use crate::{
    config::settings::DEFAULT_POLL_LIST_SIZE,
    dtos::VoteRequest,
    effects::{Notice, Route, GENERIC_ERROR},
    error::{ApiError, PollsError},
    gateway::{ApiGateway, PollScope},
    models::{ChoiceId, Poll, PollId, PollPage},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListPhase {
    Idle,
    Loading,
    Loaded,
    /// The server reported the last page.
    Exhausted,
}

/// A page fetch issued under a given scope generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub scope: PollScope,
    pub page: u32,
    pub size: u32,
    generation: u64,
}

/// A vote issued for one list position under a given scope generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteTicket {
    pub position: usize,
    pub request: VoteRequest,
    generation: u64,
}

/// Everything one poll list retains. Only the transition functions below mutate it.
#[derive(Debug, Clone)]
pub struct PollListState {
    scope: PollScope,
    request_size: u32,
    polls: Vec<Poll>,
    pending: Vec<Option<ChoiceId>>,
    page: u32,
    size: u32,
    total_elements: u64,
    total_pages: u32,
    last: bool,
    loading: bool,
    loaded: bool,
    generation: u64,
    votes_in_flight: HashSet<usize>,
}

impl PollListState {
    pub fn new(scope: PollScope, request_size: u32) -> Self {
        PollListState {
            scope,
            request_size,
            polls: Vec::new(),
            pending: Vec::new(),
            page: 0,
            size: request_size,
            total_elements: 0,
            total_pages: 0,
            last: true,
            loading: false,
            loaded: false,
            generation: 0,
            votes_in_flight: HashSet::new(),
        }
    }

    pub fn scope(&self) -> &PollScope {
        &self.scope
    }

    pub fn polls(&self) -> &[Poll] {
        &self.polls
    }

    pub fn pending_selection(&self, position: usize) -> Option<ChoiceId> {
        self.pending.get(position).copied().flatten()
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn total_elements(&self) -> u64 {
        self.total_elements
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn is_last(&self) -> bool {
        self.last
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_vote_in_flight(&self, position: usize) -> bool {
        self.votes_in_flight.contains(&position)
    }

    pub fn phase(&self) -> ListPhase {
        if self.loading {
            ListPhase::Loading
        } else if !self.loaded {
            ListPhase::Idle
        } else if self.last {
            ListPhase::Exhausted
        } else {
            ListPhase::Loaded
        }
    }

    /// Whether the "load more" control should be offered.
    pub fn can_load_more(&self) -> bool {
        !self.loading && !self.last
    }

    /// Nothing to show once loading settled.
    pub fn is_empty_result(&self) -> bool {
        !self.loading && self.polls.is_empty()
    }

    /// Starts fetching `page`. `None` while another fetch is outstanding.
    pub fn begin_fetch(&mut self, page: u32) -> Option<PageRequest> {
        if self.loading {
            return None;
        }
        self.loading = true;
        Some(PageRequest {
            scope: self.scope.clone(),
            page,
            size: self.request_size,
            generation: self.generation,
        })
    }

    /// Starts the initial fetch. `None` once the list left `Idle`; only a scope
    /// reset allows page 0 to be requested again.
    pub fn begin_first_page(&mut self) -> Option<PageRequest> {
        if self.loaded {
            return None;
        }
        self.begin_fetch(0)
    }

    pub fn begin_load_more(&mut self) -> Option<PageRequest> {
        if !self.can_load_more() {
            return None;
        }
        self.begin_fetch(self.page + 1)
    }

    /// Appends a fetched page. Returns `false` if the request belongs to a
    /// superseded scope and was ignored.
    pub fn apply_page(&mut self, request: &PageRequest, page: PollPage) -> bool {
        if request.generation != self.generation {
            return false;
        }
        self.pending.extend(std::iter::repeat(None).take(page.content.len()));
        self.polls.extend(page.content);
        self.page = page.page;
        self.size = page.size;
        self.total_elements = page.total_elements;
        self.total_pages = page.total_pages;
        self.last = page.last;
        self.loading = false;
        self.loaded = true;
        true
    }

    /// Clears the loading flag after a failed fetch, leaving everything else as it was.
    pub fn fail_fetch(&mut self, request: &PageRequest) -> bool {
        if request.generation != self.generation {
            return false;
        }
        self.loading = false;
        true
    }

    pub fn select_choice(&mut self, position: usize, choice_id: ChoiceId) -> Result<(), PollsError> {
        let poll = self
            .polls
            .get(position)
            .ok_or(PollsError::PollNotFound(position))?;
        if poll.choice(choice_id).is_none() {
            return Err(PollsError::InvalidPollOption);
        }
        self.pending[position] = Some(choice_id);
        Ok(())
    }

    pub fn begin_vote(&mut self, position: usize) -> Result<VoteTicket, PollsError> {
        let poll = self
            .polls
            .get(position)
            .ok_or(PollsError::PollNotFound(position))?;
        if poll.has_voted() {
            return Err(PollsError::AlreadyVoted);
        }
        if poll.expired {
            return Err(PollsError::PollEnded);
        }
        let poll_id = poll.id;
        let choice_id = self
            .pending_selection(position)
            .ok_or(PollsError::NoChoiceSelected)?;
        if !self.votes_in_flight.insert(position) {
            return Err(PollsError::VoteInFlight);
        }
        Ok(VoteTicket {
            position,
            request: VoteRequest { poll_id, choice_id },
            generation: self.generation,
        })
    }

    /// Swaps in the server's post-vote snapshot for the ticket's position.
    pub fn apply_vote(&mut self, ticket: &VoteTicket, poll: Poll) -> bool {
        if ticket.generation != self.generation {
            return false;
        }
        self.votes_in_flight.remove(&ticket.position);
        match self.polls.get_mut(ticket.position) {
            Some(slot) => {
                *slot = poll;
                true
            }
            None => false,
        }
    }

    pub fn fail_vote(&mut self, ticket: &VoteTicket) -> bool {
        if ticket.generation != self.generation {
            return false;
        }
        self.votes_in_flight.remove(&ticket.position)
    }

    /// Forgets everything retained under the previous scope. Responses issued
    /// before the reset are ignored from here on.
    pub fn reset_scope(&mut self, scope: PollScope) {
        let generation = self.generation.wrapping_add(1);
        *self = PollListState::new(scope, self.request_size);
        self.generation = generation;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied { received: usize },
    /// A fetch was already outstanding or there is nothing more to load.
    Skipped,
    Failed,
    /// The response arrived after a scope change or after the list was dropped.
    Discarded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteOutcome {
    Recorded { poll_id: PollId },
    /// Not logged in; the viewer was sent to the login view instead.
    LoginRequired,
    Rejected(PollsError),
    LoggedOut,
    Failed,
    Discarded,
}

/// Drives one [`PollListState`] against the gateway.
///
/// Each operation performs its state transition when called and returns a
/// future that issues the request. The future holds only a weak reference to
/// the list, so results arriving after the controller is dropped are discarded.
pub struct PollListController<G: ApiGateway> {
    state: Arc<Mutex<PollListState>>,
    observed_auth: Arc<Mutex<bool>>,
    session: Session<G>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<G: ApiGateway> PollListController<G> {
    pub fn new(session: Session<G>, scope: PollScope, page_size: u32) -> Self {
        let page_size = if page_size == 0 {
            DEFAULT_POLL_LIST_SIZE
        } else {
            page_size
        };
        let observed_auth = session.is_authenticated();
        PollListController {
            state: Arc::new(Mutex::new(PollListState::new(scope, page_size))),
            observed_auth: Arc::new(Mutex::new(observed_auth)),
            session,
        }
    }

    pub fn snapshot(&self) -> PollListState {
        lock(&self.state).clone()
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&PollListState) -> R) -> R {
        f(&lock(&self.state))
    }

    /// No-op once the first page was applied.
    pub fn load_first_page(&self) -> impl Future<Output = FetchOutcome> + Send + 'static {
        let request = lock(&self.state).begin_first_page();
        self.fetch(request)
    }

    /// No-op while a fetch is outstanding or after the last page.
    pub fn load_more(&self) -> impl Future<Output = FetchOutcome> + Send + 'static {
        let request = lock(&self.state).begin_load_more();
        self.fetch(request)
    }

    /// Resets to `scope` and fetches its first page.
    pub fn change_scope(&self, scope: PollScope) -> impl Future<Output = FetchOutcome> + Send + 'static {
        let request = {
            let mut state = lock(&self.state);
            info!("Poll list scope changed to {:?}", scope);
            state.reset_scope(scope);
            state.begin_fetch(0)
        };
        self.fetch(request)
    }

    /// Resets and refetches when the session's authentication flipped since the
    /// list last looked; otherwise does nothing.
    pub fn sync_auth(&self) -> impl Future<Output = FetchOutcome> + Send + 'static {
        let now_authenticated = self.session.is_authenticated();
        let request = {
            let mut observed = lock(&self.observed_auth);
            if *observed == now_authenticated {
                None
            } else {
                *observed = now_authenticated;
                let mut state = lock(&self.state);
                let scope = state.scope().clone();
                debug!("Authentication changed, reloading {:?}", scope);
                state.reset_scope(scope);
                state.begin_fetch(0)
            }
        };
        self.fetch(request)
    }

    pub fn select_choice(&self, position: usize, choice_id: ChoiceId) -> Result<(), PollsError> {
        lock(&self.state).select_choice(position, choice_id)
    }

    /// Casts the pending selection at `position`. Logged-out viewers are sent
    /// to the login view without touching the network.
    pub fn submit_vote(&self, position: usize) -> impl Future<Output = VoteOutcome> + Send + 'static {
        let ticket = if self.session.is_authenticated() {
            Some(lock(&self.state).begin_vote(position))
        } else {
            self.session.navigator().navigate(Route::Login);
            self.session
                .notifier()
                .notify(Notice::info("Please login to vote."));
            None
        };

        let state = Arc::downgrade(&self.state);
        let observed_auth = Arc::clone(&self.observed_auth);
        let session = self.session.clone();
        async move {
            let ticket = match ticket {
                None => return VoteOutcome::LoginRequired,
                Some(Err(rejected)) => {
                    debug!("Vote rejected locally: {}", rejected);
                    return VoteOutcome::Rejected(rejected);
                }
                Some(Ok(ticket)) => ticket,
            };
            let result = session.gateway().cast_vote(&ticket.request).await;
            let (outcome, refetch) = settle_vote(&state, &observed_auth, &session, &ticket, result);
            if refetch.is_some() {
                request_page(state, Arc::clone(session.gateway()), refetch).await;
            }
            outcome
        }
    }

    fn fetch(&self, request: Option<PageRequest>) -> impl Future<Output = FetchOutcome> + Send + 'static {
        request_page(
            Arc::downgrade(&self.state),
            Arc::clone(self.session.gateway()),
            request,
        )
    }
}

async fn request_page<G: ApiGateway>(
    state: Weak<Mutex<PollListState>>,
    gateway: Arc<G>,
    request: Option<PageRequest>,
) -> FetchOutcome {
    let Some(request) = request else {
        return FetchOutcome::Skipped;
    };
    let result = gateway
        .list_polls(&request.scope, request.page, request.size)
        .await;
    settle_page(state, &request, result)
}

fn settle_page(
    state: Weak<Mutex<PollListState>>,
    request: &PageRequest,
    result: Result<PollPage, ApiError>,
) -> FetchOutcome {
    let Some(state) = state.upgrade() else {
        debug!("Poll list dropped before page {} arrived", request.page);
        return FetchOutcome::Discarded;
    };
    let mut state = lock(&state);
    match result {
        Ok(page) => {
            let received = page.content.len();
            if state.apply_page(request, page) {
                debug!("Appended page {} ({} polls)", request.page, received);
                FetchOutcome::Applied { received }
            } else {
                FetchOutcome::Discarded
            }
        }
        Err(e) => {
            warn!("Failed to load page {} of {:?}: {}", request.page, request.scope, e);
            if state.fail_fetch(request) {
                FetchOutcome::Failed
            } else {
                FetchOutcome::Discarded
            }
        }
    }
}

/// Settles a vote response. A 401 also logs out and resets the list, returning
/// the first-page request for the logged-out view.
fn settle_vote<G: ApiGateway>(
    state: &Weak<Mutex<PollListState>>,
    observed_auth: &Mutex<bool>,
    session: &Session<G>,
    ticket: &VoteTicket,
    result: Result<Poll, ApiError>,
) -> (VoteOutcome, Option<PageRequest>) {
    let Some(state) = state.upgrade() else {
        debug!("Poll list dropped before vote on poll {} settled", ticket.request.poll_id);
        if matches!(result, Err(ApiError::Unauthorized)) {
            session.logout();
        }
        return (VoteOutcome::Discarded, None);
    };

    match result {
        Ok(poll) => {
            let poll_id = poll.id;
            if lock(&state).apply_vote(ticket, poll) {
                info!("Vote recorded on poll {}", poll_id);
                (VoteOutcome::Recorded { poll_id }, None)
            } else {
                (VoteOutcome::Discarded, None)
            }
        }
        Err(e) => {
            let current = lock(&state).fail_vote(ticket);
            if e.is_unauthorized() {
                warn!("Vote rejected as unauthorized, logging out");
                session.logout();
                let refetch = {
                    let mut observed = lock(observed_auth);
                    *observed = session.is_authenticated();
                    let mut list = lock(&state);
                    let scope = list.scope().clone();
                    list.reset_scope(scope);
                    list.begin_fetch(0)
                };
                (VoteOutcome::LoggedOut, refetch)
            } else if current {
                warn!("Vote on poll {} failed: {}", ticket.request.poll_id, e);
                session.notifier().notify(Notice::error(GENERIC_ERROR));
                (VoteOutcome::Failed, None)
            } else {
                (VoteOutcome::Discarded, None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Choice, UserSummary};
    use chrono::{Duration, Utc};

    fn poll(id: PollId) -> Poll {
        Poll {
            id,
            question: format!("question {id}"),
            choices: vec![
                Choice {
                    id: id * 10 + 1,
                    text: "yes".into(),
                    vote_count: 0,
                },
                Choice {
                    id: id * 10 + 2,
                    text: "no".into(),
                    vote_count: 0,
                },
            ],
            created_by: UserSummary {
                id: 1,
                username: "ferris".into(),
                name: "Ferris".into(),
            },
            creation_date_time: Utc::now(),
            expiration_date_time: Utc::now() + Duration::days(1),
            total_votes: 0,
            expired: false,
            selected_choice: None,
        }
    }

    fn page(ids: std::ops::Range<PollId>, page: u32, last: bool) -> PollPage {
        PollPage {
            content: ids.map(poll).collect(),
            page,
            size: 2,
            total_elements: 6,
            total_pages: 3,
            last,
        }
    }

    #[test]
    fn starts_idle_without_load_more() {
        let state = PollListState::new(PollScope::All, 2);
        assert_eq!(state.phase(), ListPhase::Idle);
        assert!(!state.can_load_more());
    }

    #[test]
    fn pages_append_in_fetch_order() {
        let mut state = PollListState::new(PollScope::All, 2);
        let first = state.begin_fetch(0).unwrap();
        assert_eq!(state.phase(), ListPhase::Loading);
        assert!(state.begin_fetch(0).is_none(), "one fetch at a time");
        assert!(state.apply_page(&first, page(1..3, 0, false)));
        assert_eq!(state.phase(), ListPhase::Loaded);

        let second = state.begin_load_more().unwrap();
        assert_eq!(second.page, 1);
        assert!(state.apply_page(&second, page(3..5, 1, true)));

        let ids: Vec<PollId> = state.polls().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert_eq!(state.phase(), ListPhase::Exhausted);
        assert!(state.begin_load_more().is_none());
        assert_eq!(state.pending_selection(3), None);
    }

    #[test]
    fn first_page_only_from_idle() {
        let mut state = PollListState::new(PollScope::All, 2);
        let first = state.begin_first_page().unwrap();
        state.apply_page(&first, page(1..3, 0, false));
        assert!(state.begin_first_page().is_none());

        state.reset_scope(PollScope::All);
        assert_eq!(state.begin_first_page().map(|r| r.page), Some(0));
    }

    #[test]
    fn failed_fetch_only_clears_loading() {
        let mut state = PollListState::new(PollScope::All, 2);
        let first = state.begin_fetch(0).unwrap();
        state.apply_page(&first, page(1..3, 0, false));
        let second = state.begin_load_more().unwrap();
        assert!(state.fail_fetch(&second));
        assert!(!state.is_loading());
        assert_eq!(state.polls().len(), 2);
        assert_eq!(state.page(), 0);
        assert!(state.can_load_more());
    }

    #[test]
    fn responses_from_an_old_scope_are_ignored() {
        let mut state = PollListState::new(PollScope::All, 2);
        let stale = state.begin_fetch(0).unwrap();
        state.reset_scope(PollScope::CreatedBy("ferris".into()));
        assert!(state.polls().is_empty());

        let fresh = state.begin_fetch(0).unwrap();
        assert_eq!(fresh.scope, PollScope::CreatedBy("ferris".into()));
        assert!(!state.apply_page(&stale, page(1..3, 0, false)));
        assert!(state.is_loading(), "stale response must not settle the new fetch");
        assert!(state.apply_page(&fresh, page(7..8, 0, true)));
        let ids: Vec<PollId> = state.polls().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![7]);
    }

    #[test]
    fn selection_overwrites_and_checks_choice() {
        let mut state = PollListState::new(PollScope::All, 2);
        let req = state.begin_fetch(0).unwrap();
        state.apply_page(&req, page(1..3, 0, true));

        state.select_choice(0, 11).unwrap();
        state.select_choice(0, 12).unwrap();
        assert_eq!(state.pending_selection(0), Some(12));
        assert_eq!(state.select_choice(0, 99), Err(PollsError::InvalidPollOption));
        assert_eq!(state.select_choice(5, 11), Err(PollsError::PollNotFound(5)));
    }

    #[test]
    fn vote_swaps_the_poll_wholesale() {
        let mut state = PollListState::new(PollScope::All, 2);
        let req = state.begin_fetch(0).unwrap();
        state.apply_page(&req, page(1..3, 0, true));

        assert_eq!(state.begin_vote(1), Err(PollsError::NoChoiceSelected));
        state.select_choice(1, 21).unwrap();
        let ticket = state.begin_vote(1).unwrap();
        assert_eq!(ticket.request, VoteRequest { poll_id: 2, choice_id: 21 });
        assert_eq!(state.begin_vote(1), Err(PollsError::VoteInFlight));

        let mut updated = poll(2);
        updated.question = "server copy".into();
        updated.choices[0].vote_count = 1;
        updated.total_votes = 1;
        updated.selected_choice = Some(21);
        assert!(state.apply_vote(&ticket, updated.clone()));
        assert_eq!(state.polls()[1], updated);
        assert!(!state.is_vote_in_flight(1));
        assert_eq!(state.begin_vote(1), Err(PollsError::AlreadyVoted));
    }

    #[test]
    fn expired_poll_cannot_be_voted() {
        let mut state = PollListState::new(PollScope::All, 2);
        let req = state.begin_fetch(0).unwrap();
        let mut envelope = page(1..2, 0, true);
        envelope.content[0].expired = true;
        state.apply_page(&req, envelope);
        state.select_choice(0, 11).unwrap();
        assert_eq!(state.begin_vote(0), Err(PollsError::PollEnded));
    }

    #[test]
    fn failed_vote_releases_position_and_keeps_poll() {
        let mut state = PollListState::new(PollScope::All, 2);
        let req = state.begin_fetch(0).unwrap();
        state.apply_page(&req, page(1..2, 0, true));
        state.select_choice(0, 12).unwrap();
        let ticket = state.begin_vote(0).unwrap();
        assert!(state.fail_vote(&ticket));
        assert_eq!(state.polls()[0].id, 1);
        assert_eq!(state.polls()[0].selected_choice, None);
        assert!(state.begin_vote(0).is_ok());
    }
}
