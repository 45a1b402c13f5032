use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use polling_client::{
    config::{logger::initialize_logger, ClientConfig},
    controllers::{PollListController, Session},
    effects::{LogNavigator, LogNotifier, Navigator, Notifier},
    gateway::{CredentialStore, FileCredentialStore, HttpGateway, MemoryCredentialStore, PollScope},
    render::{render_poll, ChoiceView},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    initialize_logger()?;

    info!("🚀 Polling client starting...");

    let config = ClientConfig::from_env()?;
    info!("Using API at {}", config.api_base_url);

    let credentials: Arc<dyn CredentialStore> = match &config.access_token_path {
        Some(path) => Arc::new(FileCredentialStore::new(path)),
        None => Arc::new(MemoryCredentialStore::new()),
    };

    let gateway = Arc::new(HttpGateway::new(
        config.api_base_url.clone(),
        Arc::clone(&credentials),
    )?);
    let session = Session::new(
        gateway,
        credentials,
        Arc::new(LogNavigator) as Arc<dyn Navigator>,
        Arc::new(LogNotifier) as Arc<dyn Notifier>,
    );

    session.bootstrap().await;
    match session.current_user() {
        Some(user) => info!("Signed in as {} (@{})", user.name, user.username),
        None => info!("Browsing anonymously"),
    }

    let polls = PollListController::new(session.clone(), PollScope::All, config.poll_list_size);
    polls.load_first_page().await;

    let state = polls.snapshot();
    if state.is_empty_result() {
        warn!("No Polls Found.");
        return Ok(());
    }

    let now = Utc::now();
    for (position, poll) in state.polls().iter().enumerate() {
        let view = render_poll(
            poll,
            state.pending_selection(position),
            &now,
            &config.display_timezone,
        );
        info!(
            "#{} {} by {} on {} ({}, {})",
            view.id,
            view.question,
            view.creator_name,
            view.created_at,
            view.votes_label,
            view.time_label
        );
        for choice in &view.choices {
            match choice {
                ChoiceView::Ballot { text, .. } => info!("    ( ) {}", text),
                ChoiceView::Result {
                    text,
                    percent_label,
                    is_winner,
                    is_selected,
                    ..
                } => info!(
                    "    {} {} {}{}",
                    percent_label,
                    text,
                    if *is_selected { "✔" } else { "" },
                    if *is_winner { " 🏆" } else { "" }
                ),
            }
        }
    }

    if state.can_load_more() {
        info!(
            "Showing {} of {} polls",
            state.polls().len(),
            state.total_elements()
        );
    }

    Ok(())
}
