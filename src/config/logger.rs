use tracing::info;
use tracing::Level;
use tracing_log::LogTracer;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

pub fn initialize_logger() -> anyhow::Result<()> {
    // reqwest and hyper still emit through `log`
    LogTracer::init()?;

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::TRACE)
        .with_level(true)
        .with_file(true)
        .with_target(true)
        .pretty()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "polling_client=info,reqwest=warn".into()),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    info!("Logger Initialized:: ✅");
    Ok(())
}
