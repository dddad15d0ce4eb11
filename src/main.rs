use anyhow::Context;
use sharekeeper::commands::{CommandHandler, CommandSettings};
use sharekeeper::orchestration::install_menus;
use sharekeeper::{
    api, init_db, Config, EventLogLocation, EventLogSource, FileEventLog, Notifier, Poller,
    PollerSettings, Repository, Runtime, RuntimeSettings, SheetCsvSource, TelegramClient,
    UpdateSource,
};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(config).await {
        eprintln!("Startup failed: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    let pool = init_db(&config.database_path)
        .await
        .with_context(|| format!("failed to initialize database at {}", config.database_path))?;
    let repo = Arc::new(Repository::new(pool));

    let source: Arc<dyn EventLogSource> = match &config.event_log {
        EventLogLocation::Url(url) => Arc::new(SheetCsvSource::new(url.clone())),
        EventLogLocation::Path(path) => Arc::new(FileEventLog::new(path.clone())),
    };

    let telegram = Arc::new(TelegramClient::new(
        config.telegram_api_url.clone(),
        config.telegram_bot_token.clone(),
    ));
    let notifier: Arc<dyn Notifier> = telegram.clone();
    let updates: Arc<dyn UpdateSource> = telegram;

    let poller = Poller::new(
        repo.clone(),
        source,
        notifier.clone(),
        PollerSettings {
            reference_bank: config.reference_bank,
            share_fraction: config.share_fraction,
            replay_history: config.replay_history,
        },
    );
    let commands = CommandHandler::new(
        repo.clone(),
        notifier.clone(),
        CommandSettings {
            admin_ids: config.admin_ids.clone(),
            deposit_address: config.deposit_address.clone(),
            deposit_network: config.deposit_network.clone(),
        },
    );

    install_menus(notifier.as_ref(), &repo, &config.admin_ids).await;

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    let app = api::create_router(api::AppState::new(repo, config.clone()));
    tracing::info!("Status API listening on {}", addr);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "Status API stopped");
        }
    });

    let runtime = Runtime::new(
        poller,
        commands,
        updates,
        notifier,
        RuntimeSettings::new(config.poll_interval),
    );
    runtime
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await;

    tracing::info!("Shut down");
    Ok(())
}
