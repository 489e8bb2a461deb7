use clinic_booking_conversation::{
    BookingRecorder, BookingRepository, ConversationEngine, CustomerRepository,
    InMemoryBookingRepository, InMemoryCustomerRepository, InMemorySessionStore, MessageProcessor,
    Notifier, SessionStore, Templates,
};
use clinic_booking_server::{
    config::ServerConfig,
    db,
    error::StartupError,
    notify::{EmailRelayNotifier, LogNotifier},
    webhook::{self, AppState},
    whatsapp::WhatsAppClient,
};
use rootcause::prelude::*;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// The three stores the conversation persists into.
struct Stores {
    sessions: Arc<dyn SessionStore>,
    customers: Arc<dyn CustomerRepository>,
    bookings: Arc<dyn BookingRepository>,
}

#[tokio::main]
async fn main() -> Result<(), Report<StartupError>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env().context(StartupError::Config)?;
    tracing::info!(clinic_id = %config.clinic.id, "Loaded configuration");

    let stores = match &config.database_url {
        Some(url) => {
            let db_pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .connect(url)
                .await
                .context(StartupError::Database)?;

            tracing::info!("Running database migrations...");
            sqlx::migrate!("./migrations")
                .run(&db_pool)
                .await
                .context(StartupError::Database)?;

            Stores {
                sessions: Arc::new(db::SessionRepository::new(db_pool.clone())),
                customers: Arc::new(db::CustomerRepository::new(db_pool.clone())),
                bookings: Arc::new(db::BookingRepository::new(db_pool)),
            }
        }
        None => {
            tracing::warn!("DATABASE_URL not set; sessions and bookings will not survive a restart");
            Stores {
                sessions: Arc::new(InMemorySessionStore::new()),
                customers: Arc::new(InMemoryCustomerRepository::new()),
                bookings: Arc::new(InMemoryBookingRepository::new()),
            }
        }
    };

    let http = reqwest::Client::new();

    let notifier: Arc<dyn Notifier> = match &config.notify.relay_url {
        Some(url) => Arc::new(EmailRelayNotifier::new(
            http.clone(),
            url.clone(),
            config.notify.relay_token.clone(),
        )),
        None => {
            tracing::info!("No notification relay configured; booking alerts will be logged");
            Arc::new(LogNotifier)
        }
    };

    let recorder = BookingRecorder::new(
        stores.customers,
        stores.bookings,
        notifier,
        config.clinic.notify_email.clone(),
    );
    let processor = MessageProcessor::new(
        config.clinic.id,
        stores.sessions,
        ConversationEngine::new(Templates::new(config.clinic.name.clone())),
        recorder,
        Arc::new(WhatsAppClient::new(http, &config.whatsapp)),
    );

    let state = Arc::new(AppState::new(processor, config.whatsapp.verify_token.clone()));
    let app = webhook::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .context(StartupError::Listener {
            address: config.bind_address.clone(),
        })?;

    tracing::info!("listening on http://{}", config.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context(StartupError::Listener {
            address: config.bind_address.clone(),
        })?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
