use std::sync::Arc;

use tokio::sync::Notify;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rollout_api::config::ServerConfig;
use rollout_api::router::build_app_router;
use rollout_api::state::AppState;
use rollout_events::{
    CalendarConfig, CalendarService, DisabledCalendar, DisabledMailer, EmailConfig,
    EmailDelivery, HttpCalendarClient, NotificationSender, OutboxConfig, OutboxDispatcher,
};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "rollout_api=debug,rollout_events=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(addr = %config.bind_addr(), "Loaded server configuration");

    // --- Database ---
    let pool = rollout_db::create_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    rollout_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    rollout_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Delivery channels ---
    let calendar: Arc<dyn CalendarService> = match CalendarConfig::from_env() {
        Some(calendar_config) => {
            tracing::info!(base_url = %calendar_config.base_url, "Calendar sync enabled");
            Arc::new(
                HttpCalendarClient::new(calendar_config)
                    .expect("Failed to build calendar HTTP client"),
            )
        }
        None => {
            tracing::warn!("CALENDAR_API_URL not set, calendar sync disabled");
            Arc::new(DisabledCalendar)
        }
    };

    let mailer: Arc<dyn NotificationSender> = match EmailConfig::from_env() {
        Some(email_config) => {
            tracing::info!(smtp_host = %email_config.smtp_host, "Email delivery enabled");
            Arc::new(EmailDelivery::new(email_config).expect("Invalid SMTP configuration"))
        }
        None => {
            tracing::warn!("SMTP_HOST not set, email delivery disabled");
            Arc::new(DisabledMailer)
        }
    };

    // --- Outbox dispatcher ---
    let outbox_signal = Arc::new(Notify::new());
    let dispatcher_cancel = tokio_util::sync::CancellationToken::new();
    let dispatcher = OutboxDispatcher::new(
        pool.clone(),
        calendar,
        mailer,
        OutboxConfig::from_env(),
        Arc::clone(&outbox_signal),
    );
    let dispatcher_token = dispatcher_cancel.clone();
    let dispatcher_handle = tokio::spawn(async move {
        dispatcher.run(dispatcher_token).await;
    });
    tracing::info!("Outbox dispatcher started");

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        outbox_signal,
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = config.bind_addr();
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    dispatcher_cancel.cancel();
    if tokio::time::timeout(config.shutdown_timeout, dispatcher_handle)
        .await
        .is_err()
    {
        tracing::warn!(
            timeout_secs = config.shutdown_timeout.as_secs(),
            "Outbox dispatcher did not stop in time"
        );
    } else {
        tracing::info!("Outbox dispatcher stopped");
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT (Ctrl-C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl-C, starting graceful shutdown"),
        _ = terminate => tracing::info!("Received SIGTERM, starting graceful shutdown"),
    }
}
