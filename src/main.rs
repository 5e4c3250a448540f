use std::{process, sync::Arc, time::Duration};

use score_api::{
    application::{error::AppError, score::ScoreService},
    cache::ScoreCache,
    config::{self, Settings},
    infra::{
        error::InfraError,
        http::{self, AppState},
        scorer::CommandScorer,
        store::{self, ConnectedStore},
        telemetry,
    },
    presentation::{BadgeRenderer, ResponseRenderer},
};
use tokio::net::TcpListener;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
    }
}

async fn run_serve(settings: Settings) -> Result<(), AppError> {
    let connected = store::connect(&settings.store)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    let state = build_state(&settings, &connected);
    let result = serve_http(&settings, state).await;

    connected.shutdown();
    result
}

fn build_state(settings: &Settings, connected: &ConnectedStore) -> AppState {
    let cache = ScoreCache::new(Arc::clone(&connected.store));
    let computer = Arc::new(CommandScorer::from_settings(&settings.scorer));
    let scores = ScoreService::new(cache, computer);
    let renderer = ResponseRenderer::new(BadgeRenderer::new(settings.badge.template_path.clone()));
    AppState::new(scores, renderer)
}

async fn serve_http(settings: &Settings, state: AppState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "score_api::serve",
        addr = %settings.server.addr,
        scorer = %settings.scorer.command.display(),
        "Listening"
    );

    let grace = settings.server.graceful_shutdown;
    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => {
            return result.map_err(|err| AppError::unexpected(format!("server error: {err}")));
        }
        _ = shutdown_signal() => {}
    }

    drain(server, grace).await
}

async fn drain<F>(server: std::pin::Pin<&mut F>, grace: Duration) -> Result<(), AppError>
where
    F: std::future::Future<Output = std::io::Result<()>>,
{
    match tokio::time::timeout(grace, server).await {
        Ok(result) => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
            info!(target = "score_api::serve", "Shutdown complete");
            Ok(())
        }
        Err(_) => {
            warn!(
                target = "score_api::serve",
                grace_seconds = grace.as_secs(),
                "In-flight requests did not drain in time; exiting"
            );
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(target = "score_api::serve", error = %err, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(target = "score_api::serve", error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!(target = "score_api::serve", "Received shutdown signal");
}
