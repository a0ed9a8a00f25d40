//! Crossroads bot entrypoint wiring the gateway bridge, collaborators and HTTP surface.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crossroads_bot::{
    clients::{
        MediaResolver, TextGenerator, TrackMetadata, gemini::GeminiClient, spotify::SpotifyClient,
        ytdlp::YtDlpResolver,
    },
    config::AppConfig,
    dao::score_store::JsonFileScoreStore,
    platform::bridge::Bridge,
    routes,
    state::{AppState, Collaborators, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(err) = dotenvy::dotenv() {
        // Absent .env is the normal case in containers.
        eprintln!("no .env loaded: {err}");
    }
    init_tracing();

    let config = AppConfig::load();
    let http = reqwest::Client::builder()
        .user_agent(concat!("crossroads-bot/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("building HTTP client")?;

    let text_generator = config.gemini.clone().map(|gemini| {
        info!(model = %gemini.model, "text generation enabled");
        Arc::new(GeminiClient::new(http.clone(), gemini)) as Arc<dyn TextGenerator>
    });
    if text_generator.is_none() {
        warn!("GEMINI_API_KEY not set; quiz and ask commands are disabled");
    }
    let track_metadata = config.spotify.clone().map(|credentials| {
        Arc::new(SpotifyClient::new(http.clone(), credentials)) as Arc<dyn TrackMetadata>
    });
    if track_metadata.is_none() {
        warn!("Spotify credentials not set; track links cannot be played");
    }
    let media_resolver: Arc<dyn MediaResolver> = Arc::new(YtDlpResolver::new(
        config.ytdlp_program.clone(),
        config.resolve_timeout,
    ));
    let scores = Arc::new(JsonFileScoreStore::new(config.score_file.clone()));
    info!(path = %scores.path().display(), prefix = %config.command_prefix, "score ledger ready");

    let bridge = Arc::new(Bridge::new());
    let (app_state, scheduler) = AppState::new(
        config,
        Collaborators {
            chat: bridge.clone(),
            voice: bridge.clone(),
            scores,
            text_generator,
            track_metadata,
            media_resolver,
            bridge: Some(bridge),
        },
    );
    tokio::spawn(scheduler.run());

    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server; waiting for the platform gateway on /bridge");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    info!("shutdown requested");
}
