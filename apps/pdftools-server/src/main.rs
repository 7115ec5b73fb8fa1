//! pdftools conversion server
//!
//! Hosts the spreadsheet-to-PDF endpoint the Excel page posts to. The
//! browser never sees the service key: it sends the file as base64 JSON and
//! gets the converted PDF back as a download.
//!
//! ## Endpoints
//!
//! - `GET /health`
//! - `POST /api/excel-to-pdf`

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use clap::Parser;
use pdftools_core::conversion::{ConversionConfig, API_KEY_ENV};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod api;
mod error;

use api::{handle_excel_to_pdf, handle_health};

/// Command-line arguments for the conversion server
#[derive(Parser, Debug)]
#[command(name = "pdftools-server")]
#[command(about = "Spreadsheet to PDF conversion endpoint")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Base URL of the conversion service API
    #[arg(long, default_value = "https://api.cloudconvert.com/v2")]
    api_base: String,

    /// Environment variable the service key is read from on every request
    #[arg(long, default_value = API_KEY_ENV)]
    api_key_env: String,

    /// Status polls before a conversion is abandoned
    #[arg(long, default_value = "60")]
    max_attempts: u32,

    /// Pause before each status poll, in milliseconds
    #[arg(long, default_value = "1000")]
    poll_interval_ms: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: ConversionConfig,
    /// Name of the variable holding the key, never the key itself
    pub api_key_env: String,
}

/// Build the router with all routes and middleware
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/api/excel-to-pdf", post(handle_excel_to_pdf))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let state = AppState {
        config: ConversionConfig {
            api_base: args.api_base,
            poll_interval: Duration::from_millis(args.poll_interval_ms),
            max_attempts: args.max_attempts,
            ..ConversionConfig::default()
        },
        api_key_env: args.api_key_env,
    };

    if std::env::var(&state.api_key_env).is_err() {
        // Not fatal: the key is read per request and may be set later
        tracing::warn!("{} is not set; conversions will fail", state.api_key_env);
    }

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server listening on http://{}", addr);
    info!(
        "Conversion service: {} ({} polls every {}ms)",
        state.config.api_base, state.config.max_attempts, args.poll_interval_ms
    );

    axum::serve(listener, app(state)).await?;

    Ok(())
}
