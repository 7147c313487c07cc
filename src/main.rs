use std::net::SocketAddr;

use tower_http::trace::TraceLayer;
use tower_sessions::{MemoryStore, SessionManagerLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use reqctx::config::Config;
use reqctx::error::Result;
use reqctx::middleware::telemetry;
use reqctx::{db, routes, templates, AppState};

#[tokio::main]
async fn main() {
    // Load variables from .env
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reqctx=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run(Config::from_env()).await {
        tracing::error!("Startup failed: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<()> {
    tracing::info!("Connecting to database: {}", config.database_url);
    let db_pool = db::init_db(&config.database_url).await?;
    tracing::info!("SQLite database ready");

    let tera = templates::load(&config.templates_dir, &config.error_template)?;
    let addr: SocketAddr = config.bind_address().parse()?;

    let metrics_addr = match &config.metrics_addr {
        Some(addr) => Some(telemetry::install_prometheus_exporter(addr)?),
        None => None,
    };

    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(config.env.is_production());

    tracing::info!("========================================");
    tracing::info!("  reqctx v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("========================================");
    tracing::info!("Server: http://{}{}", addr, config.app_sub_url);
    tracing::info!("Environment: {:?}", config.env);
    match metrics_addr {
        Some(addr) => tracing::info!("Metrics: http://{}/metrics", addr),
        None => tracing::info!("Metrics: disabled"),
    }
    if config.anonymous_enabled {
        tracing::info!(
            "Anonymous access: enabled (org {}, role {})",
            config.anonymous_org_id,
            config.anonymous_org_role
        );
    } else {
        tracing::info!("Anonymous access: disabled");
    }

    let state = AppState::new(config, db_pool, tera);
    let app = routes::create_router(state)
        .layer(session_layer)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
