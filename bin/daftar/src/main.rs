//! Daftar - blog catalog server and list browser.
//!
//! # Usage
//!
//! ```bash
//! # Start the GraphQL server with default config
//! daftar
//!
//! # Start against an in-memory store with demo data
//! daftar serve --in-memory
//!
//! # Page through categories of a running server
//! daftar browse --kind category --name web --pages 2
//! ```

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{TimeDelta, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::signal;
use tokio::sync::watch;
use tracing::{Instrument, debug, error, info, info_span, warn};
use tracing_subscriber::{EnvFilter, fmt};
use url::Url;

use daftar_client::{
    FetchOutcome, GraphqlPageSource, InfiniteList, ListView, LoadTrigger, Viewport, WindowOptions,
};
use daftar_core::metrics::init_metrics;
use daftar_core::models::{EntityInput, EntityKind};
use daftar_core::ports::{EntityFilter, Repositories};
use daftar_core::services::{CatalogService, ProfileService};
use daftar_graphql::{ServerConfig, Viewer, build_schema, serve_with_shutdown};
use daftar_storage::{Database, DatabaseConfig, MemoryRepositories, PgRepositories};

/// Daftar CLI - blog catalog server.
#[derive(Parser, Debug)]
#[command(name = "daftar")]
#[command(about = "Daftar - blog catalog GraphQL server and list browser")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Server options when no subcommand is given.
    #[command(flatten)]
    serve: ServeArgs,

    /// Enable JSON log output.
    #[arg(long, env = "JSON_LOGS", global = true)]
    json_logs: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the GraphQL server (default).
    Serve(ServeArgs),
    /// Page through a running server's categories or tags.
    Browse(BrowseArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// PostgreSQL database URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost/daftar"
    )]
    database_url: String,

    /// GraphQL server port.
    #[arg(long, env = "GRAPHQL_PORT", default_value = "4000")]
    graphql_port: u16,

    /// Prometheus metrics port.
    #[arg(long, env = "METRICS_PORT", default_value = "9090")]
    metrics_port: u16,

    /// Id of the user the admin session acts as.
    #[arg(long, env = "ADMIN_USER_ID", default_value = "admin")]
    admin_user_id: String,

    /// Use an in-memory store seeded with demo data instead of PostgreSQL.
    #[arg(long)]
    in_memory: bool,

    /// Run database migrations and exit.
    #[arg(long)]
    migrate_only: bool,
}

#[derive(Args, Debug)]
struct BrowseArgs {
    /// GraphQL endpoint of a running server.
    #[arg(long, env = "DAFTAR_ENDPOINT", default_value = "http://localhost:4000/graphql")]
    endpoint: Url,

    /// Which list to page through.
    #[arg(long, value_enum, default_value = "category")]
    kind: KindArg,

    /// Substring the name must contain.
    #[arg(long)]
    name: Option<String>,

    /// Substring the title must contain.
    #[arg(long)]
    title: Option<String>,

    /// Page size.
    #[arg(long, default_value = "10")]
    limit: u32,

    /// Number of pages to load before rendering.
    #[arg(long, default_value = "1")]
    pages: usize,

    /// Scroll offset of the viewport.
    #[arg(long, default_value = "0")]
    offset: u64,

    /// Viewport height.
    #[arg(long, default_value = "600")]
    viewport: u64,

    /// Estimated row height.
    #[arg(long, default_value = "100")]
    row_height: NonZeroU32,

    /// Extra rows rendered on each side of the viewport.
    #[arg(long, default_value = "5")]
    overscan: usize,

    /// Fetch the next page when the viewport reaches the end of the loaded rows.
    #[arg(long)]
    auto_load: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KindArg {
    Category,
    Tag,
}

impl From<KindArg> for EntityKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Category => EntityKind::Category,
            KindArg::Tag => EntityKind::Tag,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.json_logs);

    match cli.command {
        Some(Command::Browse(args)) => browse(args).await,
        Some(Command::Serve(args)) => serve(args).await,
        None => serve(cli.serve).await,
    }
}

// =============================================================================
// serve
// =============================================================================

async fn serve(args: ServeArgs) -> Result<()> {
    // Prometheus metrics exporter (optional - failures don't crash the app)
    let metrics_enabled = match format!("0.0.0.0:{}", args.metrics_port).parse::<std::net::SocketAddr>() {
        Ok(metrics_addr) => {
            match PrometheusBuilder::new()
                .with_http_listener(metrics_addr)
                .install()
            {
                Ok(()) => {
                    init_metrics();
                    true
                }
                Err(e) => {
                    warn!("⚠️  Failed to start metrics exporter: {}. Continuing without metrics.", e);
                    false
                }
            }
        }
        Err(e) => {
            warn!("⚠️  Invalid metrics address: {}. Continuing without metrics.", e);
            false
        }
    };

    // ─────────────────────────────────────────────────────────────────────────
    // 🚀 STARTUP
    // ─────────────────────────────────────────────────────────────────────────
    info!("🚀 Starting Daftar");

    // ─────────────────────────────────────────────────────────────────────────
    // 🗄️ STORE
    // ─────────────────────────────────────────────────────────────────────────
    let (repositories, db): (Arc<dyn Repositories>, Option<Arc<Database>>) = if args.in_memory {
        let memory = Arc::new(MemoryRepositories::new());
        seed_demo(&memory).await.context("Failed to seed demo data")?;
        info!("🗄️  In-memory store ready (demo data loaded)");
        let repos: Arc<dyn Repositories> = memory;
        (repos, None)
    } else {
        debug!(database_url = %mask_password(&args.database_url), "Database endpoint");
        info!("🗄️  Connecting to database...");
        let db = Database::connect(&DatabaseConfig::for_server(&args.database_url))
            .await
            .context("Failed to connect to database")?;

        db.migrate().await.context("Failed to run migrations")?;
        info!("🗄️  Database ready (migrations applied)");

        if args.migrate_only {
            info!("🛑 --migrate-only flag set, exiting");
            db.close().await;
            return Ok(());
        }

        let db = Arc::new(db);
        let repos: Arc<dyn Repositories> = Arc::new(PgRepositories::new(db.clone()));
        (repos, Some(db))
    };

    ProfileService::new(repositories.clone())
        .ensure_user(&args.admin_user_id)
        .await
        .context("Failed to register admin user")?;
    debug!(user = %args.admin_user_id, "Admin session user");

    // ─────────────────────────────────────────────────────────────────────────
    // ⚡ SERVER START
    // ─────────────────────────────────────────────────────────────────────────
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    let graphql_config = ServerConfig {
        host: "0.0.0.0".to_string(),
        port: args.graphql_port,
        enable_playground: true,
    };

    let schema = build_schema(repositories, Viewer(args.admin_user_id.clone()));
    let graphql_handle = tokio::spawn(
        async move {
            let shutdown_signal = async move {
                while !*shutdown_rx.borrow() {
                    if shutdown_rx.changed().await.is_err() {
                        break;
                    }
                }
            };

            if let Err(e) = serve_with_shutdown(schema, graphql_config, shutdown_signal).await {
                error!(error = %e, "❌ Server error");
            }
            debug!("Server stopped");
        }
        .instrument(info_span!("graphql")),
    );

    // ─────────────────────────────────────────────────────────────────────────
    // ✅ READY
    // ─────────────────────────────────────────────────────────────────────────
    info!("✅ Daftar ready");
    info!("   ⚡ GraphQL:  http://localhost:{}/graphql", args.graphql_port);
    if metrics_enabled {
        info!("   📊 Metrics:  http://localhost:{}/metrics", args.metrics_port);
    } else {
        info!("   📊 Metrics:  disabled");
    }
    info!("   Press Ctrl+C to stop");

    shutdown_signal().await;

    // ─────────────────────────────────────────────────────────────────────────
    // 🛑 SHUTDOWN
    // ─────────────────────────────────────────────────────────────────────────
    info!("🛑 Shutting down...");
    let _ = shutdown_tx.send(true);

    match tokio::time::timeout(Duration::from_secs(10), graphql_handle).await {
        Ok(_) => debug!("GraphQL stopped"),
        Err(_) => warn!("⚠️  GraphQL shutdown timed out"),
    }

    if let Some(db) = db {
        db.close().await;
    }

    info!("🛑 Shutdown complete");
    Ok(())
}

/// Load a small Persian catalog into the in-memory store.
async fn seed_demo(repos: &Arc<MemoryRepositories>) -> Result<()> {
    let catalog = CatalogService::new(repos.clone());

    let categories = [
        ("programming", "برنامه‌نویسی"),
        ("web-dev", "توسعه وب"),
        ("rust", "راست"),
        ("databases", "پایگاه داده"),
        ("devops", "دواپس"),
        ("webassembly", "وب‌اسمبلی"),
        ("security", "امنیت"),
        ("design", "طراحی"),
        ("career", "مسیر شغلی"),
        ("linux", "لینوکس"),
        ("networking", "شبکه"),
        ("books", "کتاب"),
    ];
    for (name, title) in categories {
        catalog.create(EntityKind::Category, EntityInput::new(name, title)).await?;
    }

    for (name, title) in [("async", "ناهمگام"), ("tutorial", "آموزش"), ("graphql", "گراف‌کیوال")] {
        catalog.create(EntityKind::Tag, EntityInput::new(name, title)).await?;
    }

    let now = Utc::now();
    repos
        .add_post(
            "tokio-basics",
            "آشنایی با توکیو",
            now - TimeDelta::days(30),
            &["rust", "programming"],
            &["async", "tutorial"],
        )
        .await?;
    repos
        .add_post(
            "graphql-in-rust",
            "گراف‌کیوال در راست",
            now - TimeDelta::days(7),
            &["rust", "web-dev"],
            &["graphql"],
        )
        .await?;

    Ok(())
}

// =============================================================================
// browse
// =============================================================================

async fn browse(args: BrowseArgs) -> Result<()> {
    let kind = EntityKind::from(args.kind);
    debug!(endpoint = %args.endpoint, kind = kind.as_str(), "Browsing");

    let source = GraphqlPageSource::new(args.endpoint);
    let list = InfiniteList::new(source, kind, args.limit).context("Invalid page size")?;
    let view = ListView::new(
        list,
        WindowOptions {
            estimate_size: args.row_height,
            overscan: args.overscan,
            trigger: if args.auto_load {
                LoadTrigger::Auto
            } else {
                LoadTrigger::Manual
            },
        },
    );

    view.set_filter(EntityFilter::new(args.name, args.title))
        .await
        .context("Failed to load first page")?;

    while view.list().read(|state| state.pages().len()).await < args.pages {
        match view.load_more().await.context("Failed to load page")? {
            FetchOutcome::Appended { has_more: true, .. } => {}
            _ => break,
        }
    }

    let frame = view.render(Viewport::new(args.offset, args.viewport)).await?;

    println!(
        "{} {} loaded, total height {}",
        frame.total_count,
        kind.table(),
        frame.total_size
    );
    for row in &frame.rows {
        println!(
            "{:>5} {:>7}  #{:<5} {:<20} {}",
            row.index, row.start, row.entity.id, row.entity.name, row.entity.title
        );
    }
    if frame.show_load_more {
        println!("... more available (--pages {})", args.pages + 1);
    }
    Ok(())
}

// =============================================================================
// Helpers
// =============================================================================

/// Initialize tracing subscriber.
fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        fmt().with_env_filter(filter).json().init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .init();
    }
}

/// Mask password in database URL for logging.
fn mask_password(url_str: &str) -> String {
    match Url::parse(url_str) {
        Ok(mut url) => {
            if url.password().is_some() {
                let _ = url.set_password(Some("****"));
            }
            url.to_string()
        }
        Err(_) => url_str.to_string(),
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
