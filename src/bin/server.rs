use std::{env, fs::OpenOptions, net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use axum::{
    Router,
    extract::{MatchedPath, Request},
    middleware,
};
use axum_server::Handle;
use clap::{Parser, ValueEnum};
use tower_http::trace::TraceLayer;

#[cfg(debug_assertions)]
use tower_livereload::LiveReloadLayer;

use tracing_subscriber::{Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use expense_tracker::{
    AppState, PaginationConfig, RemoteConfig, StoreConfig, build_router, graceful_shutdown,
    logging_middleware, store,
};

/// Which record store to keep data in.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Backend {
    /// A local SQLite database file.
    Sqlite,
    /// A remote REST document store.
    Remote,
}

/// The web server for the expense tracker.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Where to keep users, expenses and savings goals.
    #[arg(long, value_enum, default_value_t = Backend::Sqlite)]
    backend: Backend,

    /// File path to the application SQLite database. Required for the sqlite backend.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Root URL of the remote document store. Required for the remote backend.
    #[arg(long)]
    remote_url: Option<String>,

    /// Time limit in seconds for each request to the remote store.
    #[arg(long, default_value_t = 10)]
    remote_timeout_secs: u64,

    /// The port to serve the app from.
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// The canonical name of the timezone used to decide "today" and "this month".
    #[arg(long, default_value = "Etc/UTC")]
    timezone: String,
}

impl Args {
    fn store_config(&self) -> Result<StoreConfig, String> {
        match self.backend {
            Backend::Sqlite => {
                let path = self
                    .db_path
                    .clone()
                    .ok_or("--db-path is required for the sqlite backend")?;

                Ok(StoreConfig::Sqlite { path })
            }
            Backend::Remote => {
                let base_url = self
                    .remote_url
                    .as_deref()
                    .ok_or("--remote-url is required for the remote backend")?;

                let mut config = RemoteConfig::new(base_url);
                config.auth_token = env::var("REMOTE_STORE_TOKEN").ok();
                config.timeout = Duration::from_secs(self.remote_timeout_secs);

                Ok(StoreConfig::Remote(config))
            }
        }
    }
}

#[tokio::main]
async fn main() {
    setup_logging();

    let args = Args::parse();

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));

    let secret = env::var("SECRET").expect("The environment variable 'SECRET' must be set");

    let store_config = args
        .store_config()
        .unwrap_or_else(|message| panic!("Invalid arguments: {message}"));
    let store = store::connect(store_config).expect("Could not connect to the record store.");

    let app_state = AppState::new(
        store,
        &secret,
        &args.timezone,
        PaginationConfig::default(),
    );

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = add_tracing_layer(build_router(app_state))
        .layer(middleware::from_fn(logging_middleware));

    #[cfg(debug_assertions)]
    let router = router.layer(LiveReloadLayer::new());

    tracing::info!("HTTP server listening on {}", addr);
    axum_server::bind(addr)
        .handle(handle)
        .serve(router.into_make_service())
        .await
        .expect("The server stopped unexpectedly.");
}

fn setup_logging() {
    let stdout_log = tracing_subscriber::fmt::layer().pretty();

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open("debug.log")
        .expect("Could not create log file");

    let debug_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_writer(Arc::new(log_file));

    tracing_subscriber::registry()
        .with(
            stdout_log
                .with_filter(filter::LevelFilter::INFO)
                .and_then(debug_log)
                .with_filter(filter::LevelFilter::DEBUG),
        )
        .init();
}

fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        // By default, `TraceLayer` will log 5xx responses but we're doing our specific
        // logging of errors so disable that
        .on_failure(());

    router.layer(tracing_layer)
}
