//! Postboard Server
//!
//! Users, posts and threaded comments over a REST API, with live comment
//! feeds pushed over WebSocket. Storage is the sharded in-memory store or an
//! embedded SQLite database.

mod config;
mod handlers;
mod services;
mod storage;

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use clap::Parser;
use postboard_core::ports::CommentFeed;
use postboard_core::{Comment, SubscriptionBus};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use config::Config;
use services::{CommentService, PostService, UserService};
use storage::Stores;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserService>,
    pub posts: Arc<PostService>,
    pub comments: Arc<CommentService>,
}

impl AppState {
    pub fn new(stores: Stores, feed: Arc<dyn CommentFeed>, page_size: usize) -> Self {
        let users = Arc::new(UserService::new(stores.users.clone()));
        let posts = Arc::new(PostService::new(
            stores.posts.clone(),
            stores.users.clone(),
            page_size,
        ));
        let comments = Arc::new(CommentService::new(
            stores.comments,
            stores.posts,
            stores.users,
            feed,
            page_size,
        ));
        Self {
            users,
            posts,
            comments,
        }
    }
}

#[tokio::main]
async fn main() {
    // Set up panic hook to log crashes
    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()));
        let payload = if let Some(s) = info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        eprintln!("[PANIC] at {:?}: {}", location, payload);
        tracing::error!("PANIC at {:?}: {}", location, payload);
    }));

    let config = Config::parse();

    // Initialize tracing, RUST_LOG wins over --log-level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("[FATAL] Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    info!("Starting Postboard Server v{}", env!("CARGO_PKG_VERSION"));
    info!("PID: {}", std::process::id());

    if let Err(e) = run_server(config).await {
        error!("Server failed: {:#}", e);
        std::process::exit(1);
    }
}

async fn run_server(config: Config) -> Result<()> {
    config.validate().context("Invalid configuration")?;
    info!(
        "Config loaded: bind={}, storage={}, shards={}, page_size={}",
        config.bind_address, config.storage, config.shards_count, config.page_size
    );

    info!("Initializing storage...");
    let stores = Stores::open(&config).await?;

    let feed: Arc<dyn CommentFeed> = if config.subscriber_buffer == 0 {
        info!("Live comment feeds use unbounded queues");
        Arc::new(SubscriptionBus::<Comment>::new())
    } else {
        info!(
            "Live comment feeds buffer {} comments per subscriber",
            config.subscriber_buffer
        );
        Arc::new(SubscriptionBus::<Comment>::bounded(config.subscriber_buffer))
    };

    let state = AppState::new(stores, feed, config.page_size);

    info!("Building HTTP router...");
    let app = build_router(state);

    let addr: SocketAddr = config
        .bind_address
        .parse()
        .context("Failed to parse bind address")?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!("Server ready to accept connections");
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

fn build_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // REST API routes
        .nest("/api/v1", api_routes())
        // Layers
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(handlers::users::create))
        .route(
            "/users/:id",
            get(handlers::users::get)
                .patch(handlers::users::update)
                .delete(handlers::users::delete),
        )
        .route(
            "/users/by-username/:username",
            get(handlers::users::by_username),
        )
        .route(
            "/posts",
            get(handlers::posts::list).post(handlers::posts::create),
        )
        .route(
            "/posts/:id",
            get(handlers::posts::get)
                .patch(handlers::posts::update)
                .delete(handlers::posts::delete),
        )
        .route(
            "/posts/:id/comments",
            get(handlers::comments::list_for_post).post(handlers::comments::create),
        )
        .route(
            "/posts/:id/comments/live",
            get(handlers::ws::live_comments),
        )
        .route(
            "/comments/:id",
            get(handlers::comments::get)
                .patch(handlers::comments::update)
                .delete(handlers::comments::delete),
        )
        .route("/comments/:id/replies", get(handlers::comments::replies))
}
