/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use planboard_api::{app::AppState, config::Config};
/// use planboard_shared::services::chat::LoggingChatNotifier;
/// use planboard_shared::services::Planboard;
/// use planboard_shared::store::MemoryStore;
/// use std::sync::Arc;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let board = Planboard::new(
///     Arc::new(MemoryStore::new()),
///     Arc::new(LoggingChatNotifier),
///     config.side_effects,
/// );
/// let app = planboard_api::app::build_router(AppState::new(board, config));
/// # Ok(())
/// # }
/// ```

use crate::config::Config;
use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{delete, get, post},
    Router,
};
use planboard_shared::auth::middleware::create_jwt_middleware;
use planboard_shared::services::Planboard;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// The engine every handler delegates to
    pub board: Planboard,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(board: Planboard, config: Config) -> Self {
        Self {
            board,
            config: Arc::new(config),
        }
    }

    /// Owned copy of the token signing secret
    pub fn jwt_secret(&self) -> String {
        self.config.jwt.secret.clone()
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                              # Store connectivity (public)
/// └── /v1/                                 # Bearer token required
///     ├── /projects                        # GET list, POST create
///     │   └── /:id                         # GET, PATCH, DELETE
///     │       ├── /collaborators           # GET list, POST add
///     │       │   └── /:user_id            # DELETE
///     │       ├── /tasks                   # GET list, POST create
///     │       ├── /stats                   # GET live task counts
///     │       └── /activities              # GET project feed
///     ├── /tasks                           # GET my tasks
///     │   ├── /urgent                      # GET
///     │   └── /:id                         # GET, PATCH, DELETE
///     │       └── /comments                # GET list, POST add
///     ├── /notifications                   # GET inbox
///     │   ├── /unread-count                # GET
///     │   ├── /read-all                    # POST
///     │   └── /:id                         # DELETE
///     │       └── /read                    # POST
///     └── /activities/me                   # GET my feed
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Authentication (everything under `/v1`)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let project_routes = Router::new()
        .route(
            "/",
            get(routes::projects::list_projects).post(routes::projects::create_project),
        )
        .route(
            "/:id",
            get(routes::projects::get_project)
                .patch(routes::projects::update_project)
                .delete(routes::projects::delete_project),
        )
        .route(
            "/:id/collaborators",
            get(routes::projects::list_collaborators).post(routes::projects::add_collaborator),
        )
        .route(
            "/:id/collaborators/:user_id",
            delete(routes::projects::remove_collaborator),
        )
        .route(
            "/:id/tasks",
            get(routes::tasks::list_project_tasks).post(routes::tasks::create_task),
        )
        .route("/:id/stats", get(routes::tasks::task_stats))
        .route("/:id/activities", get(routes::activities::list_project_activities));

    let task_routes = Router::new()
        .route("/", get(routes::tasks::list_my_tasks))
        .route("/urgent", get(routes::tasks::urgent_tasks))
        .route(
            "/:id",
            get(routes::tasks::get_task)
                .patch(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route(
            "/:id/comments",
            get(routes::tasks::list_comments).post(routes::tasks::add_comment),
        );

    let notification_routes = Router::new()
        .route("/", get(routes::notifications::list_notifications))
        .route("/unread-count", get(routes::notifications::unread_count))
        .route("/read-all", post(routes::notifications::mark_all_read))
        .route("/:id", delete(routes::notifications::delete_notification))
        .route("/:id/read", post(routes::notifications::mark_read));

    let activity_routes =
        Router::new().route("/me", get(routes::activities::list_my_activities));

    // Build complete v1 API, all of it behind the bearer token check
    let v1_routes = Router::new()
        .nest("/projects", project_routes)
        .nest("/tasks", task_routes)
        .nest("/notifications", notification_routes)
        .nest("/activities", activity_routes)
        .layer(middleware::from_fn(create_jwt_middleware(state.jwt_secret())));

    let cors = if state.config.allows_any_origin() {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}
