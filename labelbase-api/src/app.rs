/// Application state and router builder
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                       # health check (public)
/// └── /v1/
///     ├── /auth/                    # register, login, refresh (public)
///     ├── /users/                   # user directory (authenticated)
///     ├── /projects/                # projects + memberships + dataset listing
///     ├── /datasets/                # datasets + memberships + image upload
///     ├── /images/                  # image records, payloads, objects
///     ├── /objects/                 # image objects + points
///     └── /points/                  # object points
/// ```
///
/// Everything under `/v1` except `/v1/auth` sits behind the JWT middleware,
/// which resolves the acting user; each handler then asks the core
/// authorizer before calling into the lifecycle manager.

use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Router,
};
use labelbase_core::authz::Authorizer;
use labelbase_core::lifecycle::Lifecycle;
use labelbase_core::store::Stores;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::auth::middleware::require_auth;
use crate::config::Config;
use crate::routes;

/// Shared application state
///
/// Cloned per request handler via axum's `State` extractor; all fields are
/// cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool (health checks)
    pub db: PgPool,

    /// Store adapter bundle
    pub stores: Stores,

    /// Lifecycle manager
    pub lifecycle: Lifecycle,

    /// Authorization resolver
    pub authz: Authorizer,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates application state over a connection pool
    pub fn new(db: PgPool, stores: Stores, config: Config) -> Self {
        let lifecycle = Lifecycle::new(stores.clone()).with_bulk_policy(config.bulk_delete_policy);
        let authz = Authorizer::new(stores.clone());
        Self {
            db,
            stores,
            lifecycle,
            authz,
            config: Arc::new(config),
        }
    }
}

/// Builds the complete axum router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    // Public: health + authentication
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh));

    // Authenticated API
    let user_routes = Router::new()
        .route("/", get(routes::users::list_users))
        .route("/:id", get(routes::users::get_user))
        .route("/:id", delete(routes::users::delete_user))
        .route("/:id/username", put(routes::users::update_username))
        .route("/:id/email", put(routes::users::update_email))
        .route("/:id/password", put(routes::users::update_password))
        .route("/:id/role", put(routes::users::update_role));

    let project_routes = Router::new()
        .route("/", post(routes::projects::create_project))
        .route("/", get(routes::projects::list_projects))
        .route("/owner/:user_id", get(routes::projects::list_projects_by_owner))
        .route("/:id", get(routes::projects::get_project))
        .route("/:id", put(routes::projects::update_project))
        .route("/:id", delete(routes::projects::delete_project))
        .route("/:id/members", get(routes::projects::list_members))
        .route("/:id/members", post(routes::projects::add_member))
        .route("/:id/members/:user_id", put(routes::projects::update_member_role))
        .route("/:id/members/:user_id", delete(routes::projects::remove_member))
        .route("/:id/datasets", get(routes::datasets::list_datasets_of_project))
        .route("/:id/datasets", delete(routes::datasets::delete_datasets_of_project));

    let dataset_routes = Router::new()
        .route("/", post(routes::datasets::create_dataset))
        .route("/:id", get(routes::datasets::get_dataset))
        .route("/:id", put(routes::datasets::update_dataset))
        .route("/:id", delete(routes::datasets::delete_dataset))
        .route("/:id/clear", post(routes::datasets::clear_dataset))
        .route("/:id/members", get(routes::datasets::list_members))
        .route("/:id/members", post(routes::datasets::add_member))
        .route("/:id/members/:user_id", put(routes::datasets::update_member_role))
        .route("/:id/members/:user_id", delete(routes::datasets::remove_member))
        .route("/:id/images", get(routes::images::list_images_of_dataset))
        .route("/:id/images", post(routes::images::upload_image));

    let image_routes = Router::new()
        .route("/", get(routes::images::search_images))
        .route("/:id", get(routes::images::get_image))
        .route("/:id", delete(routes::images::delete_image))
        .route("/:id/data", get(routes::images::get_image_data))
        .route("/:id/objects", get(routes::images::list_objects))
        .route("/:id/objects", post(routes::images::create_object));

    let object_routes = Router::new()
        .route("/:id", get(routes::images::get_object))
        .route("/:id", put(routes::images::update_object))
        .route("/:id", delete(routes::images::delete_object))
        .route("/:id/points", get(routes::images::list_points))
        .route("/:id/points", post(routes::images::create_point));

    let point_routes = Router::new().route("/:id", delete(routes::images::delete_point));

    let protected = Router::new()
        .nest("/users", user_routes)
        .nest("/projects", project_routes)
        .nest("/datasets", dataset_routes)
        .nest("/images", image_routes)
        .nest("/objects", object_routes)
        .nest("/points", point_routes)
        .layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(health_routes)
        .nest("/v1/auth", auth_routes)
        .nest("/v1", protected)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}
