pub mod api;
pub mod client;
pub mod config;
pub mod entities;
pub mod infrastructure;
pub mod services;
pub mod utils;

use crate::config::ShareConfig;
use crate::services::share_service::ShareService;
use crate::services::storage::CiphertextStore;
use crate::services::sweeper::ExpirationSweeper;
use axum::{
    Router,
    http::HeaderValue,
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::files::upload_file,
        api::handlers::files::file_info,
        api::handlers::files::download_file,
        api::handlers::files::list_files,
        api::handlers::files::file_stats,
        api::handlers::files::delete_file,
        api::handlers::files::file_logs,
        api::handlers::maintenance::trigger_sweep,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            api::handlers::files::UploadForm,
            api::handlers::files::DownloadRequest,
            api::handlers::files::DownloadResponse,
            api::handlers::files::AccessLogResponse,
            api::handlers::maintenance::SweepResponse,
            api::handlers::health::HealthResponse,
            services::share_service::UploadReceipt,
            services::share_service::FileInfo,
            services::share_service::OwnerStats,
            services::sweeper::SweepReport,
            services::sweeper::SweepFailure,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "files", description = "Encrypted file sharing endpoints"),
        (name = "maintenance", description = "Expiration sweeps"),
        (name = "system", description = "Health")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "jwt",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub storage: Arc<dyn CiphertextStore>,
    pub shares: Arc<ShareService>,
    pub sweeper: Arc<ExpirationSweeper>,
    pub config: ShareConfig,
}

impl AppState {
    /// Wire the services over one database and one ciphertext store.
    pub fn new(db: DatabaseConnection, storage: Arc<dyn CiphertextStore>, config: ShareConfig) -> Self {
        let shares = Arc::new(ShareService::new(db.clone(), storage.clone(), config.clone()));
        let sweeper = Arc::new(ExpirationSweeper::new(db.clone(), storage.clone()));
        Self {
            db,
            storage,
            shares,
            sweeper,
            config,
        }
    }
}

fn cors_layer(config: &ShareConfig) -> CorsLayer {
    let origin = if config.allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(Any)
}

pub fn create_app(state: AppState) -> Router {
    let auth_state = state.clone();
    let require_auth =
        move || from_fn_with_state(auth_state.clone(), api::middleware::auth::require_auth);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", get(api::handlers::health::health_check))
        .route(
            "/api/files/upload",
            post(api::handlers::files::upload_file).layer(from_fn_with_state(
                state.clone(),
                api::middleware::auth::optional_auth,
            )),
        )
        .route("/api/files/info/:id", get(api::handlers::files::file_info))
        .route(
            "/api/files/download/:id",
            post(api::handlers::files::download_file).get(api::handlers::files::download_file),
        )
        .route(
            "/api/files",
            get(api::handlers::files::list_files).layer(require_auth()),
        )
        .route(
            "/api/files/stats",
            get(api::handlers::files::file_stats).layer(require_auth()),
        )
        .route(
            "/api/files/:id",
            delete(api::handlers::files::delete_file).layer(require_auth()),
        )
        .route(
            "/api/files/:id/logs",
            get(api::handlers::files::file_logs).layer(require_auth()),
        )
        .route(
            "/api/maintenance/sweep",
            post(api::handlers::maintenance::trigger_sweep).layer(require_auth()),
        )
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .layer(cors_layer(&state.config))
        .layer(axum::extract::DefaultBodyLimit::max(
            state.config.max_file_size + 10 * 1024 * 1024, // multipart overhead
        ))
        .with_state(state)
}
