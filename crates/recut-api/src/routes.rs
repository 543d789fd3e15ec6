//! API routes.

use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::handlers::health::{health, ready};
use crate::handlers::media::{
    cancel_job, delete_media, enrich_media, get_candidates, get_job, get_media, get_scenes,
    get_transcript, register_media,
};
use crate::handlers::plans::{create_heuristic_plan, create_story_plan, get_plan, render_plan};
use crate::handlers::renders::get_render;
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, request_id, request_logging};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let media_routes = Router::new()
        .route("/media", post(register_media))
        .route("/media/:media_id", get(get_media))
        .route("/media/:media_id", delete(delete_media))
        .route("/media/:media_id/enrich", post(enrich_media))
        .route("/media/:media_id/transcript", get(get_transcript))
        .route("/media/:media_id/scenes", get(get_scenes))
        .route("/media/:media_id/candidates", get(get_candidates))
        .route("/media/:media_id/plans/heuristic", post(create_heuristic_plan))
        .route("/media/:media_id/plans/story", post(create_story_plan));

    let plan_routes = Router::new()
        .route("/plans/:plan_id", get(get_plan))
        .route("/plans/:plan_id/render", post(render_plan));

    let misc_routes = Router::new()
        .route("/renders/:render_id", get(get_render))
        .route("/jobs/:job_id", get(get_job))
        .route("/jobs/:job_id/cancel", post(cancel_job));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready));

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    let cors = cors_layer(&state.api_config.cors_origins);

    Router::new()
        .merge(media_routes)
        .merge(plan_routes)
        .merge(misc_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors)
        .with_state(state)
}
