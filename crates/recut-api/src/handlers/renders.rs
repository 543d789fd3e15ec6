//! Render status endpoint.

use axum::extract::{Path, State};
use axum::Json;

use recut_models::{Render, RenderId, RenderStatus};
use recut_registry::Registry;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// GET /renders/:render_id — `output_uri` is present iff Completed.
pub async fn get_render(
    State(state): State<AppState>,
    Path(render_id): Path<String>,
) -> ApiResult<Json<Render>> {
    let mut render = state
        .registry
        .get_render(&RenderId::from_string(render_id))
        .await?
        .ok_or_else(|| ApiError::not_found("render not found"))?;

    // The output becomes readable only on completion.
    if render.status != RenderStatus::Completed {
        render.output_uri = None;
    }

    Ok(Json(render))
}
