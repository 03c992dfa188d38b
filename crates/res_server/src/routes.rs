//! HTTP routes over a shared reservoir.
//!
//! Every route is a POST. The context lock is held only for the in-memory operation; snapshot
//! writes happen afterwards on the blocking pool.

use crate::{
    error::{Result, ServerError},
    state::AppState,
};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::post,
};
use res_context::{ContextError, NdArray};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/read/:key", post(read_scalar))
        .route("/read/:key/*shape", post(read))
        .route("/write/:key", post(write))
        .route("/step", post(step))
        .route("/reset", post(reset))
        .route("/save", post(save))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Parses `2/3/4` into `[2, 3, 4]`. A trailing slash is tolerated.
pub fn parse_shape(path: &str) -> Result<Vec<usize>> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            segment
                .parse()
                .map_err(|_| ServerError::BadShape(segment.to_owned()))
        })
        .collect()
}

async fn read_scalar(State(state): State<AppState>, Path(key): Path<String>) -> Result<Json<Value>> {
    let array = state.context().read(&key, &[])?;
    Ok(Json(array.to_json()))
}

async fn read(
    State(state): State<AppState>,
    Path((key, shape)): Path<(String, String)>,
) -> Result<Json<Value>> {
    let shape = parse_shape(&shape)?;
    let array = state.context().read(&key, &shape)?;
    Ok(Json(array.to_json()))
}

// The body is parsed whatever its content type.
async fn write(
    State(state): State<AppState>,
    Path(key): Path<String>,
    body: Bytes,
) -> Result<StatusCode> {
    let value: Value = serde_json::from_slice(&body)?;
    let array = NdArray::from_json(&value).map_err(ContextError::from)?;
    state.context().write(&key, &array)?;
    Ok(StatusCode::OK)
}

async fn step(State(state): State<AppState>) -> Result<Json<Value>> {
    let (steps, pending) = {
        let mut ctx = state.context();
        let due = ctx.step();
        let pending = due.and_then(|snapshot| state.pending(&ctx, snapshot));
        (ctx.steps(), pending)
    };
    if let Some(pending) = pending {
        state.write(pending).await?;
    }
    Ok(Json(json!({ "steps": steps })))
}

async fn reset(State(state): State<AppState>) -> StatusCode {
    state.context().reset();
    StatusCode::OK
}

async fn save(State(state): State<AppState>) -> Result<StatusCode> {
    state.save().await?;
    Ok(StatusCode::OK)
}
