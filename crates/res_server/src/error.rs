use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use res_context::ContextError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid shape segment `{0}`")]
    BadShape(String),

    #[error("Invalid JSON body: {0}")]
    BadBody(#[from] serde_json::Error),

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error("Snapshot task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, ServerError>;

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::BadShape(_) | ServerError::BadBody(_) => StatusCode::BAD_REQUEST,
            ServerError::Context(ContextError::Array(_) | ContextError::ShapeTooLarge { .. }) => {
                StatusCode::BAD_REQUEST
            }
            ServerError::Context(ContextError::NoModelPath) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
