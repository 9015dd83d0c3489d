use crate::database::SqlStorageError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Failures of the board endpoints.
///
/// Storage, database and internal details are logged, never returned.
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("malformed form data: {0}")]
    InvalidForm(String),

    #[error("board does not exist")]
    BoardNotFound,

    #[error("user has no boards")]
    NoBoards,

    #[error("user has no pinned boards")]
    NoPinnedBoards,

    #[error("user not found")]
    Unauthorized,

    #[error("object storage error: {0}")]
    Storage(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl BoardError {
    pub fn status(&self) -> StatusCode {
        match self {
            BoardError::MissingField(_)
            | BoardError::InvalidImage(_)
            | BoardError::InvalidForm(_)
            | BoardError::NoPinnedBoards => StatusCode::BAD_REQUEST,
            BoardError::BoardNotFound | BoardError::NoBoards => StatusCode::NOT_FOUND,
            BoardError::Unauthorized => StatusCode::UNAUTHORIZED,
            BoardError::Storage(_) | BoardError::Database(_) | BoardError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable message code clients switch on.
    pub fn code(&self) -> &'static str {
        match self {
            BoardError::MissingField(_) => "KEY_ERROR",
            BoardError::InvalidImage(_) => "INVALID_IMAGE",
            BoardError::InvalidForm(_) => "INVALID_FORM",
            BoardError::BoardNotFound => "DOES_NOT_EXIST",
            BoardError::NoBoards => "NO_BOARDS",
            BoardError::NoPinnedBoards => "NO_PIN",
            BoardError::Unauthorized => "UNAUTHORIZED",
            BoardError::Storage(_) | BoardError::Database(_) | BoardError::Internal(_) => {
                "INTERNAL_ERROR"
            }
        }
    }
}

impl From<SqlStorageError> for BoardError {
    fn from(e: SqlStorageError) -> Self {
        BoardError::Database(e.to_string())
    }
}

impl IntoResponse for BoardError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            BoardError::MissingField(field) => json!({ "message": self.code(), "field": field }),
            BoardError::NoPinnedBoards => json!({ "message": self.code(), "pinned_boards": [] }),
            BoardError::Storage(_) | BoardError::Database(_) | BoardError::Internal(_) => {
                tracing::error!(error = %self, "Board request failed");
                json!({ "message": self.code() })
            }
            _ => json!({ "message": self.code() }),
        };
        (status, Json(body)).into_response()
    }
}
