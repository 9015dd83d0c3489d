//! Handlers for `/boards/*`.

use super::error::BoardError;
use super::service;
use super::types::{
    BoardIdRequest, BoardListQuery, BoardUpload, CommentCreateRequest, CreateBoardResponse,
    CreateCommentResponse, MessageResponse, PinListQuery, PinnedBoardsResponse, TagsResponse,
    TogglePinResponse,
};
use crate::config::Config;
use crate::database::{PinToggle, SqlStorage};
use crate::state::AppState;
use crate::storage::FileStorage;
use crate::users::{RequireAuth, UserStorage};
use axum::{
    Json,
    extract::{Extension, Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

const CREATE_SUCCESS: &str = "CREATE_SUCCESS";

/// List boards with optional tag and keyword filters.
///
/// GET /boards
#[tracing::instrument(skip(state))]
pub async fn list<S, U, F>(
    State(state): State<AppState<S, U, F>>,
    Query(query): Query<BoardListQuery>,
) -> Result<impl IntoResponse, BoardError>
where
    S: SqlStorage,
    U: UserStorage,
    F: FileStorage,
{
    let boards = service::list_boards(&state.sql_storage, query).await?;
    Ok(Json(MessageResponse::new(boards)))
}

/// Create a board from a multipart form.
///
/// POST /boards
#[tracing::instrument(skip_all, fields(username = auth.username()))]
pub async fn create<S, U, F>(
    State(state): State<AppState<S, U, F>>,
    Extension(config): Extension<Config>,
    auth: RequireAuth,
    multipart: Multipart,
) -> Result<impl IntoResponse, BoardError>
where
    S: SqlStorage,
    U: UserStorage,
    F: FileStorage,
{
    let owner = service::resolve_user(&state.user_storage, auth.username()).await?;
    let board = service::validate_upload(read_board_upload(multipart).await?)?;

    let summary = service::create_board(
        &state.sql_storage,
        &state.file_storage,
        config.board_defaults(),
        &owner,
        board,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateBoardResponse {
            message: CREATE_SUCCESS.to_owned(),
            board: summary,
        }),
    ))
}

async fn read_board_upload(mut multipart: Multipart) -> Result<BoardUpload, BoardError> {
    let mut upload = BoardUpload::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| BoardError::InvalidForm(e.to_string()))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("filename") => {
                upload.file_name = field.file_name().map(str::to_owned);
                upload.content_type = field.content_type().map(str::to_owned);
                upload.content = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| BoardError::InvalidForm(e.to_string()))?
                        .to_vec(),
                );
            }
            Some(key @ ("title" | "description" | "source")) => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| BoardError::InvalidForm(e.to_string()))?;
                match key {
                    "title" => upload.title = Some(value),
                    "description" => upload.description = Some(value),
                    _ => upload.source = Some(value),
                }
            }
            _ => {}
        }
    }

    Ok(upload)
}

/// Pin a board, or unpin it when already pinned.
///
/// POST /boards/pin
#[tracing::instrument(skip_all, fields(username = auth.username(), board_id = payload.board_id))]
pub async fn toggle_pin<S, U, F>(
    State(state): State<AppState<S, U, F>>,
    auth: RequireAuth,
    Json(payload): Json<BoardIdRequest>,
) -> Result<impl IntoResponse, BoardError>
where
    S: SqlStorage,
    U: UserStorage,
    F: FileStorage,
{
    let user = service::resolve_user(&state.user_storage, auth.username()).await?;

    let response = match service::toggle_pin(&state.sql_storage, &user, payload.board_id).await? {
        PinToggle::Created => (
            StatusCode::CREATED,
            Json(TogglePinResponse {
                message: CREATE_SUCCESS.to_owned(),
                created: true,
            }),
        ),
        PinToggle::Removed => (
            StatusCode::OK,
            Json(TogglePinResponse {
                message: "NO_CONTENTS".to_owned(),
                created: false,
            }),
        ),
    };
    Ok(response)
}

/// GET /boards/pin
#[tracing::instrument(skip_all, fields(username = auth.username()))]
pub async fn pinned<S, U, F>(
    State(state): State<AppState<S, U, F>>,
    auth: RequireAuth,
    Query(query): Query<PinListQuery>,
) -> Result<impl IntoResponse, BoardError>
where
    S: SqlStorage,
    U: UserStorage,
    F: FileStorage,
{
    let user = service::resolve_user(&state.user_storage, auth.username()).await?;
    let pinned_boards = service::pinned_boards(&state.sql_storage, &user, query).await?;
    Ok(Json(PinnedBoardsResponse { pinned_boards }))
}

/// GET /boards/board/me
#[tracing::instrument(skip_all, fields(username = auth.username()))]
pub async fn mine<S, U, F>(
    State(state): State<AppState<S, U, F>>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, BoardError>
where
    S: SqlStorage,
    U: UserStorage,
    F: FileStorage,
{
    let user = service::resolve_user(&state.user_storage, auth.username()).await?;
    let boards = service::my_boards(&state.sql_storage, &user).await?;
    Ok(Json(MessageResponse::new(boards)))
}

/// Delete a board and return the caller's remaining boards.
///
/// DELETE /boards/board/me
#[tracing::instrument(skip_all, fields(username = auth.username(), board_id = payload.board_id))]
pub async fn delete<S, U, F>(
    State(state): State<AppState<S, U, F>>,
    auth: RequireAuth,
    Json(payload): Json<BoardIdRequest>,
) -> Result<impl IntoResponse, BoardError>
where
    S: SqlStorage,
    U: UserStorage,
    F: FileStorage,
{
    let user = service::resolve_user(&state.user_storage, auth.username()).await?;
    let remaining = service::delete_board(
        &state.sql_storage,
        &state.file_storage,
        &user,
        payload.board_id,
    )
    .await?;
    Ok(Json(MessageResponse::new(remaining)))
}

/// GET /boards/{board_id}
#[tracing::instrument(skip(state))]
pub async fn detail<S, U, F>(
    State(state): State<AppState<S, U, F>>,
    Path(board_id): Path<i64>,
) -> Result<impl IntoResponse, BoardError>
where
    S: SqlStorage,
    U: UserStorage,
    F: FileStorage,
{
    let detail = service::board_detail(&state.sql_storage, board_id).await?;
    Ok(Json(MessageResponse::new(detail)))
}

/// POST /boards/{board_id}/comments
#[tracing::instrument(skip_all, fields(username = auth.username(), board_id = board_id))]
pub async fn add_comment<S, U, F>(
    State(state): State<AppState<S, U, F>>,
    auth: RequireAuth,
    Path(board_id): Path<i64>,
    Json(payload): Json<CommentCreateRequest>,
) -> Result<impl IntoResponse, BoardError>
where
    S: SqlStorage,
    U: UserStorage,
    F: FileStorage,
{
    let author = service::resolve_user(&state.user_storage, auth.username()).await?;
    let comment =
        service::add_comment(&state.sql_storage, &author, board_id, payload.description).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateCommentResponse {
            message: CREATE_SUCCESS.to_owned(),
            comment,
        }),
    ))
}

/// GET /boards/tags
pub async fn tags<S, U, F>(
    State(state): State<AppState<S, U, F>>,
) -> Result<impl IntoResponse, BoardError>
where
    S: SqlStorage,
    U: UserStorage,
    F: FileStorage,
{
    let tags = service::list_tags(&state.sql_storage).await?;
    Ok(Json(TagsResponse { tags }))
}
