//! Boards: listings, detail, upload, pins and comments.
//!
//! - `handlers` - axum handlers mounted under `/boards`
//! - `service` - storage-agnostic queries and mutations
//! - `media` - image metadata, storage keys and random display attributes
//! - `types` - request and response records
//! - `error` - `BoardError` and its HTTP mapping

pub mod error;
pub mod handlers;
pub mod media;
pub mod service;
pub mod types;

pub use error::BoardError;
pub use types::{
    BoardDetail, BoardInfo, BoardSummary, CommentItem, DEFAULT_PAGE_SIZE, PinnedBoardsResponse,
    TagItem,
};

use crate::database::SqlStorage;
use crate::state::AppState;
use crate::storage::FileStorage;
use crate::users::UserStorage;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

/// Largest accepted create-board form.
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Creates the `/boards` router.
pub fn routes<S, U, F>() -> Router<AppState<S, U, F>>
where
    S: SqlStorage,
    U: UserStorage,
    F: FileStorage,
{
    Router::new()
        .route(
            "/",
            get(handlers::list::<S, U, F>)
                .post(handlers::create::<S, U, F>)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/tags", get(handlers::tags::<S, U, F>))
        .route(
            "/pin",
            get(handlers::pinned::<S, U, F>).post(handlers::toggle_pin::<S, U, F>),
        )
        .route(
            "/board/me",
            get(handlers::mine::<S, U, F>).delete(handlers::delete::<S, U, F>),
        )
        .route("/{board_id}", get(handlers::detail::<S, U, F>))
        .route(
            "/{board_id}/comments",
            post(handlers::add_comment::<S, U, F>),
        )
}
