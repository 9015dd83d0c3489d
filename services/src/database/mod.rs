//! Relational storage for boards, tags, comments and pins.
//!
//! Handlers and services only see the [`SqlStorage`] trait. [`PgStorage`] is
//! the PostgreSQL implementation; [`MockSqlStorage`] keeps everything in
//! memory for tests.

mod mock;
mod pg;

pub use mock::MockSqlStorage;
pub use pg::{PgStorage, create_pool, run_migrations};

use chrono::{DateTime, Utc};
use std::future::Future;

/// A board as it appears in listings.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct BoardSummaryRow {
    pub id: i64,
    pub owner_nickname: String,
    pub title: String,
    pub board_image_url: String,
    pub image_point_color: String,
    pub image_width: i32,
    pub image_height: i32,
}

/// A full board row joined with its owner's nickname.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct BoardRow {
    pub id: i64,
    pub user_id: i64,
    pub owner_nickname: String,
    pub title: String,
    pub description: String,
    pub board_image_url: String,
    pub source: String,
    pub image_point_color: String,
    pub image_width: i32,
    pub image_height: i32,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

impl From<BoardRow> for BoardSummaryRow {
    fn from(row: BoardRow) -> Self {
        Self {
            id: row.id,
            owner_nickname: row.owner_nickname,
            title: row.title,
            board_image_url: row.board_image_url,
            image_point_color: row.image_point_color,
            image_width: row.image_width,
            image_height: row.image_height,
        }
    }
}

/// A comment joined with its author.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct CommentRow {
    pub id: i64,
    pub board_id: i64,
    pub user_id: i64,
    pub author_nickname: String,
    pub author_profile_image_url: Option<String>,
    pub description: String,
    pub create_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct TagRow {
    pub id: i64,
    pub name: String,
}

/// Input for creating a board together with its single tag.
#[derive(Debug, Clone)]
pub struct BoardInsert {
    pub user_id: i64,
    pub title: String,
    pub description: String,
    pub board_image_url: String,
    pub source: String,
    pub image_point_color: String,
    pub image_width: i32,
    pub image_height: i32,
    pub tag_id: i64,
}

#[derive(Debug, Clone)]
pub struct CommentInsert {
    pub board_id: i64,
    pub user_id: i64,
    pub description: String,
}

/// Filters for the public board listing. Clauses are ANDed.
#[derive(Debug, Clone, Default)]
pub struct BoardListParams {
    pub tag_id: Option<i64>,
    /// Matches an exact tag name or a case-insensitive title substring.
    pub keyword: Option<String>,
    pub offset: i64,
    pub limit: i64,
}

/// Outcome of toggling a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinToggle {
    Created,
    Removed,
}

#[derive(Debug, thiserror::Error)]
pub enum SqlStorageError {
    /// A foreign key pointed at a row that does not exist.
    #[error("missing reference: {0}")]
    MissingReference(String),

    #[error("database error: {0}")]
    Db(String),
}

impl From<sqlx::Error> for SqlStorageError {
    fn from(e: sqlx::Error) -> Self {
        match e.as_database_error() {
            Some(db) if db.is_foreign_key_violation() => {
                SqlStorageError::MissingReference(db.message().to_owned())
            }
            _ => SqlStorageError::Db(e.to_string()),
        }
    }
}

pub trait SqlStorage: Clone + Send + Sync + 'static {
    fn is_connected(&self) -> impl Future<Output = bool> + Send;

    /// Boards matching `params`, in random order, at most `params.limit`.
    fn boards_list(
        &self,
        params: BoardListParams,
    ) -> impl Future<Output = Result<Vec<BoardSummaryRow>, SqlStorageError>> + Send;

    /// Boards owned by `user_id`, oldest first.
    fn boards_list_for_owner(
        &self,
        user_id: i64,
    ) -> impl Future<Output = Result<Vec<BoardSummaryRow>, SqlStorageError>> + Send;

    /// Boards pinned by `user_id`, in pin order.
    fn boards_list_pinned(
        &self,
        user_id: i64,
        offset: i64,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<BoardSummaryRow>, SqlStorageError>> + Send;

    fn boards_get(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<Option<BoardRow>, SqlStorageError>> + Send;

    /// Inserts the board and its tag link atomically.
    fn boards_insert(
        &self,
        input: BoardInsert,
    ) -> impl Future<Output = Result<BoardRow, SqlStorageError>> + Send;

    /// Deletes the board; join rows and comments go with it.
    fn boards_delete(&self, id: i64) -> impl Future<Output = Result<bool, SqlStorageError>> + Send;

    /// First tag attached to the board, by link creation order.
    fn board_first_tag_id(
        &self,
        board_id: i64,
    ) -> impl Future<Output = Result<Option<i64>, SqlStorageError>> + Send;

    fn comments_list_for_board(
        &self,
        board_id: i64,
    ) -> impl Future<Output = Result<Vec<CommentRow>, SqlStorageError>> + Send;

    fn comments_insert(
        &self,
        input: CommentInsert,
    ) -> impl Future<Output = Result<CommentRow, SqlStorageError>> + Send;

    /// Creates the pin if absent, otherwise removes it.
    fn pins_toggle(
        &self,
        user_id: i64,
        board_id: i64,
    ) -> impl Future<Output = Result<PinToggle, SqlStorageError>> + Send;

    fn tags_list(&self) -> impl Future<Output = Result<Vec<TagRow>, SqlStorageError>> + Send;
}

/// `ILIKE` pattern matching `keyword` anywhere, with wildcards escaped.
pub(crate) fn contains_pattern(keyword: &str) -> String {
    let mut pattern = String::with_capacity(keyword.len() + 2);
    pattern.push('%');
    for c in keyword.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
