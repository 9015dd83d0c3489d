//! Request and response records for the board endpoints.

use crate::database::{BoardRow, BoardSummaryRow, CommentRow, TagRow};
use serde::{Deserialize, Serialize};

/// Page size used when a listing request names none.
pub const DEFAULT_PAGE_SIZE: i64 = 25;

// =============================================================================
// Response records
// =============================================================================

/// A board as it appears in every listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSummary {
    pub id: i64,
    /// Nickname of the board's owner.
    pub user: String,
    pub title: String,
    pub image_url: String,
    pub point_color: String,
    pub image_width: i32,
    pub image_height: i32,
}

impl From<BoardSummaryRow> for BoardSummary {
    fn from(row: BoardSummaryRow) -> Self {
        Self {
            id: row.id,
            user: row.owner_nickname,
            title: row.title,
            image_url: row.board_image_url,
            point_color: row.image_point_color,
            image_width: row.image_width,
            image_height: row.image_height,
        }
    }
}

impl From<BoardRow> for BoardSummary {
    fn from(row: BoardRow) -> Self {
        BoardSummaryRow::from(row).into()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardInfo {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub board_image_url: String,
    pub source: String,
    /// Nickname of the board's owner.
    pub username: String,
    pub tag_id: Option<i64>,
}

impl BoardInfo {
    pub fn from_row(row: BoardRow, tag_id: Option<i64>) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            board_image_url: row.board_image_url,
            source: row.source,
            username: row.owner_nickname,
            tag_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentItem {
    pub id: i64,
    /// Nickname of the comment's author.
    pub username: String,
    pub profile_image_url: Option<String>,
    pub description: String,
}

impl From<CommentRow> for CommentItem {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            username: row.author_nickname,
            profile_image_url: row.author_profile_image_url,
            description: row.description,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardDetail {
    pub board_info: BoardInfo,
    pub comments: Vec<CommentItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagItem {
    pub id: i64,
    pub name: String,
}

impl From<TagRow> for TagItem {
    fn from(row: TagRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
        }
    }
}

/// `{"message": ...}` envelope shared by most endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse<T> {
    pub message: T,
}

impl<T> MessageResponse<T> {
    pub fn new(message: T) -> Self {
        Self { message }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateBoardResponse {
    pub message: String,
    pub board: BoardSummary,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TogglePinResponse {
    pub message: String,
    pub created: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PinnedBoardsResponse {
    pub pinned_boards: Vec<BoardSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateCommentResponse {
    pub message: String,
    pub comment: CommentItem,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TagsResponse {
    pub tags: Vec<TagItem>,
}

// =============================================================================
// Requests
// =============================================================================

/// Query string of `GET /boards`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BoardListQuery {
    /// `0` means no tag filter.
    #[serde(default)]
    pub tag_id: Option<i64>,
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default)]
    pub offset: Option<i64>,
    /// Page size.
    #[serde(default)]
    pub display: Option<i64>,
}

/// Query string of `GET /boards/pin`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PinListQuery {
    #[serde(default)]
    pub offset: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
}

/// Resolves an optional `(offset, limit)` pair into usable bounds.
pub fn page_bounds(offset: Option<i64>, limit: Option<i64>) -> (i64, i64) {
    let offset = offset.unwrap_or(0).max(0);
    let limit = match limit {
        Some(limit) if limit > 0 => limit,
        _ => DEFAULT_PAGE_SIZE,
    };
    (offset, limit)
}

#[derive(Debug, Clone, Deserialize)]
pub struct BoardIdRequest {
    pub board_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentCreateRequest {
    #[serde(default)]
    pub description: String,
}

/// The parts of a create-board form, as read off the wire.
#[derive(Debug, Clone, Default)]
pub struct BoardUpload {
    pub title: Option<String>,
    pub description: Option<String>,
    pub source: Option<String>,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub content: Option<Vec<u8>>,
}

/// A create-board form with every required field present.
#[derive(Debug, Clone)]
pub struct NewBoard {
    pub title: String,
    pub description: String,
    pub source: String,
    pub file_name: String,
    pub content_type: String,
    pub content: Vec<u8>,
}
