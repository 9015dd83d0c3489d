//! Board queries and mutations.
//!
//! Handlers stay thin: they extract the request, resolve the caller and
//! delegate here. Everything in this module works against the storage traits
//! so it can be exercised with the in-memory mocks.

use super::error::BoardError;
use super::media;
use super::types::{
    BoardDetail, BoardInfo, BoardListQuery, BoardSummary, BoardUpload, CommentItem, NewBoard,
    PinListQuery, TagItem, page_bounds,
};
use crate::config::BoardDefaults;
use crate::database::{
    BoardInsert, BoardListParams, CommentInsert, PinToggle, SqlStorage, SqlStorageError,
};
use crate::storage::{FileStorage, FileUploadRequest};
use crate::users::{StoredUser, UserStorage};

/// Resolves the username of a session token into its user row.
pub async fn resolve_user<U: UserStorage>(
    users: &U,
    username: &str,
) -> Result<StoredUser, BoardError> {
    match users.get_user(username).await {
        Ok(Some(user)) => Ok(user),
        Ok(None) => {
            tracing::warn!(username, "Session token names an unknown user");
            Err(BoardError::Unauthorized)
        }
        Err(e) => Err(BoardError::Internal(format!("failed to get user: {e}"))),
    }
}

/// Column widths of `boards.title` and `boards.source`.
const MAX_TITLE_CHARS: usize = 100;
const MAX_SOURCE_CHARS: usize = 50;

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Checks that every required form field is present before anything is
/// uploaded or written.
pub fn validate_upload(upload: BoardUpload) -> Result<NewBoard, BoardError> {
    let title = upload.title.ok_or(BoardError::MissingField("title"))?;
    let description = upload
        .description
        .ok_or(BoardError::MissingField("description"))?;
    let source = upload.source.ok_or(BoardError::MissingField("source"))?;
    let content = upload.content.ok_or(BoardError::MissingField("filename"))?;
    let file_name = non_empty(upload.file_name)
        .map(|name| media::sanitize_file_name(&name).to_owned())
        .filter(|name| !name.is_empty())
        .ok_or(BoardError::MissingField("filename"))?;
    let content_type =
        non_empty(upload.content_type).unwrap_or_else(|| "application/octet-stream".to_owned());

    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(BoardError::InvalidForm(format!(
            "title is longer than {MAX_TITLE_CHARS} characters"
        )));
    }
    if source.chars().count() > MAX_SOURCE_CHARS {
        return Err(BoardError::InvalidForm(format!(
            "source is longer than {MAX_SOURCE_CHARS} characters"
        )));
    }

    Ok(NewBoard {
        title,
        description,
        source,
        file_name,
        content_type,
        content,
    })
}

pub async fn list_boards<S: SqlStorage>(
    sql: &S,
    query: BoardListQuery,
) -> Result<Vec<BoardSummary>, BoardError> {
    let (offset, limit) = page_bounds(query.offset, query.display);
    let params = BoardListParams {
        tag_id: query.tag_id.filter(|id| *id != 0),
        keyword: non_empty(query.keyword),
        offset,
        limit,
    };

    let rows = sql.boards_list(params).await?;
    Ok(rows.into_iter().map(BoardSummary::from).collect())
}

/// The user's boards, oldest first. Having none is an error.
pub async fn my_boards<S: SqlStorage>(
    sql: &S,
    user: &StoredUser,
) -> Result<Vec<BoardSummary>, BoardError> {
    let rows = sql.boards_list_for_owner(user.id).await?;
    if rows.is_empty() {
        return Err(BoardError::NoBoards);
    }
    Ok(rows.into_iter().map(BoardSummary::from).collect())
}

pub async fn pinned_boards<S: SqlStorage>(
    sql: &S,
    user: &StoredUser,
    query: PinListQuery,
) -> Result<Vec<BoardSummary>, BoardError> {
    let (offset, limit) = page_bounds(query.offset, query.limit);
    let rows = sql.boards_list_pinned(user.id, offset, limit).await?;
    if rows.is_empty() {
        return Err(BoardError::NoPinnedBoards);
    }
    Ok(rows.into_iter().map(BoardSummary::from).collect())
}

pub async fn board_detail<S: SqlStorage>(
    sql: &S,
    board_id: i64,
) -> Result<BoardDetail, BoardError> {
    let board = sql
        .boards_get(board_id)
        .await?
        .ok_or(BoardError::BoardNotFound)?;
    let tag_id = sql.board_first_tag_id(board_id).await?;
    let comments = sql.comments_list_for_board(board_id).await?;

    Ok(BoardDetail {
        board_info: BoardInfo::from_row(board, tag_id),
        comments: comments.into_iter().map(CommentItem::from).collect(),
    })
}

/// Uploads the image, then records the board with a random display color
/// and a random tag.
pub async fn create_board<S: SqlStorage, F: FileStorage>(
    sql: &S,
    files: &F,
    defaults: &BoardDefaults,
    owner: &StoredUser,
    board: NewBoard,
) -> Result<BoardSummary, BoardError> {
    let (width, height) = media::image_dimensions(&board.content)?;
    let key = media::storage_key(&board.file_name);

    // ThreadRng is not Send; keep it out of the awaits below.
    let (color, tag_id) = {
        let mut rng = rand::thread_rng();
        let color = media::pick_color(defaults.palette(), &mut rng)
            .ok_or_else(|| BoardError::Internal("board palette is empty".to_owned()))?;
        (color, media::pick_tag_id(defaults.tag_ids(), &mut rng))
    };

    files
        .upload_file(FileUploadRequest::new(
            key.clone(),
            board.content,
            board.content_type,
        ))
        .await
        .map_err(|e| BoardError::Storage(e.to_string()))?;
    tracing::debug!(key = %key, width, height, "Uploaded board image");

    let row = sql
        .boards_insert(BoardInsert {
            user_id: owner.id,
            title: board.title,
            description: board.description,
            board_image_url: files.public_url(&key),
            source: board.source,
            image_point_color: color,
            image_width: width,
            image_height: height,
            tag_id,
        })
        .await?;

    tracing::info!(board_id = row.id, user_id = owner.id, tag_id, "Created board");
    Ok(BoardSummary::from(row))
}

pub async fn toggle_pin<S: SqlStorage>(
    sql: &S,
    user: &StoredUser,
    board_id: i64,
) -> Result<PinToggle, BoardError> {
    match sql.pins_toggle(user.id, board_id).await {
        Ok(outcome) => Ok(outcome),
        Err(SqlStorageError::MissingReference(_)) => Err(BoardError::BoardNotFound),
        Err(e) => Err(e.into()),
    }
}

/// Deletes a board and its image, then lists the caller's remaining boards.
///
/// Any authenticated user may delete any board.
pub async fn delete_board<S: SqlStorage, F: FileStorage>(
    sql: &S,
    files: &F,
    user: &StoredUser,
    board_id: i64,
) -> Result<Vec<BoardSummary>, BoardError> {
    let board = sql
        .boards_get(board_id)
        .await?
        .ok_or(BoardError::BoardNotFound)?;

    let key = media::key_from_url(&board.board_image_url);
    let removed = files
        .delete_file(&key)
        .await
        .map_err(|e| BoardError::Storage(e.to_string()))?;
    if !removed {
        tracing::warn!(board_id, key = %key, "Board image was already gone from storage");
    }

    if !sql.boards_delete(board_id).await? {
        return Err(BoardError::BoardNotFound);
    }
    tracing::info!(board_id, user_id = user.id, owner_id = board.user_id, "Deleted board");

    my_boards(sql, user).await
}

pub async fn add_comment<S: SqlStorage>(
    sql: &S,
    author: &StoredUser,
    board_id: i64,
    description: String,
) -> Result<CommentItem, BoardError> {
    if description.trim().is_empty() {
        return Err(BoardError::MissingField("description"));
    }
    if sql.boards_get(board_id).await?.is_none() {
        return Err(BoardError::BoardNotFound);
    }

    let row = sql
        .comments_insert(CommentInsert {
            board_id,
            user_id: author.id,
            description,
        })
        .await
        .map_err(|e| match e {
            SqlStorageError::MissingReference(_) => BoardError::BoardNotFound,
            e => e.into(),
        })?;
    Ok(CommentItem::from(row))
}

pub async fn list_tags<S: SqlStorage>(sql: &S) -> Result<Vec<TagItem>, BoardError> {
    let rows = sql.tags_list().await?;
    Ok(rows.into_iter().map(TagItem::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MockSqlStorage;
    use crate::storage::{MOCK_PUBLIC_URL, MockFileStorage};
    use crate::users::MockUserStorage;
    use image::{ImageFormat, RgbImage};
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        RgbImage::new(width, height)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn alice() -> StoredUser {
        StoredUser::new(1, "alice", "Alice")
    }

    fn bob() -> StoredUser {
        StoredUser::new(2, "bob", "Bob").with_profile_image("https://cdn.test/bob.png")
    }

    fn sql() -> MockSqlStorage {
        MockSqlStorage::new()
            .with_seed_tags(10)
            .with_user(1, "Alice", None)
            .with_user(2, "Bob", Some("https://cdn.test/bob.png".to_owned()))
    }

    fn upload(title: &str) -> BoardUpload {
        BoardUpload {
            title: Some(title.to_owned()),
            description: Some("x".to_owned()),
            source: Some("camera".to_owned()),
            file_name: Some("sunset.png".to_owned()),
            content_type: Some("image/png".to_owned()),
            content: Some(png(100, 50)),
        }
    }

    async fn create(sql: &MockSqlStorage, files: &MockFileStorage, title: &str) -> BoardSummary {
        let board = validate_upload(upload(title)).unwrap();
        create_board(sql, files, &BoardDefaults::default(), &alice(), board)
            .await
            .unwrap()
    }

    #[test]
    fn test_validate_upload_reports_first_missing_field() {
        let mut form = upload("sunset");
        form.source = None;
        assert!(matches!(
            validate_upload(form),
            Err(BoardError::MissingField("source"))
        ));

        let mut form = upload("sunset");
        form.content = None;
        assert!(matches!(
            validate_upload(form),
            Err(BoardError::MissingField("filename"))
        ));
    }

    #[test]
    fn test_validate_upload_rejects_overlong_title() {
        let mut form = upload("sunset");
        form.title = Some("t".repeat(MAX_TITLE_CHARS + 1));
        assert!(matches!(
            validate_upload(form),
            Err(BoardError::InvalidForm(_))
        ));
    }

    #[test]
    fn test_validate_upload_defaults_content_type() {
        let mut form = upload("sunset");
        form.content_type = None;
        form.file_name = Some("dir/sunset.png".to_owned());
        let board = validate_upload(form).unwrap();
        assert_eq!(board.content_type, "application/octet-stream");
        assert_eq!(board.file_name, "sunset.png");
    }

    #[tokio::test]
    async fn test_resolve_user() {
        let users = MockUserStorage::new().with_user(alice());
        assert_eq!(resolve_user(&users, "alice").await.unwrap().id, 1);
        assert!(matches!(
            resolve_user(&users, "mallory").await,
            Err(BoardError::Unauthorized)
        ));
        assert!(matches!(
            resolve_user(&MockUserStorage::failing(), "alice").await,
            Err(BoardError::Internal(_))
        ));
    }

    #[tokio::test]
    async fn test_create_board_records_dimensions_and_upload() {
        let sql = sql();
        let files = MockFileStorage::new();

        let summary = create(&sql, &files, "sunset").await;

        assert_eq!(summary.image_width, 100);
        assert_eq!(summary.image_height, 50);
        assert_eq!(summary.user, "Alice");
        assert!(summary.image_url.starts_with(MOCK_PUBLIC_URL));
        assert!(BoardDefaults::default().palette().contains(&summary.point_color));

        let keys = files.keys();
        assert_eq!(keys.len(), 1);
        assert!(keys[0].ends_with("sunset.png"));
        assert_eq!(
            files.metadata(&keys[0]).unwrap().content_type,
            "image/png"
        );

        let tag_id = sql.board_first_tag_id(summary.id).await.unwrap().unwrap();
        assert!((1..=10).contains(&tag_id));

        let mine = my_boards(&sql, &alice()).await.unwrap();
        assert_eq!(mine, vec![summary]);
    }

    #[tokio::test]
    async fn test_create_board_rejects_non_image_before_upload() {
        let sql = sql();
        let files = MockFileStorage::new();
        let mut board = validate_upload(upload("sunset")).unwrap();
        board.content = b"plain text".to_vec();

        let err = create_board(&sql, &files, &BoardDefaults::default(), &alice(), board)
            .await
            .unwrap_err();

        assert!(matches!(err, BoardError::InvalidImage(_)));
        assert!(files.is_empty());
        assert_eq!(sql.board_count(), 0);
    }

    #[tokio::test]
    async fn test_create_board_upload_failure_creates_no_row() {
        let sql = sql();
        let board = validate_upload(upload("sunset")).unwrap();

        let err = create_board(
            &sql,
            &MockFileStorage::failing(),
            &BoardDefaults::default(),
            &alice(),
            board,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, BoardError::Storage(_)));
        assert_eq!(sql.board_count(), 0);
    }

    #[tokio::test]
    async fn test_create_board_uses_configured_defaults() {
        let sql = sql();
        let files = MockFileStorage::new();
        let defaults = BoardDefaults::new(vec!["#123456".to_owned()], 1).unwrap();
        let board = validate_upload(upload("sunset")).unwrap();

        let summary = create_board(&sql, &files, &defaults, &alice(), board)
            .await
            .unwrap();

        assert_eq!(summary.point_color, "#123456");
        assert_eq!(sql.board_first_tag_id(summary.id).await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_list_boards_limit_and_tag_filter() {
        let sql = sql();
        let files = MockFileStorage::new();
        for i in 0..4 {
            create(&sql, &files, &format!("board{i}")).await;
        }

        let page = list_boards(
            &sql,
            BoardListQuery {
                display: Some(3),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(page.len(), 3);

        let all = list_boards(
            &sql,
            BoardListQuery {
                tag_id: Some(0),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(all.len(), 4);

        let none = list_boards(
            &sql,
            BoardListQuery {
                tag_id: Some(999),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_my_boards_empty_is_not_found() {
        assert!(matches!(
            my_boards(&sql(), &alice()).await,
            Err(BoardError::NoBoards)
        ));
    }

    #[tokio::test]
    async fn test_toggle_pin_and_pinned_list() {
        let sql = sql();
        let files = MockFileStorage::new();
        let board = create(&sql, &files, "sunset").await;

        assert!(matches!(
            pinned_boards(&sql, &bob(), PinListQuery::default()).await,
            Err(BoardError::NoPinnedBoards)
        ));

        assert_eq!(
            toggle_pin(&sql, &bob(), board.id).await.unwrap(),
            PinToggle::Created
        );
        let pinned = pinned_boards(&sql, &bob(), PinListQuery::default())
            .await
            .unwrap();
        assert_eq!(pinned, vec![board.clone()]);
        assert_eq!(pinned[0].user, "Alice");

        assert_eq!(
            toggle_pin(&sql, &bob(), board.id).await.unwrap(),
            PinToggle::Removed
        );
        assert_eq!(sql.pin_count(2, board.id), 0);
    }

    #[tokio::test]
    async fn test_toggle_pin_unknown_board() {
        assert!(matches!(
            toggle_pin(&sql(), &bob(), 404).await,
            Err(BoardError::BoardNotFound)
        ));
    }

    #[tokio::test]
    async fn test_board_detail_with_comments() {
        let sql = sql();
        let files = MockFileStorage::new();
        let board = create(&sql, &files, "sunset").await;

        add_comment(&sql, &bob(), board.id, "lovely".to_owned())
            .await
            .unwrap();
        add_comment(&sql, &alice(), board.id, "thanks".to_owned())
            .await
            .unwrap();

        let detail = board_detail(&sql, board.id).await.unwrap();
        assert_eq!(detail.board_info.username, "Alice");
        assert_eq!(detail.board_info.source, "camera");
        assert!(detail.board_info.tag_id.is_some());
        assert_eq!(detail.comments.len(), 2);
        assert_eq!(detail.comments[0].username, "Bob");
        assert_eq!(
            detail.comments[0].profile_image_url.as_deref(),
            Some("https://cdn.test/bob.png")
        );
        assert_eq!(detail.comments[1].description, "thanks");
    }

    #[tokio::test]
    async fn test_board_detail_unknown_board() {
        assert!(matches!(
            board_detail(&sql(), 1).await,
            Err(BoardError::BoardNotFound)
        ));
    }

    #[tokio::test]
    async fn test_add_comment_validation() {
        let sql = sql();
        let files = MockFileStorage::new();
        let board = create(&sql, &files, "sunset").await;

        assert!(matches!(
            add_comment(&sql, &bob(), board.id, "   ".to_owned()).await,
            Err(BoardError::MissingField("description"))
        ));
        assert!(matches!(
            add_comment(&sql, &bob(), 999, "hi".to_owned()).await,
            Err(BoardError::BoardNotFound)
        ));
    }

    #[tokio::test]
    async fn test_delete_board_removes_blob_and_join_rows() {
        let sql = sql();
        let files = MockFileStorage::new();
        let keep = create(&sql, &files, "keep").await;
        let doomed = create(&sql, &files, "doomed").await;
        toggle_pin(&sql, &bob(), doomed.id).await.unwrap();

        let remaining = delete_board(&sql, &files, &alice(), doomed.id)
            .await
            .unwrap();

        assert_eq!(remaining, vec![keep]);
        assert_eq!(sql.join_rows_for_board(doomed.id), 0);
        assert_eq!(files.len(), 1);
        assert!(!files.keys().contains(&media::key_from_url(&doomed.image_url).into_owned()));
    }

    #[tokio::test]
    async fn test_delete_last_board_reports_no_boards() {
        let sql = sql();
        let files = MockFileStorage::new();
        let board = create(&sql, &files, "only").await;

        assert!(matches!(
            delete_board(&sql, &files, &alice(), board.id).await,
            Err(BoardError::NoBoards)
        ));
        assert_eq!(sql.board_count(), 0);
        assert!(files.is_empty());
    }

    #[tokio::test]
    async fn test_delete_aborts_when_storage_delete_fails() {
        let sql = sql();
        let files = MockFileStorage::new();
        let board = create(&sql, &files, "stuck").await;
        toggle_pin(&sql, &bob(), board.id).await.unwrap();
        files.fail_deletes();

        assert!(matches!(
            delete_board(&sql, &files, &alice(), board.id).await,
            Err(BoardError::Storage(_))
        ));
        assert_eq!(sql.board_count(), 1);
        assert_eq!(sql.join_rows_for_board(board.id), 2);
        assert_eq!(files.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_unknown_board() {
        assert!(matches!(
            delete_board(&sql(), &MockFileStorage::new(), &alice(), 12).await,
            Err(BoardError::BoardNotFound)
        ));
    }

    #[tokio::test]
    async fn test_list_tags_in_id_order() {
        let tags = list_tags(&sql()).await.unwrap();
        assert_eq!(tags.len(), 10);
        assert_eq!(tags[0].id, 1);
        assert_eq!(tags[9].id, 10);
    }
}
