//! In-memory [`SqlStorage`] for tests.

use super::{
    BoardInsert, BoardListParams, BoardRow, BoardSummaryRow, CommentInsert, CommentRow, PinToggle,
    SqlStorage, SqlStorageError, TagRow,
};
use chrono::Utc;
use rand::seq::SliceRandom;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

#[derive(Clone)]
struct MockUser {
    nickname: String,
    profile_image_url: Option<String>,
}

#[derive(Default)]
struct MockDb {
    connected: bool,
    next_id: i64,
    users: BTreeMap<i64, MockUser>,
    tags: BTreeMap<i64, String>,
    boards: BTreeMap<i64, BoardRow>,
    // (id, tag_id, board_id)
    tag_boards: Vec<(i64, i64, i64)>,
    comments: BTreeMap<i64, CommentRow>,
    // (id, user_id, board_id)
    pins: Vec<(i64, i64, i64)>,
}

impl MockDb {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn summary(&self, board: &BoardRow) -> BoardSummaryRow {
        BoardSummaryRow::from(board.clone())
    }

    fn board_has_tag_named(&self, board_id: i64, name: &str) -> bool {
        self.tag_boards.iter().any(|(_, tag_id, linked)| {
            *linked == board_id && self.tags.get(tag_id).is_some_and(|tag| tag == name)
        })
    }
}

/// Mirrors the PostgreSQL schema's constraints: unique pins, cascading
/// deletes and foreign keys on users, tags and boards.
#[derive(Clone)]
pub struct MockSqlStorage {
    db: Arc<RwLock<MockDb>>,
}

impl Default for MockSqlStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSqlStorage {
    /// Creates a connected, empty storage.
    pub fn new() -> Self {
        Self {
            db: Arc::new(RwLock::new(MockDb {
                connected: true,
                ..MockDb::default()
            })),
        }
    }

    /// Creates a storage that reports the database as unreachable.
    pub fn disconnected() -> Self {
        let storage = Self::new();
        storage.db.write().expect("lock poisoned").connected = false;
        storage
    }

    /// Seeds tags `1..=count` the way the reference migration does.
    pub fn with_seed_tags(self, count: i64) -> Self {
        {
            let mut db = self.db.write().expect("lock poisoned");
            for id in 1..=count {
                db.tags.insert(id, format!("tag-{id}"));
            }
        }
        self
    }

    pub fn with_tag(self, id: i64, name: impl Into<String>) -> Self {
        self.db
            .write()
            .expect("lock poisoned")
            .tags
            .insert(id, name.into());
        self
    }

    /// Registers a user row so boards and comments can reference it.
    pub fn with_user(
        self,
        id: i64,
        nickname: impl Into<String>,
        profile_image_url: Option<String>,
    ) -> Self {
        self.db.write().expect("lock poisoned").users.insert(
            id,
            MockUser {
                nickname: nickname.into(),
                profile_image_url,
            },
        );
        self
    }

    pub fn board_count(&self) -> usize {
        self.db.read().expect("lock poisoned").boards.len()
    }

    pub fn pin_count(&self, user_id: i64, board_id: i64) -> usize {
        self.db
            .read()
            .expect("lock poisoned")
            .pins
            .iter()
            .filter(|(_, user, board)| *user == user_id && *board == board_id)
            .count()
    }

    /// Join rows (tag links and pins) still pointing at `board_id`.
    pub fn join_rows_for_board(&self, board_id: i64) -> usize {
        let db = self.db.read().expect("lock poisoned");
        db.tag_boards
            .iter()
            .filter(|(_, _, board)| *board == board_id)
            .count()
            + db.pins
                .iter()
                .filter(|(_, _, board)| *board == board_id)
                .count()
    }
}

impl SqlStorage for MockSqlStorage {
    async fn is_connected(&self) -> bool {
        self.db.read().expect("lock poisoned").connected
    }

    async fn boards_list(
        &self,
        params: BoardListParams,
    ) -> Result<Vec<BoardSummaryRow>, SqlStorageError> {
        let db = self.db.read().expect("lock poisoned");
        let keyword_lower = params.keyword.as_deref().map(str::to_lowercase);

        let mut rows: Vec<BoardSummaryRow> = db
            .boards
            .values()
            .filter(|board| match params.tag_id {
                Some(tag_id) => db
                    .tag_boards
                    .iter()
                    .any(|(_, tag, linked)| *tag == tag_id && *linked == board.id),
                None => true,
            })
            .filter(|board| match (&params.keyword, &keyword_lower) {
                (Some(keyword), Some(lower)) => {
                    db.board_has_tag_named(board.id, keyword)
                        || board.title.to_lowercase().contains(lower.as_str())
                }
                _ => true,
            })
            .map(|board| db.summary(board))
            .collect();

        rows.shuffle(&mut rand::thread_rng());

        Ok(rows
            .into_iter()
            .skip(params.offset.max(0) as usize)
            .take(params.limit.max(0) as usize)
            .collect())
    }

    async fn boards_list_for_owner(
        &self,
        user_id: i64,
    ) -> Result<Vec<BoardSummaryRow>, SqlStorageError> {
        let db = self.db.read().expect("lock poisoned");
        let mut boards: Vec<&BoardRow> = db
            .boards
            .values()
            .filter(|board| board.user_id == user_id)
            .collect();
        boards.sort_by_key(|board| (board.create_time, board.id));
        Ok(boards.into_iter().map(|board| db.summary(board)).collect())
    }

    async fn boards_list_pinned(
        &self,
        user_id: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<BoardSummaryRow>, SqlStorageError> {
        let db = self.db.read().expect("lock poisoned");
        Ok(db
            .pins
            .iter()
            .filter(|(_, user, _)| *user == user_id)
            .filter_map(|(_, _, board_id)| db.boards.get(board_id))
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .map(|board| db.summary(board))
            .collect())
    }

    async fn boards_get(&self, id: i64) -> Result<Option<BoardRow>, SqlStorageError> {
        Ok(self
            .db
            .read()
            .expect("lock poisoned")
            .boards
            .get(&id)
            .cloned())
    }

    async fn boards_insert(&self, input: BoardInsert) -> Result<BoardRow, SqlStorageError> {
        let mut db = self.db.write().expect("lock poisoned");

        let owner = db.users.get(&input.user_id).cloned().ok_or_else(|| {
            SqlStorageError::MissingReference(format!("user {} does not exist", input.user_id))
        })?;
        if !db.tags.contains_key(&input.tag_id) {
            return Err(SqlStorageError::MissingReference(format!(
                "tag {} does not exist",
                input.tag_id
            )));
        }

        let id = db.next_id();
        let now = Utc::now();
        let board = BoardRow {
            id,
            user_id: input.user_id,
            owner_nickname: owner.nickname,
            title: input.title,
            description: input.description,
            board_image_url: input.board_image_url,
            source: input.source,
            image_point_color: input.image_point_color,
            image_width: input.image_width,
            image_height: input.image_height,
            create_time: now,
            update_time: now,
        };
        db.boards.insert(id, board.clone());

        let link_id = db.next_id();
        db.tag_boards.push((link_id, input.tag_id, id));

        Ok(board)
    }

    async fn boards_delete(&self, id: i64) -> Result<bool, SqlStorageError> {
        let mut db = self.db.write().expect("lock poisoned");
        if db.boards.remove(&id).is_none() {
            return Ok(false);
        }
        db.tag_boards.retain(|(_, _, board)| *board != id);
        db.pins.retain(|(_, _, board)| *board != id);
        db.comments.retain(|_, comment| comment.board_id != id);
        Ok(true)
    }

    async fn board_first_tag_id(&self, board_id: i64) -> Result<Option<i64>, SqlStorageError> {
        let db = self.db.read().expect("lock poisoned");
        Ok(db
            .tag_boards
            .iter()
            .filter(|(_, _, board)| *board == board_id)
            .min_by_key(|(id, _, _)| *id)
            .map(|(_, tag_id, _)| *tag_id))
    }

    async fn comments_list_for_board(
        &self,
        board_id: i64,
    ) -> Result<Vec<CommentRow>, SqlStorageError> {
        let db = self.db.read().expect("lock poisoned");
        Ok(db
            .comments
            .values()
            .filter(|comment| comment.board_id == board_id)
            .cloned()
            .collect())
    }

    async fn comments_insert(&self, input: CommentInsert) -> Result<CommentRow, SqlStorageError> {
        let mut db = self.db.write().expect("lock poisoned");

        let author = db.users.get(&input.user_id).cloned().ok_or_else(|| {
            SqlStorageError::MissingReference(format!("user {} does not exist", input.user_id))
        })?;
        if !db.boards.contains_key(&input.board_id) {
            return Err(SqlStorageError::MissingReference(format!(
                "board {} does not exist",
                input.board_id
            )));
        }

        let id = db.next_id();
        let comment = CommentRow {
            id,
            board_id: input.board_id,
            user_id: input.user_id,
            author_nickname: author.nickname,
            author_profile_image_url: author.profile_image_url,
            description: input.description,
            create_time: Utc::now(),
        };
        db.comments.insert(id, comment.clone());
        Ok(comment)
    }

    async fn pins_toggle(&self, user_id: i64, board_id: i64) -> Result<PinToggle, SqlStorageError> {
        let mut db = self.db.write().expect("lock poisoned");

        if !db.boards.contains_key(&board_id) {
            return Err(SqlStorageError::MissingReference(format!(
                "board {board_id} does not exist"
            )));
        }

        let before = db.pins.len();
        db.pins
            .retain(|(_, user, board)| !(*user == user_id && *board == board_id));
        if db.pins.len() < before {
            return Ok(PinToggle::Removed);
        }

        let id = db.next_id();
        db.pins.push((id, user_id, board_id));
        Ok(PinToggle::Created)
    }

    async fn tags_list(&self) -> Result<Vec<TagRow>, SqlStorageError> {
        let db = self.db.read().expect("lock poisoned");
        Ok(db
            .tags
            .iter()
            .map(|(id, name)| TagRow {
                id: *id,
                name: name.clone(),
            })
            .collect())
    }
}
