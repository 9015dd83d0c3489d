//! PostgreSQL implementation of [`SqlStorage`].

use super::{
    BoardInsert, BoardListParams, BoardRow, BoardSummaryRow, CommentInsert, CommentRow, PinToggle,
    SqlStorage, SqlStorageError, TagRow, contains_pattern,
};
use crate::config::Config;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, QueryBuilder};

/// Initialize a PostgreSQL connection pool
pub async fn create_pool(config: &Config) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new().connect(config.database_url()).await?;

    tracing::info!("Database connection pool established");

    Ok(pool)
}

/// Apply the embedded schema migrations.
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;

    tracing::info!("Database migrations applied");

    Ok(())
}

const SUMMARY_COLUMNS: &str = "b.id, u.nickname AS owner_nickname, b.title, b.board_image_url, \
     b.image_point_color, b.image_width, b.image_height";

const BOARD_COLUMNS: &str = "b.id, b.user_id, u.nickname AS owner_nickname, b.title, \
     b.description, b.board_image_url, b.source, b.image_point_color, b.image_width, \
     b.image_height, b.create_time, b.update_time";

const COMMENT_COLUMNS: &str = "c.id, c.board_id, c.user_id, u.nickname AS author_nickname, \
     u.profile_image_url AS author_profile_image_url, c.description, c.create_time";

#[derive(Clone)]
pub struct PgStorage {
    pub pool: PgPool,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl SqlStorage for PgStorage {
    async fn is_connected(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    async fn boards_list(
        &self,
        params: BoardListParams,
    ) -> Result<Vec<BoardSummaryRow>, SqlStorageError> {
        let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(format!(
            "SELECT {SUMMARY_COLUMNS} FROM boards b JOIN users u ON u.id = b.user_id WHERE TRUE"
        ));

        if let Some(tag_id) = params.tag_id {
            qb.push(
                " AND EXISTS (SELECT 1 FROM tag_boards tb WHERE tb.board_id = b.id AND tb.tag_id = ",
            )
            .push_bind(tag_id)
            .push(")");
        }

        if let Some(keyword) = params.keyword {
            let pattern = contains_pattern(&keyword);
            qb.push(
                " AND (EXISTS (SELECT 1 FROM tag_boards tb JOIN tags t ON t.id = tb.tag_id \
                 WHERE tb.board_id = b.id AND t.name = ",
            )
            .push_bind(keyword)
            .push(") OR b.title ILIKE ")
            .push_bind(pattern)
            .push(")");
        }

        qb.push(" ORDER BY random() OFFSET ")
            .push_bind(params.offset)
            .push(" LIMIT ")
            .push_bind(params.limit);

        let rows = qb
            .build_query_as::<BoardSummaryRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn boards_list_for_owner(
        &self,
        user_id: i64,
    ) -> Result<Vec<BoardSummaryRow>, SqlStorageError> {
        let rows = sqlx::query_as::<_, BoardSummaryRow>(&format!(
            r#"
            SELECT {SUMMARY_COLUMNS}
            FROM boards b
            JOIN users u ON u.id = b.user_id
            WHERE b.user_id = $1
            ORDER BY b.create_time ASC, b.id ASC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn boards_list_pinned(
        &self,
        user_id: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<BoardSummaryRow>, SqlStorageError> {
        let rows = sqlx::query_as::<_, BoardSummaryRow>(&format!(
            r#"
            SELECT {SUMMARY_COLUMNS}
            FROM pin_boards p
            JOIN boards b ON b.id = p.board_id
            JOIN users u ON u.id = b.user_id
            WHERE p.user_id = $1
            ORDER BY p.id ASC
            OFFSET $2
            LIMIT $3
            "#
        ))
        .bind(user_id)
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn boards_get(&self, id: i64) -> Result<Option<BoardRow>, SqlStorageError> {
        let row = sqlx::query_as::<_, BoardRow>(&format!(
            r#"
            SELECT {BOARD_COLUMNS}
            FROM boards b
            JOIN users u ON u.id = b.user_id
            WHERE b.id = $1
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn boards_insert(&self, input: BoardInsert) -> Result<BoardRow, SqlStorageError> {
        let mut tx = self.pool.begin().await?;

        let board = sqlx::query_as::<_, BoardRow>(&format!(
            r#"
            WITH b AS (
                INSERT INTO boards (
                    user_id, title, description, board_image_url, source,
                    image_point_color, image_width, image_height
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING *
            )
            SELECT {BOARD_COLUMNS}
            FROM b
            JOIN users u ON u.id = b.user_id
            "#
        ))
        .bind(input.user_id)
        .bind(&input.title)
        .bind(&input.description)
        .bind(&input.board_image_url)
        .bind(&input.source)
        .bind(&input.image_point_color)
        .bind(input.image_width)
        .bind(input.image_height)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO tag_boards (tag_id, board_id) VALUES ($1, $2)")
            .bind(input.tag_id)
            .bind(board.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(board)
    }

    async fn boards_delete(&self, id: i64) -> Result<bool, SqlStorageError> {
        let result = sqlx::query("DELETE FROM boards WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn board_first_tag_id(&self, board_id: i64) -> Result<Option<i64>, SqlStorageError> {
        let tag_id = sqlx::query_scalar::<_, i64>(
            "SELECT tag_id FROM tag_boards WHERE board_id = $1 ORDER BY id ASC LIMIT 1",
        )
        .bind(board_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(tag_id)
    }

    async fn comments_list_for_board(
        &self,
        board_id: i64,
    ) -> Result<Vec<CommentRow>, SqlStorageError> {
        let rows = sqlx::query_as::<_, CommentRow>(&format!(
            r#"
            SELECT {COMMENT_COLUMNS}
            FROM comments c
            JOIN users u ON u.id = c.user_id
            WHERE c.board_id = $1
            ORDER BY c.id ASC
            "#
        ))
        .bind(board_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn comments_insert(&self, input: CommentInsert) -> Result<CommentRow, SqlStorageError> {
        let row = sqlx::query_as::<_, CommentRow>(&format!(
            r#"
            WITH c AS (
                INSERT INTO comments (board_id, user_id, description)
                VALUES ($1, $2, $3)
                RETURNING *
            )
            SELECT {COMMENT_COLUMNS}
            FROM c
            JOIN users u ON u.id = c.user_id
            "#
        ))
        .bind(input.board_id)
        .bind(input.user_id)
        .bind(&input.description)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn pins_toggle(&self, user_id: i64, board_id: i64) -> Result<PinToggle, SqlStorageError> {
        // The unique (user_id, board_id) constraint decides which of two
        // concurrent toggles creates the row.
        let inserted = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO pin_boards (user_id, board_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, board_id) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(board_id)
        .fetch_optional(&self.pool)
        .await?;

        if inserted.is_some() {
            return Ok(PinToggle::Created);
        }

        sqlx::query("DELETE FROM pin_boards WHERE user_id = $1 AND board_id = $2")
            .bind(user_id)
            .bind(board_id)
            .execute(&self.pool)
            .await?;

        Ok(PinToggle::Removed)
    }

    async fn tags_list(&self) -> Result<Vec<TagRow>, SqlStorageError> {
        let rows = sqlx::query_as::<_, TagRow>("SELECT id, name FROM tags ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    // These run against a migrated database:
    // DATABASE_URL=postgres://... cargo test -- --ignored

    async fn setup() -> (PgStorage, i64) {
        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .connect(&database_url)
            .await
            .expect("Failed to create pool.");
        run_migrations(&pool).await.expect("migrations should apply");

        sqlx::query("DELETE FROM boards").execute(&pool).await.unwrap();
        let user_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO users (username, nickname)
            VALUES ('pg_test_user', 'pg tester')
            ON CONFLICT (username) DO UPDATE SET nickname = EXCLUDED.nickname
            RETURNING id
            "#,
        )
        .fetch_one(&pool)
        .await
        .unwrap();

        (PgStorage::new(pool), user_id)
    }

    fn board_insert(user_id: i64, title: &str, tag_id: i64) -> BoardInsert {
        BoardInsert {
            user_id,
            title: title.to_owned(),
            description: "x".to_owned(),
            board_image_url: format!("https://images.weterest.test/0123456789{title}.png"),
            source: "camera".to_owned(),
            image_point_color: "#FFF0E5".to_owned(),
            image_width: 100,
            image_height: 50,
            tag_id,
        }
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_insert_and_list_for_owner() {
        let (storage, user_id) = setup().await;

        let first = storage
            .boards_insert(board_insert(user_id, "sunset", 1))
            .await
            .unwrap();
        let second = storage
            .boards_insert(board_insert(user_id, "sunrise", 2))
            .await
            .unwrap();

        let boards = storage.boards_list_for_owner(user_id).await.unwrap();
        assert_eq!(
            boards.iter().map(|b| b.id).collect::<Vec<_>>(),
            vec![first.id, second.id]
        );
        assert_eq!(
            storage.board_first_tag_id(first.id).await.unwrap(),
            Some(1)
        );
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_keyword_matches_tag_name_or_title() {
        let (storage, user_id) = setup().await;
        storage
            .boards_insert(board_insert(user_id, "Sunset", 1))
            .await
            .unwrap();
        storage
            .boards_insert(board_insert(user_id, "lunch", 2))
            .await
            .unwrap();

        let by_title = storage
            .boards_list(BoardListParams {
                keyword: Some("sun".to_owned()),
                limit: 25,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_title.len(), 1);

        let by_tag = storage
            .boards_list(BoardListParams {
                keyword: Some("food".to_owned()),
                limit: 25,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_tag.len(), 1);
        assert_eq!(by_tag[0].title, "lunch");
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_pin_toggle_and_cascade() {
        let (storage, user_id) = setup().await;
        let board = storage
            .boards_insert(board_insert(user_id, "sunset", 1))
            .await
            .unwrap();

        assert_eq!(
            storage.pins_toggle(user_id, board.id).await.unwrap(),
            PinToggle::Created
        );
        assert_eq!(
            storage.pins_toggle(user_id, board.id).await.unwrap(),
            PinToggle::Removed
        );
        storage.pins_toggle(user_id, board.id).await.unwrap();

        assert!(storage.boards_delete(board.id).await.unwrap());

        let pins: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pin_boards WHERE board_id = $1")
            .bind(board.id)
            .fetch_one(&storage.pool)
            .await
            .unwrap();
        let links: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tag_boards WHERE board_id = $1")
            .bind(board.id)
            .fetch_one(&storage.pool)
            .await
            .unwrap();
        assert_eq!((pins, links), (0, 0));
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_concurrent_pin_toggles_leave_at_most_one_pin() {
        let (storage, user_id) = setup().await;
        let board = storage
            .boards_insert(board_insert(user_id, "sunset", 1))
            .await
            .unwrap();

        let (first, second) = tokio::join!(
            storage.pins_toggle(user_id, board.id),
            storage.pins_toggle(user_id, board.id)
        );
        first.unwrap();
        second.unwrap();

        let pins: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM pin_boards WHERE user_id = $1 AND board_id = $2",
        )
        .bind(user_id)
        .bind(board.id)
        .fetch_one(&storage.pool)
        .await
        .unwrap();
        assert!(pins <= 1);
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_pin_unknown_board_is_missing_reference() {
        let (storage, user_id) = setup().await;
        let result = storage.pins_toggle(user_id, i64::MAX).await;
        assert!(matches!(result, Err(SqlStorageError::MissingReference(_))));
    }
}
