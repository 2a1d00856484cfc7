use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};

pub struct MySqlPostRepo {
    pool: MySqlPool,
}

fn store_err(e: sqlx::Error) -> PostRepoError {
    PostRepoError::Store(e.to_string())
}

impl MySqlPostRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlPostRepo { pool }
    }

    fn row_to_post(row: &MySqlRow, media: Vec<PostMedia>) -> Result<Post, PostRepoError> {
        Ok(Post {
            id: row.try_get("id").map_err(store_err)?,
            author: AuthorRef {
                user_id: row.try_get("author_id").map_err(store_err)?,
                username: row.try_get("author_username").map_err(store_err)?,
            },
            category_id: row.try_get("category_id").map_err(store_err)?,
            title: row.try_get("title").map_err(store_err)?,
            description: row.try_get("description").map_err(store_err)?,
            price: Price(row.try_get::<u64, _>("price").map_err(store_err)?),
            location: row.try_get("location").map_err(store_err)?,
            status: row.try_get("status").map_err(store_err)?,
            rejected_reason: row.try_get("rejected_reason").map_err(store_err)?,
            approved_at: row.try_get("approved_at").map_err(store_err)?,
            created_at: row.try_get("created_at").map_err(store_err)?,
            updated_at: row.try_get("updated_at").map_err(store_err)?,
            media,
        })
    }

    fn row_to_media(row: &MySqlRow) -> Result<PostMedia, PostRepoError> {
        Ok(PostMedia {
            media_type: row.try_get("type").map_err(store_err)?,
            url: row.try_get("url").map_err(store_err)?,
            thumbnail_url: row.try_get("thumbnail_url").map_err(store_err)?,
            width: row.try_get("width").map_err(store_err)?,
            height: row.try_get("height").map_err(store_err)?,
            position: row.try_get("position").map_err(store_err)?,
        })
    }

    async fn load_media(&self, post_id: PostId) -> Result<Vec<PostMedia>, PostRepoError> {
        let rows = sqlx::query(
            r#"
SELECT type, url, thumbnail_url, width, height, position
FROM post_media
WHERE post_id = ?
ORDER BY position
"#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        rows.iter().map(Self::row_to_media).collect()
    }
}

#[async_trait::async_trait]
impl PostRepo for MySqlPostRepo {
    async fn create(&self, draft: NewPost, now: DateTime<Utc>) -> Result<Post, PostRepoError> {
        // validated before anything touches the database; the id is assigned on insert
        let mut post = Post::new_pending(PostId(0), draft, now)?;

        let mut tx = self.pool.begin().await.map_err(store_err)?;
        let inserted = sqlx::query(
            r#"
INSERT INTO posts (author_id, category_id, title, description, price, location,
                   status, rejected_reason, approved_at, created_at, updated_at)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
"#,
        )
        .bind(post.author.user_id)
        .bind(post.category_id)
        .bind(&post.title)
        .bind(&post.description)
        .bind(post.price.0)
        .bind(&post.location)
        .bind(post.status)
        .bind(&post.rejected_reason)
        .bind(post.approved_at)
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(store_err)?;
        post.id = PostId(inserted.last_insert_id() as i64);

        for media in &post.media {
            sqlx::query(
                r#"
INSERT INTO post_media (post_id, type, url, thumbnail_url, width, height, position, created_at)
VALUES (?, ?, ?, ?, ?, ?, ?, ?)
"#,
            )
            .bind(post.id)
            .bind(media.media_type)
            .bind(&media.url)
            .bind(&media.thumbnail_url)
            .bind(media.width)
            .bind(media.height)
            .bind(media.position)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(store_err)?;
        }

        tx.commit().await.map_err(store_err)?;
        Ok(post)
    }

    async fn load(&self, post_id: PostId) -> Result<Option<Post>, PostRepoError> {
        let row_opt: Option<MySqlRow> = sqlx::query(
            r#"
SELECT p.id, p.author_id, u.username AS author_username, p.category_id, p.title,
       p.description, p.price, p.location, p.status, p.rejected_reason,
       p.approved_at, p.created_at, p.updated_at
FROM posts p
JOIN users u ON u.id = p.author_id
WHERE p.id = ?
"#,
        )
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        let Some(row) = row_opt else {
            return Ok(None);
        };
        let media = self.load_media(post_id).await?;
        Self::row_to_post(&row, media).map(Some)
    }

    /// Writes the listing fields back. Media rows are only written on create.
    async fn save(&self, post: &Post, expected: PostStatus) -> Result<(), PostRepoError> {
        let updated = sqlx::query(
            r#"
UPDATE posts
SET category_id = ?, title = ?, description = ?, price = ?, location = ?,
    status = ?, rejected_reason = ?, approved_at = ?, updated_at = ?
WHERE id = ? AND status = ?
"#,
        )
        .bind(post.category_id)
        .bind(&post.title)
        .bind(&post.description)
        .bind(post.price.0)
        .bind(&post.location)
        .bind(post.status)
        .bind(&post.rejected_reason)
        .bind(post.approved_at)
        .bind(post.updated_at)
        .bind(post.id)
        .bind(expected)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        if updated.rows_affected() == 1 {
            return Ok(());
        }

        // lost the race, or the row is gone
        let current: Option<PostStatus> = sqlx::query_scalar("SELECT status FROM posts WHERE id = ?")
            .bind(post.id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        match current {
            Some(from) => Err(PostError::InvalidStateTransition { from }.into()),
            None => Err(PostRepoError::NotFound),
        }
    }

    async fn list_by_status(
        &self,
        status: PostStatus,
        page: PageRequest,
    ) -> Result<PostPage, PostRepoError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE status = ?")
            .bind(status)
            .fetch_one(&self.pool)
            .await
            .map_err(store_err)?;

        let rows = sqlx::query(
            r#"
SELECT p.id, p.author_id, u.username AS author_username, p.category_id, p.title,
       p.description, p.price, p.location, p.status, p.rejected_reason,
       p.approved_at, p.created_at, p.updated_at
FROM posts p
JOIN users u ON u.id = p.author_id
WHERE p.status = ?
ORDER BY p.created_at DESC, p.id DESC
LIMIT ? OFFSET ?
"#,
        )
        .bind(status)
        .bind(page.size)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            let post_id: PostId = row.try_get("id").map_err(store_err)?;
            let media = self.load_media(post_id).await?;
            items.push(Self::row_to_post(row, media)?);
        }

        Ok(PostPage {
            items,
            page: page.page,
            size: page.size,
            total: total.max(0) as u64,
        })
    }
}
