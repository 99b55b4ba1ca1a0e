use rusqlite::types::ValueRef;
use rusqlite::{params, ErrorCode};
use tokio_rusqlite::Connection;

use crate::error::{IngestError, Result};
use crate::models::{Channel, Comment, Playlist, Video};

use super::schema::SCHEMA;

/// Result set of a read-only analytical query.
#[derive(Debug, Clone, Default)]
pub struct TabularResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Request-scoped handle to the local dataset. All writes are upserts keyed
/// by the external API's identifiers, so re-ingesting a channel overwrites
/// rather than duplicates. Foreign keys are enforced by SQLite; a violated
/// one surfaces as `DanglingReference` instead of an orphan row.
pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;

        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    #[cfg(test)]
    pub async fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;

        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    // Upserts, one per entity kind. Each statement is atomic: either the
    // whole record becomes visible or none of it does.

    pub async fn upsert_channel(&self, channel: Channel) -> std::result::Result<(), IngestError> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO channels (channel_id, name, subscriber_count, view_count, description, uploads_playlist_id)
                       VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                       ON CONFLICT(channel_id) DO UPDATE SET
                           name = excluded.name,
                           subscriber_count = excluded.subscriber_count,
                           view_count = excluded.view_count,
                           description = excluded.description,
                           uploads_playlist_id = excluded.uploads_playlist_id,
                           fetched_at = datetime('now')"#,
                    params![
                        channel.channel_id,
                        channel.name,
                        channel.subscriber_count,
                        channel.view_count,
                        channel.description,
                        channel.uploads_playlist_id,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(map_store_error)
    }

    pub async fn upsert_playlist(
        &self,
        playlist: Playlist,
    ) -> std::result::Result<(), IngestError> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO playlists (playlist_id, channel_id, name)
                       VALUES (?1, ?2, ?3)
                       ON CONFLICT(playlist_id) DO UPDATE SET
                           channel_id = excluded.channel_id,
                           name = excluded.name"#,
                    params![playlist.playlist_id, playlist.channel_id, playlist.name],
                )?;
                Ok(())
            })
            .await
            .map_err(map_store_error)
    }

    pub async fn upsert_video(&self, video: Video) -> std::result::Result<(), IngestError> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO videos (video_id, channel_id, name, description, published_at,
                                           view_count, like_count, dislike_count, favorite_count,
                                           comment_count, duration_seconds, thumbnail_url, caption_status)
                       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                       ON CONFLICT(video_id) DO UPDATE SET
                           channel_id = excluded.channel_id,
                           name = excluded.name,
                           description = excluded.description,
                           published_at = excluded.published_at,
                           view_count = excluded.view_count,
                           like_count = excluded.like_count,
                           dislike_count = excluded.dislike_count,
                           favorite_count = excluded.favorite_count,
                           comment_count = excluded.comment_count,
                           duration_seconds = excluded.duration_seconds,
                           thumbnail_url = excluded.thumbnail_url,
                           caption_status = excluded.caption_status"#,
                    params![
                        video.video_id,
                        video.channel_id,
                        video.name,
                        video.description,
                        video.published_at.to_rfc3339(),
                        video.view_count,
                        video.like_count,
                        video.dislike_count,
                        video.favorite_count,
                        video.comment_count,
                        video.duration_seconds,
                        video.thumbnail_url,
                        video.caption_status,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(map_store_error)
    }

    pub async fn upsert_comment(&self, comment: Comment) -> std::result::Result<(), IngestError> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO comments (comment_id, video_id, author, text, published_at)
                       VALUES (?1, ?2, ?3, ?4, ?5)
                       ON CONFLICT(comment_id) DO UPDATE SET
                           video_id = excluded.video_id,
                           author = excluded.author,
                           text = excluded.text,
                           published_at = excluded.published_at"#,
                    params![
                        comment.comment_id,
                        comment.video_id,
                        comment.author,
                        comment.text,
                        comment.published_at.to_rfc3339(),
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(map_store_error)
    }

    /// Execute a read-only analytical query and return it as a table of
    /// display strings. Statements that would write are rejected before
    /// they run; this is the only surface the analytics shell consumes.
    pub async fn query(&self, sql: &str) -> Result<TabularResult> {
        let sql = sql.to_string();
        let result = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                if !stmt.readonly() {
                    return Err(tokio_rusqlite::Error::Rusqlite(
                        rusqlite::Error::InvalidQuery,
                    ));
                }

                let columns: Vec<String> = stmt
                    .column_names()
                    .into_iter()
                    .map(|name| name.to_string())
                    .collect();
                let column_count = columns.len();

                let mut out = Vec::new();
                let mut rows = stmt.query([])?;
                while let Some(row) = rows.next()? {
                    let mut record = Vec::with_capacity(column_count);
                    for idx in 0..column_count {
                        record.push(render_value(row.get_ref(idx)?));
                    }
                    out.push(record);
                }

                Ok(TabularResult { columns, rows: out })
            })
            .await?;
        Ok(result)
    }
}

fn render_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(v) => v.to_string(),
        ValueRef::Real(v) => format!("{v:.2}"),
        ValueRef::Text(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        ValueRef::Blob(_) => "<blob>".to_string(),
    }
}

fn map_store_error(err: tokio_rusqlite::Error) -> IngestError {
    if let tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(code, ref message)) = err
    {
        if code.code == ErrorCode::ConstraintViolation
            && code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY
        {
            let detail = message
                .clone()
                .unwrap_or_else(|| "foreign key constraint failed".to_string());
            return IngestError::DanglingReference(detail);
        }
    }
    IngestError::Store(err.to_string())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use crate::queries;

    use super::*;

    fn channel(id: &str, name: &str) -> Channel {
        Channel {
            channel_id: id.to_string(),
            name: name.to_string(),
            subscriber_count: 1000,
            view_count: 50_000,
            description: "a channel".to_string(),
            uploads_playlist_id: Some(format!("UU{id}")),
        }
    }

    fn video(id: &str, channel_id: &str) -> Video {
        Video {
            video_id: id.to_string(),
            channel_id: channel_id.to_string(),
            name: format!("video {id}"),
            description: String::new(),
            published_at: Utc.with_ymd_and_hms(2022, 3, 1, 10, 0, 0).unwrap(),
            view_count: 100,
            like_count: 10,
            dislike_count: 0,
            favorite_count: 0,
            comment_count: 2,
            duration_seconds: 330,
            thumbnail_url: None,
            caption_status: "false".to_string(),
        }
    }

    fn comment(id: &str, video_id: &str) -> Comment {
        Comment {
            comment_id: id.to_string(),
            video_id: video_id.to_string(),
            author: "viewer".to_string(),
            text: "nice one".to_string(),
            published_at: Utc.with_ymd_and_hms(2023, 7, 4, 12, 0, 0).unwrap(),
        }
    }

    async fn count(repo: &Repository, table: &str) -> i64 {
        let result = repo
            .query(&format!("SELECT COUNT(*) FROM {table}"))
            .await
            .unwrap();
        result.rows[0][0].parse().unwrap()
    }

    #[tokio::test]
    async fn upsert_is_idempotent_and_last_write_wins() {
        let repo = Repository::open_in_memory().await.unwrap();

        repo.upsert_channel(channel("C1", "first name"))
            .await
            .unwrap();
        repo.upsert_channel(channel("C1", "second name"))
            .await
            .unwrap();

        assert_eq!(count(&repo, "channels").await, 1);
        let result = repo
            .query("SELECT name FROM channels WHERE channel_id = 'C1'")
            .await
            .unwrap();
        assert_eq!(result.rows[0][0], "second name");
    }

    #[tokio::test]
    async fn file_backed_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("harvest.db");
        let db_path = db_path.to_str().unwrap();

        {
            let repo = Repository::new(db_path).await.unwrap();
            repo.upsert_channel(channel("C1", "persisted")).await.unwrap();
        }

        let repo = Repository::new(db_path).await.unwrap();
        assert_eq!(count(&repo, "channels").await, 1);
        // The foreign_keys pragma is part of the schema batch, so it holds
        // on the reopened connection too.
        let err = repo.upsert_comment(comment("X1", "V404")).await.unwrap_err();
        assert!(matches!(err, IngestError::DanglingReference(_)));
    }

    #[tokio::test]
    async fn orphan_playlist_is_a_dangling_reference() {
        let repo = Repository::open_in_memory().await.unwrap();

        let err = repo
            .upsert_playlist(Playlist {
                playlist_id: "P1".to_string(),
                channel_id: "missing".to_string(),
                name: "uploads".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::DanglingReference(_)));
        assert_eq!(count(&repo, "playlists").await, 0);
    }

    #[tokio::test]
    async fn orphan_comment_is_a_dangling_reference() {
        let repo = Repository::open_in_memory().await.unwrap();
        repo.upsert_channel(channel("C1", "c")).await.unwrap();

        let err = repo
            .upsert_comment(comment("X1", "missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::DanglingReference(_)));

        repo.upsert_video(video("V1", "C1")).await.unwrap();
        repo.upsert_comment(comment("X1", "V1")).await.unwrap();
        assert_eq!(count(&repo, "comments").await, 1);
    }

    #[tokio::test]
    async fn video_parent_is_channel_not_playlist() {
        let repo = Repository::open_in_memory().await.unwrap();
        repo.upsert_channel(channel("C1", "c")).await.unwrap();

        // No playlist row exists; a video still persists under its channel.
        repo.upsert_video(video("V1", "C1")).await.unwrap();
        assert_eq!(count(&repo, "videos").await, 1);
    }

    #[tokio::test]
    async fn query_rejects_writes() {
        let repo = Repository::open_in_memory().await.unwrap();
        repo.upsert_channel(channel("C1", "c")).await.unwrap();

        assert!(repo.query("DELETE FROM channels").await.is_err());
        assert_eq!(count(&repo, "channels").await, 1);
    }

    #[tokio::test]
    async fn canned_catalog_runs_against_the_schema() {
        let repo = Repository::open_in_memory().await.unwrap();
        repo.upsert_channel(channel("C1", "c")).await.unwrap();
        repo.upsert_video(video("V1", "C1")).await.unwrap();
        repo.upsert_comment(comment("X1", "V1")).await.unwrap();

        for canned in queries::CATALOG {
            let result = repo.query(canned.sql).await.unwrap_or_else(|e| {
                panic!("canned query {} failed: {e}", canned.name);
            });
            assert!(!result.columns.is_empty(), "{} has no columns", canned.name);
        }

        // Spot check: the 2022 publication query sees the March 2022 video.
        let result = repo
            .query(queries::find("channels-published-2022").unwrap().sql)
            .await
            .unwrap();
        assert_eq!(result.rows.len(), 1);
    }
}
