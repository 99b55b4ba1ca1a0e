pub const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

-- channels table
CREATE TABLE IF NOT EXISTS channels (
    channel_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    subscriber_count INTEGER NOT NULL DEFAULT 0,
    view_count INTEGER NOT NULL DEFAULT 0,
    description TEXT,
    uploads_playlist_id TEXT,
    fetched_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- playlists table
CREATE TABLE IF NOT EXISTS playlists (
    playlist_id TEXT PRIMARY KEY,
    channel_id TEXT NOT NULL REFERENCES channels(channel_id),
    name TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_playlists_channel_id ON playlists(channel_id);

-- videos table; the enforced parent is the channel, not the playlist a
-- video was discovered through
CREATE TABLE IF NOT EXISTS videos (
    video_id TEXT PRIMARY KEY,
    channel_id TEXT NOT NULL REFERENCES channels(channel_id),
    name TEXT NOT NULL,
    description TEXT,
    published_at TEXT NOT NULL,
    view_count INTEGER NOT NULL DEFAULT 0,
    like_count INTEGER NOT NULL DEFAULT 0,
    dislike_count INTEGER NOT NULL DEFAULT 0,
    favorite_count INTEGER NOT NULL DEFAULT 0,
    comment_count INTEGER NOT NULL DEFAULT 0,
    duration_seconds INTEGER NOT NULL DEFAULT 0,
    thumbnail_url TEXT,
    caption_status TEXT
);

CREATE INDEX IF NOT EXISTS idx_videos_channel_id ON videos(channel_id);
CREATE INDEX IF NOT EXISTS idx_videos_published_at ON videos(published_at DESC);

-- comments table (top-level threads only)
CREATE TABLE IF NOT EXISTS comments (
    comment_id TEXT PRIMARY KEY,
    video_id TEXT NOT NULL REFERENCES videos(video_id),
    author TEXT,
    text TEXT,
    published_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_comments_video_id ON comments(video_id);
"#;
