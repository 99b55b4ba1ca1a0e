//! Canned analytical questions over the harvested dataset.
//!
//! The catalog is data, not logic: each entry pairs a stable name with a
//! read-only SQL statement the repository executes verbatim. Durations are
//! already stored as seconds, so no time-of-day arithmetic is needed.

pub struct CannedQuery {
    pub name: &'static str,
    pub question: &'static str,
    pub sql: &'static str,
}

pub fn find(name: &str) -> Option<&'static CannedQuery> {
    CATALOG.iter().find(|query| query.name == name)
}

pub const CATALOG: &[CannedQuery] = &[
    CannedQuery {
        name: "videos-with-channels",
        question: "Names of all videos and their corresponding channels",
        sql: "SELECT v.name AS video_name, c.name AS channel_name \
              FROM videos v \
              JOIN channels c ON v.channel_id = c.channel_id",
    },
    CannedQuery {
        name: "channels-most-videos",
        question: "Channels with the most number of videos",
        sql: "SELECT c.name AS channel_name, COUNT(v.video_id) AS video_count \
              FROM channels c \
              JOIN videos v ON c.channel_id = v.channel_id \
              GROUP BY c.name \
              ORDER BY video_count DESC",
    },
    CannedQuery {
        name: "top-viewed",
        question: "Top 10 most viewed videos and their channels",
        sql: "SELECT v.name AS video_name, c.name AS channel_name, v.view_count \
              FROM videos v \
              JOIN channels c ON v.channel_id = c.channel_id \
              ORDER BY v.view_count DESC \
              LIMIT 10",
    },
    CannedQuery {
        name: "comments-per-video",
        question: "How many comments were made on each video",
        sql: "SELECT v.name AS video_name, COUNT(co.comment_id) AS comment_count \
              FROM videos v \
              JOIN comments co ON v.video_id = co.video_id \
              GROUP BY v.name",
    },
    CannedQuery {
        name: "top-liked",
        question: "Videos with the highest number of likes and their channels",
        sql: "SELECT v.name AS video_name, c.name AS channel_name, v.like_count \
              FROM videos v \
              JOIN channels c ON v.channel_id = c.channel_id \
              ORDER BY v.like_count DESC \
              LIMIT 10",
    },
    CannedQuery {
        name: "likes-vs-dislikes",
        question: "Total likes and dislikes for each video",
        sql: "SELECT v.name AS video_name, v.like_count, v.dislike_count FROM videos v",
    },
    CannedQuery {
        name: "views-per-channel",
        question: "Total number of views for each channel",
        sql: "SELECT c.name AS channel_name, SUM(v.view_count) AS total_views \
              FROM channels c \
              JOIN videos v ON c.channel_id = v.channel_id \
              GROUP BY c.name",
    },
    CannedQuery {
        name: "channels-published-2022",
        question: "Channels that published videos in 2022",
        sql: "SELECT DISTINCT c.name AS channel_name \
              FROM channels c \
              JOIN videos v ON c.channel_id = v.channel_id \
              WHERE strftime('%Y', v.published_at) = '2022'",
    },
    CannedQuery {
        name: "avg-duration-per-channel",
        question: "Average video duration for each channel, in seconds",
        sql: "SELECT c.name AS channel_name, AVG(v.duration_seconds) AS avg_duration_seconds \
              FROM videos v \
              JOIN channels c ON v.channel_id = c.channel_id \
              GROUP BY c.name",
    },
    CannedQuery {
        name: "top-commented",
        question: "Videos with the highest number of comments and their channels",
        sql: "SELECT v.name AS video_name, c.name AS channel_name, \
                     COUNT(co.comment_id) AS comment_count \
              FROM videos v \
              JOIN comments co ON v.video_id = co.video_id \
              JOIN channels c ON v.channel_id = c.channel_id \
              GROUP BY v.name, c.name \
              ORDER BY comment_count DESC \
              LIMIT 10",
    },
];
