mod client;
pub mod types;

pub use client::{YouTubeApi, YouTubeClient};
