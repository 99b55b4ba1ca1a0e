mod entities;
mod report;

pub use entities::{Channel, Comment, Playlist, Video};
pub use report::{EntityKind, Failure, IngestReport, KindStats};
