use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

/// Top-level application errors: config, IO, storage plumbing. Ingestion
/// failures have their own taxonomy below because the orchestrator needs
/// to classify them per entity instead of bailing out.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(#[from] tokio_rusqlite::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Per-entity failure taxonomy for the ingestion pipeline.
///
/// `Transient` and `Store` are retried with backoff up to the retry budget;
/// the rest are permanent and recorded against the offending entity only.
/// A channel-level `NotFound` is the one failure that aborts a whole run.
#[derive(Debug, Clone, Error)]
pub enum IngestError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("malformed record: {0}")]
    MalformedRecord(String),

    #[error("dangling reference: {0}")]
    DanglingReference(String),

    #[error("store failure: {0}")]
    Store(String),
}

impl IngestError {
    pub fn is_transient(&self) -> bool {
        matches!(self, IngestError::Transient(_) | IngestError::Store(_))
    }
}
