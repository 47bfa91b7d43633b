//! Unified error types for the ads.txt optimizer.
//!
//! Remote-resource failures (unreachable hosts, 404s, HTML served as
//! sellers.json) are deliberately not represented here: those are encoded as
//! [`crate::cache::FetchStatus`] values on the cached record so that the
//! classification pipeline can degrade per-domain instead of aborting. Only
//! store-level and caller-input failures surface as `Error`.

use tokio_rusqlite::rusqlite;

/// Unified error types for the optimizer engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty ads.txt content).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// A domain that cannot be normalized into a fetchable host.
    #[error("INVALID_DOMAIN: {0}")]
    InvalidDomain(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Cached sellers.json content could not be parsed.
    #[error("PARSE_ERROR: {0}")]
    ParseFailed(String),

    /// HTTP client construction failed.
    #[error("CLIENT_ERROR: {0}")]
    ClientBuild(String),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}
