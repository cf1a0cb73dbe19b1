//! Error types for the card API client.

use reqwest::StatusCode;
use thiserror::Error;

/// Why a single request/response cycle did not succeed.
#[derive(Debug, Error)]
pub enum RequestFailure {
    /// Connect, send, or timeout failure before a status line arrived.
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// The server answered with anything other than 2xx.
    #[error("unexpected status {0}")]
    Status(StatusCode),

    /// The body could not be decoded as the expected JSON shape.
    #[error("undecodable response body: {0}")]
    Decode(#[source] reqwest::Error),
}

/// A failed repository operation, tagged with the operation that failed.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("fetching saved cards failed: {0}")]
    Fetch(#[source] RequestFailure),

    #[error("saving card failed: {0}")]
    Save(#[source] RequestFailure),

    #[error("deleting card {id} failed: {source}")]
    Delete {
        id: String,
        #[source]
        source: RequestFailure,
    },
}

pub type RepoResult<T> = std::result::Result<T, RepoError>;
