//! Error types for the remote depot collaborator

use thiserror::Error;

/// Errors surfaced by a depot transport.
///
/// The checkout core maps these into its stage-level taxonomy at the call
/// site; this crate only distinguishes what the transport itself can see.
#[derive(Error, Debug)]
pub enum RemoteError {
    /// The server could not be reached at the transport level
    #[error("cannot reach depot server: {0}")]
    Connectivity(String),

    /// The server refused the credential or the session token
    #[error("depot authentication failed: {0}")]
    Auth(String),

    /// The server understood the request and rejected it
    #[error("depot rejected request: {0}")]
    Rejected(String),

    /// The server answered with something this client cannot decode
    #[error("malformed depot response: {0}")]
    Protocol(String),
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RemoteError::Protocol(err.to_string())
        } else {
            RemoteError::Connectivity(err.to_string())
        }
    }
}
