//! Contains the errors returned at the boundary with the remote archive source.

use thiserror::Error;

/// An error returned while obtaining credentials for the remote folder.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no stored token at {0}; complete the OAuth consent flow and save the token there")]
    MissingToken(String),

    #[error("cannot read credentials from {0}")]
    ReadCredentials(String, #[source] anyhow::Error),

    #[error("cannot refresh the access token")]
    Refresh(#[source] anyhow::Error),

    #[error("cannot persist the access token to {0}")]
    Persist(String, #[source] anyhow::Error),
}

/// An error returned while fetching archives from the remote folder.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("cannot list the files of folder {0}")]
    ListFolder(String, #[source] anyhow::Error),

    #[error("cannot download file {0}")]
    Download(String, #[source] anyhow::Error),
}
