//! Source fetching for the device backend

use crate::audio::backend::{PlayableSource, SessionErrorKind};
use reqwest::StatusCode;
use thiserror::Error;
use tracing::debug;

/// A fetch failure, already classified for the engine
#[derive(Debug, Error)]
#[error("{message}")]
pub struct FetchError {
    pub kind: SessionErrorKind,
    pub message: String,
}

impl FetchError {
    fn new(kind: SessionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Expired or revoked stream URLs answer with one of these
fn is_stale_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::FORBIDDEN | StatusCode::NOT_FOUND | StatusCode::GONE
    )
}

/// Read the whole source into memory
pub async fn fetch_source(client: &reqwest::Client, source: &PlayableSource) -> Result<Vec<u8>, FetchError> {
    match source {
        PlayableSource::LocalFile(path) => tokio::fs::read(path).await.map_err(|e| {
            FetchError::new(
                SessionErrorKind::Unavailable,
                format!("{}: {}", path.display(), e),
            )
        }),
        PlayableSource::Remote(url) => {
            debug!("Fetching {}", url);
            let response = client
                .get(url)
                .send()
                .await
                .map_err(|e| FetchError::new(SessionErrorKind::Network, e.to_string()))?;

            let status = response.status();
            if is_stale_status(status) {
                return Err(FetchError::new(
                    SessionErrorKind::Stale,
                    format!("source answered {}", status),
                ));
            }
            if !status.is_success() {
                return Err(FetchError::new(
                    SessionErrorKind::Network,
                    format!("source answered {}", status),
                ));
            }

            let bytes = response
                .bytes()
                .await
                .map_err(|e| FetchError::new(SessionErrorKind::Network, e.to_string()))?;
            Ok(bytes.to_vec())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_stale_statuses() {
        assert!(is_stale_status(StatusCode::FORBIDDEN));
        assert!(is_stale_status(StatusCode::GONE));
        assert!(!is_stale_status(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[tokio::test]
    async fn test_missing_local_file_is_unavailable() {
        let client = reqwest::Client::new();
        let source = PlayableSource::LocalFile(PathBuf::from("/nonexistent/song.mp3"));
        let err = fetch_source(&client, &source).await.unwrap_err();
        assert_eq!(err.kind, SessionErrorKind::Unavailable);
    }

    #[tokio::test]
    async fn test_local_file_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.mp3");
        tokio::fs::write(&path, b"abc").await.unwrap();
        let client = reqwest::Client::new();
        let bytes = fetch_source(&client, &PlayableSource::LocalFile(path)).await.unwrap();
        assert_eq!(bytes, b"abc");
    }
}
