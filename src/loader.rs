//! Getting trace text into the normalizer from disk or over HTTP.

use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::LoadError;
use crate::normalizer::normalize;
use crate::trace::TraceData;

pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

pub async fn read_trace_file(path: &Path) -> Result<String, LoadError> {
    Ok(tokio::fs::read_to_string(path).await?)
}

pub async fn load_from_file(path: &Path) -> Result<TraceData, LoadError> {
    let text = read_trace_file(path).await?;
    let data = normalize(&text);
    info!(
        "Loaded {}: {} events from {} messages",
        path.display(),
        data.events.len(),
        data.original_messages.len()
    );
    Ok(data)
}

pub fn http_client() -> Result<reqwest::Client, LoadError> {
    Ok(reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?)
}

/// Fetch a trace URL and normalize the body. Non-2xx is an error.
pub async fn load_from_url(client: &reqwest::Client, url: &str) -> Result<TraceData, LoadError> {
    debug!("Fetching trace from {}", url);
    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(LoadError::Status {
            status: response.status().as_u16(),
        });
    }
    let text = response.text().await?;
    Ok(normalize(&text))
}

/// Turn "nothing to show" into an error the user can read.
pub fn ensure_displayable(data: &TraceData) -> Result<(), LoadError> {
    if data.original_messages.is_empty() {
        return Err(LoadError::NoMessages);
    }
    if data.events.is_empty() {
        return Err(LoadError::NoEvents {
            messages: data.original_messages.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.jsonl");
        std::fs::write(
            &path,
            "{\"role\":\"user\",\"content\":\"Hello\"}\n{\"role\":\"assistant\",\"content\":\"Hi\"}\n",
        )
        .unwrap();

        let data = load_from_file(&path).await.unwrap();
        assert_eq!(data.title, "Hello");
        assert_eq!(data.events.len(), 2);
        assert!(ensure_displayable(&data).is_ok());
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_from_file(&dir.path().join("absent.jsonl")).await.unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }

    #[test]
    fn test_ensure_displayable() {
        let empty = normalize("");
        assert!(matches!(ensure_displayable(&empty), Err(LoadError::NoMessages)));

        // Non-object records are not messages
        let scalars = normalize("[1, 2, 3]");
        assert!(scalars.original_messages.is_empty());
        assert!(matches!(ensure_displayable(&scalars), Err(LoadError::NoMessages)));

        // A streaming chunk is a message, but produces no events
        let chunks = normalize("{\"object\":\"chat.completion.chunk\",\"role\":\"assistant\",\"content\":\"x\"}");
        assert!(matches!(
            ensure_displayable(&chunks),
            Err(LoadError::NoEvents { messages: 1 })
        ));
    }
}
