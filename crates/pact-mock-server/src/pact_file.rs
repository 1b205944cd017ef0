//! Pact file persistence

use crate::error::{MockServerError, MockServerResult};
use pact_models::Pact;
use std::path::{Path, PathBuf};
use tracing::info;

/// Write the pact's original document to `dir/<consumer>-<provider>.json`
///
/// The directory is created if missing. Returns the written path.
pub async fn write_pact(pact: &Pact, dir: &Path) -> MockServerResult<PathBuf> {
    tokio::fs::create_dir_all(dir).await.map_err(|e| {
        MockServerError::io(format!("Failed to create pact directory {}", dir.display()), e)
    })?;

    let path = dir.join(pact.default_file_name());
    let json = pact.to_json_pretty()?;
    tokio::fs::write(&path, json)
        .await
        .map_err(|e| MockServerError::io(format!("Failed to write pact file {}", path.display()), e))?;

    info!(path = %path.display(), "pact file written");
    Ok(path)
}

/// Load a pact document from disk
pub async fn read_pact(path: &Path) -> MockServerResult<Pact> {
    let json = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| MockServerError::io(format!("Failed to read pact file {}", path.display()), e))?;
    Ok(Pact::from_json_str(&json)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PACT: &str = r#"{
        "consumer": {"name": "web"},
        "provider": {"name": "users"},
        "interactions": [
            {"description": "list", "request": {"method": "GET", "path": "/users"}, "response": {"status": 200, "body": [1, 2]}}
        ],
        "metadata": {"pactSpecification": {"version": "2.0.0"}}
    }"#;

    #[tokio::test]
    async fn test_write_creates_directory_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("pacts");
        let pact = Pact::from_json_str(PACT).unwrap();

        let path = write_pact(&pact, &target).await.unwrap();
        assert_eq!(path, target.join("web-users.json"));

        let reloaded = read_pact(&path).await.unwrap();
        assert_eq!(reloaded.source(), pact.source());
        assert_eq!(reloaded.interactions, pact.interactions);
    }

    #[tokio::test]
    async fn test_write_into_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();

        let pact = Pact::from_json_str(PACT).unwrap();
        let err = write_pact(&pact, &blocker).await.unwrap_err();
        assert!(matches!(err, MockServerError::Io { .. }));
    }

    #[tokio::test]
    async fn test_read_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            read_pact(&path).await.unwrap_err(),
            MockServerError::MalformedPact(_)
        ));
    }
}
