//! Object storage for design files, proofs, chat images and voice notes.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::errors::ServiceError;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), ServiceError>;
    async fn get(&self, key: &str) -> Result<Vec<u8>, ServiceError>;
    async fn delete(&self, key: &str) -> Result<(), ServiceError>;
    async fn exists(&self, key: &str) -> Result<bool, ServiceError>;
}

/// Keeps letters, digits, `.`, `-` and `_` and replaces everything else with
/// `_`. Arabic file names keep their letters.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_matches('.');
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed.chars().take(120).collect()
    }
}

/// Builds a fresh `{folder}/{uuid}-{name}` key.
pub fn generate_key(folder: &str, file_name: &str) -> Result<String, ServiceError> {
    let folder_ok = !folder.is_empty()
        && folder
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !folder_ok {
        return Err(ServiceError::ValidationError(format!(
            "Invalid storage folder '{folder}'"
        )));
    }
    Ok(format!(
        "{folder}/{}-{}",
        Uuid::new_v4(),
        sanitize_file_name(file_name)
    ))
}

/// Rejects keys that could escape the storage root.
pub fn validate_key(key: &str) -> Result<(), ServiceError> {
    let invalid = key.is_empty()
        || key.contains('\\')
        || key.contains('\0')
        || key.starts_with('/')
        || Path::new(key)
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
    if invalid {
        Err(ServiceError::ValidationError(format!(
            "Invalid storage key '{key}'"
        )))
    } else {
        Ok(())
    }
}

/// Stores objects as files below a root directory.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, ServiceError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

fn io_error(key: &str, e: std::io::Error) -> ServiceError {
    if e.kind() == std::io::ErrorKind::NotFound {
        ServiceError::not_found("file", key)
    } else {
        ServiceError::StorageError(format!("{key}: {e}"))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), ServiceError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(key, e))?;
        }
        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| io_error(key, e))?;
        file.write_all(bytes).await.map_err(|e| io_error(key, e))?;
        file.flush().await.map_err(|e| io_error(key, e))?;
        debug!(key, "Stored object");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, ServiceError> {
        let path = self.path_for(key)?;
        tokio::fs::read(&path).await.map_err(|e| io_error(key, e))
    }

    async fn delete(&self, key: &str) -> Result<(), ServiceError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(key, e)),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, ServiceError> {
        let path = self.path_for(key)?;
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| io_error(key, e))
    }
}

/// Guesses a content type from the file extension.
pub fn content_type_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "webm" => "audio/webm",
        "ogg" | "oga" => "audio/ogg",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "ai" | "eps" => "application/postscript",
        "psd" => "image/vnd.adobe.photoshop",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;

    #[rstest]
    #[case("../etc/passwd")]
    #[case("/abs/path")]
    #[case("orders\\x.pdf")]
    #[case("orders/../../x")]
    #[case("")]
    fn bad_keys_are_rejected(#[case] key: &str) {
        assert_matches!(validate_key(key), Err(ServiceError::ValidationError(_)));
    }

    #[test]
    fn generated_keys_are_valid_and_clean() {
        let key = generate_key("orders", "../Logo final (v2).pdf").unwrap();
        assert!(key.starts_with("orders/"));
        assert!(key.ends_with("-Logo_final__v2_.pdf"));
        validate_key(&key).unwrap();
        assert!(generate_key("../x", "a.pdf").is_err());
    }

    #[tokio::test]
    async fn local_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        let key = generate_key("chat", "voice.webm").unwrap();

        store.put(&key, b"RIFF").await.unwrap();
        assert!(store.exists(&key).await.unwrap());
        assert_eq!(store.get(&key).await.unwrap(), b"RIFF");

        store.delete(&key).await.unwrap();
        assert!(!store.exists(&key).await.unwrap());
        assert_matches!(store.get(&key).await, Err(ServiceError::NotFound(_)));
        // deleting twice is fine
        store.delete(&key).await.unwrap();
    }

    #[test]
    fn content_types() {
        assert_eq!(content_type_for("proof.PDF"), "application/pdf");
        assert_eq!(content_type_for("note.webm"), "audio/webm");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
    }
}
