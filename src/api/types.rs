//! Shared state and helpers for the API layer.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use axum::extract::Multipart;
use rusqlite::Connection;

use crate::agents::client::AgentRunner;
use crate::api::error::ApiError;
use crate::config::Config;
use crate::extraction::vision::VisionExtractor;

/// Shared context for all API routes.
#[derive(Clone)]
pub struct ApiContext {
    pub db: Arc<Mutex<Connection>>,
    pub agents: Arc<dyn AgentRunner>,
    pub vision: Arc<dyn VisionExtractor>,
    pub config: Arc<Config>,
}

impl ApiContext {
    pub fn new(
        db: Connection,
        agents: Arc<dyn AgentRunner>,
        vision: Arc<dyn VisionExtractor>,
        config: Config,
    ) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            agents,
            vision,
            config: Arc::new(config),
        }
    }

    /// Lock the database connection. Guards must not be held across awaits.
    pub fn lock_db(&self) -> Result<MutexGuard<'_, Connection>, ApiError> {
        self.db.lock().map_err(|_| ApiError::Internal("database lock poisoned".into()))
    }
}

/// An uploaded file pulled out of a multipart body.
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Read the first file field from a multipart body.
pub async fn read_upload(multipart: &mut Multipart) -> Result<UploadedFile, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        let is_file = field.file_name().is_some() || field.name() == Some("file");
        if !is_file {
            continue;
        }
        let file_name = sanitize_file_name(field.file_name().unwrap_or("upload"));
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("failed to read upload: {e}")))?
            .to_vec();
        if bytes.is_empty() {
            return Err(ApiError::BadRequest("uploaded file is empty".into()));
        }
        return Ok(UploadedFile { file_name, bytes });
    }
    Err(ApiError::BadRequest("no file field in upload".into()))
}

/// Keep only the final path component and strip characters that could
/// escape the upload directory.
pub fn sanitize_file_name(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    let cleaned: String = base
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    if cleaned.trim_matches('.').is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

/// Write an upload under `dir` with a millisecond-timestamp prefix so
/// repeated uploads of the same file never collide.
pub fn save_upload(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf, ApiError> {
    std::fs::create_dir_all(dir)
        .map_err(|e| ApiError::Internal(format!("upload directory: {e}")))?;
    let unique_name = format!("{}_{}", chrono::Utc::now().timestamp_millis(), file_name);
    let path = dir.join(unique_name);
    std::fs::write(&path, bytes)
        .map_err(|e| ApiError::Internal(format!("failed to store upload: {e}")))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_directories() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\temp\\rx.jpg"), "rx.jpg");
    }

    #[test]
    fn sanitize_keeps_simple_names() {
        assert_eq!(sanitize_file_name("checkin-03.wav"), "checkin-03.wav");
    }

    #[test]
    fn sanitize_rejects_hostile_names() {
        assert_eq!(sanitize_file_name("...."), "upload");
        assert_eq!(sanitize_file_name(""), "upload");
    }

    #[test]
    fn save_upload_prefixes_and_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_upload(dir.path(), "rx.jpg", b"bytes").unwrap();
        assert!(path.exists());
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.ends_with("_rx.jpg"));
        assert_eq!(std::fs::read(&path).unwrap(), b"bytes");
    }
}
