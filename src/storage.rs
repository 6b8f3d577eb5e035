//! Attachment storage: GCS bucket or local filesystem fallback.
//!
//! Uploads return a public URL directly embeddable by clients. The local
//! backend is served back through the `/media/{*path}` route.

use bytes::Bytes;
use rand::Rng;
use std::path::PathBuf;

#[derive(Clone)]
pub struct StorageClient {
    gcs: Option<google_cloud_storage::client::Storage>,
    local_path: Option<PathBuf>,
    bucket_name: String,
}

impl StorageClient {
    pub fn new(
        gcs: Option<google_cloud_storage::client::Storage>,
        local_path: Option<PathBuf>,
        bucket_name: String,
    ) -> Self {
        Self {
            gcs,
            local_path,
            bucket_name,
        }
    }

    pub fn local_path(&self) -> Option<&PathBuf> {
        self.local_path.as_ref()
    }

    /// Upload a file and return its public URL.
    pub async fn upload(
        &self,
        data: &[u8],
        _content_type: &str,
        original_name: &str,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let key = attachment_key(original_name);

        if let Some(local_path) = &self.local_path {
            let full_path = local_path.join(&key);
            if let Some(parent) = full_path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&full_path, data).await?;
            Ok(format!("/media/{}", key))
        } else if let Some(gcs) = &self.gcs {
            let bucket = format!("projects/_/buckets/{}", self.bucket_name);
            let bytes = Bytes::copy_from_slice(data);
            gcs.write_object(&bucket, &key, bytes).send_buffered().await?;
            Ok(public_url(&self.bucket_name, &key))
        } else {
            Err("No storage backend configured (set LOCAL_STORAGE_PATH or GOOGLE_APPLICATION_CREDENTIALS)".into())
        }
    }

    /// Read a locally stored attachment (local backend only).
    pub async fn read_local(
        &self,
        key: &str,
    ) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>> {
        let local_path = self
            .local_path
            .as_ref()
            .ok_or("Local storage not configured")?;
        Ok(tokio::fs::read(local_path.join(key)).await?)
    }
}

/// Random, collision-resistant object key keeping the original filename
fn attachment_key(original_name: &str) -> String {
    let nonce: u64 = rand::rng().random();
    format!("lingopet-{:016x}-{}", nonce, sanitize_name(original_name))
}

fn public_url(bucket: &str, key: &str) -> String {
    format!("https://storage.googleapis.com/{}/{}", bucket, key)
}

/// Strip path separators and other unsafe characters from a client filename
fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_key_shape() {
        let key = attachment_key("voice note.mp3");
        assert!(key.starts_with("lingopet-"));
        assert!(key.ends_with("voice_note.mp3"));
        assert!(!key.contains('/'));
    }

    #[test]
    fn test_sanitize_rejects_traversal() {
        assert_eq!(sanitize_name("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize_name(""), "file");
    }

    #[test]
    fn test_public_url_shape() {
        assert_eq!(
            public_url("pets-bucket", "lingopet-00-a.png"),
            "https://storage.googleapis.com/pets-bucket/lingopet-00-a.png"
        );
    }
}
