use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ServerError;

/// Uploaded images, written as flat `.png` files under one directory that
/// the router serves at `/static`.
#[derive(Debug, Clone)]
pub struct ImageStore {
    base_path: PathBuf,
}

impl ImageStore {
    pub async fn new(base_path: PathBuf) -> Result<Self, ServerError> {
        fs::create_dir_all(&base_path).await.map_err(|e| {
            ServerError::Storage(format!(
                "Failed to create upload directory '{}': {}",
                base_path.display(),
                e
            ))
        })?;

        info!(path = %base_path.display(), "Image store initialized");

        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Decode a base64 payload and write it to a fresh file.  Returns the
    /// file name.
    pub async fn store_base64(&self, encoded: &str) -> Result<String, ServerError> {
        let data = STANDARD
            .decode(encoded.trim())
            .map_err(|e| ServerError::BadRequest(format!("base64 is not decodable: {}", e)))?;
        if data.is_empty() {
            return Err(ServerError::BadRequest("Empty image".to_string()));
        }

        let name = file_name();
        let path = self.base_path.join(&name);

        fs::write(&path, &data)
            .await
            .map_err(|e| ServerError::Storage(format!("Failed to write image {}: {}", name, e)))?;

        debug!(name = %name, size = data.len(), "Stored image");
        Ok(name)
    }
}

/// `<unix millis>_<random>.png`
fn file_name() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}_{}.png", millis, &suffix[..8])
}
