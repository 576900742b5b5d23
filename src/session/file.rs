use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;

use crate::error::FileError;

/// A dataset the user picked for upload.
///
/// Content is shared, so cloning a handle into an in-flight request is cheap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    name: String,
    bytes: Arc<[u8]>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes: Arc::from(bytes),
        }
    }

    pub async fn from_path(path: &Path) -> Result<Self, FileError> {
        let bytes = tokio::fs::read(path).await.map_err(|source| FileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "dataset.csv".to_string());
        Ok(Self::new(name, bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn sha256(&self) -> String {
        hex::encode(Sha256::digest(self.bytes()))
    }

    pub fn mime_type(&self) -> &'static str {
        let lower = self.name.to_lowercase();
        if lower.ends_with(".csv") {
            "text/csv"
        } else if lower.ends_with(".json") {
            "application/json"
        } else {
            "application/octet-stream"
        }
    }
}
