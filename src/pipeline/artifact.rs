//! On-disk model artifact: a hex SHA-256 digest line followed by the JSON
//! payload it covers.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

use crate::classifier::SvmClassifier;
use crate::error::Error;
use crate::nlp::TfidfVectorizer;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub vectorizer: TfidfVectorizer,
    pub classifier: SvmClassifier,
    pub is_trained: bool,
}

fn digest(payload: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload);
    format!("{:x}", hasher.finalize())
}

impl ModelArtifact {
    /// Writes to a sibling temporary file and renames it over `path`, so a
    /// reader never sees a partial artifact.
    #[tracing::instrument(skip(self), fields(path = %path.display()))]
    pub fn save(&self, path: &Path) -> Result<(), Error> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let payload = serde_json::to_vec(self)?;
        let mut contents = digest(&payload).into_bytes();
        contents.push(b'\n');
        contents.extend_from_slice(&payload);

        let tmp = path.with_extension("tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, path)?;

        tracing::info!("Model saved");
        Ok(())
    }

    #[tracing::instrument(fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self, Error> {
        let contents = fs::read(path)?;

        let newline = contents
            .iter()
            .position(|&b| b == b'\n')
            .ok_or_else(|| Error::CorruptArtifact("missing digest line".into()))?;
        let (expected, payload) = (&contents[..newline], &contents[newline + 1..]);

        if expected != digest(payload).as_bytes() {
            return Err(Error::CorruptArtifact("digest mismatch".into()));
        }

        let artifact =
            serde_json::from_slice(payload).map_err(|e| Error::CorruptArtifact(e.to_string()))?;
        tracing::info!("Model loaded");
        Ok(artifact)
    }
}
