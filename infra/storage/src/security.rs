use crate::error::StorageError;
use std::path::{Path, PathBuf};

const MAX_KEY_LEN: usize = 128;

/// Blob keys are opaque entry ids. Only the URL-safe id alphabet is accepted so a key
/// can never name a directory, a parent segment or a temporary file.
pub(crate) fn validate_key(id: &str) -> Result<(), StorageError> {
    if id.is_empty() {
        return Err(StorageError::InvalidKey {
            message: "EMPTY".into(),
            context: Some("Blob key cannot be empty".into()),
        });
    }

    if id.len() > MAX_KEY_LEN {
        return Err(StorageError::InvalidKey {
            message: id.to_owned().into(),
            context: Some(format!("Blob key exceeds {MAX_KEY_LEN} bytes").into()),
        });
    }

    if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err(StorageError::InvalidKey {
            message: id.to_owned().into(),
            context: Some("Blob key contains illegal characters".into()),
        });
    }

    Ok(())
}

/// Maps a key onto `<root>/<id[0..2]>/<id[2..4]>/<id>`. Keys shorter than four
/// characters are stored directly under the root.
pub(crate) fn resolve_sharded(root: &Path, id: &str) -> Result<PathBuf, StorageError> {
    validate_key(id)?;

    let mut path = root.to_path_buf();
    if id.len() >= 4 {
        path.push(&id[0..2]);
        path.push(&id[2..4]);
    }
    path.push(id);

    if path.starts_with(root) {
        Ok(path)
    } else {
        Err(StorageError::InvalidKey {
            message: path.display().to_string().into(),
            context: Some("Resolved blob path is outside the store root".into()),
        })
    }
}
