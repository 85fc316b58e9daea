//! Atomic single-file writes.
//!
//! Content is written to a temporary sibling file (`issue.json.tmp`), flushed,
//! then renamed over the target. On the same filesystem the rename is atomic,
//! so readers see either the old or the new record, never a torn one.

use crate::error::{Result, StorageError};
use serde::Serialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

/// Serialize `value` as pretty JSON and atomically replace `path` with it.
///
/// The temporary file is removed if writing fails.
pub async fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_vec_pretty(value).map_err(StorageError::from)?;
    let temp_path = make_temp_path(path);

    if let Err(e) = write_to_temp_file(&temp_path, &content).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(StorageError::io(&temp_path, e).into());
    }

    fs::rename(&temp_path, path)
        .await
        .map_err(|e| StorageError::io(path, e))?;

    Ok(())
}

fn make_temp_path(path: &Path) -> PathBuf {
    let mut temp_path = path.to_path_buf();
    let new_extension = match path.extension() {
        Some(ext) => {
            let mut new_ext = ext.to_os_string();
            new_ext.push(".tmp");
            new_ext
        }
        None => OsString::from("tmp"),
    };
    temp_path.set_extension(new_extension);
    temp_path
}

async fn write_to_temp_file(temp_path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(temp_path).await?;
    file.write_all(content).await?;
    file.flush().await?;
    file.sync_all().await?;
    Ok(())
}
