//! Unix domain socket housekeeping.

use std::io;
use std::path::Path;

use tokio::net::UnixListener;

/// Remove whatever sits at `path`: a stale socket, a file or a directory tree.
///
/// A missing entry is not an error.
pub async fn remove_stale_socket(path: &Path) -> io::Result<()> {
    match tokio::fs::symlink_metadata(path).await {
        Ok(meta) if meta.is_dir() => tokio::fs::remove_dir_all(path).await,
        Ok(_) => tokio::fs::remove_file(path).await,
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Bind a Unix listener, creating missing parent directories first.
pub async fn bind(path: &Path) -> io::Result<UnixListener> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    UnixListener::bind(path)
}
