//! Utility functions for staging file names and directories

use std::path::Path;

/// Longest file name component kept for a staged file
const MAX_STAGED_NAME_LEN: usize = 128;

/// Make a display name safe to use as a single local path component
///
/// Path separators, control characters, and characters Windows rejects are
/// replaced with `_`. Leading dots are stripped so the result can never be `.`,
/// `..`, or a hidden file. Empty results become `"file"`.
///
/// # Examples
///
/// ```
/// use file_relay::utils::sanitize_file_name;
///
/// assert_eq!(sanitize_file_name("../../etc/passwd"), "_.._etc_passwd");
/// assert_eq!(sanitize_file_name("photo.jpg"), "photo.jpg");
/// assert_eq!(sanitize_file_name(""), "file");
/// ```
pub fn sanitize_file_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = replaced.trim_start_matches('.').trim();
    let truncated: String = trimmed.chars().take(MAX_STAGED_NAME_LEN).collect();

    if truncated.is_empty() {
        "file".to_string()
    } else {
        truncated
    }
}

/// Remove every regular file directly inside `dir`, returning how many were removed
///
/// A missing directory counts as empty. Subdirectories are left alone.
pub async fn clear_directory(dir: &Path) -> std::io::Result<usize> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let mut removed = 0;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            tokio::fs::remove_file(entry.path()).await?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Remove a staged file, ignoring one that is already gone
///
/// Failures are logged rather than returned; a leftover staged file must not
/// change a task's outcome.
pub async fn remove_staged(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!(path = %path.display(), "Removed staged file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove staged file")
        }
    }
}
