//! Atomic file writes: temp file in the same directory, then rename.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Sibling temp path for `final_path`.
/// Format: {dir}/.tmp.{random}.{filename}
pub fn temp_path(final_path: &Path) -> PathBuf {
    let filename = final_path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("file");
    let random: u64 = rand::random();
    final_path.with_file_name(format!(".tmp.{:016x}.{}", random, filename))
}

/// Move a finished temp file over `final_path`, replacing what was there.
/// The temp file is removed if the rename fails.
pub fn rename_into_place(temp_path: &Path, final_path: &Path) -> io::Result<()> {
    fs::rename(temp_path, final_path).inspect_err(|_| {
        let _ = fs::remove_file(temp_path);
    })
}

/// Write `content` so readers see either the old file or the new one.
pub fn write_file(final_path: &Path, content: &[u8]) -> io::Result<()> {
    if let Some(parent) = final_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let temp = temp_path(final_path);
    fs::write(&temp, content)?;
    rename_into_place(&temp, final_path)
}
