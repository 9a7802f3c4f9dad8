//! Whole-file replacement that never leaves a half-written target.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use pqclip_core::PqclipResult;

/// Write `content` to a sibling temp file, fsync it, then rename over `path`.
///
/// Parent directories are created as needed. A crash at any point leaves
/// either the previous file or the new one, never a mix.
pub fn write_atomic(path: &Path, content: &[u8]) -> PqclipResult<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let tmp_path = temp_path(parent, path);
    let result = write_and_sync(&tmp_path, content).and_then(|_| fs::rename(&tmp_path, path));
    if let Err(e) = result {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }

    sync_dir(parent);
    tracing::debug!(path = %path.display(), bytes = content.len(), "file replaced atomically");
    Ok(())
}

fn temp_path(parent: &Path, path: &Path) -> PathBuf {
    parent.join(format!(
        ".{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy()
    ))
}

fn write_and_sync(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content)?;
    file.sync_all()
}

// Persist the rename itself. Not supported on every platform; best effort.
fn sync_dir(dir: &Path) {
    #[cfg(unix)]
    if let Ok(d) = File::open(dir) {
        let _ = d.sync_all();
    }
    #[cfg(not(unix))]
    let _ = dir;
}
