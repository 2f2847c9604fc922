//! Transient storage: per-request files that must not outlive their request.
//!
//! Both pipelines park a file on disk for the duration of one request, an
//! uploaded photo or a rendered report. [`TransientFile`] owns such a file and
//! unlinks it when dropped, so every exit path of a handler (success, early
//! return, error, panic, client disconnect) cleans up without explicit delete
//! calls on each branch. Names come from [`tempfile`], which picks random
//! suffixes and creates with `O_EXCL`; concurrent requests never collide.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::{Builder, TempPath};
use tracing::{debug, info, warn};

use crate::config::ServerConfig;

/// Filename prefix for stored uploads.
pub const UPLOAD_PREFIX: &str = "upload-";
/// Filename prefix for rendered reports.
pub const REPORT_PREFIX: &str = "plant_analysis_report_";
/// Filename suffix for rendered reports.
pub const REPORT_SUFFIX: &str = ".pdf";

/// A file on disk that is removed when this guard is dropped.
#[derive(Debug)]
pub struct TransientFile {
    path: Option<TempPath>,
    label: &'static str,
}

impl TransientFile {
    /// Create a new uniquely named file in `dir`.
    ///
    /// Returns the open handle for writing alongside the guard. The handle can
    /// be dropped independently; the file stays until the guard goes.
    pub fn create_in(
        dir: &Path,
        prefix: &str,
        suffix: &str,
        label: &'static str,
    ) -> io::Result<(fs::File, TransientFile)> {
        let named = Builder::new()
            .prefix(prefix)
            .suffix(suffix)
            .tempfile_in(dir)?;
        let (file, path) = named.into_parts();
        debug!("Created transient {} at {}", label, path.display());
        Ok((
            file,
            TransientFile {
                path: Some(path),
                label,
            },
        ))
    }

    /// Path of the guarded file.
    pub fn path(&self) -> &Path {
        self.path.as_deref().unwrap_or_else(|| Path::new(""))
    }

    /// Remove the file now, reporting the outcome.
    pub fn remove(mut self) -> io::Result<()> {
        match self.path.take() {
            Some(path) => {
                let shown = path.to_path_buf();
                path.close()?;
                debug!("Removed transient {} {}", self.label, shown.display());
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl Drop for TransientFile {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            let shown = path.to_path_buf();
            match path.close() {
                Ok(()) => debug!("Removed transient {} {}", self.label, shown.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!(
                    "Failed to remove transient {} {}: {}",
                    self.label,
                    shown.display(),
                    e
                ),
            }
        }
    }
}

/// The two transient directories used by the server.
#[derive(Debug, Clone)]
pub struct TransientDirs {
    pub upload: PathBuf,
    pub reports: PathBuf,
}

impl TransientDirs {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            upload: config.upload_dir.clone(),
            reports: config.reports_dir.clone(),
        }
    }

    /// Create both directories if absent. Safe to call repeatedly.
    pub fn prepare(&self) -> io::Result<()> {
        fs::create_dir_all(&self.upload)?;
        fs::create_dir_all(&self.reports)?;
        debug!(
            "Transient directories ready: {}, {}",
            self.upload.display(),
            self.reports.display()
        );
        Ok(())
    }

    /// Create the reports directory if absent. Called once per report request,
    /// so a directory removed while the server runs comes back.
    pub async fn ensure_reports(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.reports).await
    }

    /// Remove files a previous process left behind (crash, kill -9).
    ///
    /// Only names carrying this crate's prefixes are touched. Returns the
    /// number of files removed.
    pub fn sweep_stale(&self) -> usize {
        let removed = sweep_dir(&self.upload, UPLOAD_PREFIX, "")
            + sweep_dir(&self.reports, REPORT_PREFIX, REPORT_SUFFIX);
        if removed > 0 {
            info!("Removed {} stale transient files", removed);
        }
        removed
    }
}

fn sweep_dir(dir: &Path, prefix: &str, suffix: &str) -> usize {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return 0,
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !name.starts_with(prefix) || !name.ends_with(suffix) {
            continue;
        }
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        match fs::remove_file(entry.path()) {
            Ok(()) => removed += 1,
            Err(e) => warn!("Could not remove stale {}: {}", entry.path().display(), e),
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn file_count(dir: &Path) -> usize {
        fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    #[test]
    fn drop_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let (mut file, guard) =
            TransientFile::create_in(dir.path(), UPLOAD_PREFIX, "", "upload").unwrap();
        file.write_all(b"leaf").unwrap();
        let path = guard.path().to_path_buf();
        assert!(path.exists());
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(UPLOAD_PREFIX));

        drop(guard);
        assert!(!path.exists());
    }

    #[test]
    fn explicit_remove_reports_success() {
        let dir = tempfile::tempdir().unwrap();
        let (_file, guard) =
            TransientFile::create_in(dir.path(), REPORT_PREFIX, REPORT_SUFFIX, "report").unwrap();
        let path = guard.path().to_path_buf();
        assert!(path.to_string_lossy().ends_with(".pdf"));
        guard.remove().expect("remove");
        assert!(!path.exists());
    }

    #[test]
    fn names_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let (_a, ga) = TransientFile::create_in(dir.path(), REPORT_PREFIX, REPORT_SUFFIX, "r").unwrap();
        let (_b, gb) = TransientFile::create_in(dir.path(), REPORT_PREFIX, REPORT_SUFFIX, "r").unwrap();
        assert_ne!(ga.path(), gb.path());
        assert_eq!(file_count(dir.path()), 2);
    }

    #[test]
    fn prepare_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        let dirs = TransientDirs {
            upload: root.path().join("upload"),
            reports: root.path().join("reports"),
        };
        dirs.prepare().unwrap();
        dirs.prepare().unwrap();
        assert!(dirs.upload.is_dir());
        assert!(dirs.reports.is_dir());
    }

    #[test]
    fn sweep_only_touches_own_files() {
        let root = tempfile::tempdir().unwrap();
        let dirs = TransientDirs {
            upload: root.path().join("upload"),
            reports: root.path().join("reports"),
        };
        fs::create_dir_all(&dirs.upload).unwrap();
        fs::create_dir_all(&dirs.reports).unwrap();
        fs::write(dirs.upload.join("upload-abc123"), b"x").unwrap();
        fs::write(dirs.upload.join("keep.txt"), b"x").unwrap();
        fs::write(dirs.reports.join("plant_analysis_report_1.pdf"), b"x").unwrap();
        fs::write(dirs.reports.join("plant_analysis_report_1.txt"), b"x").unwrap();

        assert_eq!(dirs.sweep_stale(), 2);
        assert!(dirs.upload.join("keep.txt").exists());
        assert!(dirs.reports.join("plant_analysis_report_1.txt").exists());
    }

    #[test]
    fn sweep_missing_dirs_is_noop() {
        let root = tempfile::tempdir().unwrap();
        let dirs = TransientDirs {
            upload: root.path().join("nope"),
            reports: root.path().join("nada"),
        };
        assert_eq!(dirs.sweep_stale(), 0);
    }
}
