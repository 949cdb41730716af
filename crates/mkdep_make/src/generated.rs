//! Staged writes of generated files.
//!
//! Content goes to a temporary file next to the destination first and is
//! renamed into place on [`StagedFile::commit`]. Several files can be staged
//! and then committed in a fixed order; a staged file that is dropped
//! without a commit leaves the destination untouched.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use mkdep_common::ContentHash;
use tempfile::NamedTempFile;

use crate::error::WriteError;

/// How an existing destination is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Leave the destination alone when its content is already identical,
    /// so its timestamp does not trigger rebuilds.
    CopyIfDifferent,
    /// Always replace the destination.
    Replace,
}

/// The header written at the top of every generated file.
pub fn disclaimer() -> String {
    format!(
        "# mkdep generated file: DO NOT EDIT!\n# Generated by mkdep version {}\n\n",
        env!("CARGO_PKG_VERSION")
    )
}

/// A file whose new content is written but not yet in place.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    temp: Option<NamedTempFile>,
}

impl StagedFile {
    /// Writes `content` to a temporary sibling of `path`, creating the parent
    /// directory if needed.
    ///
    /// In [`WriteMode::CopyIfDifferent`], nothing is written when `path`
    /// already holds exactly `content`.
    pub fn stage(path: &Path, content: &str, mode: WriteMode) -> Result<Self, WriteError> {
        let io_err = |source| WriteError::Io {
            path: path.to_path_buf(),
            source,
        };

        if mode == WriteMode::CopyIfDifferent && ContentHash::file_matches(path, content.as_bytes()) {
            tracing::debug!(path = %path.display(), "generated file unchanged");
            return Ok(Self {
                path: path.to_path_buf(),
                temp: None,
            });
        }

        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(io_err)?;
        let mut temp = NamedTempFile::new_in(parent).map_err(io_err)?;
        temp.write_all(content.as_bytes()).map_err(io_err)?;
        temp.flush().map_err(io_err)?;
        Ok(Self {
            path: path.to_path_buf(),
            temp: Some(temp),
        })
    }

    /// The destination path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` if the destination already held the staged content.
    pub fn is_unchanged(&self) -> bool {
        self.temp.is_none()
    }

    /// Moves the staged content into place. Returns `true` if the
    /// destination was written.
    pub fn commit(self) -> Result<bool, WriteError> {
        let Some(temp) = self.temp else {
            return Ok(false);
        };
        temp.persist(&self.path).map_err(|e| WriteError::Io {
            path: self.path.clone(),
            source: e.error,
        })?;
        tracing::debug!(path = %self.path.display(), "generated file written");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};

    #[test]
    fn writes_new_file_and_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.dir/depend.make");
        let staged = StagedFile::stage(&path, "a.o: a.h\n", WriteMode::CopyIfDifferent).unwrap();
        assert!(staged.commit().unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "a.o: a.h\n");
    }

    #[test]
    fn identical_content_keeps_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("depend.make");
        fs::write(&path, "a.o: a.h\n").unwrap();
        let old = SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000);
        fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(old)
            .unwrap();

        let staged = StagedFile::stage(&path, "a.o: a.h\n", WriteMode::CopyIfDifferent).unwrap();
        assert!(staged.is_unchanged());
        assert!(!staged.commit().unwrap());
        assert_eq!(fs::metadata(&path).unwrap().modified().unwrap(), old);
    }

    #[test]
    fn replace_mode_always_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("depend.internal");
        fs::write(&path, "same\n").unwrap();
        let staged = StagedFile::stage(&path, "same\n", WriteMode::Replace).unwrap();
        assert!(!staged.is_unchanged());
        assert!(staged.commit().unwrap());
    }

    #[test]
    fn dropped_stage_leaves_destination() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("depend.make");
        fs::write(&path, "old\n").unwrap();
        drop(StagedFile::stage(&path, "new\n", WriteMode::Replace).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "old\n");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn disclaimer_is_comment_block() {
        let text = disclaimer();
        assert!(text.lines().take(2).all(|l| l.starts_with('#')));
        assert!(text.ends_with("\n\n"));
    }
}
