use std::fs::{self, File};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{Error, PathContext, Result};
use crate::snapshot::ZoomBand;

/// Create the directory if it doesn't exist; error if a non-directory exists there.
pub(crate) fn ensure_dir_exists(path: &Path) -> Result<()> {
    if path.exists() {
        if !path.is_dir() {
            return Err(Error::File {
                path: path.to_path_buf(),
                source: std::io::Error::other("path exists but is not a directory"),
            });
        }
    } else {
        fs::create_dir_all(path).with_path(path)?;
    }
    Ok(())
}

fn parent_dir(path: &Path) -> &Path {
    path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."))
}

/// Write-then-rename wrapper: the target only appears once `finalize` succeeds.
/// Dropping an unfinalized write deletes the temporary file.
pub(crate) struct PendingWrite {
    target: PathBuf,
    writer: BufWriter<NamedTempFile>,
}

pub(crate) fn open_for_write(target: &Path) -> Result<PendingWrite> {
    let dir = parent_dir(target);
    ensure_dir_exists(dir)?;
    let tmp = tempfile::Builder::new()
        .prefix(".mdlt-")
        .suffix(".partial")
        .tempfile_in(dir)
        .with_path(dir)?;
    Ok(PendingWrite { target: target.to_path_buf(), writer: BufWriter::new(tmp) })
}

impl PendingWrite {
    pub(crate) fn finalize(self) -> Result<()> {
        let target = self.target;
        let tmp = self.writer.into_inner().map_err(|e| Error::Io(e.into_error()))?;
        if let Err(e) = tmp.as_file().sync_all() {
            tracing::debug!(path = %target.display(), error = %e, "fsync of pending output failed");
        }
        tmp.persist(&target).map_err(|e| Error::File { path: target.clone(), source: e.error })?;
        let dir = parent_dir(&target);
        if let Err(e) = File::open(dir).and_then(|d| d.sync_all()) {
            tracing::debug!(dir = %dir.display(), error = %e, "fsync of output directory failed");
        }
        Ok(())
    }
}

impl Write for PendingWrite {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> { self.writer.write(buf) }
    fn flush(&mut self) -> std::io::Result<()> { self.writer.flush() }
}

/// Name of a scratch file for one band of `output`.
pub(crate) fn scratch_name(output: &Path, band: ZoomBand, kind: &str) -> String {
    let stem = output.file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    format!("{stem}.{}-{}.{kind}.scratch", band.min_zoom(), band.max_zoom())
}

/// A build-time temporary file, removed when dropped.
#[derive(Debug)]
pub(crate) struct ScratchFile {
    file: NamedTempFile,
}

impl ScratchFile {
    /// Create `dir/name`, replacing a stale file left behind by a killed process.
    pub(crate) fn create(dir: &Path, name: &str) -> Result<Self> {
        ensure_dir_exists(dir)?;
        let path = dir.join(name);
        if path.exists() {
            tracing::warn!(path = %path.display(), "removing stale scratch file");
            fs::remove_file(&path).with_path(&path)?;
        }
        let file = tempfile::Builder::new()
            .prefix(name)
            .suffix("")
            .rand_bytes(0)
            .tempfile_in(dir)
            .with_path(&path)?;
        Ok(Self { file })
    }

    #[inline] pub(crate) fn path(&self) -> &Path { self.file.path() }

    /// A second, independent handle positioned at the start of the file.
    pub(crate) fn reopen(&self) -> Result<File> {
        let mut file = self.file.reopen().with_path(self.path())?;
        file.seek(SeekFrom::Start(0))?;
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_write_only_appears_on_finalize() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.mdlt");

        let mut pending = open_for_write(&target).unwrap();
        pending.write_all(b"hello").unwrap();
        assert!(!target.exists());
        pending.finalize().unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"hello");
    }

    #[test]
    fn dropped_write_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.mdlt");
        {
            let mut pending = open_for_write(&target).unwrap();
            pending.write_all(b"partial").unwrap();
        }
        assert!(!target.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn scratch_file_is_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = {
            let scratch = ScratchFile::create(dir.path(), "world.mdlt.0-5.leaves.scratch").unwrap();
            assert!(scratch.path().exists());
            scratch.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn scratch_file_replaces_stale_copy() {
        let dir = tempfile::tempdir().unwrap();
        let name = "stale.scratch";
        fs::write(dir.path().join(name), b"old").unwrap();
        let scratch = ScratchFile::create(dir.path(), name).unwrap();
        assert_eq!(scratch.path(), dir.path().join(name));
        assert_eq!(fs::metadata(scratch.path()).unwrap().len(), 0);
    }

    #[test]
    fn scratch_names_are_deterministic() {
        let band = ZoomBand::new(7, 11).unwrap();
        assert_eq!(scratch_name(Path::new("/data/europe.mdlt"), band, "nodes"), "europe.mdlt.7-11.nodes.scratch");
    }
}
