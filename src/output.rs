//! Output management module
//!
//! Classified rows are written to a temporary file next to each
//! destination and only moved into place once the whole run succeeded.
//! A failed run therefore never leaves a half-written hashset behind.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use bytesize::ByteSize;
use tempfile::{Builder, NamedTempFile};

use crate::classify::{ClassifiedBatch, Outputs, RowSink};
use crate::error::{ExtractError, Result};

/// Default buffer size for output files (8MB)
pub const DEFAULT_BUFFER_SIZE: usize = 8 * 1024 * 1024;

/// Writes rows verbatim, counting lines and bytes
///
/// A row without a terminator (the last line of an input file) gets a
/// `\n` only if another row follows it, so rows from consecutive input
/// files are never glued together.
pub struct RowWriter<W: Write> {
    inner: W,
    rows_written: u64,
    bytes_written: u64,
    open_row: bool,
}

impl<W: Write> RowWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            rows_written: 0,
            bytes_written: 0,
            open_row: false,
        }
    }

    pub fn write_row(&mut self, row: &[u8]) -> io::Result<()> {
        if self.open_row {
            self.inner.write_all(b"\n")?;
            self.bytes_written += 1;
        }

        self.inner.write_all(row)?;
        self.rows_written += 1;
        self.bytes_written += row.len() as u64;
        self.open_row = !row.ends_with(b"\n");
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// An output file being written through a temporary file
pub struct StagedOutput {
    writer: RowWriter<BufWriter<NamedTempFile>>,
    path: PathBuf,
    target: PathBuf,
}

impl StagedOutput {
    /// Create the temporary file in the destination's directory
    ///
    /// Fails right away if the destination directory is not writable. A
    /// symlinked destination is staged next to, and committed onto, the file
    /// it points to. The committed file keeps the permissions of the file it
    /// replaces; a new file gets the usual `0o666` minus umask.
    pub fn create(path: &Path, buffer_size: usize) -> Result<Self> {
        let write_error = |source| ExtractError::OutputWrite {
            path: path.to_path_buf(),
            source,
        };

        let target = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let existing = fs::metadata(&target).ok().filter(|m| m.is_file());

        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut builder = Builder::new();
        builder.prefix(".nsrl-extract");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            builder.permissions(fs::Permissions::from_mode(0o666));
        }

        let temp = builder.tempfile_in(dir).map_err(write_error)?;

        if let Some(existing) = existing {
            temp.as_file()
                .set_permissions(existing.permissions())
                .map_err(write_error)?;
        }

        log::debug!("Staging {:?} at {:?}", path, temp.path());

        Ok(Self {
            writer: RowWriter::new(BufWriter::with_capacity(buffer_size, temp)),
            path: path.to_path_buf(),
            target,
        })
    }

    pub fn rows_written(&self) -> u64 {
        self.writer.rows_written()
    }

    pub fn bytes_written(&self) -> u64 {
        self.writer.bytes_written()
    }

    /// Flush and move the staged file onto the destination path
    pub fn commit(self) -> Result<PathBuf> {
        let path = self.path;
        let target = self.target;
        let write_error = |source| ExtractError::OutputWrite {
            path: path.clone(),
            source,
        };

        let mut writer = self.writer;
        writer.flush().map_err(write_error)?;

        let temp = writer
            .into_inner()
            .into_inner()
            .map_err(|e| write_error(e.into_error()))?;
        temp.as_file().sync_all().map_err(write_error)?;

        let file: File = temp.persist(&target).map_err(|e| write_error(e.error))?;
        drop(file);

        Ok(path)
    }
}

impl RowSink for StagedOutput {
    fn accept(&mut self, row: &[u8]) -> Result<()> {
        self.writer
            .write_row(row)
            .map_err(|source| ExtractError::OutputWrite {
                path: self.path.clone(),
                source,
            })
    }
}

/// The known-good and known-bad destinations of a run
#[derive(Default)]
pub struct OutputSet {
    pub good: Option<StagedOutput>,
    pub bad: Option<StagedOutput>,
}

impl OutputSet {
    /// Stage every requested destination
    pub fn create(good: Option<&Path>, bad: Option<&Path>, buffer_size: usize) -> Result<Self> {
        let good = good
            .map(|p| StagedOutput::create(p, buffer_size))
            .transpose()?;
        let bad = bad
            .map(|p| StagedOutput::create(p, buffer_size))
            .transpose()?;

        Ok(Self { good, bad })
    }

    /// Sinks for the classifier
    pub fn outputs(&mut self) -> Outputs<'_> {
        Outputs {
            good: self.good.as_mut().map(|s| s as &mut dyn RowSink),
            bad: self.bad.as_mut().map(|s| s as &mut dyn RowSink),
        }
    }

    /// Commit known-good then known-bad
    ///
    /// Both commits are attempted. On failure the error names the file that
    /// could not be written and every file that was.
    pub fn commit(self) -> Result<Vec<PathBuf>> {
        let mut committed = Vec::new();
        let mut failure: Option<(PathBuf, io::Error)> = None;

        for staged in [self.good, self.bad].into_iter().flatten() {
            let rows = staged.rows_written();
            let bytes = staged.bytes_written();
            match staged.commit() {
                Ok(path) => {
                    log::info!("Wrote {} rows ({}) to {:?}", rows, ByteSize(bytes), path);
                    committed.push(path);
                }
                Err(ExtractError::OutputWrite { path, source }) => {
                    log::error!("Could not write {:?}: {}", path, source);
                    if failure.is_none() {
                        failure = Some((path, source));
                    }
                }
                Err(other) => return Err(other),
            }
        }

        match failure {
            Some((failed, source)) => Err(ExtractError::PartialCommit {
                failed,
                source,
                committed,
            }),
            None => Ok(committed),
        }
    }
}

/// Write an in-memory batch to its destinations
///
/// A destination is only written when both its path and its rows are
/// present.
pub fn write_batch(
    batch: &ClassifiedBatch,
    good: Option<&Path>,
    bad: Option<&Path>,
) -> Result<Vec<PathBuf>> {
    let good = good.filter(|_| batch.good.is_some());
    let bad = bad.filter(|_| batch.bad.is_some());

    let mut set = OutputSet::create(good, bad, DEFAULT_BUFFER_SIZE)?;

    if let Some(out) = set.good.as_mut() {
        for row in batch.good.iter().flatten() {
            out.accept(row)?;
        }
    }
    if let Some(out) = set.bad.as_mut() {
        for row in batch.bad.iter().flatten() {
            out.accept(row)?;
        }
    }

    set.commit()
}
