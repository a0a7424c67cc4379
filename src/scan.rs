//! Row scanning for NSRL-style delimited files
//!
//! Both the Prod catalog and the signature files are line-oriented and
//! comma-delimited. This module provides the one primitive they share:
//! walk the rows of a file without buffering it, hand out each row's raw
//! bytes untouched, and pull individual fields out on demand.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use bstr::ByteSlice;

use crate::cli::{FieldMode, MalformedPolicy};
use crate::error::{ExtractError, InputRole, Result};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// One row of an input file
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    /// Exact bytes of the row, terminator included
    pub raw: &'a [u8],
    /// Row content used for field access: no terminator, no leading BOM
    pub body: &'a [u8],
    /// 1-based line number
    pub line: u64,
}

/// Memory-mapped reader over the rows of one file
pub struct RowScanner {
    path: PathBuf,
    role: InputRole,
    mmap: Option<memmap2::Mmap>,
}

impl RowScanner {
    /// Map a file for scanning
    pub fn open(path: &Path, role: InputRole) -> Result<Self> {
        let file = File::open(path).map_err(|source| open_error(path, role, source))?;
        let len = file
            .metadata()
            .map_err(|source| open_error(path, role, source))?
            .len();

        // Zero-length files cannot be mapped on every platform
        let mmap = if len == 0 {
            None
        } else {
            let mmap = unsafe { memmap2::Mmap::map(&file) }
                .map_err(|source| open_error(path, role, source))?;
            Some(mmap)
        };

        log::debug!("Mapped {} {:?} ({} bytes)", role, path, len);

        Ok(Self {
            path: path.to_path_buf(),
            role,
            mmap,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn role(&self) -> InputRole {
        self.role
    }

    /// Total size of the file in bytes
    pub fn size(&self) -> usize {
        self.mmap.as_ref().map_or(0, |m| m.len())
    }

    /// Iterate the rows of the file in order
    pub fn rows(&self) -> Rows<'_> {
        Rows {
            data: self.mmap.as_deref().unwrap_or(&[]),
            position: 0,
            line: 0,
        }
    }
}

fn open_error(path: &Path, role: InputRole, source: io::Error) -> ExtractError {
    if source.kind() == io::ErrorKind::NotFound {
        ExtractError::InputNotFound {
            role,
            path: path.to_path_buf(),
        }
    } else {
        ExtractError::InputRead {
            role,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Iterator over the rows of a mapped file
pub struct Rows<'a> {
    data: &'a [u8],
    position: usize,
    line: u64,
}

impl<'a> Iterator for Rows<'a> {
    type Item = Row<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.data.len() {
            return None;
        }

        let remaining = &self.data[self.position..];
        let line_end = memchr::memchr(b'\n', remaining)
            .map(|i| i + 1)
            .unwrap_or(remaining.len());

        let raw = &remaining[..line_end];
        self.position += line_end;
        self.line += 1;

        let mut body = raw.strip_suffix(b"\n").unwrap_or(raw);
        body = body.strip_suffix(b"\r").unwrap_or(body);
        if self.line == 1 {
            body = body.strip_prefix(UTF8_BOM).unwrap_or(body);
        }

        Some(Row {
            raw,
            body,
            line: self.line,
        })
    }
}

/// A row had fewer fields than the requested position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortRow {
    pub found: usize,
}

/// Splits row bodies into fields
///
/// One splitter serves a whole file: in quoted mode the CSV reader and
/// record buffers are reused from row to row.
pub struct FieldSplitter {
    mode: FieldMode,
    reader: Option<csv::Reader<io::Cursor<Vec<u8>>>>,
    record: csv::ByteRecord,
}

impl FieldSplitter {
    pub fn new(mode: FieldMode) -> Self {
        Self {
            mode,
            reader: None,
            record: csv::ByteRecord::new(),
        }
    }

    /// Parse one row body, every field can then be read from the result
    pub fn split<'a>(&'a mut self, body: &'a [u8]) -> Fields<'a> {
        match self.mode {
            FieldMode::Naive => Fields::Naive(body),
            FieldMode::Quoted => {
                let reader = self.reader.get_or_insert_with(|| {
                    csv::ReaderBuilder::new()
                        .has_headers(false)
                        .flexible(true)
                        .from_reader(io::Cursor::new(Vec::new()))
                });

                let source = reader.get_mut().get_mut();
                source.clear();
                source.extend_from_slice(body);

                let parsed = reader
                    .seek_raw(io::SeekFrom::Start(0), csv::Position::new())
                    .is_ok()
                    && matches!(reader.read_byte_record(&mut self.record), Ok(true));

                Fields::Quoted(parsed.then_some(&self.record))
            }
        }
    }
}

/// The fields of one parsed row
#[derive(Debug, Clone, Copy)]
pub enum Fields<'a> {
    /// Unparsed body, split on every comma
    Naive(&'a [u8]),
    /// CSV record, `None` when the row could not be parsed
    Quoted(Option<&'a csv::ByteRecord>),
}

impl<'a> Fields<'a> {
    /// Field `index` (0-based)
    pub fn get(&self, index: usize) -> std::result::Result<&'a [u8], ShortRow> {
        match *self {
            Self::Naive(body) => body.split_str(",").nth(index).ok_or_else(|| ShortRow {
                found: memchr::memchr_iter(b',', body).count() + 1,
            }),
            Self::Quoted(Some(record)) => record.get(index).ok_or(ShortRow {
                found: record.len(),
            }),
            Self::Quoted(None) => Err(ShortRow { found: 0 }),
        }
    }
}

/// Field extraction with a malformed-row policy applied
#[derive(Debug, Clone, Copy)]
pub struct FieldReader {
    pub mode: FieldMode,
    pub malformed: MalformedPolicy,
}

impl FieldReader {
    pub fn new(mode: FieldMode, malformed: MalformedPolicy) -> Self {
        Self { mode, malformed }
    }

    /// A splitter for one input file
    pub fn splitter(&self) -> FieldSplitter {
        FieldSplitter::new(self.mode)
    }

    /// Read field `index` of `row`, already split into `fields`
    ///
    /// Returns `Ok(None)` when the row is short and the policy says skip.
    pub fn read<'a>(
        &self,
        scanner: &RowScanner,
        row: &Row<'_>,
        fields: &Fields<'a>,
        index: usize,
    ) -> Result<Option<&'a [u8]>> {
        match fields.get(index) {
            Ok(field) => Ok(Some(field)),
            Err(ShortRow { found }) => match self.malformed {
                MalformedPolicy::Fail => Err(ExtractError::MalformedRow {
                    role: scanner.role(),
                    path: scanner.path().to_path_buf(),
                    line: row.line,
                    needed: index + 1,
                    found,
                }),
                MalformedPolicy::Skip => {
                    log::warn!(
                        "Skipping short row in {:?} at line {} ({} fields)",
                        scanner.path(),
                        row.line,
                        found
                    );
                    Ok(None)
                }
            },
        }
    }
}
