//! Signature row classification
//!
//! Routes every row of the NSRL signature files to the known-good or
//! known-bad output depending on whether its ProductCode was flagged.
//! A row whose output was not requested is dropped without being copied.

use std::path::{Path, PathBuf};

use crate::catalog::FlaggedProductSet;
use crate::error::{InputRole, Result};
use crate::scan::{FieldReader, RowScanner};

/// Signature file column holding the ProductCode
pub const PRODUCT_CODE_FIELD: usize = 5;

/// Destination for classified rows
pub trait RowSink {
    /// Take one row, exactly as read (terminator included)
    fn accept(&mut self, row: &[u8]) -> Result<()>;
}

impl RowSink for Vec<Vec<u8>> {
    fn accept(&mut self, row: &[u8]) -> Result<()> {
        self.push(row.to_vec());
        Ok(())
    }
}

/// Classification of a single signature row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Good,
    Bad,
}

/// The requested outputs for one classification run
///
/// `None` means the output was not requested and rows destined for it
/// are not collected.
#[derive(Default)]
pub struct Outputs<'s> {
    pub good: Option<&'s mut dyn RowSink>,
    pub bad: Option<&'s mut dyn RowSink>,
}

/// Row counters for a classification run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ClassifyStats {
    pub files: u64,
    pub rows: u64,
    pub good: u64,
    pub bad: u64,
    /// Rows whose destination output was not requested
    pub uncollected: u64,
    /// Short rows left out under the skip policy
    pub skipped: u64,
}

/// Known-good and known-bad rows held in memory
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ClassifiedBatch {
    pub good: Option<Vec<Vec<u8>>>,
    pub bad: Option<Vec<Vec<u8>>>,
}

impl ClassifiedBatch {
    pub fn good_count(&self) -> usize {
        self.good.as_ref().map_or(0, Vec::len)
    }

    pub fn bad_count(&self) -> usize {
        self.bad.as_ref().map_or(0, Vec::len)
    }
}

/// Partitions signature rows using a flagged product set
pub struct Classifier<'a> {
    flagged: &'a FlaggedProductSet,
    fields: FieldReader,
}

impl<'a> Classifier<'a> {
    pub fn new(flagged: &'a FlaggedProductSet, fields: FieldReader) -> Self {
        Self { flagged, fields }
    }

    /// Bad if and only if the ProductCode is flagged
    #[inline]
    pub fn verdict(&self, product_code: &[u8]) -> Verdict {
        if self.flagged.contains(product_code) {
            Verdict::Bad
        } else {
            Verdict::Good
        }
    }

    /// Classify every signature file, in order, into memory
    pub fn classify(
        &self,
        paths: &[PathBuf],
        want_good: bool,
        want_bad: bool,
    ) -> Result<(ClassifiedBatch, ClassifyStats)> {
        let mut good: Option<Vec<Vec<u8>>> = want_good.then(Vec::new);
        let mut bad: Option<Vec<Vec<u8>>> = want_bad.then(Vec::new);
        let mut stats = ClassifyStats::default();

        {
            let mut outputs = Outputs {
                good: good.as_mut().map(|v| v as &mut dyn RowSink),
                bad: bad.as_mut().map(|v| v as &mut dyn RowSink),
            };

            for path in paths {
                self.classify_file(path, &mut outputs, &mut stats)?;
            }
        }

        Ok((ClassifiedBatch { good, bad }, stats))
    }

    /// Classify one signature file into the given outputs
    ///
    /// Returns the number of bytes scanned.
    pub fn classify_file(
        &self,
        path: &Path,
        outputs: &mut Outputs<'_>,
        stats: &mut ClassifyStats,
    ) -> Result<u64> {
        let scanner = RowScanner::open(path, InputRole::HashSet)?;

        let mut splitter = self.fields.splitter();

        for row in scanner.rows() {
            stats.rows += 1;
            let fields = splitter.split(row.body);

            let Some(code) = self.fields.read(&scanner, &row, &fields, PRODUCT_CODE_FIELD)? else {
                stats.skipped += 1;
                continue;
            };

            let (sink, counter) = match self.verdict(code) {
                Verdict::Good => (outputs.good.as_mut(), &mut stats.good),
                Verdict::Bad => (outputs.bad.as_mut(), &mut stats.bad),
            };

            match sink {
                Some(sink) => {
                    sink.accept(row.raw)?;
                    *counter += 1;
                }
                None => stats.uncollected += 1,
            }
        }

        stats.files += 1;
        log::debug!("Classified {:?} ({} rows so far)", path, stats.rows);

        Ok(scanner.size() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{FieldMode, MalformedPolicy};
    use crate::error::ExtractError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn hashset(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn flagged(codes: &[&str]) -> FlaggedProductSet {
        codes.iter().map(|c| c.as_bytes()).collect()
    }

    fn naive() -> FieldReader {
        FieldReader::new(FieldMode::Naive, MalformedPolicy::Fail)
    }

    fn lines(rows: &[Vec<u8>]) -> Vec<&str> {
        rows.iter().map(|r| std::str::from_utf8(r).unwrap()).collect()
    }

    const SIGNATURES: &str = "h1,m1,c1,f1,10,P001\nh2,m2,c2,f2,20,P002\nh3,m3,c3,f3,30,P001\n";

    #[test]
    fn test_partition_both_outputs() {
        let file = hashset(SIGNATURES);
        let set = flagged(&["P002"]);

        let (batch, stats) = Classifier::new(&set, naive())
            .classify(&[file.path().to_path_buf()], true, true)
            .unwrap();

        assert_eq!(
            lines(batch.good.as_ref().unwrap()),
            vec!["h1,m1,c1,f1,10,P001\n", "h3,m3,c3,f3,30,P001\n"]
        );
        assert_eq!(lines(batch.bad.as_ref().unwrap()), vec!["h2,m2,c2,f2,20,P002\n"]);
        assert_eq!(stats.rows, 3);
        assert_eq!(stats.good + stats.bad, stats.rows);
        assert_eq!(stats.uncollected, 0);
    }

    #[test]
    fn test_good_only_collects_no_bad_rows() {
        let file = hashset(SIGNATURES);
        let set = flagged(&["P002"]);

        let (batch, stats) = Classifier::new(&set, naive())
            .classify(&[file.path().to_path_buf()], true, false)
            .unwrap();

        assert!(batch.bad.is_none());
        assert_eq!(batch.good_count(), 2);
        assert_eq!(batch.bad_count(), 0);
        assert_eq!(stats.uncollected, 1);
    }

    #[test]
    fn test_bad_only() {
        let file = hashset(SIGNATURES);
        let set = flagged(&["P002"]);

        let (batch, stats) = Classifier::new(&set, naive())
            .classify(&[file.path().to_path_buf()], false, true)
            .unwrap();

        assert!(batch.good.is_none());
        assert_eq!(batch.bad_count(), 1);
        assert_eq!(stats.uncollected, 2);
    }

    #[test]
    fn test_empty_flagged_set_all_good() {
        let file = hashset(SIGNATURES);
        let set = FlaggedProductSet::new();

        let (batch, _) = Classifier::new(&set, naive())
            .classify(&[file.path().to_path_buf()], true, true)
            .unwrap();

        assert_eq!(batch.good_count(), 3);
        assert_eq!(batch.bad_count(), 0);
    }

    #[test]
    fn test_order_across_files() {
        let first = hashset("a,1,1,1,1,X\nb,1,1,1,1,Y\n");
        let second = hashset("c,1,1,1,1,X\nd,1,1,1,1,Y\n");
        let set = flagged(&["Y"]);

        let (batch, stats) = Classifier::new(&set, naive())
            .classify(
                &[first.path().to_path_buf(), second.path().to_path_buf()],
                true,
                true,
            )
            .unwrap();

        assert_eq!(lines(batch.good.as_ref().unwrap()), vec!["a,1,1,1,1,X\n", "c,1,1,1,1,X\n"]);
        assert_eq!(lines(batch.bad.as_ref().unwrap()), vec!["b,1,1,1,1,Y\n", "d,1,1,1,1,Y\n"]);
        assert_eq!(stats.files, 2);
    }

    #[test]
    fn test_rows_are_byte_identical() {
        let file = hashset("\"SHA\",\"MD5\",\"CRC\",\"a b.exe\",  99 ,P002,\"362\",\"\"\r\n");
        let set = flagged(&["P002"]);

        let (batch, _) = Classifier::new(&set, naive())
            .classify(&[file.path().to_path_buf()], true, true)
            .unwrap();

        assert_eq!(
            batch.bad.unwrap(),
            vec![b"\"SHA\",\"MD5\",\"CRC\",\"a b.exe\",  99 ,P002,\"362\",\"\"\r\n".to_vec()]
        );
    }

    #[test]
    fn test_quoted_mode_comma_in_file_name() {
        let row = "h1,m1,c1,\"setup, full.exe\",10,P002\n";
        let file = hashset(row);
        let set = flagged(&["P002"]);

        let (naive_batch, _) = Classifier::new(&set, naive())
            .classify(&[file.path().to_path_buf()], true, true)
            .unwrap();
        let quoted = FieldReader::new(FieldMode::Quoted, MalformedPolicy::Fail);
        let (quoted_batch, stats) = Classifier::new(&set, quoted)
            .classify(&[file.path().to_path_buf()], true, true)
            .unwrap();

        // Naive splitting reads "10" as the ProductCode
        assert_eq!(naive_batch.good_count(), 1);
        assert_eq!(naive_batch.bad_count(), 0);

        assert_eq!(lines(quoted_batch.bad.as_ref().unwrap()), vec![row]);
        assert_eq!(quoted_batch.good_count(), 0);
        assert_eq!(stats.good + stats.bad, stats.rows);
    }

    #[test]
    fn test_short_row_fails() {
        let file = hashset("h1,m1,c1,f1,10,P001\nbroken\n");
        let set = FlaggedProductSet::new();

        let err = Classifier::new(&set, naive())
            .classify(&[file.path().to_path_buf()], true, true)
            .unwrap_err();

        assert!(matches!(
            err,
            ExtractError::MalformedRow { role: InputRole::HashSet, line: 2, needed: 6, found: 1, .. }
        ));
    }

    #[test]
    fn test_short_row_skipped() {
        let file = hashset("h1,m1,c1,f1,10,P001\n\nbroken\n");
        let set = FlaggedProductSet::new();
        let reader = FieldReader::new(FieldMode::Naive, MalformedPolicy::Skip);

        let (batch, stats) = Classifier::new(&set, reader)
            .classify(&[file.path().to_path_buf()], true, true)
            .unwrap();

        assert_eq!(batch.good_count(), 1);
        assert_eq!(stats.skipped, 2);
        assert_eq!(stats.rows, 3);
    }

    #[test]
    fn test_verdict() {
        let set = flagged(&["42"]);
        let classifier = Classifier::new(&set, naive());

        assert_eq!(classifier.verdict(b"42"), Verdict::Bad);
        assert_eq!(classifier.verdict(b"420"), Verdict::Good);
        assert_eq!(classifier.verdict(b""), Verdict::Good);
    }
}
