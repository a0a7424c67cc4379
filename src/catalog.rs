//! Product catalog indexing
//!
//! Builds the set of ProductCodes whose NSRL Prod classification contains
//! the marker label. The set is complete before any signature row is
//! classified and is never modified afterwards.

use std::path::PathBuf;

use ahash::RandomState;
use bstr::ByteSlice;
use hashbrown::HashSet;

use crate::error::{InputRole, Result};
use crate::scan::{FieldReader, RowScanner};

/// Catalog column holding the ProductCode
pub const PRODUCT_CODE_FIELD: usize = 0;

/// Catalog column holding the ApplicationType label
pub const CATEGORY_FIELD: usize = 6;

/// Unique ProductCodes flagged by the catalog
#[derive(Debug, Clone, Default)]
pub struct FlaggedProductSet {
    codes: HashSet<Vec<u8>, RandomState>,
}

impl FlaggedProductSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a ProductCode, returns true if it was not present yet
    pub fn insert(&mut self, code: &[u8]) -> bool {
        if self.codes.contains(code) {
            return false;
        }
        self.codes.insert(code.to_vec())
    }

    #[inline]
    pub fn contains(&self, code: &[u8]) -> bool {
        self.codes.contains(code)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Flagged codes, sorted, for display
    pub fn sorted_codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = self
            .codes
            .iter()
            .map(|c| c.to_str_lossy().into_owned())
            .collect();
        codes.sort_unstable();
        codes
    }
}

impl<'a> FromIterator<&'a [u8]> for FlaggedProductSet {
    fn from_iter<I: IntoIterator<Item = &'a [u8]>>(iter: I) -> Self {
        let mut set = Self::new();
        for code in iter {
            set.insert(code);
        }
        set
    }
}

/// Statistics from indexing the catalog files
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IndexStats {
    pub rows: u64,
    pub matched_rows: u64,
    pub skipped_rows: u64,
}

/// Builds a [`FlaggedProductSet`] from NSRL Prod files
#[derive(Debug, Clone)]
pub struct CatalogIndexer {
    marker: Vec<u8>,
    fields: FieldReader,
}

impl CatalogIndexer {
    pub fn new(marker: &str, fields: FieldReader) -> Self {
        Self {
            marker: marker.as_bytes().to_vec(),
            fields,
        }
    }

    /// Whether a category label carries the marker
    #[inline]
    pub fn is_flagged(&self, category: &[u8]) -> bool {
        category.contains_str(&self.marker)
    }

    /// Index every catalog file, in order
    pub fn index(&self, paths: &[PathBuf]) -> Result<(FlaggedProductSet, IndexStats)> {
        let mut flagged = FlaggedProductSet::new();
        let mut stats = IndexStats::default();

        for path in paths {
            let scanner = RowScanner::open(path, InputRole::Catalog)?;
            self.index_file(&scanner, &mut flagged, &mut stats)?;
        }

        log::info!(
            "Indexed {} catalog rows, {} flagged products",
            stats.rows,
            flagged.len()
        );

        Ok((flagged, stats))
    }

    fn index_file(
        &self,
        scanner: &RowScanner,
        flagged: &mut FlaggedProductSet,
        stats: &mut IndexStats,
    ) -> Result<()> {
        let mut splitter = self.fields.splitter();

        for row in scanner.rows() {
            stats.rows += 1;
            let fields = splitter.split(row.body);

            let Some(category) = self.fields.read(scanner, &row, &fields, CATEGORY_FIELD)? else {
                stats.skipped_rows += 1;
                continue;
            };

            if !self.is_flagged(category) {
                continue;
            }

            stats.matched_rows += 1;

            if let Some(code) = self.fields.read(scanner, &row, &fields, PRODUCT_CODE_FIELD)? {
                flagged.insert(code);
            }
        }

        log::debug!("Finished catalog {:?}", scanner.path());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{FieldMode, MalformedPolicy, DEFAULT_MARKER};
    use crate::error::ExtractError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn catalog(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn indexer(mode: FieldMode, malformed: MalformedPolicy) -> CatalogIndexer {
        CatalogIndexer::new(DEFAULT_MARKER, FieldReader::new(mode, malformed))
    }

    #[test]
    fn test_flagged_set_dedup() {
        let mut set = FlaggedProductSet::new();

        assert!(set.insert(b"P002"));
        assert!(!set.insert(b"P002"));
        assert!(set.insert(b"P003"));

        assert_eq!(set.len(), 2);
        assert!(set.contains(b"P002"));
        assert!(!set.contains(b"P001"));
    }

    #[test]
    fn test_index_marks_hacker_tools() {
        let file = catalog(
            "P001,a,b,c,d,e,\"Forensic Tool\"\n\
             P002,a,b,c,d,e,\"Hacker Tool\"\n",
        );

        let (set, stats) = indexer(FieldMode::Naive, MalformedPolicy::Fail)
            .index(&[file.path().to_path_buf()])
            .unwrap();

        assert_eq!(set.sorted_codes(), vec!["P002".to_string()]);
        assert_eq!(stats.rows, 2);
        assert_eq!(stats.matched_rows, 1);
    }

    #[test]
    fn test_marker_is_case_sensitive_substring() {
        let idx = indexer(FieldMode::Naive, MalformedPolicy::Fail);

        assert!(idx.is_flagged(b"Hacker Tool / Utility"));
        assert!(idx.is_flagged(b"\"Hacker Tool\""));
        assert!(!idx.is_flagged(b"hacker tool"));
        assert!(!idx.is_flagged(b"Hacker"));
    }

    #[test]
    fn test_repeated_codes_across_files() {
        let first = catalog("P9,a,b,c,d,e,Hacker Tool\nP9,a,b,c,d,e,Hacker Tool\n");
        let second = catalog("P9,x,y,z,w,v,Hacker Tool\nP10,a,b,c,d,e,Hacker Tool\n");

        let (set, stats) = indexer(FieldMode::Naive, MalformedPolicy::Fail)
            .index(&[first.path().to_path_buf(), second.path().to_path_buf()])
            .unwrap();

        assert_eq!(set.len(), 2);
        assert_eq!(stats.matched_rows, 4);
    }

    #[test]
    fn test_no_matches_gives_empty_set() {
        let file = catalog("P001,a,b,c,d,e,Operating System\n");

        let (set, _) = indexer(FieldMode::Naive, MalformedPolicy::Fail)
            .index(&[file.path().to_path_buf()])
            .unwrap();

        assert!(set.is_empty());
    }

    #[test]
    fn test_short_row_fails_with_line() {
        let file = catalog("P001,a,b,c,d,e,Hacker Tool\nP002,short\n");

        let err = indexer(FieldMode::Naive, MalformedPolicy::Fail)
            .index(&[file.path().to_path_buf()])
            .unwrap_err();

        match err {
            ExtractError::MalformedRow { role, line, needed, found, .. } => {
                assert_eq!(role, InputRole::Catalog);
                assert_eq!(line, 2);
                assert_eq!(needed, 7);
                assert_eq!(found, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_short_row_skipped() {
        let file = catalog("P001,a,b,c,d,e,Hacker Tool\nP002,short\n");

        let (set, stats) = indexer(FieldMode::Naive, MalformedPolicy::Skip)
            .index(&[file.path().to_path_buf()])
            .unwrap();

        assert_eq!(set.len(), 1);
        assert_eq!(stats.skipped_rows, 1);
    }

    #[test]
    fn test_quoted_mode_label_with_comma() {
        let file = catalog("7,\"Kit, Pro\",1.0,OS,MFG,English,\"Hacker Tool\"\n");

        let (naive, _) = indexer(FieldMode::Naive, MalformedPolicy::Fail)
            .index(&[file.path().to_path_buf()])
            .unwrap();
        let (quoted, _) = indexer(FieldMode::Quoted, MalformedPolicy::Fail)
            .index(&[file.path().to_path_buf()])
            .unwrap();

        assert!(naive.is_empty());
        assert!(quoted.contains(b"7"));
    }

    #[test]
    fn test_missing_catalog() {
        let err = indexer(FieldMode::Naive, MalformedPolicy::Fail)
            .index(&[PathBuf::from("/nonexistent/NSRLProd.txt")])
            .unwrap_err();

        assert!(matches!(err, ExtractError::InputNotFound { role: InputRole::Catalog, .. }));
    }
}
