//! Error taxonomy for the extractor
//!
//! Every failure is fatal for the run. The variants keep enough context
//! (which file, which phase, which line) to tell the analyst what to fix.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Which kind of input a path was declared as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputRole {
    /// NSRL Prod (product catalog) file
    Catalog,
    /// NSRL signature (hash-set) file
    HashSet,
}

impl fmt::Display for InputRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Catalog => f.write_str("NSRL Prod file"),
            Self::HashSet => f.write_str("NSRL signature file"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("{0}")]
    Configuration(String),

    #[error("{role} not found: {}", .path.display())]
    InputNotFound { role: InputRole, path: PathBuf },

    #[error("Could not read {role} {}", .path.display())]
    InputRead {
        role: InputRole,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed row in {role} {} at line {line}: expected at least {needed} fields, found {found}", .path.display())]
    MalformedRow {
        role: InputRole,
        path: PathBuf,
        line: u64,
        needed: usize,
        found: usize,
    },

    #[error("Could not open {} for writing", .path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Could not commit output {}; already written: {}", .failed.display(), format_paths(.committed))]
    PartialCommit {
        failed: PathBuf,
        #[source]
        source: io::Error,
        committed: Vec<PathBuf>,
    },
}

impl ExtractError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

fn format_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "none".to_string();
    }

    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, ExtractError>;
