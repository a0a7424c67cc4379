//! # NSRL Extract
//!
//! Splits NSRL Reference Data Set signature files into known-good and
//! known-bad hashsets.
//!
//! A signature entry is known-bad when its ProductCode belongs to a product
//! whose NSRL Prod classification contains a marker label ("Hacker Tool"
//! by default). Everything else is known-good.
//!
//! ## Features
//!
//! - **Streaming**: signature files are memory-mapped and scanned row by row
//! - **Verbatim output**: entries are copied byte for byte, terminators included
//! - **Optional outputs**: an output that was not requested is never collected
//! - **All-or-nothing**: outputs are staged and only committed after a full run
//!
//! ## Usage
//!
//! ```bash
//! # Known-bad entries only
//! nsrl-extract -n NSRLFile.txt -p NSRLProd.txt -b known-bad.txt
//!
//! # Both sets with summary
//! nsrl-extract -n NSRLFile.txt -p NSRLProd.txt -g good.txt -b bad.txt -s
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use nsrl_extract::catalog::CatalogIndexer;
//! use nsrl_extract::classify::Classifier;
//! use nsrl_extract::cli::{FieldMode, MalformedPolicy};
//! use nsrl_extract::output::write_batch;
//! use nsrl_extract::scan::FieldReader;
//! use std::path::{Path, PathBuf};
//!
//! let fields = FieldReader::new(FieldMode::Naive, MalformedPolicy::Fail);
//! let (flagged, _) = CatalogIndexer::new("Hacker Tool", fields)
//!     .index(&[PathBuf::from("NSRLProd.txt")])
//!     .unwrap();
//!
//! let (batch, _) = Classifier::new(&flagged, fields)
//!     .classify(&[PathBuf::from("NSRLFile.txt")], false, true)
//!     .unwrap();
//!
//! write_batch(&batch, None, Some(Path::new("known-bad.txt"))).unwrap();
//! ```

pub mod catalog;
pub mod classify;
pub mod cli;
pub mod error;
pub mod output;
pub mod processor;
pub mod progress;
pub mod scan;

pub use cli::Args;
pub use error::{ExtractError, InputRole};
pub use processor::{Processor, ProcessorConfig};
