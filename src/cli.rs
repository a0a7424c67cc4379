//! Command-line interface definition for nsrl-extract
//!
//! Provides argument parsing for the hashset extractor.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Default category marker that flags a product as known-bad
pub const DEFAULT_MARKER: &str = "Hacker Tool";

/// NSRL hashset extractor
///
/// Splits NSRL signature files into known-good and known-bad sets based on
/// the classification of each entry's product in the NSRL Prod files.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "nsrl-extract",
    author = "m0h1nd4",
    version,
    about = "Extract known-good and known-bad hashsets from NSRL files",
    long_about = r#"
Extracts known-good and known-bad entries from NSRL signature files based on
ProductCodes matching any NSRL Prod file entry labeled 'Hacker Tool'.

Entries are copied verbatim. Input files are given as comma separated lists
and are processed in the order given.

EXAMPLES:
    # Known-bad entries only
    nsrl-extract -n NSRLFile.txt -p NSRLProd.txt -b known-bad.txt

    # Both sets, several signature files, with summary
    nsrl-extract -n NSRLFile1.txt,NSRLFile2.txt -p NSRLProd.txt \
        -g known-good.txt -b known-bad.txt -s

    # Quoted CSV parsing and a different category
    nsrl-extract -n NSRLFile.txt -p NSRLProd.txt -b bad.txt \
        --field-mode quoted -m "Steganography"
"#
)]
pub struct Args {
    /// NSRL signature files, comma separated
    #[arg(short = 'n', long, required = true, value_name = "PATHS", value_delimiter = ',')]
    pub nsrl_file: Vec<PathBuf>,

    /// NSRL Prod files, comma separated
    #[arg(short = 'p', long, required = true, value_name = "PATHS", value_delimiter = ',')]
    pub prod_file: Vec<PathBuf>,

    /// File where known-good hashsets will be saved
    #[arg(short = 'g', long, value_name = "PATH")]
    pub output_good_file: Option<PathBuf>,

    /// File where known-bad hashsets will be saved
    #[arg(short = 'b', long, value_name = "PATH")]
    pub output_bad_file: Option<PathBuf>,

    /// Show extraction summary
    #[arg(short = 's', long, default_value_t = false)]
    pub show_summary: bool,

    /// Category label substring that flags a product (case-sensitive)
    #[arg(short = 'm', long, value_name = "TEXT", default_value = DEFAULT_MARKER)]
    pub marker: String,

    /// How rows are split into fields
    #[arg(long, value_enum, default_value_t = FieldMode::Naive)]
    pub field_mode: FieldMode,

    /// What to do with rows that are too short
    #[arg(long, value_enum, default_value_t = MalformedPolicy::Fail)]
    pub malformed: MalformedPolicy,

    /// Quiet mode - minimal output
    #[arg(short, long, default_value_t = false)]
    pub quiet: bool,

    /// Verbose mode - detailed logging
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

/// Field splitting strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FieldMode {
    /// Split on every comma, quotes are part of the field
    Naive,
    /// CSV parsing, commas inside quotes do not split
    Quoted,
}

/// Policy for rows with fewer fields than required
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MalformedPolicy {
    /// Abort the run naming the file and line
    Fail,
    /// Log a warning and leave the row out of both outputs
    Skip,
}
