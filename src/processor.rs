//! Core processing engine
//!
//! Runs the extraction in strict order: index the Prod files, classify the
//! signature files into staged outputs, commit the outputs, summarize.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use bytesize::ByteSize;
use colored::*;

use crate::catalog::{CatalogIndexer, IndexStats};
use crate::classify::{Classifier, ClassifyStats};
use crate::cli::{Args, FieldMode, MalformedPolicy};
use crate::error::{ExtractError, InputRole, Result};
use crate::output::{OutputSet, DEFAULT_BUFFER_SIZE};
use crate::progress::{
    create_bytes_progress_bar, print_bullet, print_header, print_info, print_stats, print_success,
    print_warning, Summary,
};
use crate::scan::FieldReader;

/// Processor configuration
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    pub nsrl_files: Vec<PathBuf>,
    pub prod_files: Vec<PathBuf>,
    pub good_output: Option<PathBuf>,
    pub bad_output: Option<PathBuf>,
    pub show_summary: bool,
    pub marker: String,
    pub field_mode: FieldMode,
    pub malformed: MalformedPolicy,
    pub buffer_size: usize,
    pub quiet: bool,
    pub verbose: bool,
}

impl ProcessorConfig {
    pub fn from_args(args: &Args) -> Result<Self> {
        let config = Self {
            nsrl_files: args.nsrl_file.clone(),
            prod_files: args.prod_file.clone(),
            good_output: args.output_good_file.clone(),
            bad_output: args.output_bad_file.clone(),
            show_summary: args.show_summary,
            marker: args.marker.clone(),
            field_mode: args.field_mode,
            malformed: args.malformed,
            buffer_size: DEFAULT_BUFFER_SIZE,
            quiet: args.quiet,
            verbose: args.verbose,
        };

        config.validate()?;
        Ok(config)
    }

    /// Check the configuration before any input is read
    pub fn validate(&self) -> Result<()> {
        if self.nsrl_files.is_empty() {
            return Err(ExtractError::config(
                "NSRL Signature file (-n|--nsrl-file) is required and must contain valid files.",
            ));
        }

        if self.prod_files.is_empty() {
            return Err(ExtractError::config(
                "NSRL Prod file (-p|--prod-file) is required and must contain valid files.",
            ));
        }

        if self.good_output.is_none() && self.bad_output.is_none() {
            return Err(ExtractError::config("You must define at least one output file."));
        }

        if let (Some(good), Some(bad)) = (&self.good_output, &self.bad_output) {
            if resolve_destination(good) == resolve_destination(bad) {
                return Err(ExtractError::config(
                    "Known-good and known-bad output files must be different.",
                ));
            }
        }

        if self.marker.is_empty() {
            return Err(ExtractError::config("Category marker (-m|--marker) must not be empty."));
        }

        Ok(())
    }

    fn fields(&self) -> FieldReader {
        FieldReader::new(self.field_mode, self.malformed)
    }
}

/// Outcome of a successful run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub summary: Summary,
    pub flagged_products: usize,
    pub index: IndexStats,
    pub classify: ClassifyStats,
    pub written: Vec<PathBuf>,
}

/// Main processor
pub struct Processor {
    config: ProcessorConfig,
}

impl Processor {
    pub fn new(config: ProcessorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Run the whole extraction
    pub fn run(&self) -> Result<RunReport> {
        let start = Instant::now();
        let config = &self.config;
        let fields = config.fields();

        config.validate()?;
        check_inputs(&config.prod_files, InputRole::Catalog)?;
        let nsrl_bytes = check_inputs(&config.nsrl_files, InputRole::HashSet)?;

        if !config.quiet {
            print_header("Indexing NSRL Prod files...");
            for path in &config.prod_files {
                print_bullet(&format!("{:?}", path));
            }
        }

        let indexer = CatalogIndexer::new(&config.marker, fields);
        let (flagged, index_stats) = indexer.index(&config.prod_files)?;

        if !config.quiet {
            print_info(&format!(
                "{} products labeled '{}'",
                flagged.len(),
                config.marker
            ));
            if flagged.is_empty() {
                print_warning("No flagged products, every entry will be known-good");
            }
        }

        if log::log_enabled!(log::Level::Debug) {
            for code in flagged.sorted_codes() {
                log::debug!("Flagged ProductCode {}", code);
            }
        }

        let mut outputs = OutputSet::create(
            config.good_output.as_deref(),
            config.bad_output.as_deref(),
            config.buffer_size,
        )?;

        if !config.quiet {
            print_header("Classifying NSRL signature files...");
            print_info(&format!(
                "Found {} files ({} total)",
                config.nsrl_files.len(),
                ByteSize(nsrl_bytes)
            ));
        }

        let pb = if config.quiet {
            indicatif::ProgressBar::hidden()
        } else {
            create_bytes_progress_bar(nsrl_bytes, "Classifying...")
        };

        let classifier = Classifier::new(&flagged, fields);
        let mut classify_stats = ClassifyStats::default();
        {
            let mut sinks = outputs.outputs();
            for path in &config.nsrl_files {
                if config.verbose {
                    pb.set_message(format!(
                        "Classifying {:?}...",
                        path.file_name().unwrap_or_default()
                    ));
                }

                let scanned = classifier.classify_file(path, &mut sinks, &mut classify_stats)?;
                pb.inc(scanned);
            }
        }
        pb.finish_with_message("Complete".green().to_string());

        let summary = Summary::new(classify_stats.good, classify_stats.bad);
        let written = outputs.commit()?;

        if !config.quiet {
            print_success("Output files written:");
            for path in &written {
                print_bullet(&format!("{:?}", path));
            }
        }

        if config.show_summary {
            summary.print();
        }

        if config.verbose && !config.quiet {
            print_stats(&index_stats, &classify_stats, flagged.len(), start.elapsed());
        }

        Ok(RunReport {
            summary,
            flagged_products: flagged.len(),
            index: index_stats,
            classify: classify_stats,
            written,
        })
    }
}

/// Every declared input must be an existing regular file
///
/// Returns the combined size of the files.
fn check_inputs(paths: &[PathBuf], role: InputRole) -> Result<u64> {
    let mut total = 0;

    for path in paths {
        if !path.is_file() {
            return Err(ExtractError::InputNotFound {
                role,
                path: path.clone(),
            });
        }

        total += file_size(path, role)?;
    }

    Ok(total)
}

/// Canonical form of an output path, which may not exist yet
fn resolve_destination(path: &Path) -> PathBuf {
    if let Ok(resolved) = fs::canonicalize(path) {
        return resolved;
    }

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    match (fs::canonicalize(parent), path.file_name()) {
        (Ok(dir), Some(name)) => dir.join(name),
        _ => path.to_path_buf(),
    }
}

fn file_size(path: &Path, role: InputRole) -> Result<u64> {
    fs::metadata(path)
        .map(|m| m.len())
        .map_err(|source| ExtractError::InputRead {
            role,
            path: path.to_path_buf(),
            source,
        })
}
