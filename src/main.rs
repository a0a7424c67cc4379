//! NSRL Extract - known-good / known-bad hashset extraction
//!
//! Main entry point for the command-line application.

use clap::{CommandFactory, Parser};
use std::error::Error;
use std::process;

use nsrl_extract::cli::Args;
use nsrl_extract::processor::{Processor, ProcessorConfig};
use nsrl_extract::progress::{print_banner, print_error, print_header, print_info};

/// Exit status for configuration and I/O failures
const EXIT_FAILURE: i32 = 2;

fn main() {
    // clap exits with status 2 on its own parse errors
    let args = Args::parse();

    // Set up logging
    let level = if args.verbose {
        "debug"
    } else if args.quiet {
        "warn"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(e) = run(args) {
        print_error(&format!("{}", e));

        // Print chain of errors
        let mut source = e.source();
        while let Some(err) = source {
            print_error(&format!("  Caused by: {}", err));
            source = err.source();
        }

        eprintln!();
        eprintln!("{}", Args::command().render_usage());
        process::exit(EXIT_FAILURE);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    // Print banner unless quiet mode
    if !args.quiet {
        print_banner();
    }

    let config = ProcessorConfig::from_args(&args)?;
    let processor = Processor::new(config);

    if args.verbose && !args.quiet {
        print_config(processor.config());
    }

    processor.run()?;
    Ok(())
}

/// Print configuration summary
fn print_config(config: &ProcessorConfig) {
    print_header("Configuration");

    print_info(&format!("Signature files: {:?}", config.nsrl_files));
    print_info(&format!("Prod files:      {:?}", config.prod_files));
    print_info(&format!("Known-good:      {:?}", config.good_output));
    print_info(&format!("Known-bad:       {:?}", config.bad_output));
    print_info(&format!("Marker:          {:?}", config.marker));
    print_info(&format!("Field mode:      {:?}", config.field_mode));
    print_info(&format!("Malformed rows:  {:?}", config.malformed));
}
