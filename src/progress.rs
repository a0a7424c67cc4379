//! Progress display module
//!
//! Styled terminal output, the progress bar and the extraction summary.

use std::time::Duration;

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

use crate::catalog::IndexStats;
use crate::classify::ClassifyStats;

/// Print the application banner
pub fn print_banner() {
    let banner = r#"
╔══════════════════════════════════════════════════════════════════════════════╗
║                                                                              ║
║   ███╗   ██╗███████╗██████╗ ██╗         ███████╗██╗  ██╗████████╗            ║
║   ████╗  ██║██╔════╝██╔══██╗██║         ██╔════╝╚██╗██╔╝╚══██╔══╝            ║
║   ██╔██╗ ██║███████╗██████╔╝██║         █████╗   ╚███╔╝    ██║               ║
║   ██║╚██╗██║╚════██║██╔══██╗██║         ██╔══╝   ██╔██╗    ██║               ║
║   ██║ ╚████║███████║██║  ██║███████╗    ███████╗██╔╝ ██╗   ██║               ║
║   ╚═╝  ╚═══╝╚══════╝╚═╝  ╚═╝╚══════╝    ╚══════╝╚═╝  ╚═╝   ╚═╝               ║
║                                                                              ║
║        Known-good / known-bad hashsets from NSRL Prod classification         ║
║                                                              v1.0.0          ║
╚══════════════════════════════════════════════════════════════════════════════╝
"#;

    println!("{}", banner.green());
}

/// Print a section header
pub fn print_header(text: &str) {
    println!("\n{} {}", "▶".green(), text.green().bold());
}

/// Print an info message
pub fn print_info(text: &str) {
    println!("  {} {}", "ℹ".cyan(), text);
}

/// Print a success message
pub fn print_success(text: &str) {
    println!("  {} {}", "✔".green(), text.green());
}

/// Print a warning message
pub fn print_warning(text: &str) {
    println!("  {} {}", "⚠".yellow(), text.yellow());
}

/// Print an error message
pub fn print_error(text: &str) {
    eprintln!("  {} {}", "✖".red(), text.red());
}

/// Print a bullet point
pub fn print_bullet(text: &str) {
    println!("  {} {}", "•".green(), text);
}

/// Create a bytes-based progress bar
pub fn create_bytes_progress_bar(total_bytes: u64, msg: &str) -> ProgressBar {
    let pb = ProgressBar::new(total_bytes);

    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.green/dim}] {bytes}/{total_bytes} ({bytes_per_sec}) {msg}")
    {
        pb.set_style(style.progress_chars("█▓░"));
    }

    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));

    pb
}

/// Known-good / known-bad counts of a run
///
/// Counts are the rows actually collected: an output that was not
/// requested always counts zero.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub good: u64,
    pub bad: u64,
}

impl Summary {
    pub fn new(good: u64, bad: u64) -> Self {
        Self { good, bad }
    }

    pub fn total(&self) -> u64 {
        self.good + self.bad
    }

    pub fn percent_good(&self) -> f64 {
        percent(self.good, self.total())
    }

    pub fn percent_bad(&self) -> f64 {
        percent(self.bad, self.total())
    }

    /// Plain-text summary lines
    pub fn lines(&self) -> [String; 2] {
        [
            format!(
                "Known-Good: {} ({:.2}%)",
                format_number(self.good),
                self.percent_good()
            ),
            format!(
                "Known-Bad:  {} ({:.2}%)",
                format_number(self.bad),
                self.percent_bad()
            ),
        ]
    }

    /// Print the extraction summary
    pub fn print(&self) {
        print_header("Extraction summary");
        let [good, bad] = self.lines();
        println!("  {}", good.green());
        println!("  {}", bad.red());
        println!();
    }
}

/// Share of `part` in `total`, 0 when there is nothing to share
fn percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

/// Print indexing and classification counters (verbose mode)
pub fn print_stats(index: &IndexStats, classify: &ClassifyStats, flagged: usize, elapsed: Duration) {
    print_header("Statistics");

    print_info(&format!("Catalog rows:     {}", format_number(index.rows)));
    print_info(&format!("Flagged rows:     {}", format_number(index.matched_rows)));
    print_info(&format!("Flagged products: {}", format_number(flagged as u64)));
    print_info(&format!("Signature files:  {}", classify.files));
    print_info(&format!("Signature rows:   {}", format_number(classify.rows)));
    print_info(&format!("Not collected:    {}", format_number(classify.uncollected)));

    let skipped = index.skipped_rows + classify.skipped;
    if skipped > 0 {
        print_warning(&format!("Skipped rows:     {}", format_number(skipped)));
    }

    print_info(&format!("Duration:         {}", format_duration(elapsed)));
}

/// Format a number with thousand separators
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    let chars: Vec<char> = s.chars().collect();

    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }

    result
}

/// Format duration as human-readable string
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();

    if secs < 60 {
        format!("{:.1}s", duration.as_secs_f64())
    } else if secs < 3600 {
        let mins = secs / 60;
        let secs = secs % 60;
        format!("{}m {}s", mins, secs)
    } else {
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        format!("{}h {}m", hours, mins)
    }
}
