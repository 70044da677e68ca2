//! CLI output formatting.
//!
//! # Output Format
//!
//! ```text
//! photo.jpg
//!     Output: /photos/photo.watermark.jpg
//!     Size: 2.4 MB → 38.1 KB (-98%)
//! notes.txt
//!     Error: Only JPG allowed
//!
//! Shrunk 1 of 2 images
//! ```
//!
//! # Architecture
//!
//! Each event has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::pipeline::{JobEvent, JobResult};

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Human-readable byte count, base 1024, one decimal above bytes.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// Format a job event as display lines.
///
/// `Started` produces no lines; the result line follows when the job ends.
pub fn format_job_event(event: &JobEvent) -> Vec<String> {
    match event {
        JobEvent::Started { .. } => Vec::new(),
        JobEvent::Shrunk {
            display_name,
            report,
        } => vec![
            display_name.clone(),
            format!("{}Output: {}", indent(1), report.output_path.display()),
            format!(
                "{}Size: {} → {} ({:+.0}%)",
                indent(1),
                format_size(report.original_size_bytes),
                format_size(report.result_size_bytes),
                -report.savings_percent()
            ),
        ],
        JobEvent::Failed {
            display_name,
            message,
        } => vec![
            display_name.clone(),
            format!("{}Error: {}", indent(1), message),
        ],
    }
}

/// Print a job event to stdout.
pub fn print_job_event(event: &JobEvent) {
    for line in format_job_event(event) {
        println!("{}", line);
    }
}

/// One-line summary of a batch.
pub fn format_summary(results: &[JobResult]) -> String {
    let ok = results.iter().filter(|r| r.is_ok()).count();
    let noun = if results.len() == 1 { "image" } else { "images" };
    format!("Shrunk {} of {} {}", ok, results.len(), noun)
}
