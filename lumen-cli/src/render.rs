//! Terminal rendering of tracked jobs

use colored::*;
use lumen_core::domain::job::{Job, JobStatus, ResultLocation};
use lumen_poller::{JobObserver, PollError, PollSnapshot};

const BAR_WIDTH: usize = 30;

/// Prints lifecycle events as they happen
pub struct ConsoleObserver {
    abandon_threshold: u32,
}

impl ConsoleObserver {
    pub fn new(abandon_threshold: u32) -> Self {
        Self { abandon_threshold }
    }
}

impl JobObserver for ConsoleObserver {
    fn on_status_change(&self, status: JobStatus) {
        clear_line();
        println!("  {} status: {}", "▸".cyan(), colorize_status(status));
    }

    fn on_error(&self, error: &PollError) {
        clear_line();
        match error {
            PollError::Transient {
                consecutive_errors, ..
            } => println!(
                "  {} Experiencing network issues (retry {}/{}). Still generating...",
                "⚠".yellow(),
                consecutive_errors,
                self.abandon_threshold
            ),
            other => println!("  {} {}", "✗".red(), other.to_string().red()),
        }
    }

    fn on_complete(&self, job: &Job) {
        clear_line();
        println!("  {} generation complete", "✓".green());
        print_results(&job.result_locations);
    }
}

/// One-line progress view, rewritten in place
pub fn progress_line(snapshot: &PollSnapshot, abandon_threshold: u32) -> String {
    let mut line = format!(
        "  [{}] {:>3}%  ETA {}",
        progress_bar(snapshot.progress_percent, BAR_WIDTH),
        snapshot.progress_percent,
        format_eta(snapshot.estimated_seconds_remaining)
    );

    if snapshot.consecutive_error_count > 0 {
        line.push_str(&format!(
            "  network issues (retry {}/{})",
            snapshot.consecutive_error_count, abandon_threshold
        ));
    }

    line
}

pub fn progress_bar(percent: u8, width: usize) -> String {
    let filled = (usize::from(percent.min(100)) * width) / 100;
    format!("{}{}", "#".repeat(filled), "-".repeat(width - filled))
}

/// Formats seconds as `m:ss`
pub fn format_eta(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

pub fn print_results(results: &[ResultLocation]) {
    if results.is_empty() {
        println!("    {}", "(no result locations reported)".dimmed());
        return;
    }

    for location in results {
        let kind = if location.is_video() { "video" } else { "image" };
        println!("    {} {} {}", "•".cyan(), kind.dimmed(), location.url);
    }
}

/// Colorize job status for display
pub fn colorize_status(status: JobStatus) -> ColoredString {
    let status_str = status.to_string();
    match status {
        JobStatus::Pending => status_str.yellow(),
        JobStatus::Running => status_str.cyan(),
        JobStatus::Succeeded => status_str.green(),
        JobStatus::Failed => status_str.red(),
    }
}

fn clear_line() {
    print!("\r\x1b[2K");
}
