//! End-of-run summary printing

use crate::config::OutputConfig;
use crate::crawler::RunSummary;
use std::path::Path;

/// Prints the run summary to stdout
///
/// # Arguments
///
/// * `summary` - Counts for the completed run
/// * `output` - Where records and the failure log were written
pub fn print_run_summary(summary: &RunSummary, output: &OutputConfig) {
    println!();
    println!("=== Scraping Summary ===\n");

    println!("  Job URLs discovered: {}", summary.discovered);
    println!("  Total jobs processed: {}", summary.total);
    println!("  Active jobs: {}", summary.active);
    println!("  Inactive jobs: {}", summary.inactive);
    println!("  Failed: {}", summary.failed);
    if summary.status_changes > 0 {
        println!("  Status changes since last run: {}", summary.status_changes);
    }
    println!();

    println!(
        "Success Rate: {:.1}% ({} / {} jobs saved)",
        summary.success_rate(),
        summary.successful(),
        summary.total
    );
    println!("Elapsed: {:.1}s", summary.elapsed.as_secs_f64());
    println!();

    println!("Job files saved in: {}/", output.output_dir);
    if summary.failed > 0 {
        println!(
            "Failed URLs logged in: {}",
            Path::new(&output.output_dir)
                .join(&output.failure_log)
                .display()
        );
    }
}
