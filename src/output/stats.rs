//! Result summary reporting.

use console::style;

use crate::download::{DownloadResult, StageOutcome};

/// Print what a finished job produced and what failed.
pub fn print_result_summary(result: &DownloadResult) {
    let failed: Vec<_> = result.failed_segments().collect();

    println!();
    println!("{}", style("═".repeat(50)).dim());
    println!("{}", style("Download summary:").bold());
    println!("  Segments:   {} ok", style(result.succeeded_count()).green());
    if !failed.is_empty() {
        println!("  Failed:     {}", style(failed.len()).red());
    }
    if !result.unattempted.is_empty() {
        println!("  Skipped:    {}", style(result.unattempted.len()).yellow());
    }
    if result.cancelled {
        println!("  {}", style("Stopped before completion").yellow());
    }

    print_stage("Merge", result.merge.as_ref());
    print_stage("Conversion", result.conversion.as_ref());

    for segment in failed {
        println!(
            "  {} #{} {}: {}",
            style("✗").red(),
            segment.index,
            segment.url,
            segment.error_message
        );
    }
    println!("{}", style("═".repeat(50)).dim());
}

fn print_stage(name: &str, outcome: Option<&StageOutcome>) {
    match outcome {
        Some(StageOutcome::Succeeded { path }) => {
            println!("  {:<11} {}", format!("{}:", name), style(path.display()).green());
        }
        Some(StageOutcome::Failed { path, message }) => {
            println!(
                "  {:<11} {} ({})",
                format!("{}:", name),
                style(path.display()).red(),
                message
            );
        }
        None => {}
    }
}
