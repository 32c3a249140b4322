use chartvuln_core::manifest::Skipped;
use chartvuln_core::pipeline::RunReport;
use chartvuln_core::{ChartSource, Severity};
use colored::*;

pub fn print_source(source: &ChartSource) {
    println!();
    println!(
        "{}",
        format!(" chartvuln v{} — Scanning {}", env!("CARGO_PKG_VERSION"), source).bold()
    );
    let kind = if source.is_local() {
        "local chart package"
    } else {
        "repository chart"
    };
    println!(" {} Detected {}", "|-".dimmed(), kind.cyan());
    println!();
}

pub fn print_no_images(skipped: &[Skipped]) {
    println!(
        " {} No images found in the Helm chart.",
        "OK".green().bold()
    );
    print_skipped(skipped);
    println!();
}

/// Print the per-run summary and the report location.
pub fn print_run_report(report: &RunReport) {
    println!(" {}", "Images".bold().underline());
    let mut seen = std::collections::HashSet::new();
    for reference in &report.images {
        if seen.insert(reference.image.as_str()) {
            println!(" {} {}", "|-".dimmed(), reference.image);
        }
    }
    println!();

    if !report.failures.is_empty() {
        println!(" {}", "Scan Failures".bold().underline());
        for failure in &report.failures {
            println!(
                " {} {} {}",
                "|-".dimmed(),
                failure.image.yellow(),
                format!("({})", failure.error).dimmed()
            );
        }
        println!();
    }

    print_skipped(&report.skipped);

    println!(" {}", "=".repeat(60).dimmed());
    println!();
    println!(" {}", "Summary".bold().underline());
    println!(
        " {} Images scanned:   {}/{}",
        "|-".dimmed(),
        report.scanned,
        report.scanned + report.failures.len()
    );
    println!(
        " {} Findings:         {} across {} targets",
        "|-".dimmed(),
        report.summary.total,
        report.summary.targets
    );

    let critical = report.summary.count(Severity::Critical);
    let high = report.summary.count(Severity::High);
    println!(
        " {} By severity:      {} critical, {} high, {} medium, {} low, {} unknown",
        "|-".dimmed(),
        if critical > 0 {
            critical.to_string().red().bold().to_string()
        } else {
            "0".to_string()
        },
        if high > 0 {
            high.to_string().yellow().bold().to_string()
        } else {
            "0".to_string()
        },
        report.summary.count(Severity::Medium),
        report.summary.count(Severity::Low),
        report.summary.count(Severity::Unknown),
    );
    println!();
    println!(
        " {} Results saved to {}",
        "OK".green().bold(),
        report.path.display().to_string().cyan()
    );
    println!();
}

fn print_skipped(skipped: &[Skipped]) {
    if skipped.is_empty() {
        return;
    }
    println!(" {}", "Skipped Manifests".bold().underline());
    for item in skipped {
        println!(" {} {}", "|-".dimmed(), item.to_string().dimmed());
    }
    println!();
}
