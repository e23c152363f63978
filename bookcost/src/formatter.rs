//! Output formatters for report runs

use anyhow::Result;
use bookcost_core::{CleaningStats, Report};
use colored::*;
use std::path::{Path, PathBuf};

/// Outcome of one keyword run as the CLI presents it
pub struct RunOutcome {
    pub keyword: String,
    pub result: std::result::Result<(Report, Option<PathBuf>), String>,
}

/// Print outcomes in human-readable format with colors
pub fn print_human(students: &Path, books: &Path, outcomes: &[RunOutcome]) {
    println!(
        "{}",
        format!("Roster: {}  Prices: {}", students.display(), books.display()).bold()
    );
    println!();

    for outcome in outcomes {
        println!("{} {}", "College keyword:".bold(), outcome.keyword.cyan().bold());

        match &outcome.result {
            Ok((report, path)) => print_report(report, path.as_deref()),
            Err(message) => println!("  {} {}", "ERROR".red().bold(), message),
        }
        println!();
    }

    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    println!("{}", "Summary:".bold().underline());
    println!(
        "  {} {}",
        "Succeeded:".green().bold(),
        outcomes.len() - failed
    );
    if failed > 0 {
        println!("  {} {}", "Failed:".red().bold(), failed);
    }
}

fn print_report(report: &Report, path: Option<&Path>) {
    let s = &report.summary;

    println!("  {} {}", "Generated:".bold(), s.timestamp_display());
    println!(
        "  {} {}",
        "Matched colleges:".bold(),
        s.matched_colleges_display()
    );
    println!("  {} {}", "Price column:".bold(), s.price_column.yellow());
    println!("  {} {}", "Students:".bold(), s.total_students);
    println!("  {} {}", "Total cost:".bold(), s.total_cost.round_dp(2));
    println!("  {} {}", "Mean per student:".bold(), s.mean_cost.round_dp(2));

    print_cleaning(&report.cleaning);

    match path {
        Some(path) => println!("  {} {}", "✓ Report written to".green(), path.display()),
        None => println!("  {}", "Report file skipped".bright_black()),
    }
}

fn print_cleaning(stats: &CleaningStats) {
    let students = stats.dropped_student_rows();
    let books = stats.dropped_book_rows();
    if students == 0 && books == 0 && stats.duplicate_isbns == 0 {
        return;
    }

    println!(
        "  {} {} student rows, {} book rows dropped ({} duplicate ISBNs)",
        "WARN".yellow().bold(),
        students,
        books,
        stats.duplicate_isbns
    );
}

/// Print outcomes in JSON format, one response object per keyword
pub fn print_json(outcomes: &[RunOutcome]) -> Result<()> {
    let responses: Vec<_> = outcomes
        .iter()
        .map(|outcome| match &outcome.result {
            Ok((report, path)) => serde_json::json!({
                "success": true,
                "keyword": outcome.keyword,
                "summary": report.summary,
                "cleaning": report.cleaning,
                "report": path.as_ref().map(|p| p.display().to_string()),
            }),
            Err(message) => serde_json::json!({
                "success": false,
                "keyword": outcome.keyword,
                "error": message,
            }),
        })
        .collect();

    // A single keyword keeps the flat response shape
    let output = match responses.as_slice() {
        [single] => single.clone(),
        _ => serde_json::Value::Array(responses),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
