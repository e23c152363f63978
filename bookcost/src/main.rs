use anyhow::{Context, Result};
use bookcost_core::{Pipeline, ReportConfig, read_table, report_file_name, write_report};
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};

mod formatter;
mod logging;

use formatter::RunOutcome;

#[derive(Parser)]
#[command(name = "bookcost")]
#[command(about = "Per-student textbook cost report for the colleges matching a keyword", long_about = None)]
#[command(version)]
struct Cli {
    /// Student roster workbook (Excel/ODS)
    #[arg(long, value_name = "FILE")]
    students: PathBuf,

    /// Book price list workbook (Excel/ODS)
    #[arg(long, value_name = "FILE")]
    books: PathBuf,

    /// College keyword, matched as a substring; repeat for several reports
    #[arg(long = "college", value_name = "KEYWORD", required = true)]
    colleges: Vec<String>,

    /// Roster sheet name (default: first sheet)
    #[arg(long, value_name = "NAME")]
    student_sheet: Option<String>,

    /// Price list sheet name (default: first sheet)
    #[arg(long, value_name = "NAME")]
    book_sheet: Option<String>,

    /// Path to configuration file (TOML)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Directory for report workbooks
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "human")]
    format: OutputFormat,

    /// Print the summary without writing report files
    #[arg(long)]
    no_report: bool,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON output for scripting
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging();

    let keywords = parse_keywords(&cli.colleges)?;
    let config = load_config(cli.config.as_deref())?;
    config.validate().context("Invalid configuration")?;

    let students = read_table(&cli.students, cli.student_sheet.as_deref())
        .with_context(|| format!("Failed to read roster: {}", cli.students.display()))?;
    let books = read_table(&cli.books, cli.book_sheet.as_deref())
        .with_context(|| format!("Failed to read price list: {}", cli.books.display()))?;

    let pipeline = Pipeline::with_config(config);
    let results = pipeline.run_many(&students, &books, &keywords);

    let mut outcomes = Vec::with_capacity(results.len());
    for (keyword, result) in results {
        let result = match result {
            Ok(report) => {
                if cli.no_report {
                    Ok((report, None))
                } else {
                    let path = cli
                        .output_dir
                        .join(report_file_name(&keyword, &report.summary.timestamp));
                    match write_report(&path, &report) {
                        Ok(()) => {
                            tracing::info!(path = %path.display(), "report written");
                            Ok((report, Some(path)))
                        }
                        Err(e) => Err(format!("{:#}", e)),
                    }
                }
            }
            Err(e) => {
                tracing::error!(keyword = %keyword, error = %e, "report failed");
                Err(e.to_string())
            }
        };
        outcomes.push(RunOutcome { keyword, result });
    }

    match cli.format {
        OutputFormat::Human => {
            formatter::print_human(&cli.students, &cli.books, &outcomes);
        }
        OutputFormat::Json => {
            formatter::print_json(&outcomes)?;
        }
    }

    let exit_code = if outcomes.iter().any(|o| o.result.is_err()) {
        1
    } else {
        0
    };

    std::process::exit(exit_code);
}

/// Trim keywords and reject blank ones before any work is done
fn parse_keywords(raw: &[String]) -> Result<Vec<String>> {
    raw.iter()
        .map(|keyword| {
            let keyword = keyword.trim();
            if keyword.is_empty() {
                anyhow::bail!("Please enter a college keyword");
            }
            Ok(keyword.to_string())
        })
        .collect()
}

fn load_config(path: Option<&Path>) -> Result<ReportConfig> {
    if let Some(config_path) = path {
        return ReportConfig::from_file(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()));
    }

    // Try to load default config from current directory if it exists
    let default_config_path = PathBuf::from("bookcost.toml");
    if default_config_path.exists() {
        ReportConfig::from_file(&default_config_path).with_context(|| {
            format!(
                "Failed to load config from {}",
                default_config_path.display()
            )
        })
    } else {
        Ok(ReportConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keywords() {
        let raw = vec![" 计算机 ".to_string(), "外国语".to_string()];
        assert_eq!(parse_keywords(&raw).unwrap(), vec!["计算机", "外国语"]);

        let blank = vec!["计算机".to_string(), "   ".to_string()];
        let err = parse_keywords(&blank).unwrap_err();
        assert!(err.to_string().contains("college keyword"));
    }

    #[test]
    fn test_cli_arguments() {
        let cli = Cli::try_parse_from([
            "bookcost",
            "--students",
            "roster.xlsx",
            "--books",
            "prices.xlsx",
            "--college",
            "计算机",
            "--college",
            "外国语",
            "-f",
            "json",
            "--no-report",
        ])
        .unwrap();

        assert_eq!(cli.colleges, vec!["计算机", "外国语"]);
        assert!(cli.no_report);
        assert!(matches!(cli.format, OutputFormat::Json));
        assert_eq!(cli.output_dir, PathBuf::from("."));

        // At least one keyword is required
        assert!(Cli::try_parse_from(["bookcost", "--students", "a.xlsx", "--books", "b.xlsx"]).is_err());
    }
}
