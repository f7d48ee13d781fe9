//! Check command - Compile templates and report diagnostics

use clap::Args;
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tessera_relief::CompileWarning;

use super::{collect_templates, compile_file, register_partials};
use crate::config::TesseraConfig;

#[derive(Args)]
pub struct CheckArgs {
    /// Files or directories holding .stache templates
    #[arg(default_value = ".")]
    pub patterns: Vec<String>,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: String,

    /// Fail when any template produces a warning
    #[arg(long)]
    pub deny_warnings: bool,
}

/// Diagnostics for one template file
#[derive(Debug, Serialize)]
struct FileReport {
    file: String,
    warnings: Vec<CompileWarning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// JSON output structure
#[derive(Serialize)]
struct JsonOutput<'a> {
    files: &'a [FileReport],
    #[serde(rename = "errorCount")]
    error_count: usize,
    #[serde(rename = "warningCount")]
    warning_count: usize,
    #[serde(rename = "fileCount")]
    file_count: usize,
}

fn check_file(path: &Path) -> FileReport {
    let file = path.display().to_string();
    match compile_file(path) {
        Ok(compiled) => FileReport {
            file,
            warnings: compiled.warnings,
            error: None,
        },
        Err(e) => FileReport {
            file,
            warnings: Vec::new(),
            error: Some(e.to_string()),
        },
    }
}

pub fn run(args: CheckArgs, config: &TesseraConfig) {
    let start = Instant::now();

    if let Err(e) = register_partials(config.partial_paths()) {
        eprintln!("\x1b[31mError:\x1b[0m {}", e);
        std::process::exit(1);
    }

    let files: Vec<PathBuf> = collect_templates(&args.patterns);
    if files.is_empty() {
        eprintln!("No .stache files found matching patterns: {:?}", args.patterns);
        return;
    }

    let error_count = AtomicUsize::new(0);
    let warning_count = AtomicUsize::new(0);

    let reports: Vec<FileReport> = files
        .par_iter()
        .map(|path| {
            let report = check_file(path);
            if report.error.is_some() {
                error_count.fetch_add(1, Ordering::Relaxed);
            }
            warning_count.fetch_add(report.warnings.len(), Ordering::Relaxed);
            report
        })
        .collect();

    let total_errors = error_count.load(Ordering::Relaxed);
    let total_warnings = warning_count.load(Ordering::Relaxed);

    if args.format == "json" {
        let output = JsonOutput {
            files: &reports,
            error_count: total_errors,
            warning_count: total_warnings,
            file_count: files.len(),
        };
        match serde_json::to_string_pretty(&output) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to serialize results: {}", e),
        }
    } else {
        for report in &reports {
            if let Some(error) = &report.error {
                println!("\x1b[31merror\x1b[0m {}", error);
            }
            for warning in &report.warnings {
                println!("\x1b[33mwarning\x1b[0m {}", warning);
            }
        }
        println!(
            "\n{} error(s), {} warning(s) in {} file(s)",
            total_errors,
            total_warnings,
            files.len()
        );
        println!("Checked {} files in {:.4?}", files.len(), start.elapsed());
    }

    let deny_warnings = args.deny_warnings || config.check.warnings_as_errors;
    if total_errors > 0 || (deny_warnings && total_warnings > 0) {
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::scratch_dir;
    use std::fs;

    #[test]
    fn test_check_file_collects_warnings() {
        let dir = scratch_dir("check-warn");
        let path = dir.join("list.stache");
        fs::write(&path, "<ul>\n{{#if a}}x{{/each}}</ul>").unwrap();

        let report = check_file(&path);
        assert!(report.error.is_none());
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(
            report.warnings[0].to_string(),
            format!("{}:2: unexpected closing tag {{{{/each}}}} expected {{{{/if}}}}", path.display())
        );
    }

    #[test]
    fn test_check_file_reports_errors() {
        let dir = scratch_dir("check-error");
        let path = dir.join("open.stache");
        fs::write(&path, "a{{/a}}").unwrap();

        let report = check_file(&path);
        assert!(report.warnings.is_empty());
        assert_eq!(
            report.error.unwrap(),
            format!("{}:1: {{{{/a}}}} Closing tag without a matching open section.", path.display())
        );
    }
}
