//! Mirage endpoint definition linter CLI
//!
//! Usage:
//!   mirage-lint <directory_or_file> [OPTIONS]

use clap::{Parser, ValueEnum};
use mirage_lint::{fix_path, lint_path, FixReport, LintIssue, LintResult, Severity};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

// ANSI color codes
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

const RULE_LINE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Mirage Endpoint Definition Linter
#[derive(Parser, Debug)]
#[command(name = "mirage-lint")]
#[command(author, version, about = "Validate Mirage endpoint definition files")]
struct Args {
    /// Definition file or directory of definitions
    #[arg(required = true)]
    path: PathBuf,

    /// Rewrite legacy header rule lists before linting
    #[arg(short, long)]
    fix: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    output: OutputFormat,

    /// Only show errors (hide warnings)
    #[arg(short = 'e', long)]
    errors_only: bool,

    /// Strict mode - treat warnings as errors
    #[arg(short, long)]
    strict: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let text = args.output == OutputFormat::Text;

    if text {
        println!("{BOLD}{CYAN}Mirage Definition Linter{RESET}");
        println!("{DIM}{RULE_LINE}{RESET}");
    }

    let mut fix_failed = false;
    if args.fix {
        let (reports, failures) = apply_fixes(&args.path);
        fix_failed = failures > 0;
        if text {
            print_fixes(&reports, failures);
        }
    }

    let result = lint_path(&args.path);

    if text {
        print_results(&result, &args);
    } else {
        print_results_json(&result);
    }

    if result.passed(args.strict) && !fix_failed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn apply_fixes(path: &Path) -> (Vec<FixReport>, usize) {
    match fix_path(path) {
        Ok((reports, failures)) => {
            for e in &failures {
                eprintln!("{RED}Fix failed:{RESET} {e}");
            }
            (reports, failures.len())
        }
        Err(e) => {
            eprintln!("{RED}Cannot fix {}:{RESET} {e}", path.display());
            (Vec::new(), 1)
        }
    }
}

fn print_fixes(reports: &[FixReport], failures: usize) {
    println!("\n{BOLD}Applying fixes...{RESET}");
    for report in reports {
        for migration in &report.migrations {
            println!(
                "  {GREEN}Fixed{RESET} {CYAN}{}{RESET} {} header `{}` -> `{}`",
                report.file.display(),
                migration.method,
                migration.header,
                migration.rule
            );
        }
        if report.loosened() {
            println!(
                "  {YELLOW}Note:{RESET} {} now accepts a value matching any of the listed rules",
                report.file.display()
            );
        }
    }
    let fixed: usize = reports.iter().map(|r| r.migrations.len()).sum();
    println!("{DIM}Rewrote {fixed} rule(s), {failures} file(s) failed{RESET}");
}

fn print_results_json(result: &LintResult) {
    match serde_json::to_string_pretty(result) {
        Ok(output) => println!("{output}"),
        Err(e) => eprintln!("Failed to serialize results: {e}"),
    }
}

fn print_results(result: &LintResult, args: &Args) {
    println!();

    let mut issues_by_file: BTreeMap<&PathBuf, Vec<&LintIssue>> = BTreeMap::new();
    for issue in &result.issues {
        if args.errors_only && issue.severity != Severity::Error {
            continue;
        }
        issues_by_file.entry(&issue.file).or_default().push(issue);
    }

    if issues_by_file.is_empty() {
        println!("{GREEN}{BOLD}No issues found!{RESET}");
    }

    for (file, issues) in &issues_by_file {
        let file_errors = issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count();
        let file_warnings = issues.len() - file_errors;

        let status_indicator = if file_errors > 0 {
            format!("{RED}FAIL{RESET}")
        } else {
            format!("{YELLOW}WARN{RESET}")
        };
        println!(
            "{status_indicator} {BOLD}{CYAN}{}{RESET} {DIM}({file_errors} error(s), {file_warnings} warning(s)){RESET}",
            file.display()
        );

        for issue in issues {
            let color = severity_color(issue.severity);
            let location_str = issue
                .location
                .as_ref()
                .map(|l| format!("{DIM}[{RESET}{CYAN}{l}{RESET}{DIM}]{RESET} "))
                .unwrap_or_default();

            println!(
                "  {color}|{RESET} {location_str}{BOLD}{color}{}{RESET}: {} {DIM}({color}{}{DIM}){RESET}",
                issue.severity.label(),
                issue.message,
                issue.code
            );

            if let Some(suggestion) = &issue.suggestion {
                println!("  {color}|{RESET}   {GREEN}-> {suggestion}{RESET}");
            }
        }
        println!();
    }

    println!("{DIM}{RULE_LINE}{RESET}");
    println!("{BOLD}{CYAN}Summary{RESET}");
    println!("{DIM}{RULE_LINE}{RESET}");
    println!(
        "  {DIM}Files checked:{RESET} {BOLD}{}{RESET}",
        result.files_checked
    );
    let error_color = if result.has_errors() { RED } else { GREEN };
    println!(
        "  {error_color}Errors:{RESET}    {BOLD}{error_color}{}{RESET}",
        result.errors
    );
    let warning_color = if result.has_warnings() { YELLOW } else { DIM };
    println!(
        "  {warning_color}Warnings:{RESET}  {BOLD}{}{RESET}",
        result.warnings
    );
    println!();

    if result.passed(args.strict) {
        if result.has_warnings() {
            println!("{YELLOW}{BOLD}Passed with warnings{RESET}");
        } else {
            println!("{GREEN}{BOLD}All checks passed!{RESET}");
        }
    } else {
        println!("{RED}{BOLD}Linting failed{RESET}");
    }
}

fn severity_color(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => RED,
        Severity::Warning => YELLOW,
    }
}
