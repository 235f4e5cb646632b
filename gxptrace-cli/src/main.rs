mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use gxptrace_core::{
    analyze_coverage, export, CoverageAnalysis, GxpConfig, SpecType, Specification,
    SpecificationParser, TestCaseGenerator, TestResult, TestSourceAnalyzer, TraceabilityMatrix,
};

use crate::cli::{Cli, Command};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = GxpConfig::load_or_default(cli.config.as_deref())?;

    match &cli.command {
        Command::Coverage {
            spec_dir,
            test_dir,
            output,
            strict,
            verbose,
            json,
        } => {
            run_coverage(
                &config,
                spec_dir.as_deref(),
                test_dir.as_deref(),
                output.as_deref(),
                *strict,
                *verbose,
                *json,
            )?;
        }
        Command::Generate {
            spec_dir,
            format,
            output,
        } => {
            run_generate(&config, spec_dir.as_deref(), format, output.as_deref())?;
        }
        Command::Matrix {
            spec_dir,
            results,
            formats,
            output_dir,
            strict,
        } => {
            run_matrix(
                &config,
                spec_dir.as_deref(),
                results.as_deref(),
                formats.as_deref(),
                output_dir.as_deref(),
                *strict,
            )?;
        }
    }

    Ok(())
}

/// Parse the specification directory, exiting with an error when it holds
/// no specifications at all
fn parse_specs(
    parser: &SpecificationParser,
    spec_dir: &Path,
) -> Result<HashMap<SpecType, Specification>> {
    let specs = parser.parse_directory(spec_dir)?;
    if specs.is_empty() {
        eprintln!("No specification files found in {}", spec_dir.display());
        process::exit(1);
    }
    Ok(specs)
}

fn requirement_universe(specs: &HashMap<SpecType, Specification>) -> HashSet<String> {
    specs
        .values()
        .flat_map(|spec| spec.requirements.iter().map(|req| req.id.clone()))
        .collect()
}

fn run_coverage(
    config: &GxpConfig,
    spec_dir: Option<&Path>,
    test_dir: Option<&Path>,
    output: Option<&Path>,
    strict: bool,
    verbose: bool,
    json: bool,
) -> Result<()> {
    let spec_dir = spec_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&config.spec_files));
    let test_dir = test_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&config.test_files));
    let strict = strict || config.strict_coverage;

    let parser = SpecificationParser::new();
    let specs = parse_specs(&parser, &spec_dir)?;
    let all_requirement_ids = requirement_universe(&specs);

    if verbose {
        println!("Found {} specification file(s)", specs.len());
        println!("Found {} requirement(s)", all_requirement_ids.len());
    }

    let analyzer = TestSourceAnalyzer::new();
    let tests = analyzer.analyze_directory(&test_dir)?;
    if verbose {
        println!("Found {} test function(s)", tests.len());
    }

    let analysis = analyze_coverage(&specs, &tests, &all_requirement_ids);

    if json {
        println!("{}", serde_json::to_string_pretty(&coverage_json(&analysis))?);
    } else {
        print_summary(&analysis, verbose, &all_requirement_ids);
    }

    if let Some(output) = output {
        export::write_coverage_markdown(&analysis, output)?;
        println!("Report written to: {}", output.display());
    }

    if strict && analysis.has_issues() {
        process::exit(1);
    }

    Ok(())
}

fn coverage_json(analysis: &CoverageAnalysis) -> serde_json::Value {
    let mut duplicates = serde_json::Map::new();
    for (name, tests) in &analysis.duplicate_test_ids {
        let locations: Vec<serde_json::Value> = tests
            .iter()
            .map(|t| serde_json::json!({"file": t.file_path, "line": t.line_number}))
            .collect();
        duplicates.insert(name.clone(), serde_json::Value::Array(locations));
    }

    serde_json::json!({
        "total_requirements": analysis.total_requirements,
        "covered_requirements": analysis.covered_requirements,
        "uncovered_requirements": analysis
            .uncovered_requirements
            .iter()
            .map(|r| serde_json::json!({"id": r.id, "title": r.title}))
            .collect::<Vec<_>>(),
        "stub_only_requirements": analysis
            .stub_only_requirements
            .iter()
            .map(|(r, _)| serde_json::json!({"id": r.id, "title": r.title}))
            .collect::<Vec<_>>(),
        "duplicate_test_ids": duplicates,
        "tests_without_gxp_marker": analysis
            .tests_without_gxp_marker
            .iter()
            .map(|t| serde_json::json!({
                "file": t.file_path,
                "line": t.line_number,
                "name": t.function_name,
            }))
            .collect::<Vec<_>>(),
    })
}

fn print_summary(analysis: &CoverageAnalysis, verbose: bool, all_requirement_ids: &HashSet<String>) {
    println!();
    println!("{}", "=".repeat(60));
    println!("GxP Requirement Coverage Report");
    println!("{}", "=".repeat(60));

    let covered = analysis.covered_requirements;
    let stub_only = analysis.stub_only_requirements.len();
    let uncovered = analysis.uncovered_requirements.len();
    let total = analysis.total_requirements;

    let coverage_pct = if total > 0 {
        covered as f64 / total as f64 * 100.0
    } else {
        0.0
    };
    let stub_pct = if total > 0 {
        stub_only as f64 / total as f64 * 100.0
    } else {
        0.0
    };

    println!();
    println!("Coverage Summary:");
    println!("  Total Requirements:     {}", total);
    println!("  Fully Covered:          {} ({:.1}%)", covered, coverage_pct);
    println!("  Stub Only:              {} ({:.1}%)", stub_only, stub_pct);
    println!("  No Tests:               {}", uncovered);

    let mut issues_found = false;

    if !analysis.duplicate_test_ids.is_empty() {
        issues_found = true;
        println!();
        println!("{}", "Duplicate Test Names:".red().bold());
        for (name, tests) in &analysis.duplicate_test_ids {
            println!("  {}:", name);
            for test in tests {
                println!("    - {}:{}", test.file_path, test.line_number);
            }
        }
    }

    if !analysis.tests_without_gxp_marker.is_empty() {
        issues_found = true;
        println!();
        println!("{}", "Tests Missing #[gxp] Marker:".yellow().bold());
        for test in &analysis.tests_without_gxp_marker {
            println!(
                "  - {}:{} {}",
                test.file_path, test.line_number, test.function_name
            );
        }
    }

    if !analysis.orphan_tests.is_empty() {
        issues_found = true;
        println!();
        println!("{}", "Tests with Invalid Requirement IDs:".yellow().bold());
        for test in &analysis.orphan_tests {
            let invalid: Vec<&str> = test
                .requirement_ids
                .iter()
                .filter(|id| !all_requirement_ids.contains(*id))
                .map(String::as_str)
                .collect();
            println!(
                "  - {}:{} {} (invalid: {})",
                test.file_path,
                test.line_number,
                test.function_name,
                invalid.join(", ")
            );
        }
    }

    if !analysis.uncovered_requirements.is_empty() {
        println!();
        println!("{}", "Requirements Without Tests:".red().bold());
        for req in &analysis.uncovered_requirements {
            println!("  - {}: {}", req.id, req.title);
        }
    }

    if !analysis.stub_only_requirements.is_empty() {
        println!();
        println!("{}", "Requirements With Only Stub Tests:".yellow().bold());
        for (req, tests) in &analysis.stub_only_requirements {
            println!("  - {}: {}", req.id, req.title);
            if verbose {
                let locations: Vec<String> = tests
                    .iter()
                    .map(|t| format!("{}:{}", t.file_path, t.line_number))
                    .collect();
                println!("      Stubs: {}", locations.join(", "));
            }
        }
    }

    println!();
    if !issues_found
        && analysis.uncovered_requirements.is_empty()
        && analysis.stub_only_requirements.is_empty()
    {
        println!("{}", "All requirements have working tests!".green().bold());
    } else {
        println!(
            "Found {} duplicate test name(s), {} uncovered requirement(s), {} stub-only requirement(s)",
            analysis.duplicate_test_ids.len(),
            analysis.uncovered_requirements.len(),
            analysis.stub_only_requirements.len()
        );
    }
}

fn run_generate(
    config: &GxpConfig,
    spec_dir: Option<&Path>,
    format: &str,
    output: Option<&Path>,
) -> Result<()> {
    let spec_dir = spec_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&config.spec_files));

    let parser = SpecificationParser::new();
    let specs = parse_specs(&parser, &spec_dir)?;

    let generator = TestCaseGenerator::new();
    let cases = generator.generate(
        specs.get(&SpecType::Design),
        specs.get(&SpecType::Functional),
        specs.get(&SpecType::Installation),
    );

    if cases.is_empty() {
        println!("No test cases generated");
        return Ok(());
    }

    let meta = config.report_meta();
    match format {
        "json" => {
            let path = output
                .map(Path::to_path_buf)
                .unwrap_or_else(|| config.report_path("test_cases.json"));
            export::write_test_cases_json(&cases, &path)?;
        }
        "md" | "markdown" => {
            let path = output
                .map(Path::to_path_buf)
                .unwrap_or_else(|| config.report_path("test_cases.md"));
            export::write_test_cases_markdown(&cases, &path, &meta)?;
        }
        other => anyhow::bail!("Unknown format: {} (expected json or md)", other),
    }

    println!(
        "{}",
        format!("Generated {} test case(s)", cases.len()).green()
    );

    Ok(())
}

fn run_matrix(
    config: &GxpConfig,
    spec_dir: Option<&Path>,
    results: Option<&Path>,
    formats: Option<&str>,
    output_dir: Option<&Path>,
    strict: bool,
) -> Result<()> {
    let spec_dir = spec_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&config.spec_files));
    let output_dir = output_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&config.report_files));
    let strict = strict || config.strict_coverage;

    let parser = SpecificationParser::new();
    let specs = parse_specs(&parser, &spec_dir)?;

    let generator = TestCaseGenerator::new();
    let cases = generator.generate(
        specs.get(&SpecType::Design),
        specs.get(&SpecType::Functional),
        specs.get(&SpecType::Installation),
    );

    let mut matrix = TraceabilityMatrix::new();
    matrix.build(
        &cases,
        specs.get(&SpecType::Design),
        specs.get(&SpecType::Functional),
        specs.get(&SpecType::User),
        specs.get(&SpecType::Installation),
    );

    if let Some(results_path) = results {
        let content = fs::read_to_string(results_path)
            .with_context(|| format!("Failed to read results file: {:?}", results_path))?;
        let results: Vec<TestResult> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse results file: {:?}", results_path))?;
        matrix.apply_results(&results);
        println!("Applied {} test result(s)", results.len());
    }

    let formats: Vec<String> = match formats {
        Some(list) => list
            .split(',')
            .map(|f| f.trim().to_lowercase())
            .filter(|f| !f.is_empty())
            .collect(),
        None => config.output_formats.clone(),
    };

    let meta = config.report_meta();
    for format in &formats {
        match format.as_str() {
            "csv" => {
                export::write_matrix_csv(&matrix, &output_dir.join("traceability_matrix.csv"))?
            }
            "json" => export::write_matrix_json(
                &matrix,
                &output_dir.join("traceability_matrix.json"),
                &meta,
            )?,
            "md" | "markdown" => export::write_matrix_markdown(
                &matrix,
                &output_dir.join("traceability_matrix.md"),
                &meta,
            )?,
            other => eprintln!("Warning: unknown output format: {}", other),
        }
    }

    let universe = requirement_universe(&specs);
    let coverage = matrix.coverage(Some(&universe));

    println!();
    println!("Coverage Summary:");
    println!("  Total Requirements:     {}", coverage.total_requirements);
    println!(
        "  With Tests:             {} ({:.1}%)",
        coverage.requirements_with_tests, coverage.requirement_coverage_rate
    );
    println!(
        "  Verified:               {} ({:.1}%)",
        coverage.requirements_verified, coverage.requirement_verification_rate
    );
    if !coverage.uncovered_requirements.is_empty() {
        println!(
            "{}",
            format!(
                "  Uncovered:              {}",
                coverage.uncovered_requirements.join(", ")
            )
            .red()
        );
    }

    if strict && !coverage.uncovered_requirements.is_empty() {
        eprintln!(
            "{}",
            format!(
                "{} requirement(s) lack test coverage",
                coverage.uncovered_requirements.len()
            )
            .red()
            .bold()
        );
        process::exit(1);
    }

    Ok(())
}
