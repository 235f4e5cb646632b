use anyhow::{Context, Result};
use chrono::Local;
use std::fs;
use std::path::Path;

use crate::analyzer::CoverageAnalysis;
use crate::models::{QualificationType, TestCase};
use crate::traceability::TraceabilityMatrix;

/// Metadata stamped onto generated reports
#[derive(Debug, Clone)]
pub struct ReportMeta {
    pub project_name: String,
    pub qualification_type: QualificationType,
    pub software_version: String,
}

impl Default for ReportMeta {
    fn default() -> Self {
        Self {
            project_name: String::from("GxP Validation Project"),
            qualification_type: QualificationType::Oq,
            software_version: String::new(),
        }
    }
}

const MATRIX_CSV_HEADER: [&str; 7] = [
    "Test Case ID",
    "Test Case Title",
    "Requirement ID",
    "Requirement Title",
    "Specification Type",
    "User Requirement ID",
    "Status",
];

/// Quote a CSV field per RFC 4180 when it contains a delimiter, quote,
/// or line break
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {:?}", parent))?;
    }
    Ok(())
}

/// Write the traceability matrix as CSV. An empty matrix writes nothing.
pub fn write_matrix_csv(matrix: &TraceabilityMatrix, path: &Path) -> Result<()> {
    if matrix.is_empty() {
        return Ok(());
    }

    ensure_parent(path)?;

    let mut output = String::new();
    output.push_str(&MATRIX_CSV_HEADER.join(","));
    output.push('\n');
    for row in matrix.rows() {
        let fields = [
            csv_field(&row.test_case_id),
            csv_field(&row.test_case_title),
            csv_field(&row.requirement_id),
            csv_field(&row.requirement_title),
            csv_field(&row.spec_type.to_string()),
            csv_field(&row.user_requirement_id),
            csv_field(&row.status.to_string()),
        ];
        output.push_str(&fields.join(","));
        output.push('\n');
    }

    fs::write(path, output).with_context(|| format!("Failed to write CSV to {:?}", path))?;

    println!("Wrote traceability matrix: {}", path.display());
    println!("  Total rows: {}", matrix.rows().len());

    Ok(())
}

/// Write the traceability matrix plus its coverage snapshot as JSON.
/// An empty matrix writes nothing.
pub fn write_matrix_json(matrix: &TraceabilityMatrix, path: &Path, meta: &ReportMeta) -> Result<()> {
    if matrix.is_empty() {
        return Ok(());
    }

    ensure_parent(path)?;

    let coverage = matrix.coverage(None);
    let data = serde_json::json!({
        "metadata": {
            "title": "Traceability Matrix",
            "project": meta.project_name,
            "qualification_type": meta.qualification_type,
            "software_version": meta.software_version,
            "generated_date": Local::now().to_rfc3339(),
            "version": "1.0",
        },
        "coverage": coverage,
        "matrix": matrix.rows(),
    });

    let json = serde_json::to_string_pretty(&data)?;
    fs::write(path, json).with_context(|| format!("Failed to write JSON to {:?}", path))?;

    println!("Wrote traceability matrix: {}", path.display());

    Ok(())
}

/// Write the traceability matrix as a Markdown document with a coverage
/// summary. An empty matrix writes nothing.
pub fn write_matrix_markdown(
    matrix: &TraceabilityMatrix,
    path: &Path,
    meta: &ReportMeta,
) -> Result<()> {
    if matrix.is_empty() {
        return Ok(());
    }

    ensure_parent(path)?;

    let coverage = matrix.coverage(None);
    let mut output = String::new();

    output.push_str("# Traceability Matrix\n\n");
    output.push_str(&format!("**Project:** {}\n", meta.project_name));
    output.push_str(&format!(
        "**Qualification:** {} ({})\n",
        meta.qualification_type,
        meta.qualification_type.long_name()
    ));
    output.push_str(&format!(
        "**Generated:** {}\n",
        Local::now().format("%Y-%m-%d")
    ));
    output.push_str("**Version:** 1.0\n\n");
    output.push_str("## Overview\n\n");
    output.push_str(
        "This traceability matrix demonstrates the relationship between test cases, \
         requirements from Design and Functional Specifications, and User Requirements.\n\n",
    );
    output.push_str("## Traceability Data\n\n");
    output.push_str("| Test Case ID | Test Case Title | Requirement ID | Requirement Title | Specification Type | User Requirement ID | Status |\n");
    output.push_str("|--------------|----------------|----------------|-------------------|-------------------|---------------------|--------|\n");

    for row in matrix.rows() {
        output.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {} |\n",
            row.test_case_id,
            row.test_case_title,
            row.requirement_id,
            row.requirement_title,
            row.spec_type,
            row.user_requirement_id,
            row.status,
        ));
    }

    output.push_str("\n## Coverage Summary\n\n");
    output.push_str(&format!(
        "- **Total Requirements:** {}\n",
        coverage.total_requirements
    ));
    output.push_str(&format!(
        "- **Requirements With Tests:** {}\n",
        coverage.requirements_with_tests
    ));
    output.push_str(&format!(
        "- **Coverage Rate:** {:.1}%\n",
        coverage.requirement_coverage_rate
    ));
    output.push_str(&format!(
        "- **Requirements Verified:** {}\n",
        coverage.requirements_verified
    ));
    output.push_str(&format!(
        "- **Verification Rate:** {:.1}%\n",
        coverage.requirement_verification_rate
    ));
    if !coverage.uncovered_requirements.is_empty() {
        output.push_str(&format!(
            "- **Uncovered Requirements:** {}\n",
            coverage.uncovered_requirements.join(", ")
        ));
    }
    if !coverage.unverified_requirements.is_empty() {
        output.push_str(&format!(
            "- **Unverified Requirements:** {}\n",
            coverage.unverified_requirements.join(", ")
        ));
    }
    output.push_str("\n## Notes\n\n- All requirements should have corresponding test cases\n");

    fs::write(path, output).with_context(|| format!("Failed to write Markdown to {:?}", path))?;

    println!("Wrote traceability matrix: {}", path.display());

    Ok(())
}

/// Write generated test cases as JSON. An empty list writes nothing.
pub fn write_test_cases_json(test_cases: &[TestCase], path: &Path) -> Result<()> {
    if test_cases.is_empty() {
        return Ok(());
    }

    ensure_parent(path)?;

    let json = serde_json::to_string_pretty(test_cases)?;
    fs::write(path, json).with_context(|| format!("Failed to write JSON to {:?}", path))?;

    println!("Wrote test cases: {}", path.display());
    println!("  Total test cases: {}", test_cases.len());

    Ok(())
}

/// Write generated test cases as a Markdown document. An empty list
/// writes nothing.
pub fn write_test_cases_markdown(
    test_cases: &[TestCase],
    path: &Path,
    meta: &ReportMeta,
) -> Result<()> {
    if test_cases.is_empty() {
        return Ok(());
    }

    ensure_parent(path)?;

    let mut output = String::new();
    output.push_str("# Generated Test Cases\n\n");
    output.push_str(&format!("**Project:** {}\n", meta.project_name));
    output.push_str(&format!(
        "**Generated:** {}\n\n",
        Local::now().format("%Y-%m-%d")
    ));

    for case in test_cases {
        output.push_str(&format!("## {}\n\n", case.title));
        output.push_str(&format!("**ID:** {}\n", case.id));
        output.push_str(&format!(
            "**Covers:** {}\n\n",
            case.requirements.join(", ")
        ));

        if !case.description.is_empty() {
            output.push_str(&format!("{}\n\n", case.description));
        }

        output.push_str("### Steps\n\n");
        for (i, step) in case.steps.iter().enumerate() {
            output.push_str(&format!("{}. {}\n", i + 1, step));
        }
        output.push_str(&format!(
            "\n### Expected Result\n\n{}\n\n",
            case.expected_result
        ));
    }

    fs::write(path, output).with_context(|| format!("Failed to write Markdown to {:?}", path))?;

    println!("Wrote test cases: {}", path.display());

    Ok(())
}

/// Write the static coverage analysis as a Markdown report
pub fn write_coverage_markdown(analysis: &CoverageAnalysis, path: &Path) -> Result<()> {
    ensure_parent(path)?;

    let mut output = String::new();
    output.push_str("# GxP Requirement Coverage Report\n\n");
    output.push_str(&format!(
        "**Generated:** {}\n\n",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    ));
    output.push_str("## Summary\n\n");
    output.push_str(&format!(
        "- **Total Requirements:** {}\n",
        analysis.total_requirements
    ));
    output.push_str(&format!(
        "- **Fully Covered:** {}\n",
        analysis.covered_requirements
    ));
    output.push_str(&format!(
        "- **Stub Only:** {}\n",
        analysis.stub_only_requirements.len()
    ));
    output.push_str(&format!(
        "- **No Tests:** {}\n\n",
        analysis.uncovered_requirements.len()
    ));

    let coverage_pct = if analysis.total_requirements > 0 {
        analysis.covered_requirements as f64 / analysis.total_requirements as f64 * 100.0
    } else {
        0.0
    };
    output.push_str(&format!("**Coverage Rate:** {:.1}%\n\n", coverage_pct));

    if !analysis.duplicate_test_ids.is_empty() {
        output.push_str("## Duplicate Test Names\n\n");
        output.push_str("| Test Name | Locations |\n|-----------|-----------|\n");
        for (name, tests) in &analysis.duplicate_test_ids {
            let locations: Vec<String> = tests
                .iter()
                .map(|t| format!("{}:{}", t.file_path, t.line_number))
                .collect();
            output.push_str(&format!("| {} | {} |\n", name, locations.join(", ")));
        }
        output.push('\n');
    }

    if !analysis.uncovered_requirements.is_empty() {
        output.push_str("## Requirements Without Tests\n\n");
        output.push_str("| Requirement ID | Title | Specification |\n|----------------|-------|---------------|\n");
        for req in &analysis.uncovered_requirements {
            output.push_str(&format!("| {} | {} | {} |\n", req.id, req.title, req.spec_type));
        }
        output.push('\n');
    }

    if !analysis.stub_only_requirements.is_empty() {
        output.push_str("## Requirements With Only Stub Tests\n\n");
        output.push_str("| Requirement ID | Title | Stub Location |\n|----------------|-------|---------------|\n");
        for (req, tests) in &analysis.stub_only_requirements {
            let locations: Vec<String> = tests
                .iter()
                .map(|t| format!("{}:{}", t.file_path, t.line_number))
                .collect();
            output.push_str(&format!("| {} | {} | {} |\n", req.id, req.title, locations.join(", ")));
        }
        output.push('\n');
    }

    fs::write(path, output).with_context(|| format!("Failed to write report to {:?}", path))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::TestCaseGenerator;
    use crate::models::{Requirement, SpecType, Specification, TestStatus};
    use tempfile::tempdir;

    fn sample_matrix() -> TraceabilityMatrix {
        let mut req = Requirement::new("FS-001", "Login, with commas", SpecType::Functional);
        req.description = String::from("The user should be able to log in.");
        let functional = Specification {
            spec_type: SpecType::Functional,
            title: String::from("Functional Spec"),
            version: String::from("1.0"),
            requirements: vec![req],
        };

        let generator = TestCaseGenerator::new();
        let cases = generator.generate(None, Some(&functional), None);
        let mut matrix = TraceabilityMatrix::new();
        matrix.build(&cases, None, Some(&functional), None, None);
        matrix.update_status_by_requirement("FS-001", TestStatus::Passed);
        matrix
    }

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_write_matrix_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("matrix.csv");
        write_matrix_csv(&sample_matrix(), &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Test Case ID,Test Case Title,Requirement ID,Requirement Title,Specification Type,User Requirement ID,Status"
        );
        let row = lines.next().unwrap();
        assert!(row.starts_with("TEST-FS-001,"));
        // The comma in the requirement title forces quoting
        assert!(row.contains("\"Login, with commas\""));
        assert!(row.ends_with("PASSED"));
    }

    #[test]
    fn test_write_matrix_csv_empty_writes_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("matrix.csv");
        write_matrix_csv(&TraceabilityMatrix::new(), &path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_write_matrix_json_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("matrix.json");
        write_matrix_json(&sample_matrix(), &path, &ReportMeta::default()).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let data: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(data["metadata"]["title"], "Traceability Matrix");
        assert_eq!(data["metadata"]["qualification_type"], "OQ");
        assert_eq!(data["coverage"]["total_requirements"], 1);
        assert_eq!(data["matrix"][0]["test_case_id"], "TEST-FS-001");
        assert_eq!(data["matrix"][0]["status"], "PASSED");
    }

    #[test]
    fn test_write_matrix_markdown() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("matrix.md");
        write_matrix_markdown(&sample_matrix(), &path, &ReportMeta::default()).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("# Traceability Matrix"));
        assert!(content.contains("| TEST-FS-001 |"));
        assert!(content.contains("**Coverage Rate:** 100.0%"));
        assert!(content.contains("**Verification Rate:** 100.0%"));
    }

    #[test]
    fn test_write_test_cases_markdown() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test_cases.md");

        let mut req = Requirement::new("FS-002", "Export", SpecType::Functional);
        req.description = String::from("1. Open dialog\n2. Export CSV");
        let functional = Specification {
            spec_type: SpecType::Functional,
            title: String::from("Functional Spec"),
            version: String::from("1.0"),
            requirements: vec![req],
        };
        let cases = TestCaseGenerator::new().generate(None, Some(&functional), None);

        write_test_cases_markdown(&cases, &path, &ReportMeta::default()).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("## Test FS-002: Export"));
        assert!(content.contains("1. Open dialog"));
        assert!(content.contains("2. Export CSV"));
        assert!(content.contains("### Expected Result"));
    }

    #[test]
    fn test_write_coverage_markdown() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("coverage.md");

        let mut analysis = CoverageAnalysis::default();
        analysis.total_requirements = 2;
        analysis.covered_requirements = 1;
        analysis
            .uncovered_requirements
            .push(Requirement::new("FS-009", "Forgotten", SpecType::Functional));

        write_coverage_markdown(&analysis, &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("**Coverage Rate:** 50.0%"));
        assert!(content.contains("| FS-009 | Forgotten | Functional |"));
    }
}
