use indexmap::IndexMap;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::GxpError;
use crate::models::{Requirement, SpecType, Specification};

/// Information about one test function found in source text
#[derive(Debug, Clone, PartialEq)]
pub struct TestInfo {
    pub file_path: String,
    pub function_name: String,
    pub line_number: usize,
    /// Requirement IDs declared via the requirements annotation
    pub requirement_ids: Vec<String>,
    /// True when the body is a placeholder rather than a real test
    pub is_stub: bool,
    /// True when the function carries the gxp marker annotation
    pub has_gxp_marker: bool,
}

/// Results of static requirement-coverage analysis
#[derive(Debug, Default)]
pub struct CoverageAnalysis {
    pub total_requirements: usize,
    /// Requirements with at least one non-stub test
    pub covered_requirements: usize,
    /// Requirements with no tests at all
    pub uncovered_requirements: Vec<Requirement>,
    /// Requirements whose tests are all stubs
    pub stub_only_requirements: Vec<(Requirement, Vec<TestInfo>)>,
    /// Function names reused across the test suite
    pub duplicate_test_ids: IndexMap<String, Vec<TestInfo>>,
    /// Requirement-annotated tests missing the gxp marker
    pub tests_without_gxp_marker: Vec<TestInfo>,
    /// Tests referencing requirement IDs absent from every specification
    pub orphan_tests: Vec<TestInfo>,
}

impl CoverageAnalysis {
    /// Whether any finding should trip a strict-mode gate
    pub fn has_issues(&self) -> bool {
        !self.duplicate_test_ids.is_empty()
            || !self.uncovered_requirements.is_empty()
            || !self.stub_only_requirements.is_empty()
            || !self.tests_without_gxp_marker.is_empty()
    }
}

/// Scans Rust test source text for test functions, their requirement
/// annotations, and stub bodies
pub struct TestSourceAnalyzer {
    fn_re: Regex,
    test_attr_re: Regex,
    gxp_attr_re: Regex,
    requirements_attr_re: Regex,
    quoted_re: Regex,
    skip_call_re: Regex,
}

impl TestSourceAnalyzer {
    pub fn new() -> Self {
        Self {
            fn_re: Regex::new(r"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:async\s+)?fn\s+([A-Za-z_][A-Za-z0-9_]*)")
                .expect("fn pattern"),
            test_attr_re: Regex::new(r"^\s*#\[\s*(?:[A-Za-z_][A-Za-z0-9_]*::)?test\s*\]")
                .expect("test attribute pattern"),
            gxp_attr_re: Regex::new(r"^\s*#\[\s*gxp\s*\]").expect("gxp attribute pattern"),
            requirements_attr_re: Regex::new(r"^\s*#\[\s*(?:gxp::)?requirements\s*\(")
                .expect("requirements attribute pattern"),
            quoted_re: Regex::new(r#""([^"]+)""#).expect("quoted string pattern"),
            skip_call_re: Regex::new(r"\bskip\s*\(").expect("skip call pattern"),
        }
    }

    /// Analyze test source text and return information about each test
    /// function found.
    ///
    /// A function counts as a test when it carries a `#[test]`-family
    /// attribute or its name starts with `test_`. Annotations are
    /// expected on their own line directly above the function.
    pub fn analyze_source(&self, source: &str, file_path: &str) -> Vec<TestInfo> {
        let lines: Vec<&str> = source.lines().collect();
        let mut tests = Vec::new();

        let mut pending_test_attr = false;
        let mut pending_gxp = false;
        let mut pending_requirements: Vec<String> = Vec::new();

        for (idx, line) in lines.iter().enumerate() {
            let trimmed = line.trim();

            if self.requirements_attr_re.is_match(trimmed) {
                pending_requirements = self
                    .quoted_re
                    .captures_iter(trimmed)
                    .map(|c| c[1].to_string())
                    .collect();
                continue;
            }
            if self.gxp_attr_re.is_match(trimmed) {
                pending_gxp = true;
                continue;
            }
            if self.test_attr_re.is_match(trimmed) {
                pending_test_attr = true;
                continue;
            }
            // Other attributes, comments, and blank lines keep the
            // accumulated annotations alive
            if trimmed.starts_with("#[") || trimmed.starts_with("//") || trimmed.is_empty() {
                continue;
            }

            if let Some(caps) = self.fn_re.captures(line) {
                let name = caps[1].to_string();
                if pending_test_attr || name.starts_with("test_") {
                    let body = Self::extract_body(&lines, idx);
                    tests.push(TestInfo {
                        file_path: file_path.to_string(),
                        function_name: name,
                        line_number: idx + 1,
                        requirement_ids: std::mem::take(&mut pending_requirements),
                        is_stub: self.is_stub(&body),
                        has_gxp_marker: pending_gxp,
                    });
                }
            }

            pending_test_attr = false;
            pending_gxp = false;
            pending_requirements.clear();
        }

        tests
    }

    /// Analyze a single test source file
    pub fn analyze_file(&self, path: &Path) -> Result<Vec<TestInfo>, GxpError> {
        let source = fs::read_to_string(path).map_err(|e| GxpError::io(path, e))?;
        Ok(self.analyze_source(&source, &path.display().to_string()))
    }

    /// Analyze every `*.rs` file under a directory, recursively.
    ///
    /// Unreadable files are reported and skipped; a missing directory is
    /// an error.
    pub fn analyze_directory(&self, dir: &Path) -> Result<Vec<TestInfo>, GxpError> {
        if !dir.is_dir() {
            return Err(GxpError::TestDirNotFound(dir.to_path_buf()));
        }

        let mut files = Vec::new();
        collect_rust_files(dir, &mut files)?;
        files.sort();

        let mut tests = Vec::new();
        for file in files {
            match self.analyze_file(&file) {
                Ok(mut found) => tests.append(&mut found),
                Err(e) => eprintln!("Warning: could not analyze {}: {}", file.display(), e),
            }
        }
        Ok(tests)
    }

    /// Collect the body of the function starting at `start`, without the
    /// outer braces. Line comments are stripped before brace counting.
    fn extract_body(lines: &[&str], start: usize) -> String {
        let mut depth = 0usize;
        let mut started = false;
        let mut body = String::new();

        for line in &lines[start..] {
            let code = line.split("//").next().unwrap_or("");
            for ch in code.chars() {
                match ch {
                    '{' => {
                        depth += 1;
                        if !started {
                            started = true;
                            continue;
                        }
                    }
                    '}' if started => {
                        depth -= 1;
                        if depth == 0 {
                            return body;
                        }
                    }
                    _ => {}
                }
                if started {
                    body.push(ch);
                }
            }
            if started {
                body.push('\n');
            }
        }
        body
    }

    /// A stub raises "not implemented", calls a skip operation, or has an
    /// empty body.
    fn is_stub(&self, body: &str) -> bool {
        if body.contains("todo!") || body.contains("unimplemented!") {
            return true;
        }
        if self.skip_call_re.is_match(body) {
            return true;
        }
        body.trim().is_empty()
    }
}

impl Default for TestSourceAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

fn collect_rust_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), GxpError> {
    let entries = fs::read_dir(dir).map_err(|e| GxpError::io(dir, e))?;
    for entry in entries.filter_map(Result::ok) {
        let path = entry.path();
        if path.is_dir() {
            collect_rust_files(&path, files)?;
        } else if path.extension().map(|e| e == "rs").unwrap_or(false) {
            files.push(path);
        }
    }
    Ok(())
}

/// Analyze requirement coverage from statically discovered tests.
///
/// The requirement-id universe is an explicit parameter so the orphan
/// check never depends on ambient state. Specifications are visited in
/// Design, Functional, User, Installation order for deterministic output.
pub fn analyze_coverage(
    specs: &HashMap<SpecType, Specification>,
    tests: &[TestInfo],
    all_requirement_ids: &HashSet<String>,
) -> CoverageAnalysis {
    let mut analysis = CoverageAnalysis::default();

    let mut req_to_tests: HashMap<&str, Vec<&TestInfo>> = HashMap::new();
    for test in tests {
        for req_id in &test.requirement_ids {
            req_to_tests.entry(req_id.as_str()).or_default().push(test);
        }
    }

    let mut by_name: IndexMap<&str, Vec<&TestInfo>> = IndexMap::new();
    for test in tests {
        by_name.entry(test.function_name.as_str()).or_default().push(test);
    }
    for (name, group) in by_name {
        if group.len() > 1 {
            analysis
                .duplicate_test_ids
                .insert(name.to_string(), group.into_iter().cloned().collect());
        }
    }

    for test in tests {
        if !test.requirement_ids.is_empty() && !test.has_gxp_marker {
            analysis.tests_without_gxp_marker.push(test.clone());
        }
    }

    for test in tests {
        if test
            .requirement_ids
            .iter()
            .any(|id| !all_requirement_ids.contains(id))
        {
            analysis.orphan_tests.push(test.clone());
        }
    }

    for spec_type in SpecType::all() {
        let Some(spec) = specs.get(&spec_type) else {
            continue;
        };
        for req in &spec.requirements {
            analysis.total_requirements += 1;
            match req_to_tests.get(req.id.as_str()) {
                None => analysis.uncovered_requirements.push(req.clone()),
                Some(found) if found.iter().all(|t| t.is_stub) => {
                    let stubs = found.iter().map(|t| (*t).clone()).collect();
                    analysis.stub_only_requirements.push((req.clone(), stubs));
                }
                Some(_) => analysis.covered_requirements += 1,
            }
        }
    }

    analysis
}
