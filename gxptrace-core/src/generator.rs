use indexmap::IndexMap;
use regex::Regex;
use std::collections::HashSet;

use crate::models::{Requirement, Specification, TestCase};

/// Generates one canonical test case per requirement
pub struct TestCaseGenerator {
    numbered_re: Regex,
}

impl TestCaseGenerator {
    pub fn new() -> Self {
        Self {
            numbered_re: Regex::new(r"^\d+[.)]\s+").expect("numbered list pattern"),
        }
    }

    /// Generate test cases from design, functional, and installation
    /// specifications.
    ///
    /// Functional requirements take precedence, then design, then
    /// installation; the first occurrence of a requirement ID wins, so a
    /// requirement duplicated across specification types is tested exactly
    /// once. The user specification is not a source of test cases.
    pub fn generate(
        &self,
        design: Option<&Specification>,
        functional: Option<&Specification>,
        installation: Option<&Specification>,
    ) -> Vec<TestCase> {
        let mut merged: Vec<&Requirement> = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();

        for spec in [functional, design, installation].into_iter().flatten() {
            for req in &spec.requirements {
                if seen.insert(req.id.as_str()) {
                    merged.push(req);
                }
            }
        }

        merged.iter().map(|req| self.to_test_case(req)).collect()
    }

    fn to_test_case(&self, req: &Requirement) -> TestCase {
        let mut requirements = vec![req.id.clone()];
        if let Some(parent) = &req.parent_id {
            requirements.push(parent.clone());
        }

        let mut metadata = IndexMap::new();
        metadata.insert("spec_type".to_string(), req.spec_type.to_string());
        metadata.insert("requirement_id".to_string(), req.id.clone());
        for (key, value) in &req.metadata {
            metadata.insert(key.clone(), value.clone());
        }

        TestCase {
            id: format!("TEST-{}", req.id),
            title: format!("Test {}: {}", req.id, req.title),
            description: req.description.clone(),
            requirements,
            steps: self.extract_steps(&req.description),
            expected_result: Self::expected_result(req),
            metadata,
        }
    }

    /// Extract verification steps from a requirement description.
    ///
    /// Numbered (`1.`, `1)`) and bulleted (`-`, `*`) list items become
    /// steps in order. Without list markers the first non-heading,
    /// non-empty line stands in; an empty description falls back to a
    /// generic verification step.
    fn extract_steps(&self, description: &str) -> Vec<String> {
        let mut steps = Vec::new();

        for line in description.lines() {
            let line = line.trim();
            if self.numbered_re.is_match(line) {
                let step = self.numbered_re.replace(line, "").trim().to_string();
                if !step.is_empty() {
                    steps.push(step);
                }
            } else if let Some(rest) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
                let step = rest.trim().to_string();
                if !step.is_empty() {
                    steps.push(step);
                }
            }
        }

        if steps.is_empty() {
            if let Some(first) = description
                .lines()
                .map(str::trim)
                .find(|l| !l.is_empty() && !l.starts_with('#'))
            {
                steps.push(first.to_string());
            }
        }

        if steps.is_empty() {
            steps.push(String::from("Verify requirement is met"));
        }

        steps
    }

    /// Derive the expected result from the description: the first line
    /// mentioning "expected" or "should", joined with up to the next two
    /// lines (stopping at blanks), else a generic satisfied statement.
    fn expected_result(req: &Requirement) -> String {
        let lines: Vec<&str> = req.description.lines().map(str::trim).collect();
        for (i, line) in lines.iter().enumerate() {
            let lower = line.to_lowercase();
            if lower.contains("expected") || lower.contains("should") {
                let mut parts = vec![*line];
                for next in lines.iter().skip(i + 1).take(2) {
                    if next.is_empty() {
                        break;
                    }
                    parts.push(next);
                }
                return parts.join(" ");
            }
        }
        format!("Requirement {} is satisfied: {}", req.id, req.title)
    }
}

impl Default for TestCaseGenerator {
    fn default() -> Self {
        Self::new()
    }
}
