use std::collections::{BTreeSet, HashMap, HashSet};

use crate::models::{
    CoverageReport, Requirement, Specification, TestCase, TestResult, TestStatus, TraceabilityRow,
};

/// Traceability matrix linking test cases to the requirements they cover
#[derive(Debug, Default)]
pub struct TraceabilityMatrix {
    rows: Vec<TraceabilityRow>,
}

impl TraceabilityMatrix {
    /// Creates an empty matrix
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    /// Current matrix rows, in build order
    pub fn rows(&self) -> &[TraceabilityRow] {
        &self.rows
    }

    /// Whether the matrix has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Build the matrix from test cases and the available specifications.
    ///
    /// The combined requirement lookup is populated in Design, Functional,
    /// User, Installation order, so on an ID collision the later source
    /// wins. A test case covering N known requirements produces N rows;
    /// requirement IDs absent from every specification produce none.
    pub fn build(
        &mut self,
        test_cases: &[TestCase],
        design: Option<&Specification>,
        functional: Option<&Specification>,
        user: Option<&Specification>,
        installation: Option<&Specification>,
    ) -> &[TraceabilityRow] {
        let mut all_requirements: HashMap<&str, &Requirement> = HashMap::new();
        for spec in [design, functional, user, installation].into_iter().flatten() {
            for req in &spec.requirements {
                all_requirements.insert(req.id.as_str(), req);
            }
        }

        self.rows.clear();
        for test_case in test_cases {
            for req_id in &test_case.requirements {
                if let Some(req) = all_requirements.get(req_id.as_str()) {
                    self.rows.push(TraceabilityRow {
                        test_case_id: test_case.id.clone(),
                        test_case_title: test_case.title.clone(),
                        requirement_id: req_id.clone(),
                        requirement_title: req.title.clone(),
                        spec_type: req.spec_type,
                        user_requirement_id: Self::find_user_requirement(req_id, user),
                        status: TestStatus::NotExecuted,
                    });
                }
            }
        }

        &self.rows
    }

    /// Find the user requirement corresponding to a requirement ID.
    ///
    /// Best-effort: a user requirement whose `maps_to` metadata lists the
    /// ID wins, else the first whose title and the ID are case-insensitive
    /// substrings of one another. Returns an empty string when nothing
    /// matches.
    fn find_user_requirement(req_id: &str, user: Option<&Specification>) -> String {
        let Some(user) = user else {
            return String::new();
        };

        let id_lower = req_id.to_lowercase();
        for req in &user.requirements {
            if let Some(maps_to) = req.metadata.get("maps_to") {
                if maps_to.split(',').any(|id| id.trim() == req_id) {
                    return req.id.clone();
                }
            }
            let title_lower = req.title.to_lowercase();
            if title_lower.contains(&id_lower) || id_lower.contains(&title_lower) {
                return req.id.clone();
            }
        }

        String::new()
    }

    /// Unconditionally set the status of every row for a test case.
    /// Last write wins.
    pub fn update_status(&mut self, test_case_id: &str, status: TestStatus) {
        for row in &mut self.rows {
            if row.test_case_id == test_case_id {
                row.status = status;
            }
        }
    }

    /// Merge a streamed outcome into every row for a requirement.
    ///
    /// One requirement may be covered by several tests; the sticky-failure
    /// rule keeps the worst outcome (see [`TestStatus::merge`]).
    pub fn update_status_by_requirement(&mut self, requirement_id: &str, status: TestStatus) {
        for row in &mut self.rows {
            if row.requirement_id == requirement_id {
                row.status = row.status.merge(status);
            }
        }
    }

    /// Fold a batch of test results into the matrix, one merge per
    /// (requirement, outcome) pair.
    pub fn apply_results(&mut self, results: &[TestResult]) {
        for result in results {
            for req_id in &result.requirements {
                self.update_status_by_requirement(req_id, result.outcome);
            }
        }
    }

    /// Compute coverage and verification metrics from the current rows.
    ///
    /// When an authoritative requirement universe is supplied it defines
    /// the denominator; otherwise the distinct requirement IDs present in
    /// the matrix do. Coverage means a test exists; verification means a
    /// linked test passed.
    pub fn coverage(&self, all_requirements: Option<&HashSet<String>>) -> CoverageReport {
        let mut with_tests: BTreeSet<&str> = BTreeSet::new();
        let mut verified: BTreeSet<&str> = BTreeSet::new();

        for row in &self.rows {
            with_tests.insert(row.requirement_id.as_str());
            if row.status == TestStatus::Passed {
                verified.insert(row.requirement_id.as_str());
            }
        }

        let universe: BTreeSet<&str> = match all_requirements {
            Some(ids) => ids.iter().map(String::as_str).collect(),
            None => with_tests.iter().copied().collect(),
        };

        let uncovered: Vec<String> = universe
            .difference(&with_tests)
            .map(|id| id.to_string())
            .collect();
        let unverified: Vec<String> = with_tests
            .difference(&verified)
            .map(|id| id.to_string())
            .collect();

        let total = universe.len();
        let with_tests_count = with_tests.len();
        let verified_count = verified.len();

        let coverage_rate = if total > 0 {
            with_tests_count as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        let verification_rate = if with_tests_count > 0 {
            verified_count as f64 / with_tests_count as f64 * 100.0
        } else {
            0.0
        };

        CoverageReport {
            total_requirements: total,
            requirements_with_tests: with_tests_count,
            requirements_without_tests: uncovered.len(),
            requirement_coverage_rate: coverage_rate,
            requirements_verified: verified_count,
            requirement_verification_rate: verification_rate,
            uncovered_requirements: uncovered,
            unverified_requirements: unverified,
        }
    }
}
