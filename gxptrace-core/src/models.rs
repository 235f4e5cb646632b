use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the type of a specification document
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SpecType {
    Design,
    Functional,
    User,
    Installation,
}

impl fmt::Display for SpecType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecType::Design => write!(f, "Design"),
            SpecType::Functional => write!(f, "Functional"),
            SpecType::User => write!(f, "User"),
            SpecType::Installation => write!(f, "Installation"),
        }
    }
}

impl SpecType {
    /// Detect the specification type from a file name.
    ///
    /// The match is a case-insensitive substring heuristic; files whose
    /// names indicate no known type default to Functional.
    pub fn from_filename(filename: &str) -> Self {
        let lower = filename.to_lowercase();
        if lower.contains("design") {
            SpecType::Design
        } else if lower.contains("functional") {
            SpecType::Functional
        } else if lower.contains("user") {
            SpecType::User
        } else if lower.contains("installation") {
            SpecType::Installation
        } else {
            SpecType::Functional
        }
    }

    /// All specification types, in combined-lookup precedence order
    /// (later entries overwrite earlier ones on ID collision).
    pub fn all() -> [SpecType; 4] {
        [
            SpecType::Design,
            SpecType::Functional,
            SpecType::User,
            SpecType::Installation,
        ]
    }
}

/// Represents the qualification phase of a validation run (GAMP5)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum QualificationType {
    #[serde(rename = "IQ")]
    Iq,
    #[serde(rename = "OQ")]
    Oq,
    #[serde(rename = "PQ")]
    Pq,
}

impl fmt::Display for QualificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualificationType::Iq => write!(f, "IQ"),
            QualificationType::Oq => write!(f, "OQ"),
            QualificationType::Pq => write!(f, "PQ"),
        }
    }
}

impl QualificationType {
    /// Long-form name used in report headers
    pub fn long_name(&self) -> &'static str {
        match self {
            QualificationType::Iq => "Installation Qualification",
            QualificationType::Oq => "Operational Qualification",
            QualificationType::Pq => "Performance Qualification",
        }
    }

    /// Parse a qualification type from a string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "IQ" => Some(QualificationType::Iq),
            "OQ" => Some(QualificationType::Oq),
            "PQ" => Some(QualificationType::Pq),
            _ => None,
        }
    }
}

/// Execution status of a traceability row
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestStatus {
    NotExecuted,
    Passed,
    Failed,
    Skipped,
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestStatus::NotExecuted => write!(f, "Not Executed"),
            TestStatus::Passed => write!(f, "PASSED"),
            TestStatus::Failed => write!(f, "FAILED"),
            TestStatus::Skipped => write!(f, "SKIPPED"),
        }
    }
}

impl TestStatus {
    /// Parse a status from a string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('_', " ").as_str() {
            "passed" | "pass" => Some(TestStatus::Passed),
            "failed" | "fail" => Some(TestStatus::Failed),
            "skipped" | "skip" => Some(TestStatus::Skipped),
            "not executed" => Some(TestStatus::NotExecuted),
            _ => None,
        }
    }

    /// Merge an incoming outcome into the current row status.
    ///
    /// Failure is sticky: once a row is FAILED no later passing outcome
    /// can un-fail it. A row still at Not Executed takes whatever arrives
    /// first; PASSED only replaces non-terminal statuses.
    pub fn merge(self, incoming: TestStatus) -> TestStatus {
        match (self, incoming) {
            (TestStatus::NotExecuted, new) => new,
            (_, TestStatus::Failed) => TestStatus::Failed,
            (current, TestStatus::Passed) if current != TestStatus::Failed => TestStatus::Passed,
            (current, _) => current,
        }
    }
}

/// Represents a single requirement extracted from a specification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Requirement {
    /// Requirement identifier, e.g. "FS-001"
    pub id: String,

    /// Short title describing the requirement
    pub title: String,

    /// Detailed description of the requirement
    pub description: String,

    /// The specification document this requirement came from
    pub spec_type: SpecType,

    /// Optional parent requirement identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    /// Key/value metadata attached to the requirement, in document order
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub metadata: IndexMap<String, String>,
}

impl Requirement {
    /// Creates a new requirement with empty metadata and no parent
    pub fn new(id: impl Into<String>, title: impl Into<String>, spec_type: SpecType) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            spec_type,
            parent_id: None,
            metadata: IndexMap::new(),
        }
    }
}

/// Represents one parsed specification document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Specification {
    /// The type of this specification
    pub spec_type: SpecType,

    /// Document title from the first top-level heading
    pub title: String,

    /// Document version from the version heading
    pub version: String,

    /// Requirements in document order
    pub requirements: Vec<Requirement>,
}

impl Specification {
    /// Creates an empty specification with default title and version
    pub fn new(spec_type: SpecType) -> Self {
        Self {
            spec_type,
            title: String::from("Untitled Specification"),
            version: String::from("1.0"),
            requirements: Vec::new(),
        }
    }
}

/// Represents a test case derived from a requirement
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestCase {
    /// Test case identifier, always "TEST-" plus the requirement ID
    pub id: String,

    /// Human-readable test title
    pub title: String,

    /// Description carried over from the source requirement
    pub description: String,

    /// Requirement IDs this test case covers
    pub requirements: Vec<String>,

    /// Ordered verification steps
    pub steps: Vec<String>,

    /// Expected result text
    pub expected_result: String,

    /// Key/value metadata (spec type, requirement ID, requirement metadata)
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub metadata: IndexMap<String, String>,
}

/// One link between a test case and a requirement it covers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraceabilityRow {
    pub test_case_id: String,
    pub test_case_title: String,
    pub requirement_id: String,
    pub requirement_title: String,
    pub spec_type: SpecType,
    /// Cross-referenced user requirement ID, empty when unmapped
    pub user_requirement_id: String,
    pub status: TestStatus,
}

/// A single test outcome reported by a test runner
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestResult {
    /// Test identifier as reported by the runner
    pub test_id: String,

    /// Requirement IDs the test declares coverage for
    pub requirements: Vec<String>,

    /// Outcome of the test run
    pub outcome: TestStatus,
}

/// Coverage and verification metrics computed from a traceability matrix
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoverageReport {
    /// Size of the requirement universe
    pub total_requirements: usize,

    /// Requirements linked to at least one test case
    pub requirements_with_tests: usize,

    /// Requirements with no linked test case
    pub requirements_without_tests: usize,

    /// Percentage of the universe with tests
    pub requirement_coverage_rate: f64,

    /// Requirements with at least one passing row
    pub requirements_verified: usize,

    /// Percentage of covered requirements that are verified
    pub requirement_verification_rate: f64,

    /// Requirement IDs without tests, sorted
    pub uncovered_requirements: Vec<String>,

    /// Requirement IDs with tests but no passing row, sorted
    pub unverified_requirements: Vec<String>,
}
