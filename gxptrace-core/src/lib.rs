pub mod analyzer;
pub mod config;
pub mod error;
pub mod export;
pub mod generator;
pub mod models;
pub mod parser;
pub mod traceability;

// Re-export commonly used types
pub use analyzer::{analyze_coverage, CoverageAnalysis, TestInfo, TestSourceAnalyzer};
pub use config::GxpConfig;
pub use error::GxpError;
pub use export::ReportMeta;
pub use generator::TestCaseGenerator;
pub use models::{
    CoverageReport, QualificationType, Requirement, SpecType, Specification, TestCase, TestResult,
    TestStatus, TraceabilityRow,
};
pub use parser::SpecificationParser;
pub use traceability::TraceabilityMatrix;
