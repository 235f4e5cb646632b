use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::export::ReportMeta;
use crate::models::QualificationType;

/// Configuration for the traceability toolkit.
///
/// Every field has a default, so a configuration file only needs to list
/// the values it overrides.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GxpConfig {
    /// Project name stamped onto reports
    pub project_name: String,
    /// Version of the software under validation
    pub software_version: String,
    /// Qualification phase of this validation run
    pub qualification_type: QualificationType,
    /// Directory containing specification files
    pub spec_files: String,
    /// Directory containing test source files
    pub test_files: String,
    /// Directory report files are written into
    pub report_files: String,
    /// Treat coverage findings as fatal
    pub strict_coverage: bool,
    /// Report formats to emit (csv, json, md)
    pub output_formats: Vec<String>,
}

impl Default for GxpConfig {
    fn default() -> Self {
        Self {
            project_name: String::from("GxP Validation Project"),
            software_version: String::new(),
            qualification_type: QualificationType::Oq,
            spec_files: String::from("gxp_spec_files"),
            test_files: String::from("tests"),
            report_files: String::from("gxp_report_files"),
            strict_coverage: false,
            output_formats: vec![
                String::from("csv"),
                String::from("json"),
                String::from("md"),
            ],
        }
    }
}

impl GxpConfig {
    /// Loads the configuration from the provided path
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))
    }

    /// Resolve the configuration for a run.
    ///
    /// An explicitly given path must exist and parse. Otherwise a
    /// project-local `gxptrace.yaml` wins over a per-user
    /// `~/.gxptrace.yaml`; with neither present the defaults apply.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let local = Path::new("gxptrace.yaml");
        if local.exists() {
            return Self::load(local);
        }

        if let Some(home) = dirs::home_dir() {
            let global = home.join(".gxptrace.yaml");
            if global.exists() {
                return Self::load(&global);
            }
        }

        Ok(Self::default())
    }

    /// Path of a report file inside the configured report directory
    pub fn report_path(&self, file_name: &str) -> PathBuf {
        Path::new(&self.report_files).join(file_name)
    }

    /// Report metadata derived from this configuration
    pub fn report_meta(&self) -> ReportMeta {
        ReportMeta {
            project_name: self.project_name.clone(),
            qualification_type: self.qualification_type,
            software_version: self.software_version.clone(),
        }
    }
}
