use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::GxpError;
use crate::models::{Requirement, SpecType, Specification};

/// Section of a requirement block the line scanner is currently in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Description,
    Metadata,
}

/// Parser for Markdown-based GxP specifications
pub struct SpecificationParser {
    requirement_re: Regex,
    header_re: Regex,
    version_re: Regex,
    classifier: fn(&str) -> SpecType,
}

impl SpecificationParser {
    /// Creates a parser using the filename-based spec type classifier
    pub fn new() -> Self {
        Self::with_classifier(SpecType::from_filename)
    }

    /// Creates a parser with a custom filename classifier.
    ///
    /// The classifier decides which specification type a file name maps
    /// to; swapping it out does not affect the line scanner itself.
    pub fn with_classifier(classifier: fn(&str) -> SpecType) -> Self {
        Self {
            requirement_re: Regex::new(r"(?i)^#{3,4}\s+(?P<id>[A-Z]+-\d+)\s*:\s*(?P<title>.+)$")
                .expect("requirement header pattern"),
            header_re: Regex::new(r"^#\s+(?P<title>.+?)\s*$").expect("spec header pattern"),
            version_re: Regex::new(r"(?i)^##\s+Version\s*:\s*(?P<version>.+)$")
                .expect("spec version pattern"),
            classifier,
        }
    }

    /// Parse specification text. The filename is only used to classify
    /// the specification type; parsing itself never fails.
    pub fn parse_str(&self, content: &str, filename: &str) -> Specification {
        let spec_type = (self.classifier)(filename);
        let lines: Vec<&str> = content.lines().collect();

        Specification {
            spec_type,
            title: self.extract_title(&lines),
            version: self.extract_version(&lines),
            requirements: self.extract_requirements(&lines, spec_type),
        }
    }

    /// Parse a specification file, classifying its type from the file name
    pub fn parse_file(&self, path: &Path) -> Result<Specification, GxpError> {
        let content = fs::read_to_string(path).map_err(|e| GxpError::io(path, e))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(self.parse_str(&content, &filename))
    }

    /// Parse all `*.md` files in a directory, keyed by detected spec type.
    ///
    /// Files are visited in sorted name order, so when two files map to
    /// the same type the later name wins deterministically. A file that
    /// cannot be read is reported and skipped; a missing directory is an
    /// error for the caller to handle.
    pub fn parse_directory(&self, dir: &Path) -> Result<HashMap<SpecType, Specification>, GxpError> {
        let entries = fs::read_dir(dir).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                GxpError::SpecDirNotFound(dir.to_path_buf())
            } else {
                GxpError::io(dir, e)
            }
        })?;

        let mut paths: Vec<_> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && p.extension().map(|e| e == "md").unwrap_or(false))
            .collect();
        paths.sort();

        let mut specs = HashMap::new();
        for path in paths {
            match self.parse_file(&path) {
                Ok(spec) => {
                    specs.insert(spec.spec_type, spec);
                }
                Err(e) => {
                    eprintln!("Warning: failed to parse {}: {}", path.display(), e);
                }
            }
        }
        Ok(specs)
    }

    fn extract_title(&self, lines: &[&str]) -> String {
        for line in lines {
            if let Some(caps) = self.header_re.captures(line.trim()) {
                return caps["title"].trim().to_string();
            }
        }
        String::from("Untitled Specification")
    }

    fn extract_version(&self, lines: &[&str]) -> String {
        for line in lines {
            if let Some(caps) = self.version_re.captures(line.trim()) {
                return caps["version"].trim().to_string();
            }
        }
        String::from("1.0")
    }

    fn extract_requirements(&self, lines: &[&str], spec_type: SpecType) -> Vec<Requirement> {
        let mut requirements = Vec::new();
        let mut current: Option<Requirement> = None;
        let mut description_lines: Vec<&str> = Vec::new();
        let mut section = Section::None;

        for &line in lines {
            let stripped = line.trim();

            // Requirement header starts a new block and flushes the old one
            if let Some(caps) = self.requirement_re.captures(stripped) {
                if let Some(req) = current.take() {
                    requirements.push(Self::flush(req, &description_lines));
                }
                current = Some(Requirement::new(
                    caps["id"].to_string(),
                    caps["title"].trim(),
                    spec_type,
                ));
                description_lines.clear();
                section = Section::None;
                continue;
            }

            let lower = stripped.to_lowercase();
            if lower.starts_with("####") && lower.contains("description") {
                section = Section::Description;
                continue;
            }
            if lower.starts_with("####") && lower.contains("metadata") {
                section = Section::Metadata;
                continue;
            }

            if let Some(req) = current.as_mut() {
                match section {
                    Section::Description => {
                        if !stripped.is_empty() && !stripped.starts_with('#') {
                            description_lines.push(line);
                        }
                    }
                    Section::Metadata => {
                        if let Some((key, value)) = stripped.split_once(':') {
                            req.metadata
                                .insert(key.trim().to_string(), value.trim().to_string());
                        }
                    }
                    Section::None => {
                        // Content before an explicit Description sub-heading
                        if !stripped.starts_with('#') {
                            description_lines.push(line);
                        }
                    }
                }
            }
        }

        if let Some(req) = current.take() {
            requirements.push(Self::flush(req, &description_lines));
        }

        requirements
    }

    fn flush(mut req: Requirement, description_lines: &[&str]) -> Requirement {
        req.description = description_lines.join("\n").trim().to_string();
        req
    }
}

impl Default for SpecificationParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;
    use tempfile::tempdir;

    const SAMPLE_SPEC: &str = "\
# Functional Specification

## Version: 1.0

### FS-001: User Login

#### Description
The application shall allow users to log in.

1. Display login form
2. Validate credentials

Expected Result: User is authenticated successfully.

#### Metadata
Priority: High
";

    #[test]
    fn test_parse_round_trip_example() {
        let parser = SpecificationParser::new();
        let spec = parser.parse_str(SAMPLE_SPEC, "functional_spec.md");

        assert_eq!(spec.spec_type, SpecType::Functional);
        assert_eq!(spec.title, "Functional Specification");
        assert_eq!(spec.version, "1.0");
        assert_eq!(spec.requirements.len(), 1);

        let req = &spec.requirements[0];
        assert_eq!(req.id, "FS-001");
        assert_eq!(req.title, "User Login");
        assert!(req.description.contains("1. Display login form"));
        assert!(req.description.contains("2. Validate credentials"));
        assert!(req.description.contains("Expected Result: User is authenticated"));
        assert_eq!(req.metadata.get("Priority"), Some(&"High".to_string()));
    }

    #[test]
    fn test_parse_is_idempotent() {
        let parser = SpecificationParser::new();
        let first = parser.parse_str(SAMPLE_SPEC, "functional_spec.md");
        let second = parser.parse_str(SAMPLE_SPEC, "functional_spec.md");
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_title_and_version_defaults() {
        let parser = SpecificationParser::new();
        let spec = parser.parse_str("### DS-001: Something\nBody text.\n", "design.md");
        assert_eq!(spec.title, "Untitled Specification");
        assert_eq!(spec.version, "1.0");
        assert_eq!(spec.spec_type, SpecType::Design);
    }

    #[test]
    fn test_description_without_marker() {
        let parser = SpecificationParser::new();
        let text = "### FS-002: Logout\nThe system shall log users out.\nAfter 30 minutes.\n";
        let spec = parser.parse_str(text, "functional.md");
        assert_eq!(spec.requirements.len(), 1);
        assert_eq!(
            spec.requirements[0].description,
            "The system shall log users out.\nAfter 30 minutes."
        );
    }

    #[test]
    fn test_multiple_requirements_flush() {
        let parser = SpecificationParser::new();
        let text = "\
# Spec

### FS-001: First

First description.

### FS-002: Second

#### Description
Second description.
";
        let spec = parser.parse_str(text, "functional.md");
        assert_eq!(spec.requirements.len(), 2);
        assert_eq!(spec.requirements[0].id, "FS-001");
        assert_eq!(spec.requirements[0].description, "First description.");
        assert_eq!(spec.requirements[1].id, "FS-002");
        assert_eq!(spec.requirements[1].description, "Second description.");
    }

    #[test]
    fn test_metadata_duplicate_key_last_wins() {
        let parser = SpecificationParser::new();
        let text = "\
### FS-003: Config

#### Metadata
Priority: Low
Owner: QA
Priority: High
";
        let spec = parser.parse_str(text, "functional.md");
        let metadata = &spec.requirements[0].metadata;
        assert_eq!(metadata.get("Priority"), Some(&"High".to_string()));
        assert_eq!(metadata.get("Owner"), Some(&"QA".to_string()));
        // Insertion order is preserved
        let keys: Vec<_> = metadata.keys().collect();
        assert_eq!(keys, vec!["Priority", "Owner"]);
    }

    #[test]
    fn test_h2_requirement_headers_not_recognized() {
        let parser = SpecificationParser::new();
        let spec = parser.parse_str("## FS-001: Not A Requirement\n", "functional.md");
        assert!(spec.requirements.is_empty());
    }

    #[test]
    fn test_h4_requirement_headers_recognized() {
        let parser = SpecificationParser::new();
        let spec = parser.parse_str("#### FS-004: Deep Header\nBody.\n", "functional.md");
        assert_eq!(spec.requirements.len(), 1);
        assert_eq!(spec.requirements[0].id, "FS-004");
    }

    #[test]
    fn test_duplicate_requirement_ids_preserved() {
        // A second header with the same ID starts a new requirement; the
        // parser does not deduplicate within a document.
        let parser = SpecificationParser::new();
        let text = "### FS-001: First\nOne.\n### FS-001: Shadow\nTwo.\n";
        let spec = parser.parse_str(text, "functional.md");
        assert_eq!(spec.requirements.len(), 2);
        assert_eq!(spec.requirements[0].title, "First");
        assert_eq!(spec.requirements[1].title, "Shadow");
    }

    #[test]
    fn test_custom_classifier() {
        fn always_user(_: &str) -> SpecType {
            SpecType::User
        }
        let parser = SpecificationParser::with_classifier(always_user);
        let spec = parser.parse_str("# Anything\n", "functional.md");
        assert_eq!(spec.spec_type, SpecType::User);
    }

    #[test]
    fn test_parse_directory() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("functional_spec.md"), SAMPLE_SPEC).unwrap();
        fs::write(
            dir.path().join("design_spec.md"),
            "# Design Spec\n\n### DS-001: Architecture\nLayered.\n",
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "not a spec").unwrap();

        let parser = SpecificationParser::new();
        let specs = parser.parse_directory(dir.path()).unwrap();

        assert_eq!(specs.len(), 2);
        assert!(specs.contains_key(&SpecType::Functional));
        assert!(specs.contains_key(&SpecType::Design));
        assert_eq!(specs[&SpecType::Design].requirements[0].id, "DS-001");
    }

    #[test]
    fn test_parse_directory_empty() {
        let dir = tempdir().unwrap();
        let parser = SpecificationParser::new();
        let specs = parser.parse_directory(dir.path()).unwrap();
        assert!(specs.is_empty());
    }

    #[test]
    fn test_parse_directory_missing() {
        let parser = SpecificationParser::new();
        let err = parser
            .parse_directory(Path::new("/nonexistent/spec/dir"))
            .unwrap_err();
        assert!(matches!(err, GxpError::SpecDirNotFound(_)));
    }

    #[test]
    fn test_parse_directory_same_type_later_name_wins() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("a_functional.md"),
            "# Early\n### FS-001: Early\nEarly.\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("b_functional.md"),
            "# Late\n### FS-002: Late\nLate.\n",
        )
        .unwrap();

        let parser = SpecificationParser::new();
        let specs = parser.parse_directory(dir.path()).unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[&SpecType::Functional].title, "Late");
    }

    #[test]
    fn test_parse_directory_skips_unreadable_file() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("functional.md"), SAMPLE_SPEC).unwrap();
        // Invalid UTF-8 cannot be read to a string and must be skipped
        let mut bad = fs::File::create(dir.path().join("broken.md")).unwrap();
        bad.write_all(&[0xff, 0xfe, 0x00, 0xff]).unwrap();

        let parser = SpecificationParser::new();
        let specs = parser.parse_directory(dir.path()).unwrap();
        assert_eq!(specs.len(), 1);
        assert!(specs.contains_key(&SpecType::Functional));
    }
}
