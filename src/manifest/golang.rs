//! go.mod parser.
//!
//! Go declares root modules only; every `require` entry is runtime.
//! `replace` and `exclude` directives do not add declarations.

use super::{DependencyScope, Ecosystem, ManifestError, ManifestParser, ManifestSummary, ParsedManifest};

pub struct GoModManifest;

impl ManifestParser for GoModManifest {
    fn format(&self) -> &'static str {
        "go.mod"
    }

    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Other
    }

    fn matches(&self, file_name: &str) -> bool {
        file_name == "go.mod"
    }

    fn parse(&self, path: &str, content: &str) -> Result<ParsedManifest, ManifestError> {
        let mut parsed = ParsedManifest::new(ManifestSummary::new(path, Ecosystem::Other, self.format()));
        let mut in_require_block = false;
        let mut in_other_block = false;

        for line in content.lines() {
            let line = line.trim();

            if line.is_empty() || line.starts_with("//") {
                continue;
            }

            if let Some(module) = line.strip_prefix("module ") {
                parsed.summary.name = Some(module.trim().trim_matches('"').to_string());
                continue;
            }
            if let Some(version) = line.strip_prefix("go ") {
                parsed.summary.engines.insert("go".to_string(), version.trim().to_string());
                continue;
            }
            if let Some(version) = line.strip_prefix("toolchain ") {
                parsed.summary.engines.insert("toolchain".to_string(), version.trim().to_string());
                continue;
            }

            if line == "require (" {
                in_require_block = true;
                continue;
            }
            if line.ends_with('(') {
                // replace ( / exclude ( / retract (
                in_other_block = true;
                continue;
            }
            if line == ")" {
                in_require_block = false;
                in_other_block = false;
                continue;
            }

            if let Some(rest) = line.strip_prefix("require ") {
                if let Some((module, version)) = parse_require_line(rest) {
                    parsed.declare(&module, &version, DependencyScope::Runtime);
                }
                continue;
            }

            if in_require_block && !in_other_block {
                if let Some((module, version)) = parse_require_line(line) {
                    parsed.declare(&module, &version, DependencyScope::Runtime);
                }
            }
        }

        if parsed.summary.name.is_none() {
            return Err(ManifestError::Malformed("no module declaration found in go.mod".to_string()));
        }
        Ok(parsed)
    }
}

/// Parse a require line: "google.golang.org/grpc v1.78.0 // indirect"
fn parse_require_line(line: &str) -> Option<(String, String)> {
    let line = line.split("//").next().unwrap_or("").trim();

    let parts: Vec<&str> = line.split_whitespace().collect();
    match parts.as_slice() {
        [module, version, ..] => Some((module.to_string(), version.to_string())),
        [module] => Some((module.to_string(), String::new())),
        [] => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_go_mod() {
        let content = r#"
module github.com/example/api

go 1.22

require (
    github.com/gin-gonic/gin v1.9.1
    golang.org/x/sync v0.6.0 // indirect
)

require github.com/google/uuid v1.6.0

replace (
    github.com/old/pkg => ../pkg
)
"#;
        let parsed = GoModManifest.parse("go.mod", content).unwrap();
        assert_eq!(parsed.summary.name.as_deref(), Some("github.com/example/api"));
        assert_eq!(parsed.summary.engines["go"], "1.22");

        let deps: Vec<_> = parsed
            .dependencies
            .iter()
            .map(|d| (d.name.as_str(), d.version_constraint.as_str()))
            .collect();
        assert_eq!(
            deps,
            vec![
                ("github.com/gin-gonic/gin", "v1.9.1"),
                ("golang.org/x/sync", "v0.6.0"),
                ("github.com/google/uuid", "v1.6.0"),
            ]
        );
        assert!(parsed
            .dependencies
            .iter()
            .all(|d| d.scope == DependencyScope::Runtime && d.ecosystem == Ecosystem::Other));
    }

    #[test]
    fn test_missing_module_is_malformed() {
        assert!(matches!(
            GoModManifest.parse("go.mod", "go 1.21\n"),
            Err(ManifestError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_require_line() {
        assert_eq!(
            parse_require_line("google.golang.org/grpc v1.78.0"),
            Some(("google.golang.org/grpc".to_string(), "v1.78.0".to_string()))
        );
        assert_eq!(parse_require_line("// only a comment"), None);
    }
}
