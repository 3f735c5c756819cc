//! package.json parser.

use serde_json::Value;

use super::{DependencyScope, Ecosystem, ManifestError, ManifestParser, ManifestSummary, ParsedManifest};

/// Dependency tables and the scope each one implies.
const SECTIONS: &[(&str, DependencyScope)] = &[
    ("dependencies", DependencyScope::Runtime),
    ("peerDependencies", DependencyScope::Runtime),
    ("optionalDependencies", DependencyScope::Runtime),
    ("devDependencies", DependencyScope::Dev),
];

pub struct NpmManifest;

impl ManifestParser for NpmManifest {
    fn format(&self) -> &'static str {
        "package.json"
    }

    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Npm
    }

    fn matches(&self, file_name: &str) -> bool {
        file_name == "package.json"
    }

    fn parse(&self, path: &str, content: &str) -> Result<ParsedManifest, ManifestError> {
        let json: Value = serde_json::from_str(content)?;
        let Some(root) = json.as_object() else {
            return Err(ManifestError::Malformed("top level is not an object".to_string()));
        };

        let mut summary = ManifestSummary::new(path, Ecosystem::Npm, self.format());
        summary.name = string_field(&json, "name");
        summary.version = string_field(&json, "version");
        summary.description = string_field(&json, "description");
        summary.scripts = string_map(root.get("scripts"));
        summary.engines = string_map(root.get("engines"));

        let mut parsed = ParsedManifest::new(summary);
        for (section, scope) in SECTIONS {
            if let Some(deps) = root.get(*section).and_then(Value::as_object) {
                for (name, version) in deps {
                    parsed.declare(name, version.as_str().unwrap_or(""), *scope);
                }
            }
        }
        Ok(parsed)
    }
}

fn string_field(json: &Value, key: &str) -> Option<String> {
    json.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn string_map(value: Option<&Value>) -> std::collections::BTreeMap<String, String> {
    value
        .and_then(Value::as_object)
        .map(|obj| {
            obj.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_and_dev() {
        let parsed = NpmManifest
            .parse(
                "package.json",
                r#"{"dependencies": {"react": "^18.0.0"}, "devDependencies": {"jest": "^29.0.0"}}"#,
            )
            .unwrap();
        assert_eq!(parsed.dependencies.len(), 2);
        let react = &parsed.dependencies[0];
        assert_eq!(react.name, "react");
        assert_eq!(react.version_constraint, "^18.0.0");
        assert_eq!(react.scope, DependencyScope::Runtime);
        assert_eq!(react.ecosystem, Ecosystem::Npm);
        let jest = &parsed.dependencies[1];
        assert_eq!(jest.name, "jest");
        assert_eq!(jest.scope, DependencyScope::Dev);
    }

    #[test]
    fn test_summary_fields() {
        let parsed = NpmManifest
            .parse(
                "package.json",
                r#"{
                    "name": "web-shop",
                    "version": "2.1.0",
                    "description": "Storefront",
                    "scripts": {"start": "node server.js", "test": "jest"},
                    "engines": {"node": ">=18"},
                    "peerDependencies": {"react-dom": "^18"},
                    "optionalDependencies": {"fsevents": "*"}
                }"#,
            )
            .unwrap();
        let summary = &parsed.summary;
        assert_eq!(summary.name.as_deref(), Some("web-shop"));
        assert_eq!(summary.version.as_deref(), Some("2.1.0"));
        assert_eq!(summary.scripts["start"], "node server.js");
        assert_eq!(summary.engines["node"], ">=18");
        assert!(parsed
            .dependencies
            .iter()
            .all(|d| d.scope == DependencyScope::Runtime));
        assert_eq!(parsed.dependencies.len(), 2);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            NpmManifest.parse("package.json", "{\"dependencies\": "),
            Err(ManifestError::Json(_))
        ));
        assert!(matches!(
            NpmManifest.parse("package.json", "[]"),
            Err(ManifestError::Malformed(_))
        ));
    }
}
