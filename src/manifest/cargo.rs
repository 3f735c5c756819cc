//! Cargo.toml parser.

use toml::Value;

use super::{DependencyScope, Ecosystem, ManifestError, ManifestParser, ManifestSummary, ParsedManifest};

const SECTIONS: &[(&str, DependencyScope)] = &[
    ("dependencies", DependencyScope::Runtime),
    ("dev-dependencies", DependencyScope::Dev),
    ("build-dependencies", DependencyScope::Unspecified),
];

pub struct CargoManifest;

impl ManifestParser for CargoManifest {
    fn format(&self) -> &'static str {
        "Cargo.toml"
    }

    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Other
    }

    fn matches(&self, file_name: &str) -> bool {
        file_name == "Cargo.toml"
    }

    fn parse(&self, path: &str, content: &str) -> Result<ParsedManifest, ManifestError> {
        let doc: Value = toml::from_str(content)?;
        let mut summary = ManifestSummary::new(path, Ecosystem::Other, self.format());

        if let Some(package) = doc.get("package") {
            // workspace-inherited fields are tables; only literal strings count
            let text = |key: &str| package.get(key).and_then(Value::as_str).map(str::to_string);
            summary.name = text("name");
            summary.version = text("version");
            summary.description = text("description");
            if let Some(rust) = text("rust-version") {
                summary.engines.insert("rust".to_string(), rust);
            }
        }
        if let Some(bins) = doc.get("bin").and_then(Value::as_array) {
            for bin in bins {
                if let Some(name) = bin.get("name").and_then(Value::as_str) {
                    summary
                        .scripts
                        .insert(name.to_string(), format!("cargo run --bin {name}"));
                }
            }
        }

        let mut parsed = ParsedManifest::new(summary);
        for (section, scope) in SECTIONS {
            let Some(table) = doc.get(*section).and_then(Value::as_table) else {
                continue;
            };
            for (name, spec) in table {
                let constraint = match spec {
                    Value::String(version) => version.clone(),
                    Value::Table(t) => t
                        .get("version")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .unwrap_or_default(),
                    _ => String::new(),
                };
                parsed.declare(name, &constraint, *scope);
            }
        }
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cargo_toml() {
        let content = r#"
[package]
name = "lens"
version = "0.2.0"
rust-version = "1.74"

[[bin]]
name = "lens"
path = "src/main.rs"

[dependencies]
serde = { version = "1.0", features = ["derive"] }
regex = "1.10"
local = { path = "../local" }

[dev-dependencies]
tempfile = "3"

[build-dependencies]
cc = "1"
"#;
        let parsed = CargoManifest.parse("Cargo.toml", content).unwrap();
        assert_eq!(parsed.summary.name.as_deref(), Some("lens"));
        assert_eq!(parsed.summary.engines["rust"], "1.74");
        assert_eq!(parsed.summary.scripts["lens"], "cargo run --bin lens");

        let deps: Vec<_> = parsed
            .dependencies
            .iter()
            .map(|d| (d.name.as_str(), d.version_constraint.as_str(), d.scope))
            .collect();
        assert_eq!(
            deps,
            vec![
                ("local", "", DependencyScope::Runtime),
                ("regex", "1.10", DependencyScope::Runtime),
                ("serde", "1.0", DependencyScope::Runtime),
                ("tempfile", "3", DependencyScope::Dev),
                ("cc", "1", DependencyScope::Unspecified),
            ]
        );
    }

    #[test]
    fn test_workspace_only_manifest() {
        let parsed = CargoManifest
            .parse("Cargo.toml", "[workspace]\nmembers = [\"a\", \"b\"]\n")
            .unwrap();
        assert!(parsed.summary.name.is_none());
        assert!(parsed.dependencies.is_empty());
    }
}
