//! Python manifests.
//!
//! Supports:
//! - requirements*.txt
//! - pyproject.toml (PEP 621 and Poetry)
//! - Pipfile

use toml::Value;

use super::utils::{is_dev_group, parse_requirement};
use super::{DependencyScope, Ecosystem, ManifestError, ManifestParser, ManifestSummary, ParsedManifest};

pub struct RequirementsManifest;

impl ManifestParser for RequirementsManifest {
    fn format(&self) -> &'static str {
        "requirements.txt"
    }

    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Pip
    }

    fn matches(&self, file_name: &str) -> bool {
        file_name.starts_with("requirements") && file_name.ends_with(".txt")
    }

    fn parse(&self, path: &str, content: &str) -> Result<ParsedManifest, ManifestError> {
        let file_name = path.rsplit('/').next().unwrap_or(path).to_ascii_lowercase();
        let scope = if file_name.contains("dev") || file_name.contains("test") {
            DependencyScope::Dev
        } else {
            DependencyScope::Runtime
        };

        let mut parsed = ParsedManifest::new(ManifestSummary::new(path, Ecosystem::Pip, self.format()));
        for line in content.lines() {
            if let Some((name, constraint)) = parse_requirement(line) {
                parsed.declare(&name, &constraint, scope);
            }
        }
        Ok(parsed)
    }
}

pub struct PyProjectManifest;

impl ManifestParser for PyProjectManifest {
    fn format(&self) -> &'static str {
        "pyproject.toml"
    }

    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Pip
    }

    fn matches(&self, file_name: &str) -> bool {
        file_name == "pyproject.toml"
    }

    fn parse(&self, path: &str, content: &str) -> Result<ParsedManifest, ManifestError> {
        let doc: Value = toml::from_str(content)?;
        let mut parsed = ParsedManifest::new(ManifestSummary::new(path, Ecosystem::Pip, self.format()));

        if let Some(project) = doc.get("project") {
            read_metadata(project, &mut parsed.summary);
            if let Some(python) = project.get("requires-python").and_then(Value::as_str) {
                parsed.summary.engines.insert("python".to_string(), python.to_string());
            }
            if let Some(scripts) = project.get("scripts").and_then(Value::as_table) {
                for (name, target) in scripts {
                    if let Some(target) = target.as_str() {
                        parsed.summary.scripts.insert(name.clone(), target.to_string());
                    }
                }
            }
            for req in string_array(project.get("dependencies")) {
                if let Some((name, constraint)) = parse_requirement(req) {
                    parsed.declare(&name, &constraint, DependencyScope::Runtime);
                }
            }
            if let Some(groups) = project.get("optional-dependencies").and_then(Value::as_table) {
                for (group, reqs) in groups {
                    let scope = group_scope(group, DependencyScope::Unspecified);
                    for req in string_array(Some(reqs)) {
                        if let Some((name, constraint)) = parse_requirement(req) {
                            parsed.declare(&name, &constraint, scope);
                        }
                    }
                }
            }
        }

        if let Some(poetry) = doc.get("tool").and_then(|t| t.get("poetry")) {
            if parsed.summary.name.is_none() {
                read_metadata(poetry, &mut parsed.summary);
            }
            if let Some(scripts) = poetry.get("scripts").and_then(Value::as_table) {
                for (name, target) in scripts {
                    if let Some(target) = target.as_str() {
                        parsed.summary.scripts.insert(name.clone(), target.to_string());
                    }
                }
            }
            declare_poetry_table(&mut parsed, poetry.get("dependencies"), DependencyScope::Runtime);
            declare_poetry_table(&mut parsed, poetry.get("dev-dependencies"), DependencyScope::Dev);
            if let Some(groups) = poetry.get("group").and_then(Value::as_table) {
                for (group, body) in groups {
                    // every poetry group is dev-only
                    let scope = group_scope(group, DependencyScope::Dev);
                    declare_poetry_table(&mut parsed, body.get("dependencies"), scope);
                }
            }
        }

        Ok(parsed)
    }
}

pub struct PipfileManifest;

impl ManifestParser for PipfileManifest {
    fn format(&self) -> &'static str {
        "Pipfile"
    }

    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Pip
    }

    fn matches(&self, file_name: &str) -> bool {
        file_name == "Pipfile"
    }

    fn parse(&self, path: &str, content: &str) -> Result<ParsedManifest, ManifestError> {
        let doc: Value = toml::from_str(content)?;
        let mut parsed = ParsedManifest::new(ManifestSummary::new(path, Ecosystem::Pip, self.format()));

        if let Some(python) = doc
            .get("requires")
            .and_then(|r| r.get("python_version").or_else(|| r.get("python_full_version")))
            .and_then(Value::as_str)
        {
            parsed.summary.engines.insert("python".to_string(), python.to_string());
        }
        if let Some(scripts) = doc.get("scripts").and_then(Value::as_table) {
            for (name, command) in scripts {
                if let Some(command) = command.as_str() {
                    parsed.summary.scripts.insert(name.clone(), command.to_string());
                }
            }
        }

        declare_poetry_table(&mut parsed, doc.get("packages"), DependencyScope::Runtime);
        declare_poetry_table(&mut parsed, doc.get("dev-packages"), DependencyScope::Dev);
        Ok(parsed)
    }
}

fn group_scope(group: &str, otherwise: DependencyScope) -> DependencyScope {
    if is_dev_group(group) {
        DependencyScope::Dev
    } else {
        otherwise
    }
}

fn read_metadata(table: &Value, summary: &mut ManifestSummary) {
    let text = |key: &str| table.get(key).and_then(Value::as_str).map(str::to_string);
    summary.name = text("name");
    summary.version = text("version");
    summary.description = text("description");
}

fn string_array(value: Option<&Value>) -> impl Iterator<Item = &str> {
    value
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
}

/// Name → constraint tables used by Poetry and Pipenv. Values are either a
/// version string or an inline table with a `version` key.
fn declare_poetry_table(parsed: &mut ParsedManifest, table: Option<&Value>, scope: DependencyScope) {
    let Some(table) = table.and_then(Value::as_table) else {
        return;
    };
    for (name, spec) in table {
        let constraint = match spec {
            Value::String(s) => s.clone(),
            Value::Table(t) => t
                .get("version")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_default(),
            _ => String::new(),
        };
        if name.eq_ignore_ascii_case("python") {
            parsed.summary.engines.insert("python".to_string(), constraint);
            continue;
        }
        parsed.declare(name, &constraint, scope);
    }
}
