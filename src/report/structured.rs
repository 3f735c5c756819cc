//! Structured mode: every section filled by template from the analysis.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

use crate::aggregate::{is_entry_point, ProjectAnalysis, TruncationCause};
use crate::classify::FidelityTier;
use crate::extract::ExtractionOutcome;
use crate::manifest::{DependencyScope, ManifestSummary};

use super::{Section, SectionKind};

/// Entries listed per bullet list before "and N more".
const LIST_LIMIT: usize = 12;

/// Well-known dependencies worth naming in the technology stack.
static FRAMEWORKS: phf::Map<&'static str, &'static str> = phf::phf_map! {
    "react" => "React",
    "vue" => "Vue",
    "svelte" => "Svelte",
    "next" => "Next.js",
    "@angular/core" => "Angular",
    "express" => "Express",
    "fastify" => "Fastify",
    "@nestjs/core" => "NestJS",
    "typescript" => "TypeScript",
    "jest" => "Jest",
    "vitest" => "Vitest",
    "django" => "Django",
    "flask" => "Flask",
    "fastapi" => "FastAPI",
    "sqlalchemy" => "SQLAlchemy",
    "pandas" => "pandas",
    "numpy" => "NumPy",
    "torch" => "PyTorch",
    "tensorflow" => "TensorFlow",
    "pytest" => "pytest",
    "spring-boot-starter-web" => "Spring Boot",
    "spring-boot-starter" => "Spring Boot",
    "junit" => "JUnit",
    "junit-jupiter" => "JUnit",
    "github.com/gin-gonic/gin" => "Gin",
    "github.com/labstack/echo/v4" => "Echo",
    "github.com/gofiber/fiber/v2" => "Fiber",
    "google.golang.org/grpc" => "gRPC",
    "tokio" => "Tokio",
    "axum" => "Axum",
    "actix-web" => "Actix Web",
    "serde" => "Serde",
    "clap" => "clap",
};

pub(super) fn sections(analysis: &ProjectAnalysis) -> Vec<Section> {
    SectionKind::ALL
        .iter()
        .map(|kind| match kind {
            SectionKind::ProjectOverview => overview(analysis),
            SectionKind::KeyFeatures => key_features(analysis),
            SectionKind::ProjectStructure => structure(analysis),
            SectionKind::TechnologyStack => technology_stack(analysis),
            SectionKind::Dependencies => dependencies(analysis),
            SectionKind::ImportantFiles => important_files(analysis),
            SectionKind::SetupAndInstallation => setup(analysis),
            SectionKind::UsageGuide => usage(analysis),
            SectionKind::DevelopmentGuidelines => development(analysis),
            SectionKind::KnownIssues => known_issues(analysis),
        })
        .collect()
}

fn overview(analysis: &ProjectAnalysis) -> Section {
    let mut body = String::new();
    let langs = analysis.languages_by_count();
    let _ = write!(
        body,
        "**{}** contains {} analyzed source file{}",
        analysis.project_name,
        analysis.records.len(),
        plural(analysis.records.len())
    );
    match langs.first() {
        Some((primary, _)) if langs.len() > 1 => {
            let _ = write!(body, " across {} languages, mostly {}.", langs.len(), primary);
        }
        Some((primary, _)) => {
            let _ = write!(body, " written in {primary}.");
        }
        None => body.push('.'),
    }
    let _ = write!(
        body,
        " Extraction found {} function{}, {} type{} and {} import{}.",
        analysis.totals.functions,
        plural(analysis.totals.functions),
        analysis.totals.types,
        plural(analysis.totals.types),
        analysis.totals.imports,
        plural(analysis.totals.imports)
    );

    if let Some(description) = root_manifests(analysis).find_map(|m| m.description.as_deref()) {
        let _ = write!(body, "\n\n{description}");
    }
    if let Some(paragraph) = analysis.readme_excerpt.as_deref().and_then(first_paragraph) {
        let _ = write!(body, "\n\nFrom the README:\n\n> {}", paragraph.replace('\n', "\n> "));
    }
    Section::populated(SectionKind::ProjectOverview, body)
}

fn key_features(analysis: &ProjectAnalysis) -> Section {
    let mut documented = Vec::new();
    for record in &analysis.records {
        let Some(data) = record.parsed() else {
            continue;
        };
        for function in &data.functions {
            if let Some(summary) = function.doc_comment.as_deref().and_then(|d| d.lines().next()) {
                documented.push(format!("- `{}` ({}): {}", function.name, record.path, summary.trim()));
            }
        }
    }

    let mut types: Vec<_> = analysis
        .records
        .iter()
        .filter_map(|r| r.parsed().map(|d| (r, d)))
        .flat_map(|(r, d)| d.types.iter().map(move |t| (r.path.as_str(), t)))
        .collect();
    types.sort_by(|a, b| {
        b.1.member_count
            .cmp(&a.1.member_count)
            .then_with(|| a.0.cmp(b.0))
            .then_with(|| a.1.name.cmp(&b.1.name))
    });

    if documented.is_empty() && types.is_empty() {
        return Section::placeholder(
            SectionKind::KeyFeatures,
            "No documented functions or type declarations were extracted.",
        );
    }

    let mut body = String::new();
    if !types.is_empty() {
        body.push_str("Core types:\n\n");
        let lines: Vec<String> = types
            .iter()
            .map(|(path, t)| {
                let bases = if t.base_names.is_empty() {
                    String::new()
                } else {
                    format!(", extends {}", t.base_names.join(", "))
                };
                format!("- {} `{}` in {} ({} member{}{})", t.kind, t.name, path, t.member_count, plural(t.member_count), bases)
            })
            .collect();
        push_list(&mut body, &lines);
    }
    if !documented.is_empty() {
        if !body.is_empty() {
            body.push('\n');
        }
        body.push_str("Documented functions:\n\n");
        push_list(&mut body, &documented);
    }
    Section::populated(SectionKind::KeyFeatures, body.trim_end())
}

fn structure(analysis: &ProjectAnalysis) -> Section {
    if analysis.files.is_empty() {
        return Section::placeholder(SectionKind::ProjectStructure, "No source files were analyzed.");
    }

    let mut dirs: BTreeMap<&str, (usize, BTreeSet<&str>)> = BTreeMap::new();
    for file in &analysis.files {
        let top = match file.path.split_once('/') {
            Some((dir, _)) => dir,
            None => ".",
        };
        let entry = dirs.entry(top).or_default();
        entry.0 += 1;
        entry.1.insert(file.language.as_str());
    }

    let mut body = String::from("| Directory | Files | Languages |\n|---|---|---|\n");
    for (dir, (count, langs)) in &dirs {
        let name = if *dir == "." { "(root)".to_string() } else { format!("{dir}/") };
        let langs: Vec<_> = langs.iter().copied().collect();
        let _ = writeln!(body, "| {} | {} | {} |", name, count, langs.join(", "));
    }

    body.push_str("\nExtraction fidelity:\n\n");
    for (tier, count) in &analysis.tiers {
        let _ = writeln!(body, "- {}: {} file{}", tier_label(*tier), count, plural(*count));
    }
    Section::populated(SectionKind::ProjectStructure, body.trim_end())
}

fn technology_stack(analysis: &ProjectAnalysis) -> Section {
    let langs = analysis.languages_by_count();
    if langs.is_empty() && analysis.manifests.is_empty() {
        return Section::placeholder(SectionKind::TechnologyStack, "No recognized languages or manifests were found.");
    }

    let mut body = String::new();
    if !langs.is_empty() {
        body.push_str("Languages:\n\n");
        for (language, count) in &langs {
            let _ = writeln!(body, "- {} ({} file{})", language, count, plural(*count));
        }
    }

    let frameworks: BTreeSet<&str> = analysis
        .dependencies
        .iter()
        .filter_map(|d| {
            let bare = d.name.rsplit(':').next().unwrap_or(&d.name);
            FRAMEWORKS.get(d.name.as_str()).or_else(|| FRAMEWORKS.get(bare)).copied()
        })
        .collect();
    if !frameworks.is_empty() {
        body.push_str("\nFrameworks and libraries:\n\n");
        for name in &frameworks {
            let _ = writeln!(body, "- {name}");
        }
    }

    let mut engines = BTreeMap::new();
    for manifest in &analysis.manifests {
        for (engine, version) in &manifest.engines {
            engines.entry(engine.as_str()).or_insert(version.as_str());
        }
    }
    if !engines.is_empty() {
        body.push_str("\nToolchain requirements:\n\n");
        for (engine, version) in &engines {
            let _ = writeln!(body, "- {engine} {version}");
        }
    }

    let formats: BTreeSet<&str> = analysis.manifests.iter().map(|m| m.format.as_str()).collect();
    if !formats.is_empty() {
        let formats: Vec<_> = formats.into_iter().collect();
        let _ = write!(body, "\nBuild manifests: {}", formats.join(", "));
    }
    Section::populated(SectionKind::TechnologyStack, body.trim())
}

fn dependencies(analysis: &ProjectAnalysis) -> Section {
    if analysis.dependencies.is_empty() {
        let hint = if analysis.manifests.is_empty() {
            "No dependency manifest was found."
        } else {
            "The manifests declare no dependencies."
        };
        return Section::placeholder(SectionKind::Dependencies, hint);
    }

    let mut grouped: BTreeMap<(&str, DependencyScope), Vec<String>> = BTreeMap::new();
    for dep in &analysis.dependencies {
        let entry = if dep.version_constraint.is_empty() {
            format!("- {}", dep.name)
        } else {
            format!("- {} `{}`", dep.name, dep.version_constraint)
        };
        grouped.entry((dep.manifest.as_str(), dep.scope)).or_default().push(entry);
    }

    let mut body = String::new();
    for ((manifest, scope), entries) in &grouped {
        let _ = writeln!(body, "**{}** ({}, {}):\n", manifest, scope, entries.len());
        for entry in entries {
            let _ = writeln!(body, "{entry}");
        }
        body.push('\n');
    }
    Section::populated(SectionKind::Dependencies, body.trim_end())
}

fn important_files(analysis: &ProjectAnalysis) -> Section {
    if analysis.important_files.is_empty() {
        return Section::placeholder(
            SectionKind::ImportantFiles,
            "No manifests, entry points or README were found.",
        );
    }
    let lines: Vec<String> = analysis
        .important_files
        .iter()
        .map(|f| format!("- `{}`: {}", f.path, f.reason))
        .collect();
    let mut body = lines.join("\n");

    if !analysis.largest_files.is_empty() {
        body.push_str("\n\nLargest source files:\n\n");
        let largest: Vec<String> = analysis
            .largest_files
            .iter()
            .map(|f| format!("- `{}` ({} bytes)", f.path, f.size))
            .collect();
        body.push_str(&largest.join("\n"));
    }
    Section::populated(SectionKind::ImportantFiles, body)
}

fn setup(analysis: &ProjectAnalysis) -> Section {
    if analysis.manifests.is_empty() {
        return Section::placeholder(
            SectionKind::SetupAndInstallation,
            "No dependency manifest was found, so no install steps could be derived.",
        );
    }

    let mut body = String::new();
    let mut engines = BTreeMap::new();
    for manifest in &analysis.manifests {
        for (engine, version) in &manifest.engines {
            engines.entry(engine.as_str()).or_insert(version.as_str());
        }
    }
    if !engines.is_empty() {
        body.push_str("Prerequisites:\n\n");
        for (engine, version) in &engines {
            let _ = writeln!(body, "- {engine} {version}");
        }
        body.push('\n');
    }

    body.push_str("Install dependencies:\n\n```sh\n");
    for manifest in &analysis.manifests {
        let _ = writeln!(body, "{}", install_command(manifest));
    }
    body.push_str("```");
    Section::populated(SectionKind::SetupAndInstallation, body)
}

fn usage(analysis: &ProjectAnalysis) -> Section {
    let mut commands = Vec::new();
    for manifest in &analysis.manifests {
        for (name, target) in &manifest.scripts {
            let command = match manifest.format.as_str() {
                "package.json" if name == "start" || name == "test" => format!("npm {name}"),
                "package.json" => format!("npm run {name}"),
                "Pipfile" => format!("pipenv run {name}"),
                "Cargo.toml" => target.clone(),
                _ => name.clone(),
            };
            commands.push(format!("- `{}`: {}", in_dir(&manifest.path, &command), target));
        }
    }
    for file in &analysis.files {
        if !is_entry_point(&file.language, &file.path) {
            continue;
        }
        if let Some(command) = run_command(&file.language, &file.path) {
            commands.push(format!("- `{}`: entry point `{}`", command, file.path));
        }
    }

    if commands.is_empty() {
        return Section::placeholder(SectionKind::UsageGuide, "No scripts or entry points were found.");
    }
    let mut body = String::from("Available commands:\n\n");
    push_list(&mut body, &commands);
    Section::populated(SectionKind::UsageGuide, body.trim_end())
}

fn development(analysis: &ProjectAnalysis) -> Section {
    if analysis.records.is_empty() {
        return Section::placeholder(SectionKind::DevelopmentGuidelines, "No source files were analyzed.");
    }

    let mut body = String::new();
    let tests: Vec<String> = analysis
        .files
        .iter()
        .filter(|f| is_test_path(&f.path))
        .map(|f| format!("- `{}`", f.path))
        .collect();
    if tests.is_empty() {
        body.push_str("No test files were found; consider adding tests alongside the sources.\n\n");
    } else {
        let _ = writeln!(body, "Test files ({}):\n", tests.len());
        push_list(&mut body, &tests);
        body.push('\n');
    }

    let dev_deps: Vec<&str> = analysis
        .dependencies
        .iter()
        .filter(|d| d.scope == DependencyScope::Dev)
        .map(|d| d.name.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if !dev_deps.is_empty() {
        let _ = writeln!(body, "Development tooling: {}\n", dev_deps.join(", "));
    }

    let (documented, total) = analysis
        .records
        .iter()
        .filter_map(|r| r.parsed())
        .flat_map(|d| d.functions.iter())
        .fold((0usize, 0usize), |(doc, all), f| (doc + usize::from(f.doc_comment.is_some()), all + 1));
    if total > 0 {
        let _ = writeln!(
            body,
            "Documentation: {documented} of {total} functions ({}%) carry a doc comment.",
            documented * 100 / total
        );
    }

    let (relative, absolute) = analysis
        .records
        .iter()
        .filter_map(|r| r.parsed())
        .flat_map(|d| d.imports.iter())
        .fold((0usize, 0usize), |(rel, abs), i| if i.is_relative { (rel + 1, abs) } else { (rel, abs + 1) });
    if relative + absolute > 0 {
        let _ = writeln!(body, "Imports: {absolute} external or absolute, {relative} relative.");
    }
    Section::populated(SectionKind::DevelopmentGuidelines, body.trim_end())
}

fn known_issues(analysis: &ProjectAnalysis) -> Section {
    let mut body = String::new();

    let problems: Vec<String> = analysis
        .records
        .iter()
        .filter_map(|r| match &r.outcome {
            ExtractionOutcome::Complete => None,
            ExtractionOutcome::Partial(err) => Some(format!("- `{}` (partial): {}", r.path, err)),
            ExtractionOutcome::Failed(err) => Some(format!("- `{}`: {}", r.path, err)),
        })
        .collect();
    if !problems.is_empty() {
        let _ = writeln!(body, "Files that could not be fully analyzed:\n");
        push_list(&mut body, &problems);
        body.push('\n');
    }

    if !analysis.warnings.is_empty() {
        body.push_str("Warnings:\n\n");
        let warnings: Vec<String> = analysis.warnings.iter().map(|w| format!("- {w}")).collect();
        push_list(&mut body, &warnings);
        body.push('\n');
    }

    for cause in &analysis.truncation_causes {
        let line = match cause {
            TruncationCause::FileCapExceeded => format!(
                "The file cap was reached; {} eligible file{} were not analyzed.",
                analysis.exclusions.over_file_cap,
                plural(analysis.exclusions.over_file_cap)
            ),
            TruncationCause::Cancelled => "The run was cancelled before every file was analyzed.".to_string(),
        };
        let _ = writeln!(body, "{line}\n");
    }

    let ex = &analysis.exclusions;
    if ex.too_large > 0 {
        let _ = writeln!(body, "{} file{} exceeded the size limit and were skipped.\n", ex.too_large, plural(ex.too_large));
    }

    if body.is_empty() {
        return Section::placeholder(
            SectionKind::KnownIssues,
            "No extraction failures, warnings or truncation were recorded.",
        );
    }
    Section::populated(SectionKind::KnownIssues, body.trim_end())
}

fn root_manifests(analysis: &ProjectAnalysis) -> impl Iterator<Item = &ManifestSummary> {
    analysis.manifests.iter().filter(|m| !m.path.contains('/'))
}

fn install_command(manifest: &ManifestSummary) -> String {
    let file = manifest.path.rsplit('/').next().unwrap_or(&manifest.path);
    let command = match manifest.format.as_str() {
        "package.json" => "npm install".to_string(),
        "requirements.txt" => format!("pip install -r {file}"),
        "pyproject.toml" => "pip install -e .".to_string(),
        "Pipfile" => "pipenv install --dev".to_string(),
        "pom.xml" => "mvn install".to_string(),
        "Cargo.toml" => "cargo build".to_string(),
        "go.mod" => "go mod download".to_string(),
        other => format!("# see {other}"),
    };
    in_dir(&manifest.path, &command)
}

/// Prefix `command` with a `cd` into the directory of `path`, if nested.
fn in_dir(path: &str, command: &str) -> String {
    match path.rsplit_once('/') {
        Some((dir, _)) => format!("(cd {dir} && {command})"),
        None => command.to_string(),
    }
}

fn run_command(language: &str, path: &str) -> Option<String> {
    let dir = path.rsplit_once('/').map_or(".", |(dir, _)| dir);
    match language {
        "python" => Some(format!("python {path}")),
        "javascript" => Some(format!("node {path}")),
        "typescript" => Some(format!("npx ts-node {path}")),
        "go" if dir == "." => Some("go run .".to_string()),
        "go" => Some(format!("go run ./{dir}")),
        "rust" if path.ends_with("main.rs") => Some("cargo run".to_string()),
        _ => None,
    }
}

fn is_test_path(path: &str) -> bool {
    let name = path.rsplit('/').next().unwrap_or(path);
    let in_test_dir = path
        .split('/')
        .rev()
        .skip(1)
        .any(|seg| matches!(seg, "test" | "tests" | "__tests__" | "spec"));
    in_test_dir
        || name.starts_with("test_")
        || name.ends_with("_test.go")
        || name.ends_with("_test.py")
        || name.contains(".test.")
        || name.contains(".spec.")
        || name.ends_with("Test.java")
}

fn tier_label(tier: FidelityTier) -> &'static str {
    match tier {
        FidelityTier::ExactParse => "full syntax parse",
        FidelityTier::PatternParse => "pattern-based parse",
        FidelityTier::BasicDetect => "line and keyword counts only",
    }
}

fn first_paragraph(text: &str) -> Option<String> {
    text.split("\n\n")
        .map(str::trim)
        .find(|p| !p.is_empty() && !p.starts_with('#') && !p.starts_with("[!") && !p.starts_with("!["))
        .map(str::to_string)
}

fn push_list(body: &mut String, lines: &[String]) {
    for line in lines.iter().take(LIST_LIMIT) {
        let _ = writeln!(body, "{line}");
    }
    if lines.len() > LIST_LIMIT {
        let _ = writeln!(body, "- ...and {} more", lines.len() - LIST_LIMIT);
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{PartialAggregate, RunFacts};
    use crate::classify::SourceFile;
    use crate::extract::{extract_source, ExtractionRecord};
    use crate::config::AnalysisConfig;
    use crate::manifest::parse_manifest;
    use crate::report::{SectionStatus, NOT_DETECTED};

    fn record(path: &str, language: &str, tier: FidelityTier, source: &str) -> (SourceFile, ExtractionRecord) {
        let file = SourceFile {
            path: path.to_string(),
            language: language.to_string(),
            size: source.len() as u64,
            tier,
        };
        let record = extract_source(&file, source, &AnalysisConfig::default());
        (file, record)
    }

    fn analysis(items: Vec<(SourceFile, ExtractionRecord)>, run: RunFacts) -> ProjectAnalysis {
        items
            .into_iter()
            .fold(PartialAggregate::new(), |acc, (f, r)| acc.add(f, r))
            .finalize(run)
    }

    #[test]
    fn test_lone_file_without_manifest() {
        let a = analysis(
            vec![record("tool.py", "python", FidelityTier::ExactParse, "def run():\n    pass\n")],
            RunFacts {
                root_name: "tool".to_string(),
                important_files_cap: 15,
                ..Default::default()
            },
        );
        let sections = sections(&a);
        assert_eq!(sections.len(), 10);

        let deps = &sections[4];
        assert_eq!(deps.kind, SectionKind::Dependencies);
        assert_eq!(deps.status, SectionStatus::Placeholder);
        assert!(deps.body.starts_with(NOT_DETECTED));
        let setup = &sections[6];
        assert_eq!(setup.kind, SectionKind::SetupAndInstallation);
        assert!(setup.is_placeholder());

        assert!(sections[0].body.contains("**tool** contains 1 analyzed source file written in python."));
        assert!(!sections[2].is_placeholder());
    }

    #[test]
    fn test_manifest_driven_sections() {
        let pkg = parse_manifest(
            "package.json",
            r#"{"name": "shop", "description": "Web shop", "scripts": {"start": "node index.js", "build": "tsc"},
                "engines": {"node": ">=18"},
                "dependencies": {"react": "^18.0.0", "express": "^4"}, "devDependencies": {"jest": "^29.0.0"}}"#,
        )
        .unwrap();
        let a = analysis(
            vec![
                record(
                    "index.js",
                    "javascript",
                    FidelityTier::PatternParse,
                    "/** Start the server. */\nfunction start(port) {}\n",
                ),
                record("src/cart.test.js", "javascript", FidelityTier::PatternParse, "test('x', () => {});\n"),
            ],
            RunFacts {
                root_name: "dir".to_string(),
                manifest_paths: vec!["package.json".to_string()],
                manifests: vec![pkg],
                important_files_cap: 15,
                ..Default::default()
            },
        );
        let s = sections(&a);

        assert!(s[0].body.contains("**shop**"));
        assert!(s[0].body.contains("Web shop"));
        assert!(s[1].body.contains("- `start` (index.js): Start the server."));
        assert!(s[3].body.contains("- React"));
        assert!(s[3].body.contains("- node >=18"));
        assert!(s[4].body.contains("**package.json** (runtime, 2):"));
        assert!(s[4].body.contains("- jest `^29.0.0`"));
        assert!(s[6].body.contains("npm install"));
        assert!(s[7].body.contains("- `npm start`: node index.js"));
        assert!(s[7].body.contains("- `npm run build`: tsc"));
        assert!(s[7].body.contains("- `node index.js`: entry point `index.js`"));
        assert!(s[8].body.contains("- `src/cart.test.js`"));
        assert!(s[8].body.contains("Development tooling: jest"));
        assert!(s[9].is_placeholder());
    }

    #[test]
    fn test_known_issues_lists_failures() {
        let a = analysis(
            vec![
                record("ok.py", "python", FidelityTier::ExactParse, "def a():\n    pass\n"),
                record("bad.py", "python", FidelityTier::ExactParse, "def broken(:\n    pass\n"),
            ],
            RunFacts {
                root_name: "p".to_string(),
                important_files_cap: 15,
                ..Default::default()
            },
        );
        let issues = &sections(&a)[9];
        assert!(!issues.is_placeholder());
        assert!(issues.body.contains("- `bad.py`: syntax error"));
    }

    #[test]
    fn test_helpers() {
        assert!(is_test_path("tests/test_api.py"));
        assert!(is_test_path("pkg/server_test.go"));
        assert!(is_test_path("src/__tests__/app.js"));
        assert!(!is_test_path("src/testing_utils.py"));
        assert_eq!(in_dir("web/package.json", "npm install"), "(cd web && npm install)");
        assert_eq!(run_command("go", "cmd/api/main.go").as_deref(), Some("go run ./cmd/api"));
        assert_eq!(
            first_paragraph("# Title\n\n![badge](x)\n\nReal text\nmore.\n\nNext").as_deref(),
            Some("Real text\nmore.")
        );
    }
}
