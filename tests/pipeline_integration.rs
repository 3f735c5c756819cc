//! End-to-end tests for the analysis pipeline.
//!
//! Each test builds a small tree in a temp dir (or uses testdata/sample_repo)
//! and checks the resulting ProjectAnalysis.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

use repolens::extract::FailureReason;
use repolens::report::render;
use repolens::{
    analyze, AnalysisConfig, CancellationToken, DependencyScope, Ecosystem, FidelityTier, ImportanceReason, Pipeline,
    PipelineError, TruncationCause, WarningKind,
};
use tempfile::TempDir;

fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[test]
fn test_syntax_error_fails_only_its_file() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "a.py", "def one():\n    pass\n\ndef two(x):\n    return x\n");
    write(temp.path(), "b.py", "def three():\n    return 3\n");
    write(temp.path(), "c.py", "def broken(:\n    pass\n");

    let analysis = analyze(temp.path(), AnalysisConfig::default()).expect("analysis should succeed");

    assert_eq!(analysis.records.len(), 3);
    assert_eq!(analysis.totals.functions, 3);
    assert_eq!(analysis.totals.files_failed, 1);

    let failed: Vec<_> = analysis.failures().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].path, "c.py");
    assert_eq!(failed[0].error().map(|e| e.reason), Some(FailureReason::SyntaxError));
    assert_eq!(failed[0].function_count(), 0);

    assert_eq!(analysis.record("a.py").map(|r| r.function_count()), Some(2));
    assert_eq!(analysis.record("b.py").map(|r| r.function_count()), Some(1));
}

#[test]
fn test_npm_manifest_scopes() {
    let temp = TempDir::new().unwrap();
    write(
        temp.path(),
        "package.json",
        r#"{"dependencies": {"react": "^18.0.0"}, "devDependencies": {"jest": "^29.0.0"}}"#,
    );
    write(temp.path(), "index.js", "function main() {}\n");

    let analysis = analyze(temp.path(), AnalysisConfig::default()).unwrap();

    assert_eq!(analysis.dependencies.len(), 2);
    assert!(analysis.dependencies.iter().all(|d| d.ecosystem == Ecosystem::Npm));
    let react = analysis.dependencies.iter().find(|d| d.name == "react").unwrap();
    assert_eq!(react.scope, DependencyScope::Runtime);
    assert_eq!(react.version_constraint, "^18.0.0");
    let jest = analysis.dependencies.iter().find(|d| d.name == "jest").unwrap();
    assert_eq!(jest.scope, DependencyScope::Dev);
    assert!(analysis.warnings.is_empty());
}

#[test]
fn test_file_cap_truncates() {
    let temp = TempDir::new().unwrap();
    for i in 0..250 {
        write(temp.path(), &format!("mod_{i:03}.py"), "x = 1\n");
    }
    let config = AnalysisConfig {
        max_files: 200,
        ..AnalysisConfig::default()
    };

    let analysis = analyze(temp.path(), config).unwrap();

    assert_eq!(analysis.records.len(), 200);
    assert!(analysis.truncated);
    assert!(analysis.truncated_by(TruncationCause::FileCapExceeded));
    assert!(!analysis.truncated_by(TruncationCause::Cancelled));
    assert_eq!(analysis.exclusions.over_file_cap, 50);
    // the surviving set is the first 200 paths in sorted order
    assert_eq!(analysis.records.last().map(|r| r.path.as_str()), Some("mod_199.py"));
}

#[test]
fn test_size_limit_is_inclusive() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "exact.py", &format!("#{}", "x".repeat(19)));
    write(temp.path(), "over.py", &format!("#{}", "x".repeat(20)));
    let config = AnalysisConfig {
        max_file_bytes: 20,
        ..AnalysisConfig::default()
    };

    let analysis = analyze(temp.path(), config).unwrap();

    let paths: Vec<_> = analysis.records.iter().map(|r| r.path.as_str()).collect();
    assert_eq!(paths, vec!["exact.py"]);
    assert_eq!(analysis.exclusions.too_large, 1);
    assert!(!analysis.truncated);
}

#[test]
fn test_totals_equal_sum_of_records() {
    let analysis = analyze(testdata_path().join("sample_repo"), AnalysisConfig::default()).unwrap();

    let functions: usize = analysis.records.iter().map(|r| r.function_count()).sum();
    let types: usize = analysis.records.iter().map(|r| r.type_count()).sum();
    let imports: usize = analysis.records.iter().map(|r| r.import_count()).sum();
    assert_eq!(analysis.totals.functions, functions);
    assert_eq!(analysis.totals.types, types);
    assert_eq!(analysis.totals.imports, imports);
    assert_eq!(analysis.totals.files(), analysis.records.len());
    assert_eq!(analysis.languages.values().sum::<usize>(), analysis.records.len());
    assert_eq!(analysis.tiers.values().sum::<usize>(), analysis.records.len());
}

#[test]
fn test_sample_repo() {
    let analysis = analyze(testdata_path().join("sample_repo"), AnalysisConfig::default()).unwrap();

    assert_eq!(analysis.project_name, "sample-service");
    let paths: Vec<_> = analysis.records.iter().map(|r| r.path.as_str()).collect();
    assert_eq!(
        paths,
        vec!["cmd/tool/main.go", "lib/helpers.py", "src/greeting.js", "src/server.js"]
    );
    assert_eq!(analysis.exclusions.unsupported_extension, 1);

    assert_eq!(analysis.languages.get("javascript"), Some(&2));
    assert_eq!(analysis.languages.get("python"), Some(&1));
    assert_eq!(analysis.languages.get("go"), Some(&1));
    assert_eq!(analysis.tiers.get(&FidelityTier::ExactParse), Some(&2));
    assert_eq!(analysis.tiers.get(&FidelityTier::PatternParse), Some(&2));

    let go = analysis.record("cmd/tool/main.go").unwrap();
    assert!(!go.is_failed());
    assert_eq!(go.function_count(), 1);
    assert_eq!(go.import_count(), 1);

    let helpers = analysis.record("lib/helpers.py").unwrap();
    assert_eq!(helpers.type_count(), 1);
    assert!(helpers.function_count() >= 2);

    let names: Vec<_> = analysis.dependencies.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["express", "mocha"]);
    assert_eq!(analysis.manifests.len(), 1);
    assert_eq!(analysis.manifests[0].scripts.get("start").map(String::as_str), Some("node src/server.js"));

    assert_eq!(analysis.important_files[0].path, "package.json");
    assert_eq!(analysis.important_files[0].reason, ImportanceReason::Manifest);
    assert!(analysis
        .important_files
        .iter()
        .any(|f| f.path == "src/server.js" && f.reason == ImportanceReason::EntryPoint));
    assert!(analysis
        .readme_excerpt
        .as_deref()
        .is_some_and(|r| r.starts_with("# Sample Service")));
}

#[test]
fn test_repeated_runs_are_identical() {
    let root = testdata_path().join("sample_repo");
    let first = analyze(&root, AnalysisConfig::default()).unwrap();
    let second = analyze(&root, AnalysisConfig::default()).unwrap();

    assert_eq!(render::to_json(&first).unwrap(), render::to_json(&second).unwrap());

    let synthesizer = repolens::ReportSynthesizer::structured();
    let md_first = render::to_markdown(&synthesizer.synthesize(&first));
    let md_second = render::to_markdown(&synthesizer.synthesize(&second));
    assert_eq!(md_first, md_second);
}

#[test]
fn test_creation_order_does_not_matter() {
    let files: Vec<(String, String)> = (0..30)
        .map(|i| {
            (
                format!("pkg{}/m{i}.py", i % 4),
                format!("import os\n\ndef f{i}():\n    return {i}\n"),
            )
        })
        .collect();

    let forward = TempDir::new().unwrap();
    let backward = TempDir::new().unwrap();
    let forward_root = forward.path().join("proj");
    let backward_root = backward.path().join("proj");
    for (rel, content) in &files {
        write(&forward_root, rel, content);
    }
    for (rel, content) in files.iter().rev() {
        write(&backward_root, rel, content);
    }

    let a = analyze(&forward_root, AnalysisConfig::default()).unwrap();
    let b = analyze(&backward_root, AnalysisConfig { workers: 3, ..AnalysisConfig::default() }).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.totals.functions, 30);
}

#[test]
fn test_malformed_manifest_is_a_warning() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "package.json", "{ not json");
    write(temp.path(), "app.py", "def run():\n    pass\n");

    let analysis = analyze(temp.path(), AnalysisConfig::default()).unwrap();

    assert!(analysis.dependencies.is_empty());
    assert_eq!(analysis.warnings.len(), 1);
    assert_eq!(analysis.warnings[0].kind, WarningKind::Manifest);
    assert_eq!(analysis.warnings[0].path.as_deref(), Some("package.json"));
    assert_eq!(analysis.totals.functions, 1);
}

#[test]
fn test_excluded_paths_are_skipped() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "src/app.py", "def run():\n    pass\n");
    write(temp.path(), "generated/lib.py", "def other():\n    pass\n");
    let config = AnalysisConfig {
        excluded_paths: vec!["generated/**".to_string()],
        ..AnalysisConfig::default()
    };

    let analysis = analyze(temp.path(), config).unwrap();

    let paths: Vec<_> = analysis.records.iter().map(|r| r.path.as_str()).collect();
    assert_eq!(paths, vec!["src/app.py"]);
    assert_eq!(analysis.exclusions.excluded_by_pattern, 1);
}

#[test]
fn test_empty_directory() {
    let temp = TempDir::new().unwrap();

    let analysis = analyze(temp.path(), AnalysisConfig::default()).unwrap();

    assert!(analysis.records.is_empty());
    assert!(analysis.dependencies.is_empty());
    assert!(!analysis.truncated);
    assert_eq!(analysis.totals.functions, 0);
}

#[test]
fn test_unreadable_root_is_fatal() {
    let temp = TempDir::new().unwrap();
    let result = analyze(temp.path().join("missing"), AnalysisConfig::default());
    assert!(matches!(result, Err(PipelineError::RootUnreadable { .. })));
}

#[test]
fn test_cancellation_marks_truncation() {
    let temp = TempDir::new().unwrap();
    for i in 0..300 {
        write(temp.path(), &format!("m{i:03}.py"), &format!("def f{i}():\n    pass\n"));
    }
    let config = AnalysisConfig {
        max_files: 1000,
        workers: 2,
        ..AnalysisConfig::default()
    };
    let pipeline = Pipeline::new(temp.path(), config);
    let token: CancellationToken = pipeline.cancellation_token();

    let canceller = thread::spawn(move || token.cancel());
    let analysis = pipeline.run().unwrap();
    canceller.join().unwrap();

    // how far the run got depends on scheduling
    assert!(analysis.records.len() <= 300);
    assert_eq!(analysis.totals.functions, analysis.records.len());
    if analysis.records.len() < 300 {
        assert!(analysis.truncated_by(TruncationCause::Cancelled));
    } else {
        assert!(!analysis.truncated);
    }
}
