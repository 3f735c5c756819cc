//! Command-line interface for repolens.

use std::fs;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::{self, AnalysisConfig};
use crate::pipeline::Pipeline;
use crate::report::generator::OpenAiGenerator;
use crate::report::{render, ReportSynthesizer};

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_ERROR: i32 = 2;

/// Output formats accepted by `--format`.
const FORMATS: &[&str] = &["markdown", "json", "analysis"];

/// Commented default configuration written by `init`.
const DEFAULT_CONFIG: &str = include_str!("templates/default.yaml");

/// Polyglot repository analysis and documentation synthesis.
///
/// repolens walks a source tree, extracts functions, types and imports per
/// language, parses dependency manifests, and writes a ten-section project
/// report. Structured reports are built from the analysis alone; Enhanced
/// reports delegate the prose to an OpenAI-compatible endpoint.
#[derive(Parser)]
#[command(name = "repolens")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log debug output to stderr (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a directory and write a report
    Analyze(AnalyzeArgs),
    /// Write a commented default configuration file
    Init(InitArgs),
}

/// Arguments for the analyze command.
#[derive(Parser)]
pub struct AnalyzeArgs {
    /// Directory to analyze
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Path to config YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format: markdown, json (the report) or analysis (the raw analysis as JSON)
    #[arg(short, long, default_value = "markdown")]
    pub format: String,

    /// Write output to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Maximum number of source files to analyze
    #[arg(long)]
    pub max_files: Option<usize>,

    /// Skip files larger than this many bytes
    #[arg(long)]
    pub max_file_bytes: Option<u64>,

    /// Extraction worker threads (0 = one per core)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Generate report prose with the configured text generation endpoint
    #[arg(long)]
    pub enhanced: bool,

    /// API key for Enhanced reports
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Model for Enhanced reports
    #[arg(long)]
    pub model: Option<String>,

    /// Timeout in seconds for the generation request
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Do not print the summary or progress to stderr
    #[arg(short, long)]
    pub quiet: bool,
}

/// Arguments for the init command.
#[derive(Parser)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = "repolens.yaml")]
    pub output: PathBuf,

    /// Write to the per-user configuration directory instead
    #[arg(long, conflicts_with = "output")]
    pub user: bool,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

/// Load the config and apply command-line overrides.
fn load_config(args: &AnalyzeArgs) -> anyhow::Result<AnalysisConfig> {
    let cwd = std::env::current_dir()?;
    let (mut config, source) = AnalysisConfig::discover(args.config.as_deref(), &cwd)?;
    match &source {
        Some(path) => tracing::info!(path = %path.display(), "loaded config"),
        None => tracing::debug!("no config file found, using defaults"),
    }

    if let Some(max_files) = args.max_files {
        config.max_files = max_files;
    }
    if let Some(max_file_bytes) = args.max_file_bytes {
        config.max_file_bytes = max_file_bytes;
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if args.enhanced {
        config.enhanced.enabled = true;
    }
    if let Some(model) = &args.model {
        config.enhanced.model = model.clone();
    }
    if let Some(timeout) = args.timeout {
        config.enhanced.timeout_secs = timeout;
    }
    config.validate()?;
    Ok(config)
}

fn progress_bar(quiet: bool) -> ProgressBar {
    if quiet || !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::with_template("  {spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} files") {
        bar.set_style(style.progress_chars("=> "));
    }
    bar
}

/// Run the analyze command.
pub fn run_analyze(args: &AnalyzeArgs) -> anyhow::Result<i32> {
    if !FORMATS.contains(&args.format.as_str()) {
        eprintln!(
            "Error: invalid format {:?}, must be one of {}",
            args.format,
            FORMATS.join(", ")
        );
        return Ok(EXIT_ERROR);
    }

    let config = match load_config(args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: invalid configuration: {}", e);
            eprintln!("Run 'repolens init' to create a config file");
            return Ok(EXIT_ERROR);
        }
    };

    let pipeline = Pipeline::new(&args.path, config.clone()).with_progress(progress_bar(args.quiet));
    let analysis = match pipeline.run() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(EXIT_ERROR);
        }
    };

    let synthesizer = if config.enhanced.enabled {
        let generator = OpenAiGenerator::new(config.enhanced.endpoint.clone(), args.api_key.clone());
        ReportSynthesizer::enhanced(
            Box::new(generator),
            config.enhanced.budget(),
            config.enhanced.context_budget_chars,
        )
    } else {
        ReportSynthesizer::structured()
    };

    // the raw analysis needs no report, and no generator call
    let (output, report) = if args.format == "analysis" {
        (render::to_json(&analysis)?, None)
    } else {
        let report = synthesizer.synthesize(&analysis);
        let output = match args.format.as_str() {
            "json" => render::to_json(&report)?,
            _ => render::to_markdown(&report),
        };
        (output, Some(report))
    };

    match &args.output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, &output)?;
        }
        None => print!("{}", output),
    }

    if !args.quiet {
        let report = report.unwrap_or_else(|| ReportSynthesizer::structured().synthesize(&analysis));
        render::write_summary(&args.path.to_string_lossy(), &analysis, &report);
        if let Some(path) = &args.output {
            eprintln!("  Wrote {}", path.display());
            eprintln!();
        }
    }

    Ok(EXIT_SUCCESS)
}

/// Run the init command.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    let output = if args.user {
        match config::user_config_path() {
            Some(path) => path,
            None => {
                eprintln!("Error: no per-user configuration directory on this platform");
                return Ok(EXIT_ERROR);
            }
        }
    } else {
        args.output.clone()
    };

    if output.exists() && !args.force {
        eprintln!("Error: file already exists: {}", output.display());
        eprintln!("Remove it, use --force, or use --output to specify a different path");
        return Ok(EXIT_ERROR);
    }

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() && parent != Path::new(".") {
            if let Err(e) = fs::create_dir_all(parent) {
                eprintln!("Error: failed to create directory: {}", e);
                return Ok(EXIT_ERROR);
            }
        }
    }

    if let Err(e) = fs::write(&output, DEFAULT_CONFIG) {
        eprintln!("Error: failed to write config: {}", e);
        return Ok(EXIT_ERROR);
    }

    println!("Created {}", output.display());
    println!();
    println!("Next steps:");
    println!("  1. Edit {} to customize limits and exclusions", output.display());
    println!("  2. Run: repolens analyze . --config {}", output.display());

    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn analyze_args(path: &Path) -> AnalyzeArgs {
        AnalyzeArgs {
            path: path.to_path_buf(),
            config: None,
            format: "markdown".to_string(),
            output: None,
            max_files: None,
            max_file_bytes: None,
            workers: None,
            enhanced: false,
            api_key: None,
            model: None,
            timeout: None,
            quiet: true,
        }
    }

    #[test]
    fn test_cli_parses_analyze_flags() {
        let cli = Cli::try_parse_from([
            "repolens",
            "analyze",
            "src",
            "--format",
            "json",
            "--max-files",
            "50",
            "--enhanced",
            "--model",
            "gpt-4o",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Analyze(args) => {
                assert_eq!(args.path, PathBuf::from("src"));
                assert_eq!(args.format, "json");
                assert_eq!(args.max_files, Some(50));
                assert!(args.enhanced);
                assert_eq!(args.model.as_deref(), Some("gpt-4o"));
            }
            Commands::Init(_) => panic!("expected analyze"),
        }
    }

    #[test]
    fn test_invalid_format_is_error() {
        let temp = TempDir::new().unwrap();
        let args = AnalyzeArgs {
            format: "html".to_string(),
            ..analyze_args(temp.path())
        };
        assert_eq!(run_analyze(&args).unwrap(), EXIT_ERROR);
    }

    #[test]
    fn test_missing_root_is_error() {
        let temp = TempDir::new().unwrap();
        let args = AnalyzeArgs {
            config: Some(write_config(temp.path(), "max_files: 10\n")),
            ..analyze_args(&temp.path().join("missing"))
        };
        assert_eq!(run_analyze(&args).unwrap(), EXIT_ERROR);
    }

    #[test]
    fn test_analyze_writes_output_file() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("main.py"), "def main():\n    pass\n").unwrap();
        let out = temp.path().join("out/report.md");
        let args = AnalyzeArgs {
            config: Some(write_config(temp.path(), "max_files: 10\n")),
            output: Some(out.clone()),
            ..analyze_args(temp.path())
        };
        assert_eq!(run_analyze(&args).unwrap(), EXIT_SUCCESS);
        let written = fs::read_to_string(out).unwrap();
        assert!(written.contains("## Project Overview"));
        assert!(written.contains("## Known Issues & Future Improvements"));
    }

    #[test]
    fn test_zero_max_files_flag_is_rejected() {
        let temp = TempDir::new().unwrap();
        let args = AnalyzeArgs {
            config: Some(write_config(temp.path(), "workers: 1\n")),
            max_files: Some(0),
            ..analyze_args(temp.path())
        };
        assert_eq!(run_analyze(&args).unwrap(), EXIT_ERROR);
    }

    #[test]
    fn test_init_writes_template_once() {
        let temp = TempDir::new().unwrap();
        let output = temp.path().join("repolens.yaml");
        let args = InitArgs {
            output: output.clone(),
            user: false,
            force: false,
        };
        assert_eq!(run_init(&args).unwrap(), EXIT_SUCCESS);
        assert!(AnalysisConfig::parse_file(&output).is_ok());
        assert_eq!(run_init(&args).unwrap(), EXIT_ERROR);

        let forced = InitArgs { force: true, ..args };
        assert_eq!(run_init(&forced).unwrap(), EXIT_SUCCESS);
    }

    fn write_config(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join("test-config.yaml");
        fs::write(&path, content).unwrap();
        path
    }
}
