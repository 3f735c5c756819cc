//! Analysis configuration.
//!
//! The configuration is a YAML file. Every field has a default, so an empty
//! file (or no file at all) is a valid configuration.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classify::{FidelityTier, LanguageMapping};
use crate::extract::{exact, pattern};
use crate::report::generator::GenerationBudget;

/// File names searched for in the working directory, in order.
pub const CONFIG_FILE_NAMES: &[&str] = &["repolens.yaml", ".repolens.yaml"];

pub const DEFAULT_MAX_FILE_BYTES: u64 = 1024 * 1024;
pub const DEFAULT_MAX_FILES: usize = 200;
pub const DEFAULT_MAX_LINE_BYTES: usize = 4096;
pub const DEFAULT_IMPORTANT_FILES_CAP: usize = 15;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("extension {extension:?} maps {language} to {tier}, but no {tier} extractor exists for {language}")]
    UnsupportedTier {
        extension: String,
        language: String,
        tier: FidelityTier,
    },
    #[error("invalid excluded_paths pattern {pattern:?}: {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },
    #[error("{0} must be greater than zero")]
    ZeroLimit(&'static str),
}

/// Top-level configuration for one analysis run.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Files larger than this are excluded as too large.
    pub max_file_bytes: u64,
    /// Maximum number of eligible source files analyzed per run.
    pub max_files: usize,
    /// PatternParse skips lines longer than this.
    pub max_line_bytes: usize,
    /// Worker threads for extraction. 0 picks one per core.
    pub workers: usize,
    pub important_files_cap: usize,
    /// Extension (without dot) to language/tier overrides, merged over the
    /// built-in table.
    pub extensions: BTreeMap<String, LanguageMapping>,
    /// Glob patterns for paths to exclude (e.g. "**/docs/**").
    pub excluded_paths: Vec<String>,
    pub enhanced: EnhancedConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            max_files: DEFAULT_MAX_FILES,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            workers: 0,
            important_files_cap: DEFAULT_IMPORTANT_FILES_CAP,
            extensions: BTreeMap::new(),
            excluded_paths: Vec::new(),
            enhanced: EnhancedConfig::default(),
        }
    }
}

/// Settings for Enhanced report synthesis.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EnhancedConfig {
    pub enabled: bool,
    /// OpenAI-compatible chat completions endpoint.
    pub endpoint: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
    /// Upper bound on the size of the prompt context, in characters.
    pub context_budget_chars: usize,
}

impl Default for EnhancedConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 4000,
            temperature: 0.3,
            timeout_secs: 60,
            context_budget_chars: 24_000,
        }
    }
}

impl EnhancedConfig {
    pub fn budget(&self) -> GenerationBudget {
        GenerationBudget {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

impl AnalysisConfig {
    /// Parse and validate a configuration from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: AnalysisConfig =
            serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
                path: path.display().to_string(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load the configuration following the discovery order: an explicit
    /// path, a config file in `cwd`, the per-user config file, then defaults.
    pub fn discover(explicit: Option<&Path>, cwd: &Path) -> Result<(Self, Option<PathBuf>), ConfigError> {
        if let Some(path) = explicit {
            return Ok((Self::parse_file(path)?, Some(path.to_path_buf())));
        }
        let candidates = CONFIG_FILE_NAMES
            .iter()
            .map(|name| cwd.join(name))
            .chain(user_config_path());
        for candidate in candidates {
            if candidate.is_file() {
                tracing::debug!(path = %candidate.display(), "using config file");
                return Ok((Self::parse_file(&candidate)?, Some(candidate)));
            }
        }
        Ok((Self::default(), None))
    }

    /// Check limits, exclusion globs, and that every tier override has an
    /// extractor behind it.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_files == 0 {
            return Err(ConfigError::ZeroLimit("max_files"));
        }
        if self.max_line_bytes == 0 {
            return Err(ConfigError::ZeroLimit("max_line_bytes"));
        }

        for (extension, mapping) in &self.extensions {
            let available = match mapping.tier {
                FidelityTier::ExactParse => exact::has_grammar(&mapping.language),
                FidelityTier::PatternParse => pattern::has_patterns(&mapping.language),
                FidelityTier::BasicDetect => true,
            };
            if !available {
                return Err(ConfigError::UnsupportedTier {
                    extension: extension.clone(),
                    language: mapping.language.clone(),
                    tier: mapping.tier,
                });
            }
        }

        for pattern in &self.excluded_paths {
            globset::Glob::new(pattern).map_err(|source| ConfigError::InvalidGlob {
                pattern: pattern.clone(),
                source,
            })?;
        }

        Ok(())
    }

    /// Resolve an extension (case-insensitive, without dot) to a language
    /// and tier, consulting overrides before the built-in table.
    pub fn language_for(&self, extension: &str) -> Option<LanguageMapping> {
        let extension = extension.trim_start_matches('.').to_ascii_lowercase();
        self.extensions
            .iter()
            .find(|(key, _)| key.trim_start_matches('.').eq_ignore_ascii_case(&extension))
            .map(|(_, mapping)| mapping.clone())
            .or_else(|| crate::classify::default_mapping(&extension))
    }

    /// Build the exclusion matcher from `excluded_paths`.
    pub fn exclusion_set(&self) -> Result<globset::GlobSet, ConfigError> {
        let mut builder = globset::GlobSetBuilder::new();
        for pattern in &self.excluded_paths {
            let glob = globset::Glob::new(pattern).map_err(|source| ConfigError::InvalidGlob {
                pattern: pattern.clone(),
                source,
            })?;
            builder.add(glob);
        }
        builder.build().map_err(|source| ConfigError::InvalidGlob {
            pattern: self.excluded_paths.join(", "),
            source,
        })
    }
}

/// Path of the per-user configuration file, if the platform has one.
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "repolens").map(|dirs| dirs.config_dir().join("config.yaml"))
}
