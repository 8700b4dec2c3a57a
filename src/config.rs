//! TOML configuration.
//!
//! The whole run is driven by one [`Config`] value loaded at process start.
//! Environment-derived settings (the extraction engine's API key) are read
//! exactly once inside [`load_config`] and carried on the value from then on.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_include_globs() -> Vec<String> {
    vec![
        "**/*.pdf".to_string(),
        "**/*.PDF".to_string(),
        "**/*.txt".to_string(),
    ]
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_write_json")]
    pub write_json: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            write_json: default_write_json(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./outputs")
}
fn default_write_json() -> bool {
    true
}

/// Character-window settings for the chunker. Sizes are measured in bytes
/// of UTF-8 text.
#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    3000
}
fn default_overlap() -> usize {
    500
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExtractionConfig {
    #[serde(default = "default_model")]
    pub model: String,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub temperature: f32,
    /// 0 means every chunk of a document is sent to the engine.
    #[serde(default)]
    pub max_chunks_per_document: usize,
    /// Pause between consecutive engine calls.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Resolved from `api_key_env` by [`load_config`].
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            temperature: 0.0,
            max_chunks_per_document: 0,
            delay_ms: default_delay_ms(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            api_key: None,
        }
    }
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_delay_ms() -> u64 {
    500
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_max_retries() -> u32 {
    3
}

impl ExtractionConfig {
    /// Chunk cap for one document, `None` when unlimited.
    pub fn max_chunks(&self) -> Option<usize> {
        match self.max_chunks_per_document {
            0 => None,
            n => Some(n),
        }
    }
}

impl Config {
    /// A config with every section defaulted, pointing at the given database.
    pub fn with_db_path(path: impl Into<PathBuf>) -> Self {
        Self {
            db: DbConfig { path: path.into() },
            input: InputConfig::default(),
            output: OutputConfig::default(),
            chunking: ChunkingConfig::default(),
            extraction: ExtractionConfig::default(),
        }
    }

    /// Checks that must pass before any document is processed: the engine
    /// credentials are present and the input directory exists.
    pub fn validate_for_run(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.extraction.api_key.is_none() {
            errors.push(format!(
                "{} is not set",
                self.extraction.api_key_env
            ));
        }
        if !self.input.data_dir.is_dir() {
            errors.push(format!(
                "data directory does not exist: {}",
                self.input.data_dir.display()
            ));
        }

        if !errors.is_empty() {
            bail!("configuration error: {}", errors.join("; "));
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;

    config.extraction.api_key = std::env::var(&config.extraction.api_key_env)
        .ok()
        .filter(|k| !k.trim().is_empty());

    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.chunk_size == 0 {
        bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.overlap >= config.chunking.chunk_size {
        bail!(
            "chunking.overlap ({}) must be smaller than chunking.chunk_size ({})",
            config.chunking.overlap,
            config.chunking.chunk_size
        );
    }
    if config.extraction.model.trim().is_empty() {
        bail!("extraction.model must not be empty");
    }
    if !(0.0..=2.0).contains(&config.extraction.temperature) {
        bail!("extraction.temperature must be in [0.0, 2.0]");
    }
    Ok(())
}
