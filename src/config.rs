//! Application configuration management.
//!
//! Settings are layered with figment, later layers winning:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. The TOML config file: `--config FILE`, or `config.toml` in the platform
//!    config directory
//! 3. `DUPETREE_*` environment variables, `__` separating nested keys
//!    (e.g. `DUPETREE_WALKER__SKIP_HIDDEN=true`)
//! 4. Command-line flags ([`Config::apply_scan_args`])

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::cli::{OutputFormat, ScanArgs};
use crate::duplicates::{DetectorConfig, IDENTICAL_PATH_THRESHOLD};
use crate::scanner::{DigestAlgorithm, WalkerConfig};

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "DUPETREE_";

/// Walker settings, the `[walker]` table of the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkerSettings {
    /// Directory names never descended into.
    pub skip_dir_names: Vec<String>,
    /// File extensions walked as archives.
    pub archive_extensions: Vec<String>,
    /// Skip names starting with `.`.
    pub skip_hidden: bool,
    /// Gitignore-style patterns matched against canonical paths.
    pub ignore_patterns: Vec<String>,
}

impl Default for WalkerSettings {
    fn default() -> Self {
        let walker = WalkerConfig::default();
        Self {
            skip_dir_names: walker.skip_dir_names,
            archive_extensions: walker.archive_extensions,
            skip_hidden: walker.skip_hidden,
            ignore_patterns: walker.ignore_patterns,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Content digest used for fingerprints.
    pub digest: DigestAlgorithm,
    /// Comparison threads: 1 is sequential, 0 uses every core.
    pub threads: usize,
    /// Minimum path similarity for equal content to count as identical.
    pub identical_threshold: f64,
    /// Report pairs that share no content.
    pub include_disjoint: bool,
    /// Report format.
    pub output: OutputFormat,
    /// Disable colored output.
    pub no_color: bool,
    /// Append diagnostics to this file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
    /// Walker settings.
    pub walker: WalkerSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            digest: DigestAlgorithm::default(),
            threads: 1,
            identical_threshold: IDENTICAL_PATH_THRESHOLD,
            include_disjoint: false,
            output: OutputFormat::default(),
            no_color: false,
            log_file: None,
            walker: WalkerSettings::default(),
        }
    }
}

impl Config {
    /// Load the layered configuration.
    ///
    /// An explicit `config_file` must exist; the default location is optional.
    ///
    /// # Errors
    ///
    /// Returns an error if the explicit file is missing, a layer cannot be
    /// parsed, or the result fails [`Config::validate`].
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let path = match config_file {
            Some(path) => {
                anyhow::ensure!(
                    path.is_file(),
                    "Config file {} does not exist",
                    path.display()
                );
                Some(path.to_path_buf())
            }
            None => Self::config_path(),
        };

        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(ref path) = path {
            log::debug!("Loading config from {}", path.display());
            figment = figment.merge(Toml::file(path));
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Config = figment
            .extract()
            .context("Failed to load configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Load defaults overlaid with a single TOML file, ignoring the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or the result is invalid.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let config: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .extract()
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns an error for a threshold outside `0..=1`.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.identical_threshold),
            "identical_threshold must be between 0 and 1, got {}",
            self.identical_threshold
        );
        Ok(())
    }

    /// Overlay the flags given to `dupetree scan`.
    pub fn apply_scan_args(&mut self, args: &ScanArgs) {
        if let Some(output) = args.output {
            self.output = output;
        }
        if let Some(threads) = args.threads {
            self.threads = threads;
        }
        if let Some(digest) = args.digest {
            self.digest = digest;
        }
        if let Some(threshold) = args.identical_threshold {
            self.identical_threshold = threshold;
        }
        self.include_disjoint |= args.include_disjoint;
        self.walker.skip_hidden |= args.skip_hidden;
        self.walker
            .ignore_patterns
            .extend(args.ignore_patterns.iter().cloned());
        if !args.archive_extensions.is_empty() {
            self.walker.archive_extensions = args.archive_extensions.clone();
        }
    }

    /// Number of comparison threads, resolving 0 to the available cores.
    #[must_use]
    pub fn effective_threads(&self) -> usize {
        if self.threads == 0 {
            std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
        } else {
            self.threads
        }
    }

    /// Walker configuration for these settings.
    #[must_use]
    pub fn to_walker_config(&self) -> WalkerConfig {
        WalkerConfig {
            skip_dir_names: self.walker.skip_dir_names.clone(),
            archive_extensions: self.walker.archive_extensions.clone(),
            skip_hidden: self.walker.skip_hidden,
            ignore_patterns: self.walker.ignore_patterns.clone(),
        }
    }

    /// Detector configuration for these settings.
    #[must_use]
    pub fn to_detector_config(&self, shutdown_flag: Arc<AtomicBool>) -> DetectorConfig {
        DetectorConfig::default()
            .with_identical_threshold(self.identical_threshold)
            .with_include_disjoint(self.include_disjoint)
            .with_threads(self.effective_threads())
            .with_shutdown_flag(shutdown_flag)
    }

    /// Render as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }

    /// Write the configuration as TOML to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(path, self.to_toml()?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// Default platform-specific configuration path, if one can be determined.
    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "dupetree", "dupetree")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    use crate::cli::{Cli, Commands};

    fn scan_args(argv: &[&str]) -> ScanArgs {
        let mut full = vec!["dupetree", "scan"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Commands::Scan(args) => args,
            Commands::Config(_) => panic!("Expected Scan command"),
        }
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.digest, DigestAlgorithm::Sha256);
        assert_eq!(config.threads, 1);
        assert_eq!(config.identical_threshold, 0.99);
        assert!(!config.include_disjoint);
        assert_eq!(config.walker.skip_dir_names, vec!["__MACOSX"]);
        assert_eq!(config.walker.archive_extensions, vec!["zip"]);
    }

    #[test]
    fn test_cli_args_override() {
        let mut config = Config::default();
        config.walker.ignore_patterns.push("*.bak".into());
        config.apply_scan_args(&scan_args(&[
            "/p",
            "-o",
            "json",
            "-j",
            "3",
            "--ignore",
            "tmp/",
            "--archive-ext",
            "jar",
            "--archive-ext",
            "zip",
        ]));

        assert_eq!(config.output, OutputFormat::Json);
        assert_eq!(config.threads, 3);
        assert_eq!(config.walker.ignore_patterns, vec!["*.bak", "tmp/"]);
        assert_eq!(config.walker.archive_extensions, vec!["jar", "zip"]);
        // unset flags keep configured values
        assert_eq!(config.digest, DigestAlgorithm::Sha256);
        assert_eq!(config.identical_threshold, 0.99);
    }

    #[test]
    fn test_walker_and_detector_config() {
        let mut config = Config::default();
        config.walker.skip_hidden = true;
        config.include_disjoint = true;
        config.threads = 2;

        let walker = config.to_walker_config();
        assert!(walker.skip_hidden);
        assert!(walker.is_archive_name("a.ZIP"));

        let detector = config.to_detector_config(Arc::new(AtomicBool::new(false)));
        assert!(detector.include_disjoint);
        assert_eq!(detector.threads, 2);
        assert!(detector.shutdown_flag.is_some());
    }

    #[test]
    fn test_effective_threads() {
        let config = Config {
            threads: 0,
            ..Config::default()
        };
        assert!(config.effective_threads() >= 1);
        assert_eq!(Config::default().effective_threads(), 1);
    }

    #[test]
    fn test_validate_threshold() {
        let config = Config {
            identical_threshold: 1.5,
            ..Config::default()
        };
        assert!(config.validate().is_err());
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");

        let mut config = Config::default();
        config.digest = DigestAlgorithm::Blake3;
        config.walker.archive_extensions = vec!["zip".into(), "jar".into()];
        config.save(&path).unwrap();

        let saved = fs::read_to_string(&path).unwrap();
        assert!(saved.contains("digest = \"blake3\""));
        assert!(saved.contains("[walker]"));
        assert!(!saved.contains("log_file"));

        assert_eq!(Config::load_from_path(&path).unwrap(), config);
    }

    #[test]
    fn test_load_explicit_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
