use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration for the negtag batch.
///
/// Controls which external collaborator binaries are invoked, how long each
/// invocation may run, and whether the batch is a dry run.
///
/// # Loading
///
/// ```rust,no_run
/// use negtag::config::Config;
///
/// // From a JSON file
/// let config = Config::load(Some("config.json".as_ref())).unwrap();
///
/// // Or use defaults and customize
/// let mut config = Config::default();
/// config.tools.exiftool = "/opt/exiftool/exiftool".into();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// External collaborator binaries.
    pub tools: ToolsConfig,
    /// Child-process dispatch behavior.
    pub dispatch: DispatchConfig,
    /// Output behavior (dry run).
    pub output: OutputConfig,
}

/// Paths (or bare names resolved via PATH) of the external collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// The tag writer — burns a JSON tag mapping into a file's metadata.
    pub exiftool: String,
    /// The image transcoder — archival and preview conversions.
    pub magick: String,
}

/// Dispatch behavior for the child-process fan-out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Bounded wait per invocation, in seconds. A child still running at
    /// expiry is killed and reported as a failure.
    pub timeout_secs: u64,
}

/// Output and behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// If `true`, materialize sidecars and log the would-be invocations
    /// without launching anything.
    pub dry_run: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tools: ToolsConfig {
                exiftool: "exiftool".to_string(),
                magick: "convert".to_string(),
            },
            dispatch: DispatchConfig { timeout_secs: 300 },
            output: OutputConfig { dry_run: false },
        }
    }
}

impl Config {
    /// Resolve the config file path — same directory as the executable.
    pub fn config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("Failed to get executable path")?;
        let exe_dir = exe_path
            .parent()
            .context("Failed to get executable directory")?;
        Ok(exe_dir.join("config.json"))
    }

    /// Load config from the given path, or from the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            log::warn!(
                "Config file not found at {}. Using defaults.",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Save config to the given path, or to the default location.
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, contents).context("Failed to write config file")?;
        log::info!("Config saved to {}", config_path.display());
        Ok(())
    }

    /// The per-invocation bounded wait.
    pub fn invocation_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.dispatch.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_use_path_resolved_tools() {
        let config = Config::default();
        assert_eq!(config.tools.exiftool, "exiftool");
        assert_eq!(config.tools.magick, "convert");
        assert_eq!(config.dispatch.timeout_secs, 300);
        assert!(!config.output.dry_run);
    }

    #[test]
    fn round_trips_through_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::default();
        config.tools.exiftool = "/usr/local/bin/exiftool".to_string();
        config.dispatch.timeout_secs = 42;
        config.save(Some(&path)).unwrap();

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded.tools.exiftool, "/usr/local/bin/exiftool");
        assert_eq!(loaded.dispatch.timeout_secs, 42);
    }

    #[test]
    fn missing_config_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(Some(&dir.path().join("absent.json"))).unwrap();
        assert_eq!(config.tools.exiftool, "exiftool");
    }
}
