use std::{
    ffi::OsStr,
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
    time::Duration,
};

use miette::{Context, IntoDiagnostic};
use tracing::{error, info};

use crate::{
    constants::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT_MS, NAMESPACE},
    utils::log::notification,
};

const DEFAULT_CONFIG: &str = include_str!("../assets/default-config.kdl");

#[derive(knuffel::Decode, Debug, Clone, PartialEq)]
pub struct Config {
    #[knuffel(child, unwrap(argument), default = Self::default().base_url)]
    pub base_url: String,
    #[knuffel(child, unwrap(argument))]
    pub user_agent: Option<String>,
    #[knuffel(child, unwrap(argument), default = false)]
    pub desktop_notifications: bool,
    #[knuffel(child, unwrap(argument), default = false)]
    pub offline_cache: bool,
    #[knuffel(child, unwrap(argument), default = DEFAULT_TIMEOUT_MS)]
    pub request_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            user_agent: None,
            desktop_notifications: false,
            offline_cache: false,
            request_timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

/// Where the config lives. `dir` also holds nothing else today.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPath {
    pub dir: PathBuf,
    pub file: PathBuf,
}

impl ConfigPath {
    pub fn new(config_dir: Option<PathBuf>) -> miette::Result<Self> {
        let dir = match config_dir {
            Some(dir) => dir,
            None => default_config_dir()?,
        };
        let file = dir.join("config.kdl");
        Ok(Self { dir, file })
    }
}

fn default_config_dir() -> miette::Result<PathBuf> {
    if let Ok(config) = std::env::var("XDG_CONFIG_HOME")
        && !config.is_empty()
    {
        return Ok(PathBuf::from(config).join(NAMESPACE));
    }

    let home = std::env::var("HOME")
        .into_diagnostic()
        .context("neither $XDG_CONFIG_HOME nor $HOME is set")?;
    Ok(PathBuf::from(home).join(".config").join(NAMESPACE))
}

#[profiling::all_functions]
impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn load(path: &Path) -> miette::Result<Self> {
        let contents = fs::read_to_string(path)
            .into_diagnostic()
            .with_context(|| format!("error reading {}", path.display()))?;

        let config = Self::parse(
            path.file_name()
                .and_then(OsStr::to_str)
                .unwrap_or("config.kdl"),
            &contents,
        )?;

        Ok(config)
    }

    pub fn parse(filename: &str, text: &str) -> miette::Result<Self> {
        match knuffel::parse::<Config>(filename, text) {
            Ok(config) => {
                info!("Successfully parsed config");
                Ok(config)
            }
            Err(e) => Err(miette::Report::new(e)),
        }
    }

    pub fn create(path: &Path) -> miette::Result<()> {
        if let Some(default_parent) = path.parent() {
            fs::create_dir_all(default_parent)
                .into_diagnostic()
                .with_context(|| {
                    format!(
                        "error creating config directory {}",
                        default_parent.display()
                    )
                })?;
        }

        let mut new_file = match File::options()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)
        {
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Ok(());
            }
            res => res,
        }
        .into_diagnostic()
        .with_context(|| {
            format!("error opening config file at {}", path.display())
        })?;

        new_file
            .write_all(DEFAULT_CONFIG.as_bytes())
            .into_diagnostic()
            .with_context(|| {
                format!("error writing default config to {}", path.display())
            })?;

        Ok(())
    }

    pub fn load_or_create(path: &Path) -> miette::Result<Self> {
        Config::create(path)?;
        Config::load(path)
    }

    /// Loads the config, falling back to defaults (and saying so) when the
    /// file is broken.
    pub fn init(path: &ConfigPath) -> Self {
        match Config::load_or_create(&path.file) {
            Ok(config) => config,
            Err(e) => {
                notification("Failed to parse config file, using default config");
                error!("Failed to parse config file, using default config");
                error!("{e:?}");
                Config::default()
            }
        }
    }

    pub fn validate(path: &ConfigPath) -> miette::Result<()> {
        Config::load(&path.file)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::parse("config.kdl", "").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.request_timeout(), Duration::from_millis(5000));
    }

    #[test]
    fn shipped_default_parses() {
        let config = Config::parse("config.kdl", DEFAULT_CONFIG).unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert!(!config.offline_cache);
    }

    #[test]
    fn keys_are_kebab_case() {
        let config = Config::parse(
            "config.kdl",
            r#"
            base-url "http://capture.lan:9000"
            user-agent "Mozilla/5.0 (Windows NT 10.0; Win64; x64)"
            desktop-notifications true
            offline-cache true
            request-timeout-ms 1500
            "#,
        )
        .unwrap();

        assert_eq!(config.base_url, "http://capture.lan:9000");
        assert_eq!(
            config.user_agent.as_deref(),
            Some("Mozilla/5.0 (Windows NT 10.0; Win64; x64)")
        );
        assert!(config.desktop_notifications);
        assert!(config.offline_cache);
        assert_eq!(config.request_timeout_ms, 1500);
    }

    #[test]
    fn unknown_nodes_are_reported() {
        assert!(Config::parse("config.kdl", "poll-interval 100").is_err());
        assert!(Config::parse("config.kdl", r#"offline-cache "yes""#).is_err());
    }
}
