use std::path::{Path, PathBuf};

use serde::Deserialize;
use url::Url;

pub const DEFAULT_CONFIG: &str = "kasumi.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub output_dir: Option<PathBuf>,
    pub downloader: DownloaderConfig,
    pub audio: AudioConfig,
    /// Key service used for protected titles. There is no built-in device, so protected
    /// titles fail at key acquisition when this is absent.
    pub remote_cdm: Option<RemoteCdmConfig>,

    pub cbc: kasumi_cbc::Config,
    pub crackle: kasumi_crackle::Config,
    pub uktvplay: kasumi_uktvplay::Config,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DownloaderConfig {
    /// Executable name looked up in `PATH`, or a path to it.
    pub program: String,
    /// Appended to every invocation.
    pub args: Vec<String>,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            program: "N_m3u8DL-RE".to_string(),
            args: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// `best`, or a codec such as `ec3`.
    pub track: String,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            track: "best".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RemoteCdmConfig {
    pub endpoint: Url,
    /// `Name: value` lines sent along with the license request.
    #[serde(default)]
    pub headers: Vec<String>,
}

impl Config {
    /// Reads `path`. A missing default config file yields the defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() && path == Path::new(DEFAULT_CONFIG) {
            log::debug!("{DEFAULT_CONFIG} not found, using defaults");
            return Ok(Self::default());
        }

        let data = std::fs::read_to_string(path)?;
        let config = toml::from_str(&data)?;
        Ok(config)
    }
}
