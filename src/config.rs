// src/config.rs

use encoding_rs::Encoding;
use serde::Deserialize;
use std::{env, fs, path::Path, time::Duration};
use url::Url;

use crate::error::{Error, Result};

pub const DEFAULT_ROOT_URL: &str = "https://www.pochta.ru";
pub const DEFAULT_CATALOG_PATH: &str = "/database/ops";
pub const DEFAULT_ENCODING: &str = "cp866";

/// Client settings. Every field has a default, so an empty JSON object is a
/// valid config file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Links on the catalog page are resolved against this.
    pub root_url: String,
    /// Defaults to `<root_url>/database/ops`.
    pub catalog_url: Option<String>,
    /// Label of the code page the dbf tables are written in.
    pub encoding: String,
    pub timeout_secs: Option<u64>,
    pub proxy: Option<String>,
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_url: DEFAULT_ROOT_URL.to_string(),
            catalog_url: None,
            encoding: DEFAULT_ENCODING.to_string(),
            timeout_secs: None,
            proxy: None,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Config {
    /// Defaults overlaid with the environment.
    pub fn from_env() -> Result<Self> {
        Self::default().with_env()
    }

    /// Read a JSON config file, then overlay the environment.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: Config = serde_json::from_str(&raw)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        cfg.with_env()
    }

    /// `PINDX_ROOT_URL`, `PINDX_CATALOG_URL`, `PINDX_ENCODING`,
    /// `PINDX_TIMEOUT_SECS` and `PROXY` override the corresponding fields.
    pub fn with_env(self) -> Result<Self> {
        self.with_vars(|key| env::var(key).ok().filter(|v| !v.is_empty()))
    }

    fn with_vars(mut self, var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(v) = var("PINDX_ROOT_URL") {
            self.root_url = v;
        }
        if let Some(v) = var("PINDX_CATALOG_URL") {
            self.catalog_url = Some(v);
        }
        if let Some(v) = var("PINDX_ENCODING") {
            self.encoding = v;
        }
        if let Some(v) = var("PINDX_TIMEOUT_SECS") {
            let secs = v
                .parse()
                .map_err(|_| Error::Config(format!("PINDX_TIMEOUT_SECS={v:?} is not a number")))?;
            self.timeout_secs = Some(secs);
        }
        if let Some(v) = var("PROXY") {
            self.proxy = Some(v);
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        self.root()?;
        self.catalog()?;
        self.file_encoding()?;
        Ok(())
    }

    pub fn root(&self) -> Result<Url> {
        Url::parse(&self.root_url)
            .map_err(|e| Error::Config(format!("root_url {:?}: {e}", self.root_url)))
    }

    pub fn catalog(&self) -> Result<Url> {
        match &self.catalog_url {
            Some(u) => Url::parse(u).map_err(|e| Error::Config(format!("catalog_url {u:?}: {e}"))),
            None => self
                .root()?
                .join(DEFAULT_CATALOG_PATH)
                .map_err(|e| Error::Config(format!("catalog url: {e}"))),
        }
    }

    pub fn file_encoding(&self) -> Result<&'static Encoding> {
        Encoding::for_label(self.encoding.as_bytes())
            .ok_or_else(|| Error::Config(format!("unknown encoding {:?}", self.encoding)))
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
