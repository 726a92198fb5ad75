use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 5000;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CardstashConfig {
    pub database: Option<String>,
    pub bind: Option<IpAddr>,
    pub port: Option<u16>,
    pub busy_timeout_ms: Option<u64>,
}

impl CardstashConfig {
    /// Database path: `flag` wins over the file, then the default
    pub fn database_path(&self, flag: Option<PathBuf>) -> PathBuf {
        flag.or_else(|| self.database.as_ref().map(PathBuf::from))
            .unwrap_or_else(default_database_path)
    }

    pub fn addr(&self, port_flag: Option<u16>) -> SocketAddr {
        let ip = self.bind.unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        let port = port_flag.or(self.port).unwrap_or(DEFAULT_PORT);
        SocketAddr::new(ip, port)
    }

    pub fn busy_timeout(&self) -> Duration {
        self.busy_timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(crate::storage::DEFAULT_BUSY_TIMEOUT)
    }

    /// Write this config as TOML; an existing file is kept unless `overwrite`
    pub fn save(&self, path: &Path, overwrite: bool) -> anyhow::Result<()> {
        if path.exists() && !overwrite {
            anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("cardstash.toml")
}

pub fn default_database_path() -> PathBuf {
    PathBuf::from("cardstash.db")
}

/// Read the config at `path`; a missing file means every setting is defaulted
pub fn load_config(path: &Path) -> anyhow::Result<CardstashConfig> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(CardstashConfig::default());
        }
        Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
    };
    let config = toml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))?;
    tracing::debug!(path = %path.display(), "config loaded");
    Ok(config)
}

/// Create the directory a database file will live in
pub fn create_database_dir(db_path: &Path) -> anyhow::Result<()> {
    match db_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => std::fs::create_dir_all(dir)
            .with_context(|| format!("creating database directory {}", dir.display())),
        _ => Ok(()),
    }
}
