//! Server configuration.
//!
//! Built once at startup: defaults, then an optional YAML file, then CLI
//! arguments and environment variables (clap resolves those two).

use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use clap::Args;
use grid_writer::{WriterConfig, ZarrCompression};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tim_common::DEFAULT_MAX_CELLS;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address. Loopback only unless deliberately changed.
    pub host: IpAddr,

    /// Listen port; 0 picks a free port (announced on stdout).
    pub port: u16,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,

    /// Result writer settings.
    pub output: WriterConfig,

    /// Largest result grid, in cells times aquifers, a request may ask for.
    pub max_cells: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 8765,
            log_level: "info".to_string(),
            json_logs: false,
            output: WriterConfig::default(),
            max_cells: DEFAULT_MAX_CELLS,
        }
    }
}

impl ServerConfig {
    /// Load configuration from a YAML file. Missing keys keep their defaults.
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Socket address to listen on.
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.output.validate().map_err(ConfigError::Invalid)?;
        if self.max_cells == 0 {
            return Err(ConfigError::Invalid("max_cells must be positive".to_string()));
        }
        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            other => Err(ConfigError::Invalid(format!("unknown log level {:?}", other))),
        }
    }
}

/// Arguments of `tim-server serve`.
#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Listen address
    #[arg(long, env = "TIM_HOST")]
    pub host: Option<IpAddr>,

    /// Listen port (0 = any free port)
    #[arg(short, long, env = "TIM_PORT")]
    pub port: Option<u16>,

    /// YAML configuration file
    #[arg(short, long, env = "TIM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level
    #[arg(long, env = "TIM_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, env = "TIM_JSON_LOGS")]
    pub json_logs: bool,

    /// Compression of the head array (none, gzip)
    #[arg(long, env = "TIM_ZARR_COMPRESSION")]
    pub compression: Option<String>,

    /// Compression level (1-9)
    #[arg(long, env = "TIM_ZARR_COMPRESSION_LEVEL")]
    pub compression_level: Option<u8>,

    /// Largest result grid in cells times aquifers
    #[arg(long, env = "TIM_MAX_CELLS")]
    pub max_cells: Option<usize>,
}

impl ServeArgs {
    /// Resolve the final configuration.
    pub fn resolve(&self) -> Result<ServerConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::from_yaml(path)?,
            None => ServerConfig::default(),
        };

        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if self.json_logs {
            config.json_logs = true;
        }
        if let Some(compression) = &self.compression {
            config.output.compression = ZarrCompression::from_str(compression);
        }
        if let Some(level) = self.compression_level {
            config.output.compression_level = level;
        }
        if let Some(max_cells) = self.max_cells {
            config.max_cells = max_cells;
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_loopback() {
        let config = ServerConfig::default();
        assert!(config.host.is_loopback());
        assert_eq!(config.listen_addr().port(), 8765);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_partial() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.yaml");
        fs::write(
            &path,
            "port: 9100\noutput:\n  compression: gzip\n  compression_level: 4\n",
        )
        .unwrap();

        let config = ServerConfig::from_yaml(&path).unwrap();
        assert_eq!(config.port, 9100);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.output.compression, ZarrCompression::Gzip);
        assert_eq!(config.output.compression_level, 4);
    }

    #[test]
    fn test_args_override_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.yaml");
        fs::write(&path, "port: 9100\nlog_level: debug\n").unwrap();

        let args = ServeArgs {
            port: Some(0),
            config: Some(path),
            json_logs: true,
            ..Default::default()
        };
        let config = args.resolve().unwrap();
        assert_eq!(config.port, 0);
        assert_eq!(config.log_level, "debug");
        assert!(config.json_logs);
    }

    #[test]
    fn test_missing_file() {
        let err = ServerConfig::from_yaml("/nonexistent/server.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_compression_args() {
        let args = ServeArgs {
            compression: Some("gzip".to_string()),
            compression_level: Some(6),
            ..Default::default()
        };
        let config = args.resolve().unwrap();
        assert_eq!(config.output.compression, ZarrCompression::Gzip);
        assert_eq!(config.output.compression_level, 6);

        let args = ServeArgs {
            compression_level: Some(0),
            ..Default::default()
        };
        assert!(matches!(args.resolve(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_max_cells() {
        assert_eq!(ServerConfig::default().max_cells, DEFAULT_MAX_CELLS);

        let args = ServeArgs {
            max_cells: Some(1000),
            ..Default::default()
        };
        assert_eq!(args.resolve().unwrap().max_cells, 1000);

        let args = ServeArgs {
            max_cells: Some(0),
            ..Default::default()
        };
        assert!(matches!(args.resolve(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_invalid_log_level() {
        let args = ServeArgs {
            log_level: Some("loud".to_string()),
            ..Default::default()
        };
        assert!(matches!(args.resolve(), Err(ConfigError::Invalid(_))));
    }
}
