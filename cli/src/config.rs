//! Upload service configuration.

use anyhow::Context;
use sheetjson::TempDirStaging;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Default listening port of the upload service.
pub const DEFAULT_PORT: u16 = 4000;

/// Default request body limit in MiB.
pub const DEFAULT_MAX_UPLOAD_MB: usize = 25;

/// Settings for `sheetjson serve`.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,
    /// Port to bind
    pub port: u16,
    /// Directory for staged uploads; the system temp dir when unset
    pub upload_dir: Option<PathBuf>,
    /// Largest accepted request body, in MiB
    pub max_upload_mb: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            upload_dir: None,
            max_upload_mb: DEFAULT_MAX_UPLOAD_MB,
        }
    }
}

impl ServerConfig {
    /// Socket address to listen on.
    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }

    /// Request body limit in bytes.
    pub fn body_limit(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }

    /// Staging area for uploads.
    pub fn staging(&self) -> anyhow::Result<TempDirStaging> {
        match &self.upload_dir {
            Some(dir) => TempDirStaging::new(dir)
                .with_context(|| format!("cannot use upload directory {}", dir.display())),
            None => Ok(TempDirStaging::system()),
        }
    }
}
