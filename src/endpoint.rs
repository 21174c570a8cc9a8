use anyhow::{Context, Result, anyhow};
use reqwest::Url;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Name of the persisted override. The value lives in a file of the same
/// purpose under the config directory.
pub const OVERRIDE_KEY: &str = "JOBLOG_API_BASE";

/// Port the dashboard is served on in local development. The API runs one
/// port above it.
pub const DEV_PORT: u16 = 40000;

/// Resolved API origin, fixed for the lifetime of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiBase(String);

impl ApiBase {
    pub fn new(base: impl Into<String>) -> Self {
        Self(base.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn join(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.as_str(), path)
        } else {
            format!("{}/{}", self.as_str(), path)
        }
    }
}

impl fmt::Display for ApiBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the dashboard considers itself to be served from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLocation {
    pub scheme: String,
    pub host: String,
    pub port: Option<u16>,
}

impl PageLocation {
    pub fn parse(origin: &str) -> Result<Self> {
        let url = Url::parse(origin.trim()).with_context(|| format!("Invalid origin: {}", origin))?;
        let host = url
            .host_str()
            .ok_or_else(|| anyhow!("Origin has no host: {}", origin))?
            .to_string();
        Ok(Self {
            scheme: url.scheme().to_string(),
            host,
            port: url.port(),
        })
    }

    pub fn origin(&self) -> String {
        match self.port {
            Some(port) => format!("{}://{}:{}", self.scheme, self.host, port),
            None => format!("{}://{}", self.scheme, self.host),
        }
    }

    fn is_standard_port(&self) -> bool {
        matches!(self.port, None | Some(80) | Some(443))
    }
}

/// Picks the API origin. First match wins: persisted override, same origin on
/// standard ports, dev port + 1, then same origin.
pub fn resolve(location: &PageLocation, forced: Option<&str>) -> ApiBase {
    if let Some(forced) = forced.map(str::trim).filter(|v| !v.is_empty()) {
        let base = forced.strip_suffix('/').unwrap_or(forced);
        info!(api_base = base, "using persisted API base override");
        return ApiBase::new(base);
    }

    if location.is_standard_port() {
        debug!(origin = %location.origin(), "standard port, assuming same-origin API");
        return ApiBase::new(location.origin());
    }

    if location.port == Some(DEV_PORT) {
        let base = format!("{}://{}:{}", location.scheme, location.host, DEV_PORT + 1);
        debug!(api_base = %base, "dev port, API expected one port above");
        return ApiBase::new(base);
    }

    ApiBase::new(location.origin())
}

/// Client-local persisted override for the API base.
pub struct OverrideStore {
    path: PathBuf,
}

impl OverrideStore {
    pub fn open_default() -> Result<Self> {
        Ok(Self::at(Self::default_path()?))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn default_path() -> Result<PathBuf> {
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "joblog") {
            Ok(proj_dirs.config_dir().join("api_base"))
        } else {
            Ok(PathBuf::from("joblog.api_base"))
        }
    }

    pub fn load(&self) -> Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => {
                let value = content.trim();
                Ok((!value.is_empty()).then(|| value.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| {
                format!("Failed to read {} from {}", OVERRIDE_KEY, self.path.display())
            }),
        }
    }

    pub fn save(&self, value: &str) -> Result<()> {
        let value = value.trim();
        if value.is_empty() {
            return Err(anyhow!("{} must not be empty", OVERRIDE_KEY));
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, format!("{}\n", value))
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(())
    }

    /// Returns whether an override was present.
    pub fn clear(&self) -> Result<bool> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", self.path.display())),
        }
    }
}
