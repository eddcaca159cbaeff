// Session state and its on-disk cache.
//
// The cache file is a flat JSON object of cookie name -> value under the
// user's config directory. It is written after every remote call because
// the platform may rotate cookies on any request. Concurrent invocations
// race on this file; the last writer wins.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

pub type CookieMap = BTreeMap<String, String>;

const CACHE_FILE_NAME: &str = "session_cache";

/// Authentication state for one remote account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub base_url: String,
    pub cookies: CookieMap,
    pub live: bool,
}

impl Session {
    pub fn new(base_url: impl Into<String>) -> Self {
        Session {
            base_url: base_url.into(),
            cookies: CookieMap::new(),
            live: false,
        }
    }

    pub fn with_cookies(base_url: impl Into<String>, cookies: CookieMap) -> Self {
        Session {
            cookies,
            ..Session::new(base_url)
        }
    }
}

/// Persists session cookies for the current user.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Store rooted at `config_dir`; the directory is created on first save.
    pub fn new(config_dir: impl AsRef<Path>) -> Self {
        SessionStore {
            path: config_dir.as_ref().join(CACHE_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the session's cookies to disk with owner-only permissions.
    ///
    /// Failing to restrict permissions is logged and otherwise ignored.
    pub fn save(&self, session: &Session) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating config directory {}", dir.display()))?;
        }
        let json = serde_json::to_string(&session.cookies)?;
        fs::write(&self.path, json)
            .with_context(|| format!("writing session cache {}", self.path.display()))?;

        if let Err(e) = restrict_permissions(&self.path) {
            warn!(path = %self.path.display(), error = %e, "could not set permissions on session cache");
        }
        debug!(path = %self.path.display(), cookies = session.cookies.len(), "session cached");
        Ok(())
    }

    /// Read the cached session, if any.
    ///
    /// A missing file is not an error. An unreadable or corrupt file is
    /// logged and treated as missing.
    pub fn load(&self, base_url: &str) -> Option<Session> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "cached session could not be read");
                return None;
            }
        };

        match serde_json::from_str::<CookieMap>(&raw) {
            Ok(cookies) => Some(Session::with_cookies(base_url, cookies)),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "cached session is corrupt, ignoring it");
                None
            }
        }
    }

    /// Delete the cache file. Does nothing when it is already gone.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e)
                .with_context(|| format!("removing session cache {}", self.path.display())),
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "owner-only permissions are not supported on this platform",
    ))
}
