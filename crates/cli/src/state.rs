//! Local CLI state: the backend token and the default cart selection.
//!
//! Stored as JSON under the user's config directory
//! (`<config>/marketstall/state.json`). The token is wrapped in a
//! [`Persisted`] and dropped once older than [`DEFAULT_TTL`].

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use marketstall_storefront::api::{AccessToken, Authorization};
use marketstall_storefront::cart::{DEFAULT_TTL, DefaultCartAction, DefaultCartSlice, Persisted};

use crate::error::CliError;

/// Everything the CLI remembers between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliState {
    #[serde(default)]
    pub token: Option<Persisted<String>>,
    #[serde(default)]
    pub default_cart: DefaultCartSlice,
}

impl CliState {
    /// Credentials for backend calls, if a fresh token is stored.
    #[must_use]
    pub fn authorization(&self) -> Option<Authorization> {
        self.token
            .clone()
            .and_then(|token| token.into_fresh(DEFAULT_TTL))
            .map(|token| AccessToken::new(token).bearer())
    }

    /// Remember a new login. Any previous cart selection belonged to the
    /// previous login and is dropped.
    pub fn logged_in(&mut self, token: &AccessToken) {
        self.token = Some(Persisted::new(token.expose().to_string()));
        self.default_cart.reduce(DefaultCartAction::Reset);
    }

    /// Forget the token and the cart selection.
    pub fn logged_out(&mut self) {
        self.token = None;
        self.default_cart.reduce(DefaultCartAction::Reset);
    }
}

/// Location of the state file.
#[derive(Debug, Clone)]
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    /// State file at an explicit path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// State file in the user's config directory.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::NoConfigDir`] if the platform has no config
    /// directory.
    pub fn default_location() -> Result<Self, CliError> {
        let dir = dirs::config_dir().ok_or(CliError::NoConfigDir)?;
        Ok(Self::new(dir.join("marketstall").join("state.json")))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored state.
    ///
    /// A missing file is an empty state. So is an unreadable one, with a
    /// warning, since everything in it can be recovered by logging in again.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn load(&self) -> Result<CliState, CliError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(CliState::default()),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str(&raw) {
            Ok(state) => Ok(state),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Ignoring corrupt state file");
                Ok(CliState::default())
            }
        }
    }

    /// Write the state, replacing the previous file.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn save(&self, state: &CliState) -> Result<(), CliError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("json.tmp");
        write_private(&tmp, &serde_json::to_vec_pretty(state)?)?;
        fs::rename(&tmp, &self.path)?;

        tracing::debug!(path = %self.path.display(), "State saved");
        Ok(())
    }
}

#[cfg(unix)]
fn write_private(path: &Path, contents: &[u8]) -> io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(contents)
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &[u8]) -> io::Result<()> {
    fs::write(path, contents)
}
