//! Persistent favorites.
//!
//! A favorite bundles the parameters of one recurring session (product name,
//! install directory, manifest URL, target platform) plus scheduling
//! preferences, keyed by product name. Favorites live in a single TOML
//! document under the qup home directory, which is `$QUP_HOME` when set and
//! `~/.qup` otherwise.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{FAVORITES_FILE, HOME_ENV};
use crate::core::{QupError, Result};
use crate::platform::Platform;


/// One saved session configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Favorite {
    /// Product name, also the key under which the favorite is stored.
    pub name: String,
    /// Install destination directory.
    pub local_directory: String,
    /// URL of the instructions document.
    pub url: String,
    /// Target platform label, e.g. `"Debian AMD64"`.
    pub operating_system: String,
    /// Optional periodic-refresh interval, in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_frequency: Option<u64>,
    /// Whether a completed download round installs without confirmation.
    #[serde(default)]
    pub install_automatically: bool,
}

impl Favorite {
    /// Resolves the stored platform label.
    pub fn platform(&self) -> Result<Platform> {
        self.operating_system.parse()
    }
}

/// On-disk shape of the favorites document: one table per favorite, keyed
/// by product name.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    #[serde(default)]
    favorite: BTreeMap<String, Favorite>,
}

/// The favorites file and its loaded contents.
#[derive(Debug)]
pub struct FavoriteStore {
    path: PathBuf,
    document: Document,
}

impl FavoriteStore {
    /// Opens the store under the qup home directory, creating nothing yet;
    /// the file first appears on [`save`](Self::save).
    pub fn open_default() -> Result<Self> {
        Self::open(qup_home().join(FAVORITES_FILE))
    }

    /// Opens the store at an explicit path. A missing file is an empty
    /// store; an unreadable or malformed file is an error.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let document = if path.is_file() {
            let text = fs::read_to_string(&path)
                .map_err(|_| QupError::filesystem("read favorites", path.display().to_string()))?;
            toml::from_str(&text).map_err(|e| {
                QupError::validation(format!(
                    "favorites file {} is not valid TOML: {e}",
                    path.display()
                ))
            })?
        } else {
            Document::default()
        };
        Ok(Self { path, document })
    }

    /// Writes the store back to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|_| {
                QupError::filesystem("create directory", parent.display().to_string())
            })?;
        }
        let text = toml::to_string_pretty(&self.document)
            .map_err(|e| QupError::validation(format!("could not serialize favorites: {e}")))?;
        fs::write(&self.path, text)
            .map_err(|_| QupError::filesystem("write favorites", self.path.display().to_string()))
    }

    /// Adds or replaces the favorite stored under its name.
    pub fn upsert(&mut self, favorite: Favorite) {
        self.document.favorite.insert(favorite.name.clone(), favorite);
    }

    /// Removes a favorite; returns whether one was stored under `name`.
    pub fn remove(&mut self, name: &str) -> bool {
        self.document.favorite.remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&Favorite> {
        self.document.favorite.get(name)
    }

    /// Favorite names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.document.favorite.keys().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.document.favorite.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// The qup home directory: `$QUP_HOME` when set and non-empty, `~/.qup`
/// otherwise.
pub fn qup_home() -> PathBuf {
    resolve_home(std::env::var_os(HOME_ENV).and_then(|v| v.into_string().ok()))
}

fn resolve_home(overridden: Option<String>) -> PathBuf {
    match overridden {
        Some(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
        _ => dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".qup"),
    }
}
