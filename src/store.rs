use std::fs;
use std::path::Path;

use camino::{Utf8Path, Utf8PathBuf};
use directories::UserDirs;
use reqwest::Url;

use crate::domain::{ItemId, RegistryKind};
use crate::error::RailyardError;

/// Local directory that downloaded maps and mods are written into.
#[derive(Debug, Clone)]
pub struct Store {
    root: Utf8PathBuf,
}

impl Store {
    /// Explicit directory, else `<Downloads>/railyard`, else
    /// `./railyard-downloads`.
    pub fn new(destination: Option<&str>) -> Result<Self, RailyardError> {
        if let Some(destination) = destination {
            return Ok(Self::new_with_root(Utf8PathBuf::from(destination)));
        }

        let downloads = UserDirs::new().and_then(|dirs| {
            dirs.download_dir()
                .and_then(|dir| Utf8PathBuf::from_path_buf(dir.join("railyard")).ok())
        });
        if let Some(root) = downloads {
            return Ok(Self::new_with_root(root));
        }

        let cwd =
            std::env::current_dir().map_err(|err| RailyardError::Filesystem(err.to_string()))?;
        let root = Utf8PathBuf::from_path_buf(cwd.join("railyard-downloads"))
            .map_err(|_| RailyardError::Filesystem("invalid download path".to_string()))?;
        Ok(Self::new_with_root(root))
    }

    pub fn new_with_root(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn item_dir(&self, kind: RegistryKind, id: &ItemId) -> Utf8PathBuf {
        self.root.join(kind.as_str()).join(id.as_str())
    }

    pub fn item_path(&self, kind: RegistryKind, id: &ItemId, url: &str) -> Utf8PathBuf {
        self.item_dir(kind, id).join(file_name_for(url, id))
    }

    /// Writes `dest` through a temp file in the same directory so a failed
    /// download never leaves a partial file behind.
    pub fn write_atomic<F>(dest: &Utf8Path, force: bool, write: F) -> Result<(), RailyardError>
    where
        F: FnOnce(&Path) -> Result<(), RailyardError>,
    {
        if dest.as_std_path().exists() && !force {
            return Err(RailyardError::DownloadExists(dest.to_string()));
        }
        let parent = dest
            .parent()
            .ok_or_else(|| RailyardError::Filesystem("invalid destination path".to_string()))?;
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| RailyardError::Filesystem(err.to_string()))?;

        let temp = tempfile::Builder::new()
            .prefix("railyard-download")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| RailyardError::Filesystem(err.to_string()))?;
        write(temp.path())?;

        // Rename over the destination; the old file stays until it succeeds.
        temp.persist(dest.as_std_path())
            .map_err(|err| RailyardError::Filesystem(err.to_string()))?;
        Ok(())
    }
}

/// Last path segment of the download URL, or `<id>.zip` when the URL has no
/// usable file name.
pub fn file_name_for(url: &str, id: &ItemId) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|name| !name.is_empty() && name != "." && name != ".." && !name.contains('\\'))
        .unwrap_or_else(|| format!("{id}.zip"))
}
